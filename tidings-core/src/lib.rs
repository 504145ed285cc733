//! # tidings-core
//!
//! Core traits and value types for the tidings event dispatch library.
//!
//! This crate has a single dependency and is meant to be imported by code that
//! defines events, handlers or listeners without caring which dispatcher runs
//! them. The dispatchers themselves live in `tidings-std`.
//!
//! # Building Blocks
//!
//! ## Events ([`Event`])
//!
//! Plain data types, identified at dispatch time by their concrete type. An
//! event may declare ancestors ([`Extends`]) such as `dyn Cancellable` so that
//! listener-scan dispatchers can deliver it to handlers declared on a wider type.
//!
//! ## Handlers ([`Handler`])
//!
//! A callable bound to one event type and a priority. Closures qualify.
//! Lower priorities run first; equal priorities run in registration order.
//!
//! ## Listeners ([`Listener`])
//!
//! An object grouping several handler methods, described through a
//! [`HandlerSet`]. Methods may ask for extra arguments which a dispatcher
//! resolves from the event.
//!
//! ## Entries ([`HandlerEntry`])
//!
//! What every registration path is erased into: an id, a priority, the
//! declared event type, requested extras and the callable.
//!
//! ## Dispatchers ([`Dispatcher`])
//!
//! Object-safe interface over the engines in `tidings-std`.
//!
//! # Error Types
//!
//! - [`HandlerError`] - one invocation failed
//! - [`HandlerFailure`] - an invocation failure with handler context
//! - [`DispatchError`] - what a dispatch reports
//! - [`MalformedHandler`] - a listener declaration skipped at registration

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod dispatcher;
mod entry;
mod error;
mod event;
mod handler;
mod listener;

// Re-exports
pub use dispatcher::Dispatcher;
pub use entry::{Action, Extras, HandlerEntry, HandlerId, ListenerId};
pub use error::{BoxError, DispatchError, HandlerError, HandlerFailure, MalformedHandler, Malformation};
pub use event::{Ancestors, Ancestry, AnyEvent, Cancellable, Event, Extends, TypeTag, View};
pub use handler::{Handler, HandlerExt, IntoHandlerResult, Prioritized};
pub use listener::{Declaration, EventMethod, HandlerSet, Listener, MethodSpec};
