//! # tidings - Typed In-Process Event Dispatch
//!
//! `tidings` runs prioritised handlers against event values. Producers of a
//! state change build an event, hand it to a dispatcher, and get it back after
//! every interested handler has had the chance to inspect, change or cancel it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tidings::prelude::*;
//!
//! #[derive(Event)]
//! #[event(cancellable)]
//! struct NameChange {
//!     name: String,
//!     cancelled: bool,
//! }
//!
//! let events = Events::new();
//! events.on(|event: &mut NameChange| event.name = "Baz".into());
//! events.on((|event: &mut NameChange| event.name = "Lorem Ipsum".into()).with_priority(-1));
//!
//! let event = events.call(NameChange { name: "Bar".into(), cancelled: false })?;
//! assert_eq!(event.name, "Baz");
//! ```
//!
//! ## Listeners
//!
//! ```rust,ignore
//! struct Audit;
//!
//! #[listener]
//! impl Audit {
//!     #[handler(priority = 10)]
//!     fn veto(&self, event: &mut NameChange, owner: Option<String>) {
//!         if owner.as_deref() == Some("root") {
//!             event.set_cancelled(true);
//!         }
//!     }
//! }
//!
//! events.provide::<NameChange, String, _>(|event| event.name.clone());
//! events.register(&Arc::new(Audit));
//! ```
//!
//! ## Choosing a Dispatcher
//!
//! - [`Events`]: closures, handler objects and listeners; parameter providers
//! - [`DirectDispatcher`]: closures and handler objects only
//! - [`BatchDispatcher`]: listeners only; also delivers to handlers declared on
//!   an ancestor such as `dyn Cancellable`
//! - [`DispatcherDirectory`]: several dispatchers side by side

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use tidings_core::{
    // Actions and entries
    Action,
    // Events
    Ancestors,
    Ancestry,
    AnyEvent,
    // Errors
    BoxError,
    Cancellable,
    Declaration,
    DispatchError,
    // Dispatchers
    Dispatcher,
    Event,
    EventMethod,
    Extends,
    Extras,
    // Handlers
    Handler,
    HandlerEntry,
    HandlerError,
    HandlerExt,
    HandlerFailure,
    HandlerId,
    // Listeners
    HandlerSet,
    IntoHandlerResult,
    Listener,
    ListenerId,
    MalformedHandler,
    Malformation,
    MethodSpec,
    Prioritized,
    TypeTag,
    View,
};

pub use tidings_std::{
    BatchDispatcher, DirectDispatcher, DispatchConfig, DispatcherDirectory, ErrorPolicy, Events,
    LoggingHandler, ProviderTable, Registered, Registry,
};

/// Dispatch plans and the invocation loop.
pub mod engine {
    pub use tidings_std::engine::{Plan, PlanCache, Step, run};
}

/// Listener scanning.
pub mod scanner {
    pub use tidings_std::scanner::{Registered, Scan, scan, scan_without_extras};
}

/// Standard handler implementations.
pub mod handlers {
    #![allow(clippy::wildcard_imports)]
    pub use tidings_std::handlers::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use tidings_std::testing::*;
}

/// Prelude module - common imports for tidings.
///
/// # Usage
///
/// ```rust,ignore
/// use tidings::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BatchDispatcher,
        Cancellable,
        DirectDispatcher,
        DispatchConfig,
        DispatchError,
        // Core traits
        Dispatcher,
        DispatcherDirectory,
        ErrorPolicy,
        Event,
        Events,
        Extras,
        Handler,
        HandlerExt,
        HandlerId,
        HandlerSet,
        Listener,
    };

    #[cfg(feature = "macros")]
    pub use crate::{handler, listener};
}

#[cfg(feature = "macros")]
pub use tidings_macros::{Event, handler, listener};
