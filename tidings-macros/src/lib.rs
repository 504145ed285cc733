//! Procedural macros for tidings.
//!
//! - `#[derive(Event)]` - implements `Event` and declares ancestors
//! - `#[listener]` - implements `Listener` from `#[handler]` methods
//! - `#[handler]` - turns a free function into a `Handler` unit struct

use proc_macro::TokenStream;

mod event;
mod handler;
mod listener;

/// Derive macro for implementing the `Event` trait.
///
/// ```rust,ignore
/// #[derive(Event)]
/// #[event(cancellable)]
/// struct NameChange {
///     name: String,
///     cancelled: bool,
/// }
///
/// #[derive(Event)]
/// struct Renamed {
///     #[event(parent)]
///     change: NameChange,
/// }
/// ```
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    event::derive_event_impl(input)
}

/// Implements `Listener` for the type of an inherent `impl` block.
///
/// ```rust,ignore
/// #[listener]
/// impl Audit {
///     #[handler(priority = -1)]
///     fn on_rename(&self, event: &mut NameChange, data: Option<String>) {
///         // ...
///     }
/// }
/// ```
///
/// `#[handler(name = "...")]` overrides the method name used in logs.
#[proc_macro_attribute]
pub fn listener(attr: TokenStream, item: TokenStream) -> TokenStream {
    listener::listener_impl(attr, item)
}

/// Generates a `Handler` unit struct from a function taking `&mut Event`.
///
/// ```rust,ignore
/// #[handler(priority = -1)]
/// fn validate(event: &mut NameChange) -> Result<(), InvalidName> {
///     // ...
/// }
///
/// dispatcher.register(validate);
/// ```
///
/// `#[handler(name = "Validate")]` names the generated struct.
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    handler::handler_impl(attr, item)
}
