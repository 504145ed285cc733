//! Dispatcher core trait.

use crate::error::DispatchError;
use crate::event::{AnyEvent, Event};

/// Something that runs handlers for events.
///
/// The trait is object safe: implementations work on type-erased
/// [`AnyEvent`]s, and the typed entry points are provided on top.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Dispatcher`",
    label = "missing `Dispatcher` implementation",
    note = "Implement `dispatch_any` and `unregister_all` to make `{Self}` a dispatcher."
)]
pub trait Dispatcher: Send + Sync + 'static {
    /// Runs every matching handler against the event, synchronously.
    fn dispatch_any(&self, event: AnyEvent<'_>) -> Result<(), DispatchError>;

    /// Removes every registered handler. Calling it twice is harmless.
    fn unregister_all(&self);

    /// Dispatches an event the caller keeps ownership of.
    fn dispatch_mut<E: Event>(&self, event: &mut E) -> Result<(), DispatchError>
    where
        Self: Sized,
    {
        self.dispatch_any(AnyEvent::new(event))
    }

    /// Dispatches an event and hands it back, mutated by the handlers.
    fn dispatch<E: Event>(&self, mut event: E) -> Result<E, DispatchError>
    where
        Self: Sized,
    {
        self.dispatch_mut(&mut event)?;
        Ok(event)
    }
}
