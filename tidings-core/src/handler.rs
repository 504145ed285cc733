//! # Functional Handlers
//!
//! A [`Handler`] is a plain callable registered against one event type. It
//! receives the event by `&mut` and may change it in place.
//!
//! # Usage Patterns
//!
//! 1. **Closure**: `|event: &mut NameChange| event.name = "Baz".into()`
//! 2. **Struct implementation**: `impl Handler<NameChange> for Validator`
//! 3. **Attribute**: `#[handler(priority = -1)]` on a free function generates
//!    a unit struct implementing [`Handler`]
//!
//! Priority defaults to `0`; lower values run first. Wrap a closure in
//! [`Prioritized`] (or call [`HandlerExt::with_priority`]) to change it.

use crate::error::BoxError;
use std::borrow::Cow;

/// Conversion of a handler's return value into a dispatch outcome.
///
/// - `()` always succeeds
/// - `Result<(), E>` fails with `E`
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be returned from a handler",
    label = "handlers return `()` or `Result<(), E>`",
    note = "Implement `IntoHandlerResult` for `{Self}` to use it as a handler return type."
)]
pub trait IntoHandlerResult {
    /// Converts the value.
    fn into_handler_result(self) -> Result<(), BoxError>;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_handler_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// Reaction logic bound to one event type.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle events of type `{E}`",
    label = "missing `Handler<{E}>` implementation",
    note = "Closures of the form `|event: &mut {E}| ...` implement `Handler<{E}>`."
)]
pub trait Handler<E: ?Sized>: Send + Sync + 'static {
    /// Reacts to the event.
    fn handle(&self, event: &mut E) -> Result<(), BoxError>;

    /// Ordering key; lower runs first.
    fn priority(&self) -> i32 {
        0
    }

    /// Name used in logs and failure reports.
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

impl<E, F, R> Handler<E> for F
where
    E: ?Sized,
    F: Fn(&mut E) -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
    fn handle(&self, event: &mut E) -> Result<(), BoxError> {
        (self)(event).into_handler_result()
    }
}

/// A handler with an explicit priority.
#[derive(Clone, Copy, Debug)]
pub struct Prioritized<H> {
    priority: i32,
    inner: H,
}

impl<H> Prioritized<H> {
    /// Gives `handler` the priority `priority`.
    pub fn new(priority: i32, handler: H) -> Self {
        Self {
            priority,
            inner: handler,
        }
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<E, H> Handler<E> for Prioritized<H>
where
    E: ?Sized,
    H: Handler<E>,
{
    fn handle(&self, event: &mut E) -> Result<(), BoxError> {
        self.inner.handle(event)
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn name(&self) -> Cow<'static, str> {
        self.inner.name()
    }
}

/// Combinators available on every [`Handler`].
pub trait HandlerExt<E: ?Sized>: Handler<E> + Sized {
    /// Overrides the handler's priority.
    fn with_priority(self, priority: i32) -> Prioritized<Self> {
        Prioritized::new(priority, self)
    }
}

impl<E: ?Sized, H: Handler<E>> HandlerExt<E> for H {}
