//! Error types for tidings.
//!
//! - [`HandlerError`] - one handler invocation went wrong
//! - [`HandlerFailure`] - a [`HandlerError`] tagged with the handler and event involved
//! - [`DispatchError`] - what a dispatch call reports to its caller
//! - [`MalformedHandler`] - a listener declaration that was skipped at registration

use crate::entry::{HandlerEntry, HandlerId};
use crate::event::TypeTag;
use thiserror::Error;

/// A boxed error type for handler bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a single handler invocation.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler body returned an error.
    #[error(transparent)]
    Failed(BoxError),

    /// The handler body panicked and the dispatcher was configured to catch it.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The event could not be presented as the type the handler declared.
    #[error("view `{view}` cannot be used for a handler declared on `{declared}`")]
    ViewMismatch {
        /// Type exposed by the view the dispatcher selected.
        view: TypeTag,
        /// Type the handler declared.
        declared: TypeTag,
    },
}

impl From<BoxError> for HandlerError {
    fn from(err: BoxError) -> Self {
        HandlerError::Failed(err)
    }
}

/// A handler invocation error with the context needed to report it.
#[derive(Error, Debug)]
#[error("handler {id} `{name}` failed on `{event}`")]
pub struct HandlerFailure {
    /// Id of the failing handler.
    pub id: HandlerId,
    /// Display name of the failing handler.
    pub name: String,
    /// Concrete type of the event being dispatched.
    pub event: TypeTag,
    /// What went wrong.
    #[source]
    pub source: HandlerError,
}

impl HandlerFailure {
    /// Attaches handler and event context to an invocation error.
    pub fn new(entry: &HandlerEntry, event: TypeTag, source: HandlerError) -> Self {
        Self {
            id: entry.id(),
            name: entry.name().to_owned(),
            event,
            source,
        }
    }
}

/// Errors reported by a dispatch call.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A handler failed and the remaining handlers were not run.
    #[error(transparent)]
    Handler(#[from] HandlerFailure),

    /// Every handler ran; these ones failed.
    #[error("{} handler(s) failed during dispatch", .0.len())]
    Handlers(Vec<HandlerFailure>),
}

impl DispatchError {
    /// All failures carried by this error, in invocation order.
    pub fn failures(&self) -> &[HandlerFailure] {
        match self {
            DispatchError::Handler(failure) => std::slice::from_ref(failure),
            DispatchError::Handlers(failures) => failures,
        }
    }
}

/// Why a listener declaration could not become a handler.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformation {
    /// The marked method declares no event parameter.
    #[error("no event parameter declared")]
    MissingEvent,

    /// The declaration was never given a body to invoke.
    #[error("no handler body")]
    MissingBody,

    /// The dispatcher cannot supply the extra parameters the method asks for.
    #[error("extra parameters are not supported by this dispatcher")]
    UnsupportedExtras,
}

/// A listener declaration that was skipped at registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("listener `{listener}` declares malformed handler `{handler}`: {reason}")]
pub struct MalformedHandler {
    /// Listener type name.
    pub listener: &'static str,
    /// Declared method name.
    pub handler: String,
    /// Why it was skipped.
    pub reason: Malformation,
}
