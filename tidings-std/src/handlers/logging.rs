//! Logging handler for event observation.

use std::borrow::Cow;
use std::fmt::Debug;
use tidings_core::{BoxError, Handler};

/// A handler that traces every event it sees.
///
/// Register it with [`first`](Self::first) to see events as they arrive, or
/// with [`last`](Self::last) to see them after every other handler ran.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingHandler {
    priority: i32,
}

impl LoggingHandler {
    /// A logging handler at priority `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs before every other handler.
    pub fn first() -> Self {
        Self { priority: i32::MIN }
    }

    /// Runs after every other handler.
    pub fn last() -> Self {
        Self { priority: i32::MAX }
    }
}

impl<E: Debug + ?Sized> Handler<E> for LoggingHandler {
    fn handle(&self, event: &mut E) -> Result<(), BoxError> {
        tracing::info!(?event, priority = self.priority, "processing event");
        Ok(())
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("LoggingHandler")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ping;

    #[test]
    fn positions() {
        assert_eq!(Handler::<Ping>::priority(&LoggingHandler::first()), i32::MIN);
        assert_eq!(Handler::<Ping>::priority(&LoggingHandler::last()), i32::MAX);
        assert!(LoggingHandler::new().handle(&mut Ping).is_ok());
    }
}
