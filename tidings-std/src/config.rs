//! Dispatch configuration.

/// What a dispatcher does when a handler fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop at the first failure and report it.
    #[default]
    FailFast,
    /// Run every handler, then report all failures together.
    Collect,
    /// Run every handler and only log failures.
    Log,
}

/// Settings shared by all dispatchers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchConfig {
    error_policy: ErrorPolicy,
    catch_panics: bool,
}

impl DispatchConfig {
    /// Fail fast, let panics unwind.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the error policy.
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Converts handler panics into [`HandlerError::Panicked`] failures.
    ///
    /// [`HandlerError::Panicked`]: tidings_core::HandlerError::Panicked
    pub fn with_catch_panics(mut self, catch: bool) -> Self {
        self.catch_panics = catch;
        self
    }

    /// The error policy.
    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Whether panics are caught.
    pub fn catch_panics(&self) -> bool {
        self.catch_panics
    }
}
