//! Testing utilities for tidings.
//!
//! Handlers that make it easy to observe what a dispatcher did.
//!
//! # Features
//!
//! - [`RecordingHandler`]: records a copy of every event it receives
//! - [`CountingHandler`]: counts invocations
//! - [`OrderLog`]: hands out [`Marker`] handlers that log their label, to check invocation order
//! - [`FailingHandler`]: always returns an error

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tidings_core::{BoxError, Handler};

// ============================================================================
// Recording Handler
// ============================================================================

/// A handler that records all events it receives.
///
/// Clones share the same record.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHandler::<NameChange>::new();
/// events.on(recorder.clone());
///
/// events.call(NameChange::new("Foo"))?;
/// assert_eq!(recorder.events()[0].name, "Foo");
/// ```
pub struct RecordingHandler<E: Clone> {
    events: Arc<Mutex<Vec<E>>>,
}

impl<E: Clone> RecordingHandler<E> {
    /// Create a new recording handler.
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get a clone of the recorded events.
    pub fn events(&self) -> Vec<E> {
        self.events.lock().clone()
    }

    /// Get the number of recorded events.
    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl<E: Clone> Default for RecordingHandler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> Clone for RecordingHandler<E> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
        }
    }
}

impl<E: Clone + Send + 'static> Handler<E> for RecordingHandler<E> {
    fn handle(&self, event: &mut E) -> Result<(), BoxError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

// ============================================================================
// Counting Handler
// ============================================================================

/// A handler that counts invocations, for any event type.
#[derive(Clone, Default)]
pub struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    /// Create a new counting handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current count.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset the counter.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

impl<E: ?Sized> Handler<E> for CountingHandler {
    fn handle(&self, _event: &mut E) -> Result<(), BoxError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Order Log
// ============================================================================

/// A shared log of labels, written by [`Marker`] handlers.
#[derive(Clone, Default)]
pub struct OrderLog {
    entries: Arc<Mutex<Vec<&'static str>>>,
}

impl OrderLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that appends `label` when invoked.
    pub fn marker(&self, label: &'static str) -> Marker {
        Marker {
            label,
            log: self.clone(),
        }
    }

    /// Appends `label` directly.
    pub fn push(&self, label: &'static str) {
        self.entries.lock().push(label);
    }

    /// The labels written so far.
    pub fn entries(&self) -> Vec<&'static str> {
        self.entries.lock().clone()
    }

    /// Clear the log.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Handler produced by [`OrderLog::marker`].
#[derive(Clone)]
pub struct Marker {
    label: &'static str,
    log: OrderLog,
}

impl<E: ?Sized> Handler<E> for Marker {
    fn handle(&self, _event: &mut E) -> Result<(), BoxError> {
        self.log.push(self.label);
        Ok(())
    }

    fn name(&self) -> std::borrow::Cow<'static, str> {
        std::borrow::Cow::Borrowed(self.label)
    }
}

// ============================================================================
// Failing Handler
// ============================================================================

/// A handler that always fails with the same message.
#[derive(Clone, Debug)]
pub struct FailingHandler {
    message: String,
}

impl FailingHandler {
    /// Create a handler failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<E: ?Sized> Handler<E> for FailingHandler {
    fn handle(&self, _event: &mut E) -> Result<(), BoxError> {
        Err(self.message.clone().into())
    }
}
