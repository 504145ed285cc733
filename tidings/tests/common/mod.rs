#![allow(dead_code)]

use std::sync::Arc;
use tidings::{Cancellable, DispatchError, DispatcherDirectory, Event, Extras, HandlerSet, Listener};

// ============================================================================
// Test Event Types
// ============================================================================

#[derive(Event, Clone, Debug, Default)]
#[event(cancellable)]
pub struct NameChangeEvent {
    pub name: String,
    pub cancelled: bool,
}

impl NameChangeEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cancelled: false,
        }
    }
}

#[derive(Event, Clone, Debug, Default)]
pub struct DataObject {
    pub data: i32,
}

// ============================================================================
// Test Model
// ============================================================================

/// Applies a rename only if no handler cancelled it.
pub struct Foo {
    name: String,
    directory: Arc<DispatcherDirectory>,
}

impl Foo {
    pub fn new(name: impl Into<String>, directory: Arc<DispatcherDirectory>) -> Self {
        Self {
            name: name.into(),
            directory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), DispatchError> {
        let event = self.directory.dispatch(NameChangeEvent::new(name))?;
        if !event.is_cancelled() {
            self.name = event.name;
        }
        Ok(())
    }
}

// ============================================================================
// Test Listeners (hand-written descriptions)
// ============================================================================

pub struct NameChangeEventListener;

impl Listener for NameChangeEventListener {
    fn describe(handlers: &mut HandlerSet<Self>) {
        handlers
            .handler("foo_name_to_baz")
            .event::<NameChangeEvent>()
            .invoke(|_: &Self, event: &mut NameChangeEvent, _: &mut Extras| {
                event.name = "Baz".into();
            });
        handlers
            .handler("foo_name_to_lorem_ipsum")
            .priority(-1)
            .event::<NameChangeEvent>()
            .invoke(|_: &Self, event: &mut NameChangeEvent, _: &mut Extras| {
                event.name = "Lorem Ipsum".into();
            });
    }
}

pub struct NameChangeCanceller;

impl Listener for NameChangeCanceller {
    fn describe(handlers: &mut HandlerSet<Self>) {
        handlers
            .handler("cancel_any")
            .event::<dyn Cancellable>()
            .invoke(|_: &Self, event: &mut (dyn Cancellable + 'static), _: &mut Extras| {
                event.set_cancelled(true);
            });
    }
}

pub fn directory() -> Arc<DispatcherDirectory> {
    Arc::new(DispatcherDirectory::new())
}
