//! A collection of dispatchers keyed by their kind.
//!
//! Applications that use several dispatchers side by side keep them in a
//! [`DispatcherDirectory`] they own and pass around. There is no global
//! instance.
//!
//! ```rust,ignore
//! let directory = DispatcherDirectory::new();
//! directory.get::<DirectDispatcher>().register(|event: &mut NameChange| { /* ... */ });
//! directory.get::<BatchDispatcher>().register(&audit);
//!
//! // Visits both dispatchers, in the order they were added.
//! let event = directory.dispatch(NameChange::new("Foo"))?;
//! ```

use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tidings_core::{AnyEvent, DispatchError, Dispatcher, Event};

#[derive(Clone)]
struct Member {
    kind: TypeId,
    name: &'static str,
    any: Arc<dyn Any + Send + Sync>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Member {
    fn new<D: Dispatcher>(dispatcher: Arc<D>) -> Self {
        Self {
            kind: TypeId::of::<D>(),
            name: std::any::type_name::<D>(),
            any: dispatcher.clone(),
            dispatcher,
        }
    }

    fn downcast<D: Dispatcher>(&self) -> Option<Arc<D>> {
        self.any.clone().downcast::<D>().ok()
    }
}

/// Dispatchers by kind, in insertion order.
#[derive(Default)]
pub struct DispatcherDirectory {
    members: RwLock<Vec<Member>>,
}

impl DispatcherDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `dispatcher`, replacing any member of the same kind in place.
    pub fn add<D: Dispatcher>(&self, dispatcher: D) -> Arc<D> {
        let dispatcher = Arc::new(dispatcher);
        self.add_shared(dispatcher.clone());
        dispatcher
    }

    /// Adds an already shared dispatcher, replacing any member of the same kind in place.
    pub fn add_shared<D: Dispatcher>(&self, dispatcher: Arc<D>) {
        let member = Member::new(dispatcher);
        let mut members = self.members.write();
        match members.iter_mut().find(|existing| existing.kind == member.kind) {
            Some(existing) => *existing = member,
            None => {
                tracing::debug!(dispatcher = member.name, "adding dispatcher");
                members.push(member);
            }
        }
    }

    /// The member of kind `D`, created with `D::default()` on first access.
    pub fn get<D: Dispatcher + Default>(&self) -> Arc<D> {
        if let Some(dispatcher) = self.find::<D>() {
            return dispatcher;
        }
        let mut members = self.members.write();
        if let Some(dispatcher) = members
            .iter()
            .find(|member| member.kind == TypeId::of::<D>())
            .and_then(Member::downcast::<D>)
        {
            return dispatcher;
        }
        let dispatcher = Arc::new(D::default());
        let member = Member::new(dispatcher.clone());
        tracing::debug!(dispatcher = member.name, "creating dispatcher");
        members.push(member);
        dispatcher
    }

    /// The member of kind `D`, if present.
    pub fn find<D: Dispatcher>(&self) -> Option<Arc<D>> {
        self.members
            .read()
            .iter()
            .find(|member| member.kind == TypeId::of::<D>())
            .and_then(Member::downcast::<D>)
    }

    /// Removes the member of kind `D`, returning it.
    pub fn remove<D: Dispatcher>(&self) -> Option<Arc<D>> {
        let mut members = self.members.write();
        let index = members
            .iter()
            .position(|member| member.kind == TypeId::of::<D>())?;
        members.remove(index).downcast::<D>()
    }

    /// Whether a member of kind `D` is present.
    pub fn has<D: Dispatcher>(&self) -> bool {
        self.members
            .read()
            .iter()
            .any(|member| member.kind == TypeId::of::<D>())
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// Removes every member. The dispatchers keep their handlers.
    pub fn clear(&self) {
        self.members.write().clear();
    }

    /// Sends `event` through every member, in insertion order.
    ///
    /// The first member that reports an error stops the broadcast.
    pub fn dispatch<E: Event>(&self, mut event: E) -> Result<E, DispatchError> {
        self.dispatch_mut(&mut event)?;
        Ok(event)
    }

    /// Like [`dispatch`](Self::dispatch), for an event the caller keeps.
    pub fn dispatch_mut<E: Event>(&self, event: &mut E) -> Result<(), DispatchError> {
        let members = self.members.read().clone();
        let mut event = AnyEvent::new(event);
        for member in &members {
            member.dispatcher.dispatch_any(event.reborrow())?;
        }
        Ok(())
    }

    /// Sends `event` to the member of kind `D` only, creating it if needed.
    pub fn dispatch_to<D, E>(&self, event: E) -> Result<E, DispatchError>
    where
        D: Dispatcher + Default,
        E: Event,
    {
        self.get::<D>().dispatch(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchDispatcher;
    use crate::direct::DirectDispatcher;
    use crate::events::Events;

    struct Trail(Vec<&'static str>);

    impl Event for Trail {}

    #[test]
    fn get_creates_once_and_shares() {
        let directory = DispatcherDirectory::new();
        assert!(!directory.has::<DirectDispatcher>());

        let first = directory.get::<DirectDispatcher>();
        let second = directory.get::<DirectDispatcher>();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(directory.has::<DirectDispatcher>());
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn broadcast_visits_members_in_insertion_order() {
        let directory = DispatcherDirectory::new();
        directory
            .get::<Events>()
            .on(|trail: &mut Trail| trail.0.push("events"));
        directory
            .get::<DirectDispatcher>()
            .register(|trail: &mut Trail| trail.0.push("direct"));
        directory.get::<BatchDispatcher>();

        let trail = directory.dispatch(Trail(Vec::new())).unwrap();
        assert_eq!(trail.0, ["events", "direct"]);

        let routed = directory
            .dispatch_to::<DirectDispatcher, _>(Trail(Vec::new()))
            .unwrap();
        assert_eq!(routed.0, ["direct"]);
    }

    #[test]
    fn first_error_aborts_broadcast() {
        let directory = DispatcherDirectory::new();
        directory
            .get::<Events>()
            .on(|_: &mut Trail| Err::<(), _>("nope"));
        directory
            .get::<DirectDispatcher>()
            .register(|trail: &mut Trail| trail.0.push("direct"));

        let mut trail = Trail(Vec::new());
        assert!(directory.dispatch_mut(&mut trail).is_err());
        assert!(trail.0.is_empty());
    }

    #[test]
    fn add_replaces_and_remove_returns() {
        let directory = DispatcherDirectory::new();
        let original = directory.get::<Events>();
        directory.get::<DirectDispatcher>();
        let replacement = directory.add(Events::new());

        assert!(!Arc::ptr_eq(&original, &directory.get::<Events>()));
        assert!(Arc::ptr_eq(&replacement, &directory.get::<Events>()));
        assert_eq!(directory.len(), 2);

        assert!(directory.remove::<Events>().is_some());
        assert!(directory.remove::<Events>().is_none());
        assert!(directory.find::<Events>().is_none());

        directory.clear();
        assert!(directory.is_empty());
    }
}
