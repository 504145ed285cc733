//! Handler registry: event type to priority-ordered handler list.
//!
//! Lists are stored behind `Arc` and modified copy-on-write, so a snapshot
//! handed to an in-flight dispatch never changes under it.

use std::collections::HashMap;
use std::sync::Arc;
use tidings_core::{HandlerEntry, HandlerId, ListenerId, TypeTag};

/// A priority-ordered handler list.
pub type HandlerList = Arc<Vec<Arc<HandlerEntry>>>;

/// Event type to ordered handlers, plus an id index.
///
/// Every list is sorted by ascending priority. Entries with equal priority
/// keep the order they were inserted in.
#[derive(Default)]
pub struct Registry {
    lists: HashMap<TypeTag, HandlerList>,
    index: HashMap<HandlerId, Arc<HandlerEntry>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry under its declared event type.
    pub fn insert(&mut self, entry: HandlerEntry) -> Arc<HandlerEntry> {
        let entry = Arc::new(entry);
        let list = self.lists.entry(entry.event()).or_default();
        let handlers = Arc::make_mut(list);
        handlers.push(entry.clone());
        // `sort_by_key` is stable, which keeps insertion order among equals.
        handlers.sort_by_key(|handler| handler.priority());
        self.index.insert(entry.id(), entry.clone());
        entry
    }

    /// Snapshot of the handlers declared on exactly `event`.
    pub fn lookup(&self, event: TypeTag) -> Option<HandlerList> {
        self.lists.get(&event).cloned()
    }

    /// The handlers declared on exactly `event`, in dispatch order.
    pub fn handlers(&self, event: TypeTag) -> Vec<Arc<HandlerEntry>> {
        self.lists
            .get(&event)
            .map(|list| list.as_ref().clone())
            .unwrap_or_default()
    }

    /// Looks an entry up by id.
    pub fn get(&self, id: HandlerId) -> Option<&Arc<HandlerEntry>> {
        self.index.get(&id)
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: HandlerId) -> bool {
        self.index.contains_key(&id)
    }

    /// Removes one entry. Returns it if it was registered.
    pub fn remove_by_id(&mut self, id: HandlerId) -> Option<Arc<HandlerEntry>> {
        let entry = self.index.remove(&id)?;
        let event = entry.event();
        if let Some(list) = self.lists.get_mut(&event) {
            Arc::make_mut(list).retain(|handler| handler.id() != id);
            if list.is_empty() {
                self.lists.remove(&event);
            }
        }
        Some(entry)
    }

    /// Removes every entry declared on `event`, returning them in dispatch order.
    ///
    /// Returns `None` when nothing was registered for the type.
    pub fn remove_type(&mut self, event: TypeTag) -> Option<Vec<Arc<HandlerEntry>>> {
        let list = self.lists.remove(&event)?;
        for handler in list.iter() {
            self.index.remove(&handler.id());
        }
        Some(Arc::unwrap_or_clone(list))
    }

    /// Removes every entry produced from the listener `owner`.
    pub fn remove_owner(&mut self, owner: ListenerId) -> Vec<Arc<HandlerEntry>> {
        let owned: Vec<_> = self
            .index
            .values()
            .filter(|entry| entry.owner() == Some(owner))
            .map(|entry| entry.id())
            .collect();
        owned
            .into_iter()
            .filter_map(|id| self.remove_by_id(id))
            .collect()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Event types with at least one handler.
    pub fn event_types(&self) -> impl Iterator<Item = TypeTag> + '_ {
        self.lists.keys().copied()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.lists.clear();
        self.index.clear();
    }
}
