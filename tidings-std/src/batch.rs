//! Listener-scan dispatcher with assignable matching.
//!
//! [`BatchDispatcher`] keeps one slot per registered listener. A dispatch
//! walks the slots in registration order and, inside each, runs every handler
//! whose declared type is one of the event's ancestry views: the concrete type,
//! an embedded parent event, or a trait object like `dyn Cancellable`.
//!
//! There is no provider table here. Methods that ask for extra parameters are
//! skipped at registration.

use crate::config::{DispatchConfig, ErrorPolicy};
use crate::engine::{self, Plan, PlanCache, Step};
use crate::scanner::{self, Registered};
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;
use tidings_core::{
    AnyEvent, DispatchError, Dispatcher, HandlerEntry, Listener, ListenerId, MalformedHandler,
};

/// One registered listener. Holding `instance` keeps its address, and so its
/// [`ListenerId`], from being reused while the slot exists.
struct Slot {
    instance: Arc<dyn Any + Send + Sync>,
    name: &'static str,
    handlers: Vec<Arc<HandlerEntry>>,
}

impl Slot {
    fn id(&self) -> ListenerId {
        ListenerId::of(&self.instance)
    }
}

#[derive(Default)]
struct State {
    slots: Vec<Slot>,
    plans: PlanCache,
}

impl State {
    fn position(&self, listener: ListenerId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id() == listener)
    }
}

/// Per-listener dispatcher delivering events to handlers of any ancestor type.
///
/// Logs handler failures, panics included, and carries on unless configured
/// otherwise.
pub struct BatchDispatcher {
    state: RwLock<State>,
    config: DispatchConfig,
}

impl Default for BatchDispatcher {
    fn default() -> Self {
        Self::with_config(
            DispatchConfig::new()
                .with_error_policy(ErrorPolicy::Log)
                .with_catch_panics(true),
        )
    }
}

impl BatchDispatcher {
    /// Create an empty dispatcher that logs failures and caught panics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty dispatcher with `config`.
    pub fn with_config(config: DispatchConfig) -> Self {
        Self {
            state: RwLock::default(),
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Scans and registers `listener`.
    ///
    /// Registering an instance that is already present replaces its slot in place.
    pub fn register<L: Listener>(&self, listener: &Arc<L>) -> Registered {
        let (slot, skipped) = Self::scan(listener);
        let handlers = slot.handlers.clone();

        let mut state = self.state.write();
        match state.position(slot.id()) {
            Some(index) => state.slots[index] = slot,
            None => state.slots.push(slot),
        }
        state.plans.invalidate();
        Registered::new(handlers, skipped)
    }

    /// Drops `listener`'s slot, rescans it and appends it after the other listeners.
    ///
    /// Returns `None` if the listener is not registered.
    pub fn refresh<L: Listener>(&self, listener: &Arc<L>) -> Option<Registered> {
        let (slot, skipped) = Self::scan(listener);
        let handlers = slot.handlers.clone();

        let mut state = self.state.write();
        let index = state.position(slot.id())?;
        state.slots.remove(index);
        state.slots.push(slot);
        state.plans.invalidate();
        Some(Registered::new(handlers, skipped))
    }

    /// Unregisters `listener`. Returns whether it was registered.
    pub fn remove<L: Listener>(&self, listener: &Arc<L>) -> bool {
        let mut state = self.state.write();
        let Some(index) = state.position(ListenerId::of(listener)) else {
            return false;
        };
        let slot = state.slots.remove(index);
        state.plans.invalidate();
        tracing::debug!(listener = slot.name, "removed listener");
        true
    }

    /// Handlers registered for `listener`, in priority order.
    pub fn handlers_of<L: Listener>(&self, listener: &Arc<L>) -> Vec<Arc<HandlerEntry>> {
        let state = self.state.read();
        state
            .position(ListenerId::of(listener))
            .map(|index| state.slots[index].handlers.clone())
            .unwrap_or_default()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.state.read().slots.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.state.read().slots.is_empty()
    }

    fn scan<L: Listener>(listener: &Arc<L>) -> (Slot, Vec<MalformedHandler>) {
        let scan = scanner::scan_without_extras(listener);
        let mut handlers: Vec<_> = scan.entries.into_iter().map(Arc::new).collect();
        handlers.sort_by_key(|entry| entry.priority());
        let slot = Slot {
            instance: listener.clone(),
            name: std::any::type_name::<L>(),
            handlers,
        };
        (slot, scan.skipped)
    }

    fn plan(&self, event: &AnyEvent<'_>) -> Arc<Plan> {
        let tag = event.tag();
        if let Some(plan) = self.state.read().plans.get(tag) {
            return plan;
        }

        let ancestry = event.ancestry();
        let mut state = self.state.write();
        if let Some(plan) = state.plans.get(tag) {
            return plan;
        }
        let steps = state
            .slots
            .iter()
            .flat_map(|slot| slot.handlers.iter())
            .filter_map(|entry| {
                ancestry
                    .view_for(entry.event())
                    .map(|view| Step::new(entry.clone(), view.clone()))
            })
            .collect();
        state.plans.insert(Plan::new(tag, steps))
    }
}

impl Dispatcher for BatchDispatcher {
    fn dispatch_any(&self, event: AnyEvent<'_>) -> Result<(), DispatchError> {
        let plan = self.plan(&event);
        engine::run(&plan, event, None, &self.config)
    }

    fn unregister_all(&self) {
        let mut state = self.state.write();
        state.slots.clear();
        state.plans.invalidate();
    }
}
