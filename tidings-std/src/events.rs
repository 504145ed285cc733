//! The typed event engine.
//!
//! [`Events`] accepts both registration styles (closures or [`Handler`]
//! objects via [`Events::on`], whole listeners via [`Events::register`]) and
//! resolves extra listener parameters through its [`ProviderTable`].
//!
//! Handlers match on the exact concrete event type.
//!
//! # Example
//!
//! ```rust,ignore
//! let events = Events::new();
//! events.on(|event: &mut NameChange| event.name = "Baz".into());
//! events.on((|event: &mut NameChange| event.name = "Lorem Ipsum".into()).with_priority(-1));
//!
//! let event = events.call(NameChange::new("Bar"))?;
//! assert_eq!(event.name, "Baz");
//! ```

use crate::config::DispatchConfig;
use crate::engine::{self, Plan, PlanCache};
use crate::provider::ProviderTable;
use crate::registry::Registry;
use crate::scanner::{self, Registered};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tidings_core::{
    AnyEvent, DispatchError, Dispatcher, Event, Handler, HandlerEntry, HandlerId, Listener,
    ListenerId, TypeTag,
};

#[derive(Default)]
struct State {
    registry: Registry,
    providers: Arc<ProviderTable>,
    plans: PlanCache,
    /// Registered listener instances. Holding them keeps their ids from being
    /// reused by another allocation while they are registered.
    listeners: HashMap<ListenerId, Arc<dyn Any + Send + Sync>>,
}

/// Exact-match dispatcher with listener scanning and parameter providers.
///
/// Fails fast on handler errors unless configured otherwise.
#[derive(Default)]
pub struct Events {
    state: RwLock<State>,
    config: DispatchConfig,
}

impl Events {
    /// Create an empty engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty engine with `config`.
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

    /// Registers a handler for `E`.
    pub fn on<E, H>(&self, handler: H) -> HandlerId
    where
        E: Event,
        H: Handler<E>,
    {
        let entry = HandlerEntry::from_handler::<E, H>(handler);
        let id = entry.id();
        tracing::debug!(%id, handler = entry.name(), priority = entry.priority(), "registering handler");

        let mut state = self.state.write();
        state.registry.insert(entry);
        state.plans.invalidate();
        id
    }

    /// Scans `listener` and registers its handler methods.
    ///
    /// Registering the same instance again replaces its previous entries: the
    /// ids in the earlier [`Registered`] stop being registered and only the
    /// ones returned by this call remain valid.
    pub fn register<L: Listener>(&self, listener: &Arc<L>) -> Registered {
        let scan = scanner::scan(listener);
        let owner = ListenerId::of(listener);

        let mut state = self.state.write();
        state.registry.remove_owner(owner);
        let inserted: Vec<_> = scan
            .entries
            .into_iter()
            .map(|entry| state.registry.insert(entry))
            .collect();
        state.listeners.insert(owner, listener.clone());
        state.plans.invalidate();
        Registered::new(inserted, scan.skipped)
    }

    /// Registers how to compute a `T` argument from an `E` event.
    ///
    /// Takes effect from the next dispatch. Returns `true` if an earlier
    /// provider for the same pair was replaced.
    pub fn provide<E, T, F>(&self, resolver: F) -> bool
    where
        E: Event,
        T: Send + 'static,
        F: Fn(&E) -> T + Send + Sync + 'static,
    {
        let mut state = self.state.write();
        Arc::make_mut(&mut state.providers).provide::<E, T, F>(resolver)
    }

    /// Removes one handler. Returns whether it was registered.
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut state = self.state.write();
        let removed = state.registry.remove_by_id(id).is_some();
        if removed {
            state.plans.invalidate();
        }
        removed
    }

    /// Removes every handler declared on `E`, returning them in dispatch order.
    pub fn unregister_type<E: Event>(&self) -> Option<Vec<Arc<HandlerEntry>>> {
        let mut state = self.state.write();
        let removed = state.registry.remove_type(TypeTag::of::<E>());
        if removed.is_some() {
            state.plans.invalidate();
        }
        removed
    }

    /// Removes every handler scanned from `listener`. Returns whether it was registered.
    pub fn unregister_listener<L: Listener>(&self, listener: &Arc<L>) -> bool {
        let owner = ListenerId::of(listener);
        let mut state = self.state.write();
        state.registry.remove_owner(owner);
        state.plans.invalidate();
        state.listeners.remove(&owner).is_some()
    }

    /// Drops the handlers scanned from `listener` and scans it again.
    ///
    /// Returns `None` if the listener is not registered.
    pub fn refresh<L: Listener>(&self, listener: &Arc<L>) -> Option<Registered> {
        if !self.state.read().listeners.contains_key(&ListenerId::of(listener)) {
            return None;
        }
        Some(self.register(listener))
    }

    /// Handlers declared on `E`, in dispatch order.
    pub fn handlers<E: Event>(&self) -> Vec<Arc<HandlerEntry>> {
        self.state.read().registry.handlers(TypeTag::of::<E>())
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.state.read().registry.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.state.read().registry.is_empty()
    }

    /// Dispatches `event` and returns it after every handler has run.
    pub fn call<E: Event>(&self, event: E) -> Result<E, DispatchError> {
        self.dispatch(event)
    }

    fn snapshot(&self, event: &AnyEvent<'_>) -> (Arc<Plan>, Arc<ProviderTable>) {
        let tag = event.tag();
        {
            let state = self.state.read();
            if let Some(plan) = state.plans.get(tag) {
                return (plan, state.providers.clone());
            }
        }

        let ancestry = event.ancestry();
        let mut state = self.state.write();
        let plan = match state.plans.get(tag) {
            Some(plan) => plan,
            None => {
                let plan = Plan::exact(ancestry.concrete(), state.registry.lookup(tag));
                state.plans.insert(plan)
            }
        };
        (plan, state.providers.clone())
    }
}

impl Dispatcher for Events {
    fn dispatch_any(&self, event: AnyEvent<'_>) -> Result<(), DispatchError> {
        let (plan, providers) = self.snapshot(&event);
        engine::run(&plan, event, Some(&providers), &self.config)
    }

    fn unregister_all(&self) {
        let mut state = self.state.write();
        state.registry.clear();
        state.listeners.clear();
        state.plans.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidings_core::{Extras, HandlerExt, HandlerSet, Malformation};

    #[derive(Debug)]
    struct Data(u32);

    impl Event for Data {}

    #[derive(Default)]
    struct Tally {
        seen: parking_lot::Mutex<Vec<Option<String>>>,
    }

    impl Listener for Tally {
        fn describe(handlers: &mut HandlerSet<Self>) {
            handlers
                .handler("record")
                .event::<Data>()
                .extra::<String>()
                .invoke(|tally: &Tally, _: &mut Data, extras: &mut Extras| {
                    tally.seen.lock().push(extras.take::<String>(0));
                });
            handlers.handler("broken").priority(3);
        }
    }

    #[test]
    fn closures_run_in_priority_order() {
        let events = Events::new();
        events.on(|data: &mut Data| data.0 = 1);
        events.on((|data: &mut Data| data.0 = 2).with_priority(-1));
        events.on((|data: &mut Data| data.0 = 3).with_priority(1));

        assert_eq!(events.call(Data(0)).unwrap().0, 3);
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn providers_apply_from_the_next_dispatch() {
        let events = Events::new();
        let tally = Arc::new(Tally::default());
        let registered = events.register(&tally);
        assert_eq!(registered.len(), 1);
        assert_eq!(registered.skipped()[0].reason, Malformation::MissingEvent);

        events.call(Data(1)).unwrap();
        events.provide::<Data, String, _>(|data| data.0.to_string());
        events.call(Data(1)).unwrap();

        assert_eq!(*tally.seen.lock(), [None, Some("1".to_string())]);
    }

    #[test]
    fn unregister_paths_invalidate_plans() {
        let events = Events::new();
        let id = events.on(|data: &mut Data| data.0 += 1);
        assert_eq!(events.call(Data(0)).unwrap().0, 1);

        assert!(events.unregister(id));
        assert!(!events.unregister(id));
        assert_eq!(events.call(Data(0)).unwrap().0, 0);

        events.on(|data: &mut Data| data.0 += 1);
        assert_eq!(events.unregister_type::<Data>().map(|list| list.len()), Some(1));
        assert!(events.unregister_type::<Data>().is_none());
        assert!(events.is_empty());
    }

    #[test]
    fn listener_lifecycle() {
        let events = Events::new();
        let tally = Arc::new(Tally::default());
        assert!(events.refresh(&tally).is_none());

        events.register(&tally);
        events.register(&tally);
        assert_eq!(events.len(), 1);

        let refreshed = events.refresh(&tally).unwrap();
        assert_eq!(refreshed.len(), 1);
        assert_eq!(events.len(), 1);

        assert!(events.unregister_listener(&tally));
        assert!(events.is_empty());
        assert!(!events.unregister_listener(&tally));
    }

    #[test]
    fn unregister_all_is_idempotent_and_keeps_providers() {
        let events = Events::new();
        let tally = Arc::new(Tally::default());
        events.provide::<Data, String, _>(|data| data.0.to_string());
        events.register(&tally);

        events.unregister_all();
        events.unregister_all();
        assert!(events.is_empty());

        events.register(&tally);
        events.call(Data(7)).unwrap();
        assert_eq!(*tally.seen.lock(), [Some("7".to_string())]);
    }

    struct Hollow;

    impl Listener for Hollow {
        fn describe(handlers: &mut HandlerSet<Self>) {
            handlers.handler("nothing");
        }
    }

    #[test]
    fn dropped_handlerless_listener_is_not_confused_with_a_new_one() {
        let events = Events::new();
        for _ in 0..32 {
            events.register(&Arc::new(Hollow));

            let fresh = Arc::new(Hollow);
            assert!(events.refresh(&fresh).is_none());
            assert!(!events.unregister_listener(&fresh));
        }
    }

    #[test]
    fn re_registering_invalidates_earlier_ids() {
        let events = Events::new();
        let tally = Arc::new(Tally::default());
        let first = events.register(&tally);
        let second = events.register(&tally);

        for id in first.ids() {
            assert!(!events.unregister(id));
        }
        for id in second.ids() {
            assert!(events.unregister(id));
        }
    }
}
