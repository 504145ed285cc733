//! Direct functional registration.
//!
//! [`DirectDispatcher`] only knows closures and [`Handler`] objects. There is
//! no listener scanning and no parameter injection; handlers match on the
//! exact concrete event type.

use crate::config::DispatchConfig;
use crate::engine::{self, Plan, PlanCache};
use crate::registry::Registry;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tidings_core::{
    AnyEvent, BoxError, DispatchError, Dispatcher, Event, Handler, HandlerEntry, HandlerId, TypeTag,
};

/// Shares one handler between the entries issued for it across refreshes.
struct Shared<H>(Arc<H>);

impl<E, H> Handler<E> for Shared<H>
where
    E: Event,
    H: Handler<E>,
{
    fn handle(&self, event: &mut E) -> Result<(), BoxError> {
        self.0.handle(event)
    }

    fn priority(&self) -> i32 {
        self.0.priority()
    }

    fn name(&self) -> Cow<'static, str> {
        self.0.name()
    }
}

type Reissue = Arc<dyn Fn() -> HandlerEntry + Send + Sync>;

#[derive(Default)]
struct State {
    registry: Registry,
    plans: PlanCache,
    reissue: HashMap<HandlerId, Reissue>,
}

impl State {
    fn insert(&mut self, reissue: Reissue) -> HandlerId {
        let entry = self.registry.insert(reissue());
        self.reissue.insert(entry.id(), reissue);
        self.plans.invalidate();
        entry.id()
    }
}

/// Exact-match dispatcher for functional handlers.
///
/// Fails fast on handler errors unless configured otherwise.
#[derive(Default)]
pub struct DirectDispatcher {
    state: RwLock<State>,
    config: DispatchConfig,
}

impl DirectDispatcher {
    /// Create an empty dispatcher with the default configuration.
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

    /// Registers a handler for `E` at the priority it reports.
    pub fn register<E, H>(&self, handler: H) -> HandlerId
    where
        E: Event,
        H: Handler<E>,
    {
        let handler = Arc::new(handler);
        let reissue: Reissue =
            Arc::new(move || HandlerEntry::from_handler::<E, _>(Shared(handler.clone())));
        let id = self.state.write().insert(reissue);
        tracing::debug!(%id, event = std::any::type_name::<E>(), "registered handler");
        id
    }

    /// Removes the handler `id` if it is registered for `E`.
    pub fn unregister<E: Event>(&self, id: HandlerId) -> bool {
        let mut state = self.state.write();
        let belongs = state
            .registry
            .get(id)
            .is_some_and(|entry| entry.event() == TypeTag::of::<E>());
        if !belongs {
            return false;
        }
        state.registry.remove_by_id(id);
        state.reissue.remove(&id);
        state.plans.invalidate();
        true
    }

    /// Removes every handler registered for `E`, returning them in dispatch order.
    pub fn unregister_type<E: Event>(&self) -> Option<Vec<Arc<HandlerEntry>>> {
        let mut state = self.state.write();
        let removed = state.registry.remove_type(TypeTag::of::<E>())?;
        for entry in &removed {
            state.reissue.remove(&entry.id());
        }
        state.plans.invalidate();
        Some(removed)
    }

    /// Re-reads the handler's priority and replaces its entry.
    ///
    /// The replacement is appended after handlers of equal priority and gets
    /// a new id, which is returned. `None` if `id` is not registered.
    pub fn refresh(&self, id: HandlerId) -> Option<HandlerId> {
        let mut state = self.state.write();
        let reissue = state.reissue.remove(&id)?;
        state.registry.remove_by_id(id);
        let fresh = state.insert(reissue);
        tracing::debug!(old = %id, new = %fresh, "refreshed handler");
        Some(fresh)
    }

    /// Handlers registered for `E`, in dispatch order.
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
        let plan = Plan::exact(ancestry.concrete(), state.registry.lookup(tag));
        state.plans.insert(plan)
    }
}

impl Dispatcher for DirectDispatcher {
    fn dispatch_any(&self, event: AnyEvent<'_>) -> Result<(), DispatchError> {
        let plan = self.plan(&event);
        engine::run(&plan, event, None, &self.config)
    }

    fn unregister_all(&self) {
        let mut state = self.state.write();
        state.registry.clear();
        state.reissue.clear();
        state.plans.invalidate();
    }
}
