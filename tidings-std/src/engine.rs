//! Dispatch plans and the invocation loop shared by every dispatcher.
//!
//! A [`Plan`] is the ordered list of handlers one concrete event type visits,
//! each paired with the [`View`] it sees the event through. Plans are built
//! from a registry snapshot, cached per event type in a [`PlanCache`], and
//! thrown away whenever the registry changes.

use crate::config::{DispatchConfig, ErrorPolicy};
use crate::provider::ProviderTable;
use crate::registry::HandlerList;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tidings_core::{
    AnyEvent, DispatchError, Extras, HandlerEntry, HandlerError, HandlerFailure, TypeTag, View,
};

/// One handler invocation within a plan.
#[derive(Clone, Debug)]
pub struct Step {
    entry: Arc<HandlerEntry>,
    view: View,
}

impl Step {
    /// Pairs an entry with the view it receives.
    pub fn new(entry: Arc<HandlerEntry>, view: View) -> Self {
        Self { entry, view }
    }

    /// The handler.
    pub fn entry(&self) -> &Arc<HandlerEntry> {
        &self.entry
    }

    /// How the handler sees the event.
    pub fn view(&self) -> &View {
        &self.view
    }
}

/// The ordered handlers for one concrete event type.
#[derive(Clone, Debug)]
pub struct Plan {
    event: TypeTag,
    steps: Vec<Step>,
}

impl Plan {
    /// A plan from explicit steps.
    pub fn new(event: TypeTag, steps: Vec<Step>) -> Self {
        Self { event, steps }
    }

    /// Every handler declared on exactly the view's type, all seeing that view.
    pub fn exact(view: &View, handlers: Option<HandlerList>) -> Self {
        let steps = handlers
            .iter()
            .flat_map(|list| list.iter())
            .map(|entry| Step::new(entry.clone(), view.clone()))
            .collect();
        Self::new(view.target(), steps)
    }

    /// The concrete event type.
    pub fn event(&self) -> TypeTag {
        self.event
    }

    /// Steps in invocation order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan runs nothing.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Plans per concrete event type, valid until the next registry change.
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: HashMap<TypeTag, Arc<Plan>>,
}

impl PlanCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached plan for `event`.
    pub fn get(&self, event: TypeTag) -> Option<Arc<Plan>> {
        self.plans.get(&event).cloned()
    }

    /// Caches a plan, returning the shared handle.
    pub fn insert(&mut self, plan: Plan) -> Arc<Plan> {
        let plan = Arc::new(plan);
        self.plans.insert(plan.event(), plan.clone());
        plan
    }

    /// Drops every cached plan.
    pub fn invalidate(&mut self) {
        self.plans.clear();
    }

    /// Number of cached plans.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// Runs `plan` against `event`.
///
/// No lock may be held while this runs: handlers are free to dispatch or
/// register on the same dispatcher.
pub fn run(
    plan: &Plan,
    mut event: AnyEvent<'_>,
    providers: Option<&ProviderTable>,
    config: &DispatchConfig,
) -> Result<(), DispatchError> {
    let tag = event.tag();
    tracing::trace!(event = %tag, handlers = plan.len(), "dispatching");

    let mut failures = Vec::new();
    for step in plan.steps() {
        let entry = step.entry();
        let mut extras = resolve(entry, tag, event.value(), providers);
        let outcome = invoke(entry, step.view(), event.value_mut(), &mut extras, config.catch_panics());

        let Err(source) = outcome else {
            continue;
        };
        let failure = HandlerFailure::new(entry, tag, source);
        match config.error_policy() {
            ErrorPolicy::FailFast => return Err(failure.into()),
            ErrorPolicy::Collect => {
                log_failure(&failure);
                failures.push(failure);
            }
            ErrorPolicy::Log => log_failure(&failure),
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(DispatchError::Handlers(failures))
    }
}

fn resolve(
    entry: &HandlerEntry,
    tag: TypeTag,
    event: &dyn Any,
    providers: Option<&ProviderTable>,
) -> Extras {
    if entry.extras().is_empty() {
        return Extras::empty();
    }
    match providers {
        Some(providers) => providers.resolve(tag, event, entry.extras()),
        None => Extras::new(entry.extras().iter().map(|_| None).collect()),
    }
}

fn invoke(
    entry: &HandlerEntry,
    view: &View,
    event: &mut dyn Any,
    extras: &mut Extras,
    catch_panics: bool,
) -> Result<(), HandlerError> {
    if !catch_panics {
        return entry.invoke(event, view, extras);
    }
    panic::catch_unwind(AssertUnwindSafe(|| entry.invoke(event, view, extras)))
        .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

fn log_failure(failure: &HandlerFailure) {
    tracing::error!(
        handler = %failure.name,
        id = %failure.id,
        event = %failure.event,
        error = %failure.source,
        "handler failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use tidings_core::Event;

    struct Count(Vec<&'static str>);

    impl Event for Count {}

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.insert(HandlerEntry::new::<Count, _>("ok", |count: &mut Count, _: &mut Extras| {
            count.0.push("ok");
            Ok(())
        }));
        registry.insert(
            HandlerEntry::new::<Count, _>("fails", |count: &mut Count, _: &mut Extras| {
                count.0.push("fails");
                Err("boom".into())
            })
            .with_priority(-1),
        );
        registry
    }

    fn plan(registry: &Registry) -> Plan {
        Plan::exact(&View::identity::<Count>(), registry.lookup(TypeTag::of::<Count>()))
    }

    #[test]
    fn fail_fast_stops_at_first_failure() {
        let registry = registry();
        let mut count = Count(Vec::new());

        let err = run(&plan(&registry), AnyEvent::new(&mut count), None, &DispatchConfig::new()).unwrap_err();

        assert_eq!(count.0, ["fails"]);
        assert!(matches!(err, DispatchError::Handler(ref failure) if failure.name == "fails"));
    }

    #[test]
    fn collect_runs_everything_and_reports() {
        let registry = registry();
        let mut count = Count(Vec::new());
        let config = DispatchConfig::new().with_error_policy(ErrorPolicy::Collect);

        let err = run(&plan(&registry), AnyEvent::new(&mut count), None, &config).unwrap_err();

        assert_eq!(count.0, ["fails", "ok"]);
        assert_eq!(err.failures().len(), 1);
    }

    #[test]
    fn log_swallows_failures() {
        let registry = registry();
        let mut count = Count(Vec::new());
        let config = DispatchConfig::new().with_error_policy(ErrorPolicy::Log);

        run(&plan(&registry), AnyEvent::new(&mut count), None, &config).unwrap();

        assert_eq!(count.0, ["fails", "ok"]);
    }

    #[test]
    fn caught_panics_become_failures() {
        let mut registry = Registry::new();
        registry.insert(HandlerEntry::new::<Count, _>("panics", |_: &mut Count, _: &mut Extras| {
            panic!("handler exploded")
        }));
        let mut count = Count(Vec::new());
        let config = DispatchConfig::new().with_catch_panics(true);

        let err = run(&plan(&registry), AnyEvent::new(&mut count), None, &config).unwrap_err();

        match &err.failures()[0].source {
            HandlerError::Panicked(message) => assert_eq!(message, "handler exploded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn plan_cache_invalidates() {
        let registry = registry();
        let mut cache = PlanCache::new();
        let plan = cache.insert(plan(&registry));

        assert_eq!(plan.len(), 2);
        assert!(cache.get(TypeTag::of::<Count>()).is_some());
        cache.invalidate();
        assert!(cache.is_empty());
    }
}
