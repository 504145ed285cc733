//! Listener scanning.
//!
//! Turns a listener instance into handler entries: one per well-formed
//! declaration, bound to the instance, in declaration order. Malformed
//! declarations are skipped and reported.

use std::collections::BTreeMap;
use std::sync::Arc;
use tidings_core::{
    HandlerEntry, HandlerId, HandlerSet, Listener, ListenerId, MalformedHandler, Malformation,
};

/// Entries produced from one listener.
#[derive(Debug, Default)]
pub struct Scan {
    /// Well-formed entries, in declaration order.
    pub entries: Vec<HandlerEntry>,
    /// Declarations that were skipped.
    pub skipped: Vec<MalformedHandler>,
}

/// Scans `listener`'s declarations.
pub fn scan<L: Listener>(listener: &Arc<L>) -> Scan {
    collect(listener, true)
}

/// Scans `listener`, also skipping declarations that ask for extra parameters.
///
/// Used by dispatchers that have no way of resolving them.
pub fn scan_without_extras<L: Listener>(listener: &Arc<L>) -> Scan {
    collect(listener, false)
}

fn collect<L: Listener>(listener: &Arc<L>, allow_extras: bool) -> Scan {
    let owner = ListenerId::of(listener);
    let listener_type = short_type_name::<L>();
    let mut scan = Scan::default();

    for declaration in HandlerSet::<L>::describe().into_declarations() {
        let checked = declaration.validate().and_then(|event| {
            if allow_extras || declaration.extras().is_empty() {
                Ok(event)
            } else {
                Err(Malformation::UnsupportedExtras)
            }
        });
        let event = match checked {
            Ok(event) => event,
            Err(reason) => {
                let malformed = MalformedHandler {
                    listener: std::any::type_name::<L>(),
                    handler: declaration.name().to_owned(),
                    reason,
                };
                tracing::warn!(%malformed, "skipping handler");
                scan.skipped.push(malformed);
                continue;
            }
        };
        let name = format!("{listener_type}::{}", declaration.name());
        let priority = declaration.priority();
        let extras = declaration.extras().to_vec();
        let Some(action) = declaration.into_action(listener.clone()) else {
            continue;
        };
        scan.entries.push(
            HandlerEntry::from_action(name, event, action)
                .with_priority(priority)
                .with_extras(extras)
                .with_owner(owner),
        );
    }
    tracing::debug!(
        listener = listener_type,
        handlers = scan.entries.len(),
        skipped = scan.skipped.len(),
        "scanned listener"
    );
    scan
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    let base = name.split('<').next().unwrap_or(name);
    match base.rfind("::") {
        Some(index) => &name[index + 2..],
        None => name,
    }
}

/// Outcome of registering a listener.
#[derive(Debug, Default)]
pub struct Registered {
    handlers: BTreeMap<HandlerId, Arc<HandlerEntry>>,
    skipped: Vec<MalformedHandler>,
}

impl Registered {
    /// Wraps registered entries and skipped declarations.
    pub fn new(handlers: impl IntoIterator<Item = Arc<HandlerEntry>>, skipped: Vec<MalformedHandler>) -> Self {
        Self {
            handlers: handlers.into_iter().map(|entry| (entry.id(), entry)).collect(),
            skipped,
        }
    }

    /// Registered entries by id.
    pub fn handlers(&self) -> &BTreeMap<HandlerId, Arc<HandlerEntry>> {
        &self.handlers
    }

    /// Ids of the registered entries, ascending.
    pub fn ids(&self) -> impl Iterator<Item = HandlerId> + '_ {
        self.handlers.keys().copied()
    }

    /// Declarations that did not become handlers.
    pub fn skipped(&self) -> &[MalformedHandler] {
        &self.skipped
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidings_core::{Event, Extras, TypeTag};

    struct Rename(String);

    impl Event for Rename {}

    struct Audit;

    impl Listener for Audit {
        fn describe(handlers: &mut HandlerSet<Self>) {
            handlers
                .handler("late")
                .priority(5)
                .event::<Rename>()
                .invoke(|_: &Audit, event: &mut Rename, _: &mut Extras| event.0.push('!'));
            handlers.handler("no_event");
            handlers
                .handler("with_extra")
                .event::<Rename>()
                .extra::<String>()
                .invoke(|_: &Audit, _: &mut Rename, extras: &mut Extras| {
                    let _ = extras.take::<String>(0);
                });
        }
    }

    #[test]
    fn scan_binds_valid_declarations_in_order() {
        let listener = Arc::new(Audit);
        let scan = scan(&listener);

        let names: Vec<_> = scan.entries.iter().map(HandlerEntry::name).collect();
        assert_eq!(names, ["Audit::late", "Audit::with_extra"]);
        assert_eq!(scan.entries[0].priority(), 5);
        assert_eq!(scan.entries[1].extras(), [TypeTag::of::<String>()]);
        assert!(scan.entries.iter().all(|entry| entry.owner() == Some(ListenerId::of(&listener))));

        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].handler, "no_event");
        assert_eq!(scan.skipped[0].reason, Malformation::MissingEvent);
    }

    #[test]
    fn scan_without_extras_skips_parameterised_methods() {
        let scan = scan_without_extras(&Arc::new(Audit));

        assert_eq!(scan.entries.len(), 1);
        let reasons: Vec<_> = scan.skipped.iter().map(|skipped| skipped.reason).collect();
        assert_eq!(reasons, [Malformation::MissingEvent, Malformation::UnsupportedExtras]);
    }

    #[test]
    fn short_names_strip_paths() {
        assert_eq!(short_type_name::<Audit>(), "Audit");
    }
}
