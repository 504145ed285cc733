//! Parameter providers.
//!
//! A provider computes an extra handler argument of type `T` from an event of
//! type `E`. Listener methods ask for such arguments by declaring parameters
//! after the event; they receive `None` when no provider is registered.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tidings_core::{Event, Extras, TypeTag};

type Resolver = Arc<dyn Fn(&dyn Any) -> Option<Box<dyn Any + Send>> + Send + Sync>;

/// `(event type, parameter type)` to resolver.
#[derive(Clone, Default)]
pub struct ProviderTable {
    resolvers: HashMap<(TypeTag, TypeTag), Resolver>,
}

impl ProviderTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers how to compute a `T` from an `E`.
    ///
    /// Returns `true` if a resolver for the same pair was replaced.
    pub fn provide<E, T, F>(&mut self, resolver: F) -> bool
    where
        E: Event,
        T: Send + 'static,
        F: Fn(&E) -> T + Send + Sync + 'static,
    {
        let resolver: Resolver = Arc::new(move |event: &dyn Any| {
            event
                .downcast_ref::<E>()
                .map(|event| Box::new(resolver(event)) as Box<dyn Any + Send>)
        });
        self.resolvers
            .insert((TypeTag::of::<E>(), TypeTag::of::<T>()), resolver)
            .is_some()
    }

    /// Whether a resolver exists for the pair.
    pub fn contains(&self, event: TypeTag, param: TypeTag) -> bool {
        self.resolvers.contains_key(&(event, param))
    }

    /// Resolves `params` for an event whose concrete type is `event_type`.
    pub fn resolve(&self, event_type: TypeTag, event: &dyn Any, params: &[TypeTag]) -> Extras {
        let slots = params
            .iter()
            .map(|param| {
                self.resolvers
                    .get(&(event_type, *param))
                    .and_then(|resolver| resolver(event))
            })
            .collect();
        Extras::new(slots)
    }

    /// Number of registered resolvers.
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Whether no resolver is registered.
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl fmt::Debug for ProviderTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.resolvers.keys()).finish()
    }
}
