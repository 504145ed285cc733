//! Type-erased handler entries.
//!
//! Every registration path (closures, [`Handler`] objects, listener methods)
//! ends up as a [`HandlerEntry`]: an [`Action`] plus the metadata dispatchers
//! sort and match on.

use crate::error::{BoxError, HandlerError};
use crate::event::{Event, TypeTag, View};
use crate::handler::Handler;
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a registered handler.
///
/// Ids are unique for the lifetime of the process and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Issues a fresh id.
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a registered listener instance: the address of its `Arc`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

impl ListenerId {
    /// The id of the instance behind `listener`.
    pub fn of<L: ?Sized>(listener: &Arc<L>) -> Self {
        Self(Arc::as_ptr(listener) as *const () as usize)
    }
}

/// Extra arguments resolved for one handler invocation, in declaration order.
///
/// A slot is `None` when nothing could supply a value for it.
#[derive(Default)]
pub struct Extras {
    slots: Vec<Option<Box<dyn Any + Send>>>,
}

impl Extras {
    /// Wraps resolved slots.
    pub fn new(slots: Vec<Option<Box<dyn Any + Send>>>) -> Self {
        Self { slots }
    }

    /// No extra arguments.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Moves the value out of slot `index`.
    ///
    /// Returns `None` for an empty slot, an out-of-range index, a value of a
    /// different type, or a slot that was already taken.
    pub fn take<T: 'static>(&mut self, index: usize) -> Option<T> {
        let value = self.slots.get_mut(index)?.take()?;
        value.downcast::<T>().ok().map(|value| *value)
    }
}

impl fmt::Debug for Extras {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(Option::is_some))
            .finish()
    }
}

/// The callable half of a [`HandlerEntry`].
pub trait Action: Send + Sync {
    /// Runs the handler against `event`, seen through `view`.
    fn invoke(&self, event: &mut dyn Any, view: &View, extras: &mut Extras) -> Result<(), HandlerError>;
}

struct Typed<S: ?Sized, F> {
    body: F,
    _event: PhantomData<fn(&mut S)>,
}

impl<S, F> Action for Typed<S, F>
where
    S: ?Sized + 'static,
    F: Fn(&mut S, &mut Extras) -> Result<(), BoxError> + Send + Sync,
{
    fn invoke(&self, event: &mut dyn Any, view: &View, extras: &mut Extras) -> Result<(), HandlerError> {
        let event = view
            .project::<S>(event)
            .ok_or_else(|| HandlerError::ViewMismatch {
                view: view.target(),
                declared: TypeTag::of::<S>(),
            })?;
        (self.body)(event, extras).map_err(HandlerError::Failed)
    }
}

/// Erases a body declared on `S`.
pub(crate) fn action<S, F>(body: F) -> Box<dyn Action>
where
    S: ?Sized + 'static,
    F: Fn(&mut S, &mut Extras) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Box::new(Typed::<S, F> {
        body,
        _event: PhantomData,
    })
}

/// A registered handler: callable, priority, identity and matching metadata.
///
/// Entries are immutable. Changing a handler means registering a new entry,
/// which gets a new id.
pub struct HandlerEntry {
    id: HandlerId,
    name: Cow<'static, str>,
    priority: i32,
    event: TypeTag,
    extras: Vec<TypeTag>,
    owner: Option<ListenerId>,
    action: Box<dyn Action>,
}

impl HandlerEntry {
    /// An entry declared on `S`, running `body`.
    pub fn new<S, F>(name: impl Into<Cow<'static, str>>, body: F) -> Self
    where
        S: ?Sized + 'static,
        F: Fn(&mut S, &mut Extras) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::from_action(name, TypeTag::of::<S>(), action::<S, F>(body))
    }

    /// An entry around an already erased action.
    pub fn from_action(
        name: impl Into<Cow<'static, str>>,
        event: TypeTag,
        action: Box<dyn Action>,
    ) -> Self {
        Self {
            id: HandlerId::next(),
            name: name.into(),
            priority: 0,
            event,
            extras: Vec::new(),
            owner: None,
            action,
        }
    }

    /// An entry for a [`Handler`] object, taking its name and priority.
    pub fn from_handler<E, H>(handler: H) -> Self
    where
        E: Event,
        H: Handler<E>,
    {
        let name = handler.name();
        let priority = handler.priority();
        Self::new::<E, _>(name, move |event: &mut E, _: &mut Extras| handler.handle(event))
            .with_priority(priority)
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the requested extra parameter types.
    pub fn with_extras(mut self, extras: Vec<TypeTag>) -> Self {
        self.extras = extras;
        self
    }

    /// Marks the entry as belonging to a listener.
    pub fn with_owner(mut self, owner: ListenerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// The entry's id.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordering key; lower runs first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Declared event type.
    pub fn event(&self) -> TypeTag {
        self.event
    }

    /// Requested extra parameter types, in order.
    pub fn extras(&self) -> &[TypeTag] {
        &self.extras
    }

    /// The owning listener, for entries produced by scanning.
    pub fn owner(&self) -> Option<ListenerId> {
        self.owner
    }

    /// Runs the entry.
    pub fn invoke(&self, event: &mut dyn Any, view: &View, extras: &mut Extras) -> Result<(), HandlerError> {
        self.action.invoke(event, view, extras)
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("event", &self.event)
            .field("extras", &self.extras)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}
