//! # Events and Ancestry
//!
//! Any `'static + Send` value can be an event once it implements [`Event`].
//! Its concrete type is the dispatch key.
//!
//! Exact-match dispatchers only ever look at the concrete type. The
//! listener-scan dispatcher additionally delivers an event to handlers declared
//! for one of its *ancestors*: wider types the event can be viewed as, listed
//! by [`Event::ancestors`] and backed by [`Extends`]. An ancestor is either a
//! trait object such as `dyn Cancellable` or an embedded event struct.
//!
//! ```rust,ignore
//! struct NameChange { name: String, cancelled: bool }
//!
//! impl Event for NameChange {
//!     fn ancestors(ancestors: &mut Ancestors<Self>) {
//!         ancestors.extends::<dyn Cancellable>();
//!     }
//! }
//!
//! impl Extends<dyn Cancellable> for NameChange {
//!     fn upcast(&mut self) -> &mut (dyn Cancellable + 'static) {
//!         self
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// A value that can be dispatched.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Event",
    label = "missing `Event` implementation",
    note = "Derive it with `#[derive(Event)]` or write `impl Event for {Self} {}`."
)]
pub trait Event: Any + Send {
    /// Declares the wider types this event can be viewed as.
    ///
    /// The event's own type is always included and need not be listed.
    fn ancestors(ancestors: &mut Ancestors<Self>)
    where
        Self: Sized,
    {
        let _ = ancestors;
    }
}

/// Advisory cancellation flag carried by an event.
///
/// Dispatchers never read it. Application code checks it after dispatch
/// returns and decides whether to apply the change the event describes.
pub trait Cancellable {
    /// Whether a handler has flagged the event as cancelled.
    fn is_cancelled(&self) -> bool;

    /// Sets or clears the cancellation flag.
    fn set_cancelled(&mut self, cancelled: bool);
}

/// Projection of an event onto one of its ancestor types.
pub trait Extends<S: ?Sized + 'static>: Event {
    /// Borrows the event as its ancestor `S`.
    fn upcast(&mut self) -> &mut S;
}

/// Runtime identity of a type, used for event types and requested parameter types.
///
/// Equality and hashing only consider the [`TypeId`]; the name is kept for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// The tag of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying [`TypeId`].
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeTag").field(&self.name).finish()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

struct Projection<S: ?Sized + 'static>(for<'a> fn(&'a mut dyn Any) -> Option<&'a mut S>);

fn identity<E: Event>(event: &mut dyn Any) -> Option<&mut E> {
    event.downcast_mut::<E>()
}

fn upcast<E, S>(event: &mut dyn Any) -> Option<&mut S>
where
    E: Extends<S>,
    S: ?Sized + 'static,
{
    event.downcast_mut::<E>().map(<E as Extends<S>>::upcast)
}

/// One way of looking at a concrete event: the event itself or one of its ancestors.
#[derive(Clone)]
pub struct View {
    target: TypeTag,
    projection: Arc<dyn Any + Send + Sync>,
}

impl View {
    /// The view of `E` as itself.
    pub fn identity<E: Event>() -> Self {
        Self::new::<E>(identity::<E>)
    }

    fn new<S: ?Sized + 'static>(project: for<'a> fn(&'a mut dyn Any) -> Option<&'a mut S>) -> Self {
        Self {
            target: TypeTag::of::<S>(),
            projection: Arc::new(Projection(project)),
        }
    }

    /// The type this view exposes.
    pub fn target(&self) -> TypeTag {
        self.target
    }

    /// Projects a type-erased event onto `S`.
    ///
    /// Returns `None` when `S` is not this view's target or the event is not
    /// of the concrete type the view was built for.
    pub fn project<'a, S: ?Sized + 'static>(&self, event: &'a mut dyn Any) -> Option<&'a mut S> {
        let projection = self.projection.downcast_ref::<Projection<S>>()?;
        (projection.0)(event)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View").field("target", &self.target).finish()
    }
}

/// Builder handed to [`Event::ancestors`].
pub struct Ancestors<E> {
    views: Vec<View>,
    _event: PhantomData<fn() -> E>,
}

impl<E: Event> Ancestors<E> {
    /// Declares `S` as an ancestor of `E`. Repeated declarations are ignored.
    pub fn extends<S: ?Sized + 'static>(&mut self) -> &mut Self
    where
        E: Extends<S>,
    {
        let target = TypeTag::of::<S>();
        if !self.views.iter().any(|view| view.target == target) {
            self.views.push(View::new::<S>(upcast::<E, S>));
        }
        self
    }
}

/// Every view of one concrete event type, its own type first.
#[derive(Clone, Debug)]
pub struct Ancestry {
    views: Vec<View>,
}

impl Ancestry {
    /// Collects the ancestry of `E`.
    pub fn of<E: Event>() -> Self {
        let mut ancestors = Ancestors::<E> {
            views: vec![View::identity::<E>()],
            _event: PhantomData,
        };
        E::ancestors(&mut ancestors);
        Self {
            views: ancestors.views,
        }
    }

    /// The view of the event as its concrete type.
    pub fn concrete(&self) -> &View {
        &self.views[0]
    }

    /// All views, concrete type first.
    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// The view targeting `tag`, if the event can be seen as that type.
    pub fn view_for(&self, tag: TypeTag) -> Option<&View> {
        self.views.iter().find(|view| view.target == tag)
    }
}

/// A borrowed, type-erased event on its way through a dispatcher.
pub struct AnyEvent<'a> {
    value: &'a mut dyn Any,
    tag: TypeTag,
    ancestry: fn() -> Ancestry,
}

impl<'a> AnyEvent<'a> {
    /// Erases a concrete event.
    pub fn new<E: Event>(event: &'a mut E) -> Self {
        Self {
            value: event,
            tag: TypeTag::of::<E>(),
            ancestry: Ancestry::of::<E>,
        }
    }

    /// The concrete event type.
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Computes the event's ancestry.
    pub fn ancestry(&self) -> Ancestry {
        (self.ancestry)()
    }

    /// Shared access to the event.
    pub fn value(&self) -> &dyn Any {
        &*self.value
    }

    /// Exclusive access to the event.
    pub fn value_mut(&mut self) -> &mut dyn Any {
        &mut *self.value
    }

    /// Downcasts back to the concrete type.
    pub fn downcast_mut<E: Event>(&mut self) -> Option<&mut E> {
        self.value.downcast_mut::<E>()
    }

    /// Reborrows for a shorter lifetime, so one event can visit several dispatchers.
    pub fn reborrow(&mut self) -> AnyEvent<'_> {
        AnyEvent {
            value: &mut *self.value,
            tag: self.tag,
            ancestry: self.ancestry,
        }
    }
}

impl fmt::Debug for AnyEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyEvent").field("tag", &self.tag).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rename {
        name: String,
        cancelled: bool,
    }

    impl Cancellable for Rename {
        fn is_cancelled(&self) -> bool {
            self.cancelled
        }

        fn set_cancelled(&mut self, cancelled: bool) {
            self.cancelled = cancelled;
        }
    }

    impl Event for Rename {
        fn ancestors(ancestors: &mut Ancestors<Self>) {
            ancestors
                .extends::<dyn Cancellable>()
                .extends::<dyn Cancellable>();
        }
    }

    impl Extends<dyn Cancellable> for Rename {
        fn upcast(&mut self) -> &mut (dyn Cancellable + 'static) {
            self
        }
    }

    struct Plain;

    impl Event for Plain {}

    #[test]
    fn ancestry_starts_with_concrete_type_and_deduplicates() {
        let ancestry = Ancestry::of::<Rename>();
        let targets: Vec<_> = ancestry.views().iter().map(View::target).collect();
        assert_eq!(
            targets,
            vec![TypeTag::of::<Rename>(), TypeTag::of::<dyn Cancellable>()]
        );
        assert_eq!(ancestry.concrete().target(), TypeTag::of::<Rename>());
    }

    #[test]
    fn view_projects_onto_trait_object() {
        let mut event = Rename {
            name: "Foo".into(),
            cancelled: false,
        };
        let ancestry = Ancestry::of::<Rename>();
        let view = ancestry.view_for(TypeTag::of::<dyn Cancellable>()).unwrap();

        let cancellable = view
            .project::<dyn Cancellable>(&mut event as &mut dyn Any)
            .unwrap();
        cancellable.set_cancelled(true);

        assert!(event.cancelled);
        assert_eq!(event.name, "Foo");
    }

    #[test]
    fn view_rejects_wrong_target_or_wrong_event() {
        let mut plain = Plain;
        let view = View::identity::<Rename>();
        assert!(view.project::<Rename>(&mut plain as &mut dyn Any).is_none());
        assert!(view.project::<Plain>(&mut plain as &mut dyn Any).is_none());
    }

    #[test]
    fn any_event_round_trips() {
        let mut event = Rename {
            name: "Bar".into(),
            cancelled: false,
        };
        let mut erased = AnyEvent::new(&mut event);
        assert_eq!(erased.tag(), TypeTag::of::<Rename>());
        assert_eq!(erased.ancestry().views().len(), 2);

        erased.reborrow().downcast_mut::<Rename>().unwrap().name = "Baz".into();
        assert!(erased.downcast_mut::<Plain>().is_none());
        assert_eq!(event.name, "Baz");
    }
}
