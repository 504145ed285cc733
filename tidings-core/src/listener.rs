//! # Listeners
//!
//! A [`Listener`] groups handler methods that are registered together and
//! share one instance. Instead of discovering methods at runtime, a listener
//! describes them:
//!
//! ```rust,ignore
//! impl Listener for Audit {
//!     fn describe(handlers: &mut HandlerSet<Self>) {
//!         handlers
//!             .handler("on_rename")
//!             .priority(-1)
//!             .event::<NameChange>()
//!             .extra::<String>()
//!             .invoke(|audit: &Audit, event: &mut NameChange, extras: &mut Extras| {
//!                 audit.on_rename(event, extras.take::<String>(0))
//!             });
//!     }
//! }
//! ```
//!
//! `#[listener]` writes this for an `impl` block whose methods are marked
//! `#[handler]`.
//!
//! Extra arguments (everything after the event) are listed with
//! [`EventMethod::extra`] and arrive through [`Extras`], resolved per dispatch.

use crate::entry::{self, Action, Extras};
use crate::error::Malformation;
use crate::event::TypeTag;
use crate::handler::IntoHandlerResult;
use std::borrow::Cow;
use std::marker::PhantomData;
use std::sync::Arc;

/// An object whose methods handle events.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Listener`",
    label = "missing `Listener` implementation",
    note = "Add `#[listener]` to an `impl {Self}` block whose methods are marked `#[handler]`."
)]
pub trait Listener: Send + Sync + 'static {
    /// Declares the listener's handler methods, in source order.
    fn describe(handlers: &mut HandlerSet<Self>)
    where
        Self: Sized;
}

type Binder<L> = Box<dyn FnOnce(Arc<L>) -> Box<dyn Action>>;

/// One declared handler method, not yet bound to an instance.
pub struct Declaration<L> {
    name: Cow<'static, str>,
    priority: i32,
    event: Option<TypeTag>,
    extras: Vec<TypeTag>,
    binder: Option<Binder<L>>,
}

impl<L> Declaration<L> {
    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Declared event type, if any.
    pub fn event(&self) -> Option<TypeTag> {
        self.event
    }

    /// Declared extra parameter types.
    pub fn extras(&self) -> &[TypeTag] {
        &self.extras
    }

    /// Checks that the declaration can become a handler, returning its event type.
    pub fn validate(&self) -> Result<TypeTag, Malformation> {
        let event = self.event.ok_or(Malformation::MissingEvent)?;
        if self.binder.is_none() {
            return Err(Malformation::MissingBody);
        }
        Ok(event)
    }

    /// Binds the body to `listener`.
    pub fn into_action(self, listener: Arc<L>) -> Option<Box<dyn Action>> {
        self.binder.map(|bind| bind(listener))
    }
}

/// The declarations collected from [`Listener::describe`].
pub struct HandlerSet<L> {
    declarations: Vec<Declaration<L>>,
}

impl<L: Listener> HandlerSet<L> {
    /// Runs `L::describe` and collects what it declares.
    pub fn describe() -> Self {
        let mut set = Self {
            declarations: Vec::new(),
        };
        L::describe(&mut set);
        set
    }

    /// Starts a declaration for the method `name`.
    pub fn handler(&mut self, name: impl Into<Cow<'static, str>>) -> MethodSpec<'_, L> {
        self.declarations.push(Declaration {
            name: name.into(),
            priority: 0,
            event: None,
            extras: Vec::new(),
            binder: None,
        });
        let index = self.declarations.len() - 1;
        MethodSpec {
            declaration: &mut self.declarations[index],
        }
    }

    /// Number of declarations, malformed ones included.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// The declarations in order.
    pub fn into_declarations(self) -> Vec<Declaration<L>> {
        self.declarations
    }
}

/// A declaration whose event type is not known yet.
pub struct MethodSpec<'a, L> {
    declaration: &'a mut Declaration<L>,
}

impl<'a, L: Listener> MethodSpec<'a, L> {
    /// Sets the priority.
    pub fn priority(self, priority: i32) -> Self {
        self.declaration.priority = priority;
        self
    }

    /// Names the event parameter type.
    pub fn event<S: ?Sized + 'static>(self) -> EventMethod<'a, L, S> {
        self.declaration.event = Some(TypeTag::of::<S>());
        EventMethod {
            declaration: self.declaration,
            _event: PhantomData,
        }
    }
}

/// A declaration with a known event type.
pub struct EventMethod<'a, L, S: ?Sized> {
    declaration: &'a mut Declaration<L>,
    _event: PhantomData<fn(&mut S)>,
}

impl<L: Listener, S: ?Sized + 'static> EventMethod<'_, L, S> {
    /// Sets the priority.
    pub fn priority(self, priority: i32) -> Self {
        self.declaration.priority = priority;
        self
    }

    /// Appends an extra parameter of type `T`.
    pub fn extra<T: 'static>(self) -> Self {
        self.declaration.extras.push(TypeTag::of::<T>());
        self
    }

    /// Sets the method body.
    pub fn invoke<F, R>(self, body: F)
    where
        F: Fn(&L, &mut S, &mut Extras) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.declaration.binder = Some(Box::new(move |listener: Arc<L>| {
            entry::action::<S, _>(move |event: &mut S, extras: &mut Extras| {
                body(listener.as_ref(), event, extras).into_handler_result()
            })
        }));
    }
}
