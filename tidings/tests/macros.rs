//! The derive and attribute macros, end to end.

use std::sync::{Arc, Mutex};
use tidings::{
    BatchDispatcher, Cancellable, DirectDispatcher, Dispatcher, Event, Events, Handler,
    Malformation, handler, listener,
};

mod common;
use common::{DataObject, NameChangeEvent};

// ============================================================================
// Event derive
// ============================================================================

trait Audited {
    fn audit_tag(&self) -> String;
}

#[derive(Event, Debug, Default)]
#[event(cancellable, extends(dyn Audited))]
struct Login {
    user: String,
    #[event(cancelled)]
    rejected: bool,
}

impl Audited for Login {
    fn audit_tag(&self) -> String {
        format!("login:{}", self.user)
    }
}

#[derive(Event, Debug, Default)]
struct AdminLogin {
    #[event(parent)]
    login: Login,
    level: u8,
}

#[test]
fn derived_cancellable_uses_marked_field() {
    let mut login = Login::default();
    login.set_cancelled(true);
    assert!(login.rejected);
    assert!(login.is_cancelled());
}

struct Auditor {
    tags: Mutex<Vec<String>>,
}

#[listener]
impl Auditor {
    #[handler]
    fn on_audited(&self, event: &mut dyn Audited) {
        self.tags.lock().unwrap().push(event.audit_tag());
    }

    #[handler(priority = 1)]
    fn on_login(&self, event: &mut Login) {
        event.user.make_ascii_uppercase();
    }

    #[handler(priority = 2)]
    fn on_admin(&self, event: &mut AdminLogin) {
        event.level += 1;
    }
}

#[test]
fn batch_delivers_through_derived_ancestors() {
    let batch = BatchDispatcher::new();
    let auditor = Arc::new(Auditor {
        tags: Mutex::new(Vec::new()),
    });
    batch.register(&auditor);

    let login = batch
        .dispatch(Login {
            user: "ada".into(),
            rejected: false,
        })
        .unwrap();
    assert_eq!(login.user, "ADA");

    let admin = batch
        .dispatch(AdminLogin {
            login: Login {
                user: "root".into(),
                rejected: false,
            },
            level: 1,
        })
        .unwrap();
    assert_eq!(admin.login.user, "ROOT");
    assert_eq!(admin.level, 2);

    assert_eq!(*auditor.tags.lock().unwrap(), ["login:ada"]);
}

// ============================================================================
// #[listener]
// ============================================================================

struct Greeter {
    greetings: Mutex<Vec<String>>,
}

#[listener]
impl Greeter {
    #[handler(priority = -1, name = "welcome")]
    fn greet(&self, event: &mut DataObject, label: Option<String>) {
        let label = label.unwrap_or_else(|| "anonymous".into());
        self.greetings.lock().unwrap().push(format!("hello {label}"));
        event.data += 1;
    }

    #[handler]
    fn rename(&self, event: &mut NameChangeEvent) -> Result<(), std::fmt::Error> {
        event.name = format!("{}!", event.name);
        Ok(())
    }

    #[handler]
    fn no_event(&self) {}

    #[allow(dead_code)]
    fn helper(&self) {}
}

fn greeter() -> Arc<Greeter> {
    Arc::new(Greeter {
        greetings: Mutex::new(Vec::new()),
    })
}

#[test]
fn listener_registration_reports_malformed_methods() {
    let events = Events::new();
    let registered = events.register(&greeter());

    assert_eq!(registered.len(), 2);
    assert_eq!(registered.skipped().len(), 1);
    assert_eq!(registered.skipped()[0].handler, "no_event");
    assert_eq!(registered.skipped()[0].reason, Malformation::MissingEvent);
}

#[test]
fn listener_extras_come_from_providers() {
    let events = Events::new();
    let greeter = greeter();
    events.register(&greeter);

    let data = events.call(DataObject { data: 1 }).unwrap();
    events.provide::<DataObject, String, _>(|data| format!("#{}", data.data));
    events.call(DataObject { data: 5 }).unwrap();

    assert_eq!(data.data, 2);
    assert_eq!(
        *greeter.greetings.lock().unwrap(),
        ["hello anonymous", "hello #5"]
    );
}

#[test]
fn listener_names_and_priorities_come_from_attributes() {
    let events = Events::new();
    events.register(&greeter());

    let handlers = events.handlers::<DataObject>();
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].priority(), -1);
    assert_eq!(handlers[0].name(), "Greeter::welcome");

    let renamed = events.call(NameChangeEvent::new("Bar")).unwrap();
    assert_eq!(renamed.name, "Bar!");
}

#[test]
fn batch_skips_methods_with_extras() {
    let batch = BatchDispatcher::new();
    let registered = batch.register(&greeter());

    let reasons: Vec<_> = registered
        .skipped()
        .iter()
        .map(|skipped| skipped.reason)
        .collect();
    assert!(reasons.contains(&Malformation::UnsupportedExtras));
    assert!(reasons.contains(&Malformation::MissingEvent));
    assert_eq!(registered.len(), 1);
}

#[test]
fn unregistering_a_listener_removes_all_its_handlers() {
    let events = Events::new();
    let greeter = greeter();
    events.register(&greeter);

    assert!(events.unregister_listener(&greeter));
    assert!(events.is_empty());
    assert!(!events.unregister_listener(&greeter));
    assert!(events.refresh(&greeter).is_none());
}

struct Qualified;

#[listener]
impl Qualified {
    #[tidings::handler(priority = 3)]
    fn bump(&self, event: &mut DataObject) {
        event.data += 10;
    }
}

#[test]
fn qualified_handler_attribute_is_recognised_on_methods() {
    let events = Events::new();
    let registered = events.register(&Arc::new(Qualified));

    assert_eq!(registered.len(), 1);
    assert_eq!(events.handlers::<DataObject>()[0].priority(), 3);
    assert_eq!(events.call(DataObject { data: 1 }).unwrap().data, 11);
}

// ============================================================================
// #[handler] on functions
// ============================================================================

#[handler(priority = -1)]
fn lorem_ipsum(event: &mut NameChangeEvent) {
    event.name = "Lorem Ipsum".into();
}

#[handler]
fn baz(event: &mut NameChangeEvent) {
    event.name = "Baz".into();
}

#[derive(Debug, thiserror::Error)]
#[error("negative data")]
struct Negative;

#[handler(name = "RejectNegative")]
fn reject_negative(event: &mut DataObject) -> Result<(), Negative> {
    if event.data < 0 {
        return Err(Negative);
    }
    Ok(())
}

#[handler]
fn cancel_everything(event: &mut dyn Cancellable) {
    event.set_cancelled(true);
}

#[test]
fn function_handlers_carry_priority_and_name() {
    assert_eq!(lorem_ipsum::PRIORITY, -1);
    assert_eq!(Handler::<NameChangeEvent>::name(&baz), "baz");
    assert_eq!(Handler::<DataObject>::name(&RejectNegative), "reject_negative");

    let direct = DirectDispatcher::new();
    direct.register(baz);
    direct.register(lorem_ipsum);

    let event = direct.dispatch(NameChangeEvent::new("Bar")).unwrap();
    assert_eq!(event.name, "Baz");
}

#[test]
fn function_handler_errors_surface() {
    let direct = DirectDispatcher::new();
    direct.register(RejectNegative);

    assert!(direct.dispatch(DataObject { data: 3 }).is_ok());
    let err = direct.dispatch(DataObject { data: -3 }).unwrap_err();
    assert_eq!(err.failures()[0].source.to_string(), "negative data");
}

#[test]
fn function_handler_on_trait_object() {
    let mut event = NameChangeEvent::new("Bar");
    Handler::<dyn Cancellable + 'static>::handle(&cancel_everything, &mut event).unwrap();
    assert!(event.is_cancelled());
}
