// Derive output routed through the facade's `core` re-export.
use bindery::{Message, Service, ServiceType};

#[derive(Message, Default, Clone)]
#[message(name = "demo/msg/Unit", crate = "::bindery::core")]
struct Unit;

#[derive(Service)]
#[service(
    name = "demo/srv/Noop",
    request = Unit,
    response = Unit,
    crate = "::bindery::core"
)]
struct Noop;

fn main() {
    let ts = Noop::type_support();
    assert_eq!(ts.name(), "demo/srv/Noop");
    assert!(!ts.supports_events());
    assert!(ts.is_service::<Noop>());
}
