use bindery::{CountingAllocator, Message, Service, ServiceEvent, ServiceType};

#[derive(Message, Default, Clone)]
#[message(name = "demo/msg/Count")]
struct Count {
    n: u32,
}

#[derive(Service)]
#[service(name = "demo/srv/Increment", request = Count, response = Count, event)]
struct Increment;

fn main() {
    let allocator = CountingAllocator::new();
    let ts = Increment::type_support();
    assert!(ts.supports_events());

    let request = Count { n: 1 };
    let mut handle =
        ts.create_event_message(&allocator, Some(&request as &dyn std::any::Any), None);
    let n = handle
        .as_ref()
        .and_then(|h| h.downcast_ref::<ServiceEvent<Increment>>())
        .and_then(|event| event.request.as_ref())
        .map(|count| count.n);
    assert_eq!(n, Some(1));
    assert!(ts.destroy_event_message(&mut handle, Some(&allocator)));
    assert_eq!(allocator.outstanding(), 0);
}
