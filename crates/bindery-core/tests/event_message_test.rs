use std::any::Any;
use std::sync::Arc;
use std::thread;

use bindery_core::{
    Allocator, CountingAllocator, EventType, Message, MessageKind, Service, ServiceEvent,
    ServiceEventInfo, ServiceType, SystemAllocator,
};

#[derive(Message, Default, Clone, Debug, PartialEq)]
#[message(name = "demo/msg/Text")]
struct Text {
    body: String,
}

#[derive(Message, Default, Clone, Debug, PartialEq)]
#[message(name = "demo/msg/Reading")]
struct Reading {
    sensor: String,
    value: f64,
}

#[derive(Message, Default, Clone, Debug, PartialEq)]
#[message(name = "demo/msg/Ack")]
struct Ack {
    accepted: bool,
}

#[derive(Service)]
#[service(name = "demo/srv/Echo", request = Text, response = Text)]
struct Echo;

#[derive(Service)]
#[service(name = "demo/srv/Telemetry", request = Reading, response = Ack, event)]
struct Telemetry;

fn reading() -> Reading {
    Reading {
        sensor: "thermo-1".to_string(),
        value: 21.5,
    }
}

#[test]
fn test_unsupported_create_never_allocates() {
    let allocator = CountingAllocator::new();
    let text = Text {
        body: "hi".to_string(),
    };

    let handle = Echo::type_support().create_event_message(
        &allocator,
        Some(&text as &dyn Any),
        Some(&text as &dyn Any),
    );

    assert!(handle.is_none());
    assert_eq!(allocator.allocations(), 0);
}

#[test]
fn test_echo_scenario() {
    let allocator = CountingAllocator::new();
    let ts = Echo::type_support();

    let mut handle = ts.create_event_message(&allocator, None, None);
    assert!(handle.is_none());
    assert!(!ts.destroy_event_message(&mut handle, Some(&allocator)));
    assert_eq!(allocator.allocations(), 0);
    assert_eq!(allocator.deallocations(), 0);
}

#[test]
fn test_telemetry_scenario() {
    let allocator = CountingAllocator::new();
    let ts = Telemetry::type_support();
    let request = reading();
    let response = Ack { accepted: true };

    let mut handle = ts.create_event_message(
        &allocator,
        Some(&request as &dyn Any),
        Some(&response as &dyn Any),
    );
    assert!(handle.is_some());
    assert_eq!(allocator.outstanding(), 1);

    assert!(ts.destroy_event_message(&mut handle, Some(&allocator)));
    assert!(handle.is_none());
    assert!(!ts.destroy_event_message(&mut handle, Some(&allocator)));

    assert_eq!(allocator.outstanding(), 0);
    assert_eq!(allocator.deallocations(), 1);
}

#[test]
fn test_destroy_guards_have_no_side_effect() {
    let allocator = CountingAllocator::new();
    let ts = Telemetry::type_support();

    let mut empty = None;
    assert!(!ts.destroy_event_message(&mut empty, Some(&allocator)));

    let mut handle = ts.create_event_message(&allocator, None, None);
    assert!(!ts.destroy_event_message(&mut handle, None));
    assert!(handle.is_some());
    assert_eq!(allocator.deallocations(), 0);
    assert_eq!(allocator.outstanding(), 1);

    assert!(ts.destroy_event_message(&mut handle, Some(&allocator)));
}

#[test]
fn test_mismatched_allocator_is_refused() {
    let creator = CountingAllocator::new();
    let stranger = CountingAllocator::new();
    let ts = Telemetry::type_support();

    let mut handle = ts.create_event_message(&creator, None, None);
    assert!(!ts.destroy_event_message(&mut handle, Some(&stranger)));
    assert!(!ts.destroy_event_message(&mut handle, Some(&SystemAllocator)));
    assert_eq!(stranger.deallocations(), 0);
    assert!(handle.is_some());

    assert!(ts.destroy_event_message(&mut handle, Some(&creator)));
    assert_eq!(creator.outstanding(), 0);
}

#[test]
fn test_round_trips_return_to_zero() {
    let allocator = CountingAllocator::new();
    let ts = Telemetry::type_support();
    let request = reading();
    let response = Ack { accepted: false };

    for i in 0..64 {
        let info = ServiceEventInfo::new(EventType::RequestReceived).with_sequence_number(i);
        let mut handle = ts.create_event_message_with_info(
            &info,
            &allocator,
            Some(&request as &dyn Any),
            (i % 2 == 0).then_some(&response as &dyn Any),
        );
        assert!(ts.destroy_event_message(&mut handle, Some(&allocator)));
    }

    assert_eq!(allocator.allocations(), 64);
    assert_eq!(allocator.deallocations(), 64);
    assert_eq!(allocator.outstanding(), 0);
}

#[test]
fn test_event_owns_copies() {
    let allocator = CountingAllocator::new();
    let ts = Telemetry::type_support();
    let mut request = reading();
    let info = ServiceEventInfo::new(EventType::RequestSent)
        .with_client_gid([1; 16])
        .with_sequence_number(7);

    let mut handle =
        ts.create_event_message_with_info(&info, &allocator, Some(&request as &dyn Any), None);
    request.value = -1.0;

    let event = handle
        .as_ref()
        .and_then(|h| h.downcast_ref::<ServiceEvent<Telemetry>>())
        .expect("telemetry event");
    assert_eq!(event.info, info);
    assert_eq!(event.request.as_ref().map(|r| r.value), Some(21.5));
    assert!(event.response.is_none());
    assert_eq!(handle.as_ref().map(|h| h.kind()), Some(MessageKind::Event));

    assert!(ts.destroy_event_message(&mut handle, Some(&allocator)));
    // The caller's request is still ours.
    assert_eq!(request.sensor, "thermo-1");
}

#[test]
fn test_wrong_payload_type_is_refused() {
    let allocator = CountingAllocator::new();
    let text = Text::default();

    let handle = Telemetry::type_support().create_event_message(
        &allocator,
        Some(&text as &dyn Any),
        None,
    );
    assert!(handle.is_none());
    assert_eq!(allocator.allocations(), 0);
}

#[test]
fn test_foreign_type_support_is_refused() {
    let allocator = CountingAllocator::new();
    let event_ops = Telemetry::type_support().event_type_support();

    let handle = event_ops.create(
        Echo::type_support(),
        &ServiceEventInfo::new(EventType::RequestSent),
        &allocator,
        None,
        None,
    );
    assert!(handle.is_none());
    assert_eq!(allocator.allocations(), 0);
}

#[test]
fn test_failed_allocation_yields_none() {
    let allocator = CountingAllocator::failing();
    let handle = Telemetry::type_support().create_event_message(&allocator, None, None);
    assert!(handle.is_none());
    assert_eq!(allocator.allocations(), 1);
    assert_eq!(allocator.outstanding(), 0);
}

#[test]
fn test_concurrent_callers_share_descriptor() {
    let allocator = Arc::new(CountingAllocator::new());

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let allocator = Arc::clone(&allocator);
            thread::spawn(move || {
                let ts = Telemetry::type_support();
                let request = reading();
                for i in 0..100 {
                    let info = ServiceEventInfo::new(EventType::ResponseSent)
                        .with_sequence_number(worker * 1000 + i);
                    let mut handle = ts.create_event_message_with_info(
                        &info,
                        &*allocator,
                        Some(&request as &dyn Any),
                        None,
                    );
                    let allocator: &dyn Allocator = &*allocator;
                    assert!(ts.destroy_event_message(&mut handle, Some(allocator)));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked");
    }
    assert_eq!(allocator.outstanding(), 0);
    assert_eq!(allocator.allocations(), 400);
}

#[test]
fn test_handles_move_across_threads() {
    let allocator = CountingAllocator::new();
    let ts = Telemetry::type_support();
    let handle = ts.create_event_message(&allocator, None, None);

    let mut handle = thread::scope(|scope| {
        scope
            .spawn(move || {
                assert!(handle.is_some());
                handle
            })
            .join()
            .expect("thread panicked")
    });

    assert!(ts.destroy_event_message(&mut handle, Some(&allocator)));
}
