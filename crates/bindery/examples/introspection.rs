use std::any::Any;

use bindery::telemetry::{LogFormat, TelemetryConfig};
use bindery::{
    BinderyError, CountingAllocator, EventLifecycle, EventState, EventType, Message, Service,
    ServiceEventInfo, ServiceType, TypeSupportRegistry,
};

#[derive(Message, Default, Clone, Debug)]
#[message(name = "demo/msg/Text")]
struct Text {
    body: String,
}

#[derive(Message, Default, Clone, Debug)]
#[message(name = "demo/msg/Reading")]
struct Reading {
    sensor: String,
    value: f64,
}

#[derive(Message, Default, Clone, Debug)]
#[message(name = "demo/msg/Ack")]
struct Ack {
    accepted: bool,
}

/// Plain echo service; it never produces event messages.
#[derive(Service)]
#[service(name = "demo/srv/Echo", request = Text, response = Text)]
struct Echo;

/// Telemetry ingestion; calls are recorded as event messages.
#[derive(Service)]
#[service(name = "demo/srv/Telemetry", request = Reading, response = Ack, event)]
struct Telemetry;

fn main() -> Result<(), BinderyError> {
    TelemetryConfig::builder()
        .service_name("bindery-introspection")
        .log_level("info,bindery_core=trace")
        .format(LogFormat::Compact)
        .build()
        .init()?;

    let registry = TypeSupportRegistry::builder()
        .register::<Echo>()?
        .register::<Telemetry>()?
        .build();

    for info in registry.infos() {
        println!(
            "{} [{}] events={} {}",
            info.name, info.identifier, info.supports_events, info.type_hash
        );
    }

    let allocator = CountingAllocator::new();

    // The transport only knows the service by name.
    let echo = EventLifecycle::from_registry(&registry, "demo/srv/Echo", &allocator)?;
    let text = Text {
        body: "hello".to_string(),
    };
    let event = echo.create(Some(&text as &dyn Any), Some(&text as &dyn Any));
    assert_eq!(event.state(), EventState::Unsupported);
    println!("{}: no event message available", Echo::NAME);
    drop(event);

    let telemetry = EventLifecycle::from_registry(&registry, Telemetry::NAME, &allocator)?;
    let reading = Reading {
        sensor: "thermo-1".to_string(),
        value: 21.5,
    };
    let ack = Ack { accepted: true };
    let info = ServiceEventInfo::new(EventType::ResponseSent)
        .with_client_gid([0xab; 16])
        .with_sequence_number(1);

    let mut event = telemetry.record(&info, Some(&reading), Some(&ack));
    if let Some(recorded) = event.event::<Telemetry>() {
        println!(
            "{}: event #{} request={:?} response={:?}",
            Telemetry::NAME,
            recorded.info.sequence_number,
            recorded.request,
            recorded.response
        );
    }
    assert!(event.destroy());
    assert_eq!(event.state(), EventState::Destroyed);

    println!("outstanding allocations: {}", allocator.outstanding());
    Ok(())
}
