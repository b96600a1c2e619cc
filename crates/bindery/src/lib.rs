// bindery facade
// Re-exports the core crate and adds application-level plumbing.

pub use bindery_core as core;

pub use bindery_core::{
    Allocator, AllocatorId, CountingAllocator, EventLifecycle, EventState, EventType,
    IntrospectionConfig, IntrospectionState, Message, MessageHandle, MessageKind,
    RegistryBuilder, ScopedEvent, Service, ServiceEvent, ServiceEventInfo, ServiceType,
    ServiceTypeSupport, SystemAllocator, TypeSupportError, TypeSupportRegistry,
};

mod error;
pub mod telemetry;

pub use error::BinderyError;
