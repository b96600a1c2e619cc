//! Type-erased lifecycle management for service messages.
//!
//! Transport and introspection code hold a `&'static ServiceTypeSupport` and
//! create or destroy request, response and event messages through it, with
//! an allocator supplied on every call, without being compiled against the
//! concrete message types.

// Lets the derive output (`::bindery_core::...`) resolve inside this crate.
extern crate self as bindery_core;

mod allocator;
mod descriptor;
mod error;
mod event;
mod handle;
mod lifecycle;
mod message;
mod ops;
mod registry;

pub use allocator::{Allocator, AllocatorId, CountingAllocator, SystemAllocator};
pub use descriptor::{
    RUST_TYPESUPPORT_IDENTIFIER, ServiceTypeInfo, ServiceTypeSupport, TypeHash, TypeSupportId,
    TypeSupportIdentifier,
};
pub use error::TypeSupportError;
pub use event::{EventType, ServiceEvent, ServiceEventInfo};
pub use handle::MessageHandle;
pub use lifecycle::{
    EventLifecycle, EventState, IntrospectionConfig, IntrospectionConfigBuilder,
    IntrospectionState, ScopedEvent,
};
pub use message::{Message, MessageKind, ServiceType};
pub use ops::{
    EventTypeSupport, MessageTypeSupport, TypedEventOps, TypedMessageOps, UnsupportedEventOps,
};
pub use registry::{RegistryBuilder, TypeSupportRegistry, validate_service_name};

pub use bindery_macros::{Message, Service};
