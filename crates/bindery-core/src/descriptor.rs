use std::any::{Any, TypeId};
use std::fmt;
use std::ptr;

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::allocator::Allocator;
use crate::error::TypeSupportError;
use crate::event::{EventType, ServiceEventInfo};
use crate::handle::MessageHandle;
use crate::message::ServiceType;
use crate::ops::{EventTypeSupport, MessageTypeSupport};

/// Names a family of type-support implementations.
///
/// Identifiers are compared by address, never by name: two builds that
/// happen to pick the same string are still different libraries.
#[derive(Debug)]
pub struct TypeSupportIdentifier {
    name: &'static str,
}

impl TypeSupportIdentifier {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is(&self, other: &TypeSupportIdentifier) -> bool {
        ptr::eq(self, other)
    }
}

/// Identifier of the descriptors emitted by `#[derive(Service)]`.
pub static RUST_TYPESUPPORT_IDENTIFIER: TypeSupportIdentifier =
    TypeSupportIdentifier::new("bindery_typesupport_rust");

/// Identity token of one descriptor: its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSupportId(usize);

impl TypeSupportId {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn of(type_support: &ServiceTypeSupport) -> Self {
        Self(type_support as *const ServiceTypeSupport as usize)
    }
}

/// SHA-256 digest identifying a service's type description.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHash([u8; 32]);

impl TypeHash {
    const PREFIX: &'static str = "RIHS01_";

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, hex::encode(self.0))
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({self})")
    }
}

impl Serialize for TypeHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Serializable summary of a descriptor, for introspection listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceTypeInfo {
    pub name: &'static str,
    pub identifier: &'static str,
    pub request_type: &'static str,
    pub response_type: &'static str,
    pub supports_events: bool,
    pub type_hash: TypeHash,
}

/// Binds one service type to its type-erased operation bundles.
///
/// Built once per service type, in a `static`, and never mutated. Generic
/// code carries `&'static ServiceTypeSupport` around without knowing the
/// concrete request, response or event types.
pub struct ServiceTypeSupport {
    identifier: &'static TypeSupportIdentifier,
    name: &'static str,
    service_type: fn() -> TypeId,
    request: &'static dyn MessageTypeSupport,
    response: &'static dyn MessageTypeSupport,
    event: &'static dyn EventTypeSupport,
}

impl ServiceTypeSupport {
    pub const fn new<S: ServiceType>(
        request: &'static dyn MessageTypeSupport,
        response: &'static dyn MessageTypeSupport,
        event: &'static dyn EventTypeSupport,
    ) -> Self {
        Self {
            identifier: &RUST_TYPESUPPORT_IDENTIFIER,
            name: S::NAME,
            service_type: TypeId::of::<S>,
            request,
            response,
            event,
        }
    }

    /// Rebinds the descriptor to another type-support identifier.
    pub const fn with_identifier(mut self, identifier: &'static TypeSupportIdentifier) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn id(&self) -> TypeSupportId {
        TypeSupportId::of(self)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn identifier(&self) -> &'static TypeSupportIdentifier {
        self.identifier
    }

    pub fn service_type_id(&self) -> TypeId {
        (self.service_type)()
    }

    pub fn is_service<S: ServiceType>(&self) -> bool {
        self.service_type_id() == TypeId::of::<S>()
    }

    pub fn request_type_support(&self) -> &'static dyn MessageTypeSupport {
        self.request
    }

    pub fn response_type_support(&self) -> &'static dyn MessageTypeSupport {
        self.response
    }

    pub fn event_type_support(&self) -> &'static dyn EventTypeSupport {
        self.event
    }

    pub fn supports_events(&self) -> bool {
        self.event.is_supported()
    }

    /// Returns this descriptor if it was built for `identifier`.
    pub fn get_handle(
        &self,
        identifier: &'static TypeSupportIdentifier,
    ) -> Result<&Self, TypeSupportError> {
        if self.identifier.is(identifier) {
            Ok(self)
        } else {
            Err(TypeSupportError::IdentifierMismatch {
                requested: identifier.name(),
                provided: self.identifier.name(),
            })
        }
    }

    pub fn type_hash(&self) -> TypeHash {
        let mut hasher = Sha256::new();
        for part in [
            self.name,
            self.request.type_name(),
            self.response.type_name(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(b"\n");
        }
        TypeHash(hasher.finalize().into())
    }

    pub fn info(&self) -> ServiceTypeInfo {
        ServiceTypeInfo {
            name: self.name,
            identifier: self.identifier.name(),
            request_type: self.request.type_name(),
            response_type: self.response.type_name(),
            supports_events: self.supports_events(),
            type_hash: self.type_hash(),
        }
    }

    pub fn create_request(&self, allocator: &dyn Allocator) -> Option<MessageHandle> {
        self.request.create(self, allocator)
    }

    pub fn destroy_request(
        &self,
        handle: &mut Option<MessageHandle>,
        allocator: Option<&dyn Allocator>,
    ) -> bool {
        self.request.destroy(self, handle, allocator)
    }

    pub fn create_response(&self, allocator: &dyn Allocator) -> Option<MessageHandle> {
        self.response.create(self, allocator)
    }

    pub fn destroy_response(
        &self,
        handle: &mut Option<MessageHandle>,
        allocator: Option<&dyn Allocator>,
    ) -> bool {
        self.response.destroy(self, handle, allocator)
    }

    /// Creates an event message stamped now, with an event type inferred
    /// from the payloads.
    ///
    /// `None` means no event message is available. Callers treat that as a
    /// normal branch, not an error.
    pub fn create_event_message(
        &self,
        allocator: &dyn Allocator,
        request: Option<&dyn Any>,
        response: Option<&dyn Any>,
    ) -> Option<MessageHandle> {
        let info = ServiceEventInfo::new(EventType::inferred(response.is_some()));
        self.create_event_message_with_info(&info, allocator, request, response)
    }

    pub fn create_event_message_with_info(
        &self,
        info: &ServiceEventInfo,
        allocator: &dyn Allocator,
        request: Option<&dyn Any>,
        response: Option<&dyn Any>,
    ) -> Option<MessageHandle> {
        self.event.create(self, info, allocator, request, response)
    }

    /// Destroys an event message. On success the slot is cleared, so a
    /// repeated call sees `None` and returns `false`.
    pub fn destroy_event_message(
        &self,
        handle: &mut Option<MessageHandle>,
        allocator: Option<&dyn Allocator>,
    ) -> bool {
        self.event.destroy(self, handle, allocator)
    }
}

impl fmt::Debug for ServiceTypeSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTypeSupport")
            .field("name", &self.name)
            .field("identifier", &self.identifier.name())
            .field("request", &self.request.type_name())
            .field("response", &self.response.type_name())
            .field("supports_events", &self.supports_events())
            .finish()
    }
}
