//! Type-erased operation bundles.
//!
//! Generic transport code only ever sees `&dyn MessageTypeSupport` and
//! `&dyn EventTypeSupport`. The typed implementations below are what the
//! derive macros wire into each service descriptor.

use std::any::{Any, TypeId};
use std::marker::PhantomData;

use tracing::{debug, trace};

use crate::allocator::Allocator;
use crate::descriptor::ServiceTypeSupport;
use crate::event::{ServiceEvent, ServiceEventInfo};
use crate::handle::{self, MessageHandle};
use crate::message::{Message, MessageKind, ServiceType};

/// Create/destroy for the request or the response message of a service.
pub trait MessageTypeSupport: Send + Sync + 'static {
    /// `Request` or `Response`.
    fn kind(&self) -> MessageKind;

    fn type_name(&self) -> &'static str;

    fn message_type(&self) -> TypeId;

    /// Allocates a default-initialized message. `None` on allocation failure
    /// or when `type_support` does not carry this bundle.
    fn create(
        &self,
        type_support: &ServiceTypeSupport,
        allocator: &dyn Allocator,
    ) -> Option<MessageHandle>;

    /// Destroys a message created by [`create`](Self::create).
    ///
    /// Returns `false` and does nothing when the slot is empty, the
    /// allocator is missing, or the handle was not created by this
    /// descriptor and allocator. On success the slot is cleared.
    fn destroy(
        &self,
        type_support: &ServiceTypeSupport,
        handle: &mut Option<MessageHandle>,
        allocator: Option<&dyn Allocator>,
    ) -> bool {
        handle::release(handle, allocator, type_support.id(), self.kind())
    }
}

/// Create/destroy for the optional event message of a service.
pub trait EventTypeSupport: Send + Sync + 'static {
    /// Compile-time capability of the service type.
    fn is_supported(&self) -> bool;

    /// Builds an event bundling `info` with the given payloads.
    ///
    /// The payloads are only read, never taken over. `None` means "no event
    /// message": the service type opted out, the payloads do not match the
    /// service, or the allocator failed.
    fn create(
        &self,
        type_support: &ServiceTypeSupport,
        info: &ServiceEventInfo,
        allocator: &dyn Allocator,
        request: Option<&dyn Any>,
        response: Option<&dyn Any>,
    ) -> Option<MessageHandle>;

    /// Destroys an event created by [`create`](Self::create), with the same
    /// guards as [`MessageTypeSupport::destroy`].
    fn destroy(
        &self,
        type_support: &ServiceTypeSupport,
        handle: &mut Option<MessageHandle>,
        allocator: Option<&dyn Allocator>,
    ) -> bool {
        handle::release(handle, allocator, type_support.id(), MessageKind::Event)
    }
}

/// Request or response bundle for the message type `M`.
pub struct TypedMessageOps<M> {
    kind: MessageKind,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Message> TypedMessageOps<M> {
    pub const fn request() -> Self {
        Self {
            kind: MessageKind::Request,
            _marker: PhantomData,
        }
    }

    pub const fn response() -> Self {
        Self {
            kind: MessageKind::Response,
            _marker: PhantomData,
        }
    }
}

impl<M: Message> MessageTypeSupport for TypedMessageOps<M> {
    fn kind(&self) -> MessageKind {
        self.kind
    }

    fn type_name(&self) -> &'static str {
        M::TYPE_NAME
    }

    fn message_type(&self) -> TypeId {
        TypeId::of::<M>()
    }

    fn create(
        &self,
        type_support: &ServiceTypeSupport,
        allocator: &dyn Allocator,
    ) -> Option<MessageHandle> {
        let bound = match self.kind {
            MessageKind::Request => type_support.request_type_support(),
            MessageKind::Response => type_support.response_type_support(),
            MessageKind::Event => return None,
        };
        if bound.message_type() != TypeId::of::<M>() {
            debug!(
                service = type_support.name(),
                message = M::TYPE_NAME,
                kind = %self.kind,
                "create refused: message type not bound to this type support"
            );
            return None;
        }

        MessageHandle::emplace(M::default(), self.kind, type_support.id(), allocator)
    }
}

/// Event bundle for services that opted out of event messages.
///
/// `create` always yields `None` without touching the allocator; `destroy`
/// keeps the usual guards, so `destroy(None, ..)` is a harmless `false`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedEventOps;

impl EventTypeSupport for UnsupportedEventOps {
    fn is_supported(&self) -> bool {
        false
    }

    fn create(
        &self,
        type_support: &ServiceTypeSupport,
        _info: &ServiceEventInfo,
        _allocator: &dyn Allocator,
        _request: Option<&dyn Any>,
        _response: Option<&dyn Any>,
    ) -> Option<MessageHandle> {
        trace!(service = type_support.name(), "event messages not supported");
        None
    }
}

/// Event bundle producing a [`ServiceEvent<S>`].
pub struct TypedEventOps<S> {
    _marker: PhantomData<fn() -> S>,
}

impl<S: ServiceType> TypedEventOps<S> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<S: ServiceType> Default for TypedEventOps<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn copy_payload<M: Message>(payload: Option<&dyn Any>) -> Result<Option<M>, &'static str> {
    match payload {
        None => Ok(None),
        Some(any) => any
            .downcast_ref::<M>()
            .map(|message| Some(message.clone()))
            .ok_or(M::TYPE_NAME),
    }
}

impl<S: ServiceType> EventTypeSupport for TypedEventOps<S> {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(
        &self,
        type_support: &ServiceTypeSupport,
        info: &ServiceEventInfo,
        allocator: &dyn Allocator,
        request: Option<&dyn Any>,
        response: Option<&dyn Any>,
    ) -> Option<MessageHandle> {
        if !type_support.is_service::<S>() {
            debug!(
                service = S::NAME,
                given = type_support.name(),
                "create refused: type support describes another service"
            );
            return None;
        }

        let (request, response) = match (
            copy_payload::<S::Request>(request),
            copy_payload::<S::Response>(response),
        ) {
            (Ok(request), Ok(response)) => (request, response),
            (Err(expected), _) | (_, Err(expected)) => {
                debug!(service = S::NAME, expected, "create refused: payload type mismatch");
                return None;
            }
        };

        let event = ServiceEvent::<S> {
            info: *info,
            request,
            response,
        };
        MessageHandle::emplace(event, MessageKind::Event, type_support.id(), allocator)
    }
}
