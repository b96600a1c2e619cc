//! Event message lifecycle.
//!
//! [`EventLifecycle`] gives introspection code one create, use, destroy
//! protocol for event messages whether or not the service supports them.
//! Each attempt yields a [`ScopedEvent`] that destroys a live event on every
//! exit path.

use std::any::Any;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::allocator::Allocator;
use crate::descriptor::ServiceTypeSupport;
use crate::error::TypeSupportError;
use crate::event::{EventType, ServiceEvent, ServiceEventInfo};
use crate::handle::MessageHandle;
use crate::message::ServiceType;
use crate::registry::TypeSupportRegistry;

/// How much of a call is captured in event messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntrospectionState {
    /// No event messages are created.
    Off,
    /// Events carry call metadata only.
    Metadata,
    /// Events carry metadata and copies of the request and response.
    #[default]
    Contents,
}

/// Configuration of an [`EventLifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrospectionConfig {
    state: IntrospectionState,
}

impl IntrospectionConfig {
    /// Creates a new configuration builder with default settings.
    pub fn builder() -> IntrospectionConfigBuilder {
        IntrospectionConfigBuilder::default()
    }

    pub fn state(&self) -> IntrospectionState {
        self.state
    }
}

/// Builder for `IntrospectionConfig`.
#[derive(Default)]
pub struct IntrospectionConfigBuilder {
    state: Option<IntrospectionState>,
}

impl IntrospectionConfigBuilder {
    /// Sets the introspection state (default: `Contents`).
    pub fn state(mut self, state: IntrospectionState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> IntrospectionConfig {
        IntrospectionConfig {
            state: self.state.unwrap_or_default(),
        }
    }
}

/// Where one event message stands.
///
/// ```text
/// Unallocated ──create──▶ Live ──destroy──▶ Destroyed
///      │
///      └──(service opted out)──▶ Unsupported
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    /// No handle exists. Also the outcome when introspection is off or the
    /// allocator failed.
    Unallocated,
    /// A handle exists and is owned by the scope.
    Live,
    /// The service type does not support event messages. Terminal.
    Unsupported,
    /// The event was destroyed. Terminal.
    Destroyed,
}

/// Creates event messages for one service with one allocator.
pub struct EventLifecycle<'a> {
    type_support: &'static ServiceTypeSupport,
    allocator: &'a dyn Allocator,
    config: IntrospectionConfig,
}

impl<'a> EventLifecycle<'a> {
    pub fn new(type_support: &'static ServiceTypeSupport, allocator: &'a dyn Allocator) -> Self {
        Self {
            type_support,
            allocator,
            config: IntrospectionConfig::default(),
        }
    }

    pub fn for_service<S: ServiceType>(allocator: &'a dyn Allocator) -> Self {
        Self::new(S::type_support(), allocator)
    }

    /// Binds to the descriptor registered under `service`.
    pub fn from_registry(
        registry: &TypeSupportRegistry,
        service: &str,
        allocator: &'a dyn Allocator,
    ) -> Result<Self, TypeSupportError> {
        Ok(Self::new(registry.lookup_by_name(service)?, allocator))
    }

    pub fn with_config(mut self, config: IntrospectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn set_state(&mut self, state: IntrospectionState) {
        self.config.state = state;
    }

    pub fn config(&self) -> &IntrospectionConfig {
        &self.config
    }

    pub fn type_support(&self) -> &'static ServiceTypeSupport {
        self.type_support
    }

    /// Whether the service type can produce event messages at all.
    pub fn is_supported(&self) -> bool {
        self.type_support.supports_events()
    }

    /// Creates an event stamped now, with an event type inferred from the
    /// payloads.
    pub fn create(&self, request: Option<&dyn Any>, response: Option<&dyn Any>) -> ScopedEvent<'a> {
        let info = ServiceEventInfo::new(EventType::inferred(response.is_some()));
        self.record(&info, request, response)
    }

    /// Creates an event carrying `info` and, depending on the introspection
    /// state, copies of the payloads.
    pub fn record(
        &self,
        info: &ServiceEventInfo,
        request: Option<&dyn Any>,
        response: Option<&dyn Any>,
    ) -> ScopedEvent<'a> {
        let mut scope = ScopedEvent {
            type_support: self.type_support,
            allocator: self.allocator,
            handle: None,
            state: EventState::Unallocated,
        };

        if !self.is_supported() {
            scope.state = EventState::Unsupported;
            return scope;
        }

        let (request, response) = match self.config.state {
            IntrospectionState::Off => {
                trace!(service = self.type_support.name(), "introspection off");
                return scope;
            }
            IntrospectionState::Metadata => (None, None),
            IntrospectionState::Contents => (request, response),
        };

        match self
            .type_support
            .create_event_message_with_info(info, self.allocator, request, response)
        {
            Some(handle) => {
                scope.handle = Some(handle);
                scope.state = EventState::Live;
            }
            None => {
                debug!(
                    service = self.type_support.name(),
                    "event message not created"
                );
            }
        }
        scope
    }
}

/// Exclusive owner of at most one event message.
///
/// A live event is destroyed when the scope is dropped, unless it was
/// destroyed explicitly or released with [`into_handle`](Self::into_handle).
pub struct ScopedEvent<'a> {
    type_support: &'static ServiceTypeSupport,
    allocator: &'a dyn Allocator,
    handle: Option<MessageHandle>,
    state: EventState,
}

impl ScopedEvent<'_> {
    pub fn state(&self) -> EventState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == EventState::Live
    }

    pub fn handle(&self) -> Option<&MessageHandle> {
        self.handle.as_ref()
    }

    /// Typed view of the live event, if it belongs to `S`.
    pub fn event<S: ServiceType>(&self) -> Option<&ServiceEvent<S>> {
        self.handle.as_ref()?.downcast_ref::<ServiceEvent<S>>()
    }

    /// Destroys a live event. `false` in every other state.
    pub fn destroy(&mut self) -> bool {
        if self.state != EventState::Live {
            return false;
        }
        let destroyed = self
            .type_support
            .destroy_event_message(&mut self.handle, Some(self.allocator));
        if destroyed {
            self.state = EventState::Destroyed;
        }
        destroyed
    }

    /// Gives up ownership of the handle. The caller must pass it to
    /// `ServiceTypeSupport::destroy_event_message` with the same allocator.
    pub fn into_handle(mut self) -> Option<MessageHandle> {
        self.handle.take()
    }
}

impl Drop for ScopedEvent<'_> {
    fn drop(&mut self) {
        if self.handle.is_some() && !self.destroy() {
            warn!(
                service = self.type_support.name(),
                "failed to destroy event message on scope exit"
            );
        }
    }
}
