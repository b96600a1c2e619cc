use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::message::ServiceType;

/// Which step of a remote call an event message describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RequestSent,
    RequestReceived,
    ResponseSent,
    ResponseReceived,
}

impl EventType {
    /// Server-side guess from the payloads at hand: a response means the
    /// call completed, anything else is a request that just arrived.
    pub fn inferred(has_response: bool) -> Self {
        if has_response {
            EventType::ResponseSent
        } else {
            EventType::RequestReceived
        }
    }
}

/// Metadata carried by every event message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEventInfo {
    pub event_type: EventType,
    pub stamp: SystemTime,
    /// Globally unique id of the client endpoint that issued the call.
    pub client_gid: [u8; 16],
    pub sequence_number: i64,
}

impl ServiceEventInfo {
    /// Metadata stamped with the current time.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            stamp: SystemTime::now(),
            client_gid: [0; 16],
            sequence_number: 0,
        }
    }

    pub fn with_stamp(mut self, stamp: SystemTime) -> Self {
        self.stamp = stamp;
        self
    }

    pub fn with_client_gid(mut self, client_gid: [u8; 16]) -> Self {
        self.client_gid = client_gid;
        self
    }

    pub fn with_sequence_number(mut self, sequence_number: i64) -> Self {
        self.sequence_number = sequence_number;
        self
    }
}

/// The event aggregate: call metadata plus copies of the payloads.
///
/// Payloads are `None` when they were not supplied, or when introspection
/// only records metadata. The event owns its copies; the caller's request
/// and response are never taken over.
pub struct ServiceEvent<S: ServiceType> {
    pub info: ServiceEventInfo,
    pub request: Option<S::Request>,
    pub response: Option<S::Response>,
}

impl<S: ServiceType> ServiceEvent<S> {
    pub fn new(info: ServiceEventInfo) -> Self {
        Self {
            info,
            request: None,
            response: None,
        }
    }

    pub fn has_payloads(&self) -> bool {
        self.request.is_some() || self.response.is_some()
    }
}

impl<S: ServiceType> fmt::Debug for ServiceEvent<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEvent")
            .field("service", &S::NAME)
            .field("info", &self.info)
            .field("request", &self.request.is_some())
            .field("response", &self.response.is_some())
            .finish()
    }
}
