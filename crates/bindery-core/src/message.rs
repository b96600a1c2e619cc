use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::ServiceTypeSupport;

/// A payload type that can travel through the type-erased layer.
///
/// Usually derived with `#[derive(Message)]`.
pub trait Message: Default + Clone + Send + Sync + 'static {
    /// Stable, fully qualified message type name, e.g. `demo/msg/Sample`.
    const TYPE_NAME: &'static str;
}

/// A compile-time remote-call contract: one request type, one response type.
///
/// Usually derived with `#[derive(Service)]`, which also emits the static
/// descriptor returned by [`ServiceType::type_support`].
pub trait ServiceType: 'static {
    type Request: Message;
    type Response: Message;

    /// Fully qualified service name, `<package>/srv/<Type>`.
    const NAME: &'static str;

    /// The descriptor bound to this service type.
    ///
    /// Deterministic and side-effect free: always the same `'static`.
    fn type_support() -> &'static ServiceTypeSupport;
}

/// The three message kinds a service descriptor knows how to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Request,
    Response,
    Event,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Request => f.write_str("request"),
            MessageKind::Response => f.write_str("response"),
            MessageKind::Event => f.write_str("event"),
        }
    }
}
