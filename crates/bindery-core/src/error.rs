use thiserror::Error;

/// Configuration-level failures of the type-support layer.
///
/// Create and destroy never produce these: they report through `None` and
/// `false`. These surface when a descriptor is looked up or registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeSupportError {
    /// No descriptor was registered for the requested service.
    #[error("type support not found for service `{0}`")]
    NotFound(String),

    /// A descriptor with the same service name is already registered.
    #[error("type support for service `{0}` is already registered")]
    Duplicate(String),

    /// The service name is not of the form `<package>/srv/<Type>`.
    #[error("invalid service type name `{name}`: {reason}")]
    InvalidTypeName { name: String, reason: &'static str },

    /// The descriptor was built for a different type-support identifier.
    #[error("type support identifier `{requested}` is not supported by this library (`{provided}`)")]
    IdentifierMismatch {
        requested: &'static str,
        provided: &'static str,
    },
}
