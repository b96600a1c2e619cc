use thiserror::Error;

/// Unified error type for `bindery`.
///
/// Aggregates the configuration-level errors of the sub-crates into a single
/// type for application-level error handling. Message create and destroy
/// never produce these; they report through `None` and `false`.
#[derive(Error, Debug)]
pub enum BinderyError {
    /// Descriptor lookup or registration failed.
    #[error("type support error: {0}")]
    TypeSupport(#[from] bindery_core::TypeSupportError),

    /// The log filter directive could not be parsed.
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// A global subscriber is already installed.
    #[error("telemetry initialization failed: {0}")]
    TelemetryInit(#[from] tracing_subscriber::util::TryInitError),

    /// The OTLP exporter pipeline could not be built.
    #[cfg(feature = "otlp")]
    #[error("OTLP exporter error: {0}")]
    Otlp(#[from] opentelemetry::trace::TraceError),
}
