use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::BinderyError;

/// Output style of the console log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// Configuration for the telemetry subsystem.
#[derive(Debug)]
pub struct TelemetryConfig {
    service_name: String,
    otlp_endpoint: Option<String>,
    log_level: String,
    format: LogFormat,
}

impl TelemetryConfig {
    /// Creates a new configuration builder with default settings.
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.otlp_endpoint.as_deref()
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Installs the global `tracing` subscriber described by this
    /// configuration.
    ///
    /// The OTLP endpoint is only honored with the `otlp` feature; it needs a
    /// Tokio runtime to be running.
    pub fn init(self) -> Result<(), BinderyError> {
        let filter = EnvFilter::try_new(&self.log_level)?;

        let (compact, full) = match self.format {
            LogFormat::Compact => (Some(fmt::layer().compact()), None),
            LogFormat::Full => (None, Some(fmt::layer())),
        };

        let registry = tracing_subscriber::registry()
            .with(filter)
            .with(compact)
            .with(full);

        #[cfg(feature = "otlp")]
        if let Some(endpoint) = self.otlp_endpoint {
            let tracer = otlp::tracer(&self.service_name, endpoint)?;
            registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init()?;
            info!(service = %self.service_name, exporter = "otlp", "telemetry initialized");
            return Ok(());
        }

        registry.try_init()?;
        info!(service = %self.service_name, level = %self.log_level, "telemetry initialized");
        Ok(())
    }
}

/// Builder for `TelemetryConfig`.
#[derive(Default)]
pub struct TelemetryConfigBuilder {
    service_name: Option<String>,
    otlp_endpoint: Option<String>,
    log_level: Option<String>,
    format: Option<LogFormat>,
}

impl TelemetryConfigBuilder {
    /// Sets the service name reported with exported spans.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Sets the OTLP endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the log filter directive (default: "info").
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Sets the console format (default: `Full`).
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self
                .service_name
                .unwrap_or_else(|| "bindery-unknown".to_string()),
            otlp_endpoint: self.otlp_endpoint,
            log_level: self.log_level.unwrap_or_else(|| "info".to_string()),
            format: self.format.unwrap_or_default(),
        }
    }
}

#[cfg(feature = "otlp")]
mod otlp {
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::propagation::TraceContextPropagator;

    pub(super) fn tracer(
        service_name: &str,
        endpoint: String,
    ) -> Result<opentelemetry_sdk::trace::Tracer, opentelemetry::trace::TraceError> {
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

        let exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(endpoint);

        opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(opentelemetry_sdk::trace::config().with_resource(
                opentelemetry_sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                    "service.name",
                    service_name.to_string(),
                )]),
            ))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
    }
}

/// Shuts down the telemetry subsystem, flushing pending spans.
#[cfg(feature = "otlp")]
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
}
