//! Error types for the instrumentation facade

use thiserror::Error;

/// Result type alias for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Telemetry error types
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Exporter construction failure, surfaced from the OTLP crate unmodified
    #[error(transparent)]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),

    /// Pipeline shutdown failure
    #[error(transparent)]
    Shutdown(#[from] opentelemetry_sdk::error::OTelSdkError),

    /// A native handle was attached to a span that already has one
    #[error("Span already has a native handle attached")]
    AlreadyAttached,

    /// A span operation ran before the pipeline was started
    #[error("Instrumentation has not been started")]
    NotStarted,
}
