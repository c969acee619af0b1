//! Facade over the OpenTelemetry SDK for service instrumentation
//!
//! This crate hides the OpenTelemetry SDK behind a small vocabulary of its
//! own: one configuration call starts the right telemetry pipeline, spans
//! are created through role-specific constructors, and W3C trace context
//! travels across process boundaries as a plain serializable struct.
//!
//! - **Pipelines**: console (stdout exporters), exported (OTLP over HTTP to
//!   a collector), or disabled (no pipeline at all)
//! - **Spans**: service-entry, producer and consumer roles, parent/child
//!   linking, attribute bags flushed at close
//! - **Propagation**: `traceparent`/`tracestate` extraction and injection
//!   for cross-process trace continuity
//!
//! # Examples
//!
//! ## Configuration
//!
//! ```
//! use spanline::{InstrumentationConfig, OtlpEndpoints, TelemetryMode};
//!
//! let config = InstrumentationConfig::new("checkout", "1.4.2", TelemetryMode::Console);
//! assert_eq!(config.service_name, "checkout");
//! assert!(config.validate().is_ok());
//!
//! // exported mode needs one URL per signal
//! let exported = InstrumentationConfig::new("checkout", "1.4.2", TelemetryMode::Exported)
//!     .with_otlp(OtlpEndpoints::new(
//!         "http://collector:4318/v1/metrics",
//!         "http://collector:4318/v1/traces",
//!     ));
//! assert!(exported.validate().is_ok());
//! ```
//!
//! ## Spans and lineage
//!
//! ```
//! use spanline::{Instrumentation, InstrumentationConfig, Lineage, TelemetryMode};
//!
//! let telemetry = Instrumentation::new();
//! let config = InstrumentationConfig::new("checkout", "1.4.2", TelemetryMode::Disabled);
//!
//! // the service-entry span is named from the service identity and
//! // becomes the active span
//! let entry = telemetry.service_entry(config).unwrap();
//! assert_eq!(entry.name(), "srv:checkout");
//!
//! // with no explicit lineage, new spans adopt the active span as parent
//! let work = telemetry.consumer("charge-card", Lineage::Active).unwrap();
//! assert_eq!(work.parent(), Some(&entry));
//!
//! // an explicit root ignores the active span
//! let detached = telemetry.producer("audit-event", Lineage::Root).unwrap();
//! assert!(detached.parent().is_none());
//!
//! work.set_attribute("payment.method", "card");
//! telemetry.end(&work);
//! ```
//!
//! ## Cross-process continuation (requires a running collector)
//!
//! ```no_run
//! use spanline::{global, InstrumentationConfig, Lineage, OtlpEndpoints, TelemetryMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InstrumentationConfig::new("orders", "2.0.0", TelemetryMode::Exported)
//!     .with_otlp(OtlpEndpoints::new(
//!         "http://localhost:4318/v1/metrics",
//!         "http://localhost:4318/v1/traces",
//!     ));
//!
//! let entry = global().service_entry(config)?;
//!
//! // hand the trace over to another service...
//! let outbound = global().producer("enqueue-order", Lineage::Active)?;
//! let headers = global().propagate(&outbound);
//!
//! // ...and on the receiving side, continue it
//! let inbound = global().consumer("process-order", headers)?;
//! global().end(&inbound);
//! global().end(&outbound);
//! global().end(&entry);
//! global().shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod instrumentation;
pub mod otel;
pub mod propagation;
pub mod span;

pub use config::{InstrumentationConfig, OtlpEndpoints, TelemetryMode};
pub use error::{TelemetryError, TelemetryResult};
pub use instrumentation::{global, Instrumentation};
pub use otel::OtelSdk;
pub use propagation::Propagation;
pub use span::{BagValue, Lineage, Span, SpanBag, SpanRole, Spannable};

// Re-export commonly used OpenTelemetry types
pub use opentelemetry::trace::TraceContextExt;
pub use opentelemetry::{Context as OtelContext, KeyValue};
