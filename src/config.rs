//! Configuration for the instrumentation pipeline

use serde::{Deserialize, Serialize};

use crate::error::{TelemetryError, TelemetryResult};

/// How telemetry leaves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryMode {
    /// Spans and metrics are written to stdout
    Console,
    /// Spans and metrics are delivered to an OTLP collector
    Exported,
    /// No pipeline is constructed at all
    Disabled,
}

/// Endpoint URLs for telemetry delivery, one per signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtlpEndpoints {
    /// Metrics endpoint URL
    pub metrics: String,

    /// Traces endpoint URL
    pub traces: String,
}

impl OtlpEndpoints {
    /// Create endpoints from per-signal URLs
    pub fn new(metrics: impl Into<String>, traces: impl Into<String>) -> Self {
        Self {
            metrics: metrics.into(),
            traces: traces.into(),
        }
    }
}

/// Instrumentation configuration.
///
/// One configuration is honored per process: the first successful
/// [`Instrumentation::start`](crate::Instrumentation::start) wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Name of the instrumented service
    pub service_name: String,

    /// Version of the instrumented service
    pub service_version: String,

    /// Telemetry mode
    pub mode: TelemetryMode,

    /// Delivery endpoints, required for [`TelemetryMode::Exported`] only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp: Option<OtlpEndpoints>,
}

impl InstrumentationConfig {
    /// Create a new configuration with a service identity and mode
    pub fn new(
        service_name: impl Into<String>,
        service_version: impl Into<String>,
        mode: TelemetryMode,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            mode,
            otlp: None,
        }
    }

    /// Set the OTLP delivery endpoints
    pub fn with_otlp(mut self, endpoints: OtlpEndpoints) -> Self {
        self.otlp = Some(endpoints);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> TelemetryResult<()> {
        if self.service_name.is_empty() {
            return Err(TelemetryError::Config(
                "Service name cannot be empty".to_string(),
            ));
        }

        if self.mode == TelemetryMode::Exported && self.otlp.is_none() {
            return Err(TelemetryError::Config(
                "OTLP endpoints required for exported mode".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = InstrumentationConfig::new("my-service", "1.0.0", TelemetryMode::Console);

        assert_eq!(config.service_name, "my-service");
        assert_eq!(config.service_version, "1.0.0");
        assert_eq!(config.mode, TelemetryMode::Console);
        assert!(config.otlp.is_none());
    }

    #[test]
    fn test_config_with_otlp() {
        let config = InstrumentationConfig::new("svc", "0.1.0", TelemetryMode::Exported)
            .with_otlp(OtlpEndpoints::new(
                "http://collector:4318/v1/metrics",
                "http://collector:4318/v1/traces",
            ));

        let otlp = config.otlp.expect("endpoints set");
        assert_eq!(otlp.metrics, "http://collector:4318/v1/metrics");
        assert_eq!(otlp.traces, "http://collector:4318/v1/traces");
    }

    #[test]
    fn test_validate_empty_service_name() {
        let config = InstrumentationConfig::new("", "1.0.0", TelemetryMode::Console);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_exported_requires_endpoints() {
        let config = InstrumentationConfig::new("svc", "1.0.0", TelemetryMode::Exported);
        assert!(config.validate().is_err());

        let config = config.with_otlp(OtlpEndpoints::new(
            "http://localhost:4318/v1/metrics",
            "http://localhost:4318/v1/traces",
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_console_and_disabled_need_no_endpoints() {
        for mode in [TelemetryMode::Console, TelemetryMode::Disabled] {
            let config = InstrumentationConfig::new("svc", "1.0.0", mode);
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_mode_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&TelemetryMode::Console).unwrap(),
            "\"console\""
        );
        assert_eq!(
            serde_json::to_string(&TelemetryMode::Exported).unwrap(),
            "\"exported\""
        );
        assert_eq!(
            serde_json::to_string(&TelemetryMode::Disabled).unwrap(),
            "\"disabled\""
        );
    }

    #[test]
    fn test_config_deserialize() {
        let config: InstrumentationConfig = serde_json::from_str(
            r#"{
                "service_name": "orders",
                "service_version": "2.3.1",
                "mode": "exported",
                "otlp": {
                    "metrics": "http://collector:4318/v1/metrics",
                    "traces": "http://collector:4318/v1/traces"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.service_name, "orders");
        assert_eq!(config.mode, TelemetryMode::Exported);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialize_without_endpoints() {
        let config: InstrumentationConfig = serde_json::from_str(
            r#"{"service_name": "orders", "service_version": "2.3.1", "mode": "disabled"}"#,
        )
        .unwrap();

        assert_eq!(config.mode, TelemetryMode::Disabled);
        assert!(config.otlp.is_none());
    }
}
