//! Proxy around the OpenTelemetry SDK pipeline

use std::collections::HashMap;

use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer, TracerProvider as _};
use opentelemetry::{global, Context, InstrumentationScope, KeyValue};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::SERVICE_VERSION;
use tracing::debug;

use crate::config::{InstrumentationConfig, TelemetryMode};
use crate::error::{TelemetryError, TelemetryResult};
use crate::propagation::Propagation;
use crate::span::{Span, SpanRole, Spannable};

/// Proxy around the OpenTelemetry SDK.
///
/// Owns at most one trace/metric pipeline for the process and translates
/// between this crate's span vocabulary and the SDK's. Under
/// [`TelemetryMode::Disabled`] no pipeline exists and every operation that
/// would touch one degrades to a no-op.
pub struct OtelSdk {
    config: InstrumentationConfig,
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
    propagator: TraceContextPropagator,
}

impl OtelSdk {
    /// Construct the pipeline selected by the configuration.
    ///
    /// Exporter construction failures surface unmodified as
    /// [`TelemetryError::Exporter`].
    pub fn new(config: InstrumentationConfig) -> TelemetryResult<Self> {
        config.validate()?;

        let (tracer_provider, meter_provider) = match config.mode {
            TelemetryMode::Console => {
                let resource = resource(&config);

                let tracer_provider = SdkTracerProvider::builder()
                    .with_resource(resource.clone())
                    .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
                    .build();

                let reader =
                    PeriodicReader::builder(opentelemetry_stdout::MetricExporter::default())
                        .build();
                let meter_provider = SdkMeterProvider::builder()
                    .with_resource(resource)
                    .with_reader(reader)
                    .build();

                (Some(tracer_provider), Some(meter_provider))
            }
            TelemetryMode::Exported => {
                let endpoints = config.otlp.as_ref().ok_or_else(|| {
                    TelemetryError::Config("OTLP endpoints required for exported mode".to_string())
                })?;

                let span_exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .with_protocol(Protocol::HttpBinary)
                    .with_endpoint(endpoints.traces.as_str())
                    .with_headers(HashMap::new())
                    .build()?;

                let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
                    .with_http()
                    .with_protocol(Protocol::HttpBinary)
                    .with_endpoint(endpoints.metrics.as_str())
                    .with_headers(HashMap::new())
                    .build()?;

                let resource = resource(&config);

                let tracer_provider = SdkTracerProvider::builder()
                    .with_resource(resource.clone())
                    .with_batch_exporter(span_exporter)
                    .build();

                let meter_provider = SdkMeterProvider::builder()
                    .with_resource(resource)
                    .with_reader(PeriodicReader::builder(metric_exporter).build())
                    .build();

                (Some(tracer_provider), Some(meter_provider))
            }
            TelemetryMode::Disabled => {
                debug!(
                    service_name = %config.service_name,
                    service_version = %config.service_version,
                    "telemetry disabled, no pipeline constructed"
                );
                (None, None)
            }
        };

        Ok(Self {
            config,
            tracer_provider,
            meter_provider,
            propagator: TraceContextPropagator::new(),
        })
    }

    /// Register the pipeline and the W3C propagator as the process globals.
    ///
    /// Invoked once by the facade; a no-op when the pipeline is disabled.
    pub fn start(&self) {
        if let Some(provider) = &self.tracer_provider {
            global::set_tracer_provider(provider.clone());
            global::set_text_map_propagator(TraceContextPropagator::new());
        }

        if let Some(provider) = &self.meter_provider {
            global::set_meter_provider(provider.clone());
        }
    }

    /// The mode this pipeline was constructed with
    pub fn mode(&self) -> TelemetryMode {
        self.config.mode
    }

    /// Construct a [`Span`], start its native counterpart and attach it.
    ///
    /// This is the sole span-creation entry point. Under
    /// [`TelemetryMode::Disabled`] the span is returned without a native
    /// handle.
    pub fn span(&self, spannable: Spannable) -> TelemetryResult<Span> {
        let span = Span::new(spannable);

        if let Some(handle) = self.start_span(&span) {
            span.attach(handle)?;
        }

        Ok(span)
    }

    /// Start a native span for `span` and return its handle.
    ///
    /// The start context is resolved in strict precedence order: a parent
    /// with an attached handle, then inbound propagation data extracted
    /// against the ambient context, then a fresh root. The [`Span`] itself
    /// is not mutated. Returns `None` when no pipeline exists.
    pub fn start_span(&self, span: &Span) -> Option<Context> {
        let provider = self.tracer_provider.as_ref()?;

        let scope = InstrumentationScope::builder(self.config.service_name.clone())
            .with_version(self.config.service_version.clone())
            .build();
        let tracer = provider.tracer_with_scope(scope);

        let cx = if let Some(handle) = span.parent().and_then(Span::native_handle) {
            handle.clone()
        } else if let Some(propagation) = span.propagation() {
            self.propagator
                .extract_with_context(&Context::current(), propagation)
        } else {
            Context::new()
        };

        let native = tracer
            .span_builder(span.name())
            .with_kind(span_kind(span.role()))
            .start_with_context(&tracer, &cx);

        Some(cx.with_span(native))
    }

    /// Flush the span's attribute bag onto the native span and end it.
    ///
    /// A no-op for spans without a native handle. Ending an already-ended
    /// native span is delegated to SDK semantics (a silent no-op).
    pub fn close_span(&self, span: &Span) {
        if let Some(handle) = span.native_handle() {
            let native = handle.span();
            native.set_attributes(
                span.attributes()
                    .into_iter()
                    .map(|(key, value)| KeyValue::new(key, value))
                    .collect::<Vec<_>>(),
            );
            native.end();
        }
    }

    /// Extract propagation data for outbound calls from the span's handle.
    ///
    /// Returns an empty carrier for spans without a native handle.
    pub fn propagate(&self, span: &Span) -> Propagation {
        let mut propagation = Propagation::default();

        if let Some(handle) = span.native_handle() {
            self.propagator.inject_context(handle, &mut propagation);
        }

        propagation
    }

    /// Flush and shut down whichever pipeline parts exist
    pub fn shutdown(&self) -> TelemetryResult<()> {
        if let Some(provider) = &self.tracer_provider {
            provider.shutdown()?;
        }

        if let Some(provider) = &self.meter_provider {
            provider.shutdown()?;
        }

        Ok(())
    }
}

fn resource(config: &InstrumentationConfig) -> Resource {
    Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attribute(KeyValue::new(
            SERVICE_VERSION,
            config.service_version.clone(),
        ))
        .build()
}

fn span_kind(role: SpanRole) -> SpanKind {
    match role {
        SpanRole::ServiceEntry => SpanKind::Server,
        SpanRole::Producer => SpanKind::Producer,
        SpanRole::Consumer => SpanKind::Consumer,
    }
}
