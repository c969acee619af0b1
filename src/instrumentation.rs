//! Facade entry point hiding the OpenTelemetry SDK

use std::sync::{Mutex, PoisonError};

use once_cell::sync::OnceCell;

use crate::config::InstrumentationConfig;
use crate::error::{TelemetryError, TelemetryResult};
use crate::otel::OtelSdk;
use crate::propagation::Propagation;
use crate::span::{Lineage, Span, SpanRole, Spannable};

static GLOBAL: Instrumentation = Instrumentation::new();

/// The process-wide facade instance.
///
/// Most services use this single instance; independent instances can be
/// constructed with [`Instrumentation::new`] when isolation is needed (one
/// per test, or one per logical task in a concurrent host).
pub fn global() -> &'static Instrumentation {
    &GLOBAL
}

/// Facade over the instrumentation pipeline.
///
/// Holds the one pipeline adapter for its scope, created lazily by the
/// first successful [`start`](Instrumentation::start), plus the current
/// active span. The active span is ordinary last-write-wins state with no
/// history: it is set explicitly via [`activate`](Instrumentation::activate)
/// or implicitly by [`service_entry`](Instrumentation::service_entry), and
/// is never restored when a span ends.
pub struct Instrumentation {
    sdk: OnceCell<OtelSdk>,
    active: Mutex<Option<Span>>,
}

impl Instrumentation {
    /// Create an empty facade with no pipeline and no active span
    pub const fn new() -> Self {
        Self {
            sdk: OnceCell::new(),
            active: Mutex::new(None),
        }
    }

    /// Construct and start the pipeline, exactly once.
    ///
    /// The first successful call wins for this instance's lifetime; later
    /// calls are silently ignored regardless of their configuration. A
    /// failed call leaves the slot empty so a corrected configuration may
    /// retry.
    pub fn start(&self, config: InstrumentationConfig) -> TelemetryResult<()> {
        self.sdk.get_or_try_init(|| {
            let sdk = OtelSdk::new(config)?;
            sdk.start();
            Ok::<_, TelemetryError>(sdk)
        })?;

        Ok(())
    }

    /// Start the pipeline and open the service-entry span.
    ///
    /// The span is named `srv:{service_name}`, becomes the active span and
    /// is returned. Closing it remains the caller's responsibility.
    pub fn service_entry(&self, config: InstrumentationConfig) -> TelemetryResult<Span> {
        let name = format!("srv:{}", config.service_name);
        self.start(config)?;

        let span = self.trace(Spannable::new(name, SpanRole::ServiceEntry))?;
        self.activate(span.clone());

        Ok(span)
    }

    /// Overwrite the active span, unconditionally
    pub fn activate(&self, span: Span) {
        *self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(span);
    }

    /// The current active span, if one was set
    pub fn active(&self) -> Option<Span> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Construct a new span from a full definition.
    ///
    /// Fails with [`TelemetryError::NotStarted`] before
    /// [`start`](Instrumentation::start).
    pub fn trace(&self, spannable: Spannable) -> TelemetryResult<Span> {
        self.sdk
            .get()
            .ok_or(TelemetryError::NotStarted)?
            .span(spannable)
    }

    /// Close a span, flushing its attributes.
    ///
    /// A no-op for spans without a native handle, and before `start`.
    pub fn end(&self, span: &Span) {
        if let Some(sdk) = self.sdk.get() {
            sdk.close_span(span);
        }
    }

    /// Construct a producer span linked per `lineage`.
    ///
    /// The new span does not become active.
    pub fn producer(
        &self,
        name: impl Into<String>,
        lineage: impl Into<Lineage>,
    ) -> TelemetryResult<Span> {
        self.spanned(name.into(), SpanRole::Producer, lineage.into())
    }

    /// Construct a consumer span linked per `lineage`.
    ///
    /// The new span does not become active.
    pub fn consumer(
        &self,
        name: impl Into<String>,
        lineage: impl Into<Lineage>,
    ) -> TelemetryResult<Span> {
        self.spanned(name.into(), SpanRole::Consumer, lineage.into())
    }

    fn spanned(&self, name: String, role: SpanRole, lineage: Lineage) -> TelemetryResult<Span> {
        let mut spannable = Spannable::new(name, role);

        match lineage {
            Lineage::Active => spannable.parent = self.active(),
            Lineage::Root => {}
            Lineage::Parent(parent) => spannable.parent = Some(parent),
            Lineage::Propagated(propagation) => spannable.propagation = Some(propagation),
        }

        self.trace(spannable)
    }

    /// Extract propagation data from a span for outbound calls.
    ///
    /// Empty for spans without a native handle, and before `start`.
    pub fn propagate(&self, span: &Span) -> Propagation {
        self.sdk
            .get()
            .map(|sdk| sdk.propagate(span))
            .unwrap_or_default()
    }

    /// Flush and shut down the pipeline, if one was started
    pub fn shutdown(&self) -> TelemetryResult<()> {
        match self.sdk.get() {
            Some(sdk) => sdk.shutdown(),
            None => Ok(()),
        }
    }
}

impl Default for Instrumentation {
    fn default() -> Self {
        Self::new()
    }
}
