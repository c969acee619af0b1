//! Span proxy and the vocabulary used to create one

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use opentelemetry::{Array, Context, StringValue, Value};

use crate::error::{TelemetryError, TelemetryResult};
use crate::propagation::Propagation;

/// The position of a span in a request flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanRole {
    /// The span covering the whole service process
    ServiceEntry,
    /// A span around the creation of a unit of work for another party
    Producer,
    /// A span around the processing of a unit of work
    Consumer,
}

/// A single attribute value: one string or a sequence of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BagValue {
    /// A single string value
    One(String),
    /// A sequence of string values
    Many(Vec<String>),
}

impl From<&str> for BagValue {
    fn from(value: &str) -> Self {
        BagValue::One(value.to_string())
    }
}

impl From<String> for BagValue {
    fn from(value: String) -> Self {
        BagValue::One(value)
    }
}

impl From<Vec<String>> for BagValue {
    fn from(values: Vec<String>) -> Self {
        BagValue::Many(values)
    }
}

impl From<Vec<&str>> for BagValue {
    fn from(values: Vec<&str>) -> Self {
        BagValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl From<BagValue> for Value {
    fn from(value: BagValue) -> Self {
        match value {
            BagValue::One(s) => Value::String(StringValue::from(s)),
            BagValue::Many(values) => Value::Array(Array::String(
                values.into_iter().map(StringValue::from).collect(),
            )),
        }
    }
}

/// Arbitrary key/value data attached to a span, flushed to the native span
/// when the span is closed. Last write wins per key.
pub type SpanBag = HashMap<String, BagValue>;

/// The definition of a span to be created.
///
/// `parent` and `propagation` are mutually exclusive in effect: parent
/// resolution is tried first and propagation is the fallback, never both.
#[derive(Debug, Clone)]
pub struct Spannable {
    /// Name of the span
    pub name: String,
    /// Role of the span
    pub role: SpanRole,
    /// Parent span, if the new span continues an in-process trace
    pub parent: Option<Span>,
    /// Inbound propagation data, if the new span continues a remote trace
    pub propagation: Option<Propagation>,
}

impl Spannable {
    /// Create a span definition with no inherited context
    pub fn new(name: impl Into<String>, role: SpanRole) -> Self {
        Self {
            name: name.into(),
            role,
            parent: None,
            propagation: None,
        }
    }

    /// Link the new span under an in-process parent
    pub fn with_parent(mut self, parent: Span) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Link the new span to a remote trace
    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = Some(propagation);
        self
    }
}

/// How a new producer/consumer span is linked to a trace.
#[derive(Debug, Clone, Default)]
pub enum Lineage {
    /// Adopt the current active span as parent (which may be unset)
    #[default]
    Active,
    /// Force a root span, ignoring any active span
    Root,
    /// Use an explicit parent span
    Parent(Span),
    /// Continue a remote trace from propagation data
    Propagated(Propagation),
}

impl From<Span> for Lineage {
    fn from(span: Span) -> Self {
        Lineage::Parent(span)
    }
}

impl From<&Span> for Lineage {
    fn from(span: &Span) -> Self {
        Lineage::Parent(span.clone())
    }
}

impl From<Propagation> for Lineage {
    fn from(propagation: Propagation) -> Self {
        Lineage::Propagated(propagation)
    }
}

#[derive(Debug)]
struct SpanInner {
    name: Mutex<String>,
    role: SpanRole,
    parent: Option<Span>,
    propagation: Option<Propagation>,
    handle: OnceLock<Context>,
    bag: Mutex<SpanBag>,
}

/// A proxy for one traced unit of work.
///
/// Holds the span's identity (name, role, lineage), the attribute bag and,
/// once started, the native OpenTelemetry handle. Cloning is cheap and
/// clones share identity: equality compares identity, not contents.
#[derive(Debug, Clone)]
pub struct Span {
    inner: Arc<SpanInner>,
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Span {
    pub(crate) fn new(spannable: Spannable) -> Self {
        Self {
            inner: Arc::new(SpanInner {
                name: Mutex::new(spannable.name),
                role: spannable.role,
                parent: spannable.parent,
                propagation: spannable.propagation,
                handle: OnceLock::new(),
                bag: Mutex::new(SpanBag::new()),
            }),
        }
    }

    /// Name of the span
    pub fn name(&self) -> String {
        self.inner
            .name
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Role of the span
    pub fn role(&self) -> SpanRole {
        self.inner.role
    }

    /// Parent span, if one was set at creation
    pub fn parent(&self) -> Option<&Span> {
        self.inner.parent.as_ref()
    }

    /// Inbound propagation data, if any was set at creation
    pub fn propagation(&self) -> Option<&Propagation> {
        self.inner.propagation.as_ref()
    }

    /// Bind the native handle to this span.
    ///
    /// A span is started exactly once; a second call returns
    /// [`TelemetryError::AlreadyAttached`] and leaves the original handle in
    /// place.
    pub fn attach(&self, handle: Context) -> TelemetryResult<()> {
        self.inner
            .handle
            .set(handle)
            .map_err(|_| TelemetryError::AlreadyAttached)
    }

    /// The native handle, absent until [`attach`](Span::attach)
    pub fn native_handle(&self) -> Option<&Context> {
        self.inner.handle.get()
    }

    /// Overwrite the span name.
    ///
    /// Local bookkeeping only: an already-attached native span keeps the
    /// name it was started with.
    pub fn update_name(&self, name: impl Into<String>) {
        *self
            .inner
            .name
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = name.into();
    }

    /// Set one attribute, replacing any previous value for the key
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<BagValue>) {
        self.inner
            .bag
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Merge a bag of attributes, last write winning per key
    pub fn set_attributes(&self, bag: SpanBag) {
        self.inner
            .bag
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(bag);
    }

    /// Snapshot of the current attribute bag
    pub fn attributes(&self) -> SpanBag {
        self.inner
            .bag
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(name: &str, role: SpanRole) -> Span {
        Span::new(Spannable::new(name, role))
    }

    #[test]
    fn test_accessors() {
        let span = span("work", SpanRole::Consumer);

        assert_eq!(span.name(), "work");
        assert_eq!(span.role(), SpanRole::Consumer);
        assert!(span.parent().is_none());
        assert!(span.propagation().is_none());
        assert!(span.native_handle().is_none());
        assert!(span.attributes().is_empty());
    }

    #[test]
    fn test_clones_share_identity() {
        let span = span("work", SpanRole::Producer);
        let clone = span.clone();

        clone.set_attribute("seen-by", "clone");
        assert_eq!(span.attributes().len(), 1);
        assert_eq!(span, clone);

        let other = Span::new(Spannable::new("work", SpanRole::Producer));
        assert_ne!(span, other);
    }

    #[test]
    fn test_update_name_is_local() {
        let span = span("before", SpanRole::Producer);
        span.update_name("after");
        assert_eq!(span.name(), "after");
    }

    #[test]
    fn test_attribute_merge_last_write_wins() {
        let span = span("work", SpanRole::Consumer);
        span.set_attribute("queue", "orders");

        let mut bag = SpanBag::new();
        bag.insert("queue".to_string(), BagValue::from("billing"));
        bag.insert("retries".to_string(), BagValue::from("2"));
        span.set_attributes(bag);

        let attributes = span.attributes();
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes["queue"], BagValue::from("billing"));

        span.set_attribute("queue", vec!["orders", "billing"]);
        assert_eq!(
            span.attributes()["queue"],
            BagValue::from(vec!["orders", "billing"])
        );
    }

    #[test]
    fn test_attributes_returns_snapshot() {
        let span = span("work", SpanRole::Consumer);
        span.set_attribute("a", "1");

        let mut snapshot = span.attributes();
        snapshot.insert("b".to_string(), BagValue::from("2"));

        assert_eq!(span.attributes().len(), 1);
    }

    #[test]
    fn test_attach_twice_is_an_error() {
        let span = span("work", SpanRole::Producer);

        assert!(span.attach(Context::new()).is_ok());
        assert!(matches!(
            span.attach(Context::new()),
            Err(TelemetryError::AlreadyAttached)
        ));
        assert!(span.native_handle().is_some());
    }

    #[test]
    fn test_spannable_builders() {
        let parent = span("parent", SpanRole::ServiceEntry);
        let spannable = Spannable::new("child", SpanRole::Producer).with_parent(parent.clone());
        let child = Span::new(spannable);

        assert_eq!(child.parent(), Some(&parent));
        assert!(child.propagation().is_none());

        let propagation = Propagation {
            traceparent: Some("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01".into()),
            tracestate: None,
        };
        let remote = Span::new(
            Spannable::new("remote", SpanRole::Consumer).with_propagation(propagation.clone()),
        );
        assert_eq!(remote.propagation(), Some(&propagation));
        assert!(remote.parent().is_none());
    }

    #[test]
    fn test_lineage_conversions() {
        let span = span("parent", SpanRole::ServiceEntry);
        assert!(matches!(Lineage::from(&span), Lineage::Parent(_)));
        assert!(matches!(Lineage::from(span), Lineage::Parent(_)));
        assert!(matches!(
            Lineage::from(Propagation::default()),
            Lineage::Propagated(_)
        ));
        assert!(matches!(Lineage::default(), Lineage::Active));
    }

    #[test]
    fn test_bag_value_into_otel_value() {
        assert_eq!(Value::from(BagValue::from("one")), Value::from("one"));

        let value = Value::from(BagValue::from(vec!["a", "b"]));
        match value {
            Value::Array(Array::String(values)) => {
                assert_eq!(values.len(), 2);
                assert_eq!(values[0].as_str(), "a");
            }
            other => panic!("expected string array, got {other:?}"),
        }
    }
}
