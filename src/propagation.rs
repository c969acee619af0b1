//! W3C trace-context carrier

use opentelemetry::propagation::{Extractor, Injector};
use serde::{Deserialize, Serialize};

const TRACEPARENT: &str = "traceparent";
const TRACESTATE: &str = "tracestate";

/// Trace-context headers carried across process boundaries.
///
/// Produced by [`Instrumentation::propagate`](crate::Instrumentation::propagate)
/// on the sending side and fed to
/// [`Lineage::Propagated`](crate::Lineage::Propagated) on the receiving side
/// to continue a trace. Field names follow the
/// [W3C trace-context](https://www.w3.org/TR/trace-context/) header
/// convention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Propagation {
    /// Trace parent header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceparent: Option<String>,

    /// Trace state header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracestate: Option<String>,
}

impl Propagation {
    /// Whether no trace context is carried at all
    pub fn is_empty(&self) -> bool {
        self.traceparent.is_none() && self.tracestate.is_none()
    }
}

impl Injector for Propagation {
    fn set(&mut self, key: &str, value: String) {
        if key.eq_ignore_ascii_case(TRACEPARENT) {
            self.traceparent = Some(value);
        } else if key.eq_ignore_ascii_case(TRACESTATE) {
            self.tracestate = Some(value);
        }
        // other fields are not part of the carrier
    }
}

impl Extractor for Propagation {
    fn get(&self, key: &str) -> Option<&str> {
        if key.eq_ignore_ascii_case(TRACEPARENT) {
            self.traceparent.as_deref()
        } else if key.eq_ignore_ascii_case(TRACESTATE) {
            self.tracestate.as_deref()
        } else {
            None
        }
    }

    fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::with_capacity(2);
        if self.traceparent.is_some() {
            keys.push(TRACEPARENT);
        }
        if self.tracestate.is_some() {
            keys.push(TRACESTATE);
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    #[test]
    fn test_empty_by_default() {
        let propagation = Propagation::default();
        assert!(propagation.is_empty());
        assert!(Extractor::keys(&propagation).is_empty());
    }

    #[test]
    fn test_injector_accepts_known_fields_only() {
        let mut propagation = Propagation::default();
        propagation.set(TRACEPARENT, PARENT.to_string());
        propagation.set("tracestate", "foo=bar".to_string());
        propagation.set("baggage", "k=v".to_string());

        assert_eq!(propagation.traceparent.as_deref(), Some(PARENT));
        assert_eq!(propagation.tracestate.as_deref(), Some("foo=bar"));
        assert!(!propagation.is_empty());
    }

    #[test]
    fn test_extractor_is_case_insensitive() {
        let propagation = Propagation {
            traceparent: Some(PARENT.to_string()),
            tracestate: None,
        };

        assert_eq!(Extractor::get(&propagation, "Traceparent"), Some(PARENT));
        assert_eq!(Extractor::get(&propagation, "tracestate"), None);
        assert_eq!(Extractor::get(&propagation, "baggage"), None);
        assert_eq!(Extractor::keys(&propagation), vec![TRACEPARENT]);
    }

    #[test]
    fn test_serde_skips_absent_fields() {
        let propagation = Propagation {
            traceparent: Some(PARENT.to_string()),
            tracestate: None,
        };

        let json = serde_json::to_string(&propagation).unwrap();
        assert!(!json.contains("tracestate"));

        let back: Propagation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, propagation);
    }
}
