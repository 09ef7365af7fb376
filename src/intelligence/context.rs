//! Per-responder context filtering

use crate::capability::CapabilitySnapshot;
use crate::request::ContextMap;
use crate::types::ResponderId;
use std::collections::HashMap;
use std::sync::Arc;

/// Key fragments that are always forwarded when present
pub const ALWAYS_INCLUDED: [&str; 4] = ["goals", "audience", "budget", "timeline"];

/// Filters a shared context blob down to what one responder needs
#[derive(Debug, Clone)]
pub struct ContextOptimizer {
    snapshot: Arc<CapabilitySnapshot>,
}

impl ContextOptimizer {
    /// Create an optimizer over a capability snapshot
    pub fn new(snapshot: Arc<CapabilitySnapshot>) -> Self {
        Self { snapshot }
    }

    /// Context for one responder.
    ///
    /// Keeps keys from the responder's input schema, keys whose string value
    /// mentions one of its trigger words, and the always-included keys. Never
    /// returns an empty map for a non-empty input: an empty selection, or a
    /// responder without a spec, gets the full context.
    pub fn optimize(&self, context: &ContextMap, responder: &ResponderId) -> ContextMap {
        let Some(spec) = self.snapshot.get(responder.as_str()) else {
            return context.clone();
        };

        let trigger_words = spec.trigger_words();
        let filtered: ContextMap = context
            .iter()
            .filter(|(key, value)| {
                let lower_key = key.to_lowercase();
                spec.input_schema.iter().any(|k| k == *key)
                    || ALWAYS_INCLUDED.iter().any(|k| lower_key.contains(k))
                    || value.as_str().is_some_and(|text| {
                        let text = text.to_lowercase();
                        trigger_words.iter().any(|w| text.contains(w.as_str()))
                    })
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if filtered.is_empty() {
            tracing::debug!(responder = %responder, "No relevant context keys, forwarding full context");
            context.clone()
        } else {
            filtered
        }
    }

    /// Context for each of several responders
    pub fn optimize_all(
        &self,
        context: &ContextMap,
        responders: &[ResponderId],
    ) -> HashMap<ResponderId, ContextMap> {
        responders
            .iter()
            .map(|id| (id.clone(), self.optimize(context, id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySpec;
    use serde_json::json;

    fn optimizer() -> ContextOptimizer {
        let snapshot = CapabilitySnapshot::from_specs([CapabilitySpec::new("pricing-strategist")
            .with_triggers(["pricing strategy"])
            .with_input_schema(["current_rates"])]);
        ContextOptimizer::new(snapshot.shared())
    }

    fn context(entries: &[(&str, serde_json::Value)]) -> ContextMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_keeps_schema_trigger_and_always_included_keys() {
        let ctx = context(&[
            ("current_rates", json!(120)),
            ("challenge", json!("Our pricing feels too low")),
            ("target_audience", json!("startups")),
            ("office_location", json!("Berlin")),
        ]);

        let filtered = optimizer().optimize(&ctx, &ResponderId::new("pricing-strategist"));

        assert_eq!(filtered.len(), 3);
        assert!(filtered.contains_key("current_rates"));
        assert!(filtered.contains_key("challenge"));
        assert!(filtered.contains_key("target_audience"));
        assert!(!filtered.contains_key("office_location"));
    }

    #[test]
    fn test_empty_selection_falls_back_to_full_context() {
        let ctx = context(&[("office_location", json!("Berlin"))]);
        let filtered = optimizer().optimize(&ctx, &ResponderId::new("pricing-strategist"));
        assert_eq!(filtered, ctx);
    }

    #[test]
    fn test_unknown_responder_gets_full_context() {
        let ctx = context(&[("office_location", json!("Berlin")), ("timeline", json!("Q3"))]);
        let all = optimizer().optimize_all(&ctx, &[ResponderId::new("nobody")]);
        assert_eq!(all[&ResponderId::new("nobody")], ctx);
    }

    #[test]
    fn test_non_empty_input_never_filters_to_empty() {
        let optimizer = optimizer();
        let inputs = [
            context(&[("x", json!(1))]),
            context(&[("y", json!("nothing relevant"))]),
            context(&[("budget", json!(null))]),
        ];
        for ctx in inputs {
            for id in ["pricing-strategist", "nobody"] {
                assert!(!optimizer.optimize(&ctx, &ResponderId::new(id)).is_empty());
            }
        }
    }
}
