//! Quality scoring of a synthesized consultation result
//!
//! The assessor reads the serialized result rather than the typed struct so
//! it can score results produced by other synthesizers with the same shape.

use crate::error::{Error, Result};
use crate::types::unit;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level fields every synthesized result must carry
pub const REQUIRED_FIELDS: [&str; 3] = ["status", "orchestration_pattern", "meta"];

/// Pattern-specific result sections
pub const PATTERN_SECTIONS: [&str; 4] = [
    "sequential_result",
    "aggregated_results",
    "consensus_result",
    "hierarchical_result",
];

/// Fixed framework-integrity score
const FRAMEWORK_INTEGRITY: f64 = 0.9;

/// Five-dimension quality assessment of one result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Upstream methodology validation score, or a status-based default
    pub methodology_adherence: f64,
    /// Fraction of required top-level fields present
    pub output_consistency: f64,
    /// Framework integrity
    pub framework_integrity: f64,
    /// Value delivered to the user
    pub user_value: f64,
    /// Responder utilization
    pub orchestration_efficiency: f64,
    /// Unweighted mean of the five scores
    pub overall: f64,
}

impl QualityMetrics {
    /// Build from the five components; each is clamped to `[0, 1]` and `overall` is their mean
    pub fn from_components(
        methodology_adherence: f64,
        output_consistency: f64,
        framework_integrity: f64,
        user_value: f64,
        orchestration_efficiency: f64,
    ) -> Self {
        let methodology_adherence = unit(methodology_adherence);
        let output_consistency = unit(output_consistency);
        let framework_integrity = unit(framework_integrity);
        let user_value = unit(user_value);
        let orchestration_efficiency = unit(orchestration_efficiency);
        let overall = (methodology_adherence
            + output_consistency
            + framework_integrity
            + user_value
            + orchestration_efficiency)
            / 5.0;

        Self {
            methodology_adherence,
            output_consistency,
            framework_integrity,
            user_value,
            orchestration_efficiency,
            overall,
        }
    }

    /// Improvement suggestions for weak dimensions
    pub fn optimization_suggestions(&self) -> Vec<String> {
        let mut suggestions = Vec::new();

        if self.methodology_adherence < 0.8 {
            suggestions.push("Consider validating responder methodology adherence".to_string());
        }
        if self.orchestration_efficiency < 0.8 {
            suggestions.push("Review responder selection for optimal coordination".to_string());
        }
        if self.user_value < 0.7 {
            suggestions.push("Enhance result synthesis for improved user value".to_string());
        }
        if self.output_consistency < 0.9 {
            suggestions.push("Improve output format consistency across responders".to_string());
        }
        if suggestions.is_empty() {
            suggestions.push("System performing optimally - no improvements needed".to_string());
        }

        suggestions
    }
}

/// Scores a finished orchestration result
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityAssessor;

impl QualityAssessor {
    /// Create an assessor
    pub fn new() -> Self {
        Self
    }

    /// Assess a serialized result; fails if it is not a JSON object
    pub fn assess(&self, result: &Value) -> Result<QualityMetrics> {
        let object = result
            .as_object()
            .ok_or_else(|| Error::intelligence("quality", "result is not an object"))?;

        let successful = object.get("status").and_then(Value::as_str) == Some("success");
        let meta = object.get("meta");

        let methodology_adherence = meta
            .and_then(|m| m.get("methodology_validation"))
            .and_then(|v| v.get("compliance_score").or(Some(v)))
            .and_then(Value::as_f64)
            .unwrap_or(if successful { 0.85 } else { 0.6 });

        let present = REQUIRED_FIELDS.iter().filter(|f| object.contains_key(**f)).count();
        let output_consistency = present as f64 / REQUIRED_FIELDS.len() as f64;

        let mut user_value = 0.0;
        if successful {
            user_value += 0.7;
        }
        if PATTERN_SECTIONS.iter().any(|s| object.contains_key(*s)) {
            user_value += 0.2;
        }

        let consulted = meta
            .and_then(|m| m.get("responders_consulted"))
            .and_then(Value::as_u64)
            .unwrap_or(0);

        Ok(QualityMetrics::from_components(
            methodology_adherence,
            output_consistency,
            FRAMEWORK_INTEGRITY,
            user_value,
            efficiency(consulted),
        ))
    }
}

/// Step function of the number of responders consulted
fn efficiency(consulted: u64) -> f64 {
    match consulted {
        0 => 0.6,
        1..=3 => 0.95,
        4..=6 => 0.85,
        _ => 0.7,
    }
}
