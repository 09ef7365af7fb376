//! Rubric scoring of a single responder response

use crate::capability::CapabilitySpec;
use crate::error::Result;
use crate::methodology::framework::{FrameworkRegistry, FrameworkRubric};
use crate::methodology::{
    ComplianceLevel, MethodologyValidationResult, MethodologyViolation, ValidationSeverity,
};
use crate::request::AgentResponse;
use crate::scoring::{CriterionScorer, IndicatorCountScorer};
use crate::types::{unit, ResponderId};
use std::sync::Arc;

/// Scores responder output against its declared framework
#[derive(Clone)]
pub struct MethodologyValidator {
    registry: Arc<FrameworkRegistry>,
    scorer: Arc<dyn CriterionScorer>,
}

impl Default for MethodologyValidator {
    fn default() -> Self {
        Self::new(Arc::new(FrameworkRegistry::with_builtins()))
    }
}

impl std::fmt::Debug for MethodologyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodologyValidator")
            .field("frameworks", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl MethodologyValidator {
    /// Create a validator over a registry with the lexical scorer
    pub fn new(registry: Arc<FrameworkRegistry>) -> Self {
        Self {
            registry,
            scorer: Arc::new(IndicatorCountScorer),
        }
    }

    /// Replace the criterion scorer
    pub fn with_scorer(mut self, scorer: Arc<dyn CriterionScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Framework registry
    pub fn registry(&self) -> &FrameworkRegistry {
        &self.registry
    }

    /// Validate a responder's response. Responders without a spec or a
    /// resolvable framework get the neutral result.
    pub fn validate(
        &self,
        responder: &ResponderId,
        spec: Option<&CapabilitySpec>,
        response: &AgentResponse,
    ) -> Result<MethodologyValidationResult> {
        match spec.and_then(|s| self.registry.resolve(s)) {
            Some(rubric) => self.validate_against(responder, rubric, &response.result_text()),
            None => {
                tracing::debug!(responder = %responder, "No framework declared, neutral validation");
                Ok(MethodologyValidationResult::neutral(responder))
            }
        }
    }

    /// Score text against a specific rubric
    pub fn validate_against(
        &self,
        responder: &ResponderId,
        rubric: &FrameworkRubric,
        text: &str,
    ) -> Result<MethodologyValidationResult> {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut violations = Vec::new();
        let mut strengths = Vec::new();

        for criterion in &rubric.criteria {
            let score = unit(self.scorer.score(criterion, text)?);
            weighted += score * criterion.weight;
            total_weight += criterion.weight;

            if criterion.required && score < criterion.threshold {
                violations.push(MethodologyViolation {
                    criterion: criterion.name.clone(),
                    severity: criterion.severity,
                    description: format!("Insufficient {}", criterion.name.replace('_', " ")),
                    expected: criterion.expected.clone(),
                    actual: format!("scored {:.2} against a threshold of {:.2}", score, criterion.threshold),
                    guidance: criterion.guidance.clone(),
                    compliance_impact: criterion.weight,
                });
            }
            if score >= criterion.strength_at {
                strengths.push(criterion.strength.clone());
            }
        }

        let compliance_score = if total_weight > 0.0 {
            unit(weighted / total_weight)
        } else {
            0.0
        };
        let compliance_level = ComplianceLevel::from_score(compliance_score);

        tracing::debug!(
            responder = %responder,
            framework = %rubric.id,
            score = compliance_score,
            level = %compliance_level,
            violations = violations.len(),
            "Methodology validated"
        );

        Ok(MethodologyValidationResult {
            responder: responder.clone(),
            framework: rubric.id.clone(),
            compliance_score,
            compliance_level,
            recommendations: recommendations(&rubric.id, &violations, compliance_score),
            user_value_impact: user_value_impact(compliance_score, &violations),
            framework_integrity: compliance_score,
            violations,
            strengths,
        })
    }
}

fn recommendations(framework: &str, violations: &[MethodologyViolation], score: f64) -> Vec<String> {
    let mut recommendations = Vec::new();

    if score < 0.7 {
        recommendations.push(format!("Review and strengthen {} methodology adherence", framework));
    }
    recommendations.extend(
        violations
            .iter()
            .take(3)
            .map(|v| format!("Address {}: {}", v.criterion, v.guidance)),
    );
    if score >= 0.9 {
        recommendations.push("Excellent methodology compliance - maintain current approach".to_string());
    }

    recommendations
}

fn user_value_impact(score: f64, violations: &[MethodologyViolation]) -> f64 {
    let penalty: f64 = violations
        .iter()
        .map(|v| match v.severity {
            ValidationSeverity::Critical => 0.2,
            ValidationSeverity::High => 0.1,
            _ => 0.0,
        })
        .sum();
    (score - penalty).max(0.0)
}
