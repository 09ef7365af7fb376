//! Framework-compliance validation of responder output

pub mod framework;
pub mod validator;

pub use framework::{Criterion, FrameworkRegistry, FrameworkRubric};
pub use validator::MethodologyValidator;

use crate::types::ResponderId;
use serde::{Deserialize, Serialize};

/// Compliance bucket of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    /// Score ≥ 0.9
    Excellent,
    /// 0.8 ≤ score < 0.9
    Good,
    /// 0.7 ≤ score < 0.8
    Acceptable,
    /// Score < 0.7
    Poor,
}

impl ComplianceLevel {
    /// Bucket a score
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::Excellent
        } else if score >= 0.8 {
            Self::Good
        } else if score >= 0.7 {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "excellent"),
            Self::Good => write!(f, "good"),
            Self::Acceptable => write!(f, "acceptable"),
            Self::Poor => write!(f, "poor"),
        }
    }
}

/// Severity of a methodology violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSeverity {
    /// Minor
    Low,
    /// Noticeable
    Moderate,
    /// Undermines the framework
    High,
    /// Framework not applied
    Critical,
}

/// A required criterion that scored below its threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodologyViolation {
    /// Criterion name
    pub criterion: String,
    /// Severity
    pub severity: ValidationSeverity,
    /// What went wrong
    pub description: String,
    /// Expected behavior
    pub expected: String,
    /// Observed behavior
    pub actual: String,
    /// How to fix it
    pub guidance: String,
    /// Weight of the criterion in the compliance score
    pub compliance_impact: f64,
}

/// Compliance of one responder's output with its framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodologyValidationResult {
    /// Responder validated
    pub responder: ResponderId,
    /// Framework id, `"none"` when the responder declares none
    pub framework: String,
    /// Weighted compliance score
    pub compliance_score: f64,
    /// Bucketed level
    pub compliance_level: ComplianceLevel,
    /// Violations
    pub violations: Vec<MethodologyViolation>,
    /// Strengths
    pub strengths: Vec<String>,
    /// Improvement recommendations
    pub recommendations: Vec<String>,
    /// Framework integrity
    pub framework_integrity: f64,
    /// Compliance adjusted for severe violations
    pub user_value_impact: f64,
}

impl MethodologyValidationResult {
    /// Neutral result for responders without a usable framework
    pub fn neutral(responder: impl Into<ResponderId>) -> Self {
        Self {
            responder: responder.into(),
            framework: "none".to_string(),
            compliance_score: 0.75,
            compliance_level: ComplianceLevel::Acceptable,
            violations: Vec::new(),
            strengths: vec!["General consulting expertise".to_string()],
            recommendations: vec!["Consider adopting specific expert methodology".to_string()],
            framework_integrity: 0.75,
            user_value_impact: 0.75,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compliance_buckets() {
        assert_eq!(ComplianceLevel::from_score(0.95), ComplianceLevel::Excellent);
        assert_eq!(ComplianceLevel::from_score(0.9), ComplianceLevel::Excellent);
        assert_eq!(ComplianceLevel::from_score(0.85), ComplianceLevel::Good);
        assert_eq!(ComplianceLevel::from_score(0.8), ComplianceLevel::Good);
        assert_eq!(ComplianceLevel::from_score(0.72), ComplianceLevel::Acceptable);
        assert_eq!(ComplianceLevel::from_score(0.5), ComplianceLevel::Poor);
        assert_eq!(ComplianceLevel::from_score(0.0), ComplianceLevel::Poor);
        assert_eq!(ComplianceLevel::from_score(1.0), ComplianceLevel::Excellent);
    }

    #[test]
    fn test_buckets_are_monotone_over_unit_interval() {
        let rank = |level| match level {
            ComplianceLevel::Poor => 0,
            ComplianceLevel::Acceptable => 1,
            ComplianceLevel::Good => 2,
            ComplianceLevel::Excellent => 3,
        };
        let mut previous = 0;
        for step in 0..=1000 {
            let current = rank(ComplianceLevel::from_score(step as f64 / 1000.0));
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_neutral_result() {
        let result = MethodologyValidationResult::neutral("generalist");
        assert_eq!(result.compliance_score, 0.75);
        assert_eq!(result.compliance_level, ComplianceLevel::Acceptable);
        assert_eq!(result.framework, "none");
    }
}
