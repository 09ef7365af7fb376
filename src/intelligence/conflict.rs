//! Pairwise disagreement analysis between responder outputs

use crate::orchestrator::ConsultedResponse;
use crate::scoring::{DisagreementDetector, IndicatorPairDetector};
use crate::types::ResponderId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Kind of conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Opposing strategic recommendations
    StrategicDisagreement,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrategicDisagreement => write!(f, "strategic disagreement"),
        }
    }
}

/// Conflict severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    /// Cosmetic difference
    Low,
    /// Worth surfacing
    Moderate,
    /// Uses high-impact language
    High,
    /// Blocks a decision
    Critical,
}

impl std::fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Moderate => write!(f, "moderate"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// One way of resolving a conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOption {
    /// Strategy tag
    pub strategy: String,
    /// What the strategy does
    pub description: String,
    /// Advantages
    pub pros: Vec<String>,
    /// Drawbacks
    pub cons: Vec<String>,
}

impl ResolutionOption {
    fn new(strategy: &str, description: &str, pros: &[&str], cons: &[&str]) -> Self {
        Self {
            strategy: strategy.to_string(),
            description: description.to_string(),
            pros: pros.iter().map(|s| s.to_string()).collect(),
            cons: cons.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The resolution the analyzer recommends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedResolution {
    /// Strategy tag
    pub strategy: String,
    /// Why this strategy
    pub rationale: String,
    /// How to carry it out
    pub implementation: String,
}

/// A detected disagreement between two responders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictAnalysis {
    /// Conflict identifier (`rec_conflict_<i>_<j>`)
    pub conflict_id: String,
    /// The two responders in disagreement
    pub responders: [ResponderId; 2],
    /// Conflict kind
    pub kind: ConflictKind,
    /// Severity
    pub severity: ConflictSeverity,
    /// Human-readable description
    pub description: String,
    /// Probable root cause
    pub root_cause: String,
    /// Areas affected
    pub impact_areas: Vec<String>,
    /// Ranked resolution options
    pub resolution_options: Vec<ResolutionOption>,
    /// Recommended resolution
    pub recommended_resolution: RecommendedResolution,
    /// Detection confidence
    pub confidence: f64,
    /// First responder's recommendation
    pub first_approach: String,
    /// Second responder's recommendation
    pub second_approach: String,
}

/// Finds pairwise disagreement between responder outputs
#[derive(Clone)]
pub struct ConflictAnalyzer {
    detector: Arc<dyn DisagreementDetector>,
}

impl Default for ConflictAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(IndicatorPairDetector::default()))
    }
}

impl std::fmt::Debug for ConflictAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictAnalyzer").finish_non_exhaustive()
    }
}

impl ConflictAnalyzer {
    /// Create an analyzer with a custom disagreement detector
    pub fn new(detector: Arc<dyn DisagreementDetector>) -> Self {
        Self { detector }
    }

    /// Compare every pair of responses by their primary recommendation.
    ///
    /// Responses without a primary recommendation never conflict. Indices in
    /// the conflict id refer to positions in `responses`.
    pub fn analyze(&self, responses: &[ConsultedResponse]) -> Vec<ConflictAnalysis> {
        let mut conflicts = Vec::new();

        for (i, first) in responses.iter().enumerate() {
            for (j, second) in responses.iter().enumerate().skip(i + 1) {
                let (Some(rec1), Some(rec2)) = (
                    first.response.primary_recommendation(),
                    second.response.primary_recommendation(),
                ) else {
                    continue;
                };

                if !self.detector.disagree(rec1, rec2) {
                    continue;
                }

                let severity = self.detector.severity(rec1, rec2);
                tracing::debug!(
                    first = %first.responder,
                    second = %second.responder,
                    severity = %severity,
                    "Recommendation conflict detected"
                );
                conflicts.push(recommendation_conflict(i, j, first, second, rec1, rec2, severity));
            }
        }

        conflicts
    }
}

fn recommendation_conflict(
    i: usize,
    j: usize,
    first: &ConsultedResponse,
    second: &ConsultedResponse,
    rec1: &str,
    rec2: &str,
    severity: ConflictSeverity,
) -> ConflictAnalysis {
    ConflictAnalysis {
        conflict_id: format!("rec_conflict_{}_{}", i, j),
        responders: [first.responder.clone(), second.responder.clone()],
        kind: ConflictKind::StrategicDisagreement,
        severity,
        description: format!(
            "Strategic recommendation disagreement between {} and {}",
            first.responder, second.responder
        ),
        root_cause: "Different expert methodologies leading to alternative approaches".to_string(),
        impact_areas: vec![
            "strategic_direction".to_string(),
            "implementation_approach".to_string(),
            "resource_allocation".to_string(),
        ],
        resolution_options: vec![
            ResolutionOption::new(
                "consensus_weighting",
                "Weight recommendations by responder expertise relevance",
                &["Leverages best expertise", "Maintains both perspectives"],
                &["May dilute strong recommendations"],
            ),
            ResolutionOption::new(
                "sequential_testing",
                "Test both approaches in phases",
                &["Data-driven decision", "Risk mitigation"],
                &["Longer timeline", "Resource intensive"],
            ),
            ResolutionOption::new(
                "user_choice",
                "Present both options with clear trade-offs",
                &["User control", "Transparent decision"],
                &["Requires user expertise to choose"],
            ),
        ],
        recommended_resolution: RecommendedResolution {
            strategy: "consensus_weighting".to_string(),
            rationale: "Leverages combined expertise while maintaining strategic coherence".to_string(),
            implementation: "Weight recommendations by domain relevance and user context".to_string(),
        },
        confidence: 0.8,
        first_approach: rec1.to_string(),
        second_approach: rec2.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AgentResponse;

    fn consulted(id: &str, recommendation: &str) -> ConsultedResponse {
        ConsultedResponse::new(id, AgentResponse::success(recommendation))
    }

    #[test]
    fn test_indicator_pair_flags_moderate_conflict() {
        let analyzer = ConflictAnalyzer::default();
        let conflicts = analyzer.analyze(&[
            consulted("sales-specialist", "We should aggressively increase pricing"),
            consulted("pricing-strategist", "Recommend a conservative, gradual rollout"),
        ]);

        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.conflict_id, "rec_conflict_0_1");
        assert_eq!(conflict.kind, ConflictKind::StrategicDisagreement);
        assert_eq!(conflict.severity, ConflictSeverity::Moderate);
        assert_eq!(conflict.resolution_options.len(), 3);
        assert_eq!(conflict.recommended_resolution.strategy, "consensus_weighting");
        assert_eq!(conflict.confidence, 0.8);
    }

    #[test]
    fn test_high_impact_language_raises_severity() {
        let analyzer = ConflictAnalyzer::default();
        let conflicts = analyzer.analyze(&[
            consulted("a", "It is critical to aggressively increase pricing"),
            consulted("b", "Recommend a conservative, gradual rollout"),
        ]);
        assert_eq!(conflicts[0].severity, ConflictSeverity::High);
        assert!(ConflictSeverity::High > ConflictSeverity::Moderate);
    }

    #[test]
    fn test_no_conflict_without_indicator_pair() {
        let analyzer = ConflictAnalyzer::default();
        let conflicts = analyzer.analyze(&[
            consulted("a", "Increase pricing for premium clients"),
            consulted("b", "Increase marketing spend"),
            consulted("c", ""),
        ]);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_conflict_ids_use_positions() {
        let analyzer = ConflictAnalyzer::default();
        let conflicts = analyzer.analyze(&[
            consulted("a", "Emphasize value framing"),
            consulted("b", "Prioritize enterprise clients"),
            consulted("c", "Deprioritize enterprise clients"),
        ]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_id, "rec_conflict_1_2");
        assert_eq!(
            conflicts[0].responders,
            [ResponderId::new("b"), ResponderId::new("c")]
        );
    }
}
