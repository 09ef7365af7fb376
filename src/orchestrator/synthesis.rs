//! Result synthesis
//!
//! Turns a settled [`PatternOutcome`] into the pattern section of a
//! [`SynthesizedResult`]. The meta block is filled in by the orchestrator.

use crate::intelligence::{AgentOverlap, ConflictAnalysis, QualityMetrics};
use crate::methodology::MethodologyValidationResult;
use crate::orchestrator::analyzer::RequestAnalysis;
use crate::orchestrator::pattern::{
    CallFailure, ConsultedResponse, ExecutionState, OrchestrationPattern, PatternDetail, PatternOutcome, Resolution,
};
use crate::request::{ContextMap, ResponseStatus};
use crate::telemetry::ConsultationTrace;
use crate::types::{ConsultationId, ResponderId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

const UNKNOWN_METHODOLOGY: &str = "Unknown";

/// Final answer of one consultation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedResult {
    /// Consultation id
    pub consultation_id: ConsultationId,
    /// Overall status
    pub status: ResponseStatus,
    /// Pattern that ran
    pub orchestration_pattern: OrchestrationPattern,
    /// Pattern-specific section, keyed by its section name
    #[serde(flatten)]
    pub section: PatternSection,
    /// Analysis, intelligence and timing
    pub meta: ConsultationMeta,
}

impl SynthesizedResult {
    /// Serialize to JSON
    pub fn to_json(&self) -> crate::error::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Pattern section; serializes as one of `sequential_result`,
/// `aggregated_results`, `consensus_result` or `hierarchical_result`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSection {
    /// Sequential chain
    SequentialResult(SequentialSection),
    /// Aggregate fan-out
    AggregatedResults(AggregateSection),
    /// Cross-validation
    ConsensusResult(ConsensusSection),
    /// Supervisor/worker
    HierarchicalResult(HierarchicalSection),
}

/// Output of a sequential chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialSection {
    /// Result of the last usable step
    pub primary_result: ContextMap,
    /// Responders in chain order
    pub responder_chain: Vec<ResponderId>,
    /// Recommendations grouped by methodology
    pub methodology_synthesis: BTreeMap<String, MethodologySummary>,
    /// Context after the chain
    pub final_context: ContextMap,
}

/// Recommendations made under one methodology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodologySummary {
    /// Confidence of the first response using it
    pub confidence: f64,
    /// Primary recommendations
    pub recommendations: Vec<String>,
}

/// Merged output of an aggregate fan-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSection {
    /// Distinct primary recommendations
    pub combined_recommendations: Vec<String>,
    /// Recurring themes
    pub methodology_consensus: MethodologyConsensus,
    /// Implementation guidance
    pub implementation_synthesis: ImplementationSynthesis,
    /// Responders that answered
    pub contributing_responders: Vec<ResponderId>,
    /// Number of responders that answered
    pub responder_count: usize,
}

/// Words recurring across recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodologyConsensus {
    /// Word → number of responses using it, for words used by more than one
    pub common_themes: BTreeMap<String, usize>,
    /// Number of common themes
    pub consensus_strength: usize,
    /// More than two common themes
    pub methodology_agreement: bool,
}

/// Combined implementation guidance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationSynthesis {
    /// Implementation approaches, in response order
    pub combined_steps: Vec<String>,
    /// Timeline advice
    pub timeline_synthesis: String,
    /// Resource advice
    pub resource_optimization: String,
}

/// Output of a cross-validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusSection {
    /// Words every recommendation shares
    pub agreed_recommendations: Vec<String>,
    /// Conflicts among recommendations
    pub conflicting_advice: Vec<ConflictAnalysis>,
    /// Resolution
    pub resolution: Resolution,
    /// Whether the user must decide
    pub resolution_required: bool,
    /// One decision per conflict
    pub user_decision_points: Vec<DecisionPoint>,
    /// Who said what, under which methodology
    pub expert_perspectives: Vec<ExpertPerspective>,
}

/// A choice the user has to make between two approaches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPoint {
    /// What has to be decided
    pub decision_required: String,
    /// First approach
    pub option_1: DecisionOption,
    /// Second approach
    pub option_2: DecisionOption,
    /// How to decide
    pub recommendation: String,
}

/// One side of a decision point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOption {
    /// Responder proposing it
    pub responder: ResponderId,
    /// Its recommendation
    pub approach: String,
    /// Where to read about the methodology
    pub methodology: String,
}

/// One responder's position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertPerspective {
    /// Responder
    pub responder: ResponderId,
    /// Methodology applied
    pub methodology: String,
    /// Reported confidence
    pub confidence: f64,
}

/// Output of a supervisor/worker run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalSection {
    /// Supervisor
    pub supervisor: ResponderId,
    /// Supervisor result, absent if the supervisor failed
    pub strategic_guidance: Option<ContextMap>,
    /// Worker results
    pub implementation_details: Vec<ContextMap>,
    /// Workers that answered
    pub implementation_responders: Vec<ResponderId>,
    /// Always `hierarchical_delegation`
    pub coordination_approach: String,
}

/// Meta block of a synthesized result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationMeta {
    /// Request analysis, with the plan actually run
    pub analysis: RequestAnalysis,
    /// Responders actually called
    pub responders_consulted: usize,
    /// Terminal execution state
    pub execution_state: ExecutionState,
    /// Planned responders that contributed nothing
    pub failures: Vec<CallFailure>,
    /// Candidates dropped by overlap pruning
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pruned_responders: Vec<ResponderId>,
    /// Derived quality score
    pub quality_score: f64,
    /// Intelligence output; absent when intelligence is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intelligence: Option<IntelligenceReport>,
    /// Methodology validation; absent when disabled, degraded or nothing answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methodology_validation: Option<MethodologyReport>,
    /// Phase timings
    pub trace: ConsultationTrace,
}

/// Intelligence output; each feature is absent if it failed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceReport {
    /// Number of overlaps detected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlaps_detected: Option<usize>,
    /// Overlaps detected
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlaps: Vec<AgentOverlap>,
    /// Conflicts among usable responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Vec<ConflictAnalysis>>,
    /// Quality assessment of the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_metrics: Option<QualityMetrics>,
    /// Suggestions derived from the quality assessment
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optimization_suggestions: Vec<String>,
    /// Features that failed and were left out
    pub degraded: Vec<String>,
}

/// Methodology validation of every usable response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodologyReport {
    /// Mean compliance score
    pub compliance_score: f64,
    /// Per-responder results
    pub results: Vec<MethodologyValidationResult>,
}

impl MethodologyReport {
    /// Average the per-responder scores
    pub fn from_results(results: Vec<MethodologyValidationResult>) -> Option<Self> {
        if results.is_empty() {
            return None;
        }
        let compliance_score = results.iter().map(|r| r.compliance_score).sum::<f64>() / results.len() as f64;
        Some(Self {
            compliance_score,
            results,
        })
    }
}

/// 0.7 base, +0.2 on success, +0.1 when more than one responder was consulted
pub fn quality_score(status: ResponseStatus, responders_consulted: usize) -> f64 {
    let mut score: f64 = 0.7;
    if status == ResponseStatus::Success {
        score += 0.2;
    }
    if responders_consulted > 1 {
        score += 0.1;
    }
    score.min(1.0)
}

/// Status and pattern section for a settled outcome
pub fn synthesize(outcome: &PatternOutcome) -> (ResponseStatus, PatternSection) {
    let status = outcome.state.status();
    let responses = &outcome.responses;

    let section = match &outcome.detail {
        PatternDetail::Sequential { chain, final_context } => PatternSection::SequentialResult(SequentialSection {
            primary_result: responses
                .last()
                .map(|r| r.response.result.clone())
                .unwrap_or_default(),
            responder_chain: chain.clone(),
            methodology_synthesis: methodology_synthesis(responses),
            final_context: final_context.clone(),
        }),
        PatternDetail::Aggregate => PatternSection::AggregatedResults(AggregateSection {
            combined_recommendations: combined_recommendations(responses),
            methodology_consensus: methodology_consensus(responses),
            implementation_synthesis: implementation_synthesis(responses),
            contributing_responders: responses.iter().map(|r| r.responder.clone()).collect(),
            responder_count: responses.len(),
        }),
        PatternDetail::CrossValidate { conflicts, resolution } => PatternSection::ConsensusResult(ConsensusSection {
            agreed_recommendations: agreed_recommendations(responses),
            conflicting_advice: conflicts.clone(),
            resolution: *resolution,
            resolution_required: !conflicts.is_empty(),
            user_decision_points: decision_points(conflicts),
            expert_perspectives: expert_perspectives(responses),
        }),
        PatternDetail::Hierarchical {
            supervisor,
            guidance,
            workers,
        } => PatternSection::HierarchicalResult(HierarchicalSection {
            supervisor: supervisor.clone(),
            strategic_guidance: guidance.clone(),
            implementation_details: responses
                .iter()
                .filter(|r| workers.contains(&r.responder))
                .map(|r| r.response.result.clone())
                .collect(),
            implementation_responders: workers.clone(),
            coordination_approach: "hierarchical_delegation".to_string(),
        }),
    };

    (status, section)
}

fn methodology_of(response: &ConsultedResponse) -> String {
    response
        .response
        .metadata
        .framework
        .clone()
        .unwrap_or_else(|| UNKNOWN_METHODOLOGY.to_string())
}

/// Primary recommendations grouped by methodology
pub fn methodology_synthesis(responses: &[ConsultedResponse]) -> BTreeMap<String, MethodologySummary> {
    let mut methodologies: BTreeMap<String, MethodologySummary> = BTreeMap::new();
    for response in responses {
        let summary = methodologies
            .entry(methodology_of(response))
            .or_insert_with(|| MethodologySummary {
                confidence: response.response.metadata.confidence,
                recommendations: Vec::new(),
            });
        if let Some(rec) = response.response.primary_recommendation() {
            summary.recommendations.push(rec.to_string());
        }
    }
    methodologies
}

/// Distinct primary recommendations, first occurrence wins
pub fn combined_recommendations(responses: &[ConsultedResponse]) -> Vec<String> {
    let mut seen = HashSet::new();
    responses
        .iter()
        .filter_map(|r| r.response.primary_recommendation())
        .filter(|rec| seen.insert(*rec))
        .map(str::to_string)
        .collect()
}

/// Words longer than four characters that appear in more than one recommendation
pub fn methodology_consensus(responses: &[ConsultedResponse]) -> MethodologyConsensus {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for rec in responses.iter().filter_map(|r| r.response.primary_recommendation()) {
        let words: BTreeSet<String> = rec
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.chars().count() > 4)
            .map(str::to_string)
            .collect();
        for word in words {
            *counts.entry(word).or_insert(0) += 1;
        }
    }

    let common_themes: BTreeMap<String, usize> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
    let consensus_strength = common_themes.len();
    MethodologyConsensus {
        common_themes,
        consensus_strength,
        methodology_agreement: consensus_strength > 2,
    }
}

/// Implementation approaches plus fixed coordination advice
pub fn implementation_synthesis(responses: &[ConsultedResponse]) -> ImplementationSynthesis {
    let combined_steps = responses
        .iter()
        .filter_map(|r| r.response.recommendations.get("implementation_approach"))
        .filter_map(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    ImplementationSynthesis {
        combined_steps,
        timeline_synthesis: "Coordinate parallel implementation where possible".to_string(),
        resource_optimization: "Leverage responder expertise efficiently".to_string(),
    }
}

/// Words longer than three characters shared by every recommendation; empty below two
pub fn agreed_recommendations(responses: &[ConsultedResponse]) -> Vec<String> {
    let word_sets: Vec<BTreeSet<String>> = responses
        .iter()
        .filter_map(|r| r.response.primary_recommendation())
        .map(|rec| rec.to_lowercase().split_whitespace().map(str::to_string).collect())
        .collect();

    let Some((first, rest)) = word_sets.split_first() else {
        return Vec::new();
    };
    if rest.is_empty() {
        return Vec::new();
    }

    first
        .iter()
        .filter(|w| w.chars().count() > 3)
        .filter(|w| rest.iter().all(|set| set.contains(*w)))
        .cloned()
        .collect()
}

/// One decision point per conflict
pub fn decision_points(conflicts: &[ConflictAnalysis]) -> Vec<DecisionPoint> {
    conflicts
        .iter()
        .map(|c| {
            let [first, second] = &c.responders;
            DecisionPoint {
                decision_required: format!("Choose approach for {}", c.kind),
                option_1: DecisionOption {
                    responder: first.clone(),
                    approach: c.first_approach.clone(),
                    methodology: "See responder methodology details".to_string(),
                },
                option_2: DecisionOption {
                    responder: second.clone(),
                    approach: c.second_approach.clone(),
                    methodology: "See responder methodology details".to_string(),
                },
                recommendation: "Consider business context and expert methodology alignment".to_string(),
            }
        })
        .collect()
}

/// Responder, methodology and confidence of each response
pub fn expert_perspectives(responses: &[ConsultedResponse]) -> Vec<ExpertPerspective> {
    responses
        .iter()
        .map(|r| ExpertPerspective {
            responder: r.responder.clone(),
            methodology: methodology_of(r),
            confidence: r.response.metadata.confidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::ConflictAnalyzer;
    use crate::request::AgentResponse;

    fn consulted(id: &str, rec: &str) -> ConsultedResponse {
        ConsultedResponse::new(id, AgentResponse::success(rec))
    }

    #[test]
    fn test_quality_score() {
        assert!((quality_score(ResponseStatus::Success, 3) - 1.0).abs() < 1e-9);
        assert!((quality_score(ResponseStatus::Success, 1) - 0.9).abs() < 1e-9);
        assert!((quality_score(ResponseStatus::Partial, 2) - 0.8).abs() < 1e-9);
        assert!((quality_score(ResponseStatus::Failed, 0) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_combined_recommendations_are_distinct() {
        let responses = [
            consulted("a", "Raise prices"),
            consulted("b", "Raise prices"),
            consulted("c", "Add a premium tier"),
        ];
        assert_eq!(
            combined_recommendations(&responses),
            vec!["Raise prices", "Add a premium tier"]
        );
    }

    #[test]
    fn test_methodology_consensus_counts_responses() {
        let responses = [
            consulted("a", "Premium pricing with clear value framing value"),
            consulted("b", "Premium positioning with value framing"),
            consulted("c", "Premium onboarding"),
        ];
        let consensus = methodology_consensus(&responses);
        assert_eq!(consensus.common_themes.get("premium"), Some(&3));
        assert_eq!(consensus.common_themes.get("value"), Some(&2));
        assert_eq!(consensus.common_themes.get("framing"), Some(&2));
        assert_eq!(consensus.common_themes.get("pricing"), None);
        assert_eq!(consensus.consensus_strength, 3);
        assert!(consensus.methodology_agreement);
    }

    #[test]
    fn test_agreed_recommendations_need_two_responses() {
        assert!(agreed_recommendations(&[consulted("a", "Premium pricing works")]).is_empty());

        let agreed = agreed_recommendations(&[
            consulted("a", "Premium pricing works for agencies"),
            consulted("b", "Agencies need premium pricing"),
        ]);
        assert_eq!(agreed, vec!["agencies", "premium", "pricing"]);
    }

    #[test]
    fn test_implementation_synthesis_reads_recommendations() {
        let response = AgentResponse::success("x").with_recommendation("implementation_approach", "Pilot first");
        let synthesis = implementation_synthesis(&[ConsultedResponse::new("a", response), consulted("b", "y")]);
        assert_eq!(synthesis.combined_steps, vec!["Pilot first"]);
        assert_eq!(
            synthesis.timeline_synthesis,
            "Coordinate parallel implementation where possible"
        );
    }

    #[test]
    fn test_decision_point_per_conflict() {
        let responses = [
            consulted("a", "Increase the retainer"),
            consulted("b", "Decrease the retainer"),
        ];
        let conflicts = ConflictAnalyzer::default().analyze(&responses);
        let points = decision_points(&conflicts);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].decision_required, "Choose approach for strategic disagreement");
        assert_eq!(points[0].option_1.responder.as_str(), "a");
        assert_eq!(points[0].option_2.approach, "Decrease the retainer");
    }

    #[test]
    fn test_methodology_synthesis_groups_by_framework() {
        let a = AgentResponse::success("One").with_framework("Chris Do").with_confidence(0.9);
        let b = AgentResponse::success("Two").with_framework("Chris Do").with_confidence(0.5);
        let c = AgentResponse::success("Three");
        let synthesis = methodology_synthesis(&[
            ConsultedResponse::new("a", a),
            ConsultedResponse::new("b", b),
            ConsultedResponse::new("c", c),
        ]);

        assert_eq!(synthesis["Chris Do"].recommendations, vec!["One", "Two"]);
        assert_eq!(synthesis["Chris Do"].confidence, 0.9);
        assert!(synthesis.contains_key("Unknown"));
    }

    #[test]
    fn test_sections_serialize_under_their_keys() {
        let outcome = PatternOutcome::settled(
            OrchestrationPattern::FanOutAggregate,
            1,
            vec![consulted("a", "Raise prices")],
            Vec::new(),
            PatternDetail::Aggregate,
        );
        let (status, section) = synthesize(&outcome);
        assert_eq!(status, ResponseStatus::Success);

        let value = serde_json::to_value(&section).unwrap();
        assert!(value.get("aggregated_results").is_some());
        assert_eq!(value["aggregated_results"]["responder_count"], 1);
    }

    #[test]
    fn test_methodology_report_mean() {
        let mut low = MethodologyValidationResult::neutral("a");
        low.compliance_score = 0.5;
        let high = MethodologyValidationResult::neutral("b");

        let report = MethodologyReport::from_results(vec![low, high]).unwrap();
        assert!((report.compliance_score - 0.625).abs() < 1e-9);
        assert!(MethodologyReport::from_results(Vec::new()).is_none());
    }
}
