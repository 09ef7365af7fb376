//! Request analysis and pattern selection
//!
//! Classifies a request by complexity and domain, matches it against the
//! capability snapshot to find candidate responders, picks an execution
//! pattern and decomposes the candidates into a capped plan.

use crate::capability::CapabilitySnapshot;
use crate::config::PlanLimits;
use crate::orchestrator::pattern::OrchestrationPattern;
use crate::request::ConsultationRequest;
use crate::scoring::{Domain, DomainDetector, LexicalDomainDetector};
use crate::types::ResponderId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request complexity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Fewer than two keyword hits, small context
    Simple,
    /// Two keyword hits or more than 500 context chars
    Moderate,
    /// Three keyword hits or more than 1000 context chars
    Complex,
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Moderate => write!(f, "moderate"),
            Self::Complex => write!(f, "complex"),
        }
    }
}

/// One step of a sequential chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// 1-based position
    pub step: usize,
    /// Responder called at this step
    pub responder: ResponderId,
    /// Previous step's responder
    pub depends_on: Option<ResponderId>,
}

/// Responders to call and how they relate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ExecutionPlan {
    /// Ordered chain
    Sequential {
        /// Steps in order
        steps: Vec<PlanStep>,
    },
    /// Concurrent set, merged
    Aggregate {
        /// Responders
        responders: Vec<ResponderId>,
    },
    /// Concurrent set, cross-checked
    CrossValidate {
        /// Responders
        responders: Vec<ResponderId>,
    },
    /// Supervisor and workers
    Hierarchical {
        /// Supervisor
        supervisor: ResponderId,
        /// Workers
        workers: Vec<ResponderId>,
    },
}

impl ExecutionPlan {
    /// Pattern this plan belongs to
    pub fn pattern(&self) -> OrchestrationPattern {
        match self {
            Self::Sequential { .. } => OrchestrationPattern::Sequential,
            Self::Aggregate { .. } => OrchestrationPattern::FanOutAggregate,
            Self::CrossValidate { .. } => OrchestrationPattern::FanOutCrossValidate,
            Self::Hierarchical { .. } => OrchestrationPattern::SupervisorWorker,
        }
    }

    /// Every planned responder, in plan order
    pub fn responders(&self) -> Vec<ResponderId> {
        match self {
            Self::Sequential { steps } => steps.iter().map(|s| s.responder.clone()).collect(),
            Self::Aggregate { responders } | Self::CrossValidate { responders } => responders.clone(),
            Self::Hierarchical { supervisor, workers } => std::iter::once(supervisor.clone())
                .chain(workers.iter().cloned())
                .collect(),
        }
    }

    /// Number of planned responders
    pub fn len(&self) -> usize {
        match self {
            Self::Sequential { steps } => steps.len(),
            Self::Aggregate { responders } | Self::CrossValidate { responders } => responders.len(),
            Self::Hierarchical { workers, .. } => workers.len() + 1,
        }
    }

    /// Whether no responder is planned
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Supervisor and workers; for other plans the first responder leads
    pub fn supervisor_split(&self) -> Option<(ResponderId, Vec<ResponderId>)> {
        match self {
            Self::Hierarchical { supervisor, workers } => Some((supervisor.clone(), workers.clone())),
            _ => {
                let mut responders = self.responders().into_iter();
                let supervisor = responders.next()?;
                Some((supervisor, responders.collect()))
            }
        }
    }
}

/// Everything learned about a request before execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestAnalysis {
    /// Complexity
    pub complexity: Complexity,
    /// Detected domains, never empty
    pub domains: Vec<Domain>,
    /// Candidate responders, never empty
    pub candidates: Vec<ResponderId>,
    /// Selected pattern
    pub pattern: OrchestrationPattern,
    /// Which selection rule fired
    pub selection_rule: String,
    /// Execution plan
    pub plan: ExecutionPlan,
}

/// Pure pattern selection
pub fn select_pattern(
    objective: &str,
    complexity: Complexity,
    domain_count: usize,
    candidate_count: usize,
) -> OrchestrationPattern {
    selection_rule(objective, complexity, domain_count, candidate_count).0
}

fn selection_rule(
    objective: &str,
    complexity: Complexity,
    domain_count: usize,
    candidate_count: usize,
) -> (OrchestrationPattern, &'static str) {
    let objective = objective.to_lowercase();
    if objective.contains("compare") || objective.contains("validate") {
        (OrchestrationPattern::FanOutCrossValidate, "comparison_requested")
    } else if candidate_count > 3 && domain_count > 2 {
        (OrchestrationPattern::FanOutAggregate, "broad_multi_domain")
    } else if complexity == Complexity::Complex && domain_count > 1 {
        (OrchestrationPattern::Sequential, "complex_multi_domain")
    } else {
        (OrchestrationPattern::Sequential, "default")
    }
}

/// Classifies requests and plans their execution
#[derive(Clone)]
pub struct RequestAnalyzer {
    snapshot: Arc<CapabilitySnapshot>,
    detector: Arc<dyn DomainDetector>,
    default_responder: ResponderId,
    limits: PlanLimits,
}

impl std::fmt::Debug for RequestAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAnalyzer")
            .field("responders", &self.snapshot.len())
            .field("default_responder", &self.default_responder)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl RequestAnalyzer {
    /// Create an analyzer with the lexical domain detector
    pub fn new(snapshot: Arc<CapabilitySnapshot>, default_responder: impl Into<ResponderId>) -> Self {
        Self {
            snapshot,
            detector: Arc::new(LexicalDomainDetector::default()),
            default_responder: default_responder.into(),
            limits: PlanLimits::default(),
        }
    }

    /// Replace the domain detector
    pub fn with_detector(mut self, detector: Arc<dyn DomainDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Set plan caps
    pub fn with_limits(mut self, limits: PlanLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Keyword hits in the objective and serialized context size
    pub fn assess_complexity(&self, request: &ConsultationRequest) -> Complexity {
        let hits = self.detector.keyword_hits(&request.objective);
        let size = request.context_text().chars().count();

        if hits >= 3 || size > 1000 {
            Complexity::Complex
        } else if hits >= 2 || size > 500 {
            Complexity::Moderate
        } else {
            Complexity::Simple
        }
    }

    /// Domains in the objective and context; business/sales when none match
    pub fn identify_domains(&self, request: &ConsultationRequest) -> Vec<Domain> {
        let domains = self.detector.detect(&request.combined_text());
        if domains.is_empty() {
            vec![Domain::BusinessStrategySales]
        } else {
            domains
        }
    }

    /// Responders with a trigger word in the request; the default responder when none match
    pub fn identify_candidates(&self, request: &ConsultationRequest) -> Vec<ResponderId> {
        let text = request.combined_text();
        let candidates: Vec<ResponderId> = self
            .snapshot
            .iter()
            .filter(|spec| spec.trigger_words().iter().any(|w| text.contains(w.as_str())))
            .map(|spec| spec.id.clone())
            .collect();

        if candidates.is_empty() {
            tracing::debug!(
                default = %self.default_responder,
                "No trigger matched, falling back to default responder"
            );
            vec![self.default_responder.clone()]
        } else {
            candidates
        }
    }

    /// Pure pattern selection
    pub fn select_pattern(
        &self,
        objective: &str,
        complexity: Complexity,
        domain_count: usize,
        candidate_count: usize,
    ) -> OrchestrationPattern {
        select_pattern(objective, complexity, domain_count, candidate_count)
    }

    /// Cap the candidates into a plan for `pattern`
    pub fn plan_decomposition(&self, pattern: OrchestrationPattern, candidates: &[ResponderId]) -> ExecutionPlan {
        let fallback = [self.default_responder.clone()];
        let candidates = if candidates.is_empty() { &fallback[..] } else { candidates };

        match pattern {
            OrchestrationPattern::Sequential => {
                let mut previous: Option<ResponderId> = None;
                let steps = candidates
                    .iter()
                    .take(self.limits.sequential_steps)
                    .enumerate()
                    .map(|(i, responder)| PlanStep {
                        step: i + 1,
                        responder: responder.clone(),
                        depends_on: previous.replace(responder.clone()),
                    })
                    .collect();
                ExecutionPlan::Sequential { steps }
            }
            OrchestrationPattern::FanOutAggregate => ExecutionPlan::Aggregate {
                responders: capped(candidates, self.limits.parallel_responders),
            },
            OrchestrationPattern::FanOutCrossValidate => ExecutionPlan::CrossValidate {
                responders: capped(candidates, self.limits.validation_responders),
            },
            OrchestrationPattern::SupervisorWorker => ExecutionPlan::Hierarchical {
                supervisor: candidates[0].clone(),
                workers: candidates[1..]
                    .iter()
                    .take(self.limits.workers)
                    .cloned()
                    .collect(),
            },
        }
    }

    /// Full analysis of a request
    pub fn analyze(&self, request: &ConsultationRequest) -> RequestAnalysis {
        let complexity = self.assess_complexity(request);
        let domains = self.identify_domains(request);
        let candidates = self.identify_candidates(request);
        let (pattern, rule) = selection_rule(&request.objective, complexity, domains.len(), candidates.len());
        let plan = self.plan_decomposition(pattern, &candidates);

        tracing::info!(
            complexity = %complexity,
            domains = domains.len(),
            candidates = candidates.len(),
            pattern = %pattern,
            rule,
            "Request analyzed"
        );

        RequestAnalysis {
            complexity,
            domains,
            candidates,
            pattern,
            selection_rule: rule.to_string(),
            plan,
        }
    }

    /// Analysis with the pattern forced, plan rebuilt for it
    pub fn analyze_with_pattern(&self, request: &ConsultationRequest, pattern: OrchestrationPattern) -> RequestAnalysis {
        let mut analysis = self.analyze(request);
        analysis.pattern = pattern;
        analysis.selection_rule = "explicit_override".to_string();
        analysis.plan = self.plan_decomposition(pattern, &analysis.candidates);
        analysis
    }
}

fn capped(candidates: &[ResponderId], limit: usize) -> Vec<ResponderId> {
    candidates.iter().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySpec;

    fn snapshot() -> Arc<CapabilitySnapshot> {
        CapabilitySnapshot::from_specs([
            CapabilitySpec::new("sales-specialist").with_triggers(["pricing strategy", "client proposals"]),
            CapabilitySpec::new("brand-strategist").with_triggers(["brand positioning"]),
            CapabilitySpec::new("ux-designer").with_triggers(["website usability"]),
            CapabilitySpec::new("copywriter").with_triggers(["marketing copy"]),
            CapabilitySpec::new("seo-expert").with_triggers(["search rankings"]),
        ])
        .shared()
    }

    fn analyzer() -> RequestAnalyzer {
        RequestAnalyzer::new(snapshot(), "sales-specialist")
    }

    fn ids(names: &[&str]) -> Vec<ResponderId> {
        names.iter().map(|n| ResponderId::new(*n)).collect()
    }

    #[test]
    fn test_complexity_from_keywords() {
        let a = analyzer();
        assert_eq!(
            a.assess_complexity(&ConsultationRequest::new("Help with pricing")),
            Complexity::Simple
        );
        assert_eq!(
            a.assess_complexity(&ConsultationRequest::new("Pricing and sales help")),
            Complexity::Moderate
        );
        assert_eq!(
            a.assess_complexity(&ConsultationRequest::new("Brand, website and marketing overhaul")),
            Complexity::Complex
        );
    }

    #[test]
    fn test_complexity_from_context_size() {
        let a = analyzer();
        let moderate = ConsultationRequest::new("help").with_context_entry("notes", "x".repeat(600));
        assert_eq!(a.assess_complexity(&moderate), Complexity::Moderate);

        let complex = ConsultationRequest::new("help").with_context_entry("notes", "x".repeat(1200));
        assert_eq!(a.assess_complexity(&complex), Complexity::Complex);
    }

    #[test]
    fn test_domains_never_empty() {
        let a = analyzer();
        assert_eq!(
            a.identify_domains(&ConsultationRequest::new("hello there")),
            vec![Domain::BusinessStrategySales]
        );

        let domains = a.identify_domains(
            &ConsultationRequest::new("Redesign the website").with_context_entry("channel", "email marketing"),
        );
        assert!(domains.contains(&Domain::DesignVisual));
        assert!(domains.contains(&Domain::ContentCommunication));
    }

    #[test]
    fn test_candidates_match_trigger_words() {
        let a = analyzer();
        let candidates = a.identify_candidates(
            &ConsultationRequest::new("Improve our pricing").with_context_entry("focus", "brand refresh"),
        );
        assert_eq!(candidates, ids(&["brand-strategist", "sales-specialist"]));
    }

    #[test]
    fn test_candidates_fall_back_to_default() {
        let a = RequestAnalyzer::new(snapshot(), "generalist");
        assert_eq!(
            a.identify_candidates(&ConsultationRequest::new("hello")),
            ids(&["generalist"])
        );
    }

    #[test]
    fn test_candidates_never_empty() {
        let analyzers = [
            analyzer(),
            RequestAnalyzer::new(CapabilitySnapshot::empty().shared(), "sales-specialist"),
        ];
        let requests = [
            ConsultationRequest::new(""),
            ConsultationRequest::new("Compare pricing strategy and brand positioning"),
            ConsultationRequest::new("???").with_context_entry("notes", "x".repeat(2000)),
        ];
        for a in &analyzers {
            for request in &requests {
                assert!(!a.identify_candidates(request).is_empty());
                assert!(!a.analyze(request).plan.is_empty());
            }
        }
    }

    #[test]
    fn test_select_pattern_is_deterministic() {
        let first = select_pattern("Grow the studio", Complexity::Complex, 3, 5);
        for _ in 0..10 {
            assert_eq!(select_pattern("Grow the studio", Complexity::Complex, 3, 5), first);
        }
    }

    #[test]
    fn test_select_pattern_priority() {
        assert_eq!(
            select_pattern("Compare pricing approaches", Complexity::Simple, 1, 1),
            OrchestrationPattern::FanOutCrossValidate
        );
        assert_eq!(
            select_pattern("VALIDATE our plan", Complexity::Complex, 5, 9),
            OrchestrationPattern::FanOutCrossValidate
        );
        assert_eq!(
            select_pattern("Grow everything", Complexity::Simple, 3, 4),
            OrchestrationPattern::FanOutAggregate
        );
        assert_eq!(
            select_pattern("Grow everything", Complexity::Simple, 3, 3),
            OrchestrationPattern::Sequential
        );
        assert_eq!(
            select_pattern("Grow", Complexity::Complex, 2, 1),
            OrchestrationPattern::Sequential
        );
    }

    #[test]
    fn test_select_pattern_never_picks_hierarchical() {
        let complexities = [Complexity::Simple, Complexity::Moderate, Complexity::Complex];
        for objective in ["compare", "grow", "validate", ""] {
            for complexity in complexities {
                for domains in 0..6 {
                    for candidates in 0..8 {
                        assert_ne!(
                            select_pattern(objective, complexity, domains, candidates),
                            OrchestrationPattern::SupervisorWorker
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_sequential_plan_is_capped_and_chained() {
        let a = analyzer();
        let plan = a.plan_decomposition(OrchestrationPattern::Sequential, &ids(&["a", "b", "c", "d"]));
        let ExecutionPlan::Sequential { steps } = &plan else {
            panic!("expected sequential plan");
        };
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].depends_on, None);
        assert_eq!(steps[1].depends_on, Some(ResponderId::new("a")));
        assert_eq!(steps[2].depends_on, Some(ResponderId::new("b")));
        assert_eq!(steps[2].step, 3);
    }

    #[test]
    fn test_fan_out_plans_are_capped() {
        let a = analyzer();
        let many = ids(&["a", "b", "c", "d", "e", "f"]);

        let aggregate = a.plan_decomposition(OrchestrationPattern::FanOutAggregate, &many);
        assert_eq!(aggregate.len(), 4);

        let validate = a.plan_decomposition(OrchestrationPattern::FanOutCrossValidate, &many);
        assert_eq!(validate.responders(), ids(&["a", "b", "c"]));

        let hierarchical = a.plan_decomposition(OrchestrationPattern::SupervisorWorker, &many);
        assert_eq!(
            hierarchical,
            ExecutionPlan::Hierarchical {
                supervisor: ResponderId::new("a"),
                workers: ids(&["b", "c"]),
            }
        );
    }

    #[test]
    fn test_limits_are_configurable() {
        let a = analyzer().with_limits(PlanLimits {
            sequential_steps: 1,
            parallel_responders: 2,
            validation_responders: 2,
            workers: 0,
        });
        let many = ids(&["a", "b", "c"]);
        assert_eq!(a.plan_decomposition(OrchestrationPattern::Sequential, &many).len(), 1);
        assert_eq!(a.plan_decomposition(OrchestrationPattern::SupervisorWorker, &many).len(), 1);
    }

    #[test]
    fn test_empty_candidates_plan_default_responder() {
        let plan = analyzer().plan_decomposition(OrchestrationPattern::FanOutAggregate, &[]);
        assert_eq!(plan.responders(), ids(&["sales-specialist"]));
    }

    #[test]
    fn test_analyze_compare_request() {
        let analysis = analyzer().analyze(&ConsultationRequest::new("Compare pricing approaches for clients"));
        assert_eq!(analysis.pattern, OrchestrationPattern::FanOutCrossValidate);
        assert_eq!(analysis.selection_rule, "comparison_requested");
        assert_eq!(analysis.plan.pattern(), analysis.pattern);
        assert!(!analysis.candidates.is_empty());
    }

    #[test]
    fn test_supervisor_split_for_flat_plans() {
        let plan = ExecutionPlan::Aggregate { responders: ids(&["a", "b"]) };
        assert_eq!(
            plan.supervisor_split(),
            Some((ResponderId::new("a"), ids(&["b"])))
        );
        assert_eq!(ExecutionPlan::Aggregate { responders: vec![] }.supervisor_split(), None);
    }
}
