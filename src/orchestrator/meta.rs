//! Meta-orchestrator
//!
//! Entry point of a consultation: analyze the request, optionally prune
//! overlapping candidates, run the selected pattern, synthesize the result and
//! attach whatever intelligence could be computed. Nothing in here fails the
//! consultation; intelligence and validation errors are folded into
//! `meta.intelligence.degraded`.

use crate::capability::{CapabilitySnapshot, CapabilitySource, DirectoryCapabilitySource};
use crate::config::OrchestratorSettings;
use crate::error::Result;
use crate::intelligence::{AgentOverlap, IntelligenceEngine, OverlapKind};
use crate::methodology::MethodologyValidator;
use crate::orchestrator::aggregate::AggregateExecutor;
use crate::orchestrator::analyzer::{ExecutionPlan, RequestAnalysis, RequestAnalyzer};
use crate::orchestrator::cross_validate::CrossValidateExecutor;
use crate::orchestrator::hierarchical::HierarchicalExecutor;
use crate::orchestrator::pattern::{
    ExecutionContext, OrchestrationPattern, PatternDetail, PatternExecutor, PatternOutcome,
};
use crate::orchestrator::sequential::SequentialExecutor;
use crate::orchestrator::synthesis::{
    quality_score, synthesize, ConsultationMeta, IntelligenceReport, MethodologyReport, SynthesizedResult,
};
use crate::request::ConsultationRequest;
use crate::responder::{Responder, SimulatedResponder};
use crate::scoring::{DisagreementDetector, DomainDetector};
use crate::telemetry::{ConsultationTrace, Phase};
use crate::types::{ConsultationId, ResponderId};
use std::sync::Arc;
use std::time::Instant;

/// Feature names reported in `meta.intelligence.degraded`
pub mod features {
    /// Overlap detection
    pub const OVERLAP_DETECTION: &str = "overlap_detection";
    /// Conflict analysis
    pub const CONFLICT_ANALYSIS: &str = "conflict_analysis";
    /// Methodology validation
    pub const METHODOLOGY_VALIDATION: &str = "methodology_validation";
    /// Quality assessment
    pub const QUALITY_ASSESSMENT: &str = "quality_assessment";
}

/// Coordinates analysis, execution, synthesis and intelligence
#[derive(Debug, Clone)]
pub struct MetaOrchestrator {
    settings: OrchestratorSettings,
    snapshot: Arc<CapabilitySnapshot>,
    analyzer: RequestAnalyzer,
    execution: ExecutionContext,
    intelligence: IntelligenceEngine,
    validator: MethodologyValidator,
}

impl MetaOrchestrator {
    /// Create an orchestrator over a loaded snapshot
    pub fn new(
        snapshot: Arc<CapabilitySnapshot>,
        responder: Arc<dyn Responder>,
        settings: OrchestratorSettings,
    ) -> Self {
        tracing::info!(
            responders = snapshot.len(),
            responder_type = responder.responder_type(),
            intelligence = settings.intelligence_enabled,
            "Meta-orchestrator initialized"
        );

        let intelligence = IntelligenceEngine::new(snapshot.clone());
        Self {
            analyzer: RequestAnalyzer::new(snapshot.clone(), settings.default_responder.clone())
                .with_limits(settings.limits),
            execution: ExecutionContext::new(responder, snapshot.clone(), settings.call_timeout())
                .with_intelligence(intelligence.clone()),
            intelligence,
            validator: MethodologyValidator::default(),
            snapshot,
            settings,
        }
    }

    /// Load the snapshot from a source; an unavailable source yields an empty registry
    pub async fn from_source(
        source: &dyn CapabilitySource,
        responder: Arc<dyn Responder>,
        settings: OrchestratorSettings,
    ) -> Self {
        let snapshot = CapabilitySnapshot::load_or_empty(source).await.shared();
        Self::new(snapshot, responder, settings)
    }

    /// Load the snapshot from `settings.capability_dir`, if configured
    pub async fn from_settings(settings: OrchestratorSettings, responder: Arc<dyn Responder>) -> Self {
        match settings.capability_dir.clone() {
            Some(dir) => Self::from_source(&DirectoryCapabilitySource::new(dir), responder, settings).await,
            None => {
                tracing::warn!("No capability directory configured, starting with empty registry");
                Self::new(CapabilitySnapshot::empty().shared(), responder, settings)
            }
        }
    }

    /// Orchestrator answering through a [`SimulatedResponder`]
    pub fn simulated(snapshot: Arc<CapabilitySnapshot>, settings: OrchestratorSettings) -> Self {
        let responder = Arc::new(SimulatedResponder::new(snapshot.clone()));
        Self::new(snapshot, responder, settings)
    }

    /// Replace the domain detector used by the analyzer
    pub fn with_domain_detector(mut self, detector: Arc<dyn DomainDetector>) -> Self {
        self.analyzer = self.analyzer.with_detector(detector);
        self
    }

    /// Replace the disagreement detector used for conflict analysis
    pub fn with_disagreement_detector(mut self, detector: Arc<dyn DisagreementDetector>) -> Self {
        self.intelligence = self.intelligence.with_disagreement_detector(detector);
        self.execution = self.execution.with_intelligence(self.intelligence.clone());
        self
    }

    /// Replace the methodology validator
    pub fn with_validator(mut self, validator: MethodologyValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Capability snapshot
    pub fn snapshot(&self) -> &CapabilitySnapshot {
        &self.snapshot
    }

    /// Settings
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Analyze a request without executing it
    pub fn analyze(&self, request: &ConsultationRequest) -> RequestAnalysis {
        self.analyzer.analyze(request)
    }

    /// Run a consultation with the automatically selected pattern
    pub async fn execute_consultation(&self, request: ConsultationRequest) -> SynthesizedResult {
        self.run(request, None).await
    }

    /// Run a consultation with an explicit pattern
    pub async fn execute_with_pattern(
        &self,
        request: ConsultationRequest,
        pattern: OrchestrationPattern,
    ) -> SynthesizedResult {
        self.run(request, Some(pattern)).await
    }

    async fn run(&self, request: ConsultationRequest, pattern: Option<OrchestrationPattern>) -> SynthesizedResult {
        let start = Instant::now();
        let consultation_id = ConsultationId::new();
        let mut trace = ConsultationTrace::start(consultation_id);
        let mut degraded = Vec::new();
        let mut report = IntelligenceReport::default();

        tracing::info!(
            consultation_id = %consultation_id,
            objective = %request.objective,
            "Consultation started"
        );

        trace.begin(Phase::Analysis);
        let mut analysis = match pattern {
            Some(pattern) => self.analyzer.analyze_with_pattern(&request, pattern),
            None => self.analyzer.analyze(&request),
        };
        trace.record("pattern", analysis.pattern.as_str());
        trace.record("candidates", analysis.candidates.len());

        let mut pruned = Vec::new();
        if self.settings.intelligence_enabled {
            trace.begin(Phase::OverlapDetection);
            let overlaps = best_effort(
                features::OVERLAP_DETECTION,
                self.intelligence.analyze_overlaps(&request),
                &mut degraded,
            );
            if let Some(overlaps) = overlaps {
                trace.record("overlaps", overlaps.len());
                if self.settings.prune_overlapping_candidates {
                    pruned = self.prune_candidates(&mut analysis, &overlaps);
                }
                report.overlaps_detected = Some(overlaps.len());
                report.overlaps = overlaps;
            }
        }

        trace.begin(Phase::Execution);
        let outcome = self.dispatch(&request, &analysis.plan).await;
        trace.record("state", format!("{:?}", outcome.state));
        trace.record("usable", outcome.responses.len());

        if self.settings.intelligence_enabled {
            report.conflicts = match &outcome.detail {
                PatternDetail::CrossValidate { conflicts, .. } => Some(conflicts.clone()),
                _ => best_effort(
                    features::CONFLICT_ANALYSIS,
                    self.intelligence.analyze_conflicts(&outcome.responses),
                    &mut degraded,
                ),
            };
        }

        trace.begin(Phase::Synthesis);
        let (status, section) = synthesize(&outcome);

        let methodology_validation = if self.settings.validate_methodology {
            trace.begin(Phase::Validation);
            best_effort(
                features::METHODOLOGY_VALIDATION,
                self.validate_responses(&outcome),
                &mut degraded,
            )
            .flatten()
        } else {
            None
        };

        let responders_consulted = outcome.responders_consulted();
        let mut result = SynthesizedResult {
            consultation_id,
            status,
            orchestration_pattern: outcome.pattern,
            section,
            meta: ConsultationMeta {
                analysis,
                responders_consulted,
                execution_state: outcome.state,
                failures: outcome.failures,
                pruned_responders: pruned,
                quality_score: quality_score(status, responders_consulted),
                intelligence: None,
                methodology_validation,
                trace: trace.clone(),
            },
        };

        if self.settings.intelligence_enabled {
            trace.begin(Phase::QualityAssessment);
            let metrics = best_effort(
                features::QUALITY_ASSESSMENT,
                result.to_json().and_then(|value| self.intelligence.assess_quality(&value)),
                &mut degraded,
            );
            if let Some(metrics) = metrics {
                trace.record("overall", metrics.overall);
                report.optimization_suggestions = metrics.optimization_suggestions();
                report.quality_metrics = Some(metrics);
            }
        }

        if self.settings.intelligence_enabled || !degraded.is_empty() {
            report.degraded = degraded;
            result.meta.intelligence = Some(report);
        }

        trace.finish();
        result.meta.trace = trace;

        tracing::info!(
            consultation_id = %consultation_id,
            pattern = %result.orchestration_pattern,
            status = %result.status,
            responders = responders_consulted,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Consultation complete"
        );

        result
    }

    async fn dispatch(&self, request: &ConsultationRequest, plan: &ExecutionPlan) -> PatternOutcome {
        let ctx = &self.execution;
        match plan.pattern() {
            OrchestrationPattern::Sequential => SequentialExecutor::new().execute(ctx, request, plan).await,
            OrchestrationPattern::FanOutAggregate => AggregateExecutor::new().execute(ctx, request, plan).await,
            OrchestrationPattern::FanOutCrossValidate => {
                CrossValidateExecutor::new().execute(ctx, request, plan).await
            }
            OrchestrationPattern::SupervisorWorker => HierarchicalExecutor::new().execute(ctx, request, plan).await,
        }
    }

    /// Validate every usable response; `None` when nothing answered
    fn validate_responses(&self, outcome: &PatternOutcome) -> Result<Option<MethodologyReport>> {
        let results = outcome
            .responses
            .iter()
            .map(|r| {
                let spec = self.snapshot.get(r.responder.as_str());
                self.validator.validate(&r.responder, spec, &r.response)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MethodologyReport::from_results(results))
    }

    /// Keep the first candidate of each methodology family, then re-plan
    fn prune_candidates(&self, analysis: &mut RequestAnalysis, overlaps: &[AgentOverlap]) -> Vec<ResponderId> {
        let mut pruned: Vec<ResponderId> = Vec::new();

        for overlap in overlaps.iter().filter(|o| o.kind == OverlapKind::MethodologyFamily) {
            let members: Vec<&ResponderId> = analysis
                .candidates
                .iter()
                .filter(|c| overlap.involves(c))
                .collect();
            if let Some((kept, rest)) = members.split_first() {
                if !rest.is_empty() {
                    tracing::info!(
                        kept = %kept,
                        dropped = rest.len(),
                        area = ?overlap.areas,
                        "Pruning overlapping candidates"
                    );
                }
                pruned.extend(rest.iter().map(|id| (*id).clone()));
            }
        }

        if !pruned.is_empty() {
            analysis.candidates.retain(|c| !pruned.contains(c));
            analysis.plan = self.analyzer.plan_decomposition(analysis.pattern, &analysis.candidates);
        }
        pruned
    }
}

/// Fold an intelligence result into an optional value, recording the feature on failure
fn best_effort<T>(feature: &str, result: Result<T>, degraded: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(feature, error = %e, "Intelligence feature degraded");
            degraded.push(feature.to_string());
            None
        }
    }
}
