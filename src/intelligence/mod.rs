//! Overlap, conflict, quality and context intelligence
//!
//! Everything here runs after (or around) pattern execution and is read-only
//! with respect to responder state. Engine calls return [`Result`] so callers
//! can fold a failure into an absent block instead of failing the consultation.

pub mod conflict;
pub mod context;
pub mod overlap;
pub mod quality;

pub use conflict::{
    ConflictAnalysis, ConflictAnalyzer, ConflictKind, ConflictSeverity, RecommendedResolution,
    ResolutionOption,
};
pub use context::ContextOptimizer;
pub use overlap::{AgentOverlap, OverlapDetector, OverlapKind, OverlapResolution};
pub use quality::{QualityAssessor, QualityMetrics};

use crate::capability::CapabilitySnapshot;
use crate::error::Result;
use crate::orchestrator::ConsultedResponse;
use crate::request::{ConsultationRequest, ContextMap};
use crate::scoring::DisagreementDetector;
use crate::types::ResponderId;
use std::sync::Arc;

/// Facade over the four intelligence components
#[derive(Debug, Clone)]
pub struct IntelligenceEngine {
    overlaps: OverlapDetector,
    conflicts: ConflictAnalyzer,
    quality: QualityAssessor,
    context: ContextOptimizer,
}

impl IntelligenceEngine {
    /// Build every component over the same snapshot
    pub fn new(snapshot: Arc<CapabilitySnapshot>) -> Self {
        tracing::debug!(responders = snapshot.len(), "Intelligence engine initialized");
        Self {
            overlaps: OverlapDetector::new(snapshot.clone()),
            conflicts: ConflictAnalyzer::default(),
            quality: QualityAssessor::new(),
            context: ContextOptimizer::new(snapshot),
        }
    }

    /// Replace the disagreement detector used for conflict analysis
    pub fn with_disagreement_detector(mut self, detector: Arc<dyn DisagreementDetector>) -> Self {
        self.conflicts = ConflictAnalyzer::new(detector);
        self
    }

    /// Overlaps relevant to a request
    pub fn analyze_overlaps(&self, request: &ConsultationRequest) -> Result<Vec<AgentOverlap>> {
        Ok(self.overlaps.detect(request))
    }

    /// Pairwise conflicts among usable responses
    pub fn analyze_conflicts(&self, responses: &[ConsultedResponse]) -> Result<Vec<ConflictAnalysis>> {
        Ok(self.conflicts.analyze(responses))
    }

    /// Quality of a serialized synthesized result
    pub fn assess_quality(&self, result: &serde_json::Value) -> Result<QualityMetrics> {
        self.quality.assess(result)
    }

    /// Context filtered for one responder
    pub fn optimize_context(&self, context: &ContextMap, responder: &ResponderId) -> ContextMap {
        self.context.optimize(context, responder)
    }

    /// Conflict analyzer, for executors that need conflicts mid-pattern
    pub fn conflict_analyzer(&self) -> &ConflictAnalyzer {
        &self.conflicts
    }
}
