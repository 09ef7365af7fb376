//! Orchestrator module - request analysis, pattern execution and synthesis
//!
//! # Patterns
//!
//! - **Sequential**: responders run in order, each seeing prior results
//! - **Fan-out aggregate**: concurrent calls, merged recommendations
//! - **Fan-out cross-validate**: concurrent calls, pairwise conflict check
//! - **Supervisor/worker**: guidance call followed by concurrent workers
//!
//! # Example
//!
//! ```rust,ignore
//! use consilium::orchestrator::MetaOrchestrator;
//!
//! let orchestrator = MetaOrchestrator::simulated(snapshot, OrchestratorSettings::default());
//! let result = orchestrator
//!     .execute_consultation(ConsultationRequest::new("Compare pricing approaches"))
//!     .await;
//! ```

pub mod aggregate;
pub mod analyzer;
pub mod cross_validate;
pub mod fan_out;
pub mod hierarchical;
pub mod meta;
pub mod pattern;
pub mod sequential;
pub mod synthesis;

// Re-exports
pub use aggregate::AggregateExecutor;
pub use analyzer::{
    select_pattern,
    Complexity,
    ExecutionPlan,
    PlanStep,
    RequestAnalysis,
    RequestAnalyzer,
};
pub use cross_validate::CrossValidateExecutor;
pub use fan_out::settle_all;
pub use hierarchical::HierarchicalExecutor;
pub use meta::MetaOrchestrator;
pub use pattern::{
    CallFailure,
    ConsultedResponse,
    ExecutionContext,
    ExecutionState,
    FailureKind,
    OrchestrationPattern,
    PatternDetail,
    PatternExecutor,
    PatternOutcome,
    Resolution,
};
pub use sequential::SequentialExecutor;
pub use synthesis::{
    ConsultationMeta,
    IntelligenceReport,
    MethodologyReport,
    PatternSection,
    SynthesizedResult,
};

#[cfg(test)]
pub(crate) mod testing {
    use super::ExecutionContext;
    use crate::capability::{CapabilitySnapshot, CapabilitySpec};
    use crate::responder::testing::ScriptedResponder;
    use std::sync::Arc;
    use std::time::Duration;

    /// Execution context over `specs`, answering through a scripted responder
    pub(crate) fn execution_context(
        responder: ScriptedResponder,
        specs: Vec<CapabilitySpec>,
    ) -> (ExecutionContext, Arc<ScriptedResponder>) {
        let responder = Arc::new(responder);
        let snapshot = CapabilitySnapshot::from_specs(specs).shared();
        let ctx = ExecutionContext::new(responder.clone(), snapshot, Duration::from_secs(5));
        (ctx, responder)
    }
}
