//! Fan-out aggregate pattern
//!
//! Every planned responder is called concurrently with its own filtered copy
//! of the context. Usable answers are kept, everything else is logged and
//! dropped.

use crate::orchestrator::analyzer::ExecutionPlan;
use crate::orchestrator::fan_out::{partition, require_capabilities, settle_all};
use crate::orchestrator::pattern::{
    CallFailure, ConsultedResponse, ExecutionContext, OrchestrationPattern, PatternDetail, PatternExecutor,
    PatternOutcome,
};
use crate::request::ConsultationRequest;
use crate::types::ResponderId;
use async_trait::async_trait;
use std::time::Instant;

/// Concurrent map-reduce over responders
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateExecutor;

impl AggregateExecutor {
    /// Create an aggregate executor
    pub fn new() -> Self {
        Self
    }
}

/// Fan out to `responders` and reduce to usable answers. Shared by the
/// aggregate and cross-validation patterns.
pub(crate) async fn fan_out(
    ctx: &ExecutionContext,
    request: &ConsultationRequest,
    responders: &[ResponderId],
) -> (Vec<ConsultedResponse>, Vec<CallFailure>) {
    let start = Instant::now();
    let mut failures = Vec::new();
    let callable = require_capabilities(ctx, responders, &mut failures);

    let calls = callable
        .into_iter()
        .map(|id| {
            let call = ctx.request_for(request, &request.context, &id);
            (id, call)
        })
        .collect();

    let (responses, failed) = partition(settle_all(ctx, calls).await);
    failures.extend(failed);

    tracing::debug!(
        planned = responders.len(),
        usable = responses.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Fan-out settled"
    );

    (responses, failures)
}

#[async_trait]
impl PatternExecutor for AggregateExecutor {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        request: &ConsultationRequest,
        plan: &ExecutionPlan,
    ) -> PatternOutcome {
        let responders = plan.responders();
        let (responses, failures) = fan_out(ctx, request, &responders).await;

        PatternOutcome::settled(
            OrchestrationPattern::FanOutAggregate,
            responders.len(),
            responses,
            failures,
            PatternDetail::Aggregate,
        )
    }

    fn pattern(&self) -> OrchestrationPattern {
        OrchestrationPattern::FanOutAggregate
    }
}
