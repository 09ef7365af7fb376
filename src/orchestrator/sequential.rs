//! Sequential pattern
//!
//! Responders run strictly in order. Each step sees the original context plus
//! every prior usable result, filtered for that responder. A failed step
//! contributes nothing and the chain keeps going.

use crate::orchestrator::analyzer::ExecutionPlan;
use crate::orchestrator::fan_out::{consult_with_timeout, partition};
use crate::orchestrator::pattern::{
    CallFailure, ExecutionContext, OrchestrationPattern, PatternDetail, PatternExecutor, PatternOutcome,
};
use crate::request::ConsultationRequest;
use async_trait::async_trait;
use std::time::Instant;

/// Ordered chain with context accumulation
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

impl SequentialExecutor {
    /// Create a sequential executor
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PatternExecutor for SequentialExecutor {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        request: &ConsultationRequest,
        plan: &ExecutionPlan,
    ) -> PatternOutcome {
        let start = Instant::now();
        let chain = plan.responders();
        let mut context = request.context.clone();
        let mut responses = Vec::new();
        let mut failures = Vec::new();

        for (step, responder) in chain.iter().enumerate() {
            if let Err(e) = ctx.snapshot.require(responder) {
                tracing::warn!("Skipping step {} ({}): {}", step + 1, responder, e);
                failures.push(CallFailure::from_error(responder, &e));
                continue;
            }

            let step_request = ctx.request_for(request, &context, responder);
            let result = consult_with_timeout(ctx, responder, step_request).await;
            let (usable, failed) = partition(vec![(responder.clone(), result)]);

            for consulted in &usable {
                context.extend(consulted.response.result.clone());
            }
            responses.extend(usable);
            failures.extend(failed);
        }

        tracing::debug!(
            steps = chain.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Sequential chain finished"
        );

        PatternOutcome::settled(
            OrchestrationPattern::Sequential,
            chain.len(),
            responses,
            failures,
            PatternDetail::Sequential {
                chain,
                final_context: context,
            },
        )
    }

    fn pattern(&self) -> OrchestrationPattern {
        OrchestrationPattern::Sequential
    }
}
