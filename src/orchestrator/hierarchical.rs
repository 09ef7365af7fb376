//! Supervisor/worker pattern
//!
//! The supervisor is asked for high-level guidance first. Its result is
//! handed to every worker under `supervisor_guidance`, and the workers then
//! run concurrently. A supervisor failure leaves the workers running without
//! guidance.

use crate::orchestrator::analyzer::ExecutionPlan;
use crate::orchestrator::fan_out::{consult_with_timeout, partition, require_capabilities, settle_all};
use crate::orchestrator::pattern::{
    CallFailure, ConsultedResponse, ExecutionContext, OrchestrationPattern, PatternDetail, PatternExecutor, PatternOutcome,
};
use crate::request::{ConsultationRequest, ContextMap};
use crate::types::ResponderId;
use async_trait::async_trait;
use std::time::Instant;

/// Context key carrying the supervisor's result to workers
pub const SUPERVISOR_GUIDANCE: &str = "supervisor_guidance";

/// Output format requested from the supervisor
pub const GUIDANCE_FORMAT: &str = "strategic_guidance";

/// One supervisor guiding concurrent workers
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalExecutor;

impl HierarchicalExecutor {
    /// Create a supervisor/worker executor
    pub fn new() -> Self {
        Self
    }

    /// Request sent to the supervisor
    pub fn supervisor_request(request: &ConsultationRequest) -> ConsultationRequest {
        request
            .with_objective(format!("Provide high-level guidance for: {}", request.objective))
            .with_output_format(GUIDANCE_FORMAT)
    }

    async fn consult_supervisor(
        ctx: &ExecutionContext,
        request: &ConsultationRequest,
        supervisor: &ResponderId,
        failures: &mut Vec<CallFailure>,
    ) -> Option<ConsultedResponse> {
        if let Err(e) = ctx.snapshot.require(supervisor) {
            tracing::warn!("Skipping supervisor {}: {}", supervisor, e);
            failures.push(CallFailure::from_error(supervisor, &e));
            return None;
        }

        let result = consult_with_timeout(ctx, supervisor, Self::supervisor_request(request)).await;
        let (mut usable, failed) = partition(vec![(supervisor.clone(), result)]);
        failures.extend(failed);
        usable.pop()
    }
}

#[async_trait]
impl PatternExecutor for HierarchicalExecutor {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        request: &ConsultationRequest,
        plan: &ExecutionPlan,
    ) -> PatternOutcome {
        let start = Instant::now();
        let Some((supervisor, workers)) = plan.supervisor_split() else {
            return PatternOutcome::settled(
                OrchestrationPattern::SupervisorWorker,
                0,
                Vec::new(),
                Vec::new(),
                PatternDetail::Hierarchical {
                    supervisor: ResponderId::new(""),
                    guidance: None,
                    workers: Vec::new(),
                },
            );
        };

        let mut failures = Vec::new();
        let lead = Self::consult_supervisor(ctx, request, &supervisor, &mut failures).await;
        let guidance: Option<ContextMap> = lead.as_ref().map(|r| r.response.result.clone());
        if guidance.is_none() {
            tracing::warn!("Supervisor {} gave no guidance, workers run without it", supervisor);
        }

        let callable = require_capabilities(ctx, &workers, &mut failures);
        let calls = callable
            .into_iter()
            .map(|id| {
                let mut context = ctx.intelligence.optimize_context(&request.context, &id);
                if let Some(guidance) = &guidance {
                    context.insert(
                        SUPERVISOR_GUIDANCE.to_string(),
                        serde_json::Value::Object(guidance.clone().into_iter().collect()),
                    );
                }
                let call = request.with_context(context);
                (id, call)
            })
            .collect();

        let (worker_responses, worker_failures) = partition(settle_all(ctx, calls).await);
        failures.extend(worker_failures);

        tracing::debug!(
            supervisor = %supervisor,
            workers = workers.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Supervisor/worker run finished"
        );

        let answered: Vec<ResponderId> = worker_responses.iter().map(|r| r.responder.clone()).collect();
        let responses = lead.into_iter().chain(worker_responses).collect();

        PatternOutcome::settled(
            OrchestrationPattern::SupervisorWorker,
            workers.len() + 1,
            responses,
            failures,
            PatternDetail::Hierarchical {
                supervisor,
                guidance,
                workers: answered,
            },
        )
    }

    fn pattern(&self) -> OrchestrationPattern {
        OrchestrationPattern::SupervisorWorker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySpec;
    use crate::orchestrator::pattern::{ExecutionState, FailureKind};
    use crate::orchestrator::testing::execution_context;
    use crate::request::AgentResponse;
    use crate::responder::testing::ScriptedResponder;

    fn plan() -> ExecutionPlan {
        ExecutionPlan::Hierarchical {
            supervisor: ResponderId::new("lead"),
            workers: vec![ResponderId::new("w1"), ResponderId::new("w2")],
        }
    }

    fn specs() -> Vec<CapabilitySpec> {
        vec![CapabilitySpec::new("lead"), CapabilitySpec::new("w1"), CapabilitySpec::new("w2")]
    }

    #[tokio::test]
    async fn test_supervisor_guidance_reaches_workers() {
        let responder = ScriptedResponder::new()
            .answer("lead", AgentResponse::success("Lead with value").with_result("theme", "premium"));
        let (ctx, scripted) = execution_context(responder, specs());

        let outcome = HierarchicalExecutor::new()
            .execute(&ctx, &ConsultationRequest::new("Launch a studio"), &plan())
            .await;

        let calls = scripted.calls();
        assert_eq!(calls[0].0.as_str(), "lead");
        assert_eq!(calls[0].1.objective, "Provide high-level guidance for: Launch a studio");
        assert_eq!(calls[0].1.output_format, GUIDANCE_FORMAT);

        for (_, worker_call) in &calls[1..] {
            assert_eq!(worker_call.objective, "Launch a studio");
            assert_eq!(
                worker_call.context[SUPERVISOR_GUIDANCE]["theme"],
                serde_json::json!("premium")
            );
        }

        assert_eq!(outcome.state, ExecutionState::Completed);
        assert_eq!(outcome.responses.len(), 3);
        let PatternDetail::Hierarchical { guidance, workers, .. } = &outcome.detail else {
            panic!("expected hierarchical detail");
        };
        assert!(guidance.is_some());
        assert_eq!(workers.len(), 2);
    }

    #[tokio::test]
    async fn test_supervisor_failure_keeps_workers_running() {
        let responder = ScriptedResponder::new().fail("lead", "overloaded");
        let (ctx, scripted) = execution_context(responder, specs());

        let outcome = HierarchicalExecutor::new()
            .execute(&ctx, &ConsultationRequest::new("Launch"), &plan())
            .await;

        assert_eq!(scripted.called().len(), 3);
        for (_, call) in &scripted.calls()[1..] {
            assert!(!call.context.contains_key(SUPERVISOR_GUIDANCE));
        }
        assert_eq!(outcome.responses.len(), 2);
        assert_eq!(outcome.state, ExecutionState::PartiallyCompleted);
        let PatternDetail::Hierarchical { guidance, .. } = &outcome.detail else {
            panic!("expected hierarchical detail");
        };
        assert!(guidance.is_none());
    }

    #[tokio::test]
    async fn test_supervisor_panic_keeps_workers_running() {
        let responder = ScriptedResponder::new().panic("lead", "supervisor crashed");
        let (ctx, scripted) = execution_context(responder, specs());

        let outcome = HierarchicalExecutor::new()
            .execute(&ctx, &ConsultationRequest::new("Launch"), &plan())
            .await;

        assert_eq!(scripted.called(), vec!["lead", "w1", "w2"]);
        assert_eq!(outcome.responses.len(), 2);
        assert_eq!(outcome.failures[0].kind, FailureKind::Panicked);
        assert_eq!(outcome.state, ExecutionState::PartiallyCompleted);
    }

    #[tokio::test]
    async fn test_worker_failure_is_dropped() {
        let responder = ScriptedResponder::new().fail("w2", "timeout upstream");
        let (ctx, _) = execution_context(responder, specs());

        let outcome = HierarchicalExecutor::new()
            .execute(&ctx, &ConsultationRequest::new("Launch"), &plan())
            .await;

        let PatternDetail::Hierarchical { workers, .. } = &outcome.detail else {
            panic!("expected hierarchical detail");
        };
        assert_eq!(workers, &vec![ResponderId::new("w1")]);
        assert_eq!(outcome.failures.len(), 1);
    }
}
