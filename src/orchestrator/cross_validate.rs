//! Fan-out cross-validation pattern
//!
//! Same fan-out as aggregate, then every pair of surviving answers is checked
//! for conflicting recommendations. Any conflict hands the decision to the
//! user; none means consensus.

use crate::orchestrator::aggregate::fan_out;
use crate::orchestrator::analyzer::ExecutionPlan;
use crate::orchestrator::pattern::{
    ExecutionContext, OrchestrationPattern, PatternDetail, PatternExecutor, PatternOutcome, Resolution,
};
use crate::request::ConsultationRequest;
use async_trait::async_trait;

/// Concurrent calls followed by pairwise conflict analysis
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossValidateExecutor;

impl CrossValidateExecutor {
    /// Create a cross-validation executor
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PatternExecutor for CrossValidateExecutor {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        request: &ConsultationRequest,
        plan: &ExecutionPlan,
    ) -> PatternOutcome {
        let responders = plan.responders();
        let (responses, failures) = fan_out(ctx, request, &responders).await;

        let conflicts = ctx.intelligence.conflict_analyzer().analyze(&responses);
        let resolution = if conflicts.is_empty() {
            Resolution::ConsensusReached
        } else {
            Resolution::UserChoice
        };
        tracing::info!(
            conflicts = conflicts.len(),
            resolution = ?resolution,
            "Cross-validation complete"
        );

        PatternOutcome::settled(
            OrchestrationPattern::FanOutCrossValidate,
            responders.len(),
            responses,
            failures,
            PatternDetail::CrossValidate { conflicts, resolution },
        )
    }

    fn pattern(&self) -> OrchestrationPattern {
        OrchestrationPattern::FanOutCrossValidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySpec;
    use crate::intelligence::ConflictSeverity;
    use crate::orchestrator::pattern::ExecutionState;
    use crate::orchestrator::testing::execution_context;
    use crate::request::AgentResponse;
    use crate::responder::testing::ScriptedResponder;
    use crate::types::ResponderId;

    fn plan() -> ExecutionPlan {
        ExecutionPlan::CrossValidate {
            responders: ["a", "b", "c"].into_iter().map(ResponderId::new).collect(),
        }
    }

    fn specs() -> Vec<CapabilitySpec> {
        vec![CapabilitySpec::new("a"), CapabilitySpec::new("b"), CapabilitySpec::new("c")]
    }

    #[tokio::test]
    async fn test_opposing_advice_requires_user_choice() {
        let responder = ScriptedResponder::new()
            .answer("a", AgentResponse::success("Prioritize premium pricing for enterprise"))
            .answer("b", AgentResponse::success("Deprioritize premium tiers for now"))
            .answer("c", AgentResponse::success("Bundle onboarding services"));
        let (ctx, _) = execution_context(responder, specs());

        let outcome = CrossValidateExecutor::new()
            .execute(&ctx, &ConsultationRequest::new("Compare pricing approaches"), &plan())
            .await;

        assert_eq!(outcome.state, ExecutionState::Completed);
        let PatternDetail::CrossValidate { conflicts, resolution } = &outcome.detail else {
            panic!("expected cross-validation detail");
        };
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_id, "rec_conflict_0_1");
        assert_eq!(conflicts[0].severity, ConflictSeverity::Moderate);
        assert_eq!(*resolution, Resolution::UserChoice);
    }

    #[tokio::test]
    async fn test_agreement_reaches_consensus() {
        let responder = ScriptedResponder::new()
            .answer("a", AgentResponse::success("Focus on retention"))
            .answer("b", AgentResponse::success("Focus on retention and referrals"));
        let (ctx, _) = execution_context(responder, specs());

        let outcome = CrossValidateExecutor::new()
            .execute(&ctx, &ConsultationRequest::new("Validate plan"), &plan())
            .await;

        let PatternDetail::CrossValidate { conflicts, resolution } = &outcome.detail else {
            panic!("expected cross-validation detail");
        };
        assert!(conflicts.is_empty());
        assert_eq!(*resolution, Resolution::ConsensusReached);
    }

    #[tokio::test]
    async fn test_failed_responder_is_not_cross_checked() {
        let responder = ScriptedResponder::new()
            .answer("a", AgentResponse::success("Increase prices"))
            .fail("b", "offline")
            .answer("c", AgentResponse::success("Decrease prices"));
        let (ctx, _) = execution_context(responder, specs());

        let outcome = CrossValidateExecutor::new()
            .execute(&ctx, &ConsultationRequest::new("Compare"), &plan())
            .await;

        assert_eq!(outcome.responses.len(), 2);
        let PatternDetail::CrossValidate { conflicts, .. } = &outcome.detail else {
            panic!("expected cross-validation detail");
        };
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_id, "rec_conflict_0_1");
        assert_eq!(
            conflicts[0].responders,
            [ResponderId::new("a"), ResponderId::new("c")]
        );
    }
}
