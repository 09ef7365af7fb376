//! Pattern tag, execution state machine and executor contract

use crate::capability::CapabilitySnapshot;
use crate::error::{Error, Result};
use crate::intelligence::{ConflictAnalysis, IntelligenceEngine};
use crate::orchestrator::analyzer::ExecutionPlan;
use crate::request::{AgentResponse, ConsultationRequest, ContextMap, ResponseStatus};
use crate::responder::Responder;
use crate::types::ResponderId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Execution strategy, decided once per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationPattern {
    /// Ordered chain with accumulated context
    Sequential,
    /// Concurrent calls, merged results
    FanOutAggregate,
    /// Concurrent calls, pairwise conflict check
    #[serde(rename = "fan_out_crossvalidate")]
    FanOutCrossValidate,
    /// One supervisor call guiding concurrent workers
    SupervisorWorker,
}

impl OrchestrationPattern {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::FanOutAggregate => "fan_out_aggregate",
            Self::FanOutCrossValidate => "fan_out_crossvalidate",
            Self::SupervisorWorker => "supervisor_worker",
        }
    }
}

impl std::fmt::Display for OrchestrationPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-request execution state: `Planned → Running → {Completed, PartiallyCompleted, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Plan built, nothing called yet
    #[default]
    Planned,
    /// Calls in flight
    Running,
    /// Every planned responder answered with `success`
    Completed,
    /// Some usable answer, but not every responder succeeded; also a
    /// non-empty sequential chain where no step was usable
    PartiallyCompleted,
    /// No usable answer from a fan-out, or an empty chain
    Failed,
}

impl ExecutionState {
    /// Whether the state is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::PartiallyCompleted | Self::Failed)
    }

    /// Move to `next`, rejecting transitions the state machine does not allow
    pub fn advance(&mut self, next: ExecutionState) -> Result<()> {
        let allowed = matches!(
            (*self, next),
            (Self::Planned, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::PartiallyCompleted)
                | (Self::Running, Self::Failed)
        );
        if !allowed {
            return Err(Error::InvalidTransition {
                from: format!("{:?}", self),
                to: format!("{:?}", next),
            });
        }
        *self = next;
        Ok(())
    }

    /// Terminal state for a settled batch.
    ///
    /// A non-empty sequential chain never settles as `Failed`: with no usable
    /// step it is still `PartiallyCompleted`. Only an empty chain fails.
    pub fn settle(
        pattern: OrchestrationPattern,
        planned: usize,
        responses: &[ConsultedResponse],
        failures: &[CallFailure],
    ) -> Self {
        if responses.is_empty() {
            match pattern {
                OrchestrationPattern::Sequential if planned > 0 => Self::PartiallyCompleted,
                _ => Self::Failed,
            }
        } else if failures.is_empty()
            && responses.len() == planned
            && responses.iter().all(|r| r.response.status == ResponseStatus::Success)
        {
            Self::Completed
        } else {
            Self::PartiallyCompleted
        }
    }

    /// Consultation status reported for this state
    pub fn status(&self) -> ResponseStatus {
        match self {
            Self::Completed => ResponseStatus::Success,
            Self::PartiallyCompleted => ResponseStatus::Partial,
            Self::Planned | Self::Running | Self::Failed => ResponseStatus::Failed,
        }
    }
}

/// A usable response tagged with the responder that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultedResponse {
    /// Responder consulted
    pub responder: ResponderId,
    /// Its answer
    pub response: AgentResponse,
}

impl ConsultedResponse {
    /// Pair a responder with its answer
    pub fn new(responder: impl Into<ResponderId>, response: AgentResponse) -> Self {
        Self {
            responder: responder.into(),
            response,
        }
    }
}

/// Why a planned responder contributed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No capability spec; never called
    MissingCapability,
    /// The call returned an error
    Error,
    /// The call exceeded the per-call timeout
    Timeout,
    /// The call panicked
    Panicked,
    /// The responder answered with `failed`
    Reported,
}

/// A planned responder that contributed nothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallFailure {
    /// Responder
    pub responder: ResponderId,
    /// Failure kind
    pub kind: FailureKind,
    /// Failure description
    pub message: String,
}

impl CallFailure {
    /// Classify an error returned for a responder call
    pub fn from_error(responder: &ResponderId, error: &Error) -> Self {
        let kind = match error {
            Error::MissingCapability(_) => FailureKind::MissingCapability,
            Error::Timeout { .. } => FailureKind::Timeout,
            Error::ResponderPanicked { .. } => FailureKind::Panicked,
            _ => FailureKind::Error,
        };
        Self {
            responder: responder.clone(),
            kind,
            message: error.to_string(),
        }
    }

    /// A response that came back with `failed` status
    pub fn reported(responder: &ResponderId, response: &AgentResponse) -> Self {
        Self {
            responder: responder.clone(),
            kind: FailureKind::Reported,
            message: response
                .error
                .clone()
                .unwrap_or_else(|| "responder reported failure".to_string()),
        }
    }

    /// Whether the responder was actually called
    pub fn was_called(&self) -> bool {
        self.kind != FailureKind::MissingCapability
    }
}

/// How a cross-validation batch was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Conflicts found; the user decides
    UserChoice,
    /// No conflicts
    ConsensusReached,
}

/// Pattern-specific raw output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum PatternDetail {
    /// Sequential chain
    Sequential {
        /// Responders in chain order
        chain: Vec<ResponderId>,
        /// Context after every usable step was merged in
        final_context: ContextMap,
    },
    /// Aggregate fan-out
    Aggregate,
    /// Cross-validation fan-out
    CrossValidate {
        /// Pairwise conflicts among usable responses
        conflicts: Vec<ConflictAnalysis>,
        /// Resolution
        resolution: Resolution,
    },
    /// Supervisor/worker split
    Hierarchical {
        /// Supervisor responder
        supervisor: ResponderId,
        /// Supervisor result, if the supervisor answered
        guidance: Option<ContextMap>,
        /// Workers that answered, in plan order
        workers: Vec<ResponderId>,
    },
}

/// Raw output of one pattern run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternOutcome {
    /// Pattern executed
    pub pattern: OrchestrationPattern,
    /// Terminal state
    pub state: ExecutionState,
    /// Number of planned responders
    pub planned: usize,
    /// Usable responses in plan order
    pub responses: Vec<ConsultedResponse>,
    /// Responders that contributed nothing
    pub failures: Vec<CallFailure>,
    /// Pattern-specific output
    pub detail: PatternDetail,
}

impl PatternOutcome {
    /// Outcome of a batch that has fully settled. Walks the state machine
    /// from `Planned` to the terminal state the batch implies.
    pub fn settled(
        pattern: OrchestrationPattern,
        planned: usize,
        responses: Vec<ConsultedResponse>,
        failures: Vec<CallFailure>,
        detail: PatternDetail,
    ) -> Self {
        let mut state = ExecutionState::Planned;
        let terminal = ExecutionState::settle(pattern, planned, &responses, &failures);
        for next in [ExecutionState::Running, terminal] {
            if let Err(e) = state.advance(next) {
                tracing::error!(pattern = %pattern, error = %e, "Execution state rejected");
            }
        }

        tracing::info!(
            pattern = %pattern,
            state = ?state,
            usable = responses.len(),
            failed = failures.len(),
            "Pattern settled"
        );

        Self {
            pattern,
            state,
            planned,
            responses,
            failures,
            detail,
        }
    }

    /// Responders actually called
    pub fn responders_consulted(&self) -> usize {
        self.responses.len() + self.failures.iter().filter(|f| f.was_called()).count()
    }
}

/// Shared, read-only collaborators for pattern executors
#[derive(Clone)]
pub struct ExecutionContext {
    /// Responder call boundary
    pub responder: Arc<dyn Responder>,
    /// Capability snapshot
    pub snapshot: Arc<CapabilitySnapshot>,
    /// Context filtering and conflict analysis
    pub intelligence: IntelligenceEngine,
    /// Per-call timeout
    pub call_timeout: Duration,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("responder", &self.responder.responder_type())
            .field("responders", &self.snapshot.len())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl ExecutionContext {
    /// Build a context with an intelligence engine over the same snapshot
    pub fn new(responder: Arc<dyn Responder>, snapshot: Arc<CapabilitySnapshot>, call_timeout: Duration) -> Self {
        Self {
            responder,
            intelligence: IntelligenceEngine::new(snapshot.clone()),
            snapshot,
            call_timeout,
        }
    }

    /// Share an already configured intelligence engine
    pub fn with_intelligence(mut self, intelligence: IntelligenceEngine) -> Self {
        self.intelligence = intelligence;
        self
    }

    /// Request clone carrying the context filtered for `responder`
    pub fn request_for(&self, request: &ConsultationRequest, context: &ContextMap, responder: &ResponderId) -> ConsultationRequest {
        request.with_context(self.intelligence.optimize_context(context, responder))
    }
}

/// One execution strategy
#[async_trait]
pub trait PatternExecutor: Send + Sync {
    /// Run the plan. Never fails; failures surface in the outcome.
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        request: &ConsultationRequest,
        plan: &ExecutionPlan,
    ) -> PatternOutcome;

    /// Pattern implemented
    fn pattern(&self) -> OrchestrationPattern;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_wire_names() {
        assert_eq!(
            serde_json::to_value(OrchestrationPattern::FanOutCrossValidate).unwrap(),
            serde_json::json!("fan_out_crossvalidate")
        );
        assert_eq!(OrchestrationPattern::SupervisorWorker.to_string(), "supervisor_worker");
    }

    #[test]
    fn test_state_machine_transitions() {
        let mut state = ExecutionState::Planned;
        assert!(state.advance(ExecutionState::Completed).is_err());
        state.advance(ExecutionState::Running).unwrap();
        state.advance(ExecutionState::PartiallyCompleted).unwrap();
        assert!(state.is_terminal());
        assert!(matches!(
            state.advance(ExecutionState::Running),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_settle_rules() {
        use OrchestrationPattern::{FanOutAggregate, Sequential};

        let ok = ConsultedResponse::new("a", AgentResponse::success("x"));
        let partial = ConsultedResponse::new(
            "b",
            AgentResponse::success("y").with_status(ResponseStatus::Partial),
        );
        let failure = CallFailure::from_error(&ResponderId::new("c"), &Error::responder("c", "boom"));

        assert_eq!(
            ExecutionState::settle(FanOutAggregate, 1, &[ok.clone()], &[]),
            ExecutionState::Completed
        );
        assert_eq!(
            ExecutionState::settle(FanOutAggregate, 2, &[ok.clone(), partial], &[]),
            ExecutionState::PartiallyCompleted
        );
        assert_eq!(
            ExecutionState::settle(FanOutAggregate, 2, &[ok.clone()], &[failure.clone()]),
            ExecutionState::PartiallyCompleted
        );
        assert_eq!(
            ExecutionState::settle(FanOutAggregate, 1, &[], &[failure.clone()]),
            ExecutionState::Failed
        );
        assert_eq!(ExecutionState::settle(FanOutAggregate, 0, &[], &[]), ExecutionState::Failed);
        assert_eq!(
            ExecutionState::settle(Sequential, 1, &[ok], &[]),
            ExecutionState::Completed
        );
    }

    #[test]
    fn test_sequential_chain_without_usable_step_is_partial() {
        let failure = CallFailure::from_error(&ResponderId::new("c"), &Error::responder("c", "boom"));

        assert_eq!(
            ExecutionState::settle(OrchestrationPattern::Sequential, 1, &[], &[failure]),
            ExecutionState::PartiallyCompleted
        );
        assert_eq!(
            ExecutionState::settle(OrchestrationPattern::Sequential, 0, &[], &[]),
            ExecutionState::Failed
        );
    }

    #[test]
    fn test_failure_classification() {
        let id = ResponderId::new("a");
        let timeout = Error::Timeout {
            responder: id.clone(),
            after: Duration::from_millis(5),
        };
        assert_eq!(CallFailure::from_error(&id, &timeout).kind, FailureKind::Timeout);

        let missing = CallFailure::from_error(&id, &Error::MissingCapability(id.clone()));
        assert_eq!(missing.kind, FailureKind::MissingCapability);
        assert!(!missing.was_called());

        let panicked = Error::ResponderPanicked {
            responder: id.clone(),
            message: "boom".to_string(),
        };
        assert_eq!(CallFailure::from_error(&id, &panicked).kind, FailureKind::Panicked);

        let reported = CallFailure::reported(&id, &AgentResponse::failed("no data"));
        assert_eq!(reported.message, "no data");
    }
}
