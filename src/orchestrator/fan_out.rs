//! Settle-all fan-out over responder calls

use crate::error::{Error, Result};
use crate::orchestrator::pattern::{CallFailure, ConsultedResponse, ExecutionContext};
use crate::request::{AgentResponse, ConsultationRequest};
use crate::types::ResponderId;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

/// Consult one responder under the per-call timeout.
///
/// A panic inside the responder is caught and returned as
/// [`Error::ResponderPanicked`], so it stays scoped to this call.
pub async fn consult_with_timeout(
    ctx: &ExecutionContext,
    responder: &ResponderId,
    request: ConsultationRequest,
) -> Result<AgentResponse> {
    let start = Instant::now();
    let call = AssertUnwindSafe(ctx.responder.consult(responder, request)).catch_unwind();
    let outcome = tokio::time::timeout(ctx.call_timeout, call).await;

    match outcome {
        Ok(Err(payload)) => {
            let message = panic_message(&*payload);
            tracing::error!(responder = %responder, panic = %message, "Responder call panicked");
            Err(Error::ResponderPanicked {
                responder: responder.clone(),
                message,
            })
        }
        Ok(Ok(result)) => {
            tracing::debug!(
                responder = %responder,
                elapsed_ms = start.elapsed().as_millis() as u64,
                ok = result.is_ok(),
                "Responder call settled"
            );
            result
        }
        Err(_) => Err(Error::Timeout {
            responder: responder.clone(),
            after: ctx.call_timeout,
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Run every call concurrently and wait for all of them to settle.
///
/// One failure never cancels its siblings. Results come back in input order.
pub async fn settle_all(
    ctx: &ExecutionContext,
    calls: Vec<(ResponderId, ConsultationRequest)>,
) -> Vec<(ResponderId, Result<AgentResponse>)> {
    let futures = calls.into_iter().map(|(responder, request)| async move {
        let result = consult_with_timeout(ctx, &responder, request).await;
        (responder, result)
    });
    join_all(futures).await
}

/// Split settled calls into usable responses and failures, logging the failures
pub fn partition(
    settled: Vec<(ResponderId, Result<AgentResponse>)>,
) -> (Vec<ConsultedResponse>, Vec<CallFailure>) {
    let mut responses = Vec::new();
    let mut failures = Vec::new();

    for (responder, result) in settled {
        match result {
            Ok(response) if response.status.is_usable() => {
                responses.push(ConsultedResponse::new(responder, response));
            }
            Ok(response) => {
                tracing::warn!("Responder {} reported failure", responder);
                failures.push(CallFailure::reported(&responder, &response));
            }
            Err(e) => {
                tracing::warn!("Responder {} failed: {}", responder, e);
                failures.push(CallFailure::from_error(&responder, &e));
            }
        }
    }

    (responses, failures)
}

/// Drop responders without a capability spec, recording them as failures
pub fn require_capabilities(
    ctx: &ExecutionContext,
    responders: &[ResponderId],
    failures: &mut Vec<CallFailure>,
) -> Vec<ResponderId> {
    responders
        .iter()
        .filter(|id| match ctx.snapshot.require(id) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Skipping responder {}: {}", id, e);
                failures.push(CallFailure::from_error(id, &e));
                false
            }
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilitySnapshot, CapabilitySpec};
    use crate::orchestrator::pattern::FailureKind;
    use crate::responder::testing::ScriptedResponder;
    use std::sync::Arc;
    use std::time::Duration;

    fn context(responder: ScriptedResponder, timeout: Duration) -> ExecutionContext {
        let snapshot = CapabilitySnapshot::from_specs([
            CapabilitySpec::new("a"),
            CapabilitySpec::new("b"),
            CapabilitySpec::new("c"),
        ])
        .shared();
        ExecutionContext::new(Arc::new(responder), snapshot, timeout)
    }

    fn calls(ids: &[&str]) -> Vec<(ResponderId, ConsultationRequest)> {
        ids.iter()
            .map(|id| (ResponderId::new(*id), ConsultationRequest::new("objective")))
            .collect()
    }

    #[tokio::test]
    async fn test_one_failure_does_not_cancel_siblings() {
        let ctx = context(ScriptedResponder::new().fail("b", "boom"), Duration::from_secs(5));

        let settled = settle_all(&ctx, calls(&["a", "b", "c"])).await;
        let order: Vec<_> = settled.iter().map(|(id, _)| id.to_string()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);

        let (responses, failures) = partition(settled);
        assert_eq!(responses.len(), 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].responder.as_str(), "b");
        assert_eq!(failures[0].kind, FailureKind::Error);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let responder = ScriptedResponder::new().slow(
            "a",
            Duration::from_millis(500),
            AgentResponse::success("late"),
        );
        let ctx = context(responder, Duration::from_millis(20));

        let (responses, failures) = partition(settle_all(&ctx, calls(&["a", "b"])).await);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].responder.as_str(), "b");
        assert_eq!(failures[0].kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_panicking_responder_is_isolated() {
        let ctx = context(
            ScriptedResponder::new().panic("b", "responder b blew up"),
            Duration::from_secs(5),
        );

        let settled = settle_all(&ctx, calls(&["a", "b", "c"])).await;
        assert!(matches!(
            &settled[1].1,
            Err(Error::ResponderPanicked { message, .. }) if message == "responder b blew up"
        ));

        let (responses, failures) = partition(settled);
        let answered: Vec<_> = responses.iter().map(|r| r.responder.to_string()).collect();
        assert_eq!(answered, vec!["a", "c"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::Panicked);
        assert!(failures[0].was_called());
    }

    #[tokio::test]
    async fn test_single_call_panic_becomes_error() {
        let ctx = context(
            ScriptedResponder::new().panic("a", "boom"),
            Duration::from_secs(5),
        );

        let result = consult_with_timeout(&ctx, &ResponderId::new("a"), ConsultationRequest::new("x")).await;
        assert!(matches!(result, Err(Error::ResponderPanicked { .. })));
    }

    #[tokio::test]
    async fn test_reported_failure_is_not_usable() {
        let ctx = context(
            ScriptedResponder::new().answer("a", AgentResponse::failed("no capacity")),
            Duration::from_secs(5),
        );

        let (responses, failures) = partition(settle_all(&ctx, calls(&["a"])).await);
        assert!(responses.is_empty());
        assert_eq!(failures[0].kind, FailureKind::Reported);
    }

    #[test]
    fn test_missing_capabilities_are_skipped() {
        let ctx = context(ScriptedResponder::new(), Duration::from_secs(5));
        let mut failures = Vec::new();

        let kept = require_capabilities(
            &ctx,
            &[ResponderId::new("a"), ResponderId::new("ghost")],
            &mut failures,
        );
        assert_eq!(kept, vec![ResponderId::new("a")]);
        assert_eq!(failures[0].kind, FailureKind::MissingCapability);
    }
}
