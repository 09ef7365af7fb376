//! Responder consultation contract

use crate::capability::CapabilitySnapshot;
use crate::error::Result;
use crate::request::{AgentResponse, ConsultationRequest};
use crate::types::ResponderId;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Maximum complementary consultations suggested by a simulated answer
const MAX_COMPLEMENTARY: usize = 3;

/// Something that can answer a consultation on behalf of a responder.
///
/// Implementations must tolerate concurrent calls; fan-out patterns invoke
/// `consult` for several responders at once.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Consult one responder
    async fn consult(&self, responder: &ResponderId, request: ConsultationRequest) -> Result<AgentResponse>;

    /// Responder type name for logging
    fn responder_type(&self) -> &str;
}

/// Deterministic responder that answers from the capability snapshot
#[derive(Debug, Clone)]
pub struct SimulatedResponder {
    snapshot: Arc<CapabilitySnapshot>,
    latency: Duration,
    confidence: f64,
}

impl SimulatedResponder {
    /// Create a simulated responder over a snapshot
    pub fn new(snapshot: Arc<CapabilitySnapshot>) -> Self {
        Self {
            snapshot,
            latency: Duration::ZERO,
            confidence: 0.85,
        }
    }

    /// Add artificial latency to every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the reported confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = crate::types::unit(confidence);
        self
    }
}

#[async_trait]
impl Responder for SimulatedResponder {
    async fn consult(&self, responder: &ResponderId, request: ConsultationRequest) -> Result<AgentResponse> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let spec = self.snapshot.get(responder.as_str());
        let framework = spec
            .and_then(|s| s.framework.clone())
            .unwrap_or_else(|| "Generic methodology".to_string());
        let complementary: Vec<String> = spec
            .map(|s| {
                s.complementary
                    .iter()
                    .take(MAX_COMPLEMENTARY)
                    .map(ResponderId::to_string)
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(responder = %responder, objective = %request.objective, "Simulated consultation");

        let mut response = AgentResponse::success(format!(
            "Strategic recommendation from {} using {}",
            responder, framework
        ))
        .with_result("specific_guidance", format!("Detailed guidance based on {} framework", framework))
        .with_confidence(self.confidence)
        .with_framework(framework)
        .with_recommendation("complementary_consultations", json!(complementary))
        .with_recommendation(
            "implementation_approach",
            "Follow methodology-specific implementation steps",
        );
        response.metadata.responder = Some(responder.clone());

        if let Some(spec) = spec {
            response.scope_boundaries.insert("covers".to_string(), json!(spec.scope.covers));
            response.scope_boundaries.insert("excludes".to_string(), json!(spec.scope.excludes));
            response.potential_conflicts = spec
                .potential_conflicts
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect();
        }

        Ok(response)
    }

    fn responder_type(&self) -> &str {
        "simulated"
    }
}

/// Hand-written responders shared by the orchestrator tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// What a scripted responder does when consulted
    #[derive(Debug, Clone)]
    pub(crate) enum Script {
        Answer(AgentResponse),
        Fail(String),
        Slow(Duration, AgentResponse),
        Panic(String),
    }

    /// Answers from a per-responder script and records every call
    #[derive(Default)]
    pub(crate) struct ScriptedResponder {
        scripts: HashMap<ResponderId, Script>,
        pub(crate) calls: Mutex<Vec<(ResponderId, ConsultationRequest)>>,
    }

    impl ScriptedResponder {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn answer(mut self, id: &str, response: AgentResponse) -> Self {
            self.scripts.insert(ResponderId::new(id), Script::Answer(response));
            self
        }

        pub(crate) fn fail(mut self, id: &str, message: &str) -> Self {
            self.scripts.insert(ResponderId::new(id), Script::Fail(message.to_string()));
            self
        }

        pub(crate) fn slow(mut self, id: &str, delay: Duration, response: AgentResponse) -> Self {
            self.scripts.insert(ResponderId::new(id), Script::Slow(delay, response));
            self
        }

        pub(crate) fn panic(mut self, id: &str, message: &str) -> Self {
            self.scripts.insert(ResponderId::new(id), Script::Panic(message.to_string()));
            self
        }

        pub(crate) fn calls(&self) -> Vec<(ResponderId, ConsultationRequest)> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn called(&self) -> Vec<String> {
            self.calls().into_iter().map(|(id, _)| id.to_string()).collect()
        }
    }

    #[async_trait]
    impl Responder for ScriptedResponder {
        async fn consult(&self, responder: &ResponderId, request: ConsultationRequest) -> Result<AgentResponse> {
            self.calls.lock().unwrap().push((responder.clone(), request));
            match self.scripts.get(responder) {
                Some(Script::Answer(response)) => Ok(response.clone()),
                Some(Script::Fail(message)) => Err(Error::responder(responder, message.clone())),
                Some(Script::Slow(delay, response)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(response.clone())
                }
                Some(Script::Panic(message)) => panic!("{}", message),
                None => Ok(AgentResponse::success(format!("Default answer from {}", responder))),
            }
        }

        fn responder_type(&self) -> &str {
            "scripted"
        }
    }
}
