//! Consultation request and responder response protocol

use crate::error::Result;
use crate::types::ResponderId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key/value map carried in requests and responses
pub type ContextMap = HashMap<String, serde_json::Value>;

/// Result key holding a responder's headline recommendation
pub const PRIMARY_RECOMMENDATION: &str = "primary_recommendation";

/// One unit of consultation work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationRequest {
    /// What the caller wants answered
    pub objective: String,
    /// Shared context blob
    #[serde(default)]
    pub context: ContextMap,
    /// Hard constraints (budget, timeline, ...)
    #[serde(default)]
    pub constraints: ContextMap,
    /// Requested output format
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// How the caller will judge the answer
    #[serde(default)]
    pub success_criteria: String,
}

fn default_output_format() -> String {
    "consultation".to_string()
}

#[derive(Serialize, Deserialize)]
struct RequestEnvelope {
    consultation_request: ConsultationRequest,
}

impl ConsultationRequest {
    /// Create a new request with an objective
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            context: ContextMap::new(),
            constraints: ContextMap::new(),
            output_format: default_output_format(),
            success_criteria: String::new(),
        }
    }

    /// Add a context entry
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Add a constraint entry
    pub fn with_constraint(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }

    /// Set the success criteria
    pub fn with_success_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.success_criteria = criteria.into();
        self
    }

    /// Set the output format
    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    /// Clone this request with a substituted context
    pub fn with_context(&self, context: ContextMap) -> Self {
        Self {
            context,
            ..self.clone()
        }
    }

    /// Clone this request with a substituted objective
    pub fn with_objective(&self, objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            ..self.clone()
        }
    }

    /// Serialized context, as used for size and keyword checks
    pub fn context_text(&self) -> String {
        serde_json::to_string(&self.context).unwrap_or_default()
    }

    /// Lowercased objective followed by the lowercased serialized context
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.objective, self.context_text()).to_lowercase()
    }

    /// Value of the `consultation_type` context key, if it is a string
    pub fn classification_label(&self) -> Option<&str> {
        self.context.get("consultation_type").and_then(|v| v.as_str())
    }

    /// Serialize under a `consultation_request` root key
    pub fn to_yaml(&self) -> Result<String> {
        let envelope = RequestEnvelope {
            consultation_request: self.clone(),
        };
        Ok(serde_yaml::to_string(&envelope)?)
    }

    /// Parse from YAML with a `consultation_request` root key
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let envelope: RequestEnvelope = serde_yaml::from_str(yaml)?;
        Ok(envelope.consultation_request)
    }
}

/// Responder answer status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Complete answer
    Success,
    /// Usable but incomplete answer
    Partial,
    /// No usable answer
    #[default]
    Failed,
}

impl ResponseStatus {
    /// Whether the response may be merged into results
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Success | Self::Partial)
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Self-reported confidence (0.0-1.0)
    #[serde(default)]
    pub confidence: f64,
    /// Framework the responder applied
    #[serde(default, alias = "methodology_applied", skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    /// Responder that produced the answer
    #[serde(default, alias = "agent_name", skip_serializing_if = "Option::is_none")]
    pub responder: Option<ResponderId>,
    /// Any other metadata
    #[serde(flatten)]
    pub extra: ContextMap,
}

/// One responder's answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Answer status
    #[serde(default)]
    pub status: ResponseStatus,
    /// Answer payload
    #[serde(default)]
    pub result: ContextMap,
    /// Answer metadata
    #[serde(default)]
    pub metadata: ResponseMetadata,
    /// Follow-up recommendations
    #[serde(default)]
    pub recommendations: ContextMap,
    /// Declared scope boundaries
    #[serde(default)]
    pub scope_boundaries: ContextMap,
    /// Declared potential conflicts
    #[serde(default)]
    pub potential_conflicts: ContextMap,
    /// Error text when the responder reports a failure
    #[serde(default, alias = "errors", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    response: AgentResponse,
}

impl AgentResponse {
    /// Create a successful response carrying a primary recommendation
    pub fn success(recommendation: impl Into<String>) -> Self {
        let mut result = ContextMap::new();
        result.insert(
            PRIMARY_RECOMMENDATION.to_string(),
            serde_json::Value::String(recommendation.into()),
        );
        Self {
            status: ResponseStatus::Success,
            result,
            ..Self::default()
        }
    }

    /// Create a failed response
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failed,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Set the status
    pub fn with_status(mut self, status: ResponseStatus) -> Self {
        self.status = status;
        self
    }

    /// Add a result entry
    pub fn with_result(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.result.insert(key.into(), value.into());
        self
    }

    /// Set the confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.metadata.confidence = confidence;
        self
    }

    /// Set the applied framework
    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.metadata.framework = Some(framework.into());
        self
    }

    /// Add a recommendation entry
    pub fn with_recommendation(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.recommendations.insert(key.into(), value.into());
        self
    }

    /// Headline recommendation, if present and non-empty
    pub fn primary_recommendation(&self) -> Option<&str> {
        self.result
            .get(PRIMARY_RECOMMENDATION)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Serialized result payload, used for lexical scoring
    pub fn result_text(&self) -> String {
        serde_json::to_string(&self.result).unwrap_or_default()
    }

    /// Parse from YAML with a `response` root key; a missing status reads as failed
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let envelope: ResponseEnvelope = serde_yaml::from_str(yaml)?;
        Ok(envelope.response)
    }
}
