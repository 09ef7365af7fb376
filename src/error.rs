//! Error types for the consultation orchestrator

use crate::types::ResponderId;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the orchestrator
///
/// None of these cross [`MetaOrchestrator::execute_consultation`]; they are
/// recovered inside the pipeline and surface as a status field or as an
/// absent intelligence block.
///
/// [`MetaOrchestrator::execute_consultation`]: crate::orchestrator::MetaOrchestrator::execute_consultation
#[derive(Debug, Error)]
pub enum Error {
    /// No capability spec is registered for a responder
    #[error("Missing capability for responder: {0}")]
    MissingCapability(ResponderId),

    /// A responder call returned an error
    #[error("Responder failure: {responder}: {message}")]
    ResponderFailure {
        /// Responder that failed
        responder: ResponderId,
        /// Failure description
        message: String,
    },

    /// A responder call panicked
    #[error("Responder {responder} panicked: {message}")]
    ResponderPanicked {
        /// Responder whose call panicked
        responder: ResponderId,
        /// Panic payload, if it was a string
        message: String,
    },

    /// A responder call exceeded the per-call timeout
    #[error("Responder {responder} timed out after {after:?}")]
    Timeout {
        /// Responder that timed out
        responder: ResponderId,
        /// Configured timeout
        after: Duration,
    },

    /// An overlap/conflict/quality/validation computation failed
    #[error("Intelligence failure: {feature}: {message}")]
    Intelligence {
        /// Name of the degraded feature
        feature: String,
        /// Failure description
        message: String,
    },

    /// The capability source could not be read
    #[error("Capability registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Illegal execution state transition
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        /// State before the transition
        from: String,
        /// Requested state
        to: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a responder failure error
    pub fn responder(responder: impl Into<ResponderId>, message: impl Into<String>) -> Self {
        Self::ResponderFailure {
            responder: responder.into(),
            message: message.into(),
        }
    }

    /// Create an intelligence failure error
    pub fn intelligence(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Intelligence {
            feature: feature.into(),
            message: message.into(),
        }
    }

    /// Create a registry unavailable error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::RegistryUnavailable(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
