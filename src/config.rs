//! Configuration types for the orchestrator

use crate::error::Result;
use crate::types::ResponderId;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for settings overrides (`CONSILIUM__CALL_TIMEOUT_MS=10000`)
pub const ENV_PREFIX: &str = "CONSILIUM";

/// Responder consulted when no capability trigger matches a request
pub const DEFAULT_RESPONDER: &str = "sales-specialist";

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Per-call timeout for responder consultations, in milliseconds
    pub call_timeout_ms: u64,
    /// Fallback responder guaranteeing a non-empty candidate set
    pub default_responder: ResponderId,
    /// Responder caps per execution plan
    pub limits: PlanLimits,
    /// Run overlap/conflict/quality analysis after execution
    pub intelligence_enabled: bool,
    /// Validate each usable response against its declared framework
    pub validate_methodology: bool,
    /// Drop all but the first member of each methodology family from the plan
    pub prune_overlapping_candidates: bool,
    /// Directory holding capability spec files
    pub capability_dir: Option<PathBuf>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            call_timeout_ms: 30_000,
            default_responder: ResponderId::new(DEFAULT_RESPONDER),
            limits: PlanLimits::default(),
            intelligence_enabled: true,
            validate_methodology: true,
            prune_overlapping_candidates: false,
            capability_dir: None,
        }
    }
}

impl OrchestratorSettings {
    /// Load settings from environment (`CONSILIUM__*`), reading `.env` first
    pub fn from_env() -> Result<Self> {
        Self::load(None::<&Path>)
    }

    /// Load settings from an optional file layered under environment overrides
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self> {
        // Load .env if present so local development picks up overrides
        let _ = dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_ref()).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<Self>()?;

        Ok(settings)
    }

    /// Per-call timeout as a [`Duration`]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Set the per-call timeout
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = (timeout.as_millis() as u64).max(1);
        self
    }

    /// Set the fallback responder
    pub fn with_default_responder(mut self, responder: impl Into<ResponderId>) -> Self {
        self.default_responder = responder.into();
        self
    }

    /// Enable or disable the intelligence layer
    pub fn with_intelligence(mut self, enabled: bool) -> Self {
        self.intelligence_enabled = enabled;
        self
    }

    /// Enable or disable methodology validation
    pub fn with_methodology_validation(mut self, enabled: bool) -> Self {
        self.validate_methodology = enabled;
        self
    }

    /// Enable or disable overlap-driven candidate pruning
    pub fn with_overlap_pruning(mut self, enabled: bool) -> Self {
        self.prune_overlapping_candidates = enabled;
        self
    }

    /// Set plan limits
    pub fn with_limits(mut self, limits: PlanLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Maximum responders per execution plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlanLimits {
    /// Sequential chain length
    pub sequential_steps: usize,
    /// Aggregate fan-out width
    pub parallel_responders: usize,
    /// Cross-validation fan-out width
    pub validation_responders: usize,
    /// Workers under one supervisor
    pub workers: usize,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            sequential_steps: 3,
            parallel_responders: 4,
            validation_responders: 3,
            workers: 2,
        }
    }
}
