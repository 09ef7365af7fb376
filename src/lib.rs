//! # Consilium
//!
//! Expert-consultation orchestration: a request is analyzed, routed to one or
//! more specialist responders under a coordination pattern, and the answers
//! are merged into a single synthesized result.
//!
//! ## Features
//!
//! - **Pattern selection**: complexity, domain and candidate analysis picks
//!   sequential, fan-out or supervisor/worker execution
//! - **Settle-all fan-out**: one slow or failing responder never sinks its siblings
//! - **Intelligence**: overlap detection, conflict analysis, context
//!   optimization and result quality scoring
//! - **Methodology validation**: rubric-based compliance checks per framework
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use consilium::{
//!     CapabilitySnapshot, ConsultationRequest, MetaOrchestrator, OrchestratorSettings,
//! };
//!
//! #[tokio::main]
//! async fn main() -> consilium::Result<()> {
//!     let settings = OrchestratorSettings::load(None::<&str>)?;
//!     let snapshot = CapabilitySnapshot::default().shared();
//!     let orchestrator = MetaOrchestrator::simulated(snapshot, settings);
//!
//!     let result = orchestrator
//!         .execute_consultation(ConsultationRequest::new("Compare pricing strategies"))
//!         .await;
//!     println!("{}", result.to_json()?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capability;
pub mod config;
pub mod error;
pub mod intelligence;
pub mod methodology;
pub mod orchestrator;
pub mod request;
pub mod responder;
pub mod scoring;
pub mod telemetry;
pub mod types;

// Re-exports for convenience
pub use capability::{
    CapabilitySnapshot, CapabilitySource, CapabilitySpec, DirectoryCapabilitySource,
    StaticCapabilitySource,
};
pub use crate::config::{OrchestratorSettings, PlanLimits};
pub use error::{Error, Result};
pub use intelligence::{ConflictAnalysis, IntelligenceEngine, QualityMetrics};
pub use methodology::{MethodologyValidationResult, MethodologyValidator};
pub use orchestrator::{
    ExecutionState, MetaOrchestrator, OrchestrationPattern, RequestAnalysis, SynthesizedResult,
};
pub use request::{AgentResponse, ConsultationRequest, ContextMap, ResponseStatus};
pub use responder::{Responder, SimulatedResponder};
pub use telemetry::{init_tracing, ConsultationTrace, LogFormat};
pub use types::{ConsultationId, ResponderId, TraceId};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::capability::{CapabilitySnapshot, CapabilitySource, CapabilitySpec};
    pub use crate::config::OrchestratorSettings;
    pub use crate::error::{Error, Result};
    pub use crate::orchestrator::{MetaOrchestrator, OrchestrationPattern, SynthesizedResult};
    pub use crate::request::{AgentResponse, ConsultationRequest};
    pub use crate::responder::Responder;
    pub use crate::types::*;
}
