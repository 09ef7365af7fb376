//! Logging setup and per-consultation phase tracing

use crate::types::{ConsultationId, TraceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// Newline-delimited JSON
    Json,
}

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Only the first call in a
/// process installs a subscriber; later calls are ignored.
pub fn init_tracing(format: LogFormat, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let registry = tracing_subscriber::registry().with(env_filter);
    let _ = match format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
    };
}

/// Pipeline phase of one consultation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Request analysis and pattern selection
    Analysis,
    /// Overlap detection before execution
    OverlapDetection,
    /// Pattern execution
    Execution,
    /// Result synthesis
    Synthesis,
    /// Methodology validation
    Validation,
    /// Quality assessment
    QualityAssessment,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Analysis => write!(f, "analysis"),
            Phase::OverlapDetection => write!(f, "overlap_detection"),
            Phase::Execution => write!(f, "execution"),
            Phase::Synthesis => write!(f, "synthesis"),
            Phase::Validation => write!(f, "validation"),
            Phase::QualityAssessment => write!(f, "quality_assessment"),
        }
    }
}

/// Timing of one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    /// Phase name
    pub phase: String,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
    /// End timestamp
    pub ended_at: Option<DateTime<Utc>>,
    /// Phase-specific data
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,
}

impl PhaseTiming {
    /// Elapsed milliseconds, if the phase has ended
    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// Phase timeline of a single consultation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationTrace {
    /// Unique trace identifier
    pub trace_id: TraceId,
    /// Consultation being traced
    pub consultation_id: ConsultationId,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
    /// End timestamp
    pub ended_at: Option<DateTime<Utc>>,
    /// Phases in the order they started
    pub phases: Vec<PhaseTiming>,
}

impl ConsultationTrace {
    /// Start a new trace
    pub fn start(consultation_id: ConsultationId) -> Self {
        Self {
            trace_id: TraceId::new(),
            consultation_id,
            started_at: Utc::now(),
            ended_at: None,
            phases: Vec::new(),
        }
    }

    /// Open a phase; any phase still open is closed first
    pub fn begin(&mut self, phase: Phase) {
        self.close_open();
        tracing::debug!(consultation_id = %self.consultation_id, phase = %phase, "Phase started");
        self.phases.push(PhaseTiming {
            phase: phase.to_string(),
            started_at: Utc::now(),
            ended_at: None,
            data: HashMap::new(),
        });
    }

    /// Attach data to the current phase
    pub fn record(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        if let Some(current) = self.phases.last_mut() {
            current.data.insert(key.into(), value.into());
        }
    }

    /// Close the trace
    pub fn finish(&mut self) {
        self.close_open();
        self.ended_at = Some(Utc::now());
    }

    /// Total elapsed milliseconds, if finished
    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// Timing of a phase by name
    pub fn phase(&self, name: &str) -> Option<&PhaseTiming> {
        self.phases.iter().find(|p| p.phase == name)
    }

    fn close_open(&mut self) {
        if let Some(current) = self.phases.last_mut() {
            if current.ended_at.is_none() {
                current.ended_at = Some(Utc::now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_closes_phases_in_order() {
        let mut trace = ConsultationTrace::start(ConsultationId::new());
        trace.begin(Phase::Analysis);
        trace.record("pattern", "sequential");
        trace.begin(Phase::Execution);
        trace.finish();

        assert_eq!(trace.phases.len(), 2);
        assert!(trace.phases.iter().all(|p| p.ended_at.is_some()));
        assert_eq!(
            trace.phase("analysis").and_then(|p| p.data.get("pattern")),
            Some(&serde_json::json!("sequential"))
        );
        assert!(trace.duration_ms().unwrap() >= 0);
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(LogFormat::Text, Level::INFO);
        init_tracing(LogFormat::Json, Level::DEBUG);
    }
}
