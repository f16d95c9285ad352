//! Per-run telemetry.
//!
//! One `MetricsCollector` per evaluation. The orchestrator records a
//! `TurnRecord` per oracle call; the service finalizes the collector into
//! `EvaluationMetrics`, logs it as a single structured line and hands it back
//! with the verdict.

use std::time::{Duration, Instant};

use arbitration::EvaluationMode;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::prompts::PROMPT_VERSION;

/// One speaking turn backed by an oracle call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: u32,
    pub speaker: String,
    pub prompt_chars: usize,
    pub reply_chars: usize,
    pub elapsed_ms: u64,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// A valid verdict was extracted.
    Verdict,
    /// Single mode only: no verdict, score-0 stand-in returned.
    Degraded,
    /// The run failed; `kind` is `EvaluationError::kind()`.
    Failed { kind: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub run_id: String,
    pub mode: EvaluationMode,
    pub turns: Vec<TurnRecord>,
    pub outcome: RunOutcome,
    pub total_elapsed_ms: u64,
    pub prompt_version: String,
    pub timestamp: String,
}

impl EvaluationMetrics {
    pub fn oracle_calls(&self) -> usize {
        self.turns.len()
    }

    /// Largest prompt sent in this run, in characters.
    pub fn max_prompt_chars(&self) -> usize {
        self.turns.iter().map(|t| t.prompt_chars).max().unwrap_or(0)
    }
}

pub struct MetricsCollector {
    run_id: String,
    mode: EvaluationMode,
    started: Instant,
    turns: Vec<TurnRecord>,
}

impl MetricsCollector {
    pub fn new(run_id: &str, mode: EvaluationMode) -> Self {
        Self {
            run_id: run_id.to_string(),
            mode,
            started: Instant::now(),
            turns: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn record_turn(
        &mut self,
        turn: u32,
        speaker: &str,
        prompt: &str,
        reply: &str,
        elapsed: Duration,
    ) {
        self.turns.push(TurnRecord {
            turn,
            speaker: speaker.to_string(),
            prompt_chars: prompt.chars().count(),
            reply_chars: reply.chars().count(),
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    pub fn turns(&self) -> &[TurnRecord] {
        &self.turns
    }

    /// Close the run and emit the summary log line.
    pub fn finalize(self, outcome: RunOutcome) -> EvaluationMetrics {
        let metrics = EvaluationMetrics {
            run_id: self.run_id,
            mode: self.mode,
            turns: self.turns,
            outcome,
            total_elapsed_ms: self.started.elapsed().as_millis() as u64,
            prompt_version: PROMPT_VERSION.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        info!(
            run_id = %metrics.run_id,
            mode = %metrics.mode,
            oracle_calls = metrics.oracle_calls(),
            max_prompt_chars = metrics.max_prompt_chars(),
            outcome = ?metrics.outcome,
            elapsed_ms = metrics.total_elapsed_ms,
            prompt_version = %metrics.prompt_version,
            "Evaluation run finished"
        );
        metrics
    }
}
