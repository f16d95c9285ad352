//! Reviewer/arbitrator pipeline for fairness-adjusted contribution credit.
//!
//! Category reviewers critique the claims routed to them against the final
//! project output; an arbitrator turns the critiques into a percentage split
//! (group mode) or a 0–100 score (single mode). The deterministic pieces
//! (claims, transcript, state machine, verdict extraction) live in the
//! `arbitration` crate; this crate adds the oracle, prompts, the conversation
//! loop, the service, and the HTTP/CLI surfaces.

pub mod agents;
pub mod api;
pub mod brief;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod oracle;
pub mod orchestrator;
pub mod prompts;
pub mod server;
pub mod telemetry;

pub use config::CreditConfig;
pub use errors::{EvaluationError, OracleError};
pub use evaluator::{Evaluated, EvaluationService};
pub use oracle::{Oracle, RigOracle};
