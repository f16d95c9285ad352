//! Deterministic core of the contribution arbitration protocol.
//!
//! Nothing in this crate talks to the network or awaits anything. It provides:
//! - `claims`: contribution claims, the final artifact, and prompt truncation
//! - `transcript`: the append-only message log of one run
//! - `verdict`: single-subject and group verdict shapes, zero-sum check
//! - `extract`: latest-first verdict extraction from untrusted oracle text
//! - `state_machine`: conversation states and the hard turn budget

pub mod claims;
pub mod extract;
pub mod state_machine;
pub mod transcript;
pub mod verdict;

pub use claims::{
    truncate_chars, Category, ContributionClaim, FinalArtifact, PromptLimits, UnknownCategory,
};
pub use extract::{ExtractedVerdict, ExtractionFailure, VerdictExtractor};
pub use state_machine::{
    ConversationState, IllegalTransition, StateMachine, TransitionRecord, TurnBudget, TurnGrant,
};
pub use transcript::{AgentLog, Message, SpeakerRole, Transcript};
pub use verdict::{
    AllocationCheck, EvaluationMode, GroupVerdict, ImpactLevel, MemberAllocation, SingleVerdict,
    Verdict,
};
