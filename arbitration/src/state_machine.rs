//! Conversation state machine: explicit states, legal transition guards, and
//! a hard turn budget.
//!
//! Every run starts at `Started` (the initiating brief counts as turn 1) and
//! terminates at either `VerdictFound` or `BudgetExhausted`. Speaking turns
//! are granted through `begin_turn()`, which refuses once the budget is spent,
//! so a run can never take more than `max_turns` turns.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::verdict::EvaluationMode;

/// Default budget for group mode: brief + two reviewers + arbitrator + two spare.
pub const GROUP_MAX_TURNS: u32 = 6;
/// Default budget for single-subject mode.
pub const SINGLE_MAX_TURNS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Brief posted, nobody has answered yet.
    Started,
    /// A reviewer is producing its critique.
    ReviewerTurn,
    /// The arbitrator is producing (or retrying) its verdict.
    ArbitratorTurn,
    /// A valid verdict was detected. Terminal.
    VerdictFound,
    /// Turn budget spent without a valid verdict. Terminal.
    BudgetExhausted,
}

impl ConversationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::VerdictFound | Self::BudgetExhausted)
    }

    /// Whether entering this state consumes a speaking turn.
    pub fn is_turn(self) -> bool {
        matches!(self, Self::ReviewerTurn | Self::ArbitratorTurn)
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "Started"),
            Self::ReviewerTurn => write!(f, "ReviewerTurn"),
            Self::ArbitratorTurn => write!(f, "ArbitratorTurn"),
            Self::VerdictFound => write!(f, "VerdictFound"),
            Self::BudgetExhausted => write!(f, "BudgetExhausted"),
        }
    }
}

/// Legal transitions between conversation states.
///
/// ```text
/// Started        → ReviewerTurn | ArbitratorTurn
/// ReviewerTurn   → ReviewerTurn | ArbitratorTurn
/// ArbitratorTurn → ArbitratorTurn | VerdictFound
/// (any non-terminal) → BudgetExhausted
/// ```
fn is_legal_transition(from: ConversationState, to: ConversationState) -> bool {
    use ConversationState::*;

    if to == BudgetExhausted && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Started, ReviewerTurn)
            | (Started, ArbitratorTurn)
            | (ReviewerTurn, ReviewerTurn)
            | (ReviewerTurn, ArbitratorTurn)
            // Unused budget lets the arbitrator try again.
            | (ArbitratorTurn, ArbitratorTurn)
            | (ArbitratorTurn, VerdictFound)
    )
}

/// Maximum number of turns in one run, the initiating brief included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnBudget {
    pub max_turns: u32,
}

impl TurnBudget {
    pub fn new(max_turns: u32) -> Self {
        Self { max_turns }
    }

    pub fn for_mode(mode: EvaluationMode) -> Self {
        match mode {
            EvaluationMode::Group => Self::new(GROUP_MAX_TURNS),
            EvaluationMode::Single => Self::new(SINGLE_MAX_TURNS),
        }
    }

    /// The budget must at least fit the brief, `reviewers` critiques and one
    /// arbitrator turn.
    pub fn validate(&self, reviewers: u32) -> Result<(), String> {
        let needed = reviewers + 2;
        if self.max_turns < needed {
            return Err(format!(
                "max_turns {} cannot fit brief + {reviewers} reviewer(s) + arbitrator (need {needed})",
                self.max_turns
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: ConversationState,
    pub to: ConversationState,
    /// Turns used when the transition happened.
    pub turn: u32,
    /// Milliseconds since the state machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: ConversationState,
    pub to: ConversationState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal conversation transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Outcome of asking for a speaking turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnGrant {
    /// Turn granted; carries the 1-based turn number.
    Granted(u32),
    /// Budget spent; the machine is now in `BudgetExhausted`.
    Exhausted,
}

pub struct StateMachine {
    current: ConversationState,
    budget: TurnBudget,
    turns_used: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl StateMachine {
    /// Create a machine in `Started`, with the initiating brief counted as turn 1.
    pub fn new(budget: TurnBudget) -> Self {
        Self {
            current: ConversationState::Started,
            budget,
            turns_used: 1,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> ConversationState {
        self.current
    }

    pub fn turns_used(&self) -> u32 {
        self.turns_used
    }

    pub fn remaining_turns(&self) -> u32 {
        self.budget.max_turns.saturating_sub(self.turns_used)
    }

    pub fn budget(&self) -> TurnBudget {
        self.budget
    }

    /// Request a speaking turn in state `to`.
    ///
    /// When the budget is already spent the machine moves to
    /// `BudgetExhausted` instead and `TurnGrant::Exhausted` is returned.
    pub fn begin_turn(
        &mut self,
        to: ConversationState,
        reason: Option<&str>,
    ) -> Result<TurnGrant, IllegalTransition> {
        if !to.is_turn() {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }
        if self.remaining_turns() == 0 {
            self.advance(ConversationState::BudgetExhausted, Some("turn budget spent"))?;
            return Ok(TurnGrant::Exhausted);
        }
        self.advance(to, reason)?;
        self.turns_used += 1;
        Ok(TurnGrant::Granted(self.turns_used))
    }

    /// Record that the latest arbitrator turn carried a valid verdict.
    pub fn verdict_found(&mut self) -> Result<(), IllegalTransition> {
        self.advance(ConversationState::VerdictFound, None)
    }

    fn advance(
        &mut self,
        to: ConversationState,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            turn: self.turns_used,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(
            from = %self.current,
            to = %to,
            turn = self.turns_used,
            "Conversation transition"
        );

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} → {} ({}ms, {}/{} turns)",
            ConversationState::Started,
            self.current,
            self.created_at.elapsed().as_millis(),
            self.turns_used,
            self.budget.max_turns,
        );
        if !self.transitions.is_empty() {
            let states: Vec<String> = self.transitions.iter().map(|t| t.to.to_string()).collect();
            out.push_str(&format!(" [{}]", states.join(" → ")));
        }
        out
    }
}
