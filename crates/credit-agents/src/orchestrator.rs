//! Conversation loop: brief → reviewers → arbitrator (→ arbitrator ...).
//!
//! The orchestrator is the only writer of the transcript. Every speaking
//! turn goes through `StateMachine::begin_turn`, so the turn budget holds no
//! matter how the oracle behaves. Oracle errors end the run immediately.

use std::time::Instant;

use arbitration::{
    ConversationState, PromptLimits, SpeakerRole, StateMachine, Transcript,
    TurnBudget, TurnGrant, VerdictExtractor,
};
use tracing::{debug, info, warn};

use crate::agents::reviewer::ReviewerSpec;
use crate::agents::{Persona, Roster};
use crate::brief::EvaluationBrief;
use crate::errors::EvaluationError;
use crate::oracle::Oracle;
use crate::prompts::INITIATOR_NAME;
use crate::telemetry::MetricsCollector;

/// Transcript and final state of one conversation.
#[derive(Debug)]
pub struct ConversationOutcome {
    pub transcript: Transcript,
    pub final_state: ConversationState,
    pub turns_used: u32,
}

impl ConversationOutcome {
    pub fn verdict_found(&self) -> bool {
        self.final_state == ConversationState::VerdictFound
    }
}

/// Who speaks next.
enum NextSpeaker<'r> {
    Reviewer(&'r ReviewerSpec),
    /// `retry` is set once the arbitrator has already spoken without a verdict.
    Arbitrator { retry: bool },
}

pub struct Orchestrator<'a> {
    oracle: &'a dyn Oracle,
    roster: &'a Roster,
    limits: PromptLimits,
    budget: TurnBudget,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        oracle: &'a dyn Oracle,
        roster: &'a Roster,
        limits: PromptLimits,
        budget: TurnBudget,
    ) -> Self {
        Self {
            oracle,
            roster,
            limits,
            budget,
        }
    }

    /// Drive one conversation to a terminal state.
    pub async fn run(
        &self,
        brief: &EvaluationBrief,
        metrics: &mut MetricsCollector,
    ) -> Result<ConversationOutcome, EvaluationError> {
        if brief.mode != self.roster.mode {
            return Err(EvaluationError::Configuration(format!(
                "{} brief handed to a {} roster",
                brief.mode, self.roster.mode
            )));
        }

        let reviewers: Vec<&ReviewerSpec> =
            self.roster.active_reviewers(&brief.claims).collect();
        for skipped in self
            .roster
            .reviewers
            .iter()
            .filter(|r| !reviewers.iter().any(|a| a.persona.name == r.persona.name))
        {
            debug!(reviewer = %skipped.persona.name, "No claims routed; reviewer skipped");
        }

        let arbitrator = &self.roster.arbitrator;
        let extractor = VerdictExtractor::new(brief.mode);
        let mut machine = StateMachine::new(self.budget);
        let mut transcript = Transcript::new();

        let reviewer_names: Vec<&str> =
            reviewers.iter().map(|r| r.persona.name.as_str()).collect();
        transcript.push(
            SpeakerRole::Initiator,
            INITIATOR_NAME,
            brief.initiating_message(&self.limits, &reviewer_names, &arbitrator.persona.name),
        );

        info!(
            run_id = %metrics.run_id(),
            mode = %brief.mode,
            claims = brief.claims.len(),
            reviewers = reviewers.len(),
            max_turns = self.budget.max_turns,
            "Conversation started"
        );

        loop {
            let next = select_next(&transcript, &reviewers);
            let (state, persona, role): (ConversationState, &Persona, SpeakerRole) = match &next {
                NextSpeaker::Reviewer(r) => (
                    ConversationState::ReviewerTurn,
                    &r.persona,
                    SpeakerRole::Reviewer,
                ),
                NextSpeaker::Arbitrator { .. } => (
                    ConversationState::ArbitratorTurn,
                    &arbitrator.persona,
                    SpeakerRole::Arbitrator,
                ),
            };

            let turn = match machine.begin_turn(state, Some(persona.name.as_str()))? {
                TurnGrant::Granted(turn) => turn,
                TurnGrant::Exhausted => {
                    warn!(
                        run_id = %metrics.run_id(),
                        mode = %brief.mode,
                        turns = machine.turns_used(),
                        "Turn budget exhausted without a valid verdict"
                    );
                    break;
                }
            };

            let prompt = match &next {
                NextSpeaker::Reviewer(r) => r.build_prompt(brief, &self.limits),
                NextSpeaker::Arbitrator { retry } => {
                    arbitrator.build_prompt(brief, &transcript, &self.limits, *retry)
                }
            };

            let started = Instant::now();
            let reply = self.oracle.complete(persona, &prompt).await?;
            let elapsed = started.elapsed();
            metrics.record_turn(turn, &persona.name, &prompt, &reply, elapsed);

            debug!(
                run_id = %metrics.run_id(),
                turn,
                speaker = %persona.name,
                prompt_chars = prompt.chars().count(),
                reply_chars = reply.chars().count(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Turn complete"
            );

            let carries_verdict = extractor.has_verdict(&reply);
            transcript.push(role, persona.name.as_str(), reply);

            match role {
                SpeakerRole::Arbitrator if carries_verdict => {
                    machine.verdict_found()?;
                    break;
                }
                SpeakerRole::Arbitrator => {
                    warn!(
                        run_id = %metrics.run_id(),
                        turn,
                        remaining = machine.remaining_turns(),
                        "Arbitrator reply carried no valid verdict"
                    );
                }
                _ if carries_verdict => {
                    warn!(
                        speaker = %persona.name,
                        turn,
                        "Reviewer emitted a verdict-shaped payload; ignored"
                    );
                }
                _ => {}
            }
        }

        info!(
            run_id = %metrics.run_id(),
            summary = %machine.summary(),
            "Conversation finished"
        );

        Ok(ConversationOutcome {
            final_state: machine.current(),
            turns_used: machine.turns_used(),
            transcript,
        })
    }
}

/// First routed reviewer that has not spoken, else the arbitrator.
fn select_next<'r>(transcript: &Transcript, reviewers: &[&'r ReviewerSpec]) -> NextSpeaker<'r> {
    if let Some(r) = reviewers
        .iter()
        .copied()
        .find(|r| !transcript.has_spoken(&r.persona.name))
    {
        return NextSpeaker::Reviewer(r);
    }
    NextSpeaker::Arbitrator {
        retry: transcript.by_role(SpeakerRole::Arbitrator).next().is_some(),
    }
}
