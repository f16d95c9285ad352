//! The arbitrator: sees everything, emits the structured verdict.

use arbitration::{truncate_chars, EvaluationMode, PromptLimits, SpeakerRole, Transcript};

use super::Persona;
use crate::brief::{render_claims, EvaluationBrief};
use crate::prompts;

#[derive(Debug, Clone)]
pub struct ArbitratorSpec {
    pub persona: Persona,
    pub mode: EvaluationMode,
}

impl ArbitratorSpec {
    /// Prompt for an arbitrator turn.
    ///
    /// Carries the artifact, every claim, and the reviewer critiques so far.
    /// `retry` is set when an earlier arbitrator reply held no usable verdict.
    pub fn build_prompt(
        &self,
        brief: &EvaluationBrief,
        transcript: &Transcript,
        limits: &PromptLimits,
        retry: bool,
    ) -> String {
        let mut prompt = String::new();
        prompt.push_str(&brief.project_section());
        prompt.push_str(&brief.artifact_section(limits));

        prompt.push_str("\n## Claimed contributions\n");
        prompt.push_str(&render_claims(&brief.claims, limits));

        prompt.push_str("\n## Reviewer reports\n");
        let mut any = false;
        for message in transcript.by_role(SpeakerRole::Reviewer) {
            any = true;
            prompt.push_str(&format!(
                "### {}\n{}\n",
                message.name,
                truncate_chars(&message.text, limits.artifact_chars)
            ));
        }
        if !any {
            prompt.push_str("(no reviewer reports)\n");
        }

        prompt.push('\n');
        prompt.push_str(match self.mode {
            EvaluationMode::Group => {
                "Allocate 100% of the credit across every member listed above and reply \
                 with the JSON verdict.\n"
            }
            EvaluationMode::Single => {
                "Score the contribution above and reply with the JSON verdict.\n"
            }
        });
        if retry {
            prompt.push('\n');
            prompt.push_str(prompts::ARBITRATOR_RETRY_NOTICE);
            prompt.push('\n');
        }
        prompt
    }
}

pub fn group_arbitrator() -> ArbitratorSpec {
    ArbitratorSpec {
        persona: Persona::new(
            prompts::ARBITRATOR_NAME,
            "Neutral arbitrator. Splits 100% of the credit across the team.",
            prompts::GROUP_ARBITRATOR_PREAMBLE,
        ),
        mode: EvaluationMode::Group,
    }
}

pub fn single_arbitrator() -> ArbitratorSpec {
    ArbitratorSpec {
        persona: Persona::new(
            prompts::ARBITRATOR_NAME,
            "Neutral arbitrator. Scores one contribution from 0 to 100.",
            prompts::SINGLE_ARBITRATOR_PREAMBLE,
        ),
        mode: EvaluationMode::Single,
    }
}
