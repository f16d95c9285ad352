//! The evaluation brief: everything a run knows about the project, and the
//! prompt sections built from it.
//!
//! All artifact and claim text passes through `PromptLimits` here, so every
//! prompt assembled from a brief is bounded.

use std::fmt::Write as _;

use arbitration::{ContributionClaim, EvaluationMode, FinalArtifact, PromptLimits};

/// Inputs of one evaluation run. Read-only once built.
#[derive(Debug, Clone)]
pub struct EvaluationBrief {
    pub mode: EvaluationMode,
    pub project_description: String,
    pub artifact: FinalArtifact,
    pub claims: Vec<ContributionClaim>,
}

impl EvaluationBrief {
    pub fn group(
        project_description: impl Into<String>,
        artifact: FinalArtifact,
        claims: Vec<ContributionClaim>,
    ) -> Self {
        Self {
            mode: EvaluationMode::Group,
            project_description: project_description.into(),
            artifact,
            claims,
        }
    }

    /// Single-subject brief. `context`, when given, plays the artifact role.
    pub fn single(claim: ContributionClaim, context: Option<String>) -> Self {
        Self {
            mode: EvaluationMode::Single,
            project_description: String::new(),
            artifact: FinalArtifact::new(context.unwrap_or_default()),
            claims: vec![claim],
        }
    }

    /// "Final project output" section, truncated.
    pub fn artifact_section(&self, limits: &PromptLimits) -> String {
        let text = self.artifact.prompt_text(limits);
        let mut out = String::new();
        let _ = writeln!(
            out,
            "## Final project output (single source of truth, first {} characters)",
            limits.artifact_chars
        );
        if text.trim().is_empty() {
            out.push_str(
                "(No final project output was supplied. Judge the claim only on the evidence \
                 it contains itself, and treat unverifiable statements sceptically.)\n",
            );
        } else {
            out.push_str(text);
            out.push('\n');
        }
        out
    }

    pub fn project_section(&self) -> String {
        if self.project_description.trim().is_empty() {
            String::new()
        } else {
            format!("## Project description\n{}\n", self.project_description)
        }
    }

    /// Opening message posted by the initiator as turn 1.
    ///
    /// `reviewers` are the reviewers that will speak, in order.
    pub fn initiating_message(
        &self,
        limits: &PromptLimits,
        reviewers: &[&str],
        arbitrator: &str,
    ) -> String {
        let mut out = match self.mode {
            EvaluationMode::Group => "# Group contribution evaluation request\n\n".to_string(),
            EvaluationMode::Single => "# Contribution evaluation request\n\n".to_string(),
        };
        out.push_str(&self.project_section());
        out.push_str(&self.artifact_section(limits));
        out.push_str("\n## Claimed contributions\n");
        out.push_str(&render_claims(&self.claims, limits));

        out.push_str("\n## Process\n");
        let mut step = 1;
        for name in reviewers {
            let _ = writeln!(
                out,
                "{step}. {name} reviews the claims routed to it against the final output."
            );
            step += 1;
        }
        let _ = match self.mode {
            EvaluationMode::Group => writeln!(
                out,
                "{step}. {arbitrator} speaks last and gives the JSON allocation, \
                 summing to exactly 100%."
            ),
            EvaluationMode::Single => writeln!(
                out,
                "{step}. {arbitrator} speaks last and gives the JSON score from 0 to 100."
            ),
        };
        out
    }
}

/// One claim rendered for a prompt, content truncated.
pub fn render_claim(claim: &ContributionClaim, limits: &PromptLimits) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "---");
    let _ = writeln!(out, "Member ID: {}", claim.member_id);
    let _ = writeln!(out, "Name: {}", claim.member_name);
    if let Some(role) = &claim.role {
        let _ = writeln!(out, "Role: {role}");
    }
    let _ = writeln!(out, "Contribution type: {}", claim.category);
    let _ = writeln!(out, "Self-description: {}", claim.description);
    let _ = writeln!(out, "Claimed content:");
    out.push_str(claim.prompt_content(limits));
    out.push('\n');
    if claim.is_truncated(limits) {
        let _ = writeln!(out, "[content truncated to {} characters]", limits.claim_chars);
    }
    out
}

/// A list of claims, or a note that there are none.
pub fn render_claims<'a>(
    claims: impl IntoIterator<Item = &'a ContributionClaim>,
    limits: &PromptLimits,
) -> String {
    let rendered: String = claims
        .into_iter()
        .map(|c| render_claim(c, limits))
        .collect();
    if rendered.is_empty() {
        "(none)\n".to_string()
    } else {
        rendered
    }
}
