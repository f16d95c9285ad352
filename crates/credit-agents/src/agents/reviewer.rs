//! Category reviewers.
//!
//! A reviewer only ever sees the claims routed to it, never the whole team.
//! It produces a critique and no number.

use arbitration::{Category, ContributionClaim, PromptLimits};

use super::Persona;
use crate::brief::{render_claims, EvaluationBrief};
use crate::prompts;

#[derive(Debug, Clone)]
pub struct ReviewerSpec {
    pub persona: Persona,
    /// Claim categories routed to this reviewer.
    pub categories: Vec<Category>,
}

impl ReviewerSpec {
    pub fn accepts(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    /// Claims routed to this reviewer, input order preserved.
    pub fn route<'a>(&self, claims: &'a [ContributionClaim]) -> Vec<&'a ContributionClaim> {
        claims.iter().filter(|c| self.accepts(c.category)).collect()
    }

    /// Prompt for this reviewer's single turn.
    pub fn build_prompt(&self, brief: &EvaluationBrief, limits: &PromptLimits) -> String {
        let routed = self.route(&brief.claims);
        let categories: Vec<&str> = self.categories.iter().map(|c| c.as_str()).collect();

        let mut prompt = String::new();
        prompt.push_str(&brief.project_section());
        prompt.push_str(&brief.artifact_section(limits));
        prompt.push_str(&format!(
            "\n## Claims routed to you ({}; {} of {})\n",
            categories.join(", "),
            routed.len(),
            brief.claims.len()
        ));
        prompt.push_str(&render_claims(routed, limits));
        prompt.push_str(
            "\nReview each claim above against the final project output. \
             Give your analysis only, with no percentages or scores.\n",
        );
        prompt
    }
}

/// Reviewer for `code` claims.
pub fn code_reviewer() -> ReviewerSpec {
    ReviewerSpec {
        persona: Persona::new(
            prompts::CODE_REVIEWER_NAME,
            "Principal architect. Reviews code claims against the final output.",
            prompts::CODE_REVIEWER_PREAMBLE,
        ),
        categories: vec![Category::Code],
    }
}

/// Reviewer for `document`, `design` and `planning` claims.
pub fn document_reviewer() -> ReviewerSpec {
    ReviewerSpec {
        persona: Persona::new(
            prompts::DOC_REVIEWER_NAME,
            "Product director. Reviews document, design and planning claims.",
            prompts::DOC_REVIEWER_PREAMBLE,
        ),
        categories: vec![Category::Document, Category::Design, Category::Planning],
    }
}

#[cfg(test)]
mod tests {
    use arbitration::FinalArtifact;

    use super::*;

    fn brief() -> EvaluationBrief {
        EvaluationBrief::group(
            "Todo app",
            FinalArtifact::new("fn main() { run(); }"),
            vec![
                ContributionClaim::new("u1", "Ann", Category::Code, "core loop", "fn run() {}"),
                ContributionClaim::new("u2", "Bo", Category::Design, "wireframes", "login.fig"),
                ContributionClaim::new("u3", "Cy", Category::Planning, "roadmap", "sprint plan"),
            ],
        )
    }

    #[test]
    fn routing_partitions_categories() {
        let b = brief();
        let code: Vec<&str> = code_reviewer()
            .route(&b.claims)
            .iter()
            .map(|c| c.member_id.as_str())
            .collect();
        let docs: Vec<&str> = document_reviewer()
            .route(&b.claims)
            .iter()
            .map(|c| c.member_id.as_str())
            .collect();
        assert_eq!(code, vec!["u1"]);
        assert_eq!(docs, vec!["u2", "u3"]);
    }

    #[test]
    fn every_category_has_exactly_one_reviewer() {
        let reviewers = [code_reviewer(), document_reviewer()];
        for category in Category::all() {
            let n = reviewers.iter().filter(|r| r.accepts(*category)).count();
            assert_eq!(n, 1, "{category} routed to {n} reviewers");
        }
    }

    #[test]
    fn prompt_contains_only_routed_claims() {
        let prompt = code_reviewer().build_prompt(&brief(), &PromptLimits::default());
        assert!(prompt.contains("Member ID: u1"));
        assert!(!prompt.contains("Member ID: u2"));
        assert!(!prompt.contains("Member ID: u3"));
        assert!(prompt.contains("fn main() { run(); }"));
        assert!(prompt.contains("1 of 3"));
    }
}
