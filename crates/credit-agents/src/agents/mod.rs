//! Personas taking part in an evaluation run.
//!
//! A persona is plain data: display name, description and preamble. The
//! `Oracle` turns it into a live agent per call. The `Roster` ties the
//! reviewers and the arbitrator together for one evaluation mode.

pub mod arbitrator;
pub mod reviewer;

use arbitration::{Category, ContributionClaim, EvaluationMode};

use arbitrator::ArbitratorSpec;
use reviewer::ReviewerSpec;

/// Identity and instructions of one conversational role.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    /// Display name, used in the transcript and `agent_logs`.
    pub name: String,
    pub description: String,
    pub preamble: String,
}

impl Persona {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        preamble: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            preamble: preamble.into(),
        }
    }
}

/// Reviewers and arbitrator for one evaluation mode.
#[derive(Debug, Clone)]
pub struct Roster {
    pub mode: EvaluationMode,
    pub reviewers: Vec<ReviewerSpec>,
    pub arbitrator: ArbitratorSpec,
}

impl Roster {
    /// Code reviewer + document/design reviewer + group arbitrator.
    pub fn group() -> Self {
        Self {
            mode: EvaluationMode::Group,
            reviewers: vec![reviewer::code_reviewer(), reviewer::document_reviewer()],
            arbitrator: arbitrator::group_arbitrator(),
        }
    }

    /// The one reviewer matching `category`, plus the single-subject arbitrator.
    pub fn single(category: Category) -> Self {
        let reviewer = if category == Category::Code {
            reviewer::code_reviewer()
        } else {
            reviewer::document_reviewer()
        };
        Self {
            mode: EvaluationMode::Single,
            reviewers: vec![reviewer],
            arbitrator: arbitrator::single_arbitrator(),
        }
    }

    /// Reviewers that have at least one routed claim, in roster order.
    pub fn active_reviewers<'a>(
        &'a self,
        claims: &'a [ContributionClaim],
    ) -> impl Iterator<Item = &'a ReviewerSpec> + 'a {
        self.reviewers
            .iter()
            .filter(move |r| claims.iter().any(|c| r.accepts(c.category)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::{ARBITRATOR_NAME, CODE_REVIEWER_NAME, DOC_REVIEWER_NAME};

    #[test]
    fn group_roster_has_both_reviewers() {
        let roster = Roster::group();
        let reviewers: Vec<&str> = roster
            .reviewers
            .iter()
            .map(|r| r.persona.name.as_str())
            .collect();
        assert_eq!(reviewers, vec![CODE_REVIEWER_NAME, DOC_REVIEWER_NAME]);
        assert_eq!(roster.arbitrator.persona.name, ARBITRATOR_NAME);
    }

    #[test]
    fn single_roster_picks_reviewer_by_category() {
        let code = Roster::single(Category::Code);
        assert_eq!(code.reviewers.len(), 1);
        assert_eq!(code.reviewers[0].persona.name, CODE_REVIEWER_NAME);

        for category in [Category::Document, Category::Design, Category::Planning] {
            let roster = Roster::single(category);
            assert_eq!(roster.reviewers[0].persona.name, DOC_REVIEWER_NAME);
            assert_eq!(roster.mode, EvaluationMode::Single);
        }
    }

    #[test]
    fn reviewers_without_claims_are_inactive() {
        let roster = Roster::group();
        let claims = vec![ContributionClaim::new(
            "u1",
            "Ann",
            Category::Planning,
            "roadmap",
            "Q1 milestones",
        )];
        let active: Vec<&str> = roster
            .active_reviewers(&claims)
            .map(|r| r.persona.name.as_str())
            .collect();
        assert_eq!(active, vec![DOC_REVIEWER_NAME]);
    }
}
