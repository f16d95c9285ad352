//! Wire types for the HTTP surface and the CLI.
//!
//! Field names follow the public JSON contract; conversion into the domain
//! types happens here so the evaluator never sees raw request shapes.

use arbitration::{
    AgentLog, Category, ContributionClaim, FinalArtifact, GroupVerdict, ImpactLevel,
    MemberAllocation, SingleVerdict,
};
use serde::{Deserialize, Serialize};

use crate::brief::EvaluationBrief;
use crate::errors::EvaluationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorInput {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    pub contribution_type: String,
    pub description: String,
    pub content: String,
}

/// `POST /api/evaluate_group` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEvaluationRequest {
    pub project_description: String,
    pub final_project_content: String,
    pub contributors: Vec<ContributorInput>,
}

impl GroupEvaluationRequest {
    /// Build the run brief, rejecting an empty team or an unknown category.
    pub fn into_brief(self) -> Result<EvaluationBrief, EvaluationError> {
        if self.contributors.is_empty() {
            return Err(EvaluationError::InvalidRequest(
                "contributors must not be empty".to_string(),
            ));
        }
        let claims = self
            .contributors
            .into_iter()
            .map(|c| {
                let category = parse_category(&c.contribution_type)?;
                let claim =
                    ContributionClaim::new(c.id, c.name, category, c.description, c.content);
                Ok(match c.role {
                    Some(role) if !role.trim().is_empty() => claim.with_role(role),
                    _ => claim,
                })
            })
            .collect::<Result<Vec<_>, EvaluationError>>()?;

        Ok(EvaluationBrief::group(
            self.project_description,
            FinalArtifact::new(self.final_project_content),
            claims,
        ))
    }
}

/// One member's row in the group response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorResult {
    pub id: String,
    pub name: String,
    pub percentage: f64,
    pub reasoning: String,
    pub impact_level: ImpactLevel,
}

impl From<MemberAllocation> for ContributorResult {
    fn from(a: MemberAllocation) -> Self {
        Self {
            id: a.member_id,
            name: a.member_name,
            percentage: a.percentage,
            reasoning: a.reasoning,
            impact_level: a.impact_level,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEvaluationResponse {
    pub results: Vec<ContributorResult>,
    pub agent_logs: Vec<AgentLog>,
}

impl GroupEvaluationResponse {
    pub fn new(verdict: GroupVerdict, agent_logs: Vec<AgentLog>) -> Self {
        Self {
            results: verdict.results.into_iter().map(Into::into).collect(),
            agent_logs,
        }
    }
}

/// `POST /api/evaluate` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleEvaluationRequest {
    pub user_id: String,
    pub user_name: String,
    pub contribution_type: String,
    pub content: String,
    pub description: String,
    #[serde(default)]
    pub context: Option<String>,
}

impl SingleEvaluationRequest {
    pub fn into_brief(self) -> Result<EvaluationBrief, EvaluationError> {
        let category = parse_category(&self.contribution_type)?;
        let claim = ContributionClaim::new(
            self.user_id,
            self.user_name,
            category,
            self.description,
            self.content,
        );
        Ok(EvaluationBrief::single(claim, self.context))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleEvaluationResponse {
    pub user_id: String,
    pub user_name: String,
    pub score: f64,
    pub reasoning: String,
    pub impact_level: ImpactLevel,
    pub agent_logs: Vec<AgentLog>,
}

impl SingleEvaluationResponse {
    pub fn new(
        user_id: String,
        user_name: String,
        verdict: SingleVerdict,
        agent_logs: Vec<AgentLog>,
    ) -> Self {
        Self {
            user_id,
            user_name,
            score: verdict.score,
            reasoning: verdict.reasoning,
            impact_level: verdict.impact_level,
            agent_logs,
        }
    }
}

/// `GET /health` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub prompt_version: String,
}

/// Error body: `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

fn parse_category(raw: &str) -> Result<Category, EvaluationError> {
    raw.parse::<Category>()
        .map_err(|e| EvaluationError::InvalidRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_json() -> serde_json::Value {
        serde_json::json!({
            "project_description": "Todo app",
            "final_project_content": "fn main() {}",
            "contributors": [
                {"id": "u1", "name": "Ann", "role": "backend", "contribution_type": "code",
                 "description": "core", "content": "fn main() {}"},
                {"id": "u2", "name": "Bo", "contribution_type": "Design",
                 "description": "mockups", "content": "login.fig"}
            ]
        })
    }

    #[test]
    fn group_request_builds_brief() {
        let req: GroupEvaluationRequest = serde_json::from_value(group_json()).unwrap();
        let brief = req.into_brief().unwrap();
        assert_eq!(brief.claims.len(), 2);
        assert_eq!(brief.claims[0].role.as_deref(), Some("backend"));
        assert_eq!(brief.claims[1].category, Category::Design);
        assert!(brief.claims[1].role.is_none());
    }

    #[test]
    fn empty_team_rejected() {
        let req = GroupEvaluationRequest {
            project_description: String::new(),
            final_project_content: String::new(),
            contributors: vec![],
        };
        let err = req.into_brief().unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn unknown_category_rejected() {
        let mut json = group_json();
        json["contributors"][0]["contribution_type"] = "marketing".into();
        let req: GroupEvaluationRequest = serde_json::from_value(json).unwrap();
        let err = req.into_brief().unwrap_err();
        assert!(err.to_string().contains("marketing"));
    }

    #[test]
    fn single_request_context_is_optional() {
        let req: SingleEvaluationRequest = serde_json::from_value(serde_json::json!({
            "user_id": "u1", "user_name": "Ann", "contribution_type": "planning",
            "content": "roadmap", "description": "Q1 plan"
        }))
        .unwrap();
        assert!(req.context.is_none());
        let brief = req.into_brief().unwrap();
        assert_eq!(brief.claims[0].category, Category::Planning);
    }

    #[test]
    fn group_response_uses_wire_field_names() {
        let verdict = GroupVerdict {
            results: vec![MemberAllocation {
                member_id: "u1".into(),
                member_name: "Ann".into(),
                percentage: 100.0,
                reasoning: "all of it".into(),
                impact_level: ImpactLevel::Critical,
            }],
        };
        let json = serde_json::to_value(GroupEvaluationResponse::new(verdict, vec![])).unwrap();
        assert_eq!(json["results"][0]["id"], "u1");
        assert_eq!(json["results"][0]["name"], "Ann");
        assert_eq!(json["results"][0]["impact_level"], "Critical");
        assert!(json["agent_logs"].as_array().unwrap().is_empty());
    }
}
