//! Scripted oracle shared by the integration tests.
//!
//! Records every persona/prompt pair it receives so tests can assert on what
//! actually reached the backend.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use credit_agents::agents::Persona;
use credit_agents::api::{ContributorInput, GroupEvaluationRequest};
use credit_agents::prompts::ARBITRATOR_NAME;
use credit_agents::{CreditConfig, EvaluationService, Oracle, OracleError};

pub const REVIEW_TEXT: &str = "Reviewed every claim against the final output.";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub persona: String,
    pub prompt: String,
}

type Script = dyn Fn(&Persona, &str, usize) -> Result<String, OracleError> + Send + Sync;

pub struct ScriptedOracle {
    script: Box<Script>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedOracle {
    /// Reviewers get `REVIEW_TEXT`; the arbitrator gets `replies` in order,
    /// the last one repeating.
    pub fn arbitrator_replies(replies: Vec<&str>) -> Self {
        let replies: Vec<String> = replies.into_iter().map(String::from).collect();
        Self::with_script(move |persona, _, arbitrator_calls| {
            if persona.name == ARBITRATOR_NAME {
                let idx = arbitrator_calls.min(replies.len() - 1);
                Ok(replies[idx].clone())
            } else {
                Ok(REVIEW_TEXT.to_string())
            }
        })
    }

    /// Arbitrator that weights each claim by whether its content appears
    /// verbatim in the final output shown in its prompt.
    pub fn evidence_weighing() -> Self {
        Self::with_script(|persona, prompt, _| {
            if persona.name == ARBITRATOR_NAME {
                Ok(weigh_evidence(prompt))
            } else {
                Ok(REVIEW_TEXT.to_string())
            }
        })
    }

    /// Every call fails with `err`.
    pub fn failing(err: OracleError) -> Self {
        Self::with_script(move |_, _, _| Err(err.clone()))
    }

    pub fn with_script<F>(script: F) -> Self
    where
        F: Fn(&Persona, &str, usize) -> Result<String, OracleError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn prompts_for(&self, persona: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.persona == persona)
            .map(|c| c.prompt.clone())
            .collect()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, persona: &Persona, prompt: &str) -> Result<String, OracleError> {
        let arbitrator_calls = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls
                .iter()
                .filter(|c| c.persona == ARBITRATOR_NAME)
                .count();
            calls.push(RecordedCall {
                persona: persona.name.clone(),
                prompt: prompt.to_string(),
            });
            n
        };
        (self.script)(persona, prompt, arbitrator_calls)
    }
}

/// Parse claims and the final output back out of an arbitrator prompt and
/// allocate 3:1 in favour of claims found in the output.
fn weigh_evidence(prompt: &str) -> String {
    let artifact = prompt
        .split("## Final project output")
        .nth(1)
        .and_then(|rest| rest.split_once('\n'))
        .map(|(_, body)| body.split("\n## ").next().unwrap_or(""))
        .unwrap_or("");

    let claims_section = prompt
        .split("## Claimed contributions\n")
        .nth(1)
        .and_then(|rest| rest.split("\n## ").next())
        .unwrap_or("");

    let mut members = Vec::new();
    for block in claims_section.split("---\n").filter(|b| !b.trim().is_empty()) {
        let field = |key: &str| {
            block
                .lines()
                .find_map(|l| l.strip_prefix(key))
                .unwrap_or("")
                .trim()
                .to_string()
        };
        let id = field("Member ID: ");
        let name = field("Name: ");
        let content = block
            .split_once("Claimed content:\n")
            .map(|(_, c)| c.trim().to_string())
            .unwrap_or_default();
        let present = !content.is_empty() && artifact.contains(&content);
        members.push((id, name, if present { 3.0 } else { 1.0 }, present));
    }

    let total: f64 = members.iter().map(|m| m.2).sum();
    let results: Vec<serde_json::Value> = members
        .iter()
        .map(|(id, name, weight, present)| {
            let (reasoning, impact) = if *present {
                ("found in final output", "High")
            } else {
                ("not found in final output", "Low")
            };
            serde_json::json!({
                "id": id,
                "name": name,
                "percentage": weight * 100.0 / total,
                "reasoning": reasoning,
                "impact_level": impact,
            })
        })
        .collect();
    format!(
        "Weighing complete.\n{}\nTERMINATE",
        serde_json::json!({ "results": results })
    )
}

pub fn contributor(id: &str, name: &str, kind: &str, content: &str) -> ContributorInput {
    ContributorInput {
        id: id.to_string(),
        name: name.to_string(),
        role: None,
        contribution_type: kind.to_string(),
        description: format!("{name}'s {kind} work"),
        content: content.to_string(),
    }
}

pub fn group_request(
    artifact: &str,
    contributors: Vec<ContributorInput>,
) -> GroupEvaluationRequest {
    GroupEvaluationRequest {
        project_description: "Team project".to_string(),
        final_project_content: artifact.to_string(),
        contributors,
    }
}

pub fn service_with(oracle: Arc<ScriptedOracle>, config: CreditConfig) -> EvaluationService {
    EvaluationService::new(oracle, Arc::new(config))
}

pub fn service(oracle: Arc<ScriptedOracle>) -> EvaluationService {
    service_with(oracle, CreditConfig::default())
}
