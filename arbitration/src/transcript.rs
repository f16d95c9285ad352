//! Append-only message log of one evaluation run.
//!
//! The orchestrator is the only writer. The extractor, telemetry, and the
//! response builder read it through `messages()` / `iter_latest_first()`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the protocol produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRole {
    /// Posts the assembled brief that opens the conversation.
    Initiator,
    /// Category reviewer; critique only.
    Reviewer,
    /// Produces the structured verdict.
    Arbitrator,
}

/// One entry in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: SpeakerRole,
    /// Display name of the speaker (e.g. `Code_Expert`).
    pub name: String,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// `{sender, content}` pair as returned to callers in `agent_logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentLog {
    pub sender: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. There is no way to edit or remove one.
    pub fn push(&mut self, role: SpeakerRole, name: impl Into<String>, text: impl Into<String>) {
        self.messages.push(Message {
            role,
            name: name.into(),
            text: text.into(),
            at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter_latest_first(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().rev()
    }

    /// Whether a speaker with this display name has spoken yet.
    pub fn has_spoken(&self, name: &str) -> bool {
        self.messages.iter().any(|m| m.name == name)
    }

    /// Messages from a given role, oldest first.
    pub fn by_role(&self, role: SpeakerRole) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.role == role)
    }

    pub fn agent_logs(&self) -> Vec<AgentLog> {
        self.messages
            .iter()
            .map(|m| AgentLog {
                sender: m.name.clone(),
                content: m.text.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(entries: &[(SpeakerRole, &str, &str)]) -> Transcript {
        let mut t = Transcript::new();
        for (role, name, text) in entries {
            t.push(*role, *name, *text);
        }
        t
    }

    #[test]
    fn push_preserves_order() {
        let mut t = Transcript::new();
        t.push(SpeakerRole::Initiator, "Admin", "brief");
        t.push(SpeakerRole::Reviewer, "Code_Expert", "critique");
        t.push(SpeakerRole::Arbitrator, "Fairness_Judge", "verdict");

        assert_eq!(t.len(), 3);
        let names: Vec<_> = t.iter_latest_first().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Fairness_Judge", "Code_Expert", "Admin"]);
    }

    #[test]
    fn agent_logs_use_sender_and_content() {
        let t = transcript(&[
            (SpeakerRole::Initiator, "Admin", "brief"),
            (SpeakerRole::Reviewer, "Doc_Design_Expert", "notes"),
        ]);
        let logs = t.agent_logs();
        assert_eq!(logs[1].sender, "Doc_Design_Expert");
        assert_eq!(logs[1].content, "notes");

        let json = serde_json::to_value(&logs[0]).unwrap();
        assert_eq!(json["sender"], "Admin");
        assert_eq!(json["content"], "brief");
    }

    #[test]
    fn by_role_filters() {
        let t = transcript(&[
            (SpeakerRole::Initiator, "Admin", "brief"),
            (SpeakerRole::Reviewer, "Code_Expert", "a"),
            (SpeakerRole::Reviewer, "Doc_Design_Expert", "b"),
            (SpeakerRole::Arbitrator, "Fairness_Judge", "c"),
        ]);
        assert_eq!(t.by_role(SpeakerRole::Reviewer).count(), 2);
        assert!(t.has_spoken("Code_Expert"));
        assert!(!t.has_spoken("Nobody"));
    }
}
