//! Contribution claims and the final artifact they are judged against.
//!
//! Both are read-only once constructed. Prompt assembly only ever sees their
//! truncated views (`prompt_content`, `prompt_text`), so the oracle never
//! receives more than the configured bound.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default bound (in characters) on a single claim's content inside a prompt.
pub const DEFAULT_CLAIM_CHARS: usize = 3_000;
/// Default bound (in characters) on the final artifact inside a prompt.
pub const DEFAULT_ARTIFACT_CHARS: usize = 15_000;

/// Kind of work a contributor claims to have done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Code,
    Document,
    Design,
    Planning,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Code,
            Category::Document,
            Category::Design,
            Category::Planning,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Document => "document",
            Self::Design => "design",
            Self::Planning => "planning",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a category string is not one of the four known kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown contribution category: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code" => Ok(Self::Code),
            "document" => Ok(Self::Document),
            "design" => Ok(Self::Design),
            "planning" => Ok(Self::Planning),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// Character bounds applied before anything reaches a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptLimits {
    /// Maximum characters of a claim's `content`.
    pub claim_chars: usize,
    /// Maximum characters of the final artifact.
    pub artifact_chars: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            claim_chars: DEFAULT_CLAIM_CHARS,
            artifact_chars: DEFAULT_ARTIFACT_CHARS,
        }
    }
}

impl PromptLimits {
    pub fn validate(&self) -> Result<(), String> {
        if self.claim_chars == 0 {
            return Err("claim_chars must be > 0".to_string());
        }
        if self.artifact_chars == 0 {
            return Err("artifact_chars must be > 0".to_string());
        }
        Ok(())
    }
}

/// Keep at most `max_chars` characters of `text`.
///
/// Counts Unicode scalar values, so multi-byte text is never cut inside a
/// character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// A contributor's self-reported piece of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionClaim {
    pub member_id: String,
    pub member_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub category: Category,
    pub description: String,
    pub content: String,
}

impl ContributionClaim {
    pub fn new(
        member_id: impl Into<String>,
        member_name: impl Into<String>,
        category: Category,
        description: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            member_id: member_id.into(),
            member_name: member_name.into(),
            role: None,
            category,
            description: description.into(),
            content: content.into(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// The content as it may appear in a prompt.
    pub fn prompt_content(&self, limits: &PromptLimits) -> &str {
        truncate_chars(&self.content, limits.claim_chars)
    }

    /// Whether `content` exceeds the prompt bound.
    pub fn is_truncated(&self, limits: &PromptLimits) -> bool {
        self.content.chars().count() > limits.claim_chars
    }
}

/// The delivered project, used as ground truth for every claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalArtifact {
    pub text: String,
}

impl FinalArtifact {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The artifact as it may appear in a prompt.
    pub fn prompt_text(&self, limits: &PromptLimits) -> &str {
        truncate_chars(&self.text, limits.artifact_chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    #[test]
    fn truncate_cuts_at_char_boundary() {
        // Three-byte characters must not be split.
        let text = "核心算法实现";
        assert_eq!(truncate_chars(text, 2), "核心");
        assert_eq!(truncate_chars(text, 0), "");
    }

    #[test]
    fn claim_content_bounded_by_limits() {
        let limits = PromptLimits {
            claim_chars: 5,
            artifact_chars: 100,
        };
        let claim = ContributionClaim::new("u1", "Ann", Category::Code, "parser", "0123456789");
        assert_eq!(claim.prompt_content(&limits), "01234");
        assert!(claim.is_truncated(&limits));
    }

    #[test]
    fn artifact_bounded_by_limits() {
        let limits = PromptLimits {
            claim_chars: 5,
            artifact_chars: 4,
        };
        let artifact = FinalArtifact::new("fn main() {}");
        assert_eq!(artifact.prompt_text(&limits), "fn m");
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Code".parse::<Category>().unwrap(), Category::Code);
        assert_eq!(" planning ".parse::<Category>().unwrap(), Category::Planning);
        assert!("video".parse::<Category>().is_err());
    }

    #[test]
    fn category_serde_is_lowercase() {
        let json = serde_json::to_string(&Category::Design).unwrap();
        assert_eq!(json, "\"design\"");
        let parsed: Category = serde_json::from_str("\"document\"").unwrap();
        assert_eq!(parsed, Category::Document);
    }

    #[test]
    fn zero_limits_rejected() {
        let limits = PromptLimits {
            claim_chars: 0,
            artifact_chars: 10,
        };
        assert!(limits.validate().is_err());
        assert!(PromptLimits::default().validate().is_ok());
    }
}
