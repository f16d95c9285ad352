//! Verdict extraction from free-form oracle output.
//!
//! The arbitrator is instructed to emit a bare JSON object, but replies are
//! untrusted text: payloads arrive wrapped in prose, inside markdown fences,
//! nested under another key, or with missing / mistyped fields. Extraction is
//! therefore permissive about *where* the payload sits and strict only about
//! its shape.
//!
//! Scan order is latest message first. Within a message, candidate spans are
//! the outermost balanced `{...}` blocks that mention the mode's marker key
//! (`"results"` or `"score"`), latest span first, then the first-`{`-to-last-`}`
//! span as a last resort. The first candidate that decodes and validates wins.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::transcript::{SpeakerRole, Transcript};
use crate::verdict::{
    EvaluationMode, GroupVerdict, ImpactLevel, MemberAllocation, SingleVerdict, Verdict,
};

/// Fallback text used when a payload carries no reasoning.
pub const MISSING_REASONING: &str = "No reasoning provided.";
/// Fallback used when a group entry carries no id or name.
pub const MISSING_IDENTITY: &str = "unknown";

static RESULTS_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""results"\s*:"#).expect("RESULTS_KEY_RE regex should compile")
});
static SCORE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""score"\s*:"#).expect("SCORE_KEY_RE regex should compile"));

/// No message in the transcript carried a usable payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "no valid {mode} verdict found in {messages_scanned} transcript messages \
     ({candidates_rejected} candidate payloads rejected)"
)]
pub struct ExtractionFailure {
    pub mode: EvaluationMode,
    pub messages_scanned: usize,
    pub candidates_rejected: usize,
}

/// A verdict together with where it came from and what had to be patched.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedVerdict {
    pub verdict: Verdict,
    /// Index into `Transcript::messages()` of the winning message.
    pub message_index: usize,
    /// Field paths that were missing or mistyped and replaced by defaults.
    pub fallbacks: Vec<String>,
}

/// Stateless extractor; one per evaluation mode.
#[derive(Debug, Clone, Copy)]
pub struct VerdictExtractor {
    mode: EvaluationMode,
}

impl VerdictExtractor {
    pub fn new(mode: EvaluationMode) -> Self {
        Self { mode }
    }

    /// Scan the transcript latest-first and return the first valid verdict.
    pub fn extract(&self, transcript: &Transcript) -> Result<ExtractedVerdict, ExtractionFailure> {
        self.scan(transcript, None)
    }

    /// Like `extract`, but only messages from `role` are considered.
    pub fn extract_spoken_by(
        &self,
        transcript: &Transcript,
        role: SpeakerRole,
    ) -> Result<ExtractedVerdict, ExtractionFailure> {
        self.scan(transcript, Some(role))
    }

    fn scan(
        &self,
        transcript: &Transcript,
        role: Option<SpeakerRole>,
    ) -> Result<ExtractedVerdict, ExtractionFailure> {
        let mut rejected = 0;
        let mut scanned = 0;
        let total = transcript.len();

        for (offset, message) in transcript.iter_latest_first().enumerate() {
            let index = total - 1 - offset;
            if role.is_some_and(|r| r != message.role) {
                continue;
            }
            scanned += 1;
            match self.extract_from_text(&message.text) {
                Ok(Some((verdict, fallbacks))) => {
                    if !fallbacks.is_empty() {
                        warn!(
                            mode = %self.mode,
                            speaker = %message.name,
                            fields = ?fallbacks,
                            "Verdict payload had missing or mistyped fields; defaults applied"
                        );
                    }
                    debug!(mode = %self.mode, index, speaker = %message.name, "Verdict extracted");
                    return Ok(ExtractedVerdict {
                        verdict,
                        message_index: index,
                        fallbacks,
                    });
                }
                Ok(None) => {}
                Err(n) => rejected += n,
            }
        }

        Err(ExtractionFailure {
            mode: self.mode,
            messages_scanned: scanned,
            candidates_rejected: rejected,
        })
    }

    /// Whether this single message carries a valid payload.
    pub fn has_verdict(&self, text: &str) -> bool {
        matches!(self.extract_from_text(text), Ok(Some(_)))
    }

    /// Try every candidate span in one message.
    ///
    /// `Ok(None)` means no candidate was present at all; `Err(n)` means `n`
    /// candidates were found and all were rejected.
    fn extract_from_text(&self, text: &str) -> Result<Option<(Verdict, Vec<String>)>, usize> {
        let marker = self.marker_re();
        if !text.contains('{') || !marker.is_match(text) {
            return Ok(None);
        }

        let mut rejected = 0;
        for candidate in candidate_spans(text, marker) {
            let value: Value = match serde_json::from_str(candidate) {
                Ok(v) => v,
                Err(e) => {
                    debug!(error = %e, "Candidate payload is not valid JSON");
                    rejected += 1;
                    continue;
                }
            };
            let Some(obj) = find_marker_object(&value, self.mode.marker_field()) else {
                rejected += 1;
                continue;
            };
            let validated = match self.mode {
                EvaluationMode::Group => validate_group(obj).map(|(g, f)| (Verdict::Group(g), f)),
                EvaluationMode::Single => {
                    let (s, f) = validate_single(obj);
                    Some((Verdict::Single(s), f))
                }
            };
            match validated {
                Some(found) => return Ok(Some(found)),
                None => rejected += 1,
            }
        }

        if rejected == 0 {
            Ok(None)
        } else {
            Err(rejected)
        }
    }

    fn marker_re(&self) -> &'static Regex {
        match self.mode {
            EvaluationMode::Group => &RESULTS_KEY_RE,
            EvaluationMode::Single => &SCORE_KEY_RE,
        }
    }
}

/// Candidate payload slices, most likely first.
fn candidate_spans<'a>(text: &'a str, marker: &Regex) -> Vec<&'a str> {
    let mut spans: Vec<&str> = balanced_object_spans(text)
        .into_iter()
        .rev()
        .map(|(start, end)| &text[start..end])
        .filter(|span| marker.is_match(span))
        .collect();

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            let widest = &text[start..=end];
            if marker.is_match(widest) && !spans.contains(&widest) {
                spans.push(widest);
            }
        }
    }
    spans
}

/// Byte ranges of every outermost balanced `{...}` block.
///
/// Braces inside JSON strings are ignored once inside a block. Text outside
/// any block is treated as prose, so stray quotes there do not matter. An
/// unclosed block is skipped and scanning resumes just past its opening
/// brace, so a stray `{` in prose does not hide a later payload.
pub fn balanced_object_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut from = 0usize;
    while let Some(open) = scan_blocks(text, from, &mut spans) {
        from = open + 1;
    }
    spans
}

/// Push closed blocks found in `text[from..]`; return the start of a block
/// left open at the end of the text.
fn scan_blocks(text: &str, from: usize, spans: &mut Vec<(usize, usize)>) -> Option<usize> {
    let mut depth = 0usize;
    let mut start = from;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[from..].char_indices() {
        let i = from + offset;
        if depth > 0 && in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }
    (depth > 0).then_some(start)
}

/// The object carrying `marker`, searching nested values depth-first.
fn find_marker_object<'a>(value: &'a Value, marker: &str) -> Option<&'a Map<String, Value>> {
    match value {
        Value::Object(obj) if obj.contains_key(marker) => Some(obj),
        Value::Object(obj) => obj.values().find_map(|v| find_marker_object(v, marker)),
        Value::Array(items) => items.iter().find_map(|v| find_marker_object(v, marker)),
        _ => None,
    }
}

fn validate_group(obj: &Map<String, Value>) -> Option<(GroupVerdict, Vec<String>)> {
    let items = obj.get("results")?.as_array()?;
    let mut fallbacks = Vec::new();
    let mut results = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let Some(entry) = item.as_object() else {
            fallbacks.push(format!("results[{i}]"));
            continue;
        };
        let path = |field: &str| format!("results[{i}].{field}");
        results.push(MemberAllocation {
            member_id: identity_field(entry, "id", &path("id"), &mut fallbacks),
            member_name: identity_field(entry, "name", &path("name"), &mut fallbacks),
            percentage: number_field(entry, "percentage", &path("percentage"), &mut fallbacks),
            reasoning: reasoning_field(entry, &path("reasoning"), &mut fallbacks),
            impact_level: impact_field(entry, &path("impact_level"), &mut fallbacks),
        });
    }

    if results.is_empty() {
        return None;
    }
    Some((GroupVerdict { results }, fallbacks))
}

fn validate_single(obj: &Map<String, Value>) -> (SingleVerdict, Vec<String>) {
    let mut fallbacks = Vec::new();
    let raw_score = number_field(obj, "score", "score", &mut fallbacks);
    let score = raw_score.clamp(0.0, 100.0);
    if score != raw_score {
        fallbacks.push("score(clamped)".to_string());
    }
    let verdict = SingleVerdict {
        score,
        reasoning: reasoning_field(obj, "reasoning", &mut fallbacks),
        impact_level: impact_field(obj, "impact_level", &mut fallbacks),
    };
    (verdict, fallbacks)
}

fn number_field(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    fallbacks: &mut Vec<String>,
) -> f64 {
    let parsed = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed.filter(|v| v.is_finite()) {
        Some(v) => v,
        None => {
            fallbacks.push(path.to_string());
            0.0
        }
    }
}

fn identity_field(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    fallbacks: &mut Vec<String>,
) -> String {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            fallbacks.push(path.to_string());
            MISSING_IDENTITY.to_string()
        }
    }
}

fn reasoning_field(obj: &Map<String, Value>, path: &str, fallbacks: &mut Vec<String>) -> String {
    match obj.get("reasoning") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => {
            fallbacks.push(path.to_string());
            MISSING_REASONING.to_string()
        }
    }
}

fn impact_field(obj: &Map<String, Value>, path: &str, fallbacks: &mut Vec<String>) -> ImpactLevel {
    match obj.get("impact_level").and_then(Value::as_str) {
        Some(s) => {
            let level = ImpactLevel::parse_lenient(s);
            if level == ImpactLevel::Unknown {
                fallbacks.push(path.to_string());
            }
            level
        }
        None => {
            fallbacks.push(path.to_string());
            ImpactLevel::Unknown
        }
    }
}
