//! Verdict shapes produced by the arbitrator, plus the zero-sum check.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tolerance used when checking that group percentages sum to 100.
pub const ALLOCATION_EPSILON: f64 = 0.01;

/// Which verdict shape a run is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Whole team; percentages summing to 100.
    Group,
    /// One contributor; a single 0–100 score.
    Single,
}

impl EvaluationMode {
    /// Key that must appear inside a candidate payload for this mode.
    pub fn marker_field(self) -> &'static str {
        match self {
            Self::Group => "results",
            Self::Single => "score",
        }
    }
}

impl fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => write!(f, "group"),
            Self::Single => write!(f, "single"),
        }
    }
}

/// How decisive a contribution was.
///
/// `Unknown` covers a missing or unrecognised value; `Error` marks a degraded
/// verdict produced when no payload could be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
    Error,
}

impl ImpactLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
            Self::Unknown => "Unknown",
            Self::Error => "Error",
        }
    }

    /// Lenient parse used on oracle output. Never fails.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImpactLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            "unknown" => Ok(Self::Unknown),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown impact level: {other}")),
        }
    }
}

impl Serialize for ImpactLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ImpactLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw))
    }
}

/// Verdict for a single contributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleVerdict {
    /// Clamped to `[0, 100]`.
    pub score: f64,
    pub reasoning: String,
    pub impact_level: ImpactLevel,
}

impl SingleVerdict {
    /// Stand-in returned when the arbitrator never produced a usable payload.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            reasoning: reason.into(),
            impact_level: ImpactLevel::Error,
        }
    }
}

/// One member's share of the group allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAllocation {
    #[serde(rename = "id")]
    pub member_id: String,
    #[serde(rename = "name")]
    pub member_name: String,
    pub percentage: f64,
    pub reasoning: String,
    pub impact_level: ImpactLevel,
}

/// Ordered allocation across every member of the group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupVerdict {
    pub results: Vec<MemberAllocation>,
}

impl GroupVerdict {
    pub fn total_percentage(&self) -> f64 {
        self.results.iter().map(|r| r.percentage).sum()
    }

    pub fn check(&self) -> AllocationCheck {
        AllocationCheck::of(self)
    }

    /// Rescale percentages so they sum to 100.
    ///
    /// An all-zero (or negative-sum) allocation is split equally.
    pub fn normalize(&mut self) {
        if self.results.is_empty() {
            return;
        }
        let total = self.total_percentage();
        if total > 0.0 {
            for r in &mut self.results {
                r.percentage = r.percentage * 100.0 / total;
            }
        } else {
            let share = 100.0 / self.results.len() as f64;
            for r in &mut self.results {
                r.percentage = share;
            }
        }
    }

    pub fn allocation_for(&self, member_id: &str) -> Option<&MemberAllocation> {
        self.results.iter().find(|r| r.member_id == member_id)
    }
}

/// Either verdict shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Verdict {
    Group(GroupVerdict),
    Single(SingleVerdict),
}

impl Verdict {
    pub fn into_group(self) -> Option<GroupVerdict> {
        match self {
            Self::Group(g) => Some(g),
            Self::Single(_) => None,
        }
    }

    pub fn into_single(self) -> Option<SingleVerdict> {
        match self {
            Self::Single(s) => Some(s),
            Self::Group(_) => None,
        }
    }
}

/// Result of checking the zero-sum policy on a group verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationCheck {
    pub total: f64,
    pub members: usize,
    pub balanced: bool,
}

impl AllocationCheck {
    pub fn of(verdict: &GroupVerdict) -> Self {
        let total = verdict.total_percentage();
        Self {
            total,
            members: verdict.results.len(),
            balanced: (total - 100.0).abs() <= ALLOCATION_EPSILON,
        }
    }

    pub fn deviation(&self) -> f64 {
        self.total - 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(id: &str, pct: f64) -> MemberAllocation {
        MemberAllocation {
            member_id: id.into(),
            member_name: id.to_uppercase(),
            percentage: pct,
            reasoning: String::new(),
            impact_level: ImpactLevel::Medium,
        }
    }

    #[test]
    fn impact_level_parse_lenient() {
        assert_eq!(ImpactLevel::parse_lenient("critical"), ImpactLevel::Critical);
        assert_eq!(ImpactLevel::parse_lenient(" High "), ImpactLevel::High);
        assert_eq!(ImpactLevel::parse_lenient("enormous"), ImpactLevel::Unknown);
    }

    #[test]
    fn impact_level_serializes_capitalized() {
        let json = serde_json::to_string(&ImpactLevel::Critical).unwrap();
        assert_eq!(json, "\"Critical\"");
        let parsed: ImpactLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, ImpactLevel::Medium);
    }

    #[test]
    fn balanced_allocation_detected() {
        let v = GroupVerdict {
            results: vec![alloc("a", 60.0), alloc("b", 40.0)],
        };
        let check = v.check();
        assert!(check.balanced);
        assert_eq!(check.members, 2);
    }

    #[test]
    fn unbalanced_allocation_reported() {
        let v = GroupVerdict {
            results: vec![alloc("a", 70.0), alloc("b", 50.0)],
        };
        let check = v.check();
        assert!(!check.balanced);
        assert!((check.deviation() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_rescales_to_hundred() {
        let mut v = GroupVerdict {
            results: vec![alloc("a", 90.0), alloc("b", 30.0)],
        };
        v.normalize();
        assert!((v.results[0].percentage - 75.0).abs() < 1e-9);
        assert!((v.results[1].percentage - 25.0).abs() < 1e-9);
        assert!(v.check().balanced);
    }

    #[test]
    fn normalize_splits_all_zero_equally() {
        let mut v = GroupVerdict {
            results: vec![alloc("a", 0.0), alloc("b", 0.0), alloc("c", 0.0), alloc("d", 0.0)],
        };
        v.normalize();
        assert!(v.results.iter().all(|r| (r.percentage - 25.0).abs() < 1e-9));
    }

    #[test]
    fn member_allocation_uses_wire_names() {
        let json = serde_json::to_value(alloc("u7", 12.5)).unwrap();
        assert_eq!(json["id"], "u7");
        assert_eq!(json["name"], "U7");
        assert_eq!(json["impact_level"], "Medium");
    }

    #[test]
    fn degraded_single_verdict() {
        let v = SingleVerdict::degraded("no payload");
        assert_eq!(v.score, 0.0);
        assert_eq!(v.impact_level, ImpactLevel::Error);
    }
}
