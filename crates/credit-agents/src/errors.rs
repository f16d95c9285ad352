//! Error taxonomy for evaluation runs.
//!
//! | Variant             | Surfaced to caller | Notes                                   |
//! |---------------------|--------------------|-----------------------------------------|
//! | `OracleTimeout`     | yes                | no automatic retry                      |
//! | `OracleUnavailable` | yes                | connection, auth, or provider failure   |
//! | `Extraction`        | group mode only    | single mode degrades to a score of 0    |
//! | `InvalidRequest`    | yes                | caller-side problem (empty team, ...)   |
//! | `Configuration`     | yes                | bad settings detected at run time       |
//! | `IllegalTransition` | yes                | conversation invariant breach           |
//!
//! Missing or mistyped verdict fields are not errors: they are patched with
//! defaults by the extractor and only logged.

use std::time::Duration;

use arbitration::{ExtractionFailure, IllegalTransition};
use thiserror::Error;

/// Failure of a single oracle call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// No reply within the configured timeout.
    #[error("oracle did not reply within {}s", .0.as_secs())]
    Timeout(Duration),

    /// Connection, authentication, or provider-side failure.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Oracle timeout after {}s", .0.as_secs())]
    OracleTimeout(Duration),

    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Agents failed to produce a valid verdict: {0}")]
    Extraction(#[from] ExtractionFailure),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Conversation invariant violated: {0}")]
    IllegalTransition(#[from] IllegalTransition),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<OracleError> for EvaluationError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Timeout(d) => Self::OracleTimeout(d),
            OracleError::Unavailable(msg) => Self::OracleUnavailable(msg),
        }
    }
}

impl EvaluationError {
    /// Short machine-readable label for logs and telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OracleTimeout(_) => "oracle_timeout",
            Self::OracleUnavailable(_) => "oracle_unavailable",
            Self::Extraction(_) => "extraction_failure",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Configuration(_) => "configuration",
            Self::IllegalTransition(_) => "illegal_transition",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether re-submitting the same request could plausibly succeed.
    ///
    /// The service itself never retries; this is advice for callers.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::OracleTimeout(_) | Self::OracleUnavailable(_) | Self::Extraction(_)
        )
    }

    /// Whether the caller sent something unusable.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

#[cfg(test)]
mod tests {
    use arbitration::{ConversationState, EvaluationMode};

    use super::*;

    #[test]
    fn oracle_errors_map_to_evaluation_errors() {
        let err: EvaluationError = OracleError::Timeout(Duration::from_secs(600)).into();
        assert!(matches!(err, EvaluationError::OracleTimeout(_)));
        assert_eq!(err.kind(), "oracle_timeout");
        assert!(err.to_string().contains("600s"));

        let err: EvaluationError = OracleError::Unavailable("401".into()).into();
        assert!(matches!(err, EvaluationError::OracleUnavailable(_)));
        assert!(err.is_retriable());
    }

    #[test]
    fn extraction_failure_is_retriable_but_not_client_error() {
        let err: EvaluationError = ExtractionFailure {
            mode: EvaluationMode::Group,
            messages_scanned: 6,
            candidates_rejected: 2,
        }
        .into();
        assert!(err.is_retriable());
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("6 transcript messages"));
    }

    #[test]
    fn invariant_breach_not_retriable() {
        let err: EvaluationError = IllegalTransition {
            from: ConversationState::VerdictFound,
            to: ConversationState::ReviewerTurn,
        }
        .into();
        assert!(!err.is_retriable());
        assert_eq!(err.kind(), "illegal_transition");
    }

    #[test]
    fn invalid_request_is_client_error() {
        let err = EvaluationError::InvalidRequest("no contributors".into());
        assert!(err.is_client_error());
    }
}
