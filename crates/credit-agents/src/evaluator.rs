//! Evaluation service: request → brief → conversation → verdict → response.
//!
//! Each call builds its own roster, transcript and state machine. The oracle
//! and the configuration are the only state shared between calls, both behind
//! `Arc` and read-only.

use std::sync::Arc;

use arbitration::{
    EvaluationMode, GroupVerdict, SingleVerdict, SpeakerRole, Transcript, VerdictExtractor,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::Roster;
use crate::api::{
    GroupEvaluationRequest, GroupEvaluationResponse, SingleEvaluationRequest,
    SingleEvaluationResponse,
};
use crate::brief::EvaluationBrief;
use crate::config::CreditConfig;
use crate::errors::EvaluationError;
use crate::oracle::Oracle;
use crate::orchestrator::Orchestrator;
use crate::telemetry::{EvaluationMetrics, MetricsCollector, RunOutcome};

/// A response together with the telemetry of the run that produced it.
#[derive(Debug, Clone)]
pub struct Evaluated<T> {
    pub response: T,
    pub metrics: EvaluationMetrics,
}

#[derive(Clone)]
pub struct EvaluationService {
    oracle: Arc<dyn Oracle>,
    config: Arc<CreditConfig>,
}

impl EvaluationService {
    pub fn new(oracle: Arc<dyn Oracle>, config: Arc<CreditConfig>) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &CreditConfig {
        &self.config
    }

    /// Split 100% of the credit across a team.
    ///
    /// Fails when no arbitrator message carries a valid allocation.
    pub async fn evaluate_group(
        &self,
        request: GroupEvaluationRequest,
    ) -> Result<Evaluated<GroupEvaluationResponse>, EvaluationError> {
        let run_id = Uuid::new_v4().to_string();
        let mut metrics = MetricsCollector::new(&run_id, EvaluationMode::Group);

        let brief = match request.into_brief() {
            Ok(brief) => brief,
            Err(e) => return fail(metrics, e),
        };
        let roster = Roster::group();

        let transcript = match self.converse(&brief, &roster, &mut metrics).await {
            Ok(transcript) => transcript,
            Err(e) => return fail(metrics, e),
        };

        let extracted = match VerdictExtractor::new(EvaluationMode::Group)
            .extract_spoken_by(&transcript, SpeakerRole::Arbitrator)
        {
            Ok(extracted) => extracted,
            Err(failure) => return fail(metrics, failure.into()),
        };
        let mut verdict = match extracted.verdict.into_group() {
            Some(verdict) => verdict,
            None => {
                return fail(
                    metrics,
                    EvaluationError::Internal(anyhow::anyhow!(
                        "group extractor returned a non-group verdict"
                    )),
                )
            }
        };

        self.apply_allocation_policy(&run_id, &brief, &mut verdict);

        let response = GroupEvaluationResponse::new(verdict, transcript.agent_logs());
        Ok(Evaluated {
            response,
            metrics: metrics.finalize(RunOutcome::Verdict),
        })
    }

    /// Score one contribution from 0 to 100.
    ///
    /// A missing verdict degrades to a score of 0 with impact `Error`
    /// instead of failing the request.
    pub async fn evaluate_single(
        &self,
        request: SingleEvaluationRequest,
    ) -> Result<Evaluated<SingleEvaluationResponse>, EvaluationError> {
        let run_id = Uuid::new_v4().to_string();
        let mut metrics = MetricsCollector::new(&run_id, EvaluationMode::Single);

        let user_id = request.user_id.clone();
        let user_name = request.user_name.clone();
        let brief = match request.into_brief() {
            Ok(brief) => brief,
            Err(e) => return fail(metrics, e),
        };
        let Some(category) = brief.claims.first().map(|c| c.category) else {
            return fail(
                metrics,
                EvaluationError::Internal(anyhow::anyhow!("single brief without a claim")),
            );
        };
        let roster = Roster::single(category);

        let transcript = match self.converse(&brief, &roster, &mut metrics).await {
            Ok(transcript) => transcript,
            Err(e) => return fail(metrics, e),
        };

        let extracted = VerdictExtractor::new(EvaluationMode::Single)
            .extract_spoken_by(&transcript, SpeakerRole::Arbitrator)
            .ok()
            .and_then(|e| e.verdict.into_single());

        let (verdict, outcome) = match extracted {
            Some(verdict) => (verdict, RunOutcome::Verdict),
            None => {
                warn!(
                    run_id = %run_id,
                    user_id = %user_id,
                    "No valid score in transcript; returning degraded verdict"
                );
                (
                    SingleVerdict::degraded(
                        "Evaluation failed: the arbitrator did not produce a valid score.",
                    ),
                    RunOutcome::Degraded,
                )
            }
        };

        let response =
            SingleEvaluationResponse::new(user_id, user_name, verdict, transcript.agent_logs());
        Ok(Evaluated {
            response,
            metrics: metrics.finalize(outcome),
        })
    }

    async fn converse(
        &self,
        brief: &EvaluationBrief,
        roster: &Roster,
        metrics: &mut MetricsCollector,
    ) -> Result<Transcript, EvaluationError> {
        let orchestrator = Orchestrator::new(
            self.oracle.as_ref(),
            roster,
            self.config.limits,
            self.config.budget_for(brief.mode),
        );
        let outcome = orchestrator.run(brief, metrics).await?;
        Ok(outcome.transcript)
    }

    /// Zero-sum check, member coverage check, optional normalization.
    fn apply_allocation_policy(
        &self,
        run_id: &str,
        brief: &EvaluationBrief,
        verdict: &mut GroupVerdict,
    ) {
        let check = verdict.check();
        if !check.balanced {
            warn!(
                run_id,
                total = check.total,
                deviation = check.deviation(),
                members = check.members,
                "Group allocation does not sum to 100"
            );
        }

        for claim in &brief.claims {
            if verdict.allocation_for(&claim.member_id).is_none() {
                warn!(run_id, member_id = %claim.member_id, "Member missing from allocation");
            }
        }

        if self.config.normalize_allocations && !check.balanced {
            verdict.normalize();
            info!(
                run_id,
                before = check.total,
                after = verdict.total_percentage(),
                "Group allocation normalized"
            );
        }
    }
}

fn fail<T>(metrics: MetricsCollector, err: EvaluationError) -> Result<T, EvaluationError> {
    warn!(run_id = %metrics.run_id(), kind = err.kind(), error = %err, "Evaluation failed");
    metrics.finalize(RunOutcome::Failed {
        kind: err.kind().to_string(),
    });
    Err(err)
}
