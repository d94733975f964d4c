//! EffectivenessScorer: rates each channel's leading candidate via the judge

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::HybridConfig;
use crate::errors::RetrievalError;
use crate::scoring::judge::{JudgeRequest, RelevanceJudge};
use crate::scoring::retry::RetryPolicy;
use crate::types::{Candidate, Query};

/// Why no effectiveness values are available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum UnscoredReason {
    /// Dynamic tuning is switched off
    Disabled,
    /// Scoring was not attempted (single surviving channel)
    Skipped,
    /// The judge missed its attempt budget or the request deadline
    Timeout,
    /// The judge could not be reached
    Unavailable(String),
    /// The judge answered without a usable verdict
    Malformed(String),
}

/// Tagged outcome of a scoring call. `Unscored` is distinct from a zero
/// score and must never be collapsed into one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Effectiveness {
    Scored { dense: f64, sparse: f64 },
    Unscored(UnscoredReason),
}

impl Effectiveness {
    pub fn is_scored(&self) -> bool {
        matches!(self, Effectiveness::Scored { .. })
    }

    /// Map a terminal judge error onto the unscored reason it implies
    pub fn from_error(error: &RetrievalError) -> Self {
        let reason = match error {
            RetrievalError::ScorerTimeout { .. } => UnscoredReason::Timeout,
            RetrievalError::JudgeMalformed(detail) => UnscoredReason::Malformed(detail.clone()),
            other => UnscoredReason::Unavailable(other.to_string()),
        };
        Effectiveness::Unscored(reason)
    }
}

/// Invokes the external judge with a bounded retry
#[derive(Clone)]
pub struct EffectivenessScorer {
    judge: Arc<dyn RelevanceJudge>,
    retry: RetryPolicy,
}

impl EffectivenessScorer {
    pub fn new(judge: Arc<dyn RelevanceJudge>, retry: RetryPolicy) -> Self {
        Self { judge, retry }
    }

    pub fn from_config(judge: Arc<dyn RelevanceJudge>, config: &HybridConfig) -> Self {
        Self::new(judge, RetryPolicy::from_config(config))
    }

    pub fn judge_identifier(&self) -> &str {
        self.judge.identifier()
    }

    /// Score both leading candidates. Never fails: judge failure, timeout or
    /// a malformed answer all come back as `Unscored`.
    pub async fn score(
        &self,
        query: &Query,
        dense_top: Option<&Candidate>,
        sparse_top: Option<&Candidate>,
        deadline: Instant,
    ) -> Effectiveness {
        let started = Instant::now();
        let request = JudgeRequest {
            query,
            dense_snippet: dense_top.map(|c| c.text.as_str()),
            sparse_snippet: sparse_top.map(|c| c.text.as_str()),
        };

        match self
            .retry
            .execute(deadline, || self.judge.evaluate(&request))
            .await
        {
            Ok(verdict) => {
                let (dense, sparse) = verdict.normalized();
                debug!(
                    judge = self.judge.identifier(),
                    dense_raw = verdict.dense,
                    sparse_raw = verdict.sparse,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "effectiveness scored"
                );
                Effectiveness::Scored { dense, sparse }
            }
            Err(error) => {
                warn!(
                    query = %query,
                    component = "scorer",
                    judge = self.judge.identifier(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "effectiveness scoring failed, continuing unscored"
                );
                Effectiveness::from_error(&error)
            }
        }
    }
}
