//! HybridRetrievalStrategy: concurrent dense + sparse dispatch, judge-driven
//! alpha, deterministic fusion

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::channels::RetrievalChannel;
use crate::config::HybridConfig;
use crate::errors::{Result, RetrievalError};
use crate::merge::ResultMerger;
use crate::scoring::{Effectiveness, EffectivenessScorer, UnscoredReason};
use crate::strategy::state::{RetrievalState, StateEvent, StateTrace};
use crate::tuning::{AlphaResult, AlphaTuner};
use crate::types::{
    ChannelKind, ChannelStatus, Query, RetrievalMethod, RetrievalResult, ScoredCandidateList,
};

/// How one channel fared during a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub channel: ChannelKind,
    pub status: ChannelStatus,
    pub candidates: usize,
    pub latency_ms: u64,
}

impl ChannelReport {
    fn from_list(list: &ScoredCandidateList) -> Self {
        Self {
            channel: list.channel,
            status: list.status.clone(),
            candidates: list.candidates.len(),
            latency_ms: list.latency.as_millis() as u64,
        }
    }
}

/// Request-level diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalTrace {
    pub request_id: Uuid,
    pub dense: ChannelReport,
    pub sparse: ChannelReport,
    pub states: Vec<RetrievalState>,
    pub scorer_latency_ms: Option<u64>,
    pub elapsed_ms: u64,
}

/// Ranking plus everything that explains it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridResponse {
    pub results: Vec<RetrievalResult>,
    pub alpha: AlphaResult,
    pub effectiveness: Effectiveness,
    /// Both scored effectiveness values fell below the configured threshold
    pub low_confidence: bool,
    pub method: RetrievalMethod,
    pub trace: RetrievalTrace,
}

/// Run one channel against the request deadline, absorbing its failure into
/// the returned list's status.
pub(crate) async fn run_channel(
    channel: Arc<dyn RetrievalChannel>,
    query: Query,
    collection: String,
    depth: usize,
    deadline: Instant,
) -> ScoredCandidateList {
    let kind = channel.kind();
    let started = Instant::now();

    let outcome = timeout_at(deadline, channel.retrieve(&query, &collection, depth)).await;
    let latency = started.elapsed();

    let status = match outcome {
        Ok(Ok(hits)) => {
            debug!(channel = %kind, hits = hits.len(), latency_ms = latency.as_millis() as u64, "channel returned");
            return ScoredCandidateList::from_hits(kind, hits, latency);
        }
        Ok(Err(error @ RetrievalError::ChannelTimeout { .. })) => ChannelStatus::TimedOut(error.to_string()),
        Ok(Err(error)) => ChannelStatus::Unavailable(error.to_string()),
        Err(_) => ChannelStatus::TimedOut(format!(
            "request deadline reached after {}ms",
            latency.as_millis()
        )),
    };

    warn!(
        query = %query,
        channel = %kind,
        elapsed_ms = latency.as_millis() as u64,
        error = status.reason().unwrap_or_default(),
        "channel failed"
    );
    ScoredCandidateList::failed(kind, status, latency)
}

/// Failure reason of a channel, or why its successful answer was unusable
fn unusable_reason(list: &ScoredCandidateList) -> String {
    match list.status.reason() {
        Some(reason) => reason.to_string(),
        None => "no candidates".to_string(),
    }
}

/// Hybrid orchestrator. Holds only immutable collaborators, so one instance
/// serves any number of concurrent requests.
#[derive(Clone)]
pub struct HybridRetrievalStrategy {
    dense: Arc<dyn RetrievalChannel>,
    sparse: Arc<dyn RetrievalChannel>,
    scorer: Option<EffectivenessScorer>,
    tuner: AlphaTuner,
    merger: ResultMerger,
    config: Arc<HybridConfig>,
}

impl HybridRetrievalStrategy {
    /// Build the orchestrator. Fails with `ConfigError` on an invalid
    /// configuration, swapped channels, or dynamic tuning without a scorer.
    pub fn new(
        dense: Arc<dyn RetrievalChannel>,
        sparse: Arc<dyn RetrievalChannel>,
        scorer: Option<EffectivenessScorer>,
        config: Arc<HybridConfig>,
    ) -> Result<Self> {
        config.validate()?;

        if dense.kind() != ChannelKind::Dense || sparse.kind() != ChannelKind::Sparse {
            return Err(RetrievalError::ConfigError(format!(
                "Expected dense and sparse channels, got {} and {}",
                dense.kind(),
                sparse.kind()
            )));
        }

        if config.retrieval.use_dynamic_tuning && scorer.is_none() {
            return Err(RetrievalError::ConfigError(
                "Dynamic tuning is enabled but no effectiveness scorer was provided".to_string(),
            ));
        }

        Ok(Self {
            dense,
            sparse,
            scorer,
            tuner: AlphaTuner::new(&config),
            merger: ResultMerger::new(),
            config,
        })
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Ranked results only
    pub async fn retrieve(
        &self,
        query: &Query,
        collection: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        Ok(self.retrieve_detailed(query, collection, top_k).await?.results)
    }

    /// Like `retrieve_detailed`, abandoning all outstanding work when `cancel`
    /// fires. Dropping the in-flight request drops its channel task set and
    /// any pending judge call.
    pub async fn retrieve_with_cancel(
        &self,
        query: &Query,
        collection: &str,
        top_k: usize,
        cancel: &CancellationToken,
    ) -> Result<HybridResponse> {
        let started = Instant::now();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(
                    query = %query,
                    component = "orchestrator",
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "retrieval cancelled by caller"
                );
                Err(RetrievalError::Cancelled)
            }
            response = self.retrieve_detailed(query, collection, top_k) => response,
        }
    }

    /// Full retrieval with provenance and diagnostics
    pub async fn retrieve_detailed(
        &self,
        query: &Query,
        collection: &str,
        top_k: usize,
    ) -> Result<HybridResponse> {
        if top_k == 0 {
            return Err(RetrievalError::InvalidQuery("top_k must be at least 1".to_string()));
        }

        let request_id = Uuid::new_v4();
        let span = info_span!("hybrid_retrieve", %request_id, collection, top_k);
        self.run(request_id, query, collection, top_k)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        request_id: Uuid,
        query: &Query,
        collection: &str,
        top_k: usize,
    ) -> Result<HybridResponse> {
        let started = Instant::now();
        let deadline = started + self.config.request_timeout();
        let mut states = StateTrace::new();

        states.advance(StateEvent::Start)?;
        let (dense, sparse) = self.dispatch(query, collection, deadline, &mut states).await?;

        let dense_report = ChannelReport::from_list(&dense);
        let sparse_report = ChannelReport::from_list(&sparse);

        if dense.status.is_success() != sparse.status.is_success() {
            states.advance(StateEvent::ChannelFailure)?;
        }

        // An outage with nothing usable on the other side is never reported
        // as an empty ranking
        let outage = !dense.status.is_success() || !sparse.status.is_success();
        if outage && !dense.is_usable() && !sparse.is_usable() {
            states.advance(StateEvent::AllChannelsFailed)?;
            let dense_reason = unusable_reason(&dense);
            let sparse_reason = unusable_reason(&sparse);
            warn!(
                query = %query,
                component = "orchestrator",
                elapsed_ms = started.elapsed().as_millis() as u64,
                dense = %dense_reason,
                sparse = %sparse_reason,
                "no channel produced usable candidates"
            );
            return Err(RetrievalError::RetrievalUnavailable {
                dense: dense_reason,
                sparse: sparse_reason,
            });
        }

        let surviving = match (dense.is_usable(), sparse.is_usable()) {
            (true, true) => None,
            (true, false) => Some(ChannelKind::Dense),
            (false, true) => Some(ChannelKind::Sparse),
            (false, false) => {
                states.advance(StateEvent::NoCandidates)?;
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "no candidates from any channel");
                return Ok(HybridResponse {
                    results: Vec::new(),
                    alpha: AlphaResult::fallback(self.tuner.default_alpha()),
                    effectiveness: Effectiveness::Unscored(UnscoredReason::Skipped),
                    low_confidence: false,
                    method: RetrievalMethod::Hybrid,
                    trace: RetrievalTrace {
                        request_id,
                        dense: dense_report,
                        sparse: sparse_report,
                        states: states.into_visited(),
                        scorer_latency_ms: None,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    },
                });
            }
        };

        let (alpha, effectiveness, method, scorer_latency_ms) = match surviving {
            Some(kind) => {
                states.advance(StateEvent::SkipScoring)?;
                info!(surviving = %kind, "single usable channel, forcing alpha");
                (
                    AlphaResult::single_channel(kind),
                    Effectiveness::Unscored(UnscoredReason::Skipped),
                    RetrievalMethod::single(kind),
                    None,
                )
            }
            None => {
                let (effectiveness, scorer_latency_ms) =
                    self.score(query, &dense, &sparse, deadline, &mut states).await?;
                let alpha = self.tuner.tune(&effectiveness);
                states.advance(StateEvent::AlphaSelected)?;
                (alpha, effectiveness, RetrievalMethod::Hybrid, scorer_latency_ms)
            }
        };

        let low_confidence = self.is_low_confidence(&effectiveness);
        if low_confidence {
            warn!(
                query = %query,
                component = "scorer",
                threshold = self.config.retrieval.effectiveness_threshold,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "both channels scored below the effectiveness threshold"
            );
        }

        let results = self.merger.merge(
            &dense.candidates,
            &sparse.candidates,
            alpha.alpha,
            method,
            top_k,
        );
        states.advance(StateEvent::Merged)?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            alpha = alpha.alpha,
            alpha_source = ?alpha.source,
            method = %method,
            results = results.len(),
            elapsed_ms,
            "hybrid retrieval complete"
        );

        Ok(HybridResponse {
            results,
            alpha,
            effectiveness,
            low_confidence,
            method,
            trace: RetrievalTrace {
                request_id,
                dense: dense_report,
                sparse: sparse_report,
                states: states.into_visited(),
                scorer_latency_ms,
                elapsed_ms,
            },
        })
    }

    /// Fan both channels out as independent tasks and join them at a barrier.
    /// The task set aborts whatever is still running if this future is dropped.
    async fn dispatch(
        &self,
        query: &Query,
        collection: &str,
        deadline: Instant,
        states: &mut StateTrace,
    ) -> Result<(ScoredCandidateList, ScoredCandidateList)> {
        let started = Instant::now();
        let mut tasks = JoinSet::new();

        for (channel, depth) in [
            (Arc::clone(&self.dense), self.config.retrieval.top_k_dense),
            (Arc::clone(&self.sparse), self.config.retrieval.top_k_sparse),
        ] {
            tasks.spawn(
                run_channel(channel, query.clone(), collection.to_string(), depth, deadline)
                    .in_current_span(),
            );
        }
        states.advance(StateEvent::ChannelsDispatched)?;

        let mut dense = None;
        let mut sparse = None;
        let mut join_failure = String::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(list) => match list.channel {
                    ChannelKind::Dense => dense = Some(list),
                    ChannelKind::Sparse => sparse = Some(list),
                },
                Err(error) => {
                    warn!(
                        query = %query,
                        component = "dispatch",
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %error,
                        "channel task did not complete"
                    );
                    join_failure = format!("channel task failed: {}", error);
                }
            }
        }

        let lost = |kind| {
            ScoredCandidateList::failed(
                kind,
                ChannelStatus::Unavailable(join_failure.clone()),
                started.elapsed(),
            )
        };
        let dense = dense.unwrap_or_else(|| lost(ChannelKind::Dense));
        let sparse = sparse.unwrap_or_else(|| lost(ChannelKind::Sparse));

        Ok((dense, sparse))
    }

    /// Obtain effectiveness for both leading candidates within what is left
    /// of the request deadline.
    async fn score(
        &self,
        query: &Query,
        dense: &ScoredCandidateList,
        sparse: &ScoredCandidateList,
        deadline: Instant,
        states: &mut StateTrace,
    ) -> Result<(Effectiveness, Option<u64>)> {
        let scorer = match self.scorer.as_ref() {
            Some(scorer) if self.config.retrieval.use_dynamic_tuning => scorer,
            _ => {
                states.advance(StateEvent::ScoringDisabled)?;
                return Ok((Effectiveness::Unscored(UnscoredReason::Disabled), None));
            }
        };

        states.advance(StateEvent::BothChannelsReady)?;
        let started = Instant::now();

        let effectiveness = match timeout_at(
            deadline,
            scorer.score(query, dense.top(), sparse.top(), deadline),
        )
        .await
        {
            Ok(effectiveness) => effectiveness,
            Err(_) => {
                warn!(
                    query = %query,
                    component = "scorer",
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "request deadline reached while scoring"
                );
                Effectiveness::Unscored(UnscoredReason::Timeout)
            }
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        if effectiveness.is_scored() {
            states.advance(StateEvent::ScoresReady)?;
        } else {
            states.advance(StateEvent::ScorerFailure)?;
            states.advance(StateEvent::UseFallback)?;
        }

        Ok((effectiveness, Some(latency_ms)))
    }

    fn is_low_confidence(&self, effectiveness: &Effectiveness) -> bool {
        let threshold = self.config.retrieval.effectiveness_threshold;
        matches!(
            effectiveness,
            Effectiveness::Scored { dense, sparse } if *dense < threshold && *sparse < threshold
        )
    }
}
