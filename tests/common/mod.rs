//! Fake channels and judges shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use hybrid_retrieval::{
    channels::RetrievalChannel,
    scoring::{EffectivenessScorer, JudgeRequest, JudgeVerdict, RelevanceJudge},
    ChannelHit, ChannelKind, HybridConfig, Query, Result, RetrievalError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Channel with scripted hits, latency and failure
pub struct FakeChannel {
    kind: ChannelKind,
    hits: Vec<ChannelHit>,
    delay: Duration,
    failure: Option<String>,
    pub calls: AtomicUsize,
    pub completed: AtomicUsize,
}

impl FakeChannel {
    pub fn new(kind: ChannelKind, hits: &[(&str, f64)]) -> Self {
        Self {
            kind,
            hits: hits
                .iter()
                .map(|(id, score)| ChannelHit::new(*id, format!("contents of {}", id), *score))
                .collect(),
            delay: Duration::ZERO,
            failure: None,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RetrievalChannel for FakeChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn retrieve(&self, _query: &Query, _collection: &str, top_k: usize) -> Result<Vec<ChannelHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = &self.failure {
            return Err(RetrievalError::ChannelUnavailable {
                channel: self.kind,
                reason: reason.clone(),
            });
        }
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }
}

/// Judge answering with a fixed verdict, optionally late or broken
pub struct FakeJudge {
    verdict: JudgeVerdict,
    delay: Duration,
    malformed: bool,
    pub calls: AtomicUsize,
}

impl FakeJudge {
    pub fn new(dense: u8, sparse: u8) -> Self {
        Self {
            verdict: JudgeVerdict { dense, sparse },
            delay: Duration::ZERO,
            malformed: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn malformed(mut self) -> Self {
        self.malformed = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelevanceJudge for FakeJudge {
    fn identifier(&self) -> &str {
        "fake-judge"
    }

    async fn evaluate(&self, _request: &JudgeRequest<'_>) -> Result<JudgeVerdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.malformed {
            return Err(RetrievalError::JudgeMalformed("I think the first one".to_string()));
        }
        Ok(self.verdict)
    }
}

pub fn scorer(judge: &Arc<FakeJudge>, config: &HybridConfig) -> EffectivenessScorer {
    let judge: Arc<dyn RelevanceJudge> = judge.clone();
    EffectivenessScorer::from_config(judge, config)
}

/// Defaults with tight timeouts so failure paths finish quickly
pub fn fast_config(request_timeout_ms: u64) -> HybridConfig {
    let mut config = HybridConfig::default();
    config.timeouts.request_timeout_ms = request_timeout_ms;
    config.timeouts.scorer_attempt_timeout_ms = request_timeout_ms;
    config.timeouts.retry_backoff_ms = 5;
    config
}

pub fn query(text: &str) -> Query {
    Query::new(text).unwrap()
}
