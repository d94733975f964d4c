//! Strategy selection: dense-only or hybrid, chosen by name

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::channels::RetrievalChannel;
use crate::config::HybridConfig;
use crate::errors::{Result, RetrievalError};
use crate::merge::ResultMerger;
use crate::scoring::EffectivenessScorer;
use crate::strategy::hybrid::{run_channel, HybridRetrievalStrategy};
use crate::types::{ChannelKind, Query, RetrievalMethod, RetrievalResult};

/// A ranked retrieval procedure
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn retrieve(
        &self,
        query: &Query,
        collection: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>>;
}

/// Available strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Dense,
    Hybrid,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Dense => "dense",
            StrategyKind::Hybrid => "hybrid",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" => Ok(StrategyKind::Dense),
            "hybrid" => Ok(StrategyKind::Hybrid),
            other => Err(RetrievalError::ConfigError(format!(
                "Unknown retrieval strategy '{}' (expected 'dense' or 'hybrid')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dense channel only; results are tagged `dense` with alpha 1
pub struct DenseOnlyStrategy {
    dense: Arc<dyn RetrievalChannel>,
    merger: ResultMerger,
    config: Arc<HybridConfig>,
}

impl DenseOnlyStrategy {
    pub fn new(dense: Arc<dyn RetrievalChannel>, config: Arc<HybridConfig>) -> Result<Self> {
        config.validate()?;
        if dense.kind() != ChannelKind::Dense {
            return Err(RetrievalError::ConfigError(format!(
                "Dense strategy needs a dense channel, got {}",
                dense.kind()
            )));
        }
        Ok(Self {
            dense,
            merger: ResultMerger::new(),
            config,
        })
    }
}

#[async_trait]
impl RetrievalStrategy for DenseOnlyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Dense
    }

    async fn retrieve(
        &self,
        query: &Query,
        collection: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        if top_k == 0 {
            return Err(RetrievalError::InvalidQuery("top_k must be at least 1".to_string()));
        }

        let request_id = Uuid::new_v4();
        let span = info_span!("dense_retrieve", %request_id, collection, top_k);
        async move {
            let deadline = Instant::now() + self.config.request_timeout();
            let list = run_channel(
                Arc::clone(&self.dense),
                query.clone(),
                collection.to_string(),
                self.config.retrieval.top_k_dense.max(top_k),
                deadline,
            )
            .await;

            if let Some(reason) = list.status.reason() {
                return Err(RetrievalError::RetrievalUnavailable {
                    dense: reason.to_string(),
                    sparse: "not configured".to_string(),
                });
            }

            let results = self
                .merger
                .merge(&list.candidates, &[], 1.0, RetrievalMethod::Dense, top_k);
            info!(results = results.len(), latency_ms = list.latency.as_millis() as u64, "dense retrieval complete");
            Ok(results)
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl RetrievalStrategy for HybridRetrievalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Hybrid
    }

    async fn retrieve(
        &self,
        query: &Query,
        collection: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        HybridRetrievalStrategy::retrieve(self, query, collection, top_k).await
    }
}

/// Front door that owns the selected strategy
#[derive(Clone)]
pub struct RetrievalService {
    strategy: Arc<dyn RetrievalStrategy>,
}

impl RetrievalService {
    /// Build the named strategy from the available collaborators.
    ///
    /// `hybrid` requires a sparse channel.
    pub fn new(
        kind: StrategyKind,
        dense: Arc<dyn RetrievalChannel>,
        sparse: Option<Arc<dyn RetrievalChannel>>,
        scorer: Option<EffectivenessScorer>,
        config: Arc<HybridConfig>,
    ) -> Result<Self> {
        let strategy: Arc<dyn RetrievalStrategy> = match kind {
            StrategyKind::Dense => Arc::new(DenseOnlyStrategy::new(dense, config)?),
            StrategyKind::Hybrid => {
                let sparse = sparse.ok_or_else(|| {
                    RetrievalError::ConfigError(
                        "Hybrid strategy requires a sparse channel".to_string(),
                    )
                })?;
                Arc::new(HybridRetrievalStrategy::new(dense, sparse, scorer, config)?)
            }
        };

        info!(strategy = %kind, "retrieval service ready");
        Ok(Self { strategy })
    }

    /// Same as `new`, selecting the strategy by name
    pub fn from_name(
        name: &str,
        dense: Arc<dyn RetrievalChannel>,
        sparse: Option<Arc<dyn RetrievalChannel>>,
        scorer: Option<EffectivenessScorer>,
        config: Arc<HybridConfig>,
    ) -> Result<Self> {
        Self::new(name.parse()?, dense, sparse, scorer, config)
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub async fn retrieve(
        &self,
        query: &Query,
        collection: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        self.strategy.retrieve(query, collection, top_k).await
    }

    /// Retrieve, abandoning the request when `cancel` fires
    pub async fn retrieve_with_cancel(
        &self,
        query: &Query,
        collection: &str,
        top_k: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<RetrievalResult>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(query = %query, component = "service", strategy = %self.kind(), "retrieval cancelled by caller");
                Err(RetrievalError::Cancelled)
            }
            results = self.retrieve(query, collection, top_k) => results,
        }
    }
}
