//! Dense channel: Ollama query embeddings + Qdrant vector search

use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, PointId, SearchPointsBuilder, Value as QdrantValue,
};
use qdrant_client::Qdrant;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::channels::RetrievalChannel;
use crate::config::DenseConfig;
use crate::errors::{Result, RetrievalError};
use crate::types::{ChannelHit, ChannelKind, Query};

/// Payload key holding the chunk text
const TEXT_PAYLOAD_KEY: &str = "document";

/// Backstop for a hung embedding call; the request deadline is normally tighter
const EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns query text into a vector. Embedding generation itself lives outside
/// this crate; this seam lets the dense channel stay backend-agnostic.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embedder backed by Ollama's `/api/embeddings`
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(EMBED_TIMEOUT)
            .build()
            .map_err(RetrievalError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| {
                RetrievalError::from_channel_http(
                    ChannelKind::Dense,
                    e,
                    EMBED_TIMEOUT.as_millis() as u64,
                )
            })?;

        if !response.status().is_success() {
            return Err(RetrievalError::ChannelUnavailable {
                channel: ChannelKind::Dense,
                reason: format!("embedding HTTP {}", response.status()),
            });
        }

        let body: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| RetrievalError::ChannelUnavailable {
                    channel: ChannelKind::Dense,
                    reason: format!("Failed to parse embedding: {}", e),
                })?;

        if body.embedding.is_empty() {
            return Err(RetrievalError::ChannelUnavailable {
                channel: ChannelKind::Dense,
                reason: "empty embedding".to_string(),
            });
        }

        Ok(body.embedding)
    }
}

/// Dense retrieval over a Qdrant collection (cosine similarity)
pub struct QdrantChannel {
    client: Qdrant,
    embedder: Arc<dyn Embedder>,
}

impl QdrantChannel {
    pub fn new(url: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| RetrievalError::ConfigError(format!("Failed to create Qdrant client: {}", e)))?;

        Ok(Self { client, embedder })
    }

    /// Build from configuration, embedding queries through Ollama
    pub fn from_config(config: &DenseConfig) -> Result<Self> {
        let embedder = OllamaEmbedder::new(&config.embedding_url, &config.embedding_model)?;
        Self::new(&config.qdrant_url, Arc::new(embedder))
    }
}

#[async_trait]
impl RetrievalChannel for QdrantChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Dense
    }

    async fn retrieve(
        &self,
        query: &Query,
        collection: &str,
        top_k: usize,
    ) -> Result<Vec<ChannelHit>> {
        let vector = self.embedder.embed(query.text()).await?;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, vector, top_k as u64).with_payload(true),
            )
            .await
            .map_err(|e| RetrievalError::ChannelUnavailable {
                channel: ChannelKind::Dense,
                reason: format!("Failed to search points: {}", e),
            })?;

        let hits = response
            .result
            .into_iter()
            .map(|point| {
                let text = point
                    .payload
                    .get(TEXT_PAYLOAD_KEY)
                    .and_then(qdrant_value_to_string)
                    .unwrap_or_default();

                ChannelHit {
                    doc_id: point_id_to_string(&point.id),
                    text,
                    score: f64::from(point.score),
                }
            })
            .collect();

        Ok(hits)
    }
}

// Helper functions for type conversions
fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    })
}

fn point_id_to_string(point_id: &Option<PointId>) -> String {
    point_id
        .as_ref()
        .and_then(|id| match &id.point_id_options {
            Some(PointIdOptions::Num(n)) => Some(n.to_string()),
            Some(PointIdOptions::Uuid(u)) => Some(u.clone()),
            None => None,
        })
        .unwrap_or_else(|| "unknown".to_string())
}
