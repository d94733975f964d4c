//! Sparse channel: BM25 `match` query against Elasticsearch

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::channels::RetrievalChannel;
use crate::config::SparseConfig;
use crate::errors::{Result, RetrievalError};
use crate::types::{ChannelHit, ChannelKind, Query};

/// Backstop for a hung search call; the request deadline is normally tighter
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Lexical retrieval over an Elasticsearch index
#[derive(Debug, Clone)]
pub struct ElasticsearchChannel {
    client: Client,
    base_url: String,
    text_field: String,
}

impl ElasticsearchChannel {
    pub fn new(base_url: &str, text_field: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .map_err(RetrievalError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            text_field: text_field.to_string(),
        })
    }

    pub fn from_config(config: &SparseConfig) -> Result<Self> {
        Self::new(&config.elasticsearch_url, &config.text_field)
    }

    fn search_body(&self, query: &Query, top_k: usize) -> serde_json::Value {
        let mut matcher = serde_json::Map::new();
        matcher.insert(self.text_field.clone(), json!(query.text()));
        json!({
            "query": { "match": matcher },
            "size": top_k,
        })
    }

    fn parse_hits(&self, response: SearchResponse) -> Vec<ChannelHit> {
        response
            .hits
            .hits
            .into_iter()
            .map(|hit| {
                let text = hit
                    .source
                    .as_ref()
                    .and_then(|source| source.get(&self.text_field))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                ChannelHit {
                    doc_id: hit.id,
                    text,
                    score: hit.score.unwrap_or(0.0),
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: Option<serde_json::Map<String, serde_json::Value>>,
}

#[async_trait]
impl RetrievalChannel for ElasticsearchChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sparse
    }

    async fn retrieve(
        &self,
        query: &Query,
        collection: &str,
        top_k: usize,
    ) -> Result<Vec<ChannelHit>> {
        let url = format!("{}/{}/_search", self.base_url, collection);

        let response = self
            .client
            .post(&url)
            .json(&self.search_body(query, top_k))
            .send()
            .await
            .map_err(|e| {
                RetrievalError::from_channel_http(
                    ChannelKind::Sparse,
                    e,
                    SEARCH_TIMEOUT.as_millis() as u64,
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RetrievalError::ChannelUnavailable {
                channel: ChannelKind::Sparse,
                reason: format!("HTTP {}: {}", status, error_text),
            });
        }

        let body: SearchResponse =
            response
                .json()
                .await
                .map_err(|e| RetrievalError::ChannelUnavailable {
                    channel: ChannelKind::Sparse,
                    reason: format!("Failed to parse search response: {}", e),
                })?;

        Ok(self.parse_hits(body))
    }
}
