//! Retrieval channels
//!
//! A channel is one ranked-candidate backend behind a uniform capability.
//! Dense and sparse backends are interchangeable implementations of
//! [`RetrievalChannel`]; the orchestrator holds them as trait objects and
//! never depends on a concrete backend.
//!
//! Channels do not enforce the request deadline themselves. The caller
//! races them against it and drops the future when it expires, so every
//! implementation must be cancel-safe and callable concurrently with its
//! sibling.

pub mod dense;
pub mod sparse;

use async_trait::async_trait;

use crate::errors::Result;
use crate::types::{ChannelHit, ChannelKind, Query};

pub use dense::{Embedder, OllamaEmbedder, QdrantChannel};
pub use sparse::ElasticsearchChannel;

/// Ranked-candidate retrieval against one backend
#[async_trait]
pub trait RetrievalChannel: Send + Sync {
    /// Which side of the hybrid this channel feeds
    fn kind(&self) -> ChannelKind;

    /// Return up to `top_k` hits, best first.
    ///
    /// Fails with `ChannelTimeout` or `ChannelUnavailable`.
    async fn retrieve(&self, query: &Query, collection: &str, top_k: usize)
        -> Result<Vec<ChannelHit>>;
}
