//! Final merged ranking entries

use serde::{Deserialize, Serialize};

use crate::types::ChannelKind;

/// How a result list was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    Dense,
    Sparse,
    Hybrid,
}

impl RetrievalMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMethod::Dense => "dense",
            RetrievalMethod::Sparse => "sparse",
            RetrievalMethod::Hybrid => "hybrid",
        }
    }

    /// Single-channel tag for the channel that carried the request alone
    pub fn single(channel: ChannelKind) -> Self {
        match channel {
            ChannelKind::Dense => RetrievalMethod::Dense,
            ChannelKind::Sparse => RetrievalMethod::Sparse,
        }
    }
}

impl std::fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the merged ranking.
///
/// `combined_score = alpha * dense_score + (1 - alpha) * sparse_score`, where
/// both per-channel scores are normalized into [0, 1] and are exactly 0 when
/// the document was absent from that channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub doc_id: String,
    pub text: String,
    pub combined_score: f64,
    /// Normalized dense contribution (before alpha weighting)
    pub dense_score: f64,
    /// Normalized sparse contribution (before alpha weighting)
    pub sparse_score: f64,
    /// Zero-based position in the dense list, if present there
    pub dense_rank: Option<usize>,
    /// Zero-based position in the sparse list, if present there
    pub sparse_rank: Option<usize>,
    pub alpha: f64,
    pub retrieval_method: RetrievalMethod,
}

impl RetrievalResult {
    /// Present in both channel lists
    pub fn in_both_channels(&self) -> bool {
        self.dense_rank.is_some() && self.sparse_rank.is_some()
    }
}
