//! Channel-side entities: raw hits, tagged candidates and per-channel lists

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which backend produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Embedding / vector similarity
    Dense,
    /// Lexical / term overlap (BM25)
    Sparse,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Dense => "dense",
            ChannelKind::Sparse => "sparse",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked hit as returned by a backend adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelHit {
    pub doc_id: String,
    pub text: String,
    pub score: f64,
}

impl ChannelHit {
    pub fn new(doc_id: impl Into<String>, text: impl Into<String>, score: f64) -> Self {
        Self {
            doc_id: doc_id.into(),
            text: text.into(),
            score,
        }
    }
}

/// A hit tagged with the channel that produced it.
///
/// `raw_score` is on the backend's own scale (cosine similarity, BM25, ...)
/// and is not comparable across channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub doc_id: String,
    pub text: String,
    pub raw_score: f64,
    pub channel: ChannelKind,
}

impl Candidate {
    pub fn from_hit(hit: ChannelHit, channel: ChannelKind) -> Self {
        Self {
            doc_id: hit.doc_id,
            text: hit.text,
            raw_score: hit.score,
            channel,
        }
    }
}

/// Outcome of one channel dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ChannelStatus {
    Succeeded,
    TimedOut(String),
    Unavailable(String),
}

impl ChannelStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ChannelStatus::Succeeded)
    }

    /// Failure description, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            ChannelStatus::Succeeded => None,
            ChannelStatus::TimedOut(reason) | ChannelStatus::Unavailable(reason) => Some(reason),
        }
    }
}

/// Ordered candidates from one channel plus how the dispatch went
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidateList {
    pub channel: ChannelKind,
    pub candidates: Vec<Candidate>,
    pub latency: Duration,
    pub status: ChannelStatus,
}

impl ScoredCandidateList {
    pub fn succeeded(channel: ChannelKind, candidates: Vec<Candidate>, latency: Duration) -> Self {
        Self {
            channel,
            candidates,
            latency,
            status: ChannelStatus::Succeeded,
        }
    }

    pub fn failed(channel: ChannelKind, status: ChannelStatus, latency: Duration) -> Self {
        Self {
            channel,
            candidates: Vec::new(),
            latency,
            status,
        }
    }

    /// Channel answered with at least one candidate
    pub fn is_usable(&self) -> bool {
        self.status.is_success() && !self.candidates.is_empty()
    }

    /// Leading candidate, judged by the effectiveness scorer
    pub fn top(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Build a list from raw hits in backend order. Hits without a finite
    /// score cannot be ranked and are dropped here, so `is_usable` and `top`
    /// only ever see rankable candidates.
    pub fn from_hits(channel: ChannelKind, hits: Vec<ChannelHit>, latency: Duration) -> Self {
        let candidates = hits
            .into_iter()
            .filter(|hit| hit.score.is_finite())
            .map(|hit| Candidate::from_hit(hit, channel))
            .collect();
        Self::succeeded(channel, candidates, latency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_kind_display() {
        assert_eq!(ChannelKind::Dense.to_string(), "dense");
        assert_eq!(ChannelKind::Sparse.to_string(), "sparse");
    }

    #[test]
    fn test_from_hits_preserves_order_and_tags() {
        let list = ScoredCandidateList::from_hits(
            ChannelKind::Sparse,
            vec![ChannelHit::new("b", "beta", 7.5), ChannelHit::new("a", "alpha", 3.1)],
            Duration::from_millis(12),
        );
        assert!(list.is_usable());
        assert_eq!(list.top().unwrap().doc_id, "b");
        assert!(list.candidates.iter().all(|c| c.channel == ChannelKind::Sparse));
    }

    #[test]
    fn test_non_finite_hits_are_dropped() {
        let list = ScoredCandidateList::from_hits(
            ChannelKind::Dense,
            vec![
                ChannelHit::new("nan", "x", f64::NAN),
                ChannelHit::new("inf", "y", f64::INFINITY),
                ChannelHit::new("ok", "z", 0.4),
            ],
            Duration::ZERO,
        );
        assert_eq!(list.candidates.len(), 1);
        assert_eq!(list.top().unwrap().doc_id, "ok");

        let all_bad = ScoredCandidateList::from_hits(
            ChannelKind::Dense,
            vec![ChannelHit::new("nan", "x", f64::NAN)],
            Duration::ZERO,
        );
        assert!(all_bad.status.is_success());
        assert!(!all_bad.is_usable());
    }

    #[test]
    fn test_failed_list_is_not_usable() {
        let list = ScoredCandidateList::failed(
            ChannelKind::Dense,
            ChannelStatus::TimedOut("deadline".to_string()),
            Duration::from_millis(100),
        );
        assert!(!list.is_usable());
        assert_eq!(list.status.reason(), Some("deadline"));
    }

    #[test]
    fn test_empty_success_is_not_usable() {
        let list = ScoredCandidateList::succeeded(ChannelKind::Dense, Vec::new(), Duration::ZERO);
        assert!(list.status.is_success());
        assert!(!list.is_usable());
    }
}
