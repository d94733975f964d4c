//! ResultMerger: normalize both channel lists and combine them under alpha
//!
//! Scores are normalized per channel by dividing by the channel's range
//! anchored at zero: `lo = min(0, min_raw)`, `norm = (raw - lo) / (max - lo)`.
//! For non-negative backends (cosine similarity, BM25) this is plain max
//! normalization, so a channel's scores keep their relative spacing and the
//! leader always lands on 1.0. A channel whose scores are all equal
//! normalizes every candidate to 1.0.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::types::{Candidate, ChannelKind, RetrievalMethod, RetrievalResult};

/// One channel's candidates after dedup and normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCandidate {
    pub doc_id: String,
    pub text: String,
    pub score: f64,
    pub rank: usize,
}

/// Normalize one channel list into [0, 1].
///
/// Non-finite raw scores are dropped. A document listed twice keeps its
/// first (best ranked) entry. Ranks are positions in the cleaned list.
pub fn normalize(channel: ChannelKind, candidates: &[Candidate]) -> Vec<NormalizedCandidate> {
    let mut seen = std::collections::HashSet::new();
    let mut kept: Vec<&Candidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if !candidate.raw_score.is_finite() {
            warn!(
                channel = %channel,
                doc_id = %candidate.doc_id,
                "dropping candidate with non-finite score"
            );
            continue;
        }
        if !seen.insert(candidate.doc_id.as_str()) {
            debug!(channel = %channel, doc_id = %candidate.doc_id, "duplicate candidate ignored");
            continue;
        }
        kept.push(candidate);
    }

    let Some(max) = kept.iter().map(|c| c.raw_score).reduce(f64::max) else {
        return Vec::new();
    };
    let min = kept.iter().map(|c| c.raw_score).fold(max, f64::min);
    let lo = min.min(0.0);
    let span = max - lo;

    kept.into_iter()
        .enumerate()
        .map(|(rank, candidate)| {
            let score = if span > 0.0 {
                ((candidate.raw_score - lo) / span).clamp(0.0, 1.0)
            } else {
                1.0
            };
            NormalizedCandidate {
                doc_id: candidate.doc_id.clone(),
                text: candidate.text.clone(),
                score,
                rank,
            }
        })
        .collect()
}

#[derive(Default)]
struct Fused {
    text: String,
    dense_score: f64,
    sparse_score: f64,
    dense_rank: Option<usize>,
    sparse_rank: Option<usize>,
}

/// Deterministic convex-combination fusion of two channel lists
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultMerger;

impl ResultMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge both channel lists into one ranking of at most `top_k` entries.
    ///
    /// Every document present in either list is scored as
    /// `alpha * dense + (1 - alpha) * sparse`, with an explicit zero for the
    /// channel it is missing from. Ordering is total: combined score
    /// descending, then dense rank, sparse rank, and doc id.
    pub fn merge(
        &self,
        dense: &[Candidate],
        sparse: &[Candidate],
        alpha: f64,
        method: RetrievalMethod,
        top_k: usize,
    ) -> Vec<RetrievalResult> {
        let alpha = alpha.clamp(0.0, 1.0);
        let mut fused: HashMap<String, Fused> = HashMap::new();

        for entry in normalize(ChannelKind::Dense, dense) {
            let slot = fused.entry(entry.doc_id).or_default();
            slot.text = entry.text;
            slot.dense_score = entry.score;
            slot.dense_rank = Some(entry.rank);
        }

        for entry in normalize(ChannelKind::Sparse, sparse) {
            let slot = fused.entry(entry.doc_id).or_default();
            if slot.dense_rank.is_none() {
                slot.text = entry.text;
            }
            slot.sparse_score = entry.score;
            slot.sparse_rank = Some(entry.rank);
        }

        let mut results: Vec<RetrievalResult> = fused
            .into_iter()
            .map(|(doc_id, f)| RetrievalResult {
                doc_id,
                text: f.text,
                combined_score: alpha * f.dense_score + (1.0 - alpha) * f.sparse_score,
                dense_score: f.dense_score,
                sparse_score: f.sparse_score,
                dense_rank: f.dense_rank,
                sparse_rank: f.sparse_rank,
                alpha,
                retrieval_method: method,
            })
            .collect();

        results.sort_by(compare_results);
        results.truncate(top_k);

        debug!(
            alpha,
            method = %method,
            merged = results.len(),
            "merged channel results"
        );

        results
    }
}

fn compare_results(a: &RetrievalResult, b: &RetrievalResult) -> Ordering {
    b.combined_score
        .total_cmp(&a.combined_score)
        .then_with(|| rank_order(a.dense_rank, b.dense_rank))
        .then_with(|| rank_order(a.sparse_rank, b.sparse_rank))
        .then_with(|| a.doc_id.cmp(&b.doc_id))
}

/// Present ranks sort ahead of absent ones
fn rank_order(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
