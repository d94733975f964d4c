//! Type definitions module
//!
//! Request-scoped entities shared by channels, scorer, tuner and merger.
//! Nothing here outlives a single retrieval call.

pub mod candidate;
pub mod query;
pub mod result;

// Re-export commonly used types
pub use candidate::{Candidate, ChannelHit, ChannelKind, ChannelStatus, ScoredCandidateList};
pub use query::Query;
pub use result::{RetrievalMethod, RetrievalResult};
