//! Retrieval orchestration
//!
//! [`HybridRetrievalStrategy`] runs both channels concurrently, asks the
//! judge how well each one's leader answers the query, turns that into a
//! per-query alpha and fuses the two lists. [`RetrievalService`] picks
//! between it and a dense-only strategy.

pub mod hybrid;
pub mod service;
pub mod state;

pub use hybrid::{ChannelReport, HybridResponse, HybridRetrievalStrategy, RetrievalTrace};
pub use service::{DenseOnlyStrategy, RetrievalService, RetrievalStrategy, StrategyKind};
pub use state::{RetrievalState, StateEvent, StateTrace};
