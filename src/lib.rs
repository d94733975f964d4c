//! hybrid-retrieval - dense + sparse retrieval with dynamic alpha tuning
//!
//! Two retrieval channels (embedding similarity and BM25) run concurrently
//! for every query. An external relevance judge rates each channel's
//! leading hit, the ratings become a per-query mixing weight (alpha), and
//! both lists are normalized and fused into one deterministic ranking.
//!
//! # Architecture
//!
//! - **channels**: `RetrievalChannel` trait, Qdrant and Elasticsearch adapters
//! - **scoring**: judge protocol, Ollama judge, bounded retry, effectiveness
//! - **tuning**: effectiveness to alpha
//! - **merge**: normalization and convex-combination fusion
//! - **strategy**: orchestration state machine, hybrid and dense strategies

pub mod errors;
pub mod types;
pub mod config;

pub mod channels;
pub mod scoring;
pub mod tuning;
pub mod merge;
pub mod strategy;

pub mod cli;

// Re-export commonly used types
pub use config::HybridConfig;
pub use errors::{Result, RetrievalError};
pub use merge::ResultMerger;
pub use strategy::{HybridResponse, HybridRetrievalStrategy, RetrievalService, StrategyKind};
pub use tuning::{AlphaResult, AlphaSource, AlphaTuner};
pub use types::{
    Candidate, ChannelHit, ChannelKind, ChannelStatus, Query, RetrievalMethod, RetrievalResult,
    ScoredCandidateList,
};
