//! Effectiveness scoring
//!
//! An external relevance judge rates each channel's leading candidate for
//! the query. The judge is a non-deterministic oracle: its outcome is either
//! a pair of scores in [0, 1] or an explicit `Unscored` marker, never a
//! numeric stand-in for failure.

pub mod judge;
pub mod ollama;
pub mod retry;
pub mod scorer;

pub use judge::{build_evaluation_prompt, parse_verdict, JudgeRequest, JudgeVerdict, RelevanceJudge};
pub use ollama::OllamaJudge;
pub use retry::RetryPolicy;
pub use scorer::{Effectiveness, EffectivenessScorer, UnscoredReason};
