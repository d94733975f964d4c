//! Error types for hybrid retrieval
//!
//! Channel and scorer failures are absorbed by the orchestrator whenever one
//! channel survives; only `RetrievalUnavailable`, `ConfigError`,
//! `InvalidQuery` and `Cancelled` reach callers of a retrieval.

use thiserror::Error;

use crate::types::ChannelKind;

/// Main error type for the retrieval engine
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Backend refused, errored, or returned an unusable payload
    #[error("{channel} channel unavailable: {reason}")]
    ChannelUnavailable { channel: ChannelKind, reason: String },

    /// Backend did not answer before the request deadline
    #[error("{channel} channel timed out after {duration_ms}ms")]
    ChannelTimeout { channel: ChannelKind, duration_ms: u64 },

    /// Judge could not be reached or returned an error status
    #[error("Effectiveness scorer unavailable: {0}")]
    ScorerUnavailable(String),

    /// Judge did not answer within its attempt budget
    #[error("Effectiveness scorer timed out after {duration_ms}ms")]
    ScorerTimeout { duration_ms: u64 },

    /// Judge answered, but not with two integers
    #[error("Malformed judge response: {0}")]
    JudgeMalformed(String),

    /// Both channels failed; nothing can be ranked
    #[error("Retrieval unavailable (dense: {dense}; sparse: {sparse})")]
    RetrievalUnavailable { dense: String, sparse: String },

    /// Configuration errors, detected at construction time
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Rejected caller input
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Orchestration state machine misuse
    #[error("Invalid state transition from {from} via {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// The enclosing request was cancelled by the caller
    #[error("Retrieval cancelled")]
    Cancelled,

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

}

/// Result type alias for retrieval operations
pub type Result<T> = std::result::Result<T, RetrievalError>;

impl RetrievalError {
    /// Map a transport error from a channel backend onto the channel taxonomy
    pub fn from_channel_http(channel: ChannelKind, err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            RetrievalError::ChannelTimeout {
                channel,
                duration_ms: timeout_ms,
            }
        } else {
            RetrievalError::ChannelUnavailable {
                channel,
                reason: err.to_string(),
            }
        }
    }

    /// True for failures the caller may observe as a recoverable channel outage
    pub fn is_channel_failure(&self) -> bool {
        matches!(
            self,
            RetrievalError::ChannelUnavailable { .. } | RetrievalError::ChannelTimeout { .. }
        )
    }

    /// True for failures that originate in the effectiveness judge
    pub fn is_scorer_failure(&self) -> bool {
        matches!(
            self,
            RetrievalError::ScorerUnavailable(_)
                | RetrievalError::ScorerTimeout { .. }
                | RetrievalError::JudgeMalformed(_)
        )
    }
}
