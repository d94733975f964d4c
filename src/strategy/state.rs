//! Orchestration state machine for one hybrid retrieval
//!
//! Deterministic transitions; every run ends in `Done` unless no channel
//! yields usable candidates while at least one is down (`Unavailable`).
//! `ChannelFailed` and `ScorerFailed` are waypoints, not terminals.
//! Caller cancellation drops the run instead of transitioning it.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, RetrievalError};

/// Orchestration states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetrievalState {
    /// Request accepted, nothing dispatched yet
    Idle,

    /// Spawning both channel tasks
    Dispatching,

    /// Waiting at the channel barrier
    AwaitingChannels,

    /// Exactly one channel failed; the other carries the request
    ChannelFailed,

    /// Judge call outstanding
    Scoring,

    /// Judge failed or timed out; fallback alpha will be used
    ScorerFailed,

    /// Computing alpha
    Tuning,

    /// Normalizing and fusing
    Merging,

    /// Ranking produced (terminal)
    Done,

    /// No usable channel and at least one outage (terminal)
    Unavailable,
}

/// Events that drive the orchestration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    /// Retrieval requested
    Start,

    /// Channel tasks spawned
    ChannelsDispatched,

    /// Both channels returned candidates
    BothChannelsReady,

    /// One channel failed or timed out
    ChannelFailure,

    /// Outage with no usable candidates on the other side
    AllChannelsFailed,

    /// Only one channel has candidates; scoring is pointless
    SkipScoring,

    /// Dynamic tuning is off; go straight to the default alpha
    ScoringDisabled,

    /// Judge produced both effectiveness values
    ScoresReady,

    /// Judge failed, timed out or answered unusably
    ScorerFailure,

    /// Proceed from a scorer failure with the fallback alpha
    UseFallback,

    /// Alpha selected
    AlphaSelected,

    /// Ranking produced
    Merged,

    /// Channels succeeded without any candidates
    NoCandidates,
}

impl RetrievalState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetrievalState::Done | RetrievalState::Unavailable
        )
    }

    /// Attempt a transition.
    ///
    /// Valid transitions:
    /// 1.  Idle             → Dispatching      (Start)
    /// 2.  Dispatching      → AwaitingChannels (ChannelsDispatched)
    /// 3.  AwaitingChannels → Scoring          (BothChannelsReady)
    /// 4.  AwaitingChannels → ChannelFailed    (ChannelFailure)
    /// 5.  AwaitingChannels → Unavailable      (AllChannelsFailed)
    /// 6.  AwaitingChannels → Merging          (SkipScoring)
    /// 7.  AwaitingChannels → Tuning           (ScoringDisabled)
    /// 8.  AwaitingChannels → Done             (NoCandidates)
    /// 9.  ChannelFailed    → Merging          (SkipScoring)
    /// 10. ChannelFailed    → Unavailable      (AllChannelsFailed)
    /// 11. Scoring          → Tuning           (ScoresReady)
    /// 12. Scoring          → ScorerFailed     (ScorerFailure)
    /// 13. ScorerFailed     → Tuning           (UseFallback)
    /// 14. Tuning           → Merging          (AlphaSelected)
    /// 15. Merging          → Done             (Merged)
    pub fn transition(&self, event: StateEvent) -> Result<RetrievalState> {
        use RetrievalState::*;
        use StateEvent::*;

        let next = match (self, event) {
            (Idle, Start) => Dispatching,
            (Dispatching, ChannelsDispatched) => AwaitingChannels,

            (AwaitingChannels, BothChannelsReady) => Scoring,
            (AwaitingChannels, ChannelFailure) => ChannelFailed,
            (AwaitingChannels, AllChannelsFailed) => Unavailable,
            (AwaitingChannels, SkipScoring) => Merging,
            (AwaitingChannels, ScoringDisabled) => Tuning,
            (AwaitingChannels, NoCandidates) => Done,

            (ChannelFailed, SkipScoring) => Merging,
            (ChannelFailed, AllChannelsFailed) => Unavailable,

            (Scoring, ScoresReady) => Tuning,
            (Scoring, ScorerFailure) => ScorerFailed,
            (ScorerFailed, UseFallback) => Tuning,

            (Tuning, AlphaSelected) => Merging,
            (Merging, Merged) => Done,

            (from, event) => {
                return Err(RetrievalError::InvalidTransition {
                    from: format!("{:?}", from),
                    to: format!("(via {:?})", event),
                    reason: format!("No valid transition from {:?} on {:?}", from, event),
                });
            }
        };

        Ok(next)
    }
}

/// Current state plus the path that led to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTrace {
    current: RetrievalState,
    visited: Vec<RetrievalState>,
}

impl StateTrace {
    pub fn new() -> Self {
        Self {
            current: RetrievalState::Idle,
            visited: vec![RetrievalState::Idle],
        }
    }

    pub fn current(&self) -> RetrievalState {
        self.current
    }

    pub fn advance(&mut self, event: StateEvent) -> Result<RetrievalState> {
        let next = self.current.transition(event)?;
        tracing::trace!(from = ?self.current, to = ?next, ?event, "state transition");
        self.current = next;
        self.visited.push(next);
        Ok(next)
    }

    pub fn visited(&self) -> &[RetrievalState] {
        &self.visited
    }

    pub fn into_visited(self) -> Vec<RetrievalState> {
        self.visited
    }
}

impl Default for StateTrace {
    fn default() -> Self {
        Self::new()
    }
}
