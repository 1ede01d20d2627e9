//! Consensus error types.

use thiserror::Error;

use crate::types::{OpIdKind, Term};
use std::time::Duration;

/// Consensus errors.
///
/// Every variant except `Internal` is recoverable by the caller: re-propose
/// (`Aborted`), retry against the new leader (`NotLeader`), or back off and
/// re-query (`NotReadyToServe`, `OldLeaderMayHaveLease`, `LeaderHasNoLease`,
/// `Throttled`). Nothing in this crate retries internally.
#[derive(Error, Debug)]
pub enum ConsensusError {
    /// Leadership changed between proposal submission and replication.
    #[error("operation submitted in term {bound} cannot be replicated in term {current}")]
    Aborted { bound: Term, current: Term },

    /// This replica is not the leader.
    #[error("not the leader")]
    NotLeader,

    /// Leader has not yet committed a no-op entry in its own term.
    #[error("leader has not yet committed a no-op entry in its own term")]
    NotReadyToServe,

    /// The previous leader's lease has not expired; `remaining` is the exact
    /// duration left, suitable as a caller backoff hint.
    #[error("previous leader's lease might still be active ({remaining:?} remaining)")]
    OldLeaderMayHaveLease { remaining: Duration },

    /// Leader's own lease is not majority-replicated.
    #[error("this leader has not yet acquired a majority-replicated lease")]
    LeaderHasNoLease,

    /// Caller asked for an op id kind the dispatch does not serve.
    #[error("unsupported op id kind {kind:?}")]
    InvalidOpIdKind { kind: OpIdKind },

    /// Terms only move forward.
    #[error("term regression (current {current}, requested {requested})")]
    TermRegression { current: Term, requested: Term },

    /// Too many rounds submitted but not yet completed.
    #[error("too many in-flight rounds ({inflight} at limit {limit})")]
    Throttled { inflight: usize, limit: usize },

    /// The consensus instance has been shut down.
    #[error("consensus has been shut down")]
    Shutdown,

    /// Internal error (bug).
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

/// Consensus result type.
pub type Result<T> = std::result::Result<T, ConsensusError>;
