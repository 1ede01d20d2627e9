//! Leader readiness: the ordered ladder of preconditions a freshly elected
//! leader must clear before it may serve consistent reads and writes.
//!
//! The rungs, in order:
//! 1. Hold leadership at all (role check).
//! 2. Commit a no-op entry in the leader's own term, proving it knows the
//!    true commit index.
//! 3. Outwait the previous leader's lease, so two leaders never serve
//!    within overlapping lease windows.
//! 4. Replicate this leader's own lease to a majority, enabling lease-based
//!    fast-path reads.
//!
//! A [`LeaderState`] is a point-in-time snapshot; callers re-query after a
//! backoff rather than waiting on it.

use crate::error::{ConsensusError, Result};
use crate::types::Term;
use std::time::Duration;

/// Readiness ladder, in ascending order.
///
/// The derived `Ord` follows declaration order: `NotLeader` is the lowest
/// rung, `LeaderAndReady` the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LeaderStatus {
    NotLeader,
    LeaderButNoOpNotCommitted,
    LeaderButOldLeaderMayHaveLease,
    LeaderButNoMajorityReplicatedLease,
    LeaderAndReady,
}

impl LeaderStatus {
    /// True for every rung where leadership is at least nominal.
    pub fn is_leader(self) -> bool {
        self != LeaderStatus::NotLeader
    }
}

/// Point-in-time leadership snapshot, recomputed on every query.
///
/// `term` is meaningful only when `status == LeaderAndReady`; every other
/// status carries `Term::UNKNOWN` ("not applicable", never "wrong term").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderState {
    pub status: LeaderStatus,
    pub term: Term,
    pub remaining_old_leader_lease: Duration,
}

impl LeaderState {
    /// Snapshot for a rung below `LeaderAndReady`.
    pub fn not_ready(status: LeaderStatus) -> Self {
        debug_assert!(status != LeaderStatus::LeaderAndReady);
        Self {
            status,
            term: Term::UNKNOWN,
            remaining_old_leader_lease: Duration::ZERO,
        }
    }

    /// Snapshot for a leader that cleared every rung.
    pub fn ready(term: Term) -> Self {
        Self {
            status: LeaderStatus::LeaderAndReady,
            term,
            remaining_old_leader_lease: Duration::ZERO,
        }
    }

    /// Map this snapshot to an operation outcome.
    ///
    /// `LeaderAndReady` is success; every other rung maps to its error kind,
    /// with the old-lease rung embedding the exact remaining duration for
    /// caller backoff timing. The match is exhaustive: a new rung will not
    /// compile until it is mapped here.
    pub fn create_status(&self) -> Result<()> {
        match self.status {
            LeaderStatus::NotLeader => Err(ConsensusError::NotLeader),

            LeaderStatus::LeaderButNoOpNotCommitted => Err(ConsensusError::NotReadyToServe),

            LeaderStatus::LeaderButOldLeaderMayHaveLease => {
                Err(ConsensusError::OldLeaderMayHaveLease {
                    remaining: self.remaining_old_leader_lease,
                })
            }

            LeaderStatus::LeaderButNoMajorityReplicatedLease => {
                Err(ConsensusError::LeaderHasNoLease)
            }

            LeaderStatus::LeaderAndReady => Ok(()),
        }
    }
}
