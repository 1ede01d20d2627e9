//! Replica-local consensus state: the input surface the election and
//! replication-tracking collaborators drive, and the ladder queries read.
//!
//! # State layout
//!
//! Truth lives under one `RwLock`:
//! - `term`: latest leadership term this replica recognizes
//! - `role`: Follower, Candidate, or Leader (set by the election machinery)
//! - `noop_committed_term`: term whose no-op entry has been committed, if any
//! - `old_leader_lease_expiry`: when the previous leader's lease runs out
//! - `leader_lease_expiry`: while in the future, this leader's own lease is
//!   majority-replicated
//! - `last_received` / `last_committed`: log tail positions
//!
//! The term is additionally mirrored into an atomic, updated while the
//! write lock is held, so [`ReplicaState::current_term`] is a lock-free
//! single-value read. That is what the round bound-term check needs between
//! the proposal path and an asynchronously advancing election.

use crate::config::ConsensusConfig;
use crate::error::{ConsensusError, Result};
use crate::types::{BootstrapInfo, OpId, Role, Term};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// One replica's consensus-visible state.
///
/// Thread-safe via internal locking; every method takes `&self`.
pub struct ReplicaState {
    config: ConsensusConfig,

    /// Mirror of `inner.term`, written under the write lock.
    term: AtomicI64,

    inner: RwLock<ReplicaInner>,
}

struct ReplicaInner {
    term: Term,
    role: Role,
    noop_committed_term: Option<Term>,
    old_leader_lease_expiry: Option<Instant>,
    leader_lease_expiry: Option<Instant>,
    last_received: OpId,
    last_committed: OpId,
}

/// The leadership-relevant inputs, captured for one ladder evaluation.
#[derive(Debug, Clone, Copy)]
pub struct LeadershipSnapshot {
    pub term: Term,
    pub role: Role,
    /// A no-op entry has committed in the current term.
    pub noop_committed: bool,
    /// Zero once the previous leader's lease has expired (or none was
    /// recorded).
    pub old_leader_lease_remaining: Duration,
    /// This leader's own lease is currently majority-replicated.
    pub majority_replicated_lease: bool,
}

impl ReplicaState {
    pub fn new(config: ConsensusConfig) -> Self {
        Self {
            config,
            term: AtomicI64::new(Term::ZERO.as_i64()),
            inner: RwLock::new(ReplicaInner {
                term: Term::ZERO,
                role: Role::Follower,
                noop_committed_term: None,
                old_leader_lease_expiry: None,
                leader_lease_expiry: None,
                last_received: OpId::MIN,
                last_committed: OpId::MIN,
            }),
        }
    }

    /// Seed log positions from replayed state. Called once, before rounds.
    pub(crate) fn bootstrap(&self, info: &BootstrapInfo) {
        let mut inner = self.inner.write();
        inner.last_received = info.last_received;
        inner.last_committed = info.last_committed;
    }

    /// Lock-free, atomically-consistent read of the current term.
    pub fn current_term(&self) -> Term {
        Term(self.term.load(Ordering::Acquire))
    }

    pub fn role(&self) -> Role {
        self.inner.read().role
    }

    /// Move to a strictly greater term. Terms never regress; a regression
    /// request is a bug in the election machinery and comes back as an
    /// error.
    pub fn advance_term(&self, new_term: Term) -> Result<()> {
        let mut inner = self.inner.write();
        if new_term <= inner.term {
            tracing::warn!(
                current = %inner.term,
                requested = %new_term,
                "rejecting term regression"
            );
            return Err(ConsensusError::TermRegression {
                current: inner.term,
                requested: new_term,
            });
        }
        inner.term = new_term;
        self.term.store(new_term.as_i64(), Ordering::Release);
        Ok(())
    }

    /// Take leadership in the current term.
    ///
    /// Resets every per-term readiness gate: the no-op gate reopens, any
    /// previously recorded leases are cleared until the election machinery
    /// records the outgoing leader's remaining lease.
    pub fn become_leader(&self) {
        let mut inner = self.inner.write();
        inner.role = Role::Leader;
        inner.noop_committed_term = None;
        inner.old_leader_lease_expiry = None;
        inner.leader_lease_expiry = None;
    }

    /// Step down to follower at `new_term` (>= the current term).
    pub fn step_down(&self, new_term: Term) -> Result<()> {
        let mut inner = self.inner.write();
        if new_term < inner.term {
            return Err(ConsensusError::TermRegression {
                current: inner.term,
                requested: new_term,
            });
        }
        if inner.role == Role::Leader {
            tracing::warn!(
                term = %inner.term,
                new_term = %new_term,
                "leader stepping down"
            );
        }
        inner.term = new_term;
        inner.role = Role::Follower;
        inner.noop_committed_term = None;
        inner.leader_lease_expiry = None;
        self.term.store(new_term.as_i64(), Ordering::Release);
        Ok(())
    }

    /// Record that the no-op entry proposed in `term` has committed.
    pub fn mark_noop_committed(&self, term: Term) {
        self.inner.write().noop_committed_term = Some(term);
    }

    /// Record how long the outgoing leader's lease still runs, as computed
    /// by the lease clock at election time.
    pub fn record_old_leader_lease(&self, remaining: Duration) {
        self.inner.write().old_leader_lease_expiry = Some(Instant::now() + remaining);
    }

    /// Grant this leader's own lease: a majority has acknowledged it, and it
    /// holds for the configured lease duration before it must be renewed.
    pub fn grant_leader_lease(&self) {
        self.inner.write().leader_lease_expiry = Some(Instant::now() + self.config.lease_duration);
    }

    pub fn revoke_leader_lease(&self) {
        self.inner.write().leader_lease_expiry = None;
    }

    /// Record a new entry appended at the log tail.
    ///
    /// Tail appends only advance, and only in the currently-recognized term;
    /// violating either is a caller bug, fatal in debug builds.
    pub fn update_last_received(&self, op_id: OpId) {
        let mut inner = self.inner.write();
        debug_assert!(
            op_id > inner.last_received,
            "last received op id must advance: {} -> {}",
            inner.last_received,
            op_id
        );
        debug_assert_eq!(
            op_id.term, inner.term,
            "tail appends must carry the current term"
        );
        inner.last_received = op_id;
    }

    /// Record the majority-committed watermark.
    pub fn update_last_committed(&self, op_id: OpId) {
        let mut inner = self.inner.write();
        debug_assert!(
            op_id >= inner.last_committed,
            "commit watermark must not retreat: {} -> {}",
            inner.last_committed,
            op_id
        );
        debug_assert!(
            op_id <= inner.last_received,
            "cannot commit past the received tail"
        );
        inner.last_committed = op_id;
    }

    pub fn last_received_op_id(&self) -> OpId {
        self.inner.read().last_received
    }

    pub fn last_committed_op_id(&self) -> OpId {
        self.inner.read().last_committed
    }

    /// Capture the inputs for one readiness-ladder evaluation.
    ///
    /// With `allow_stale == false`, every field is read under a single read
    /// guard: one consistent cut across role, term, and lease state. With
    /// `allow_stale == true`, each field is read individually (the term
    /// from its atomic mirror, the rest under short per-field guards). Each
    /// individual read is atomic, but **no cross-field consistency is
    /// guaranteed**: a concurrent election may be visible in some fields
    /// and not others. Hot paths that only feed metrics or advisory checks
    /// accept that in exchange for never contending on the full snapshot.
    pub fn leadership_snapshot(&self, allow_stale: bool) -> LeadershipSnapshot {
        if !allow_stale {
            let inner = self.inner.read();
            let now = Instant::now();
            return LeadershipSnapshot {
                term: inner.term,
                role: inner.role,
                noop_committed: inner.noop_committed_term == Some(inner.term),
                old_leader_lease_remaining: remaining_until(inner.old_leader_lease_expiry, now),
                majority_replicated_lease: holds(inner.leader_lease_expiry, now),
            };
        }

        let term = self.current_term();
        let role = self.inner.read().role;
        let noop_committed = self.inner.read().noop_committed_term == Some(term);
        let old_leader_lease_remaining =
            remaining_until(self.inner.read().old_leader_lease_expiry, Instant::now());
        let majority_replicated_lease = holds(self.inner.read().leader_lease_expiry, Instant::now());
        LeadershipSnapshot {
            term,
            role,
            noop_committed,
            old_leader_lease_remaining,
            majority_replicated_lease,
        }
    }
}

fn remaining_until(expiry: Option<Instant>, now: Instant) -> Duration {
    expiry
        .map(|at| at.saturating_duration_since(now))
        .unwrap_or(Duration::ZERO)
}

fn holds(expiry: Option<Instant>, now: Instant) -> bool {
    expiry.map(|at| now < at).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogIndex;

    fn state() -> ReplicaState {
        ReplicaState::new(ConsensusConfig::default())
    }

    #[test]
    fn test_initial_state() {
        let state = state();
        assert_eq!(state.current_term(), Term::ZERO);
        assert_eq!(state.role(), Role::Follower);
        assert_eq!(state.last_received_op_id(), OpId::MIN);
        assert_eq!(state.last_committed_op_id(), OpId::MIN);
    }

    #[test]
    fn test_term_is_monotonic() {
        let state = state();
        state.advance_term(Term(3)).unwrap();
        assert_eq!(state.current_term(), Term(3));

        assert!(matches!(
            state.advance_term(Term(3)),
            Err(ConsensusError::TermRegression { .. })
        ));
        assert!(matches!(
            state.advance_term(Term(2)),
            Err(ConsensusError::TermRegression { .. })
        ));
        assert_eq!(state.current_term(), Term(3));
    }

    #[test]
    fn test_become_leader_reopens_gates() {
        let state = state();
        state.advance_term(Term(2)).unwrap();
        state.become_leader();
        state.mark_noop_committed(Term(2));
        state.grant_leader_lease();

        // Re-election in a later term starts the ladder over.
        state.step_down(Term(3)).unwrap();
        state.advance_term(Term(4)).unwrap();
        state.become_leader();

        let snap = state.leadership_snapshot(false);
        assert!(!snap.noop_committed);
        assert!(!snap.majority_replicated_lease);
    }

    #[test]
    fn test_step_down_clears_leadership() {
        let state = state();
        state.advance_term(Term(2)).unwrap();
        state.become_leader();
        state.grant_leader_lease();

        state.step_down(Term(5)).unwrap();
        assert_eq!(state.role(), Role::Follower);
        assert_eq!(state.current_term(), Term(5));
        let snap = state.leadership_snapshot(false);
        assert!(!snap.majority_replicated_lease);
    }

    #[test]
    fn test_noop_gate_is_per_term() {
        let state = state();
        state.advance_term(Term(2)).unwrap();
        state.become_leader();
        state.mark_noop_committed(Term(2));
        assert!(state.leadership_snapshot(false).noop_committed);

        // A commit recorded for an older term does not satisfy the gate.
        state.step_down(Term(3)).unwrap();
        state.become_leader();
        state.mark_noop_committed(Term(2));
        assert!(!state.leadership_snapshot(false).noop_committed);
    }

    #[test]
    fn test_old_leader_lease_counts_down_to_zero() {
        let state = state();
        state.record_old_leader_lease(Duration::from_millis(30));

        let snap = state.leadership_snapshot(false);
        assert!(snap.old_leader_lease_remaining > Duration::ZERO);
        assert!(snap.old_leader_lease_remaining <= Duration::from_millis(30));

        std::thread::sleep(Duration::from_millis(60));
        let snap = state.leadership_snapshot(false);
        assert_eq!(snap.old_leader_lease_remaining, Duration::ZERO);
    }

    #[test]
    fn test_leader_lease_expires() {
        let mut config = ConsensusConfig::default();
        config.lease_duration = Duration::from_millis(20);
        let state = ReplicaState::new(config);

        state.grant_leader_lease();
        assert!(state.leadership_snapshot(false).majority_replicated_lease);

        std::thread::sleep(Duration::from_millis(40));
        assert!(!state.leadership_snapshot(false).majority_replicated_lease);
    }

    #[test]
    fn test_log_watermarks_advance() {
        let state = state();
        state.advance_term(Term(1)).unwrap();
        state.update_last_received(OpId::new(Term(1), LogIndex(1)));
        state.update_last_received(OpId::new(Term(1), LogIndex(2)));
        state.update_last_committed(OpId::new(Term(1), LogIndex(1)));

        assert_eq!(state.last_received_op_id(), OpId::new(Term(1), LogIndex(2)));
        assert_eq!(state.last_committed_op_id(), OpId::new(Term(1), LogIndex(1)));
    }

    #[test]
    fn test_stale_snapshot_reads_individual_fields() {
        let state = state();
        state.advance_term(Term(2)).unwrap();
        state.become_leader();
        state.mark_noop_committed(Term(2));
        state.grant_leader_lease();

        // Quiescent state: stale and fresh agree.
        let stale = state.leadership_snapshot(true);
        let fresh = state.leadership_snapshot(false);
        assert_eq!(stale.term, fresh.term);
        assert_eq!(stale.role, fresh.role);
        assert_eq!(stale.noop_committed, fresh.noop_committed);
        assert_eq!(
            stale.majority_replicated_lease,
            fresh.majority_replicated_lease
        );
    }

    #[test]
    fn test_bootstrap_seeds_watermarks() {
        let state = state();
        let info = BootstrapInfo {
            last_received: OpId::new(Term(3), LogIndex(12)),
            last_committed: OpId::new(Term(3), LogIndex(10)),
        };
        state.bootstrap(&info);
        assert_eq!(state.last_received_op_id(), info.last_received);
        assert_eq!(state.last_committed_op_id(), info.last_committed);
    }
}
