//! Consensus facade: wires rounds, the readiness ladder, op-id dispatch,
//! and the fault-hook surface together for one replicated log.
//!
//! One `Consensus` instance serves one tablet. It is constructed as an
//! `Arc` so rounds can hold a non-owning back-reference; dropping the
//! facade never waits on outstanding rounds.

use crate::config::ConsensusConfig;
use crate::error::{ConsensusError, Result};
use crate::hooks::{self, FaultHooks, HookPoint};
use crate::leader::{LeaderState, LeaderStatus};
use crate::round::{ConsensusRound, ReplicatedCallback};
use crate::state::ReplicaState;
use crate::types::{BootstrapInfo, OpId, OpIdKind, ReplicateOp, Role, Term};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Consensus control core for one replicated log.
pub struct Consensus {
    log_prefix: String,
    config: ConsensusConfig,
    state: ReplicaState,
    hooks: RwLock<Option<Arc<dyn FaultHooks>>>,
    inflight: AtomicUsize,
    shut_down: AtomicBool,
}

impl Consensus {
    pub fn new(config: ConsensusConfig, log_prefix: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            log_prefix: log_prefix.into(),
            state: ReplicaState::new(config.clone()),
            config,
            hooks: RwLock::new(None),
            inflight: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Bring the core up from replayed log state.
    ///
    /// Bracketed by the start hooks; a failing pre-hook aborts the start and
    /// leaves the state untouched.
    pub fn start(&self, info: &BootstrapInfo) -> Result<()> {
        self.execute_hook(HookPoint::PreStart)?;
        self.state.bootstrap(info);
        tracing::info!(
            last_received = %info.last_received,
            last_committed = %info.last_committed,
            "{} consensus started",
            self.log_prefix
        );
        self.execute_hook(HookPoint::PostStart)
    }

    /// Shut the core down. Idempotent; later submissions fail `Shutdown`.
    pub fn shutdown(&self) -> Result<()> {
        self.execute_hook(HookPoint::PreShutdown)?;
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            tracing::info!("{} consensus shut down", self.log_prefix);
        }
        self.execute_hook(HookPoint::PostShutdown)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// The mutation surface for the election and replication-tracking
    /// collaborators.
    pub fn state(&self) -> &ReplicaState {
        &self.state
    }

    /// Lock-free read of the current term.
    pub fn current_term(&self) -> Term {
        self.state.current_term()
    }

    /// Allocate a round bound to the current term.
    ///
    /// If `callback` is `None` the round still replicates, but no one is
    /// notified of its fate (used for internally-driven entries).
    pub fn new_round(
        self: &Arc<Self>,
        op: Arc<ReplicateOp>,
        callback: Option<ReplicatedCallback>,
    ) -> Arc<ConsensusRound> {
        ConsensusRound::new(
            Arc::downgrade(self),
            Some(self.state.current_term()),
            op,
            callback,
        )
    }

    /// Allocate a round with no term binding, for administrative entries
    /// issued before a term is finalized. Usable in any term.
    pub fn new_unbound_round(
        self: &Arc<Self>,
        op: Arc<ReplicateOp>,
        callback: Option<ReplicatedCallback>,
    ) -> Arc<ConsensusRound> {
        ConsensusRound::new(Arc::downgrade(self), None, op, callback)
    }

    /// Submit a round to the replication pipeline.
    ///
    /// Runs the replicate hooks around the bound-term check and the
    /// in-flight accounting; a failing pre-hook aborts the submission
    /// before any of it happens. The in-flight slot is released when the
    /// round's fate is delivered.
    pub fn replicate_round(&self, round: &ConsensusRound) -> Result<()> {
        if self.is_shut_down() {
            return Err(ConsensusError::Shutdown);
        }
        self.execute_hook(HookPoint::PreReplicate)?;
        round.check_bound_term(self.state.current_term())?;
        self.acquire_inflight_slot()?;
        round.mark_submitted();
        self.execute_hook(HookPoint::PostReplicate)
    }

    /// Rounds submitted but not yet completed.
    pub fn inflight_rounds(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    fn acquire_inflight_slot(&self) -> Result<()> {
        let limit = self.config.max_inflight_rounds;
        let prev = self.inflight.fetch_add(1, Ordering::AcqRel);
        if limit != 0 && prev >= limit {
            self.inflight.fetch_sub(1, Ordering::AcqRel);
            return Err(ConsensusError::Throttled {
                inflight: prev,
                limit,
            });
        }
        Ok(())
    }

    pub(crate) fn release_inflight_slot(&self) {
        self.inflight.fetch_sub(1, Ordering::AcqRel);
    }

    /// Evaluate the readiness ladder.
    ///
    /// `allow_stale` trades snapshot consistency for cheapness; see
    /// [`ReplicaState::leadership_snapshot`].
    pub fn get_leader_state(&self, allow_stale: bool) -> LeaderState {
        let snap = self.state.leadership_snapshot(allow_stale);

        if snap.role != Role::Leader {
            return LeaderState::not_ready(LeaderStatus::NotLeader);
        }
        if !snap.noop_committed {
            return LeaderState::not_ready(LeaderStatus::LeaderButNoOpNotCommitted);
        }
        if snap.old_leader_lease_remaining > std::time::Duration::ZERO {
            let mut state =
                LeaderState::not_ready(LeaderStatus::LeaderButOldLeaderMayHaveLease);
            state.remaining_old_leader_lease = snap.old_leader_lease_remaining;
            return state;
        }
        if !snap.majority_replicated_lease {
            return LeaderState::not_ready(LeaderStatus::LeaderButNoMajorityReplicatedLease);
        }
        LeaderState::ready(snap.term)
    }

    pub fn get_leader_status(&self, allow_stale: bool) -> LeaderStatus {
        self.get_leader_state(allow_stale).status
    }

    /// The current leader term, or `Term::UNKNOWN` when not applicable,
    /// i.e. for every status below `LeaderAndReady`.
    pub fn leader_term(&self) -> Term {
        self.get_leader_state(false).term
    }

    /// Route a last-op-id query to the collaborator it belongs to.
    pub fn get_last_op_id(&self, kind: OpIdKind) -> Result<OpId> {
        match kind {
            OpIdKind::Received => Ok(self.state.last_received_op_id()),
            OpIdKind::Committed => Ok(self.state.last_committed_op_id()),
            OpIdKind::Unknown => Err(ConsensusError::InvalidOpIdKind { kind }),
        }
    }

    /// Install (or clear) the fault hooks. Last writer wins.
    pub fn set_fault_hooks(&self, hooks: Option<Arc<dyn FaultHooks>>) {
        *self.hooks.write() = hooks;
    }

    pub fn fault_hooks(&self) -> Option<Arc<dyn FaultHooks>> {
        self.hooks.read().clone()
    }

    /// Run the installed hook for `point`; success when none is installed.
    ///
    /// The installed object is cloned out first; no lock is held while the
    /// hook runs.
    pub fn execute_hook(&self, point: HookPoint) -> Result<()> {
        match self.fault_hooks() {
            Some(hooks) => hooks::dispatch(hooks.as_ref(), point),
            None => Ok(()),
        }
    }
}
