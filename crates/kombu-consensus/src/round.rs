//! One proposal's journey from submission to a known replication outcome.
//!
//! A round is created on the leader's proposal-dispatch path but completed
//! from the replication-tracking context once a majority (or a failure) is
//! observed: two different threads by design, synchronized only through
//! the round itself. The two invariants that matter:
//!
//! - The completion callback fires **at most once**, no matter how many
//!   completion paths race (a commit notification against a term-change
//!   abort, for instance). An atomic guard enforces this; no lock is held
//!   across the callback, so callbacks may re-enter consensus freely.
//! - A round bound to term T refuses replication in any other term. The
//!   check runs again immediately before append, not just at creation,
//!   because the term advances asynchronously in between.

use crate::consensus::Consensus;
use crate::error::{ConsensusError, Result};
use crate::types::{OpId, ReplicateOp, Term};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Invoked exactly once with the round's fate: the replication outcome, the
/// leader term active when the outcome became known (which differs from the
/// bound term for intentionally unbound rounds), and the op ids applied as
/// part of the same commit step.
pub type ReplicatedCallback = Box<dyn FnOnce(Result<()>, Term, &[OpId]) + Send + 'static>;

/// One in-flight (or completed) proposal.
///
/// Owned by the proposal driver that created it; holds a non-owning
/// back-reference to the consensus facade for term validation only, so a
/// round can never extend the facade's lifetime.
pub struct ConsensusRound {
    consensus: Weak<Consensus>,
    op: Arc<ReplicateOp>,
    /// `None` means unbound: usable in any term. Used for administrative
    /// entries issued before a term is finalized.
    bound_term: Option<Term>,
    submitted: AtomicBool,
    completed: AtomicBool,
    callback: Mutex<Option<ReplicatedCallback>>,
}

impl ConsensusRound {
    pub(crate) fn new(
        consensus: Weak<Consensus>,
        bound_term: Option<Term>,
        op: Arc<ReplicateOp>,
        callback: Option<ReplicatedCallback>,
    ) -> Arc<Self> {
        Arc::new(Self {
            consensus,
            op,
            bound_term,
            submitted: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            callback: Mutex::new(callback),
        })
    }

    pub fn op(&self) -> &Arc<ReplicateOp> {
        &self.op
    }

    /// The term this round was bound to at creation, or `None` if unbound.
    pub fn bound_term(&self) -> Option<Term> {
        self.bound_term
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Verify this round may replicate in `current_term`.
    ///
    /// Succeeds when unbound or when the bound term matches; otherwise fails
    /// `Aborted` naming both terms so the caller can re-propose. A stale
    /// success is an acceptable race, since the replication driver re-checks
    /// at the actual append point.
    pub fn check_bound_term(&self, current_term: Term) -> Result<()> {
        match self.bound_term {
            Some(bound) if bound != current_term => Err(ConsensusError::Aborted {
                bound,
                current: current_term,
            }),
            _ => Ok(()),
        }
    }

    /// [`check_bound_term`](Self::check_bound_term) against the facade's
    /// live term, read atomically through the back-reference.
    ///
    /// This is the form the replication driver calls immediately before
    /// appending the entry to the log. Fails `Shutdown` if the facade is
    /// already gone.
    pub fn check_term_matches_current(&self) -> Result<()> {
        match self.consensus.upgrade() {
            Some(consensus) => self.check_bound_term(consensus.current_term()),
            None => Err(ConsensusError::Shutdown),
        }
    }

    /// Deliver the round's fate.
    ///
    /// At most one invocation fires the callback; later calls (from racing
    /// completion paths) are silent no-ops, as is the whole method when no
    /// callback was registered. The callback runs with no round lock held,
    /// and once it returns no further access to the payload occurs; that
    /// return is the synchronization point for payload teardown.
    pub fn notify_replication_finished(
        &self,
        result: Result<()>,
        leader_term: Term,
        applied_op_ids: &[OpId],
    ) {
        if self.completed.swap(true, Ordering::AcqRel) {
            return;
        }

        if self.submitted.load(Ordering::Acquire) {
            if let Some(consensus) = self.consensus.upgrade() {
                consensus.release_inflight_slot();
            }
        }

        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback(result, leader_term, applied_op_ids);
        }
    }

    pub(crate) fn mark_submitted(&self) {
        self.submitted.store(true, Ordering::Release);
    }
}
