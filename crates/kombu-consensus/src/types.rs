//! Core consensus types: terms, log positions, proposals, bootstrap state.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Leadership term (monotonically increasing epoch).
///
/// Terms establish logical clocks for the replicated log. At most one leader
/// is valid per term. `Term::UNKNOWN` is the "not applicable" sentinel used
/// by leadership queries when no meaningful term can be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Term(pub i64);

impl Term {
    pub const ZERO: Term = Term(0);

    /// Sentinel for "no applicable term". Never a real term.
    pub const UNKNOWN: Term = Term(-1);

    pub fn next(self) -> Term {
        Term(self.0 + 1)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Position in the replicated log (1-indexed, 0 is "before the log").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogIndex(pub i64);

impl LogIndex {
    pub const ZERO: LogIndex = LogIndex(0);

    pub fn next(self) -> LogIndex {
        LogIndex(self.0 + 1)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for LogIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0)
    }
}

/// Identifier of one entry in the replicated log.
///
/// Ordered term-first, then by index: an entry from a later term always
/// sorts after every entry of an earlier term, regardless of index. The
/// derived `Ord` relies on field declaration order for exactly that.
///
/// `OpId::MIN` is the well-known minimum sentinel; it compares less than
/// any real entry and is what bootstrap state starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpId {
    pub term: Term,
    pub index: LogIndex,
}

impl OpId {
    pub const MIN: OpId = OpId {
        term: Term::ZERO,
        index: LogIndex::ZERO,
    };

    pub fn new(term: Term, index: LogIndex) -> Self {
        Self { term, index }
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.term.0, self.index.0)
    }
}

/// Which notion of "last op id" a caller is asking for.
///
/// `Received` is the last entry appended to the local log (durable locally);
/// `Committed` is the last entry known replicated to a majority. The two
/// have different consistency implications and must never be conflated.
/// `Unknown` exists so that a defaulted/unset kind is representable and is
/// always rejected at dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpIdKind {
    Received,
    Committed,
    Unknown,
}

/// Replica role as reported by the election machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Follower => write!(f, "Follower"),
            Role::Candidate => write!(f, "Candidate"),
            Role::Leader => write!(f, "Leader"),
        }
    }
}

/// Kind tag on a proposal.
///
/// `NoOp` is the empty entry a new leader replicates to prove it knows the
/// true commit index before serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    NoOp,
    Write,
    ConfigChange,
}

/// One proposal payload, opaque to the consensus core.
///
/// Shared as `Arc<ReplicateOp>` between the proposal driver and the round
/// tracking its replication; the payload bytes are interpreted by the state
/// machine, never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicateOp {
    pub op_type: OpType,
    pub payload: Bytes,
}

impl ReplicateOp {
    pub fn new(op_type: OpType, payload: Bytes) -> Self {
        Self { op_type, payload }
    }

    /// The empty entry a freshly elected leader proposes in its own term.
    pub fn noop() -> Self {
        Self {
            op_type: OpType::NoOp,
            payload: Bytes::new(),
        }
    }
}

/// Log positions known at node startup, before any round is created.
///
/// Produced by the log-replay collaborator and handed to
/// [`Consensus::start`](crate::Consensus::start); read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapInfo {
    pub last_received: OpId,
    pub last_committed: OpId,
}

impl Default for BootstrapInfo {
    fn default() -> Self {
        Self {
            last_received: OpId::MIN,
            last_committed: OpId::MIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_ordering() {
        assert!(Term(2) > Term(1));
        assert_eq!(Term(5).next(), Term(6));
        assert!(Term::UNKNOWN < Term::ZERO);
    }

    #[test]
    fn test_op_id_term_major_order() {
        // A later term outranks any index from an earlier term.
        assert!(OpId::new(Term(3), LogIndex(1)) > OpId::new(Term(2), LogIndex(999)));
        assert!(OpId::new(Term(2), LogIndex(5)) > OpId::new(Term(2), LogIndex(4)));
    }

    #[test]
    fn test_op_id_min_sentinel() {
        let min = OpId::MIN;
        assert!(min < OpId::new(Term(1), LogIndex(1)));
        assert!(min < OpId::new(Term::ZERO, LogIndex(1)));
    }

    #[test]
    fn test_bootstrap_info_defaults_to_minimum() {
        let info = BootstrapInfo::default();
        assert_eq!(info.last_received, OpId::MIN);
        assert_eq!(info.last_committed, OpId::MIN);
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Term(7).to_string(), "T7");
        assert_eq!(LogIndex(42).to_string(), "I42");
        assert_eq!(OpId::new(Term(7), LogIndex(42)).to_string(), "7.42");
    }

    #[test]
    fn test_noop_payload_empty() {
        let op = ReplicateOp::noop();
        assert_eq!(op.op_type, OpType::NoOp);
        assert!(op.payload.is_empty());
    }
}
