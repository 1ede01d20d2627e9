//! kombu-consensus: the consensus control core of the kombu replicated
//! key-value store.
//!
//! This crate is the term-safety and leader-readiness kernel of a
//! Raft-family replication protocol:
//! - Term-bound replication rounds: one proposal tracked from submission to
//!   its known fate, refusing to replicate under a stale leadership term,
//!   with an at-most-once completion callback safe against racing
//!   completion paths
//! - The leader-readiness ladder: the ordered gates (no-op committed, old
//!   leader's lease expired, own lease majority-replicated) a new leader
//!   clears before serving consistent reads and writes
//! - Last-op-id dispatch that keeps "received" and "committed" from ever
//!   being conflated
//! - A fault-hook surface bracketing lifecycle transitions for test-time
//!   fault injection
//!
//! Log storage, transport, elections, membership changes, and the lease
//! clock are external collaborators: they drive [`ReplicaState`] and consume
//! the round and leadership query APIs.

pub mod config;
pub mod error;
pub mod types;
pub mod hooks;
pub mod leader;
pub mod round;
pub mod state;
pub mod consensus;

pub use config::ConsensusConfig;
pub use consensus::Consensus;
pub use error::{ConsensusError, Result};
pub use hooks::{FaultHooks, HookPoint};
pub use leader::{LeaderState, LeaderStatus};
pub use round::{ConsensusRound, ReplicatedCallback};
pub use state::{LeadershipSnapshot, ReplicaState};
pub use types::*;
