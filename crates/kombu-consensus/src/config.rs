//! Consensus core configuration.

use std::time::Duration;

/// Configuration for one consensus instance.
///
/// One instance serves one replicated log (one tablet); clusters hosting
/// many tablets construct many instances, typically from one shared config.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Leader lease duration.
    ///
    /// When this leader's lease is acknowledged by a majority, the lease is
    /// considered held for this long before it must be re-acknowledged.
    /// Must be shorter than the election timeout of the surrounding election
    /// machinery for the lease to be safe.
    ///
    /// Default: 2000ms
    pub lease_duration: Duration,

    /// Maximum rounds submitted for replication but not yet completed.
    ///
    /// Backpressure seam toward the proposal driver: submissions beyond this
    /// bound fail with `Throttled` until earlier rounds complete.
    /// 0 disables the bound.
    ///
    /// Default: 1024
    pub max_inflight_rounds: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            lease_duration: Duration::from_millis(2000),
            max_inflight_rounds: 1024,
        }
    }
}

impl ConsensusConfig {
    /// Validate configuration (ensure invariants hold).
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.lease_duration.is_zero() {
            return Err("lease_duration must be > 0".to_string());
        }
        Ok(())
    }
}
