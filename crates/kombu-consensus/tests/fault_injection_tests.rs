//! Fault-hook scenarios: simulated crash-at-point-X during lifecycle
//! transitions, hook bracketing order, and hook installation semantics.

use kombu_consensus::{
    BootstrapInfo, Consensus, ConsensusConfig, ConsensusError, FaultHooks, HookPoint, LogIndex,
    OpId, OpIdKind, ReplicateOp, Result, Term,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every point it is invoked at, optionally failing at one of them.
struct RecordingHooks {
    seen: Mutex<Vec<HookPoint>>,
    fail_at: Option<HookPoint>,
}

impl RecordingHooks {
    fn new(fail_at: Option<HookPoint>) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            fail_at,
        })
    }

    fn record(&self, point: HookPoint) -> Result<()> {
        self.seen.lock().push(point);
        if self.fail_at == Some(point) {
            return Err(ConsensusError::Internal {
                reason: format!("injected failure at {point:?}"),
            });
        }
        Ok(())
    }

    fn seen(&self) -> Vec<HookPoint> {
        self.seen.lock().clone()
    }
}

impl FaultHooks for RecordingHooks {
    fn pre_start(&self) -> Result<()> {
        self.record(HookPoint::PreStart)
    }
    fn post_start(&self) -> Result<()> {
        self.record(HookPoint::PostStart)
    }
    fn pre_config_change(&self) -> Result<()> {
        self.record(HookPoint::PreConfigChange)
    }
    fn post_config_change(&self) -> Result<()> {
        self.record(HookPoint::PostConfigChange)
    }
    fn pre_replicate(&self) -> Result<()> {
        self.record(HookPoint::PreReplicate)
    }
    fn post_replicate(&self) -> Result<()> {
        self.record(HookPoint::PostReplicate)
    }
    fn pre_update(&self) -> Result<()> {
        self.record(HookPoint::PreUpdate)
    }
    fn post_update(&self) -> Result<()> {
        self.record(HookPoint::PostUpdate)
    }
    fn pre_shutdown(&self) -> Result<()> {
        self.record(HookPoint::PreShutdown)
    }
    fn post_shutdown(&self) -> Result<()> {
        self.record(HookPoint::PostShutdown)
    }
}

fn new_consensus() -> Arc<Consensus> {
    Consensus::new(ConsensusConfig::default(), "T fault-tests P n1")
}

#[test]
fn no_hooks_installed_every_point_succeeds() {
    let consensus = new_consensus();
    for point in HookPoint::ALL {
        assert!(consensus.execute_hook(point).is_ok());
    }
}

#[test]
fn start_and_shutdown_are_bracketed_by_their_hooks() {
    let consensus = new_consensus();
    let hooks = RecordingHooks::new(None);
    consensus.set_fault_hooks(Some(hooks.clone()));

    consensus.start(&BootstrapInfo::default()).unwrap();
    consensus.shutdown().unwrap();

    assert_eq!(
        hooks.seen(),
        vec![
            HookPoint::PreStart,
            HookPoint::PostStart,
            HookPoint::PreShutdown,
            HookPoint::PostShutdown,
        ]
    );
}

#[test]
fn failing_pre_replicate_aborts_before_the_post_hook() {
    let consensus = new_consensus();
    consensus.state().advance_term(Term(1)).unwrap();
    let hooks = RecordingHooks::new(Some(HookPoint::PreReplicate));
    consensus.set_fault_hooks(Some(hooks.clone()));

    let round = consensus.new_round(Arc::new(ReplicateOp::noop()), None);
    let err = consensus.replicate_round(&round).unwrap_err();
    assert!(matches!(err, ConsensusError::Internal { .. }));

    let seen = hooks.seen();
    assert!(seen.contains(&HookPoint::PreReplicate));
    assert!(
        !seen.contains(&HookPoint::PostReplicate),
        "transition must abort before the post hook: {seen:?}"
    );
    // Nothing was admitted into the pipeline.
    assert_eq!(consensus.inflight_rounds(), 0);
}

#[test]
fn failing_pre_start_leaves_bootstrap_unapplied() {
    let consensus = new_consensus();
    let hooks = RecordingHooks::new(Some(HookPoint::PreStart));
    consensus.set_fault_hooks(Some(hooks));

    let info = BootstrapInfo {
        last_received: OpId::new(Term(1), LogIndex(3)),
        last_committed: OpId::new(Term(1), LogIndex(3)),
    };
    assert!(consensus.start(&info).is_err());
    assert_eq!(
        consensus.get_last_op_id(OpIdKind::Received).unwrap(),
        OpId::MIN
    );
}

#[test]
fn hook_installation_is_last_writer_wins() {
    let consensus = new_consensus();
    let first = RecordingHooks::new(None);
    let second = RecordingHooks::new(None);

    consensus.set_fault_hooks(Some(first.clone()));
    consensus.set_fault_hooks(Some(second.clone()));

    consensus.execute_hook(HookPoint::PreUpdate).unwrap();
    assert!(first.seen().is_empty());
    assert_eq!(second.seen(), vec![HookPoint::PreUpdate]);

    // Clearing restores the no-op behavior.
    consensus.set_fault_hooks(None);
    assert!(consensus.fault_hooks().is_none());
    consensus.execute_hook(HookPoint::PostUpdate).unwrap();
    assert_eq!(second.seen(), vec![HookPoint::PreUpdate]);
}

#[test]
fn config_change_points_route_through_installed_hooks() {
    let consensus = new_consensus();
    let hooks = RecordingHooks::new(Some(HookPoint::PreConfigChange));
    consensus.set_fault_hooks(Some(hooks.clone()));

    assert!(consensus.execute_hook(HookPoint::PreConfigChange).is_err());
    assert!(consensus.execute_hook(HookPoint::PostConfigChange).is_ok());
    assert_eq!(
        hooks.seen(),
        vec![HookPoint::PreConfigChange, HookPoint::PostConfigChange]
    );
}
