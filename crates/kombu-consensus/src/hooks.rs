//! Fault hooks bracketing consensus lifecycle transitions.
//!
//! Tests install a [`FaultHooks`] implementation to inject synthetic delays
//! or failures at any of the ten lifecycle points. A failing hook aborts the
//! transition in progress, which is how crash-at-point-X semantics are
//! simulated without touching production code paths.
//!
//! Hooks are scoped to one [`Consensus`](crate::Consensus) instance, never
//! process-global, and are installed only during test setup; invocation
//! takes no lock.

use crate::error::Result;

/// The ten lifecycle points, one pre/post pair per transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    PreStart,
    PostStart,
    PreConfigChange,
    PostConfigChange,
    PreReplicate,
    PostReplicate,
    PreUpdate,
    PostUpdate,
    PreShutdown,
    PostShutdown,
}

/// Pluggable lifecycle callbacks.
///
/// Every method defaults to success; implementors override only the points
/// they want to interfere with. Each callback may fail, and that failure
/// propagates to whoever drove the transition.
pub trait FaultHooks: Send + Sync {
    fn pre_start(&self) -> Result<()> {
        Ok(())
    }
    fn post_start(&self) -> Result<()> {
        Ok(())
    }
    fn pre_config_change(&self) -> Result<()> {
        Ok(())
    }
    fn post_config_change(&self) -> Result<()> {
        Ok(())
    }
    fn pre_replicate(&self) -> Result<()> {
        Ok(())
    }
    fn post_replicate(&self) -> Result<()> {
        Ok(())
    }
    fn pre_update(&self) -> Result<()> {
        Ok(())
    }
    fn post_update(&self) -> Result<()> {
        Ok(())
    }
    fn pre_shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn post_shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Route a lifecycle point to its callback.
///
/// Exhaustive over [`HookPoint`]: adding a point forces an arm here.
pub(crate) fn dispatch(hooks: &dyn FaultHooks, point: HookPoint) -> Result<()> {
    match point {
        HookPoint::PreStart => hooks.pre_start(),
        HookPoint::PostStart => hooks.post_start(),
        HookPoint::PreConfigChange => hooks.pre_config_change(),
        HookPoint::PostConfigChange => hooks.post_config_change(),
        HookPoint::PreReplicate => hooks.pre_replicate(),
        HookPoint::PostReplicate => hooks.post_replicate(),
        HookPoint::PreUpdate => hooks.pre_update(),
        HookPoint::PostUpdate => hooks.post_update(),
        HookPoint::PreShutdown => hooks.pre_shutdown(),
        HookPoint::PostShutdown => hooks.post_shutdown(),
    }
}

impl HookPoint {
    /// All points, in lifecycle order. Handy for sweep tests.
    pub const ALL: [HookPoint; 10] = [
        HookPoint::PreStart,
        HookPoint::PostStart,
        HookPoint::PreConfigChange,
        HookPoint::PostConfigChange,
        HookPoint::PreReplicate,
        HookPoint::PostReplicate,
        HookPoint::PreUpdate,
        HookPoint::PostUpdate,
        HookPoint::PreShutdown,
        HookPoint::PostShutdown,
    ];
}
