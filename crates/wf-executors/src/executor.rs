// SPDX-License-Identifier: MIT

//! The executor plugin contract (§4.6, C6): the boundary every external
//! plugin (local daemon, LSF, PBS, YARN — only `local` ships here, the rest
//! are out of scope per §1) implements. The engine calls exactly these
//! operations and never inspects a run's opaque parameters.

use async_trait::async_trait;
use wf_core::{Outcome, RunBookkeeping};

/// What `Executor::check` found when polling a running task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    StillRunning(RunBookkeeping),
    Completed(RunBookkeeping),
}

/// Six operations a plugin implements for one `build_process.plugin_name`
/// (§4.6). All return the tri-valued [`Outcome`]; `recoverable` re-enters
/// the same logical state with the attempt counter incremented, `fatal`
/// advances to the matching failure state.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The `plugin_name` this executor answers for.
    fn plugin_name(&self) -> &str;

    /// Launch the work described by a node's `build_process`; return the
    /// opaque bookkeeping the engine will hand back on every later call.
    async fn start(&self, node: &wf_core::Node) -> Outcome<RunBookkeeping>;

    /// Poll a running task.
    async fn check(&self, bookkeeping: &RunBookkeeping) -> Outcome<CheckResult>;

    /// Request cooperative termination.
    async fn kill(&self, bookkeeping: &RunBookkeeping) -> Outcome<RunBookkeeping>;

    /// Round-trip bookkeeping across an engine restart.
    fn serialize(&self, bookkeeping: &RunBookkeeping) -> Outcome<Vec<u8>>;
    fn deserialize(&self, bytes: &[u8]) -> Outcome<RunBookkeeping>;

    /// Reflective accessors for observation UIs (§4.6); not consulted by
    /// the engine loop itself.
    async fn query(&self, bookkeeping: &RunBookkeeping, query_name: &str) -> Outcome<String>;
    async fn available_queries(&self, bookkeeping: &RunBookkeeping) -> Outcome<Vec<String>>;
}

/// A condition evaluator (§4.6: "Condition evaluation uses the same
/// tri-valued result shape, dispatched to a condition evaluator — can be
/// the same plugin subsystem"). `true` means the condition holds.
#[async_trait]
pub trait ConditionEvaluator: Send + Sync {
    async fn evaluate(&self, condition: &wf_core::Condition) -> Outcome<bool>;
}
