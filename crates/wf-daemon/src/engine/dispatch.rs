// SPDX-License-Identifier: MIT

//! Turning a single planner [`Action`] into store reads, an executor RPC,
//! and a history mutation (§4.2, §4.5 step 3, §4.6). Every executor and
//! condition-evaluator call is clamped by `host_timeout_upper_bound`
//! (§5: "Timeouts ... clamp every executor call; a timeout is a
//! recoverable error").

use std::fmt;
use std::time::Duration;
use wf_core::{ActivationReason, Node, Outcome, SimplifiedStatus, StateTag};
use wf_executors::{CheckResult, ConditionEvaluator, Executor, ExecutorRegistry};
use wf_planner::{apply_activate, apply_check_deps, apply_check_process, apply_eval_condition, apply_inline, apply_kill, apply_start_running, Action, DepsCheck, ProcessCheck};
use wf_storage::Store;

/// Raised when a node depends on an id the store no longer has a row for —
/// a programming error (a dependency should never be deleted out from
/// under a live node), surfaced as a fatal `dependencies-failed`.
#[derive(Debug)]
pub struct CheckDepsError(pub wf_core::NodeId);

impl fmt::Display for CheckDepsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dependency {} has no stored row", self.0)
    }
}

/// Map each self-looping/retry tag to the failure tag it escalates to once
/// `max_successive_attempts` is exceeded (§4.5). Each pairing is legal per
/// [`wf_core::StateTag::legal_predecessors`].
pub fn force_failed(node: &mut Node, epoch_ms: u64) {
    let current = node.history.current_tag();
    let to = match current {
        StateTag::StillBuilding => StateTag::DependenciesFailed,
        StateTag::TriedToStart => StateTag::FailedToStart,
        StateTag::StillRunning | StateTag::StillRunningDespiteRecoverableError => {
            StateTag::FailedRunning
        }
        StateTag::TriedToReevalCondition => StateTag::DidNotEnsureCondition,
        StateTag::TriedToKill => StateTag::FailedToKill,
        StateTag::EvaluatingCondition => StateTag::FailedToEvalCondition,
        other => {
            tracing::error!(tag = %other, "max_successive_attempts exceeded from a non-retrying tag");
            return;
        }
    };
    let log = format!("exceeded max_successive_attempts at {current}");
    node.history
        .try_push(to, epoch_ms, Some(log), None)
        .expect("force_failed only targets tags legal from their retry predecessor");
}

fn check_deps(node: &Node, store: &Store) -> Outcome<DepsCheck> {
    let mut failed = Vec::new();
    let mut waiting = false;
    for dep_id in &node.depends_on {
        match store.get(*dep_id) {
            Ok(Some(dep)) => match dep.simplify() {
                SimplifiedStatus::Successful => {}
                SimplifiedStatus::Failed => failed.push(*dep_id),
                SimplifiedStatus::Activable | SimplifiedStatus::InProgress => waiting = true,
            },
            Ok(None) => return Outcome::fatal(CheckDepsError(*dep_id).to_string()),
            Err(e) => return Outcome::recoverable(e.to_string()),
        }
    }
    if !failed.is_empty() {
        Outcome::ok(DepsCheck::Failed(failed))
    } else if waiting {
        Outcome::ok(DepsCheck::Waiting)
    } else {
        Outcome::ok(DepsCheck::Ready)
    }
}

async fn with_timeout<T>(
    host_timeout: Duration,
    fut: impl std::future::Future<Output = Outcome<T>>,
) -> Outcome<T> {
    match tokio::time::timeout(host_timeout, fut).await {
        Ok(outcome) => outcome,
        Err(_) => Outcome::recoverable("host_timeout_upper_bound exceeded"),
    }
}

fn lookup_executor(
    registry: &ExecutorRegistry,
    plugin_name: &str,
) -> Result<std::sync::Arc<dyn Executor>, String> {
    registry
        .get(plugin_name)
        .ok_or_else(|| format!("no executor registered for plugin {plugin_name}"))
}

/// Run `action` against `node`, mutating its history in place. Returns
/// whether the node actually changed (so the caller knows whether to
/// persist it).
#[allow(clippy::too_many_arguments)]
pub async fn dispatch(
    node: &mut Node,
    action: Action,
    epoch_ms: u64,
    host_timeout: Duration,
    executors: &ExecutorRegistry,
    conditions: &dyn ConditionEvaluator,
    store: &Store,
) -> bool {
    match action {
        Action::DoNothing { inline: None } => false,
        Action::DoNothing { inline: Some(it) } => {
            apply_inline(node, &it, epoch_ms).changed()
        }
        Action::Activate { ids } => {
            for dep_id in ids {
                if let Ok(Some(mut dep)) = store.get(dep_id) {
                    if dep.activate(ActivationReason::Dependency(node.id), epoch_ms).is_ok() {
                        // Best effort: the bus-publishing `update` lives on
                        // `Engine`, but dispatch only has a bare `&Store`
                        // here — a direct cache write is enough for the
                        // dependent to be picked up by the next tick's
                        // `for_each_active` scan.
                        store.force_insert_passive(dep);
                    }
                }
            }
            apply_activate(node, epoch_ms).changed()
        }
        Action::CheckDeps => {
            let outcome = check_deps(node, store);
            apply_check_deps(node, outcome, epoch_ms).changed()
        }
        Action::StartRunning { bookkeeping } => {
            let plugin_name = match &node.build_process {
                wf_core::BuildProcess::LongRunning { plugin_name, .. } => plugin_name.clone(),
                wf_core::BuildProcess::NoOp => unreachable!("plan() never emits StartRunning for a no-op"),
            };
            // `bookkeeping` carries any prior attempt's run parameters, for an
            // executor that wants to detect "already started, don't double
            // spawn" on retry. The bundled `local` executor has no such
            // detection (documented limitation in wf-executors::local).
            let _ = bookkeeping;
            let outcome = match lookup_executor(executors, &plugin_name) {
                Ok(executor) => with_timeout(host_timeout, executor.start(node)).await,
                Err(message) => Outcome::fatal(message),
            };
            apply_start_running(node, outcome, epoch_ms).changed()
        }
        Action::EvalCondition { condition } => {
            let outcome = with_timeout(host_timeout, conditions.evaluate(&condition)).await;
            apply_eval_condition(node, outcome, epoch_ms).changed()
        }
        Action::CheckProcess { bookkeeping } => {
            let outcome = match lookup_executor(executors, &bookkeeping.plugin_name) {
                Ok(executor) => {
                    let raw = with_timeout(host_timeout, executor.check(&bookkeeping)).await;
                    raw.map(|check| match check {
                        CheckResult::StillRunning(bk) => ProcessCheck::StillRunning(bk),
                        CheckResult::Completed(bk) => ProcessCheck::Completed(bk),
                    })
                }
                Err(message) => Outcome::fatal(message),
            };
            apply_check_process(node, outcome, epoch_ms).changed()
        }
        Action::Kill { bookkeeping: Some(bookkeeping) } => {
            let outcome = match lookup_executor(executors, &bookkeeping.plugin_name) {
                Ok(executor) => with_timeout(host_timeout, executor.kill(&bookkeeping)).await,
                Err(message) => Outcome::fatal(message),
            };
            apply_kill(node, outcome, epoch_ms).changed()
        }
        Action::Kill { bookkeeping: None } => {
            tracing::warn!(node_id = %node.id, "kill dispatched against a running state with no bookkeeping");
            false
        }
    }
}
