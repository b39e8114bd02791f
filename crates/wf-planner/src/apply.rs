// SPDX-License-Identifier: MIT

//! Folding an [`Outcome`] from an [`crate::Action`] dispatch back into a
//! node's history (§4.2, §7). Each `apply_*` function is the single place
//! that knows which tag an outcome of its action advances to; together they
//! are the only callers of [`wf_core::History::try_push`] outside `wf-core`
//! itself (besides `Node::activate`/`Node::kill`).

use crate::action::InlineTransition;
use wf_core::{NodeId, Outcome, Progress, RunBookkeeping, StateTag};

/// Result of polling whether a node's dependencies are satisfied (`CheckDeps`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepsCheck {
    Ready,
    Waiting,
    Failed(Vec<NodeId>),
}

/// Result of polling a long-running build (`CheckProcess`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessCheck {
    StillRunning(RunBookkeeping),
    Completed(RunBookkeeping),
}

/// Apply a planner-issued inline transition (§4.2: no executor call needed).
pub fn apply_inline(
    node: &mut wf_core::Node,
    inline: &InlineTransition,
    epoch_ms: u64,
) -> Progress {
    node.history
        .try_push(inline.to, epoch_ms, inline.log.clone(), None)
        .expect("planner only ever proposes legal inline transitions");
    node.retries.reset(inline.to);
    Progress::Changed
}

/// Apply the result of a dependency-status poll.
pub fn apply_check_deps(node: &mut wf_core::Node, outcome: Outcome<DepsCheck>, epoch_ms: u64) -> Progress {
    match outcome {
        Outcome::Ok(DepsCheck::Ready) => push(node, StateTag::Starting, None, None, epoch_ms),
        Outcome::Ok(DepsCheck::Waiting) => Progress::Unchanged,
        Outcome::Ok(DepsCheck::Failed(ids)) => {
            let log = format!(
                "dependencies failed: {}",
                ids.iter().map(NodeId::to_string).collect::<Vec<_>>().join(", ")
            );
            push(node, StateTag::DependenciesFailed, Some(log), None, epoch_ms)
        }
        Outcome::RecoverableError { message, .. } => {
            push(node, StateTag::StillBuilding, Some(message), None, epoch_ms)
        }
        Outcome::FatalError { message, .. } => {
            push(node, StateTag::DependenciesFailed, Some(message), None, epoch_ms)
        }
    }
}

/// Apply the result of handing a build off to an executor's `start`.
pub fn apply_start_running(
    node: &mut wf_core::Node,
    outcome: Outcome<RunBookkeeping>,
    epoch_ms: u64,
) -> Progress {
    match outcome {
        Outcome::Ok(bk) => push(node, StateTag::StartedRunning, None, Some(bk), epoch_ms),
        Outcome::RecoverableError { message, bookkeeping } => {
            push(node, StateTag::TriedToStart, Some(message), bookkeeping, epoch_ms)
        }
        Outcome::FatalError { message, bookkeeping } => {
            push(node, StateTag::FailedToStart, Some(message), bookkeeping, epoch_ms)
        }
    }
}

/// Apply the result of evaluating a condition. The target tag depends on
/// whether the node is entering the build (`evaluating-condition`, a
/// skip-check) or leaving it (post-run verification).
pub fn apply_eval_condition(
    node: &mut wf_core::Node,
    outcome: Outcome<bool>,
    epoch_ms: u64,
) -> Progress {
    let entering = node.history.current_tag() == StateTag::EvaluatingCondition;
    match outcome {
        Outcome::Ok(true) => {
            let to = if entering { StateTag::AlreadyDone } else { StateTag::VerifiedSuccess };
            push(node, to, None, None, epoch_ms)
        }
        Outcome::Ok(false) => {
            let to = if entering { StateTag::Building } else { StateTag::DidNotEnsureCondition };
            push(node, to, None, None, epoch_ms)
        }
        Outcome::RecoverableError { message, .. } => {
            if entering {
                // `evaluating-condition` has no named self-loop tag; retry
                // without growing the history, tracked by the retry counter.
                node.retries.increment(StateTag::EvaluatingCondition);
                Progress::Unchanged
            } else {
                push(node, StateTag::TriedToReevalCondition, Some(message), None, epoch_ms)
            }
        }
        Outcome::FatalError { message, .. } => {
            let to =
                if entering { StateTag::FailedToEvalCondition } else { StateTag::DidNotEnsureCondition };
            push(node, to, Some(message), None, epoch_ms)
        }
    }
}

/// Apply the result of polling a long-running build for completion.
pub fn apply_check_process(
    node: &mut wf_core::Node,
    outcome: Outcome<ProcessCheck>,
    epoch_ms: u64,
) -> Progress {
    match outcome {
        Outcome::Ok(ProcessCheck::StillRunning(bk)) => {
            push(node, StateTag::StillRunning, None, Some(bk), epoch_ms)
        }
        Outcome::Ok(ProcessCheck::Completed(bk)) => {
            push(node, StateTag::RanSuccessfully, None, Some(bk), epoch_ms)
        }
        Outcome::RecoverableError { message, bookkeeping } => push(
            node,
            StateTag::StillRunningDespiteRecoverableError,
            Some(message),
            bookkeeping,
            epoch_ms,
        ),
        Outcome::FatalError { message, bookkeeping } => {
            push(node, StateTag::FailedRunning, Some(message), bookkeeping, epoch_ms)
        }
    }
}

/// Apply the result of asking an executor to kill an in-flight build.
pub fn apply_kill(
    node: &mut wf_core::Node,
    outcome: Outcome<RunBookkeeping>,
    epoch_ms: u64,
) -> Progress {
    match outcome {
        Outcome::Ok(bk) => push(node, StateTag::Killed, None, Some(bk), epoch_ms),
        Outcome::RecoverableError { message, bookkeeping } => {
            push(node, StateTag::TriedToKill, Some(message), bookkeeping, epoch_ms)
        }
        Outcome::FatalError { message, bookkeeping } => {
            push(node, StateTag::FailedToKill, Some(message), bookkeeping, epoch_ms)
        }
    }
}

/// Apply an `Activate` action: wake the given dependents (the caller is
/// responsible for actually activating them in the store) and advance this
/// node to `finished`.
pub fn apply_activate(node: &mut wf_core::Node, epoch_ms: u64) -> Progress {
    push(node, StateTag::Finished, None, None, epoch_ms)
}

fn push(
    node: &mut wf_core::Node,
    tag: StateTag,
    log: Option<String>,
    bookkeeping: Option<RunBookkeeping>,
    epoch_ms: u64,
) -> Progress {
    node.history
        .try_push(tag, epoch_ms, log, bookkeeping)
        .expect("apply_* is only ever called with the outcome of the action plan() proposed");
    node.retries.reset(tag);
    Progress::Changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::{ActivationReason, BuildProcess, Node};

    fn built() -> Node {
        let build = BuildProcess::LongRunning { plugin_name: "local".into(), run_parameters: vec![] };
        let mut n = Node::create("n", build, None, 0);
        n.activate(ActivationReason::User, 1).unwrap();
        for tag in [StateTag::EvaluatingCondition, StateTag::Building] {
            n.history.try_push(tag, 1, None, None).unwrap();
        }
        n
    }

    #[test]
    fn check_deps_ready_pushes_starting() {
        let mut n = built();
        let progress = apply_check_deps(&mut n, Outcome::Ok(DepsCheck::Ready), 2);
        assert_eq!(progress, Progress::Changed);
        assert_eq!(n.history.current_tag(), StateTag::Starting);
    }

    #[test]
    fn check_deps_waiting_is_unchanged() {
        let mut n = built();
        let before = n.history.len();
        let progress = apply_check_deps(&mut n, Outcome::Ok(DepsCheck::Waiting), 2);
        assert_eq!(progress, Progress::Unchanged);
        assert_eq!(n.history.len(), before);
    }

    #[test]
    fn check_deps_failed_pushes_dependencies_failed() {
        let mut n = built();
        let other = NodeId::new();
        apply_check_deps(&mut n, Outcome::Ok(DepsCheck::Failed(vec![other])), 2);
        assert_eq!(n.history.current_tag(), StateTag::DependenciesFailed);
    }

    #[test]
    fn start_running_recoverable_error_pushes_tried_to_start() {
        let mut n = built();
        n.history.try_push(StateTag::Starting, 2, None, None).unwrap();
        apply_start_running(&mut n, Outcome::recoverable("timeout"), 3);
        assert_eq!(n.history.current_tag(), StateTag::TriedToStart);
    }

    #[test]
    fn check_process_recoverable_error_pushes_running_despite_error() {
        let bk = RunBookkeeping::new("local", vec![]);
        let mut n = built();
        n.history.try_push(StateTag::Starting, 2, None, None).unwrap();
        n.history.try_push(StateTag::StartedRunning, 3, None, Some(bk.clone())).unwrap();
        apply_check_process(&mut n, Outcome::recoverable_with("flaky poll", bk), 4);
        assert_eq!(n.history.current_tag(), StateTag::StillRunningDespiteRecoverableError);
    }

    #[test]
    fn check_process_completed_pushes_ran_successfully() {
        let bk = RunBookkeeping::new("local", vec![]);
        let mut n = built();
        n.history.try_push(StateTag::Starting, 2, None, None).unwrap();
        n.history.try_push(StateTag::StartedRunning, 3, None, Some(bk.clone())).unwrap();
        apply_check_process(&mut n, Outcome::Ok(ProcessCheck::Completed(bk)), 4);
        assert_eq!(n.history.current_tag(), StateTag::RanSuccessfully);
    }

    #[test]
    fn eval_condition_entering_recoverable_error_bumps_retry_counter_without_pushing() {
        let mut n = Node::create("n", BuildProcess::NoOp, None, 0);
        n.activate(ActivationReason::User, 1).unwrap();
        n.history.try_push(StateTag::EvaluatingCondition, 2, None, None).unwrap();
        let before = n.history.len();
        apply_eval_condition(&mut n, Outcome::recoverable("nfs hiccup"), 3);
        assert_eq!(n.history.len(), before);
        assert_eq!(n.retries.get(StateTag::EvaluatingCondition), 1);
    }

    #[test]
    fn eval_condition_leaving_recoverable_error_pushes_tried_to_reeval() {
        let mut n = built();
        n.history.try_push(StateTag::Starting, 2, None, None).unwrap();
        n.history.try_push(StateTag::SuccessfullyDidNothing, 3, None, None).unwrap();
        apply_eval_condition(&mut n, Outcome::recoverable("stat failed"), 4);
        assert_eq!(n.history.current_tag(), StateTag::TriedToReevalCondition);
    }

    #[test]
    fn activate_pushes_finished() {
        let mut n = Node::create("n", BuildProcess::NoOp, Some(wf_core::Condition::Satisfied), 0);
        n.activate(ActivationReason::User, 1).unwrap();
        n.history.try_push(StateTag::EvaluatingCondition, 2, None, None).unwrap();
        n.history.try_push(StateTag::AlreadyDone, 3, None, None).unwrap();
        apply_activate(&mut n, 4);
        assert_eq!(n.history.current_tag(), StateTag::Finished);
    }
}
