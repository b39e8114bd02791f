// SPDX-License-Identifier: MIT

//! The pure transition planner (§4.2, §8 property 4: planning never mutates
//! a node and is deterministic in its current state).

use crate::action::{Action, InlineTransition};
use wf_core::{BuildProcess, Condition, Node, StateTag};

/// Decide the next action for `node`, purely from its current history tag,
/// build process and condition. Never mutates `node`.
pub fn plan(node: &Node) -> Action {
    use StateTag::*;

    match node.history.current_tag() {
        Passive | Finished => Action::DoNothing { inline: None },

        Active => Action::DoNothing { inline: Some(InlineTransition::to(EvaluatingCondition)) },

        EvaluatingCondition => match &node.condition {
            None => Action::DoNothing { inline: Some(InlineTransition::to(Building)) },
            Some(Condition::Never) => {
                Action::DoNothing { inline: Some(InlineTransition::to(Building)) }
            }
            Some(Condition::Satisfied) => {
                Action::DoNothing { inline: Some(InlineTransition::to(AlreadyDone)) }
            }
            Some(other) => Action::EvalCondition { condition: other.clone() },
        },

        Building | StillBuilding => Action::CheckDeps,

        Starting | TriedToStart => match &node.build_process {
            BuildProcess::NoOp => {
                Action::DoNothing { inline: Some(InlineTransition::to(SuccessfullyDidNothing)) }
            }
            BuildProcess::LongRunning { .. } => {
                Action::StartRunning { bookkeeping: node.latest_run_parameters().cloned() }
            }
        },

        StartedRunning | StillRunning | StillRunningDespiteRecoverableError => {
            let bookkeeping = node
                .latest_run_parameters()
                .cloned()
                .expect("a running node always carries bookkeeping from start-running");
            Action::CheckProcess { bookkeeping }
        }

        RanSuccessfully | TriedToReevalCondition | SuccessfullyDidNothing => match &node.condition
        {
            None => Action::DoNothing { inline: Some(InlineTransition::to(VerifiedSuccess)) },
            Some(Condition::Satisfied) | Some(Condition::Never) => {
                Action::DoNothing { inline: Some(InlineTransition::to(VerifiedSuccess)) }
            }
            Some(other) => Action::EvalCondition { condition: other.clone() },
        },

        // Terminal tags: decide which dependents to wake, then finish.
        AlreadyDone | VerifiedSuccess => {
            Action::Activate { ids: node.on_success_activate.clone() }
        }
        FailedToStart
        | FailedRunning
        | DependenciesFailed
        | FailedToEvalCondition
        | DidNotEnsureCondition
        | Killed
        | FailedToKill => Action::Activate { ids: node.on_failure_activate.clone() },

        Killing | TriedToKill => {
            let predecessor = kill_unwind_predecessor(node);
            if predecessor.is_running_state() {
                Action::Kill { bookkeeping: node.latest_run_parameters().cloned() }
            } else {
                Action::DoNothing { inline: Some(InlineTransition::to(Killed)) }
            }
        }
    }
}

/// Walk back past the `killing`/`tried-to-kill` tail to the state the kill
/// request was issued against (§4.2: killing is legal from any in-progress
/// state, but only a subset of those require an executor call to undo).
fn kill_unwind_predecessor(node: &Node) -> StateTag {
    node.history
        .entries()
        .iter()
        .rev()
        .map(|e| e.tag)
        .find(|tag| !matches!(tag, StateTag::Killing | StateTag::TriedToKill))
        .unwrap_or(StateTag::Passive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::{ActivationReason, Condition, HostRef, RunBookkeeping, Volume};

    fn activated(build: BuildProcess, condition: Option<Condition>) -> Node {
        let mut n = Node::create("n", build, condition, 0);
        n.activate(ActivationReason::User, 1).unwrap();
        n
    }

    #[test]
    fn passive_does_nothing() {
        let n = Node::create("n", BuildProcess::NoOp, None, 0);
        assert_eq!(plan(&n), Action::DoNothing { inline: None });
    }

    #[test]
    fn active_inlines_to_evaluating_condition() {
        let n = activated(BuildProcess::NoOp, None);
        assert_eq!(
            plan(&n),
            Action::DoNothing { inline: Some(InlineTransition::to(StateTag::EvaluatingCondition)) }
        );
    }

    #[test]
    fn evaluating_condition_with_none_inlines_to_building() {
        let mut n = activated(BuildProcess::NoOp, None);
        n.history.try_push(StateTag::EvaluatingCondition, 2, None, None).unwrap();
        assert_eq!(
            plan(&n),
            Action::DoNothing { inline: Some(InlineTransition::to(StateTag::Building)) }
        );
    }

    #[test]
    fn evaluating_condition_with_satisfied_inlines_to_already_done() {
        let mut n = activated(BuildProcess::NoOp, Some(Condition::Satisfied));
        n.history.try_push(StateTag::EvaluatingCondition, 2, None, None).unwrap();
        assert_eq!(
            plan(&n),
            Action::DoNothing { inline: Some(InlineTransition::to(StateTag::AlreadyDone)) }
        );
    }

    #[test]
    fn evaluating_condition_with_real_condition_dispatches_eval() {
        let cond = Condition::VolumeExists { volume: Volume::new(HostRef::local(), "/x") };
        let mut n = activated(BuildProcess::NoOp, Some(cond.clone()));
        n.history.try_push(StateTag::EvaluatingCondition, 2, None, None).unwrap();
        assert_eq!(plan(&n), Action::EvalCondition { condition: cond });
    }

    #[test]
    fn building_dispatches_check_deps() {
        let mut n = activated(BuildProcess::NoOp, None);
        n.history.try_push(StateTag::EvaluatingCondition, 2, None, None).unwrap();
        n.history.try_push(StateTag::Building, 3, None, None).unwrap();
        assert_eq!(plan(&n), Action::CheckDeps);
    }

    #[test]
    fn starting_with_no_op_inlines_to_successfully_did_nothing() {
        let mut n = activated(BuildProcess::NoOp, None);
        for tag in [StateTag::EvaluatingCondition, StateTag::Building, StateTag::Starting] {
            n.history.try_push(tag, 1, None, None).unwrap();
        }
        assert_eq!(
            plan(&n),
            Action::DoNothing {
                inline: Some(InlineTransition::to(StateTag::SuccessfullyDidNothing))
            }
        );
    }

    #[test]
    fn starting_with_long_running_dispatches_start_running() {
        let build = BuildProcess::LongRunning { plugin_name: "local".into(), run_parameters: vec![] };
        let mut n = activated(build, None);
        for tag in [StateTag::EvaluatingCondition, StateTag::Building, StateTag::Starting] {
            n.history.try_push(tag, 1, None, None).unwrap();
        }
        assert_eq!(plan(&n), Action::StartRunning { bookkeeping: None });
    }

    #[test]
    fn started_running_dispatches_check_process_with_bookkeeping() {
        let build = BuildProcess::LongRunning { plugin_name: "local".into(), run_parameters: vec![] };
        let mut n = activated(build, None);
        let bk = RunBookkeeping::new("local", vec![1, 2, 3]);
        for tag in [StateTag::EvaluatingCondition, StateTag::Building, StateTag::Starting] {
            n.history.try_push(tag, 1, None, None).unwrap();
        }
        n.history.try_push(StateTag::StartedRunning, 2, None, Some(bk.clone())).unwrap();
        assert_eq!(plan(&n), Action::CheckProcess { bookkeeping: bk });
    }

    #[test]
    fn ran_successfully_with_no_condition_inlines_to_verified_success() {
        let build = BuildProcess::LongRunning { plugin_name: "local".into(), run_parameters: vec![] };
        let mut n = activated(build, None);
        for tag in [
            StateTag::EvaluatingCondition,
            StateTag::Building,
            StateTag::Starting,
            StateTag::StartedRunning,
            StateTag::RanSuccessfully,
        ] {
            n.history.try_push(tag, 1, None, None).unwrap();
        }
        assert_eq!(
            plan(&n),
            Action::DoNothing { inline: Some(InlineTransition::to(StateTag::VerifiedSuccess)) }
        );
    }

    #[test]
    fn already_done_activates_success_dependents() {
        let mut n = activated(BuildProcess::NoOp, Some(Condition::Satisfied));
        n.on_success_activate.push(wf_core::NodeId::new());
        for tag in [StateTag::EvaluatingCondition, StateTag::AlreadyDone] {
            n.history.try_push(tag, 1, None, None).unwrap();
        }
        match plan(&n) {
            Action::Activate { ids } => assert_eq!(ids, n.on_success_activate),
            other => panic!("expected Activate, got {other:?}"),
        }
    }

    #[test]
    fn failed_running_activates_failure_dependents() {
        let build = BuildProcess::LongRunning { plugin_name: "local".into(), run_parameters: vec![] };
        let mut n = activated(build, None);
        n.on_failure_activate.push(wf_core::NodeId::new());
        for tag in [
            StateTag::EvaluatingCondition,
            StateTag::Building,
            StateTag::Starting,
            StateTag::StartedRunning,
            StateTag::FailedRunning,
        ] {
            n.history.try_push(tag, 1, None, None).unwrap();
        }
        match plan(&n) {
            Action::Activate { ids } => assert_eq!(ids, n.on_failure_activate),
            other => panic!("expected Activate, got {other:?}"),
        }
    }

    #[test]
    fn killing_over_running_state_dispatches_kill() {
        let build = BuildProcess::LongRunning { plugin_name: "local".into(), run_parameters: vec![] };
        let mut n = activated(build, None);
        for tag in [
            StateTag::EvaluatingCondition,
            StateTag::Building,
            StateTag::Starting,
            StateTag::StartedRunning,
        ] {
            n.history.try_push(tag, 1, None, None).unwrap();
        }
        n.kill(2).unwrap();
        assert!(matches!(plan(&n), Action::Kill { .. }));
    }

    #[test]
    fn killing_over_idle_state_inlines_straight_to_killed() {
        let mut n = activated(BuildProcess::NoOp, None);
        n.kill(2).unwrap();
        assert_eq!(
            plan(&n),
            Action::DoNothing { inline: Some(InlineTransition::to(StateTag::Killed)) }
        );
    }

    #[test]
    fn kill_unwind_skips_repeated_tried_to_kill_entries() {
        let build = BuildProcess::LongRunning { plugin_name: "local".into(), run_parameters: vec![] };
        let mut n = activated(build, None);
        for tag in [
            StateTag::EvaluatingCondition,
            StateTag::Building,
            StateTag::Starting,
            StateTag::StartedRunning,
        ] {
            n.history.try_push(tag, 1, None, None).unwrap();
        }
        n.kill(2).unwrap();
        n.history.try_push(StateTag::TriedToKill, 3, None, None).unwrap();
        n.history.try_push(StateTag::TriedToKill, 4, None, None).unwrap();
        assert_eq!(kill_unwind_predecessor(&n), StateTag::StartedRunning);
    }
}
