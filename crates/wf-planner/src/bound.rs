// SPDX-License-Identifier: MIT

//! Bounding per-node retry attempts (§4.5: "exceeding `max_successive_attempts`
//! marks the node failed with a descriptive log").

use wf_core::{Node, StateTag};

/// Tags reached by a named self-loop, whose repeat count in the trailing
/// history segment is the attempt count for that state.
const SELF_LOOPING_TAGS: [StateTag; 5] = [
    StateTag::StillBuilding,
    StateTag::TriedToStart,
    StateTag::StillRunning,
    StateTag::TriedToReevalCondition,
    StateTag::TriedToKill,
];

/// How many times `node` has retried at its current logical state, whether
/// via a self-loop tag or the counterless `evaluating-condition` retry path.
pub fn successive_attempts(node: &Node) -> u32 {
    let current = node.history.current_tag();
    if SELF_LOOPING_TAGS.contains(&current) {
        node.history.trailing_repeat_count(current)
    } else {
        node.retries.get(current)
    }
}

/// Whether `node` has exceeded `max_successive_attempts` retries at its
/// current logical state and should be forced to a terminal failure.
pub fn exceeded(node: &Node, max_successive_attempts: u32) -> bool {
    successive_attempts(node) > max_successive_attempts
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::{ActivationReason, BuildProcess};

    #[test]
    fn counts_trailing_self_loop_entries() {
        let mut n = Node::create("n", BuildProcess::NoOp, None, 0);
        n.activate(ActivationReason::User, 1).unwrap();
        for tag in [StateTag::EvaluatingCondition, StateTag::Building, StateTag::Starting] {
            n.history.try_push(tag, 1, None, None).unwrap();
        }
        for i in 0..3 {
            n.history.try_push(StateTag::TriedToStart, 2 + i, None, None).unwrap();
        }
        assert_eq!(successive_attempts(&n), 3);
        assert!(exceeded(&n, 2));
        assert!(!exceeded(&n, 3));
    }

    #[test]
    fn counts_counterless_retries_from_the_tracker() {
        let mut n = Node::create("n", BuildProcess::NoOp, None, 0);
        n.activate(ActivationReason::User, 1).unwrap();
        n.history.try_push(StateTag::EvaluatingCondition, 2, None, None).unwrap();
        n.retries.increment(StateTag::EvaluatingCondition);
        n.retries.increment(StateTag::EvaluatingCondition);
        assert_eq!(successive_attempts(&n), 2);
    }
}
