// SPDX-License-Identifier: MIT

//! The planner's output vocabulary (§4.2): the seven action shapes a node's
//! current history tag maps to, plus the inline-transition payload some of
//! them carry.

use wf_core::{Condition, NodeId, RunBookkeeping, StateTag};

/// A transition the engine may apply directly, with no executor call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineTransition {
    pub to: StateTag,
    pub log: Option<String>,
}

impl InlineTransition {
    pub fn to(to: StateTag) -> Self {
        Self { to, log: None }
    }

    pub fn to_with_log(to: StateTag, log: impl Into<String>) -> Self {
        Self { to, log: Some(log.into()) }
    }
}

/// What the engine must do next for a node (§4.2). Produced by [`crate::plan`],
/// a pure function of the node's current state.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Nothing to do: either the node is at rest (`passive`/`finished`), or
    /// the next step is a transition the engine can apply without talking to
    /// an executor.
    DoNothing { inline: Option<InlineTransition> },
    /// The node reached a terminal tag; activate the given dependents, then
    /// advance the node itself to `finished`.
    Activate { ids: Vec<NodeId> },
    /// Poll whether the node's dependencies have all succeeded.
    CheckDeps,
    /// Hand the build off to an executor plugin.
    StartRunning { bookkeeping: Option<RunBookkeeping> },
    /// Evaluate a condition, either as a pre-build skip-check or a post-run
    /// verification (distinguished by the node's current tag).
    EvalCondition { condition: Condition },
    /// Poll a long-running build for completion.
    CheckProcess { bookkeeping: RunBookkeeping },
    /// Ask the executor to kill the in-flight build.
    Kill { bookkeeping: Option<RunBookkeeping> },
}
