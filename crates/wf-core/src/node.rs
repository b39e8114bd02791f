// SPDX-License-Identifier: MIT

//! Node model (§3, §4.1): the persisted unit the engine schedules.

use crate::condition::Condition;
use crate::history::{History, RunBookkeeping, SimplifiedStatus, StateTag};
use crate::retries::RetryTracker;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a node.
    pub struct NodeId("node");
}

/// What the node does once its dependencies are satisfied and its
/// condition (if any) says work is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildProcess {
    /// Does nothing; the planner skips straight to `successfully-did-nothing`.
    NoOp,
    /// Hands off to the named executor plugin with opaque run parameters.
    LongRunning { plugin_name: String, run_parameters: Vec<u8> },
}

impl BuildProcess {
    pub fn is_no_op(&self) -> bool {
        matches!(self, BuildProcess::NoOp)
    }
}

/// Policy controlling equivalence-based deduplication at submission (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquivalencePolicy {
    /// Never equivalent to anything.
    None,
    /// Equivalent to another live node iff both carry the same non-empty,
    /// structurally equal condition.
    SameActiveCondition,
}

impl Default for EquivalencePolicy {
    fn default() -> Self {
        EquivalencePolicy::None
    }
}

/// Why a node transitioned from passive to active (§4.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivationReason {
    User,
    Dependency(NodeId),
}

/// Programming error: activating a node that is not currently passive (§4.1, §7).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot activate node {node_id}: current state {current} is not passive")]
pub struct ActivateOnNonPassive {
    pub node_id: NodeId,
    pub current: StateTag,
}

/// A node as defined by a client and driven by the engine (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<NodeId>,
    #[serde(default)]
    pub on_failure_activate: Vec<NodeId>,
    #[serde(default)]
    pub on_success_activate: Vec<NodeId>,
    pub build_process: BuildProcess,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub equivalence_policy: EquivalencePolicy,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Append-only, user-facing log annex; never consulted by the planner
    /// (mirrors the teacher's operational `step_history` alongside the
    /// authoritative state, see SPEC_FULL.md §C).
    #[serde(default)]
    pub additional_log: Vec<String>,
    pub history: History,
    /// Attempt counts for states that retry without a named self-loop tag
    /// (§4.2, SPEC_FULL.md §C).
    #[serde(default)]
    pub retries: RetryTracker,
}

impl Node {
    /// Create a fresh, passive node (§3: "a node is created passive").
    pub fn create(
        name: impl Into<String>,
        build_process: BuildProcess,
        condition: Option<Condition>,
        epoch_ms: u64,
    ) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            metadata: None,
            depends_on: Vec::new(),
            on_failure_activate: Vec::new(),
            on_success_activate: Vec::new(),
            build_process,
            condition,
            equivalence_policy: EquivalencePolicy::None,
            tags: Vec::new(),
            additional_log: Vec::new(),
            history: History::new(epoch_ms),
            retries: RetryTracker::default(),
        }
    }

    /// Activate a passive node (§4.1). A programming error if the node
    /// isn't currently passive — the caller is expected never to call this
    /// on anything but a freshly-created or freshly-dependency-triggered
    /// passive node.
    pub fn activate(
        &mut self,
        reason: ActivationReason,
        epoch_ms: u64,
    ) -> Result<(), ActivateOnNonPassive> {
        if self.history.current_tag() != StateTag::Passive {
            return Err(ActivateOnNonPassive {
                node_id: self.id,
                current: self.history.current_tag(),
            });
        }
        let log = match &reason {
            ActivationReason::User => None,
            ActivationReason::Dependency(id) => Some(format!("activated by dependency {id}")),
        };
        self.history
            .try_push(StateTag::Active, epoch_ms, log, None)
            .expect("passive -> active is always legal");
        Ok(())
    }

    /// Enqueue a kill. Returns `None` if the current state isn't killable
    /// (§4.1: "leaving the caller to ignore the request"), otherwise `Some(())`
    /// after appending the `killing` entry.
    pub fn kill(&mut self, epoch_ms: u64) -> Option<()> {
        let current = self.history.current_tag();
        if !current.is_killable() {
            return None;
        }
        self.history
            .try_push(StateTag::Killing, epoch_ms, None, None)
            .expect("killable state always admits `killing`");
        Some(())
    }

    /// Reactivate by producing a brand-new node sharing no history with
    /// `self` (§4.1) — used when a user wants to re-run a finished node
    /// under a fresh identity.
    pub fn reactivate(
        &self,
        new_name: impl Into<String>,
        new_metadata: Option<String>,
        epoch_ms: u64,
    ) -> Node {
        Node {
            id: NodeId::new(),
            name: new_name.into(),
            metadata: new_metadata,
            depends_on: self.depends_on.clone(),
            on_failure_activate: self.on_failure_activate.clone(),
            on_success_activate: self.on_success_activate.clone(),
            build_process: self.build_process.clone(),
            condition: self.condition.clone(),
            equivalence_policy: self.equivalence_policy,
            tags: self.tags.clone(),
            additional_log: Vec::new(),
            history: History::new(epoch_ms),
            retries: RetryTracker::default(),
        }
    }

    pub fn simplify(&self) -> SimplifiedStatus {
        self.history.simplify()
    }

    pub fn latest_run_parameters(&self) -> Option<&RunBookkeeping> {
        self.history.latest_run_parameters()
    }

    /// Equivalence used by the add-path (§4.1, §8 property 5).
    ///
    /// Equivalence is evaluated from the perspective of the *incoming* node
    /// (`self`): its own policy decides, and equivalence is therefore not
    /// commutative at submission time — a `b` whose own policy is `none`
    /// would never be offered as `self` here in practice, but if it were,
    /// this call correctly returns `false`.
    pub fn is_equivalent(&self, candidate: &Node) -> bool {
        match self.equivalence_policy {
            EquivalencePolicy::None => false,
            EquivalencePolicy::SameActiveCondition => {
                match (&self.condition, &candidate.condition) {
                    (Some(a), Some(b)) => a.structurally_equal(b),
                    _ => false,
                }
            }
        }
    }
}
