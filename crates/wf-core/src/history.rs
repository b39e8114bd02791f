// SPDX-License-Identifier: MIT

//! The node history state machine (§3 of the specification).
//!
//! A [`History`] is an append-only sequence of [`HistoryEntry`] values. Each
//! entry carries the state tag reached, a timestamp, an optional log line,
//! and — for states reached by talking to an executor — the executor's
//! opaque run bookkeeping. [`History::try_push`] is the single choke point
//! that enforces the legal-predecessor table; nothing else may append to a
//! history, so an illegal transition can never be constructed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque executor-owned identification for a running task.
///
/// Paired with the plugin name so a restarted engine knows which executor
/// to hand the bytes back to (§4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunBookkeeping {
    pub plugin_name: String,
    /// Opaque bytes owned by the plugin; the engine never inspects them.
    pub run_parameters: Vec<u8>,
}

impl RunBookkeeping {
    pub fn new(plugin_name: impl Into<String>, run_parameters: Vec<u8>) -> Self {
        Self { plugin_name: plugin_name.into(), run_parameters }
    }
}

/// Every state a node's history can reach.
///
/// Variant order mirrors the lifecycle diagram in §3 top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateTag {
    Passive,
    Active,
    EvaluatingCondition,
    AlreadyDone,
    Building,
    StillBuilding,
    Starting,
    TriedToStart,
    StartedRunning,
    FailedToStart,
    SuccessfullyDidNothing,
    StillRunning,
    StillRunningDespiteRecoverableError,
    RanSuccessfully,
    FailedRunning,
    VerifiedSuccess,
    DidNotEnsureCondition,
    TriedToReevalCondition,
    FailedToEvalCondition,
    DependenciesFailed,
    Killing,
    TriedToKill,
    Killed,
    FailedToKill,
    Finished,
}

crate::simple_display! {
    StateTag {
        Passive => "passive",
        Active => "active",
        EvaluatingCondition => "evaluating-condition",
        AlreadyDone => "already-done",
        Building => "building",
        StillBuilding => "still-building",
        Starting => "starting",
        TriedToStart => "tried-to-start",
        StartedRunning => "started-running",
        FailedToStart => "failed-to-start",
        SuccessfullyDidNothing => "successfully-did-nothing",
        StillRunning => "still-running",
        StillRunningDespiteRecoverableError => "still-running-despite-recoverable-error",
        RanSuccessfully => "ran-successfully",
        FailedRunning => "failed-running",
        VerifiedSuccess => "verified-success",
        DidNotEnsureCondition => "did-not-ensure-condition",
        TriedToReevalCondition => "tried-to-reeval-condition",
        FailedToEvalCondition => "failed-to-eval-condition",
        DependenciesFailed => "dependencies-failed",
        Killing => "killing",
        TriedToKill => "tried-to-kill",
        Killed => "killed",
        FailedToKill => "failed-to-kill",
        Finished => "finished",
    }
}

impl StateTag {
    /// The exact set of predecessor tags this state may extend (§3, §8 property 1).
    ///
    /// `Finished` and `Killing` are the only states reachable from more than
    /// a handful of predecessors (terminal collection, and "any running
    /// state" respectively).
    pub fn legal_predecessors(self) -> &'static [StateTag] {
        use StateTag::*;
        match self {
            Passive => &[],
            Active => &[Passive],
            EvaluatingCondition => &[Active],
            AlreadyDone => &[EvaluatingCondition],
            Building => &[EvaluatingCondition],
            StillBuilding => &[Building, StillBuilding],
            Starting => &[Building, StillBuilding],
            TriedToStart => &[Starting, TriedToStart],
            StartedRunning => &[Starting, TriedToStart],
            FailedToStart => &[Starting, TriedToStart],
            SuccessfullyDidNothing => &[Starting, TriedToStart],
            StillRunning => &[StartedRunning, StillRunning, StillRunningDespiteRecoverableError],
            StillRunningDespiteRecoverableError => {
                &[StartedRunning, StillRunning, StillRunningDespiteRecoverableError]
            }
            RanSuccessfully => &[StartedRunning, StillRunning, StillRunningDespiteRecoverableError],
            FailedRunning => &[StartedRunning, StillRunning, StillRunningDespiteRecoverableError],
            // `SuccessfullyDidNothing` stands in for a completed run when the
            // build process is `no_op` — it still passes through post-run
            // condition verification just like `RanSuccessfully` (§3 S1).
            VerifiedSuccess => &[RanSuccessfully, TriedToReevalCondition, SuccessfullyDidNothing],
            DidNotEnsureCondition => {
                &[RanSuccessfully, TriedToReevalCondition, SuccessfullyDidNothing]
            }
            TriedToReevalCondition => {
                &[RanSuccessfully, TriedToReevalCondition, SuccessfullyDidNothing]
            }
            FailedToEvalCondition => &[EvaluatingCondition],
            DependenciesFailed => &[Building, StillBuilding],
            Killing => &[
                Passive,
                Active,
                EvaluatingCondition,
                Building,
                StillBuilding,
                Starting,
                TriedToStart,
                StartedRunning,
                StillRunning,
                StillRunningDespiteRecoverableError,
            ],
            TriedToKill => &[Killing, TriedToKill],
            Killed => &[Killing, TriedToKill],
            FailedToKill => &[Killing, TriedToKill],
            Finished => &[
                VerifiedSuccess,
                AlreadyDone,
                DependenciesFailed,
                FailedToStart,
                FailedToEvalCondition,
                DidNotEnsureCondition,
                FailedRunning,
                Killed,
                FailedToKill,
            ],
        }
    }

    /// Whether `self` may legally follow `predecessor`.
    pub fn may_follow(self, predecessor: StateTag) -> bool {
        self.legal_predecessors().contains(&predecessor)
    }

    /// Terminal tags that `finished` may extend.
    pub fn is_terminal(self) -> bool {
        StateTag::Finished.legal_predecessors().contains(&self)
    }

    /// States from which a kill request is honorable without contacting an executor
    /// (no run is in flight yet, or the node hasn't started).
    pub fn is_killable(self) -> bool {
        self.may_follow_any(StateTag::Killing.legal_predecessors())
    }

    fn may_follow_any(self, set: &[StateTag]) -> bool {
        set.contains(&self)
    }

    /// States in which the node is actively running under an executor, so a
    /// kill from here must invoke the executor's `kill` operation (§4.2).
    pub fn is_running_state(self) -> bool {
        matches!(
            self,
            StateTag::StartedRunning
                | StateTag::StillRunning
                | StateTag::StillRunningDespiteRecoverableError
        )
    }
}

/// Coarse roll-up of a history's current state (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimplifiedStatus {
    Activable,
    InProgress,
    Successful,
    Failed,
}

crate::simple_display! {
    SimplifiedStatus {
        Activable => "activable",
        InProgress => "in-progress",
        Successful => "successful",
        Failed => "failed",
    }
}

/// One entry in a node's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at_epoch_ms: u64,
    pub tag: StateTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookkeeping: Option<RunBookkeeping>,
}

/// Error returned when appending an entry would violate the legal-transition
/// table. This is a programming error in the planner, never expected in
/// normal operation (§7).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition: {attempted} cannot follow {actual_predecessor}")]
pub struct IllegalTransition {
    pub attempted: StateTag,
    pub actual_predecessor: StateTag,
}

/// The node's history: an append-only, non-empty sequence of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History(Vec<HistoryEntry>);

impl History {
    /// Start a fresh history in `Passive`.
    pub fn new(at_epoch_ms: u64) -> Self {
        Self(vec![HistoryEntry { at_epoch_ms, tag: StateTag::Passive, log: None, bookkeeping: None }])
    }

    pub fn current(&self) -> &HistoryEntry {
        self.0.last().expect("history is never empty")
    }

    pub fn current_tag(&self) -> StateTag {
        self.current().tag
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Append `tag` if it legally follows the current tag, validating the
    /// §3 transition table (§8 property 1). Returns [`IllegalTransition`]
    /// otherwise — a programming error the caller should treat as fatal.
    pub fn try_push(
        &mut self,
        tag: StateTag,
        at_epoch_ms: u64,
        log: Option<String>,
        bookkeeping: Option<RunBookkeeping>,
    ) -> Result<(), IllegalTransition> {
        let current = self.current_tag();
        if !tag.may_follow(current) {
            return Err(IllegalTransition { attempted: tag, actual_predecessor: current });
        }
        self.0.push(HistoryEntry { at_epoch_ms, tag, log, bookkeeping });
        Ok(())
    }

    /// Derive the [`SimplifiedStatus`] (pure function, §8 property 2).
    pub fn simplify(&self) -> SimplifiedStatus {
        match self.current_tag() {
            StateTag::Passive => SimplifiedStatus::Activable,
            StateTag::VerifiedSuccess | StateTag::AlreadyDone => SimplifiedStatus::Successful,
            StateTag::Finished => match self.entry_before_current() {
                Some(StateTag::VerifiedSuccess) | Some(StateTag::AlreadyDone) => {
                    SimplifiedStatus::Successful
                }
                _ => SimplifiedStatus::Failed,
            },
            tag if tag.is_terminal() => SimplifiedStatus::Failed,
            _ => SimplifiedStatus::InProgress,
        }
    }

    /// The tag of the entry just before the current one, if any. Used to
    /// roll `finished` back up to the outcome it actually finished with.
    fn entry_before_current(&self) -> Option<StateTag> {
        self.0.get(self.0.len().checked_sub(2)?).map(|e| e.tag)
    }

    /// `(time, optional_message, info_strings)` summary of the current entry (§4.1).
    pub fn summary(&self) -> (u64, Option<&str>, Vec<String>) {
        let current = self.current();
        let mut info = vec![current.tag.to_string()];
        if let Some(bk) = &current.bookkeeping {
            info.push(format!("plugin={}", bk.plugin_name));
        }
        (current.at_epoch_ms, current.log.as_deref(), info)
    }

    /// Flatten to `(time, state_name, msg, bookkeeping_msg)` tuples (§4.1),
    /// used by observation UIs and the HTTP state-query endpoint.
    pub fn flatten(&self) -> Vec<(u64, String, Option<String>, Option<String>)> {
        self.0
            .iter()
            .map(|e| {
                let bk_msg = e.bookkeeping.as_ref().map(|bk| bk.plugin_name.clone());
                (e.at_epoch_ms, e.tag.to_string(), e.log.clone(), bk_msg)
            })
            .collect()
    }

    /// The most recent run bookkeeping recorded anywhere in the history, if any.
    pub fn latest_run_parameters(&self) -> Option<&RunBookkeeping> {
        self.0.iter().rev().find_map(|e| e.bookkeeping.as_ref())
    }

    /// How many entries at the tail of the history carry `tag`, counting the
    /// current entry. Used to bound `max_successive_attempts` on states that
    /// retry via a named self-loop tag (`still-building`, `tried-to-start`,
    /// `still-running`, `tried-to-reeval-condition`, `tried-to-kill`).
    pub fn trailing_repeat_count(&self, tag: StateTag) -> u32 {
        self.0.iter().rev().take_while(|e| e.tag == tag).count() as u32
    }
}

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.current_tag())
    }
}
