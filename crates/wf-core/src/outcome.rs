// SPDX-License-Identifier: MIT

//! The tri-valued result every executor and condition-evaluator operation
//! returns (§4.6, §7): success, a recoverable error that should be retried
//! on the same logical state, or a fatal error that advances the history to
//! a failure state.

use crate::history::RunBookkeeping;
use serde::{Deserialize, Serialize};

/// Result of a single executor or condition-evaluator call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome<T> {
    Ok(T),
    /// Retry later on the same logical state; the attempt counter advances
    /// but the history does not (§4.2, §7).
    RecoverableError { message: String, bookkeeping: Option<RunBookkeeping> },
    /// Advance the history to the appropriate failure state (§4.2, §7).
    FatalError { message: String, bookkeeping: Option<RunBookkeeping> },
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Outcome::Ok(value)
    }

    pub fn recoverable(message: impl Into<String>) -> Self {
        Outcome::RecoverableError { message: message.into(), bookkeeping: None }
    }

    pub fn recoverable_with(message: impl Into<String>, bookkeeping: RunBookkeeping) -> Self {
        Outcome::RecoverableError { message: message.into(), bookkeeping: Some(bookkeeping) }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Outcome::FatalError { message: message.into(), bookkeeping: None }
    }

    pub fn fatal_with(message: impl Into<String>, bookkeeping: RunBookkeeping) -> Self {
        Outcome::FatalError { message: message.into(), bookkeeping: Some(bookkeeping) }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Outcome::RecoverableError { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Outcome::FatalError { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(v) => Outcome::Ok(f(v)),
            Outcome::RecoverableError { message, bookkeeping } => {
                Outcome::RecoverableError { message, bookkeeping }
            }
            Outcome::FatalError { message, bookkeeping } => {
                Outcome::FatalError { message, bookkeeping }
            }
        }
    }
}

/// What happened to a node's history after applying an [`Outcome`] (§4.2):
/// either its history grew by one legal entry, or nothing changed (e.g. a
/// recoverable error that only bumped the attempt counter without touching
/// the history, or a planner decision that required no executor call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Progress {
    Changed,
    Unchanged,
}

impl Progress {
    pub fn changed(self) -> bool {
        matches!(self, Progress::Changed)
    }
}
