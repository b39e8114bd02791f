// SPDX-License-Identifier: MIT

//! Errors raised by the bundled `local` executor and condition evaluator
//! before they ever reach an [`wf_core::Outcome`] — process spawn failures,
//! bad bookkeeping bytes, and the like.

#[derive(Debug, thiserror::Error)]
pub enum LocalExecutorError {
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("bookkeeping does not belong to the local executor (plugin {0})")]
    WrongPlugin(String),
    #[error("malformed bookkeeping: {0}")]
    Bookkeeping(#[from] serde_json::Error),
}
