// SPDX-License-Identifier: MIT

//! Errors raised while decoding wire DTOs or auth material — never while
//! running the engine itself (that's [`wf_core`]/`wf-planner`/`wf-storage`).

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed request body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unsupported schema version {found}, expected {expected}")]
    SchemaVersion { found: u32, expected: u32 },
    #[error("invalid sync uri: {0}")]
    InvalidSyncUri(String),
}
