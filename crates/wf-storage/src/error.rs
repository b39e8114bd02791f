// SPDX-License-Identifier: MIT

//! Store error taxonomy (§7): every error carries a location tag plus an
//! exception string, mirroring the teacher's location-tagged store errors
//! (`oj-storage::WalError`).

use wf_core::NodeId;

/// Where a store error originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// A query/transaction failed to execute.
    Exec { query: String, args: String },
    /// Loading persisted state (startup, sync) failed.
    Load { uri: String },
    /// (De)serializing a stored node failed.
    Parse { kind: String },
    /// Closing the store failed.
    Close,
}

impl std::fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreErrorKind::Exec { query, args } => write!(f, "exec({query}, {args})"),
            StoreErrorKind::Load { uri } => write!(f, "load({uri})"),
            StoreErrorKind::Parse { kind } => write!(f, "parse({kind})"),
            StoreErrorKind::Close => write!(f, "close"),
        }
    }
}

/// A store-layer error: location tag plus the underlying message (§7).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn exec(query: impl Into<String>, args: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Exec { query: query.into(), args: args.into() }, message: message.into() }
    }

    pub fn load(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Load { uri: uri.into() }, message: message.into() }
    }

    pub fn parse(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Parse { kind: kind.into() }, message: message.into() }
    }

    pub fn close(message: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Close, message: message.into() }
    }

    /// §7: DB connection/transaction-commit failures are recoverable;
    /// (de)serialization failures are fatal to the affected node only.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind, StoreErrorKind::Exec { .. })
    }
}

/// Raised when a dependency or activation id doesn't resolve to a real node
/// after pointer chasing (§3 invariant).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("node {0} does not exist")]
pub struct UnknownNode(pub NodeId);
