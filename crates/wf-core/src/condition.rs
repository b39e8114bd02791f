// SPDX-License-Identifier: MIT

//! Conditions (§3): predicates evaluated to decide whether a node's work is
//! needed, and again afterward to verify it actually happened. The engine
//! never interprets a condition beyond its tag — it hands the whole tree to
//! a condition evaluator (an executor-adjacent plugin, §4.6) and only
//! branches on the [`crate::outcome::Outcome`] that comes back.

use serde::{Deserialize, Serialize};

/// A reference to a host a volume or command lives on.
///
/// Opaque to the core: two hosts compare equal iff their references are
/// structurally equal, which is all equivalence checking (§4.1) needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRef(pub String);

impl HostRef {
    pub fn local() -> Self {
        Self("localhost".to_string())
    }
}

/// A root path on a host plus (conceptually) the file tree beneath it.
///
/// The engine only needs the reference for equality and for handing to an
/// evaluator plugin; it never walks the tree itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub host: HostRef,
    pub root_path: String,
}

impl Volume {
    pub fn new(host: HostRef, root_path: impl Into<String>) -> Self {
        Self { host, root_path: root_path.into() }
    }
}

/// A program tree submitted to a command evaluator. Deliberately small:
/// the embeddable workflow DSL (out of scope, §1) is where a full shell
/// grammar would belong; the core only needs enough structure to express
/// "run this, in this order, on this host."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Program {
    /// Run through the host's shell (`/bin/sh -c "..."`).
    Shell(String),
    /// Exec a program directly, argv-style, no shell involved.
    Exec(Vec<String>),
    /// Run each sub-program in order; fails on the first failure.
    Sequence(Vec<Program>),
}

/// A command: a host reference plus the program to run there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub host: HostRef,
    pub program: Program,
}

impl Command {
    pub fn new(host: HostRef, program: Program) -> Self {
        Self { host, program }
    }
}

/// Tagged-union condition tree (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Never runs: the node is considered done on arrival.
    Satisfied,
    /// Always runs: the node is never considered done without doing work.
    Never,
    VolumeExists { volume: Volume },
    VolumeSizeAtLeast { volume: Volume, bytes: u64 },
    CommandReturns { command: Command, exit_code: i32 },
    AndOf { conditions: Vec<Condition> },
}

impl Condition {
    /// Structural equality used for equivalence checking at submission time
    /// (§4.1, §3). `Condition` already derives `PartialEq`; this exists as a
    /// documented name at the call sites that care about the invariant.
    pub fn structurally_equal(&self, other: &Condition) -> bool {
        self == other
    }

    /// Whether this condition is the "no condition present" shorthand used
    /// by the planner's no-condition fast paths (§4.2): `Satisfied` is an
    /// explicit predicate, not the *absence* of one, so it does not count.
    pub fn is_none(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_conditions_are_structurally_equal() {
        let a = Condition::VolumeExists { volume: Volume::new(HostRef::local(), "/data") };
        let b = Condition::VolumeExists { volume: Volume::new(HostRef::local(), "/data") };
        assert!(a.structurally_equal(&b));
    }

    #[test]
    fn different_conditions_are_not_equal() {
        let a = Condition::VolumeExists { volume: Volume::new(HostRef::local(), "/data") };
        let b = Condition::VolumeExists { volume: Volume::new(HostRef::local(), "/other") };
        assert!(!a.structurally_equal(&b));
    }
}
