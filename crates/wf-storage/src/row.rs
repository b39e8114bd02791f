// SPDX-License-Identifier: MIT

//! The `main` table row shape (§4.3): a stored node plus its compressed
//! `engine_status`, recomputed on every write from the node's history.

use serde::{Deserialize, Serialize};
use wf_core::{SimplifiedStatus, StoredNode};

/// The three-bucket status stored alongside each row for fast filtering
/// (§4.3), distinct from the finer-grained [`SimplifiedStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Passive,
    Active,
    Finished,
}

impl EngineStatus {
    pub fn of(node_status: SimplifiedStatus) -> Self {
        match node_status {
            SimplifiedStatus::Activable => EngineStatus::Passive,
            SimplifiedStatus::InProgress => EngineStatus::Active,
            SimplifiedStatus::Successful | SimplifiedStatus::Failed => EngineStatus::Finished,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub node: StoredNode,
    pub engine_status: EngineStatus,
}

impl Row {
    pub fn inline(node: wf_core::Node) -> Self {
        let engine_status = EngineStatus::of(node.simplify());
        Row { node: StoredNode::Inline(node), engine_status }
    }

    pub fn pointer(id: wf_core::NodeId, points_to: wf_core::NodeId) -> Self {
        // A pointer has no history of its own; it is visible exactly as the
        // node it forwards to, so mark it active until the real status is
        // known via `resolve` (readers always dereference before reporting
        // status to a client).
        Row { node: StoredNode::Pointer { id, points_to }, engine_status: EngineStatus::Active }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_status_compresses_simplified_status() {
        assert_eq!(EngineStatus::of(SimplifiedStatus::Activable), EngineStatus::Passive);
        assert_eq!(EngineStatus::of(SimplifiedStatus::InProgress), EngineStatus::Active);
        assert_eq!(EngineStatus::of(SimplifiedStatus::Successful), EngineStatus::Finished);
        assert_eq!(EngineStatus::of(SimplifiedStatus::Failed), EngineStatus::Finished);
    }
}
