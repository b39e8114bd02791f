// SPDX-License-Identifier: MIT

//! Response bodies for the HTTP API (§6).

use serde::{Deserialize, Serialize};
use wf_core::{Node, NodeId};

/// `POST /add-nodes` response: ids assigned to the submitted batch, in
/// submission order — a pointer's id for any node the equivalence fold
/// collapsed onto an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNodesResponse {
    pub ids: Vec<NodeId>,
}

/// `POST /kill` response: ack only (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillResponse {
    pub acknowledged: bool,
}

impl KillResponse {
    pub fn ack() -> Self {
        Self { acknowledged: true }
    }
}

/// `GET /target/{id}` response: "the full node plus full history" (§6).
/// [`Node`] already embeds its [`wf_core::History`], so this wrapper exists
/// to give the endpoint its own stable wire shape independent of `Node`'s
/// internal layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetResponse {
    pub node: Node,
}
