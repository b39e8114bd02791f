// SPDX-License-Identifier: MIT

//! Request bodies for the HTTP API (§6).

use serde::{Deserialize, Serialize};
use wf_core::{NodeId, StoredNode};

/// `POST /add-nodes` body: "a JSON array of stored-node shapes" (§6). In
/// practice a client only ever submits [`StoredNode::Inline`] — pointers are
/// created by the engine's own equivalence fold, never by a submitter — but
/// the wire shape follows the spec literally so the server can reject a
/// submitted pointer with a clear decode-adjacent error instead of a
/// silent type mismatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNodesRequest(pub Vec<StoredNode>);

/// `POST /kill` body: a JSON array of ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillRequest(pub Vec<NodeId>);

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::{BuildProcess, Node};

    #[test]
    fn add_nodes_request_round_trips() {
        let node = Node::create("n", BuildProcess::NoOp, None, 0);
        let request = AddNodesRequest(vec![StoredNode::Inline(node)]);
        let json = serde_json::to_string(&request).unwrap();
        let back: AddNodesRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.0.len(), 1);
    }

    #[test]
    fn kill_request_is_a_bare_id_array() {
        let id: NodeId = Node::create("n", BuildProcess::NoOp, None, 0).id;
        let request = KillRequest(vec![id]);
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.starts_with('['));
    }
}
