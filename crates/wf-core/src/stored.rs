// SPDX-License-Identifier: MIT

//! The wire/DB form of a node (§3): either the node itself, or a pointer
//! forwarding all queries to another id (equivalence dedup, §4.1).

use crate::node::{Node, NodeId};
use serde::{Deserialize, Serialize};

/// A stored row: either an inline node, or a pointer to the node it is
/// equivalent to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredNode {
    Inline(Node),
    Pointer { id: NodeId, points_to: NodeId },
}

impl StoredNode {
    pub fn id(&self) -> NodeId {
        match self {
            StoredNode::Inline(node) => node.id,
            StoredNode::Pointer { id, .. } => *id,
        }
    }

    pub fn as_inline(&self) -> Option<&Node> {
        match self {
            StoredNode::Inline(node) => Some(node),
            StoredNode::Pointer { .. } => None,
        }
    }

    pub fn as_inline_mut(&mut self) -> Option<&mut Node> {
        match self {
            StoredNode::Inline(node) => Some(node),
            StoredNode::Pointer { .. } => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, StoredNode::Pointer { .. })
    }
}

/// Maximum number of pointer hops to follow before declaring a fatal cycle
/// (§3: "Dereference follows at most a bounded chain (≤ 1000 hops; cycle ⇒
/// fatal)").
pub const MAX_POINTER_HOPS: usize = 1000;

/// Raised when a pointer chain exceeds [`MAX_POINTER_HOPS`]. Per §3/§7 this
/// can only happen if a cycle was persisted, which is itself a programming
/// error — pointer targets must predate the pointer by construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("pointer chain from {start} exceeded {MAX_POINTER_HOPS} hops (cycle?)")]
pub struct PointerChainTooLong {
    pub start: NodeId,
}

/// Resolve a pointer chain down to an inline node, given a lookup function.
///
/// Generic over the lookup so both the cache (C4) and the store (C3) can
/// reuse the exact same bounded-hop algorithm (§8 property 3).
pub fn resolve<F>(start: NodeId, mut lookup: F) -> Result<Option<StoredNode>, PointerChainTooLong>
where
    F: FnMut(NodeId) -> Option<StoredNode>,
{
    let mut current = start;
    for _ in 0..MAX_POINTER_HOPS {
        match lookup(current) {
            None => return Ok(None),
            Some(StoredNode::Pointer { points_to, .. }) => current = points_to,
            Some(inline @ StoredNode::Inline(_)) => return Ok(Some(inline)),
        }
    }
    Err(PointerChainTooLong { start })
}
