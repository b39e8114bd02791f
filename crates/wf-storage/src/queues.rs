// SPDX-License-Identifier: MIT

//! The two persistent queue tables (§3, §4.3): `add_list` and `kill_list`,
//! both FIFO, indexed by a freshly generated batch id so a drain removes
//! exactly the row it consumed.

use indexmap::IndexMap;
use wf_core::{AddBatchId, KillBatchId, Node, NodeId};

#[derive(Debug, Default)]
pub struct AddQueue(IndexMap<AddBatchId, Vec<Node>>);

impl AddQueue {
    pub fn push(&mut self, nodes: Vec<Node>) -> AddBatchId {
        let id = AddBatchId::new();
        self.0.insert(id, nodes);
        id
    }

    /// FIFO order: oldest-enqueued batch first (§5: "the add-queue is FIFO
    /// per batch").
    pub fn pop_oldest(&mut self) -> Option<(AddBatchId, Vec<Node>)> {
        self.0.shift_remove_index(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct KillQueue(IndexMap<KillBatchId, Vec<NodeId>>);

impl KillQueue {
    pub fn push(&mut self, ids: Vec<NodeId>) -> KillBatchId {
        let id = KillBatchId::new();
        self.0.insert(id, ids);
        id
    }

    pub fn pop_oldest(&mut self) -> Option<(KillBatchId, Vec<NodeId>)> {
        self.0.shift_remove_index(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::BuildProcess;

    #[test]
    fn add_queue_is_fifo() {
        let mut q = AddQueue::default();
        let first = q.push(vec![Node::create("a", BuildProcess::NoOp, None, 0)]);
        let second = q.push(vec![Node::create("b", BuildProcess::NoOp, None, 0)]);
        let (popped, _) = q.pop_oldest().unwrap();
        assert_eq!(popped, first);
        let (popped, _) = q.pop_oldest().unwrap();
        assert_eq!(popped, second);
        assert!(q.is_empty());
    }

    #[test]
    fn kill_queue_is_fifo() {
        let mut q = KillQueue::default();
        let first = q.push(vec![NodeId::new()]);
        let (popped, _) = q.pop_oldest().unwrap();
        assert_eq!(popped, first);
    }
}
