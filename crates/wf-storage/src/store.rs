// SPDX-License-Identifier: MIT

//! The `main` table plus its queues (§4.3), the in-memory cache warmed from
//! it (§4.4), and the single-writer discipline required by §5: every
//! mutating method takes the one process-wide lock.

use crate::change::{ChangeBus, ChangeEvent};
use crate::error::StoreError;
use crate::queues::{AddQueue, KillQueue};
use crate::row::{EngineStatus, Row};
use indexmap::IndexMap;
use wf_core::{AddBatchId, KillBatchId, Node, NodeId, StateTag, StoredNode};

#[derive(Default)]
struct StoreInner {
    main: IndexMap<NodeId, Row>,
    add_queue: AddQueue,
    kill_queue: KillQueue,
}

impl StoreInner {
    fn lookup(&self, id: NodeId) -> Option<StoredNode> {
        self.main.get(&id).map(|row| row.node.clone())
    }

    fn resolve(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        let resolved = wf_core::resolve(id, |i| self.lookup(i))
            .map_err(|e| StoreError::parse("pointer-chain", e.to_string()))?;
        Ok(resolved.and_then(|sn| sn.as_inline().cloned()))
    }
}

/// The relational-shaped store (§4.3): `main`, `add_list`, `kill_list`,
/// guarded by a single write lock (§5: single-writer, multi-reader).
pub struct Store {
    inner: parking_lot::Mutex<StoreInner>,
}

impl Store {
    pub fn new() -> Self {
        Self { inner: parking_lot::Mutex::new(StoreInner::default()) }
    }

    /// Follow the pointer chain to the inline node, if any (§4.3 `get`).
    pub fn get(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        self.inner.lock().resolve(id)
    }

    /// Overwrite a node's stored row and recompute `engine_status`,
    /// publishing a `nodes_changed` event (§4.3 `update`).
    pub fn update(&self, node: Node, bus: &ChangeBus) -> Result<(), StoreError> {
        let id = node.id;
        self.inner.lock().main.insert(id, Row::inline(node));
        bus.publish(ChangeEvent::NodesChanged(vec![id]));
        Ok(())
    }

    /// Call `f` for every inline node the engine still needs to tick (§4.3
    /// `for_each_active`). This is `history.current_tag() != finished`, not
    /// `engine_status == active`: a node that just reached `verified-success`
    /// or a failure terminal has `engine_status::finished` already (its
    /// `SimplifiedStatus` is decided), but its history hasn't taken the
    /// `Activate` step yet, so it still needs exactly one more tick to wake
    /// its dependents and append the `finished` entry.
    pub fn for_each_active(&self, mut f: impl FnMut(&Node)) {
        let inner = self.inner.lock();
        for row in inner.main.values() {
            if let Some(node) = row.node.as_inline() {
                if node.history.current_tag() != StateTag::Finished {
                    f(node);
                }
            }
        }
    }

    /// Every stored row, inline or pointer (§4.3 `all_visible`).
    pub fn all_visible(&self) -> Vec<StoredNode> {
        self.inner.lock().main.values().map(|row| row.node.clone()).collect()
    }

    /// Every inline node that isn't finished yet (§4.3 `all_active_and_passive`);
    /// used both to warm the C4 cache and as equivalence candidates for `drain_adds`.
    pub fn all_active_and_passive(&self) -> Vec<Node> {
        self.inner
            .lock()
            .main
            .values()
            .filter(|row| row.engine_status != EngineStatus::Finished)
            .filter_map(|row| row.node.as_inline().cloned())
            .collect()
    }

    pub fn queue_adds(&self, nodes: Vec<Node>) -> AddBatchId {
        self.inner.lock().add_queue.push(nodes)
    }

    pub fn queue_kills(&self, ids: Vec<NodeId>) -> KillBatchId {
        self.inner.lock().kill_queue.push(ids)
    }

    /// Drain one queued kill batch (§4.5 step 1): resolve each id through
    /// its pointer chain, apply `Node::kill`, write back, and emit
    /// `nodes_changed` for every node whose history actually moved. Returns
    /// `None` if the kill queue was empty.
    pub fn drain_kills(&self, epoch_ms: u64, bus: &ChangeBus) -> Option<Vec<NodeId>> {
        let mut inner = self.inner.lock();
        let (_batch_id, ids) = inner.kill_queue.pop_oldest()?;
        let mut changed = Vec::new();
        for id in ids {
            let Ok(Some(resolved_id)) = inner.resolve(id).map(|n| n.map(|n| n.id)) else {
                continue;
            };
            if let Some(row) = inner.main.get_mut(&resolved_id) {
                if let Some(node) = row.node.as_inline_mut() {
                    if node.kill(epoch_ms).is_some() {
                        row.engine_status = EngineStatus::of(node.simplify());
                        changed.push(resolved_id);
                    }
                }
            }
        }
        if !changed.is_empty() {
            bus.publish(ChangeEvent::NodesChanged(changed.clone()));
        }
        Some(changed)
    }

    /// Drain one queued add batch (§4.5 step 2): fold left-to-right against
    /// the current live set plus nodes already decided earlier in this same
    /// batch, turning each equivalence match into a pointer. Returns `None`
    /// if the add queue was empty.
    pub fn drain_adds(&self, bus: &ChangeBus) -> Option<Vec<NodeId>> {
        let mut inner = self.inner.lock();
        let (_batch_id, nodes) = inner.add_queue.pop_oldest()?;

        let existing: Vec<Node> = inner
            .main
            .values()
            .filter(|row| row.engine_status != EngineStatus::Finished)
            .filter_map(|row| row.node.as_inline().cloned())
            .collect();
        let mut decided_inline: Vec<Node> = Vec::new();
        let mut new_ids = Vec::with_capacity(nodes.len());

        for incoming in nodes {
            let target =
                existing.iter().chain(decided_inline.iter()).find(|c| incoming.is_equivalent(c));
            let id = incoming.id;
            match target {
                Some(target) => {
                    inner.main.insert(id, Row::pointer(id, target.id));
                }
                None => {
                    inner.main.insert(id, Row::inline(incoming.clone()));
                    decided_inline.push(incoming);
                }
            }
            new_ids.push(id);
        }

        bus.publish(ChangeEvent::NewNodes(new_ids.clone()));
        Some(new_ids)
    }

    /// Backdoor used by `sync` (§4.3): insert a node verbatim, bypassing the
    /// add queue and equivalence fold. Callers are responsible for only
    /// using this on nodes that are actually passive (freshly copied from
    /// another store).
    pub fn force_insert_passive(&self, node: Node) {
        let id = node.id;
        self.inner.lock().main.insert(id, Row::inline(node));
    }

    /// Every stored row as-is, engine_status included (§4.3 sync: "preserving
    /// ... engine statuses"). Used by [`crate::sync::copy`] to stream a store
    /// out to a backup, or enumerate one to restore from.
    pub fn all_rows(&self) -> Vec<Row> {
        self.inner.lock().main.values().cloned().collect()
    }

    /// Insert a row exactly as given, recomputing nothing. Used by
    /// [`crate::sync::copy`] to restore a backup without re-deriving
    /// `engine_status` from a history that may belong to a pointer.
    pub fn force_insert_row(&self, row: Row) {
        let id = row.node.id();
        self.inner.lock().main.insert(id, row);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeBus;
    use wf_core::{ActivationReason, BuildProcess, Condition};

    fn bus() -> ChangeBus {
        ChangeBus::inert()
    }

    #[test]
    fn queue_adds_then_drain_inserts_inline_node() {
        let store = Store::new();
        let bus = bus();
        let node = Node::create("a", BuildProcess::NoOp, None, 0);
        let id = node.id;
        store.queue_adds(vec![node]);
        let new_ids = store.drain_adds(&bus).unwrap();
        assert_eq!(new_ids, vec![id]);
        let fetched = store.get(id).unwrap().unwrap();
        assert_eq!(fetched.id, id);
    }

    #[test]
    fn equivalent_node_becomes_a_pointer() {
        let store = Store::new();
        let bus = bus();
        let cond = Condition::Satisfied;
        let mut a = Node::create("a", BuildProcess::NoOp, Some(cond.clone()), 0);
        a.equivalence_policy = wf_core::EquivalencePolicy::SameActiveCondition;
        let a_id = a.id;
        store.queue_adds(vec![a]);
        store.drain_adds(&bus).unwrap();

        let mut b = Node::create("b", BuildProcess::NoOp, Some(cond), 0);
        b.equivalence_policy = wf_core::EquivalencePolicy::SameActiveCondition;
        let b_id = b.id;
        store.queue_adds(vec![b]);
        store.drain_adds(&bus).unwrap();

        let via_b = store.get(b_id).unwrap().unwrap();
        assert_eq!(via_b.id, a_id);

        let inline_count =
            store.all_visible().iter().filter(|sn| matches!(sn, StoredNode::Inline(_))).count();
        assert_eq!(inline_count, 1);
    }

    #[test]
    fn drain_kills_transitions_killable_node_to_killing() {
        let store = Store::new();
        let bus = bus();
        let mut node = Node::create("a", BuildProcess::NoOp, None, 0);
        node.activate(ActivationReason::User, 1).unwrap();
        let id = node.id;
        store.update(node, &bus).unwrap();

        store.queue_kills(vec![id]);
        let changed = store.drain_kills(2, &bus).unwrap();
        assert_eq!(changed, vec![id]);
        let after = store.get(id).unwrap().unwrap();
        assert_eq!(after.history.current_tag(), wf_core::StateTag::Killing);
    }

    #[test]
    fn drain_kills_on_non_killable_node_changes_nothing() {
        let store = Store::new();
        let bus = bus();
        let node = Node::create("a", BuildProcess::NoOp, Some(Condition::Satisfied), 0);
        let id = node.id;
        store.queue_adds(vec![node]);
        store.drain_adds(&bus).unwrap();

        // Drive it all the way to `finished`.
        let mut n = store.get(id).unwrap().unwrap();
        n.activate(ActivationReason::User, 1).unwrap();
        n.history.try_push(wf_core::StateTag::EvaluatingCondition, 2, None, None).unwrap();
        n.history.try_push(wf_core::StateTag::AlreadyDone, 3, None, None).unwrap();
        n.history.try_push(wf_core::StateTag::Finished, 4, None, None).unwrap();
        store.update(n, &bus).unwrap();

        store.queue_kills(vec![id]);
        let changed = store.drain_kills(5, &bus).unwrap();
        assert!(changed.is_empty());
    }
}
