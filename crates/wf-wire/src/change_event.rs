// SPDX-License-Identifier: MIT

//! `GET /changes` server-sent-event payload (§6, §4.4). Deliberately its own
//! shape rather than a re-export of `wf_storage::ChangeBatch` — this crate
//! does not depend on `wf-storage`, and the wire shape is free to diverge
//! from the in-process coalescing representation (e.g. it carries node ids
//! only, never the rows themselves, to keep SSE frames small).

use serde::{Deserialize, Serialize};
use wf_core::NodeId;

/// One rate-limited batch of changed node ids, as pushed over SSE.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeStreamEvent {
    pub new_ids: Vec<NodeId>,
    pub changed_ids: Vec<NodeId>,
    pub emitted_at_epoch_ms: u64,
}
