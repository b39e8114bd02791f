// SPDX-License-Identifier: MIT

//! Identifiers for the two persistent queue tables (§3, §4.3): each queued
//! batch — a set of nodes to add, or a set of ids to kill — is indexed by a
//! freshly generated id so a drain can remove exactly the row it consumed.

crate::define_id! {
    /// Row id for one queued batch in `add_list`.
    pub struct AddBatchId("addb");
}

crate::define_id! {
    /// Row id for one queued id-set in `kill_list`.
    pub struct KillBatchId("kilb");
}
