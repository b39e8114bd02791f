// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wf-storage: relational-shaped persistence, the in-memory cache it doubles
//! as, and the rate-limited change stream built on top of it (components C3
//! and C4 of the specification).

mod change;
mod error;
mod queues;
mod row;
mod store;
mod sync;

pub use change::{ChangeBatch, ChangeBus, ChangeEvent, Coalescer};
pub use error::{StoreError, StoreErrorKind, UnknownNode};
pub use queues::{AddQueue, KillQueue};
pub use row::{EngineStatus, Row};
pub use store::Store;
pub use sync::{copy, Destination, Source, SyncError};
