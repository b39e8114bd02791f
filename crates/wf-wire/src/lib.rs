// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wf-wire: DTOs for the HTTP API, the sync URI schemes, and bearer token
//! auth (§6). Pure data and parsing — no transport, no I/O — so `wf-daemon`
//! and `wf-cli` can share one definition of the wire shapes without either
//! depending on the other.

mod auth;
mod change_event;
mod error;
mod requests;
mod responses;
mod sync_uri;
mod version;

pub use auth::TokenTable;
pub use change_event::ChangeStreamEvent;
pub use error::WireError;
pub use requests::{AddNodesRequest, KillRequest};
pub use responses::{AddNodesResponse, KillResponse, TargetResponse};
pub use sync_uri::SyncUri;
pub use version::{Envelope, CURRENT_SCHEMA_VERSION};
