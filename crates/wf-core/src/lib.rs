// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wf-core: node model, history state machine, and shared domain types for
//! the workflow engine (component C1 of the specification).

pub mod macros;

pub mod clock;
pub mod condition;
pub mod history;
pub mod id;
pub mod node;
pub mod outcome;
pub mod queue_ids;
pub mod retries;
pub mod stored;

pub use clock::{Clock, FakeClock, SystemClock};
pub use condition::{Command, Condition, HostRef, Program, Volume};
pub use history::{
    History, HistoryEntry, IllegalTransition, RunBookkeeping, SimplifiedStatus, StateTag,
};
pub use node::{
    ActivateOnNonPassive, ActivationReason, BuildProcess, EquivalencePolicy, Node, NodeId,
};
pub use outcome::{Outcome, Progress};
pub use queue_ids::{AddBatchId, KillBatchId};
pub use retries::RetryTracker;
pub use stored::{resolve, PointerChainTooLong, StoredNode, MAX_POINTER_HOPS};
