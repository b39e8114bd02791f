// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wf-planner: the pure transition planner (component C2). `plan` maps a
//! node's current state to the one [`Action`] the engine should take next;
//! the `apply_*` functions fold the executor's [`wf_core::Outcome`] for that
//! action back into the node's history. Neither side ever talks to an
//! executor, a clock, or storage directly — this crate only knows state.

mod action;
mod apply;
mod bound;
mod plan;

pub use action::{Action, InlineTransition};
pub use apply::{
    apply_activate, apply_check_deps, apply_check_process, apply_eval_condition,
    apply_inline, apply_kill, apply_start_running, DepsCheck, ProcessCheck,
};
pub use bound::{exceeded, successive_attempts};
pub use plan::plan;
