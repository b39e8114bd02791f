// SPDX-License-Identifier: MIT

//! Attempt-count tracking for logical states that retry without growing the
//! history (§4.2: a recoverable error on a state with no named self-loop
//! tag "loops on the same logical state" rather than appending an entry).
//!
//! Mirrors the teacher's action-attempt tracker, keyed by [`StateTag`]
//! instead of a `(trigger, chain_position)` string (SPEC_FULL.md §C).

use crate::history::StateTag;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryTracker {
    #[serde(default)]
    attempts: HashMap<StateTag, u32>,
}

impl RetryTracker {
    /// Increment and return the new attempt count for `tag`.
    pub fn increment(&mut self, tag: StateTag) -> u32 {
        let count = self.attempts.entry(tag).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get(&self, tag: StateTag) -> u32 {
        self.attempts.get(&tag).copied().unwrap_or(0)
    }

    /// Clear the counter for `tag`, called once the node moves past it.
    pub fn reset(&mut self, tag: StateTag) {
        self.attempts.remove(&tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_independently_per_tag() {
        let mut t = RetryTracker::default();
        assert_eq!(t.increment(StateTag::EvaluatingCondition), 1);
        assert_eq!(t.increment(StateTag::EvaluatingCondition), 2);
        assert_eq!(t.get(StateTag::Building), 0);
    }

    #[test]
    fn reset_clears_the_counter() {
        let mut t = RetryTracker::default();
        t.increment(StateTag::EvaluatingCondition);
        t.reset(StateTag::EvaluatingCondition);
        assert_eq!(t.get(StateTag::EvaluatingCondition), 0);
    }
}
