// SPDX-License-Identifier: MIT

//! Scripted [`Executor`]/[`ConditionEvaluator`] implementations for driving
//! the engine loop in `wf-daemon`'s S1–S6 scenario tests without a real
//! subprocess. Each operation pops the next queued response; a call with
//! nothing queued panics, since a scenario test should script exactly the
//! calls it expects the engine to make (§8).

use crate::executor::{CheckResult, ConditionEvaluator, Executor};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use wf_core::{Condition, Node, Outcome, RunBookkeeping};

pub const FAKE_PLUGIN_NAME: &str = "fake";

#[derive(Default)]
pub struct FakeExecutor {
    starts: Mutex<VecDeque<Outcome<RunBookkeeping>>>,
    checks: Mutex<VecDeque<Outcome<CheckResult>>>,
    kills: Mutex<VecDeque<Outcome<RunBookkeeping>>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_start(&self, outcome: Outcome<RunBookkeeping>) {
        self.starts.lock().push_back(outcome);
    }

    pub fn push_check(&self, outcome: Outcome<CheckResult>) {
        self.checks.lock().push_back(outcome);
    }

    pub fn push_kill(&self, outcome: Outcome<RunBookkeeping>) {
        self.kills.lock().push_back(outcome);
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    fn plugin_name(&self) -> &str {
        FAKE_PLUGIN_NAME
    }

    async fn start(&self, _node: &Node) -> Outcome<RunBookkeeping> {
        self.starts.lock().pop_front().expect("no scripted start() response queued")
    }

    async fn check(&self, _bookkeeping: &RunBookkeeping) -> Outcome<CheckResult> {
        self.checks.lock().pop_front().expect("no scripted check() response queued")
    }

    async fn kill(&self, _bookkeeping: &RunBookkeeping) -> Outcome<RunBookkeeping> {
        self.kills.lock().pop_front().expect("no scripted kill() response queued")
    }

    fn serialize(&self, bookkeeping: &RunBookkeeping) -> Outcome<Vec<u8>> {
        Outcome::ok(serde_json::to_vec(bookkeeping).expect("RunBookkeeping always serializes"))
    }

    fn deserialize(&self, bytes: &[u8]) -> Outcome<RunBookkeeping> {
        match serde_json::from_slice(bytes) {
            Ok(book) => Outcome::ok(book),
            Err(e) => Outcome::fatal(e.to_string()),
        }
    }

    async fn query(&self, _bookkeeping: &RunBookkeeping, _query_name: &str) -> Outcome<String> {
        Outcome::ok(String::new())
    }

    async fn available_queries(&self, _bookkeeping: &RunBookkeeping) -> Outcome<Vec<String>> {
        Outcome::ok(vec![])
    }
}

#[derive(Default)]
pub struct FakeConditionEvaluator {
    responses: Mutex<VecDeque<Outcome<bool>>>,
}

impl FakeConditionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: Outcome<bool>) {
        self.responses.lock().push_back(outcome);
    }
}

#[async_trait]
impl ConditionEvaluator for FakeConditionEvaluator {
    async fn evaluate(&self, _condition: &Condition) -> Outcome<bool> {
        self.responses.lock().pop_front().expect("no scripted evaluate() response queued")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_scripted_responses_in_order() {
        let executor = FakeExecutor::new();
        executor.push_check(Outcome::ok(CheckResult::StillRunning(RunBookkeeping::new("fake", vec![]))));
        executor.push_check(Outcome::ok(CheckResult::Completed(RunBookkeeping::new("fake", vec![]))));

        let book = RunBookkeeping::new("fake", vec![]);
        assert!(matches!(
            executor.check(&book).await,
            Outcome::Ok(CheckResult::StillRunning(_))
        ));
        assert!(matches!(executor.check(&book).await, Outcome::Ok(CheckResult::Completed(_))));
    }
}
