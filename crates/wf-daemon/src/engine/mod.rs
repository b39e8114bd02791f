// SPDX-License-Identifier: MIT

//! The engine loop (C5, §4.5): drain kills, drain adds, advance every
//! in-progress node, then let the caller decide how long to sleep before
//! the next tick. Ticking is idempotent under crash-restart because every
//! step is a single transactional store mutation (§4.5, §8 property 7).

mod dispatch;

use crate::config::EngineConfig;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use wf_core::{Clock, Node, NodeId};
use wf_executors::{ConditionEvaluator, ExecutorRegistry};
use wf_planner::{exceeded, plan};
use wf_storage::{ChangeBus, Store};

/// What a single tick actually did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub killed: Vec<NodeId>,
    pub added: Vec<NodeId>,
    pub advanced: usize,
}

pub struct Engine<C: Clock> {
    store: Arc<Store>,
    bus: Arc<ChangeBus>,
    executors: Arc<ExecutorRegistry>,
    conditions: Arc<dyn ConditionEvaluator>,
    clock: C,
    config: EngineConfig,
}

impl<C: Clock> Engine<C> {
    pub fn new(
        store: Arc<Store>,
        bus: Arc<ChangeBus>,
        executors: Arc<ExecutorRegistry>,
        conditions: Arc<dyn ConditionEvaluator>,
        clock: C,
        config: EngineConfig,
    ) -> Self {
        Self { store, bus, executors, conditions, clock, config }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<ChangeBus> {
        &self.bus
    }

    /// Run one full tick (§4.5 steps 1-3). Step 4 (sleeping) is the caller's
    /// job, since standalone/server mode want different wake-up sources.
    pub async fn tick(&self) -> TickReport {
        if self.config.read_only_mode {
            return TickReport::default();
        }

        let killed = self.store.drain_kills(self.clock.epoch_ms(), &self.bus).unwrap_or_default();
        let added = self.store.drain_adds(&self.bus).unwrap_or_default();
        let advanced = self.advance_actives().await;

        TickReport { killed, added, advanced }
    }

    async fn advance_actives(&self) -> usize {
        let mut actives = Vec::new();
        self.store.for_each_active(|n| actives.push(n.clone()));

        let concurrency = self.config.concurrent_steps.max(1);
        let host_timeout = Duration::from_secs(self.config.host_timeout_upper_bound_secs);

        let changed: Vec<bool> = stream::iter(actives)
            .map(|node| self.advance_one(node, host_timeout))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        changed.into_iter().filter(|c| *c).count()
    }

    async fn advance_one(&self, mut node: Node, host_timeout: Duration) -> bool {
        let epoch_ms = self.clock.epoch_ms();

        if exceeded(&node, self.config.max_successive_attempts) {
            dispatch::force_failed(&mut node, epoch_ms);
            let _ = self.store.update(node, &self.bus);
            return true;
        }

        let action = plan(&node);
        let progress = dispatch::dispatch(
            &mut node,
            action,
            epoch_ms,
            host_timeout,
            self.executors.as_ref(),
            self.conditions.as_ref(),
            self.store.as_ref(),
        )
        .await;

        if progress {
            let _ = self.store.update(node, &self.bus);
        }
        progress
    }
}

// Re-exported so `wf-daemon`'s http layer and tests can build an engine
// without reaching into `dispatch` directly.
pub use dispatch::CheckDepsError;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wf_core::{BuildProcess, FakeClock};
    use wf_executors::test_support::{FakeConditionEvaluator, FakeExecutor};
    use wf_executors::ExecutorRegistry;

    fn engine(
        store: Arc<Store>,
        executors: Arc<ExecutorRegistry>,
        conditions: Arc<dyn ConditionEvaluator>,
    ) -> Engine<FakeClock> {
        Engine::new(
            store,
            Arc::new(ChangeBus::inert()),
            executors,
            conditions,
            FakeClock::new(),
            EngineConfig::for_tests("backup:/tmp/does-not-matter"),
        )
    }

    #[tokio::test]
    async fn no_op_node_runs_to_verified_success_over_several_ticks() {
        let store = Arc::new(Store::new());
        let bus_for_setup = ChangeBus::inert();
        let mut node = Node::create("n", BuildProcess::NoOp, None, 0);
        node.activate(wf_core::ActivationReason::User, 0).unwrap();
        let id = node.id;
        store.update(node, &bus_for_setup).unwrap();

        let executors = Arc::new(ExecutorRegistry::new());
        let conditions: Arc<dyn ConditionEvaluator> = Arc::new(FakeConditionEvaluator::new());
        let engine = engine(store.clone(), executors, conditions);

        // active -> evaluating-condition -> building -> starting ->
        // successfully-did-nothing -> verified-success -> (Activate) finished
        for _ in 0..8 {
            engine.tick().await;
            if store.get(id).unwrap().unwrap().simplify() != wf_core::SimplifiedStatus::InProgress {
                break;
            }
        }
        let finished = store.get(id).unwrap().unwrap();
        assert_eq!(finished.history.current_tag(), wf_core::StateTag::Finished);
    }

    #[tokio::test]
    async fn activating_a_node_wakes_its_success_dependent() {
        let store = Arc::new(Store::new());
        let bus = ChangeBus::inert();

        let dependent = Node::create("dep", BuildProcess::NoOp, None, 0);
        let dependent_id = dependent.id;
        store.force_insert_passive(dependent);

        let mut root = Node::create("root", BuildProcess::NoOp, None, 0);
        root.on_success_activate = vec![dependent_id];
        root.activate(wf_core::ActivationReason::User, 0).unwrap();
        store.update(root, &bus).unwrap();

        let executors = Arc::new(ExecutorRegistry::new());
        let conditions: Arc<dyn ConditionEvaluator> = Arc::new(FakeConditionEvaluator::new());
        let engine = engine(store.clone(), executors, conditions);

        for _ in 0..8 {
            engine.tick().await;
        }

        let dep_after = store.get(dependent_id).unwrap().unwrap();
        assert_ne!(dep_after.history.current_tag(), wf_core::StateTag::Passive);
    }

    #[tokio::test]
    async fn exceeding_max_successive_attempts_forces_a_failure() {
        let store = Arc::new(Store::new());
        let bus = ChangeBus::inert();
        let build = BuildProcess::LongRunning { plugin_name: "fake".into(), run_parameters: vec![] };
        let mut node = Node::create("n", build, None, 0);
        node.activate(wf_core::ActivationReason::User, 0).unwrap();
        let id = node.id;
        store.update(node, &bus).unwrap();

        let fake_executor = Arc::new(FakeExecutor::new());
        for _ in 0..12 {
            fake_executor.push_start(wf_core::Outcome::recoverable("flaky"));
        }
        let mut registry = ExecutorRegistry::new();
        registry.register(fake_executor);
        let executors = Arc::new(registry);
        let conditions: Arc<dyn ConditionEvaluator> = Arc::new(FakeConditionEvaluator::new());

        let mut engine = engine(store.clone(), executors, conditions);
        engine.config.max_successive_attempts = 2;

        for _ in 0..20 {
            engine.tick().await;
            if store.get(id).unwrap().unwrap().simplify() != wf_core::SimplifiedStatus::InProgress {
                break;
            }
        }

        let after = store.get(id).unwrap().unwrap();
        assert_eq!(after.simplify(), wf_core::SimplifiedStatus::Failed);
    }
}
