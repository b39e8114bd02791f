// SPDX-License-Identifier: MIT

//! Looks up the executor plugin named on a node's `build_process` (§4.6).
//! The engine loop never matches on plugin name itself; it asks the
//! registry and dispatches to whatever comes back.

use crate::executor::Executor;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ExecutorRegistry {
    plugins: HashMap<String, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, executor: Arc<dyn Executor>) {
        self.plugins.insert(executor.plugin_name().to_string(), executor);
    }

    pub fn get(&self, plugin_name: &str) -> Option<Arc<dyn Executor>> {
        self.plugins.get(plugin_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalExecutor;

    #[test]
    fn registers_and_looks_up_by_plugin_name() {
        let mut registry = ExecutorRegistry::new();
        registry.register(Arc::new(LocalExecutor::new()));
        assert!(registry.get("local").is_some());
        assert!(registry.get("lsf").is_none());
    }
}
