// SPDX-License-Identifier: MIT

//! The bundled `local` executor (§1: "the only first-party plugin; LSF,
//! PBS, YARN are out of scope"): runs a node's `build_process` as a child
//! process on the same host the engine runs on.

use crate::error::LocalExecutorError;
use crate::executor::{CheckResult, Executor};
use crate::shell::command_for;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wf_core::{BuildProcess, Node, Outcome, Program, RunBookkeeping};

pub const PLUGIN_NAME: &str = "local";

/// The run parameters a node's `build_process` must carry for the `local`
/// plugin: a program tree to hand to `sh -c`, JSON-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalRunSpec {
    pub program: Program,
}

impl LocalRunSpec {
    pub fn new(program: Program) -> Self {
        Self { program }
    }

    pub fn into_run_parameters(self) -> Vec<u8> {
        serde_json::to_vec(&self).expect("LocalRunSpec always serializes")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LocalBookkeeping {
    pid: u32,
}

/// Spawns and tracks child processes for nodes whose `build_process.plugin_name
/// == "local"`. Bookkeeping only survives within this process instance —
/// a pid handed back after an engine restart is not re-adopted, matching
/// `check`'s contract of returning a recoverable error until reconciled.
pub struct LocalExecutor {
    children: parking_lot::Mutex<HashMap<u32, tokio::process::Child>>,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self { children: parking_lot::Mutex::new(HashMap::new()) }
    }

    fn bookkeeping_of(&self, book: &RunBookkeeping) -> Result<LocalBookkeeping, LocalExecutorError> {
        if book.plugin_name != PLUGIN_NAME {
            return Err(LocalExecutorError::WrongPlugin(book.plugin_name.clone()));
        }
        Ok(serde_json::from_slice(&book.run_parameters)?)
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    fn plugin_name(&self) -> &str {
        PLUGIN_NAME
    }

    async fn start(&self, node: &Node) -> Outcome<RunBookkeeping> {
        let BuildProcess::LongRunning { plugin_name, run_parameters } = &node.build_process else {
            return Outcome::fatal("local executor only starts long_running build processes");
        };
        if plugin_name != PLUGIN_NAME {
            return Outcome::fatal(format!("local executor cannot start plugin {plugin_name}"));
        }
        let spec: LocalRunSpec = match serde_json::from_slice(run_parameters) {
            Ok(spec) => spec,
            Err(e) => return Outcome::fatal(format!("bad run_parameters: {e}")),
        };

        match command_for(&spec.program).spawn() {
            Ok(child) => {
                let pid = child.id().unwrap_or(0);
                self.children.lock().insert(pid, child);
                tracing::info!(pid, node_id = %node.id, "local executor started process");
                let bookkeeping =
                    RunBookkeeping::new(PLUGIN_NAME, serde_json::to_vec(&LocalBookkeeping { pid }).expect("serializes"));
                Outcome::ok(bookkeeping)
            }
            Err(e) => {
                tracing::error!(error = %e, node_id = %node.id, "local executor failed to spawn");
                Outcome::fatal(format!("failed to spawn: {e}"))
            }
        }
    }

    async fn check(&self, bookkeeping: &RunBookkeeping) -> Outcome<CheckResult> {
        let lb = match self.bookkeeping_of(bookkeeping) {
            Ok(lb) => lb,
            Err(e) => return Outcome::fatal(e.to_string()),
        };
        let mut children = self.children.lock();
        match children.get_mut(&lb.pid) {
            None => Outcome::recoverable_with(
                format!("pid {} not tracked by this executor instance", lb.pid),
                bookkeeping.clone(),
            ),
            Some(child) => match child.try_wait() {
                Ok(None) => Outcome::ok(CheckResult::StillRunning(bookkeeping.clone())),
                Ok(Some(status)) => {
                    children.remove(&lb.pid);
                    if status.success() {
                        Outcome::ok(CheckResult::Completed(bookkeeping.clone()))
                    } else {
                        Outcome::fatal(format!("process exited with {status}"))
                    }
                }
                Err(e) => Outcome::recoverable(format!("try_wait failed: {e}")),
            },
        }
    }

    async fn kill(&self, bookkeeping: &RunBookkeeping) -> Outcome<RunBookkeeping> {
        let lb = match self.bookkeeping_of(bookkeeping) {
            Ok(lb) => lb,
            Err(e) => return Outcome::fatal(e.to_string()),
        };
        let mut children = self.children.lock();
        match children.get_mut(&lb.pid) {
            None => Outcome::ok(bookkeeping.clone()),
            Some(child) => match child.start_kill() {
                Ok(()) => Outcome::ok(bookkeeping.clone()),
                Err(e) => Outcome::recoverable(format!("kill failed: {e}")),
            },
        }
    }

    fn serialize(&self, bookkeeping: &RunBookkeeping) -> Outcome<Vec<u8>> {
        match serde_json::to_vec(bookkeeping) {
            Ok(bytes) => Outcome::ok(bytes),
            Err(e) => Outcome::fatal(format!("serialize failed: {e}")),
        }
    }

    fn deserialize(&self, bytes: &[u8]) -> Outcome<RunBookkeeping> {
        match serde_json::from_slice(bytes) {
            Ok(book) => Outcome::ok(book),
            Err(e) => Outcome::fatal(format!("deserialize failed: {e}")),
        }
    }

    async fn query(&self, bookkeeping: &RunBookkeeping, query_name: &str) -> Outcome<String> {
        let lb = match self.bookkeeping_of(bookkeeping) {
            Ok(lb) => lb,
            Err(e) => return Outcome::fatal(e.to_string()),
        };
        match query_name {
            "pid" => Outcome::ok(lb.pid.to_string()),
            other => Outcome::fatal(format!("unknown query {other}")),
        }
    }

    async fn available_queries(&self, _bookkeeping: &RunBookkeeping) -> Outcome<Vec<String>> {
        Outcome::ok(vec!["pid".to_string()])
    }
}
