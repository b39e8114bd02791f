// SPDX-License-Identifier: MIT

//! The bundled condition evaluator (§3, §4.6): interprets
//! `volume_exists`/`volume_size_at_least` against the local filesystem and
//! `command_returns` by actually running the command, for conditions whose
//! host reference is local. Remote hosts are out of scope for the bundled
//! evaluator — a real deployment would route those through a different
//! plugin, same as `build_process.plugin_name` routes through the registry.

use crate::executor::ConditionEvaluator;
use crate::shell::command_for;
use async_trait::async_trait;
use wf_core::{Command, Condition, HostRef, Outcome, Volume};

fn is_local(host: &HostRef) -> bool {
    host == &HostRef::local()
}

async fn volume_size(volume: &Volume) -> std::io::Result<u64> {
    let metadata = tokio::fs::metadata(&volume.root_path).await?;
    if metadata.is_file() {
        return Ok(metadata.len());
    }
    let mut total = 0u64;
    let mut stack = vec![std::path::PathBuf::from(&volume.root_path)];
    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                stack.push(entry.path());
            } else {
                total += entry.metadata().await?.len();
            }
        }
    }
    Ok(total)
}

async fn command_succeeds(command: &Command, exit_code: i32) -> std::io::Result<bool> {
    let status = command_for(&command.program).status().await?;
    Ok(status.code() == Some(exit_code))
}

#[derive(Default)]
pub struct LocalConditionEvaluator;

impl LocalConditionEvaluator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConditionEvaluator for LocalConditionEvaluator {
    async fn evaluate(&self, condition: &Condition) -> Outcome<bool> {
        match condition {
            Condition::Satisfied => Outcome::ok(true),
            Condition::Never => Outcome::ok(false),
            Condition::VolumeExists { volume } => {
                if !is_local(&volume.host) {
                    return Outcome::fatal("local condition evaluator only supports local hosts");
                }
                match tokio::fs::metadata(&volume.root_path).await {
                    Ok(_) => Outcome::ok(true),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Outcome::ok(false),
                    Err(e) => Outcome::recoverable(format!("stat failed: {e}")),
                }
            }
            Condition::VolumeSizeAtLeast { volume, bytes } => {
                if !is_local(&volume.host) {
                    return Outcome::fatal("local condition evaluator only supports local hosts");
                }
                match volume_size(volume).await {
                    Ok(size) => Outcome::ok(size >= *bytes),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Outcome::ok(false),
                    Err(e) => Outcome::recoverable(format!("size check failed: {e}")),
                }
            }
            Condition::CommandReturns { command, exit_code } => {
                if !is_local(&command.host) {
                    return Outcome::fatal("local condition evaluator only supports local hosts");
                }
                match command_succeeds(command, *exit_code).await {
                    Ok(matched) => Outcome::ok(matched),
                    Err(e) => Outcome::recoverable(format!("command execution failed: {e}")),
                }
            }
            Condition::AndOf { conditions } => {
                for sub in conditions {
                    match self.evaluate(sub).await {
                        Outcome::Ok(true) => continue,
                        Outcome::Ok(false) => return Outcome::ok(false),
                        other => return other,
                    }
                }
                Outcome::ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn satisfied_is_always_true() {
        let evaluator = LocalConditionEvaluator::new();
        assert_eq!(evaluator.evaluate(&Condition::Satisfied).await, Outcome::ok(true));
    }

    #[tokio::test]
    async fn never_is_always_false() {
        let evaluator = LocalConditionEvaluator::new();
        assert_eq!(evaluator.evaluate(&Condition::Never).await, Outcome::ok(false));
    }

    #[tokio::test]
    async fn volume_exists_checks_the_filesystem() {
        let evaluator = LocalConditionEvaluator::new();
        let tmp = tempfile::tempdir().unwrap();
        let volume = Volume::new(HostRef::local(), tmp.path().to_str().unwrap());
        assert_eq!(
            evaluator.evaluate(&Condition::VolumeExists { volume }).await,
            Outcome::ok(true)
        );

        let missing = Volume::new(HostRef::local(), format!("{}/nope", tmp.path().display()));
        assert_eq!(
            evaluator.evaluate(&Condition::VolumeExists { volume: missing }).await,
            Outcome::ok(false)
        );
    }

    #[tokio::test]
    async fn volume_size_at_least_sums_a_directory_tree() {
        let evaluator = LocalConditionEvaluator::new();
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a"), vec![0u8; 10]).unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub/b"), vec![0u8; 10]).unwrap();

        let volume = Volume::new(HostRef::local(), tmp.path().to_str().unwrap());
        assert_eq!(
            evaluator
                .evaluate(&Condition::VolumeSizeAtLeast { volume: volume.clone(), bytes: 20 })
                .await,
            Outcome::ok(true)
        );
        assert_eq!(
            evaluator.evaluate(&Condition::VolumeSizeAtLeast { volume, bytes: 21 }).await,
            Outcome::ok(false)
        );
    }

    #[tokio::test]
    async fn command_returns_matches_exit_code() {
        let evaluator = LocalConditionEvaluator::new();
        let command = Command::new(HostRef::local(), wf_core::Program::Shell("exit 3".to_string()));
        assert_eq!(
            evaluator.evaluate(&Condition::CommandReturns { command: command.clone(), exit_code: 3 }).await,
            Outcome::ok(true)
        );
        assert_eq!(
            evaluator.evaluate(&Condition::CommandReturns { command, exit_code: 0 }).await,
            Outcome::ok(false)
        );
    }

    #[tokio::test]
    async fn and_of_short_circuits_on_first_false() {
        let evaluator = LocalConditionEvaluator::new();
        let condition = Condition::AndOf {
            conditions: vec![Condition::Never, Condition::Satisfied],
        };
        assert_eq!(evaluator.evaluate(&condition).await, Outcome::ok(false));
    }

    #[tokio::test]
    async fn and_of_is_true_when_every_sub_condition_holds() {
        let evaluator = LocalConditionEvaluator::new();
        let condition = Condition::AndOf {
            conditions: vec![Condition::Satisfied, Condition::Satisfied],
        };
        assert_eq!(evaluator.evaluate(&condition).await, Outcome::ok(true));
    }
}
