// SPDX-License-Identifier: MIT

//! Configuration (§6): a single file selecting one of three profiles —
//! `standalone` (engine only), `server` (engine + HTTP API), `client` (a
//! remote server's URL and token). Deserialized from TOML, the teacher's
//! structured-config format (grounded on the pack's other examples, which
//! use `toml` + `serde` for this rather than a bespoke parser).

use serde::Deserialize;
use std::path::PathBuf;

fn default_host_timeout_upper_bound_secs() -> u64 {
    60
}

fn default_max_successive_attempts() -> u32 {
    10
}

fn default_concurrent_steps() -> usize {
    4
}

fn default_max_blocking_time_secs() -> u64 {
    300
}

fn default_block_step_time_secs() -> u64 {
    3
}

/// Engine tunables shared by every profile (§6).
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub database_uri: String,

    #[serde(default = "default_host_timeout_upper_bound_secs")]
    pub host_timeout_upper_bound_secs: u64,

    #[serde(default = "default_max_successive_attempts")]
    pub max_successive_attempts: u32,

    #[serde(default = "default_concurrent_steps")]
    pub concurrent_steps: usize,

    #[serde(default = "default_max_blocking_time_secs")]
    pub max_blocking_time_secs: u64,

    #[serde(default = "default_block_step_time_secs")]
    pub block_step_time_secs: u64,

    #[serde(default)]
    pub read_only_mode: bool,
}

impl EngineConfig {
    #[cfg(any(test, feature = "test-support"))]
    pub fn for_tests(database_uri: impl Into<String>) -> Self {
        Self {
            database_uri: database_uri.into(),
            host_timeout_upper_bound_secs: default_host_timeout_upper_bound_secs(),
            max_successive_attempts: default_max_successive_attempts(),
            concurrent_steps: default_concurrent_steps(),
            max_blocking_time_secs: default_max_blocking_time_secs(),
            block_step_time_secs: default_block_step_time_secs(),
            read_only_mode: false,
        }
    }
}

/// How the HTTP API, if any, is exposed (§6: "TCP port or TLS(cert, key, port)").
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindConfig {
    Tcp { port: u16 },
    Tls { cert: PathBuf, key: PathBuf, port: u16 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: BindConfig,
    pub token_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub url: String,
    pub token: String,
}

/// One of the three runtime profiles (§6).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "profile", rename_all = "snake_case")]
pub enum Profile {
    Standalone { engine: EngineConfig },
    Server { engine: EngineConfig, server: ServerConfig },
    Client(ClientConfig),
}

impl Profile {
    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn engine(&self) -> Option<&EngineConfig> {
        match self {
            Profile::Standalone { engine } | Profile::Server { engine, .. } => Some(engine),
            Profile::Client(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standalone_profile_with_defaults() {
        let profile = Profile::parse(
            r#"
            profile = "standalone"
            [engine]
            database_uri = "backup:/var/wf/data"
            "#,
        )
        .unwrap();
        let engine = profile.engine().unwrap();
        assert_eq!(engine.max_successive_attempts, 10);
        assert_eq!(engine.concurrent_steps, 4);
        assert!(!engine.read_only_mode);
    }

    #[test]
    fn parses_server_profile_with_tls_bind() {
        let profile = Profile::parse(
            r#"
            profile = "server"
            [engine]
            database_uri = "backup:/var/wf/data"
            [server]
            token_file = "/etc/wf/tokens"
            [server.bind]
            kind = "tls"
            cert = "/etc/wf/cert.pem"
            key = "/etc/wf/key.pem"
            port = 8443
            "#,
        )
        .unwrap();
        match profile {
            Profile::Server { server, .. } => match server.bind {
                BindConfig::Tls { port, .. } => assert_eq!(port, 8443),
                BindConfig::Tcp { .. } => panic!("expected tls bind"),
            },
            _ => panic!("expected server profile"),
        }
    }

    #[test]
    fn parses_client_profile() {
        let profile = Profile::parse(
            r#"
            profile = "client"
            url = "https://wf.example.com"
            token = "abc123"
            "#,
        )
        .unwrap();
        assert!(matches!(profile, Profile::Client(_)));
        assert!(profile.engine().is_none());
    }
}
