// SPDX-License-Identifier: MIT

//! Top-level daemon errors and the exit codes they map to (§6): 0 clean,
//! 2 bad arguments, 3 unrecoverable startup, 4 terminated by signal.

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("bad arguments: {0}")]
    BadArgs(String),
    #[error("failed to read config {path}: {cause}")]
    ConfigRead { path: String, cause: std::io::Error },
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("failed to read token file {path}: {cause}")]
    TokenFileRead { path: String, cause: std::io::Error },
    #[error("failed to load TLS material: {0}")]
    Tls(std::io::Error),
    #[error("failed to serve the HTTP API: {0}")]
    Serve(std::io::Error),
    #[error("terminated by signal")]
    Signal,
}

impl DaemonError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DaemonError::BadArgs(_) => 2,
            DaemonError::ConfigRead { .. }
            | DaemonError::ConfigParse(_)
            | DaemonError::TokenFileRead { .. }
            | DaemonError::Tls(_)
            | DaemonError::Serve(_) => 3,
            DaemonError::Signal => 4,
        }
    }
}
