// SPDX-License-Identifier: MIT

//! Parsing for the two sync endpoint schemes (§4.3, §6): `backup:<dir>` and
//! a native database uri. This module only parses the string form; the
//! actual `copy` lives in `wf-storage` so this crate doesn't have to depend
//! on it.

use crate::error::WireError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncUri {
    Backup(String),
    Native(String),
}

impl SyncUri {
    pub fn parse(raw: &str) -> Result<Self, WireError> {
        match raw.split_once(':') {
            Some(("backup", dir)) if !dir.is_empty() => Ok(SyncUri::Backup(dir.to_string())),
            Some(("backup", _)) => Err(WireError::InvalidSyncUri(raw.to_string())),
            _ if raw.is_empty() => Err(WireError::InvalidSyncUri(raw.to_string())),
            _ => Ok(SyncUri::Native(raw.to_string())),
        }
    }
}

impl std::fmt::Display for SyncUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncUri::Backup(dir) => write!(f, "backup:{dir}"),
            SyncUri::Native(uri) => write!(f, "{uri}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backup_scheme() {
        assert_eq!(SyncUri::parse("backup:/var/wf/backup").unwrap(), SyncUri::Backup("/var/wf/backup".to_string()));
    }

    #[test]
    fn parses_native_uri_verbatim() {
        assert_eq!(
            SyncUri::parse("postgres://localhost/wf").unwrap(),
            SyncUri::Native("postgres://localhost/wf".to_string())
        );
    }

    #[test]
    fn rejects_empty_backup_dir() {
        assert!(SyncUri::parse("backup:").is_err());
    }

    #[test]
    fn rejects_empty_uri() {
        assert!(SyncUri::parse("").is_err());
    }
}
