// SPDX-License-Identifier: MIT

//! The synchronization utility (§4.3): "two URI schemes — `backup:<dir>` and
//! `<native-db-uri>` — with a `copy(src, dst)` that streams all stored nodes
//! from source to destination, preserving pointers and engine statuses."
//!
//! The native scheme is simply an in-process [`Store`]; the backup scheme
//! mirrors the `main` table onto disk, one file per row named `<id>.json`,
//! sharded into subdirectories of up to [`SHARD_SIZE`] files each (§6
//! "Persistent state layout").

use crate::row::Row;
use crate::store::Store;
use std::fs;
use std::path::{Path, PathBuf};

/// Rows per shard subdirectory of a `backup:<dir>` tree.
const SHARD_SIZE: usize = 100;

/// One endpoint of a `copy`: either a live store or a `backup:<dir>` tree.
pub enum Source<'a> {
    Store(&'a Store),
    Backup(&'a Path),
}

/// One endpoint of a `copy`: either a live store or a `backup:<dir>` tree.
pub enum Destination<'a> {
    Store(&'a Store),
    Backup(&'a Path),
}

/// A sync/backup I/O failure, surfaced with the `(source_uri, dest_uri,
/// cause)` triple (§7).
#[derive(Debug, thiserror::Error)]
#[error("sync {source_uri} -> {dest_uri}: {cause}")]
pub struct SyncError {
    pub source_uri: String,
    pub dest_uri: String,
    pub cause: String,
}

impl SyncError {
    fn new(source_uri: impl Into<String>, dest_uri: impl Into<String>, cause: impl ToString) -> Self {
        Self { source_uri: source_uri.into(), dest_uri: dest_uri.into(), cause: cause.to_string() }
    }
}

fn uri_of_source(src: &Source<'_>) -> String {
    match src {
        Source::Store(_) => "native:store".to_string(),
        Source::Backup(dir) => format!("backup:{}", dir.display()),
    }
}

fn uri_of_dest(dst: &Destination<'_>) -> String {
    match dst {
        Destination::Store(_) => "native:store".to_string(),
        Destination::Backup(dir) => format!("backup:{}", dir.display()),
    }
}

fn shard_dir(base: &Path, position: usize) -> PathBuf {
    base.join(format!("{:06}", position / SHARD_SIZE))
}

fn read_backup(dir: &Path) -> Result<Vec<Row>, String> {
    let mut rows = Vec::new();
    if !dir.exists() {
        return Ok(rows);
    }
    let shard_entries = fs::read_dir(dir).map_err(|e| e.to_string())?;
    for shard in shard_entries {
        let shard = shard.map_err(|e| e.to_string())?;
        if !shard.file_type().map_err(|e| e.to_string())?.is_dir() {
            continue;
        }
        let files = fs::read_dir(shard.path()).map_err(|e| e.to_string())?;
        for file in files {
            let file = file.map_err(|e| e.to_string())?;
            let contents = fs::read_to_string(file.path()).map_err(|e| e.to_string())?;
            let row: Row = serde_json::from_str(&contents).map_err(|e| e.to_string())?;
            rows.push(row);
        }
    }
    Ok(rows)
}

fn write_backup(dir: &Path, rows: &[Row]) -> Result<(), String> {
    for (position, row) in rows.iter().enumerate() {
        let shard = shard_dir(dir, position);
        fs::create_dir_all(&shard).map_err(|e| e.to_string())?;
        let path = shard.join(format!("{}.json", row.node.id()));
        let contents = serde_json::to_string(row).map_err(|e| e.to_string())?;
        fs::write(path, contents).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Stream every stored row from `src` to `dst`, preserving pointers and
/// engine statuses, and return the number of rows copied.
pub fn copy(src: Source<'_>, dst: Destination<'_>) -> Result<usize, SyncError> {
    let source_uri = uri_of_source(&src);
    let dest_uri = uri_of_dest(&dst);

    let rows = match &src {
        Source::Store(store) => store.all_rows(),
        Source::Backup(dir) => {
            read_backup(dir).map_err(|cause| SyncError::new(&source_uri, &dest_uri, cause))?
        }
    };

    match &dst {
        Destination::Store(store) => {
            for row in rows.iter().cloned() {
                store.force_insert_row(row);
            }
        }
        Destination::Backup(dir) => {
            write_backup(dir, &rows).map_err(|cause| SyncError::new(&source_uri, &dest_uri, cause))?;
        }
    }

    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeBus;
    use wf_core::{BuildProcess, Node};

    #[test]
    fn round_trips_through_a_backup_directory() {
        let store = Store::new();
        let bus = ChangeBus::inert();
        let node = Node::create("a", BuildProcess::NoOp, None, 0);
        let id = node.id;
        store.queue_adds(vec![node]);
        store.drain_adds(&bus).unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let copied = copy(Source::Store(&store), Destination::Backup(tmp.path())).unwrap();
        assert_eq!(copied, 1);

        let restored = Store::new();
        let copied_back = copy(Source::Backup(tmp.path()), Destination::Store(&restored)).unwrap();
        assert_eq!(copied_back, 1);
        assert_eq!(restored.get(id).unwrap().unwrap().id, id);
    }

    #[test]
    fn shards_more_than_one_page_of_rows() {
        let store = Store::new();
        let bus = ChangeBus::inert();
        let mut nodes = Vec::new();
        for i in 0..(SHARD_SIZE + 5) {
            nodes.push(Node::create(format!("n{i}"), BuildProcess::NoOp, None, 0));
        }
        store.queue_adds(nodes);
        store.drain_adds(&bus).unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let copied = copy(Source::Store(&store), Destination::Backup(tmp.path())).unwrap();
        assert_eq!(copied, SHARD_SIZE + 5);

        let shard_dirs: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(shard_dirs.len(), 2);
    }

    #[test]
    fn missing_backup_directory_copies_zero_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let never_created = tmp.path().join("does-not-exist");
        let store = Store::new();
        let copied = copy(Source::Backup(&never_created), Destination::Store(&store)).unwrap();
        assert_eq!(copied, 0);
    }
}
