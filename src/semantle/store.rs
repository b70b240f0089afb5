/*
 * MIT License
 *
 * Copyright (c) 2022 Joseph Sacchini
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use super::data::*;

///
/// The logical tables of the durable store.
///
///   * Sessions = pointer metadata (which challenge the last session was playing)
///   * Shards = parsed shard maps, keyed by ShardKey::storage_key
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Sessions,
    Shards,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Sessions => "sessions",
            Table::Shards => "shards",
        }
    }
}

/// The stored form of a ShardMap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardRecord {
    pub rows: Vec<LookupRow>,
    pub loaded_at_ms: i64,
}

impl From<&ShardMap> for ShardRecord {
    fn from(other: &ShardMap) -> Self {
        Self {
            rows: other.rows().cloned().collect(),
            loaded_at_ms: other.loaded_at_ms(),
        }
    }
}

impl From<ShardRecord> for ShardMap {
    fn from(other: ShardRecord) -> Self {
        ShardMap::new(other.rows, other.loaded_at_ms)
    }
}

/// The stored session pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub challenge_id: u32,
    pub started_at_ms: i64,
}

// key of the single session pointer record
pub const CURRENT_SESSION_KEY: &str = "current";

#[derive(Error, Debug)]
pub enum StoreErr {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Encoding(#[from] serde_json::Error),
    #[error("store task failed: {0}")]
    Join(String),
}

///
/// The durable tier. Values are opaque bytes at this level, so that a record which fails to
/// decode can be told apart from a record which doesn't exist.
///
/// The store is shared by every session (and process) using the same backing storage, so writers
/// may race. Last write wins, there is no merging.
///
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn read(&self, table: Table, key: &str) -> Result<Option<Vec<u8>>, StoreErr>;

    async fn write(&self, table: Table, key: &str, value: Vec<u8>) -> Result<(), StoreErr>;

    async fn remove(&self, table: Table, key: &str) -> Result<(), StoreErr>;

    async fn clear(&self, table: Table) -> Result<(), StoreErr>;
}

/// A DurableStore which only lives as long as the process (tests, or when no cache dir is set)
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(Table, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn len(&self, table: Table) -> usize {
        self.records.lock().keys().filter(|(t, _)| *t == table).count()
    }

    pub fn is_empty(&self, table: Table) -> bool {
        self.len(table) == 0
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn read(&self, table: Table, key: &str) -> Result<Option<Vec<u8>>, StoreErr> {
        Ok(self.records.lock().get(&(table, key.to_string())).cloned())
    }

    async fn write(&self, table: Table, key: &str, value: Vec<u8>) -> Result<(), StoreErr> {
        self.records.lock().insert((table, key.to_string()), value);
        Ok(())
    }

    async fn remove(&self, table: Table, key: &str) -> Result<(), StoreErr> {
        self.records.lock().remove(&(table, key.to_string()));
        Ok(())
    }

    async fn clear(&self, table: Table) -> Result<(), StoreErr> {
        self.records.lock().retain(|(t, _), _| *t != table);
        Ok(())
    }
}

///
/// A DurableStore backed by a directory: one sub-directory per table, one file per record.
///
/// Writes go to a temporary file in the same directory which is then renamed over the record, so
/// a reader never observes a half written record, and two racing writers simply replace each
/// other's (identical) output.
///
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_dir(&self, table: Table) -> PathBuf {
        self.root.join(table.name())
    }

    fn record_path(&self, table: Table, key: &str) -> PathBuf {
        // keys are generated by us ("12-a", "current") but never let one escape the table dir
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.table_dir(table).join(format!("{}.json", file_name))
    }
}

// runs blocking filesystem work off of the async executor
async fn blocking<R, F>(f: F) -> Result<R, StoreErr>
where
    F: FnOnce() -> Result<R, StoreErr> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| StoreErr::Join(err.to_string()))?
}

#[async_trait]
impl DurableStore for FileStore {
    async fn read(&self, table: Table, key: &str) -> Result<Option<Vec<u8>>, StoreErr> {
        let path = self.record_path(table, key);
        blocking(move || match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        })
        .await
    }

    async fn write(&self, table: Table, key: &str, value: Vec<u8>) -> Result<(), StoreErr> {
        let dir = self.table_dir(table);
        let path = self.record_path(table, key);
        blocking(move || {
            fs::create_dir_all(&dir)?;
            let mut temp_file = NamedTempFile::new_in(&dir)?;
            temp_file.write_all(&value)?;
            temp_file.flush()?;
            temp_file.persist(&path).map_err(|err| err.error)?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, table: Table, key: &str) -> Result<(), StoreErr> {
        let path = self.record_path(table, key);
        blocking(move || match fs::remove_file(&path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        })
        .await
    }

    async fn clear(&self, table: Table) -> Result<(), StoreErr> {
        let dir = self.table_dir(table);
        blocking(move || match fs::remove_dir_all(&dir) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        })
        .await
    }
}
