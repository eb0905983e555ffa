//! Time-ordered store of past lookups.
//!
//! Records are read most recent first (timestamp descending, id descending on
//! ties). Retention is applied with [`HistoryStore::append_and_trim`], which
//! removes the set of ids ranked past the limit rather than a fixed count, so
//! it stays correct when other appends land concurrently.

use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashSet,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;

use crate::{
    error::StoreError,
    model::{HistoryRecord, NewHistoryRecord},
};

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Store a record, assigning its id and timestamp. Returns the id.
    async fn append(&self, record: NewHistoryRecord) -> Result<u64, StoreError>;

    /// Up to `limit` records, most recent first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRecord>, StoreError>;

    /// Delete the given ids; unknown ids are ignored. Returns how many were removed.
    async fn delete_by_ids(&self, ids: &[u64]) -> Result<usize, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Delete every record not among the `limit` most recent. Returns how many were removed.
    async fn retain_most_recent(&self, limit: usize) -> Result<usize, StoreError> {
        let stale: Vec<u64> = self
            .list_recent(usize::MAX)
            .await?
            .into_iter()
            .skip(limit)
            .map(|r| r.id)
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }
        self.delete_by_ids(&stale).await
    }

    /// Append `record`, then keep only the `limit` most recent records.
    /// Returns the new id and how many records were removed.
    async fn append_and_trim(
        &self,
        record: NewHistoryRecord,
        limit: usize,
    ) -> Result<(u64, usize), StoreError> {
        let id = self.append(record).await?;
        let removed = self.retain_most_recent(limit).await?;
        Ok((id, removed))
    }
}

/// Records kept in read order.
#[derive(Debug, Clone, Default)]
struct HistoryLog {
    next_id: u64,
    records: Vec<HistoryRecord>,
}

impl HistoryLog {
    fn from_records(mut records: Vec<HistoryRecord>) -> Self {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        let next_id = records.iter().map(|r| r.id).max().map_or(1, |id| id + 1);
        Self { next_id, records }
    }

    fn append(&mut self, record: NewHistoryRecord) -> u64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;

        let record = HistoryRecord {
            id,
            city: record.city,
            timestamp: Utc::now(),
            data: record.data,
        };
        let pos = self
            .records
            .iter()
            .position(|r| r.timestamp <= record.timestamp)
            .unwrap_or(self.records.len());
        self.records.insert(pos, record);
        id
    }

    fn list_recent(&self, limit: usize) -> Vec<HistoryRecord> {
        self.records.iter().take(limit).cloned().collect()
    }

    fn delete_by_ids(&mut self, ids: &[u64]) -> usize {
        let ids: HashSet<u64> = ids.iter().copied().collect();
        let before = self.records.len();
        self.records.retain(|r| !ids.contains(&r.id));
        before - self.records.len()
    }

    fn retain_most_recent(&mut self, limit: usize) -> usize {
        let removed = self.records.len().saturating_sub(limit);
        self.records.truncate(limit);
        removed
    }

    fn append_and_trim(&mut self, record: NewHistoryRecord, limit: usize) -> (u64, usize) {
        let id = self.append(record);
        (id, self.retain_most_recent(limit))
    }
}

/// History held in process memory.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    log: Mutex<HistoryLog>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(&self, record: NewHistoryRecord) -> Result<u64, StoreError> {
        Ok(self.log.lock().await.append(record))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRecord>, StoreError> {
        Ok(self.log.lock().await.list_recent(limit))
    }

    async fn delete_by_ids(&self, ids: &[u64]) -> Result<usize, StoreError> {
        Ok(self.log.lock().await.delete_by_ids(ids))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.log.lock().await.records.len())
    }

    async fn retain_most_recent(&self, limit: usize) -> Result<usize, StoreError> {
        Ok(self.log.lock().await.retain_most_recent(limit))
    }

    async fn append_and_trim(
        &self,
        record: NewHistoryRecord,
        limit: usize,
    ) -> Result<(u64, usize), StoreError> {
        Ok(self.log.lock().await.append_and_trim(record, limit))
    }
}

/// History persisted as a JSON array of records.
///
/// Every mutation is applied to a copy, written to `<path>.tmp`, renamed over
/// `path`, and only then committed in memory.
#[derive(Debug)]
pub struct JsonFileHistory {
    path: PathBuf,
    log: Mutex<HistoryLog>,
}

impl JsonFileHistory {
    /// Open the store at `path`. A missing file is an empty history.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let records: Vec<HistoryRecord> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(path = %path.display(), records = records.len(), "Opened history file");

        Ok(Self {
            path,
            log: Mutex::new(HistoryLog::from_records(records)),
        })
    }

    async fn persist(&self, log: &HistoryLog) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(&log.records)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn mutate<T>(&self, op: impl FnOnce(&mut HistoryLog) -> T) -> Result<T, StoreError> {
        let mut log = self.log.lock().await;
        let mut next = log.clone();
        let out = op(&mut next);
        self.persist(&next).await?;
        *log = next;
        Ok(out)
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistory {
    async fn append(&self, record: NewHistoryRecord) -> Result<u64, StoreError> {
        self.mutate(|log| log.append(record)).await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRecord>, StoreError> {
        Ok(self.log.lock().await.list_recent(limit))
    }

    async fn delete_by_ids(&self, ids: &[u64]) -> Result<usize, StoreError> {
        self.mutate(|log| log.delete_by_ids(ids)).await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.log.lock().await.records.len())
    }

    async fn retain_most_recent(&self, limit: usize) -> Result<usize, StoreError> {
        let mut log = self.log.lock().await;
        if log.records.len() <= limit {
            return Ok(0);
        }
        let mut next = log.clone();
        let removed = next.retain_most_recent(limit);
        self.persist(&next).await?;
        *log = next;
        Ok(removed)
    }

    async fn append_and_trim(
        &self,
        record: NewHistoryRecord,
        limit: usize,
    ) -> Result<(u64, usize), StoreError> {
        self.mutate(|log| log.append_and_trim(record, limit)).await
    }
}
