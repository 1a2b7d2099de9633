/// Durable paste store: striped in-memory table in front of a paste log
///
/// Every accepted insert and view increment is committed to the log while
/// the record's stripe lock is held, and only then published. Opening the
/// store replays the log to rebuild the table.
///
/// The log would otherwise grow with every view, so once it passes
/// `checkpoint_bytes` (or twice its size after the last checkpoint) it is
/// rewritten as one entry per paste carrying the current view count.

use crate::{
    table::StripedTable,
    wal::{LogEntry, Wal},
    Condition, ConditionalUpdate, Error, Mutation, PasteId, PasteRecord, PasteStore, Result,
    StoreConfig, StoreStats,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

const WAL_FILE: &str = "pastes.wal";

#[derive(Clone)]
pub struct DiskStore {
    inner: Arc<DiskInner>,
}

struct DiskInner {
    dir: PathBuf,
    table: StripedTable,
    wal: Wal,
    config: StoreConfig,
    /// Log size that triggers the next checkpoint
    next_checkpoint: AtomicU64,
    checkpointing: AtomicBool,
}

impl DiskInner {
    fn new(dir: PathBuf, table: StripedTable, wal: Wal, config: StoreConfig) -> Self {
        let next_checkpoint = config.checkpoint_bytes;
        Self {
            dir,
            table,
            wal,
            config,
            next_checkpoint: AtomicU64::new(next_checkpoint),
            checkpointing: AtomicBool::new(false),
        }
    }
}

fn checkpoint_threshold(config: &StoreConfig, live_bytes: u64) -> u64 {
    config.checkpoint_bytes.max(live_bytes.saturating_mul(2))
}

impl DiskStore {
    /// Create a new store in `dir` (created if missing)
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        Self::create_with_config(dir, StoreConfig::default())
    }

    pub fn create_with_config(dir: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidArgument)?;
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let wal = Wal::create(dir.join(WAL_FILE))?;
        tracing::info!(dir = %dir.display(), "created paste store");

        let table = StripedTable::new(config.num_stripes);
        Ok(Self {
            inner: Arc::new(DiskInner::new(dir, table, wal, config)),
        })
    }

    /// Open an existing store and replay its log
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(dir, StoreConfig::default())
    }

    pub fn open_with_config(dir: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidArgument)?;
        let dir = dir.as_ref().to_path_buf();

        let wal = Wal::open(dir.join(WAL_FILE))?;
        let table = StripedTable::new(config.num_stripes);

        let entries = wal.read_all()?;
        let replayed = entries.len();
        for (lsn, entry) in entries {
            match entry {
                LogEntry::Insert(record) => table.restore(record),
                LogEntry::Views { id, current_views } => {
                    if !table.restore_views(&id, current_views) {
                        return Err(Error::Corruption(format!(
                            "view update at lsn {} for unknown paste {}",
                            lsn, id
                        )));
                    }
                }
            }
        }

        let (pastes, _) = table.totals();
        tracing::info!(dir = %dir.display(), replayed, pastes, "opened paste store");

        let store = Self {
            inner: Arc::new(DiskInner::new(dir, table, wal, config)),
        };
        if replayed as u64 > pastes {
            store.maybe_checkpoint();
        }
        Ok(store)
    }

    /// Open `dir` if it holds a store, otherwise create one there
    pub fn open_or_create(dir: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        if dir.as_ref().join(WAL_FILE).exists() {
            Self::open_with_config(dir, config)
        } else {
            Self::create_with_config(dir, config)
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.dir
    }

    /// Rewrite the log as one `Insert` per paste with its current view count.
    ///
    /// All stripes are locked for the duration, so no write can slip in
    /// between the snapshot and the swap.
    pub fn checkpoint(&self) -> Result<()> {
        let inner = &self.inner;
        let before = inner.wal.size_bytes();

        let pastes = inner.table.with_all_locked(|records| {
            let entries: Vec<LogEntry> = records.into_iter().map(LogEntry::Insert).collect();
            inner.wal.rewrite(&entries)?;
            Ok(entries.len())
        })?;

        let after = inner.wal.size_bytes();
        inner
            .next_checkpoint
            .store(checkpoint_threshold(&inner.config, after), Ordering::Relaxed);
        tracing::info!(before, after, pastes, "checkpointed paste log");
        Ok(())
    }

    fn maybe_checkpoint(&self) {
        let inner = &self.inner;
        let size = inner.wal.size_bytes();
        if size < inner.next_checkpoint.load(Ordering::Relaxed) {
            return;
        }
        if inner.checkpointing.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Err(e) = self.checkpoint() {
            tracing::warn!(error = %e, size, "paste log checkpoint failed");
            inner
                .next_checkpoint
                .store(checkpoint_threshold(&inner.config, size), Ordering::Relaxed);
        }
        inner.checkpointing.store(false, Ordering::Release);
    }

    fn log(&self, entry: &LogEntry) -> Result<()> {
        self.inner
            .wal
            .commit(entry, self.inner.config.sync_writes)
            .map(|_| ())
            .map_err(|e| {
                tracing::warn!(error = %e, "paste log write failed");
                e
            })
    }
}

impl PasteStore for DiskStore {
    fn insert(&self, record: PasteRecord) -> Result<()> {
        self.inner
            .table
            .insert_with(record, |r| self.log(&LogEntry::Insert(r.clone())))?;
        self.maybe_checkpoint();
        Ok(())
    }

    fn get(&self, id: &PasteId) -> Result<Option<PasteRecord>> {
        Ok(self.inner.table.get(id))
    }

    fn update_if(
        &self,
        id: &PasteId,
        condition: &Condition,
        mutation: Mutation,
    ) -> Result<ConditionalUpdate> {
        let outcome = self.inner.table.update_if_with(id, condition, mutation, |updated| {
            self.log(&LogEntry::Views {
                id: updated.id.clone(),
                current_views: updated.current_views,
            })
        })?;
        if let ConditionalUpdate::Applied(_) = outcome {
            self.maybe_checkpoint();
        }
        Ok(outcome)
    }

    fn stats(&self) -> Result<StoreStats> {
        let (total_pastes, total_views) = self.inner.table.totals();
        Ok(StoreStats {
            total_pastes,
            total_views,
            wal_size_bytes: Some(self.inner.wal.size_bytes()),
        })
    }

    fn ping(&self) -> Result<()> {
        let meta = fs::metadata(self.inner.wal.path()).map_err(|e| {
            Error::Unavailable(format!("paste log {}: {}", self.inner.wal.path().display(), e))
        })?;
        if !meta.is_file() {
            return Err(Error::Unavailable(format!(
                "paste log {} is not a file",
                self.inner.wal.path().display()
            )));
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.inner.wal.sync()
    }
}
