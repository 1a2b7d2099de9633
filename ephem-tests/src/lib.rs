/// Test utilities for Ephem integration tests
///
/// Wraps a paste service together with the temporary directory it lives in.

use ephem_api::{FixedClock, NewPaste, PasteRecord, Pastes, Timestamp};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// 2024-01-01T00:00:00Z
pub const T0: Timestamp = Timestamp::from_millis(1_704_067_200_000);

/// Paste service wrapper that manages temporary directory lifecycle
pub struct TestPastes {
    pub pastes: Arc<Pastes>,
    path: Option<PathBuf>,
    _temp_dir: Option<TempDir>,
}

impl TestPastes {
    /// Service over the in-memory store
    pub fn in_memory() -> Self {
        Self {
            pastes: Arc::new(Pastes::in_memory()),
            path: None,
            _temp_dir: None,
        }
    }

    /// Service over a durable store in a fresh temporary directory
    pub fn on_disk() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();
        let pastes = Pastes::open(&path)?;

        Ok(Self {
            pastes: Arc::new(pastes),
            path: Some(path),
            _temp_dir: Some(temp_dir),
        })
    }

    /// Directory of the durable store, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Drop the service and open the same directory again (on-disk only)
    pub fn reopen(self) -> anyhow::Result<Self> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| anyhow::anyhow!("in-memory pastes cannot be reopened"))?;
        drop(self.pastes);
        let pastes = Pastes::open(&path)?;

        Ok(Self {
            pastes: Arc::new(pastes),
            path: Some(path),
            _temp_dir: self._temp_dir,
        })
    }

    /// Create a paste at `T0`
    pub fn create(&self, new: NewPaste) -> anyhow::Result<PasteRecord> {
        Ok(self.pastes.create_at(new, T0)?)
    }
}

/// In-memory service whose clock is pinned to `now`
pub fn pastes_at(now: Timestamp) -> Pastes {
    Pastes::in_memory().with_clock(Arc::new(FixedClock(now)))
}

/// `T0` plus whole seconds
pub fn t0_plus_secs(secs: i64) -> Timestamp {
    Timestamp::from_millis(T0.as_millis() + secs * 1000)
}

/// `T0` plus milliseconds
pub fn t0_plus_millis(ms: i64) -> Timestamp {
    Timestamp::from_millis(T0.as_millis() + ms)
}
