/// In-memory paste store for tests and ephemeral deployments
///
/// Same semantics as the disk store; all data is lost when the last handle is
/// dropped.

use crate::{
    table::StripedTable, Condition, ConditionalUpdate, Mutation, PasteId, PasteRecord,
    PasteStore, Result, StoreConfig, StoreStats,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct MemoryStore {
    table: Arc<StripedTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            table: Arc::new(StripedTable::new(config.num_stripes)),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PasteStore for MemoryStore {
    fn insert(&self, record: PasteRecord) -> Result<()> {
        self.table.insert_with(record, |_| Ok(()))
    }

    fn get(&self, id: &PasteId) -> Result<Option<PasteRecord>> {
        Ok(self.table.get(id))
    }

    fn update_if(
        &self,
        id: &PasteId,
        condition: &Condition,
        mutation: Mutation,
    ) -> Result<ConditionalUpdate> {
        self.table.update_if_with(id, condition, mutation, |_| Ok(()))
    }

    fn stats(&self) -> Result<StoreStats> {
        let (total_pastes, total_views) = self.table.totals();
        Ok(StoreStats {
            total_pastes,
            total_views,
            wal_size_bytes: None,
        })
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}
