/// Storage contract for paste records
///
/// The store exclusively owns record state. The only way to change a stored
/// record is `update_if`, which checks a condition and applies a mutation as
/// one indivisible step for that id.

use crate::{Condition, Mutation, PasteId, PasteRecord, Result};

/// Outcome of a conditional update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalUpdate {
    /// Condition held; carries the record after the mutation
    Applied(PasteRecord),
    /// Record exists but the condition was false; carries the record as it was
    ConditionFailed(PasteRecord),
    /// No record with this id
    Missing,
}

impl ConditionalUpdate {
    /// The updated record, if the update was applied
    pub fn applied(self) -> Option<PasteRecord> {
        match self {
            ConditionalUpdate::Applied(record) => Some(record),
            _ => None,
        }
    }
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total_pastes: u64,
    /// Sum of current_views over all records
    pub total_views: u64,
    /// Size of the paste log; None for stores without one
    pub wal_size_bytes: Option<u64>,
}

pub trait PasteStore: Send + Sync {
    /// Insert a new record.
    ///
    /// Fails with `AlreadyExists` if the id is taken; never overwrites.
    fn insert(&self, record: PasteRecord) -> Result<()>;

    /// Snapshot of a record
    fn get(&self, id: &PasteId) -> Result<Option<PasteRecord>>;

    /// Apply `mutation` iff `condition` holds for the stored record.
    ///
    /// Check and write happen under the same exclusion, so concurrent
    /// callers on one id are linearized and no increment is lost or
    /// duplicated.
    fn update_if(
        &self,
        id: &PasteId,
        condition: &Condition,
        mutation: Mutation,
    ) -> Result<ConditionalUpdate>;

    fn stats(&self) -> Result<StoreStats>;

    /// Cheap reachability check for health endpoints
    fn ping(&self) -> Result<()>;

    /// Make buffered writes durable
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
