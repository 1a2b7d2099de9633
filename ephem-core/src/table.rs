use crate::{Condition, ConditionalUpdate, Error, Mutation, PasteId, PasteRecord, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Record table split into independently locked stripes.
///
/// Every operation touches exactly one stripe. Writers hold the stripe lock
/// across check, commit hook and apply; the commit hook is where a durable
/// store logs the change before it becomes visible.
pub(crate) struct StripedTable {
    stripes: Vec<RwLock<HashMap<PasteId, PasteRecord>>>,
}

impl StripedTable {
    pub fn new(num_stripes: usize) -> Self {
        let stripes = (0..num_stripes.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self { stripes }
    }

    fn stripe(&self, id: &PasteId) -> &RwLock<HashMap<PasteId, PasteRecord>> {
        &self.stripes[id.stripe(self.stripes.len())]
    }

    /// Insert a new record, running `commit` before it becomes visible
    pub fn insert_with<F>(&self, record: PasteRecord, commit: F) -> Result<()>
    where
        F: FnOnce(&PasteRecord) -> Result<()>,
    {
        let mut stripe = self.stripe(&record.id).write();
        if stripe.contains_key(&record.id) {
            return Err(Error::AlreadyExists(record.id.to_string()));
        }
        commit(&record)?;
        stripe.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn get(&self, id: &PasteId) -> Option<PasteRecord> {
        self.stripe(id).read().get(id).cloned()
    }

    /// Check `condition`, apply `mutation` to a copy, run `commit` on the
    /// copy, then publish it. A failing commit leaves the record untouched.
    pub fn update_if_with<F>(
        &self,
        id: &PasteId,
        condition: &Condition,
        mutation: Mutation,
        commit: F,
    ) -> Result<ConditionalUpdate>
    where
        F: FnOnce(&PasteRecord) -> Result<()>,
    {
        let mut stripe = self.stripe(id).write();
        let current = match stripe.get_mut(id) {
            Some(record) => record,
            None => return Ok(ConditionalUpdate::Missing),
        };

        if !condition.evaluate(current)? {
            return Ok(ConditionalUpdate::ConditionFailed(current.clone()));
        }

        let mut updated = current.clone();
        mutation.apply(&mut updated)?;
        commit(&updated)?;
        *current = updated.clone();

        Ok(ConditionalUpdate::Applied(updated))
    }

    /// Replay: put a record back as logged
    pub fn restore(&self, record: PasteRecord) {
        self.stripe(&record.id).write().insert(record.id.clone(), record);
    }

    /// Replay: set a logged view count. Returns false if the id is unknown.
    pub fn restore_views(&self, id: &PasteId, current_views: u64) -> bool {
        match self.stripe(id).write().get_mut(id) {
            Some(record) => {
                record.current_views = current_views;
                true
            }
            None => false,
        }
    }

    /// Run `f` on a copy of every record while all stripes are write-locked.
    ///
    /// Stripes are taken in index order; every other operation holds at most
    /// one stripe, so this cannot deadlock with them.
    pub fn with_all_locked<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(Vec<PasteRecord>) -> Result<R>,
    {
        let guards: Vec<_> = self.stripes.iter().map(|stripe| stripe.write()).collect();
        let records = guards
            .iter()
            .flat_map(|stripe| stripe.values().cloned())
            .collect();
        f(records)
    }

    /// (record count, sum of views)
    pub fn totals(&self) -> (u64, u64) {
        self.stripes.iter().fold((0, 0), |(count, views), stripe| {
            let stripe = stripe.read();
            let stripe_views = stripe
                .values()
                .fold(0u64, |acc, r| acc.saturating_add(r.current_views));
            (count + stripe.len() as u64, views.saturating_add(stripe_views))
        })
    }
}
