//! Per-division write serialization for in-process callers.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::pairing::models::DivisionId;

/// One async mutex per division, created on first use.
///
/// Writers against the same division run one at a time; different divisions
/// never contend. Clones share the same lock table.
#[derive(Clone, Default)]
pub struct DivisionLocks {
    locks: Arc<Mutex<HashMap<DivisionId, Arc<Mutex<()>>>>>,
}

impl DivisionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to `division_id`
    pub async fn acquire(&self, division_id: DivisionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(division_id).or_default())
        };
        lock.lock_owned().await
    }
}
