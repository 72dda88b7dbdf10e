//! RecoveryManager - re-enqueues items parked by a previous shutdown.
//!
//! Runs once, when the center becomes ready. Each record is claimed by
//! deleting it first; only the caller whose delete removed exactly one entry
//! re-enqueues it, so several processes sharing a store never run the same
//! record twice.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::{PersistedRecord, WorkItem};
use crate::ports::{StoreClient, StoreError};

pub struct RecoveryManager {
    store: Arc<dyn StoreClient>,
    store_key: String,
    dead_letter_key: Option<String>,
}

/// What one recovery pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    pub recovered: usize,
    /// Claimed by someone else between `get_all` and `delete`.
    pub contended: usize,
    pub malformed: usize,
    /// Parsed, but `enqueue` refused the item (its message is not registered).
    pub refused: usize,
}

impl RecoveryManager {
    pub fn new(store: Arc<dyn StoreClient>, store_key: impl Into<String>, dead_letter_key: Option<String>) -> Self {
        Self {
            store,
            store_key: store_key.into(),
            dead_letter_key,
        }
    }

    /// Claims every parked record and hands the parsed item to `enqueue`,
    /// which returns `false` to refuse it. Malformed and refused records go to
    /// the dead-letter bucket when one is configured.
    ///
    /// A failing delete for one record is logged and the pass continues.
    pub async fn run<F>(&self, mut enqueue: F) -> Result<RecoveryReport, StoreError>
    where
        F: FnMut(WorkItem) -> bool,
    {
        let records = self.store.get_all(&self.store_key).await?;
        let mut report = RecoveryReport::default();

        for (id, raw) in records {
            match self.store.delete(&self.store_key, &id).await {
                Ok(1) => {}
                Ok(_) => {
                    report.contended += 1;
                    continue;
                }
                Err(e) => {
                    error!(%id, error = %e, "failed to claim parked item");
                    continue;
                }
            }

            match PersistedRecord::from_json(&raw) {
                Ok(record) => {
                    let name = record.name.clone();
                    if enqueue(WorkItem::from(record)) {
                        report.recovered += 1;
                    } else {
                        report.refused += 1;
                        error!(%id, %name, "parked item names an unregistered message");
                        self.dead_letter(&id, raw).await;
                    }
                }
                Err(e) => {
                    report.malformed += 1;
                    error!(%id, error = %e, "parked item is not a valid record");
                    self.dead_letter(&id, raw).await;
                }
            }
        }

        info!(
            recovered = report.recovered,
            contended = report.contended,
            malformed = report.malformed,
            refused = report.refused,
            "mcenter.recover"
        );
        Ok(report)
    }

    async fn dead_letter(&self, id: &str, raw: String) {
        let Some(bucket) = &self.dead_letter_key else {
            return;
        };
        if let Err(e) = self.store.set(bucket, id, raw).await {
            warn!(%id, bucket, error = %e, "failed to dead-letter parked item");
        }
    }
}
