//! The plant store.
//!
//! All plants live in one JSON object under a single key of the backing
//! [`KeyValueStore`], keyed by plant id:
//!
//! ```json
//! { "<id>": { "data": { ...plant... }, "notificationId": "<handle>" } }
//! ```
//!
//! Every mutation is a read-modify-write of that whole object. Mutations made
//! through one [`PlantStore`] are serialized; two stores sharing a backend are
//! not, and can lose each other's writes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::kv::{KeyValueStore, KvError};
use crate::models::*;
use crate::scheduler::{ReminderScheduler, SchedulerError};

/// Storage key the mobile app writes its plants under.
pub const DEFAULT_STORAGE_KEY: &str = "@plantmanager:plants";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid plant: {0}")]
    InvalidPlant(String),

    #[error("plant {0} not found")]
    NotFound(String),

    #[error("stored plants are unreadable: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("failed to encode plants: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] KvError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

pub struct PlantStore {
    kv: Arc<dyn KeyValueStore>,
    scheduler: ReminderScheduler,
    key: String,
    write_lock: Mutex<()>,
}

impl PlantStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, scheduler: ReminderScheduler) -> Self {
        Self::with_key(kv, scheduler, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(
        kv: Arc<dyn KeyValueStore>,
        scheduler: ReminderScheduler,
        key: impl Into<String>,
    ) -> Self {
        Self {
            kv,
            scheduler,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Every stored plant, ordered by reference time (whole seconds), with
    /// `hour` derived from it.
    pub async fn load(&self) -> Result<Vec<PlantRecord>, StoreError> {
        let plants = self.read_map().await?;
        let mut list: Vec<PlantRecord> = plants
            .into_values()
            .map(|entry| entry.data.with_derived_hour())
            .collect();
        list.sort_by_key(PlantRecord::epoch_seconds);

        tracing::debug!("Loaded {} plants", list.len());
        Ok(list)
    }

    /// One stored plant by id.
    pub async fn get(&self, id: &str) -> Result<Option<PlantRecord>, StoreError> {
        let mut plants = self.read_map().await?;
        Ok(plants.remove(id).map(|entry| entry.data.with_derived_hour()))
    }

    /// Saves `plant` and schedules its repeating reminder.
    pub async fn save(&self, plant: PlantRecord) -> Result<(), StoreError> {
        self.save_at(plant, Utc::now()).await
    }

    /// Like [`save`](Self::save) with an explicit current time.
    ///
    /// A plant that already exists is replaced and its previous reminder
    /// cancelled. If anything fails after the reminder was scheduled, the
    /// reminder is cancelled again and the stored plants are left untouched.
    pub async fn save_at(&self, plant: PlantRecord, now: DateTime<Utc>) -> Result<(), StoreError> {
        plant.validate().map_err(StoreError::InvalidPlant)?;
        let plant = plant.with_derived_hour();

        let _guard = self.write_lock.lock().await;

        let notification_id = self.scheduler.schedule(&plant, now).await?;

        let replaced = match self.insert_entry(&plant, &notification_id).await {
            Ok(replaced) => replaced,
            Err(e) => {
                self.discard_reminder(&notification_id).await;
                return Err(e);
            }
        };

        if let Some(old) = replaced {
            if old.notification_id != notification_id {
                self.discard_reminder(&old.notification_id).await;
            }
        }

        tracing::info!("Saved plant {} ({})", plant.id, plant.name);
        Ok(())
    }

    /// Removes a plant and cancels its reminder.
    ///
    /// The entry is removed from storage before its reminder is cancelled, so
    /// a failed write leaves both in place. If the reminder cannot be
    /// cancelled the entry is written back.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut plants = self.read_map().await?;
        let entry = plants
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        self.write_map(&plants).await?;

        if let Err(e) = self.scheduler.cancel(&entry.notification_id).await {
            plants.insert(id.to_string(), entry);
            if let Err(restore) = self.write_map(&plants).await {
                tracing::warn!("Failed to restore plant {} after cancel failure: {}", id, restore);
            }
            return Err(e.into());
        }

        tracing::info!("Deleted plant {}", id);
        Ok(())
    }

    /// Inserts the entry, new write wins, and returns the one it replaced.
    async fn insert_entry(
        &self,
        plant: &PlantRecord,
        notification_id: &NotificationId,
    ) -> Result<Option<StoredEntry>, StoreError> {
        let mut plants = self.read_map().await?;
        let replaced = plants.insert(
            plant.id.clone(),
            StoredEntry {
                data: plant.clone(),
                notification_id: notification_id.clone(),
            },
        );
        self.write_map(&plants).await?;
        Ok(replaced)
    }

    async fn discard_reminder(&self, id: &NotificationId) {
        if let Err(e) = self.scheduler.cancel(id).await {
            tracing::warn!("Failed to cancel reminder {}: {}", id, e);
        }
    }

    async fn read_map(&self) -> Result<PlantMap, StoreError> {
        match self.kv.get(&self.key).await? {
            Some(raw) if !raw.trim().is_empty() => {
                serde_json::from_str(&raw).map_err(StoreError::Corrupt)
            }
            _ => Ok(PlantMap::new()),
        }
    }

    async fn write_map(&self, plants: &PlantMap) -> Result<(), StoreError> {
        let raw = serde_json::to_string(plants).map_err(StoreError::Serialize)?;
        self.kv.set(&self.key, &raw).await?;
        Ok(())
    }
}
