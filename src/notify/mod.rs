//! Local notification backends.
//!
//! A backend registers repeating reminders and hands back an opaque
//! [`NotificationId`] that is later used to cancel exactly that reminder.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::Database;
use crate::models::*;

/// Shortest repeat interval a backend accepts.
pub const MIN_REPEAT_SECONDS: u64 = 60;

/// Notification backend errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("reminder rejected: {0}")]
    Rejected(String),

    #[error("no scheduled reminder with handle {0}")]
    UnknownHandle(NotificationId),

    #[error("notification backend failed: {0}")]
    Backend(String),
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Registers a reminder and returns the handle that cancels it.
    async fn schedule(&self, request: NotificationRequest) -> Result<NotificationId, NotifyError>;

    /// Cancels a reminder. Unknown handles are an error.
    async fn cancel(&self, id: &NotificationId) -> Result<(), NotifyError>;
}

fn check_trigger(trigger: &Trigger) -> Result<(), NotifyError> {
    if trigger.repeats && trigger.seconds < MIN_REPEAT_SECONDS {
        return Err(NotifyError::Rejected(format!(
            "repeating reminders need an interval of at least {} seconds, got {}",
            MIN_REPEAT_SECONDS, trigger.seconds
        )));
    }
    Ok(())
}

fn new_handle() -> NotificationId {
    NotificationId(Uuid::new_v4().to_string())
}

/// Keeps reminders in memory. Useful for tests and for embedding in a host
/// that delivers notifications itself.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    scheduled: Mutex<BTreeMap<NotificationId, NotificationRequest>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every live reminder.
    pub fn scheduled(&self) -> Vec<(NotificationId, NotificationRequest)> {
        let scheduled = self.scheduled.lock().expect("notifier lock poisoned");
        scheduled
            .iter()
            .map(|(id, request)| (id.clone(), request.clone()))
            .collect()
    }

    pub fn get(&self, id: &NotificationId) -> Option<NotificationRequest> {
        let scheduled = self.scheduled.lock().expect("notifier lock poisoned");
        scheduled.get(id).cloned()
    }

    pub fn is_scheduled(&self, id: &NotificationId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.scheduled.lock().expect("notifier lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NotificationService for MemoryNotifier {
    async fn schedule(&self, request: NotificationRequest) -> Result<NotificationId, NotifyError> {
        check_trigger(&request.trigger)?;
        let id = new_handle();
        let mut scheduled = self.scheduled.lock().expect("notifier lock poisoned");
        scheduled.insert(id.clone(), request);
        Ok(id)
    }

    async fn cancel(&self, id: &NotificationId) -> Result<(), NotifyError> {
        let mut scheduled = self.scheduled.lock().expect("notifier lock poisoned");
        scheduled
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| NotifyError::UnknownHandle(id.clone()))
    }
}

/// Persists reminders in the `reminders` table so they can be listed and
/// cancelled from a later process.
#[derive(Clone)]
pub struct SqliteNotifier {
    db: Database,
}

impl SqliteNotifier {
    /// Wraps an already migrated database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Every registered reminder, oldest first.
    pub fn reminders(&self) -> Result<Vec<ScheduledReminder>, NotifyError> {
        self.db
            .get_all_reminders()
            .map_err(|e| NotifyError::Backend(format!("{:#}", e)))
    }
}

#[async_trait]
impl NotificationService for SqliteNotifier {
    async fn schedule(&self, request: NotificationRequest) -> Result<NotificationId, NotifyError> {
        check_trigger(&request.trigger)?;
        let reminder = ScheduledReminder {
            id: new_handle(),
            content: request.content,
            trigger: request.trigger,
            scheduled_at: Utc::now(),
        };
        self.db
            .insert_reminder(&reminder)
            .map_err(|e| NotifyError::Backend(format!("{:#}", e)))?;
        tracing::debug!(
            "Registered reminder {} every {}s",
            reminder.id,
            reminder.trigger.seconds
        );
        Ok(reminder.id)
    }

    async fn cancel(&self, id: &NotificationId) -> Result<(), NotifyError> {
        let removed = self
            .db
            .delete_reminder(id)
            .map_err(|e| NotifyError::Backend(format!("{:#}", e)))?;
        if removed {
            Ok(())
        } else {
            Err(NotifyError::UnknownHandle(id.clone()))
        }
    }
}
