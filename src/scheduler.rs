//! Watering reminder scheduling.
//!
//! The next watering is a coarse periodic approximation: a weekly cadence is
//! spread as `floor(7 / times)` whole days, anything else recurs daily. There
//! is no calendar awareness, daylight-saving or drift correction; the offset
//! carried by the reference time is used as is.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::*;
use crate::notify::{NotificationService, NotifyError, MIN_REPEAT_SECONDS};

/// Reminders never fire sooner than this, nor repeat more often.
pub const MIN_TRIGGER_SECONDS: u64 = MIN_REPEAT_SECONDS;

const DAYS_PER_WEEK: u32 = 7;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid watering frequency: {0}")]
    InvalidFrequency(String),

    #[error("failed to encode reminder payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Notification(#[from] NotifyError),
}

/// Text of the reminder shown to the user. `{name}` in `body` is replaced by
/// the plant name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTemplate {
    pub title: String,
    pub body: String,
}

impl Default for ReminderTemplate {
    fn default() -> Self {
        Self {
            title: "Heeey, 🌱".to_string(),
            body: "It's time to take care of your {name}".to_string(),
        }
    }
}

impl ReminderTemplate {
    pub fn render_body(&self, plant: &PlantRecord) -> String {
        self.body.replace("{name}", &plant.name)
    }
}

/// Whole days between two waterings.
pub fn interval_days(frequency: &Frequency) -> Result<u32, SchedulerError> {
    if frequency.times == 0 {
        return Err(SchedulerError::InvalidFrequency(
            "times must be greater than zero".to_string(),
        ));
    }
    if frequency.repeat_every.is_weekly() {
        Ok(DAYS_PER_WEEK / frequency.times)
    } else {
        Ok(1)
    }
}

/// The watering after `reference`.
pub fn next_occurrence(
    reference: DateTime<FixedOffset>,
    frequency: &Frequency,
) -> Result<DateTime<FixedOffset>, SchedulerError> {
    let days = interval_days(frequency)?;
    Ok(reference + Duration::days(i64::from(days)))
}

/// Distance between `now` and `next` in whole seconds, rounded up, never
/// below [`MIN_TRIGGER_SECONDS`].
pub fn seconds_until_trigger(now: DateTime<Utc>, next: DateTime<FixedOffset>) -> u64 {
    let delta = now - next.with_timezone(&Utc);
    let seconds = match delta.num_nanoseconds() {
        Some(nanos) => {
            nanos.div_euclid(NANOS_PER_SECOND) + i64::from(nanos.rem_euclid(NANOS_PER_SECOND) != 0)
        }
        // gaps of centuries do not fit in nanoseconds
        None => delta.num_seconds(),
    };
    seconds.unsigned_abs().max(MIN_TRIGGER_SECONDS)
}

/// Builds the repeating reminder for `plant` as seen at `now`.
pub fn build_request(
    plant: &PlantRecord,
    now: DateTime<Utc>,
    template: &ReminderTemplate,
) -> Result<NotificationRequest, SchedulerError> {
    let next = next_occurrence(plant.date_time_notification, &plant.frequency)?;
    let seconds = seconds_until_trigger(now, next);

    Ok(NotificationRequest {
        content: NotificationContent {
            title: template.title.clone(),
            body: template.render_body(plant),
            sound: true,
            priority: NotificationPriority::High,
            data: serde_json::json!({ "plant": serde_json::to_value(plant)? }),
        },
        trigger: Trigger {
            seconds,
            repeats: true,
        },
    })
}

/// Registers and cancels watering reminders on a notification backend.
#[derive(Clone)]
pub struct ReminderScheduler {
    notifier: Arc<dyn NotificationService>,
    template: ReminderTemplate,
}

impl ReminderScheduler {
    pub fn new(notifier: Arc<dyn NotificationService>) -> Self {
        Self::with_template(notifier, ReminderTemplate::default())
    }

    pub fn with_template(notifier: Arc<dyn NotificationService>, template: ReminderTemplate) -> Self {
        Self { notifier, template }
    }

    /// Schedules the repeating reminder for `plant` and returns its handle.
    pub async fn schedule(
        &self,
        plant: &PlantRecord,
        now: DateTime<Utc>,
    ) -> Result<NotificationId, SchedulerError> {
        let request = build_request(plant, now, &self.template)?;
        let seconds = request.trigger.seconds;
        let id = self.notifier.schedule(request).await?;
        tracing::debug!(
            "Scheduled reminder {} for plant {} every {}s",
            id,
            plant.id,
            seconds
        );
        Ok(id)
    }

    pub async fn cancel(&self, id: &NotificationId) -> Result<(), SchedulerError> {
        self.notifier.cancel(id).await?;
        Ok(())
    }
}
