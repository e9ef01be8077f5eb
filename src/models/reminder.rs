use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Opaque handle issued by a notification backend for one scheduled reminder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NotificationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery priority hint for platforms that support one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Default,
    High,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// What the user sees when a reminder fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub sound: bool,
    pub priority: NotificationPriority,
    /// Arbitrary payload delivered back with the notification.
    pub data: serde_json::Value,
}

/// When a reminder fires: first after `seconds`, then every `seconds` if `repeats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub seconds: u64,
    pub repeats: bool,
}

/// A reminder registration handed to a notification backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub content: NotificationContent,
    pub trigger: Trigger,
}

/// A reminder as held by a persistent notification backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledReminder {
    pub id: NotificationId,
    pub content: NotificationContent,
    pub trigger: Trigger,
    pub scheduled_at: DateTime<Utc>,
}

impl ScheduledReminder {
    /// The first fire time at or after `now`, or `None` for a one-shot
    /// reminder that has already fired.
    pub fn next_fire_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let interval = self.trigger.seconds.max(1) as i64;
        let first = self.scheduled_at + Duration::seconds(interval);
        if first >= now {
            return Some(first);
        }
        if !self.trigger.repeats {
            return None;
        }
        let elapsed = (now - first).num_seconds();
        let periods = elapsed / interval + i64::from(elapsed % interval != 0);
        Some(first + Duration::seconds(periods * interval))
    }
}
