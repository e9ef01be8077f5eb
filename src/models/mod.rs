//! Domain models for the plant manager.
//!
//! # Core Concepts
//!
//! - [`PlantRecord`]: A tracked plant with its watering cadence and the reference
//!   time its reminders are computed from.
//! - [`StoredEntry`]: The persisted wrapper pairing a record with the handle of
//!   its active reminder. The whole collection is persisted as a [`PlantMap`].
//! - [`NotificationRequest`]: What is handed to a notification backend to
//!   register a repeating reminder; the backend answers with a [`NotificationId`].

mod entry;
mod plant;
mod reminder;

pub use entry::*;
pub use plant::*;
pub use reminder::*;
