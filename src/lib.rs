//! Houseplant watering tracker.
//!
//! [`store::PlantStore`] keeps plant records in a key-value backend and, on
//! every save, registers a repeating watering reminder through a
//! notification backend. Both backends are small traits
//! ([`kv::KeyValueStore`], [`notify::NotificationService`]) with in-memory and
//! SQLite implementations.

pub mod config;
pub mod db;
pub mod kv;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod store;
