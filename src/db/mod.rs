mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension};

use crate::models::*;

/// SQLite database backing the key-value store and the local reminder registry.
///
/// Cloning is cheap; clones share one connection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Key-value operations
    // ============================================================

    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, value, Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    // ============================================================
    // Reminder operations
    // ============================================================

    pub fn insert_reminder(&self, reminder: &ScheduledReminder) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO reminders (id, title, body, sound, priority, payload, interval_seconds, repeats, scheduled_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                reminder.id.as_str(),
                &reminder.content.title,
                &reminder.content.body,
                if reminder.content.sound { 1 } else { 0 },
                reminder.content.priority.as_str(),
                serde_json::to_string(&reminder.content.data)?,
                reminder.trigger.seconds as i64,
                if reminder.trigger.repeats { 1 } else { 0 },
                reminder.scheduled_at.to_rfc3339(),
            ),
        )?;
        Ok(())
    }

    pub fn delete_reminder(&self, id: &NotificationId) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM reminders WHERE id = ?", [id.as_str()])?;
        Ok(rows > 0)
    }

    pub fn get_all_reminders(&self) -> Result<Vec<ScheduledReminder>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, title, body, sound, priority, payload, interval_seconds, repeats, scheduled_at
             FROM reminders ORDER BY scheduled_at, id",
        )?;

        let reminders = stmt
            .query_map([], |row| {
                let priority: String = row.get(4)?;
                let payload: String = row.get(5)?;
                Ok(ScheduledReminder {
                    id: NotificationId(row.get(0)?),
                    content: NotificationContent {
                        title: row.get(1)?,
                        body: row.get(2)?,
                        sound: row.get::<_, i32>(3)? != 0,
                        priority: NotificationPriority::from_str(&priority).ok_or_else(|| {
                            conversion_error(4, format!("unknown priority {:?}", priority).into())
                        })?,
                        data: serde_json::from_str(&payload)
                            .map_err(|e| conversion_error(5, Box::new(e)))?,
                    },
                    trigger: Trigger {
                        seconds: row.get::<_, i64>(6)?.max(0) as u64,
                        repeats: row.get::<_, i32>(7)? != 0,
                    },
                    scheduled_at: parse_datetime(8, row.get::<_, String>(8)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reminders)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// Location of the database when none is configured.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "plant-manager")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("plants.db"))
}

fn conversion_error(
    column: usize,
    cause: Box<dyn std::error::Error + Send + Sync>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, cause)
}

fn parse_datetime(column: usize, s: String) -> rusqlite::Result<chrono::DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, Box::new(e)))
}
