use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{NotificationId, PlantRecord};

/// A persisted plant paired with the handle of its active reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub data: PlantRecord,
    #[serde(rename = "notificationId")]
    pub notification_id: NotificationId,
}

/// Every stored plant, keyed by plant id.
///
/// Serialized as a single JSON object. Key order carries no meaning.
pub type PlantMap = BTreeMap<String, StoredEntry>;
