use crate::clock::Timestamp;
use crate::error::{CrmError, Result};
use crate::store::{Record, Table};
use crate::types::RecordId;
use serde::{Deserialize, Serialize};

/// Append-only log entry: a completed sequence step or a manually logged touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub id: RecordId,
    pub owner: String,
    #[serde(default)]
    pub contact_id: Option<RecordId>,
    #[serde(default)]
    pub account_id: Option<RecordId>,
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(default)]
    pub description: String,
    pub date: Timestamp,
}

impl Activity {
    pub fn new(
        owner: impl Into<String>,
        activity_type: impl Into<String>,
        description: impl Into<String>,
        date: Timestamp,
    ) -> Self {
        Self {
            id: 0,
            owner: owner.into(),
            contact_id: None,
            account_id: None,
            activity_type: activity_type.into(),
            description: description.into(),
            date,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.activity_type.trim().is_empty() {
            return Err(CrmError::validation("activity type is required"));
        }
        Ok(())
    }
}

impl Record for Activity {
    const TABLE: Table = Table::Activities;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn owner(&self) -> Option<&str> {
        Some(&self.owner)
    }
}

/// Newest `limit` activities, most recent first.
pub fn recent_activities(activities: &[Activity], limit: usize) -> Vec<&Activity> {
    let mut sorted: Vec<&Activity> = activities.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted.truncate(limit);
    sorted
}

/// Activity history for one contact, most recent first.
pub fn for_contact(activities: &[Activity], contact_id: RecordId) -> Vec<&Activity> {
    let mut found: Vec<&Activity> = activities
        .iter()
        .filter(|a| a.contact_id == Some(contact_id))
        .collect();
    found.sort_by(|a, b| b.date.cmp(&a.date));
    found
}
