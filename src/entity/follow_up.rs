use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_client_date, required_text};
use crate::error::{CrmError, Result};

/// A staff note on an inquiry. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub note: String,
    pub next_follow_up_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FollowUp {
    pub fn new(
        inquiry_id: Uuid,
        note: String,
        next_follow_up_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            inquiry_id,
            note,
            next_follow_up_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Raw follow-up payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFollowUp {
    pub note: Option<String>,
    pub next_follow_up_date: Option<String>,
}

impl NewFollowUp {
    /// Returns the trimmed note and the parsed next-contact date.
    pub fn validate(self) -> Result<(String, DateTime<Utc>)> {
        let note = self.note.filter(|n| !n.trim().is_empty());
        let date = self.next_follow_up_date.filter(|d| !d.trim().is_empty());
        let (Some(note), Some(date)) = (note, date) else {
            return Err(CrmError::validation(
                "note, nextFollowUpDate",
                "Please provide both note and next follow-up date",
            ));
        };
        let note = required_text("note", Some(note))?;
        let date = parse_client_date("nextFollowUpDate", &date)?;
        Ok((note, date))
    }
}
