use serde::{Deserialize, Serialize};
use tracing::info;

use super::{parse_inquiry_id, CrmService};
use crate::entity::{FollowUp, Inquiry, InquiryStatus, NewFollowUp, NewInquiry};
use crate::error::{CrmError, Result};

/// Status change payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

/// Full inquiry plus its follow-ups, for staff.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryDetail {
    pub inquiry: Inquiry,
    pub follow_ups: Vec<FollowUp>,
}

impl CrmService {
    /// Validate a public submission and persist it with a fresh reference code.
    pub async fn submit_inquiry(&self, input: NewInquiry) -> Result<Inquiry> {
        let draft = input.validate()?;
        let now = self.now();
        let inquiry = self.store.lock().await.create_inquiry(draft, now)?;

        info!(
            reference_code = %inquiry.reference_code,
            service_type = %inquiry.service_type,
            "inquiry submitted"
        );
        Ok(inquiry)
    }

    /// Move an inquiry to any status in the enumeration. No ordering is enforced.
    pub async fn update_status(&self, inquiry_id: &str, update: StatusUpdate) -> Result<Inquiry> {
        let requested = update.status.unwrap_or_default();
        let status = InquiryStatus::parse_field("status", &requested)?;
        let id = parse_inquiry_id(inquiry_id)?;
        let now = self.now();

        let inquiry = self
            .store
            .lock()
            .await
            .update_status(&id, status, now)?
            .ok_or_else(CrmError::inquiry_not_found)?;

        info!(
            reference_code = %inquiry.reference_code,
            status = %inquiry.status,
            "inquiry status updated"
        );
        Ok(inquiry)
    }

    /// Append a follow-up note. The inquiry's status is left untouched.
    pub async fn add_follow_up(&self, inquiry_id: &str, input: NewFollowUp) -> Result<FollowUp> {
        let (note, next_follow_up_date) = input.validate()?;
        let id = parse_inquiry_id(inquiry_id)?;

        let store = self.store.lock().await;
        let inquiry = store
            .get_inquiry(&id)?
            .ok_or_else(CrmError::inquiry_not_found)?;

        let follow_up = FollowUp::new(inquiry.id, note, next_follow_up_date, self.now());
        store.insert_follow_up(&follow_up)?;

        info!(
            reference_code = %inquiry.reference_code,
            next_follow_up = %follow_up.next_follow_up_date,
            "follow-up added"
        );
        Ok(follow_up)
    }

    pub async fn get_inquiry_with_follow_ups(&self, inquiry_id: &str) -> Result<InquiryDetail> {
        let id = parse_inquiry_id(inquiry_id)?;
        let store = self.store.lock().await;
        let inquiry = store
            .get_inquiry(&id)?
            .ok_or_else(CrmError::inquiry_not_found)?;
        let follow_ups = store.follow_ups_for(&inquiry.id)?;

        Ok(InquiryDetail {
            inquiry,
            follow_ups,
        })
    }
}
