//! The public, unauthenticated view of an inquiry.
//!
//! Only what a client needs to follow their own request is exposed: contact
//! details, the free-text message and internal ids stay behind the admin
//! routes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::CrmService;
use crate::entity::{FollowUp, Inquiry, InquiryStatus, ServiceType};
use crate::error::{CrmError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedInquiry {
    pub reference_code: String,
    pub name: String,
    pub service_type: ServiceType,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Inquiry> for TrackedInquiry {
    fn from(inquiry: Inquiry) -> Self {
        Self {
            reference_code: inquiry.reference_code,
            name: inquiry.name,
            service_type: inquiry.service_type,
            status: inquiry.status,
            created_at: inquiry.created_at,
            updated_at: inquiry.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedFollowUp {
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl From<FollowUp> for TrackedFollowUp {
    fn from(follow_up: FollowUp) -> Self {
        Self {
            note: follow_up.note,
            created_at: follow_up.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingView {
    pub inquiry: TrackedInquiry,
    pub follow_ups: Vec<TrackedFollowUp>,
}

impl CrmService {
    pub async fn track_by_reference_code(&self, code: &str) -> Result<TrackingView> {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Err(CrmError::validation("referenceCode", "Reference code is required"));
        }

        let store = self.store.lock().await;
        let inquiry = store
            .find_by_reference_code(&code)?
            .ok_or_else(|| CrmError::NotFound("Inquiry with this reference code".to_string()))?;
        let follow_ups = store.follow_ups_for(&inquiry.id)?;
        drop(store);

        debug!(reference_code = %code, follow_ups = follow_ups.len(), "tracked inquiry");

        Ok(TrackingView {
            inquiry: inquiry.into(),
            follow_ups: follow_ups.into_iter().map(Into::into).collect(),
        })
    }
}
