// src/entity/inquiry.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::required_text;
use crate::error::{CrmError, Result};

/// Literal prefix of every issued reference code.
pub const REFERENCE_PREFIX: &str = "INQ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InquiryStatus {
    #[default]
    #[serde(rename = "New")]
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "In Action")]
    InAction,
    #[serde(rename = "Done")]
    Done,
}

impl InquiryStatus {
    pub const ALL: [InquiryStatus; 4] = [
        InquiryStatus::New,
        InquiryStatus::InProgress,
        InquiryStatus::InAction,
        InquiryStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::New => "New",
            InquiryStatus::InProgress => "In Progress",
            InquiryStatus::InAction => "In Action",
            InquiryStatus::Done => "Done",
        }
    }

    pub fn labels() -> Vec<String> {
        Self::ALL.iter().map(|s| s.as_str().to_string()).collect()
    }

    /// Parse a caller-supplied status, reporting the valid set on failure.
    pub fn parse_field(field: &str, value: &str) -> Result<Self> {
        value.parse().map_err(|_| CrmError::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
            valid: Self::labels(),
        })
    }
}

impl std::fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Exact labels only: the dashboard and the store share one vocabulary.
impl std::str::FromStr for InquiryStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid inquiry status: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile App")]
    MobileApp,
    #[serde(rename = "Digital Marketing")]
    DigitalMarketing,
    #[serde(rename = "Consulting")]
    Consulting,
    #[serde(rename = "Other")]
    Other,
}

impl ServiceType {
    pub const ALL: [ServiceType; 5] = [
        ServiceType::WebDevelopment,
        ServiceType::MobileApp,
        ServiceType::DigitalMarketing,
        ServiceType::Consulting,
        ServiceType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::WebDevelopment => "Web Development",
            ServiceType::MobileApp => "Mobile App",
            ServiceType::DigitalMarketing => "Digital Marketing",
            ServiceType::Consulting => "Consulting",
            ServiceType::Other => "Other",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|service| service.as_str() == s)
            .ok_or_else(|| format!("Invalid service type: {}", s))
    }
}

/// A persisted client inquiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: Uuid,
    pub reference_code: String,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub service_type: ServiceType,
    pub message: String,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw submission payload, as received from a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInquiry {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub service_type: Option<String>,
    pub message: Option<String>,
}

/// Validated inquiry fields, ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct InquiryDraft {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub service_type: ServiceType,
    pub message: String,
    pub status: InquiryStatus,
    /// Pre-assigned code; the store issues one when absent.
    pub reference_code: Option<String>,
}

impl NewInquiry {
    /// Check required fields and normalize the payload into a draft.
    pub fn validate(self) -> Result<InquiryDraft> {
        let missing: Vec<&str> = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("serviceType", &self.service_type),
            ("message", &self.message),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(field, _)| field)
        .collect();

        if !missing.is_empty() {
            return Err(CrmError::Validation {
                field: missing.join(", "),
                message: format!(
                    "Please provide all required fields: name, phone, serviceType, and message (missing: {})",
                    missing.join(", ")
                ),
            });
        }

        let service_raw = required_text("serviceType", self.service_type)?;
        let service_type = service_raw
            .parse::<ServiceType>()
            .map_err(|_| CrmError::InvalidEnumValue {
                field: "serviceType".to_string(),
                value: service_raw.clone(),
                valid: ServiceType::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })?;

        let email = self
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());

        Ok(InquiryDraft {
            name: required_text("name", self.name)?,
            phone: required_text("phone", self.phone)?,
            email,
            service_type,
            message: required_text("message", self.message)?,
            status: InquiryStatus::default(),
            reference_code: None,
        })
    }
}

pub fn format_reference_code(number: i64) -> String {
    format!("{}{}", REFERENCE_PREFIX, number)
}

/// Numeric component of a code in the issued format, if it has one.
pub fn parse_reference_number(code: &str) -> Option<i64> {
    let digits = code.strip_prefix(REFERENCE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> NewInquiry {
        NewInquiry {
            name: Some(" Ann ".into()),
            phone: Some("555".into()),
            email: Some("  Ann@Example.COM ".into()),
            service_type: Some("Consulting".into()),
            message: Some("help".into()),
        }
    }

    #[test]
    fn test_status_labels_round_trip() {
        for status in InquiryStatus::ALL {
            assert_eq!(status.as_str().parse::<InquiryStatus>().unwrap(), status);
        }
        assert_eq!(InquiryStatus::default(), InquiryStatus::New);
    }

    #[test]
    fn test_status_rejects_schema_only_terminals() {
        assert!("Won".parse::<InquiryStatus>().is_err());
        assert!("Lost".parse::<InquiryStatus>().is_err());
        assert!("new".parse::<InquiryStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_as_label() {
        let json = serde_json::to_string(&InquiryStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
    }

    #[test]
    fn test_validate_normalizes_fields() {
        let draft = submission().validate().unwrap();
        assert_eq!(draft.name, "Ann");
        assert_eq!(draft.email.as_deref(), Some("ann@example.com"));
        assert_eq!(draft.service_type, ServiceType::Consulting);
        assert_eq!(draft.status, InquiryStatus::New);
        assert!(draft.reference_code.is_none());
    }

    #[test]
    fn test_validate_lists_missing_fields() {
        let mut input = submission();
        input.phone = None;
        input.message = Some("   ".into());
        match input.validate().unwrap_err() {
            CrmError::Validation { field, .. } => assert_eq!(field, "phone, message"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_unknown_service_type() {
        let mut input = submission();
        input.service_type = Some("Plumbing".into());
        assert!(matches!(
            input.validate().unwrap_err(),
            CrmError::InvalidEnumValue { field, .. } if field == "serviceType"
        ));
    }

    #[test]
    fn test_blank_email_is_dropped() {
        let mut input = submission();
        input.email = Some("   ".into());
        assert!(input.validate().unwrap().email.is_none());
    }

    #[test]
    fn test_reference_number_parsing() {
        assert_eq!(parse_reference_number("INQ1700000000000"), Some(1_700_000_000_000));
        assert_eq!(parse_reference_number("INQ"), None);
        assert_eq!(parse_reference_number("INQ12a"), None);
        assert_eq!(parse_reference_number("ABC12"), None);
        assert_eq!(format_reference_code(7), "INQ7");
    }
}
