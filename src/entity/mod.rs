mod follow_up;
mod inquiry;
mod user;

pub use follow_up::{FollowUp, NewFollowUp};
pub use inquiry::{
    format_reference_code, parse_reference_number, Inquiry, InquiryDraft, InquiryStatus,
    NewInquiry, ServiceType, REFERENCE_PREFIX,
};
pub use user::User;

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, SubsecRound, Utc};

use crate::error::{CrmError, Result};

/// Current time at the precision the store persists (milliseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Fixed-width RFC 3339 rendering; lexical order matches chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CrmError::Storage(format!("Invalid stored timestamp '{}': {}", raw, e)))
}

/// Accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
///
/// The resulting instant must fall in years 0000..=9999, the range that
/// [`format_timestamp`] writes and [`parse_timestamp`] reads back.
pub fn parse_client_date(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    let parsed = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc).trunc_subsecs(3)),
        Err(_) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc()),
    };
    parsed
        .filter(|dt| (0..=9999).contains(&dt.year()))
        .ok_or_else(|| {
            CrmError::validation(
                field,
                format!("'{}' is not a valid date. Expected YYYY-MM-DD or RFC 3339", raw),
            )
        })
}

/// Trim a required text input, rejecting absent or blank values.
pub(crate) fn required_text(field: &str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CrmError::validation(field, format!("{} is required", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_round_trip_keeps_millis() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap()
            + chrono::Duration::milliseconds(42);
        let text = format_timestamp(&ts);
        assert_eq!(text, "2025-03-01T09:30:00.042Z");
        assert_eq!(parse_timestamp(&text).unwrap(), ts);
    }

    #[test]
    fn test_parse_client_date_accepts_plain_date() {
        let parsed = parse_client_date("nextFollowUpDate", "2025-07-04").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 7, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_client_date_rejects_garbage() {
        let err = parse_client_date("nextFollowUpDate", "next tuesday").unwrap_err();
        assert!(matches!(err, CrmError::Validation { field, .. } if field == "nextFollowUpDate"));
    }

    #[test]
    fn test_parse_client_date_rejects_years_outside_storage_range() {
        for raw in ["-0001-01-01", "+12345-01-01", "9999-12-31T23:00:00-05:00"] {
            let err = parse_client_date("nextFollowUpDate", raw).unwrap_err();
            assert!(matches!(err, CrmError::Validation { .. }), "{raw}");
        }
    }

    #[test]
    fn test_accepted_dates_survive_storage_round_trip() {
        for raw in ["0000-01-01", "9999-12-31", "2025-07-04T10:15:00.250+02:00"] {
            let parsed = parse_client_date("nextFollowUpDate", raw).unwrap();
            let stored = format_timestamp(&parsed);
            assert_eq!(parse_timestamp(&stored).unwrap(), parsed, "{raw}");
        }
    }

    #[test]
    fn test_required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("name", Some("  Ann ".into())).unwrap(), "Ann");
        assert!(required_text("name", Some("   ".into())).is_err());
        assert!(required_text("name", None).is_err());
    }
}
