//! Inquiry lifecycle, listing and public tracking.
//!
//! [`CrmService`] owns no data itself: the store handle and the clock are
//! injected, so tests run against an in-memory SQLite store with a
//! deterministic clock.

mod lifecycle;
mod query;
mod tracking;

pub use lifecycle::{InquiryDetail, StatusUpdate};
pub use query::{
    InquiryPage, ListQuery, PageRequest, Pagination, DEFAULT_LIMIT, DEFAULT_PAGE,
};
pub use tracking::{TrackedFollowUp, TrackedInquiry, TrackingView};

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{CrmError, Result};
use crate::storage::SqliteStore;

/// Source of "now" for timestamps and reference codes.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        crate::entity::now()
    }
}

/// Starts at a fixed instant and advances one millisecond per reading.
#[derive(Debug)]
pub struct SteppingClock {
    next_ms: AtomicI64,
}

impl SteppingClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            next_ms: AtomicI64::new(start.timestamp_millis()),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.next_ms.fetch_add(1, Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// The core service behind both the public and the admin routes.
#[derive(Clone)]
pub struct CrmService {
    store: Arc<Mutex<SqliteStore>>,
    clock: Arc<dyn Clock>,
}

impl CrmService {
    pub fn new(store: SqliteStore) -> Self {
        Self::from_shared(Arc::new(Mutex::new(store)))
    }

    pub fn from_shared(store: Arc<Mutex<SqliteStore>>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Shared store handle, for the auth check and operator commands.
    pub fn store(&self) -> &Arc<Mutex<SqliteStore>> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Ids come from URLs; anything that is not a UUID cannot name an inquiry.
fn parse_inquiry_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| CrmError::inquiry_not_found())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::entity::{Inquiry, NewInquiry};

    pub fn service() -> CrmService {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        CrmService::new(SqliteStore::open_in_memory().unwrap())
            .with_clock(Arc::new(SteppingClock::starting_at(start)))
    }

    pub fn submission(name: &str, phone: &str) -> NewInquiry {
        NewInquiry {
            name: Some(name.to_string()),
            phone: Some(phone.to_string()),
            email: Some("Client@Example.com".to_string()),
            service_type: Some("Consulting".to_string()),
            message: Some("help".to_string()),
        }
    }

    pub async fn submit(service: &CrmService, name: &str, phone: &str) -> Inquiry {
        service.submit_inquiry(submission(name, phone)).await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stepping_clock_advances() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = SteppingClock::starting_at(start);
        let a = clock.now();
        let b = clock.now();
        assert_eq!(a, start);
        assert_eq!((b - a).num_milliseconds(), 1);
    }

    #[test]
    fn test_parse_inquiry_id_maps_garbage_to_not_found() {
        assert!(matches!(
            parse_inquiry_id("not-a-uuid"),
            Err(CrmError::NotFound(_))
        ));
        let id = Uuid::new_v4();
        assert_eq!(parse_inquiry_id(&id.to_string()).unwrap(), id);
    }
}
