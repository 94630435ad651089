use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CrmService;
use crate::entity::{Inquiry, InquiryStatus};
use crate::error::Result;
use crate::storage::InquiryFilter;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Raw listing parameters as they arrive in a query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub phone: Option<String>,
    pub reference_code: Option<String>,
}

/// Coerced page and page size. Never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        Self {
            page: positive_or(page, DEFAULT_PAGE),
            limit: positive_or(limit, DEFAULT_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Reads the leading integer of `raw` (`"2.0"` is 2, `"20px"` is 20). Anything
/// without one, or below 1, falls back to `default`.
fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.map(|s| s.trim_start())
        .map(|s| s.strip_prefix('+').unwrap_or(s))
        .and_then(|s| {
            let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
            s[..end].parse::<u64>().ok()
        })
        .filter(|n| *n >= 1)
        .unwrap_or(default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_inquiries: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn compute(request: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(request.limit);
        Self {
            current_page: request.page,
            total_pages,
            total_inquiries: total,
            has_next_page: request.page < total_pages,
            has_prev_page: request.page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InquiryPage {
    pub inquiries: Vec<Inquiry>,
    pub pagination: Pagination,
}

impl ListQuery {
    /// Build the store filter. Blank strings mean "no filter"; an unknown
    /// status is rejected rather than silently matching nothing.
    pub fn filter(&self) -> Result<InquiryFilter> {
        let status = match non_blank(&self.status) {
            Some(raw) => Some(InquiryStatus::parse_field("status", &raw)?),
            None => None,
        };
        Ok(InquiryFilter {
            status,
            phone: non_blank(&self.phone),
            reference_code: non_blank(&self.reference_code),
        })
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref())
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl CrmService {
    /// One page of inquiries, newest first, with pagination metadata.
    pub async fn list_inquiries(&self, query: ListQuery) -> Result<InquiryPage> {
        let filter = query.filter()?;
        let request = query.page_request();

        let store = self.store.lock().await;
        let total = store.count_inquiries(&filter)?;
        let inquiries = store.list_inquiries(&filter, request.offset(), request.limit)?;
        drop(store);

        debug!(
            page = request.page,
            limit = request.limit,
            total,
            returned = inquiries.len(),
            "listed inquiries"
        );

        Ok(InquiryPage {
            inquiries,
            pagination: Pagination::compute(request, total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrmError;
    use crate::service::test_support::{service, submit};
    use crate::service::StatusUpdate;

    fn query(page: Option<&str>, limit: Option<&str>) -> ListQuery {
        ListQuery {
            page: page.map(String::from),
            limit: limit.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_page_request_coercion() {
        assert_eq!(PageRequest::from_raw(None, None), PageRequest::default());
        assert_eq!(
            PageRequest::from_raw(Some("abc"), Some("-3")),
            PageRequest::default()
        );
        assert_eq!(
            PageRequest::from_raw(Some("0"), Some("0")),
            PageRequest::default()
        );
        assert_eq!(
            PageRequest::from_raw(Some("3"), Some("25")),
            PageRequest { page: 3, limit: 25 }
        );
        assert_eq!(
            PageRequest::from_raw(Some("2.0"), Some("20px")),
            PageRequest { page: 2, limit: 20 }
        );
        assert_eq!(
            PageRequest::from_raw(Some(" +4 "), Some("7e2")),
            PageRequest { page: 4, limit: 7 }
        );
        assert_eq!(
            PageRequest::from_raw(Some(".5"), Some("-0")),
            PageRequest::default()
        );
    }

    #[test]
    fn test_large_limit_is_honored() {
        assert_eq!(PageRequest::from_raw(None, Some("500")).limit, 500);
        let p = Pagination::compute(PageRequest::from_raw(None, Some("500")), 250);
        assert_eq!(p.total_pages, 1);
        assert!(!p.has_next_page);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest { page: 1, limit: 10 }.offset(), 0);
        assert_eq!(PageRequest { page: 3, limit: 10 }.offset(), 20);
    }

    #[test]
    fn test_pagination_math() {
        let p = Pagination::compute(PageRequest { page: 2, limit: 10 }, 15);
        assert_eq!(p.total_pages, 2);
        assert!(!p.has_next_page);
        assert!(p.has_prev_page);

        let empty = Pagination::compute(PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_prev_page);

        let exact = Pagination::compute(PageRequest { page: 1, limit: 10 }, 20);
        assert_eq!(exact.total_pages, 2);
        assert!(exact.has_next_page);
    }

    #[test]
    fn test_pagination_serializes_camel_case() {
        let json = serde_json::to_value(Pagination::compute(PageRequest::default(), 3)).unwrap();
        assert_eq!(json["currentPage"], 1);
        assert_eq!(json["totalPages"], 1);
        assert_eq!(json["totalInquiries"], 3);
        assert_eq!(json["hasNextPage"], false);
        assert_eq!(json["hasPrevPage"], false);
    }

    #[tokio::test]
    async fn test_second_page_of_fifteen() {
        let service = service();
        for i in 0..15 {
            submit(&service, &format!("Client {i}"), &format!("555-{i:02}")).await;
        }

        let page = service
            .list_inquiries(query(Some("2"), Some("10")))
            .await
            .unwrap();
        assert_eq!(page.inquiries.len(), 5);
        assert_eq!(page.pagination.total_inquiries, 15);
        assert_eq!(page.pagination.total_pages, 2);
        assert!(!page.pagination.has_next_page);
        assert!(page.pagination.has_prev_page);

        // Newest first: page 2 ends with the very first submission.
        assert_eq!(page.inquiries.last().unwrap().name, "Client 0");
    }

    #[tokio::test]
    async fn test_empty_store() {
        let service = service();
        let page = service.list_inquiries(ListQuery::default()).await.unwrap();
        assert!(page.inquiries.is_empty());
        assert_eq!(page.pagination.total_inquiries, 0);
        assert_eq!(page.pagination.total_pages, 0);
        assert_eq!(page.pagination.current_page, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_page_is_empty() {
        let service = service();
        for i in 0..3 {
            submit(&service, &format!("Client {i}"), "555").await;
        }
        let page = service.list_inquiries(query(Some("9"), None)).await.unwrap();
        assert!(page.inquiries.is_empty());
        assert_eq!(page.pagination.current_page, 9);
        assert_eq!(page.pagination.total_pages, 1);
        assert!(!page.pagination.has_next_page);
        assert!(page.pagination.has_prev_page);
    }

    #[tokio::test]
    async fn test_status_filter_is_exact() {
        let service = service();
        let a = submit(&service, "Ann", "555").await;
        submit(&service, "Bob", "556").await;
        service
            .update_status(
                &a.id.to_string(),
                StatusUpdate {
                    status: Some("Done".into()),
                },
            )
            .await
            .unwrap();

        let done = service
            .list_inquiries(ListQuery {
                status: Some("Done".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(done.inquiries.len(), 1);
        assert!(done.inquiries.iter().all(|i| i.status == InquiryStatus::Done));

        let err = service
            .list_inquiries(ListQuery {
                status: Some("done".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::InvalidEnumValue { .. }));
    }

    #[tokio::test]
    async fn test_phone_and_code_filters() {
        let service = service();
        let ann = submit(&service, "Ann", "+1 555 0100").await;
        submit(&service, "Bob", "+44 20 7946").await;

        let by_phone = service
            .list_inquiries(ListQuery {
                phone: Some("555".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_phone.inquiries, vec![ann.clone()]);

        let by_code = service
            .list_inquiries(ListQuery {
                reference_code: Some(ann.reference_code.to_lowercase()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_code.inquiries, vec![ann]);

        let blank = service
            .list_inquiries(ListQuery {
                phone: Some("   ".into()),
                status: Some(String::new()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(blank.pagination.total_inquiries, 2);
    }
}
