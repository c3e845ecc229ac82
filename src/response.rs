use axum::{response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;

#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }

    /// Cut one page out of an already ordered collection.
    pub fn from_sorted(all: Vec<T>, page: u64, per_page: u64) -> Self {
        let total = all.len() as u64;
        let skip = page.saturating_sub(1).saturating_mul(per_page) as usize;
        let items = all.into_iter().skip(skip).take(per_page as usize).collect();
        Self::new(items, total, page, per_page)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct PaginationQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PaginationQuery {
    /// Returns `(page, per_page)` with page >= 1 and per_page clamped to `1..=MAX_PER_PAGE`.
    pub fn resolve(&self) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_with_remainder() {
        let resp = PaginatedResponse::<String>::new(vec![], 101, 1, 20);
        assert_eq!(resp.total_pages, 6);
    }

    #[test]
    fn total_pages_zero_per_page() {
        let resp = PaginatedResponse::<String>::new(vec![], 10, 1, 0);
        assert_eq!(resp.total_pages, 0);
    }

    #[test]
    fn from_sorted_takes_requested_page() {
        let all: Vec<u32> = (1..=45).collect();
        let resp = PaginatedResponse::from_sorted(all, 3, 20);
        assert_eq!(resp.items, vec![41, 42, 43, 44, 45]);
        assert_eq!(resp.total, 45);
        assert_eq!(resp.total_pages, 3);
    }

    #[test]
    fn from_sorted_past_the_end_is_empty() {
        let resp = PaginatedResponse::from_sorted(vec![1, 2, 3], 5, 20);
        assert!(resp.items.is_empty());
        assert_eq!(resp.total, 3);
    }

    #[test]
    fn pagination_query_clamps() {
        let q = PaginationQuery {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(q.resolve(), (1, MAX_PER_PAGE));

        let q = PaginationQuery {
            page: None,
            per_page: None,
        };
        assert_eq!(q.resolve(), (1, DEFAULT_PER_PAGE));
    }
}
