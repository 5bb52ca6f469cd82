use crate::errors::ServiceError;
use crate::services::Page;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

const MAX_PER_PAGE: u64 = 100;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Result type shared by the JSON handlers
pub type HandlerResult = Result<Response, ServiceError>;

/// Pagination parameters for list operations
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Page numbers start at 1; page sizes are kept between 1 and 100.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }
}

/// Standard pagination response metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page.max(1)),
        }
    }
}

/// Standard paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(page: Page<T>, params: PaginationParams) -> Self {
        Self {
            pagination: PaginationMeta::new(params.page, params.per_page, page.total),
            data: page.items,
        }
    }
}

/// Lists a page and wraps it with its pagination metadata.
pub fn paginated<T: Serialize>(page: Page<T>, params: PaginationParams) -> Response {
    success_response(PaginatedResponse::new(page, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 1, 1)]
    #[case(3, 500, 3, 100)]
    #[case(2, 15, 2, 15)]
    fn pagination_is_normalized(
        #[case] page: u64,
        #[case] per_page: u64,
        #[case] expected_page: u64,
        #[case] expected_per_page: u64,
    ) {
        let params = PaginationParams { page, per_page }.normalized();
        assert_eq!(params.page, expected_page);
        assert_eq!(params.per_page, expected_per_page);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(20, 1)]
    #[case(21, 2)]
    fn total_pages_round_up(#[case] total: u64, #[case] pages: u64) {
        assert_eq!(PaginationMeta::new(1, 20, total).total_pages, pages);
    }
}
