//! Common API types and utilities

use utoipa::{ToSchema, IntoParams};
use serde::{Deserialize, Serialize};

use crate::shared::error::{Result, TrackingError};

pub(crate) mod string_or_number {
    use serde::{de, Deserialize, Deserializer};

    // Query strings always carry numbers as strings, and flattened query
    // structs buffer every field through serde content, so both forms
    // must be accepted.
    pub fn deserialize_u32_opt<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNum {
            Num(u32),
            Str(String),
        }

        match Option::<StringOrNum>::deserialize(deserializer)? {
            Some(StringOrNum::Num(n)) => Ok(Some(n)),
            Some(StringOrNum::Str(s)) => s.parse().map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }

    pub fn deserialize_i64_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNum {
            Num(i64),
            Str(String),
        }

        match Option::<StringOrNum>::deserialize(deserializer)? {
            Some(StringOrNum::Num(n)) => Ok(Some(n)),
            Some(StringOrNum::Str(s)) => s.parse().map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

/// Pagination parameters (`?page=&limit=`), 1-based.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    #[serde(default, deserialize_with = "string_or_number::deserialize_u32_opt")]
    page: Option<u32>,
    #[serde(default, deserialize_with = "string_or_number::deserialize_u32_opt")]
    limit: Option<u32>,
}

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

impl PaginationParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn skip(&self) -> u64 {
        ((self.page() - 1) as u64) * (self.limit() as u64)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: Some(1),
            limit: Some(DEFAULT_LIMIT),
        }
    }
}

/// Page metadata attached to every list response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
}

impl PageMeta {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = ((total as f64) / (limit as f64)).ceil() as u32;
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
        }
    }
}

/// Success envelope: `{ success: true, data, message? }`
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

/// List envelope: `{ success: true, data: [...], pagination: {...} }`
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>, pagination: PageMeta) -> Self {
        Self {
            success: true,
            data,
            pagination,
        }
    }
}

/// Validate a path id parameter: must match `^\d+$`.
///
/// Rejected before any service call; a non-numeric id never reaches the
/// persistence layer.
pub fn parse_id(raw: &str) -> Result<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TrackingError::validation(format!(
            "Invalid identifier: {}",
            raw
        )));
    }
    raw.parse::<i64>().map_err(|_| {
        TrackingError::validation(format!("Invalid identifier: {}", raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 20);
        assert_eq!(params.skip(), 0);
    }

    #[test]
    fn test_pagination_skip() {
        let params = PaginationParams { page: Some(3), limit: Some(20) };
        assert_eq!(params.skip(), 40);
    }

    #[test]
    fn test_limit_clamped() {
        let params = PaginationParams { page: Some(1), limit: Some(10_000) };
        assert_eq!(params.limit(), 100);
    }

    #[test]
    fn test_page_meta_total_pages() {
        let meta = PageMeta::new(1, 20, 45);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);

        let meta = PageMeta::new(3, 20, 45);
        assert_eq!(meta.total_pages, 3);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_page_meta_empty() {
        let meta = PageMeta::new(1, 20, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_parse_id_valid() {
        assert_eq!(parse_id("7").unwrap(), 7);
        assert_eq!(parse_id("1234567").unwrap(), 1234567);
    }

    #[test]
    fn test_parse_id_rejects_non_numeric() {
        assert!(parse_id("abc").is_err());
        assert!(parse_id("12abc").is_err());
        assert!(parse_id("-1").is_err());
        assert!(parse_id("1.5").is_err());
        assert!(parse_id("").is_err());
    }
}
