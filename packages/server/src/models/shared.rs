use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Page size used by list endpoints when `per_page` is omitted.
pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

/// Pagination metadata included in list responses.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 10)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 5)]
    pub total_pages: u64,
}

/// Clamp raw `page`/`per_page` query values to a usable (page, per_page) pair.
pub fn page_params(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    (
        Ord::max(page.unwrap_or(1), 1),
        per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
    )
}

/// Rows to skip for a 1-based `page`. Saturates instead of overflowing and stays
/// within the signed range databases accept for `OFFSET`.
pub fn page_offset(page: u64, per_page: u64) -> u64 {
    page.saturating_sub(1)
        .saturating_mul(per_page)
        .min(i64::MAX as u64)
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a record code such as a class or course ID: 1-20 chars, no whitespace.
pub fn validate_code(value: &str, field: &str) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > 20 {
        return Err(AppError::Validation(format!("{field} must be 1-20 characters")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(format!(
            "{field} must not contain whitespace"
        )));
    }
    Ok(())
}

/// Validate a required free-text field: non-blank and at most `max` characters.
pub fn validate_text(value: &str, field: &str, max: usize) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be 1-{max} characters"
        )));
    }
    Ok(())
}

/// Validate one raw score component.
pub fn validate_grade(value: f64, field: &str) -> Result<(), AppError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(AppError::Validation(format!(
            "{field} must be between 0 and 100"
        )));
    }
    Ok(())
}
