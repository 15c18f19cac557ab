//! Request Validation
//!
//! Field-level validation for create/update payloads. Violations are
//! collected per field so a single response enumerates every problem, and
//! surface as one `VALIDATION_ERROR` with a `details` array of
//! `{ field, message }` entries.

use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::shared::error::{Result, TrackingError};

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Collector for per-field validation failures.
#[derive(Debug, Default)]
pub struct Violations {
    errors: Vec<FieldError>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Resolve the collected state: `Ok(())` when clean, otherwise one
    /// validation error carrying every field message.
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let fields: Vec<&str> = self.errors.iter().map(|e| e.field.as_str()).collect();
        let message = format!("Invalid fields: {}", fields.join(", "));
        let details = serde_json::to_value(&self.errors)?;
        Err(TrackingError::validation_with_details(message, details))
    }
}

/// Decode a JSON body into a strict DTO. Unknown fields are rejected here
/// (DTOs carry `deny_unknown_fields`), wrapped in the standard envelope.
pub fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| TrackingError::validation(format!("Invalid request body: {}", e)))
}

/// Required trimmed text within length bounds.
pub fn required_text(
    v: &mut Violations,
    field: &str,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> Option<String> {
    let Some(raw) = value else {
        v.add(field, format!("{} is required", field));
        return None;
    };
    let trimmed = raw.trim();
    if trimmed.len() < min {
        v.add(field, format!("{} must be at least {} characters", field, min));
        return None;
    }
    if trimmed.len() > max {
        v.add(field, format!("{} must be at most {} characters", field, max));
        return None;
    }
    Some(trimmed.to_string())
}

/// Optional trimmed text; empty strings normalize to absent.
pub fn optional_text(
    v: &mut Violations,
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Option<String> {
    let trimmed = value.map(str::trim).unwrap_or("");
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() > max {
        v.add(field, format!("{} must be at most {} characters", field, max));
        return None;
    }
    Some(trimmed.to_string())
}

/// Required enumerated field canonicalized through the given table lookup.
pub fn required_enum<T>(
    v: &mut Violations,
    field: &str,
    value: Option<&str>,
    lookup: fn(&str) -> Option<T>,
) -> Option<T> {
    let Some(raw) = value else {
        v.add(field, format!("{} is required", field));
        return None;
    };
    match lookup(raw) {
        Some(parsed) => Some(parsed),
        None => {
            v.add(field, format!("{} has unknown value: {}", field, raw));
            None
        }
    }
}

/// Optional enumerated field; present-but-unknown values are violations.
pub fn optional_enum<T>(
    v: &mut Violations,
    field: &str,
    value: Option<&str>,
    lookup: fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = value.map(str::trim).filter(|s| !s.is_empty())?;
    match lookup(raw) {
        Some(parsed) => Some(parsed),
        None => {
            v.add(field, format!("{} has unknown value: {}", field, raw));
            None
        }
    }
}

/// Parse a date field accepting either `YYYY-MM-DD` or a full RFC 3339
/// timestamp; both forms normalize to a plain date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}

pub fn required_date(v: &mut Violations, field: &str, value: Option<&str>) -> Option<NaiveDate> {
    let Some(raw) = value else {
        v.add(field, format!("{} is required", field));
        return None;
    };
    match parse_date(raw) {
        Some(date) => Some(date),
        None => {
            v.add(field, format!("{} must be a date (YYYY-MM-DD) or timestamp", field));
            None
        }
    }
}

pub fn optional_date(v: &mut Violations, field: &str, value: Option<&str>) -> Option<NaiveDate> {
    let raw = value.map(str::trim).filter(|s| !s.is_empty())?;
    match parse_date(raw) {
        Some(date) => Some(date),
        None => {
            v.add(field, format!("{} must be a date (YYYY-MM-DD) or timestamp", field));
            None
        }
    }
}

pub fn required_positive_f64(v: &mut Violations, field: &str, value: Option<f64>) -> Option<f64> {
    let Some(n) = value else {
        v.add(field, format!("{} is required", field));
        return None;
    };
    if !n.is_finite() || n <= 0.0 {
        v.add(field, format!("{} must be positive", field));
        return None;
    }
    Some(n)
}

pub fn required_nonnegative_f64(v: &mut Violations, field: &str, value: Option<f64>) -> Option<f64> {
    let Some(n) = value else {
        v.add(field, format!("{} is required", field));
        return None;
    };
    if !n.is_finite() || n < 0.0 {
        v.add(field, format!("{} must not be negative", field));
        return None;
    }
    Some(n)
}

pub fn optional_nonnegative_f64(v: &mut Violations, field: &str, value: Option<f64>) -> Option<f64> {
    let n = value?;
    if !n.is_finite() || n < 0.0 {
        v.add(field, format!("{} must not be negative", field));
        return None;
    }
    Some(n)
}

pub fn required_positive_int(v: &mut Violations, field: &str, value: Option<i64>) -> Option<i64> {
    let Some(n) = value else {
        v.add(field, format!("{} is required", field));
        return None;
    };
    if n <= 0 {
        v.add(field, format!("{} must be a positive integer", field));
        return None;
    }
    Some(n)
}

pub fn optional_positive_int(v: &mut Violations, field: &str, value: Option<i64>) -> Option<i64> {
    let n = value?;
    if n <= 0 {
        v.add(field, format!("{} must be a positive integer", field));
        return None;
    }
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::canon::Sector;

    #[test]
    fn test_finish_collects_all_fields() {
        let mut v = Violations::new();
        v.add("daysAbsent", "daysAbsent is required");
        v.add("sector", "sector has unknown value: Padaria");

        let err = v.finish().unwrap_err();
        match err {
            TrackingError::Validation { message, details } => {
                assert!(message.contains("daysAbsent"));
                assert!(message.contains("sector"));
                let details = details.unwrap();
                assert_eq!(details.as_array().unwrap().len(), 2);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_required_text_bounds() {
        let mut v = Violations::new();
        assert_eq!(
            required_text(&mut v, "name", Some("  Maria Silva  "), 1, 120),
            Some("Maria Silva".to_string())
        );
        assert!(v.is_empty());

        required_text(&mut v, "name", Some(""), 1, 120);
        required_text(&mut v, "unit", Some("a-very-long-unit-name-here"), 1, 10);
        required_text(&mut v, "missing", None, 1, 120);
        assert!(v.finish().is_err());
    }

    #[test]
    fn test_optional_text_empty_is_absent() {
        let mut v = Violations::new();
        assert_eq!(optional_text(&mut v, "notes", Some(""), 500), None);
        assert_eq!(optional_text(&mut v, "notes", Some("   "), 500), None);
        assert_eq!(optional_text(&mut v, "notes", None, 500), None);
        assert_eq!(
            optional_text(&mut v, "notes", Some(" ok "), 500),
            Some("ok".to_string())
        );
        assert!(v.is_empty());
    }

    #[test]
    fn test_required_enum_canonicalizes() {
        let mut v = Violations::new();
        let sector = required_enum(&mut v, "sector", Some("Pães"), Sector::from_input);
        assert_eq!(sector, Some(Sector::Paes));
        assert!(v.is_empty());

        let missing = required_enum(&mut v, "sector", Some("Cozinha"), Sector::from_input);
        assert_eq!(missing, None);
        assert!(v.finish().is_err());
    }

    #[test]
    fn test_parse_date_both_forms() {
        assert_eq!(
            parse_date("2026-03-15"),
            NaiveDate::from_ymd_opt(2026, 3, 15)
        );
        assert_eq!(
            parse_date("2026-03-15T10:30:00Z"),
            NaiveDate::from_ymd_opt(2026, 3, 15)
        );
        assert_eq!(parse_date("15/03/2026"), None);
    }

    #[test]
    fn test_numeric_constraints() {
        let mut v = Violations::new();
        assert_eq!(required_positive_f64(&mut v, "quantity", Some(10.0)), Some(10.0));
        assert_eq!(required_nonnegative_f64(&mut v, "unitCost", Some(0.0)), Some(0.0));
        assert_eq!(required_positive_int(&mut v, "daysAbsent", Some(2)), Some(2));
        assert!(v.is_empty());

        required_positive_f64(&mut v, "quantity", Some(0.0));
        required_positive_f64(&mut v, "quantity", Some(f64::NAN));
        required_nonnegative_f64(&mut v, "unitCost", Some(-1.0));
        required_positive_int(&mut v, "daysAbsent", Some(0));
        required_positive_int(&mut v, "daysAbsent", None);
        assert!(v.finish().is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_fields() {
        #[derive(serde::Deserialize, Debug)]
        #[serde(deny_unknown_fields, rename_all = "camelCase")]
        struct Dto {
            #[allow(dead_code)]
            name: Option<String>,
        }

        let ok: Result<Dto> = decode(serde_json::json!({ "name": "x" }));
        assert!(ok.is_ok());

        let bad: Result<Dto> = decode(serde_json::json!({ "name": "x", "extra": 1 }));
        let err = bad.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("extra"));
    }
}
