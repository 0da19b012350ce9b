//! HTTP route handlers

pub mod auth;
pub mod calendar;
pub mod diary;
pub mod extract;
pub mod google;
pub mod photos;
pub mod settings;
pub mod timeline;
pub mod user;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{ApiError, Result};

/// Parse a path or body id, naming the field in the error.
pub(crate) fn parse_uuid(value: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::Parse(format!("Invalid {field}: {value}")))
}

/// Parse a `YYYY-MM-DD` date.
pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::Parse(format!("Invalid date (expected YYYY-MM-DD): {value}")))
}

/// Reject text fields Postgres cannot store.
pub(crate) fn reject_nul<'a>(
    fields: impl IntoIterator<Item = (&'static str, Option<&'a str>)>,
) -> Result<()> {
    for (field, value) in fields {
        if value.is_some_and(|v| v.contains('\0')) {
            return Err(ApiError::BadRequest(format!(
                "{field} must not contain NUL characters"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_nul() {
        assert!(reject_nul([("title", Some("Lunch")), ("location", None)]).is_ok());
        let err = reject_nul([("title", Some("Lu\0nch"))]).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m.starts_with("title")));
    }

    #[test]
    fn test_parse_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid(&id.to_string(), "diary_id").unwrap(), id);
        let err = parse_uuid("nope", "diary_id").unwrap_err();
        assert_eq!(err.to_string(), "Parse error: Invalid diary_id: nope");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-03-14").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
        );
        assert!(parse_date("14/03/2026").is_err());
        assert!(parse_date("2026-02-30").is_err());
    }
}
