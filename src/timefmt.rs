use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Canonical timestamp layout shared by every record this crate writes.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S UTC";

/// Timestamps as Epicollect5 exports them, e.g. `2021-06-01T10:15:30.123Z`.
pub const EC5_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Query-string layout expected by the ACTION database.
pub const ACTION_QUERY_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Query-string layout for Epicollect5 `filter_from` / `filter_to`.
pub const EC5_QUERY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Reformat an Epicollect5 timestamp into the canonical layout, dropping
/// sub-second precision.
pub fn ec5_to_canonical(value: &str) -> Result<String, chrono::ParseError> {
    let parsed = NaiveDateTime::parse_from_str(value, EC5_FORMAT)?;
    Ok(parsed.format(CANONICAL_FORMAT).to_string())
}

pub fn now_canonical() -> String {
    Utc::now().format(CANONICAL_FORMAT).to_string()
}

/// Command line date: `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_cli_date(value: &str) -> Result<NaiveDateTime, String> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .map_err(|_| format!("'{value}' is not YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS"))
}
