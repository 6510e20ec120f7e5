use crate::error::UsageError;
use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};

/// Parses the `--start` / `--end` date arguments into epoch seconds
pub struct TimestampParser;

impl TimestampParser {
    /// Parse `yyyymmdd`, `yyyymmddhhmmss` or `yyyymmddThhmmss` into a naive datetime.
    /// A bare date means midnight at the start of that day.
    pub fn parse(date_str: &str) -> Result<NaiveDateTime, UsageError> {
        let invalid = || UsageError::InvalidDate(date_str.to_string());

        match date_str.len() {
            8 => NaiveDate::parse_from_str(date_str, "%Y%m%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .ok_or_else(invalid),
            14 => NaiveDateTime::parse_from_str(date_str, "%Y%m%d%H%M%S").map_err(|_| invalid()),
            15 => NaiveDateTime::parse_from_str(date_str, "%Y%m%dT%H%M%S").map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    /// Parse and convert to whole epoch seconds, reading the value as local time
    pub fn to_epoch(date_str: &str) -> Result<i64, UsageError> {
        let naive = Self::parse(date_str)?;
        // Times skipped by a DST jump have no local reading at all.
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp())
            .ok_or_else(|| UsageError::InvalidDate(date_str.to_string()))
    }
}
