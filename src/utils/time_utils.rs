use chrono::{NaiveDate, TimeZone, Utc};

// Dates in filter query params use this exact format,
// same as the old API:
const DATE_FORMAT_COMPACT: &'static str = "%Y-%m-%d";

pub fn current_timestamp() -> i64 {
  Utc::now().timestamp()
}

// All the timestamps in database are unix seconds, the
// JSON output wants something humans can read.
pub fn timestamp_to_rfc3339(timestamp: i64) -> String {
  Utc.timestamp(timestamp, 0).to_rfc3339()
}

// Parses "YYYY-MM-DD" into a unix timestamp at midnight
// UTC. Returns None for anything else, which handlers
// turn into a 400.
pub fn parse_compact_date(value: &str) -> Option<i64> {
  NaiveDate::parse_from_str(value, DATE_FORMAT_COMPACT)
    .ok()
    .map(|d| d.and_hms(0, 0, 0).timestamp())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_valid_compact_date() {
    // 2024-01-01 00:00:00 UTC
    assert_eq!(parse_compact_date("2024-01-01"), Some(1704067200));
  }

  #[test]
  fn parse_garbage_compact_date() {
    assert_eq!(parse_compact_date("01/02/2024"), None);
    assert_eq!(parse_compact_date("2024-13-40"), None);
    assert_eq!(parse_compact_date(""), None);
  }

  #[test]
  fn timestamp_formats_as_rfc3339() {
    assert_eq!(
      timestamp_to_rfc3339(1704067200),
      "2024-01-01T00:00:00+00:00"
    );
  }
}
