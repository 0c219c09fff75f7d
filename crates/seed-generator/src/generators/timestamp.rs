//! Timestamp value generators.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use seed_core::SeedValue;

/// Default lower bound for synthesized timestamps.
pub const DEFAULT_START: &str = "2020-01-01T00:00:00Z";

/// Default upper bound for synthesized timestamps.
pub const DEFAULT_END: &str = "2025-12-31T23:59:59Z";

/// Generate a random timestamp in the given range.
///
/// The start and end are RFC 3339 timestamps or plain `YYYY-MM-DD` dates.
/// An unparsable bound falls back to the other one; if neither parses the
/// Unix epoch is used so the output stays deterministic.
pub fn generate_timestamp_range<R: Rng>(rng: &mut R, start: &str, end: &str) -> SeedValue {
    let value = match (parse_timestamp(start), parse_timestamp(end)) {
        (Some(start), Some(end)) => {
            let start_ts = start.timestamp();
            let end_ts = end.timestamp();

            if start_ts >= end_ts {
                start
            } else {
                let random_ts = rng.gen_range(start_ts..=end_ts);
                DateTime::from_timestamp(random_ts, 0).unwrap_or(start)
            }
        }
        (Some(dt), None) | (None, Some(dt)) => dt,
        (None, None) => DateTime::<Utc>::UNIX_EPOCH,
    };
    SeedValue::Timestamp(value)
}

/// Parse a timestamp string in various formats.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    None
}
