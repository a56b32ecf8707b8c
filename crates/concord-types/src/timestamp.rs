//! UTC timestamps for ledger events and packets.
//!
//! Timestamps are written in a fixed-width RFC 3339 form
//! (`2026-10-16T09:30:00Z`) but always compared as parsed instants, so a
//! peer that writes sub-second precision or a numeric offset still orders
//! correctly.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::TypeError;

/// The current UTC time in the canonical ledger format.
pub fn now() -> String {
    format(Utc::now())
}

/// Format an instant in the canonical ledger format.
pub fn format(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 timestamp into a UTC instant.
pub fn parse(value: &str) -> Result<DateTime<Utc>, TypeError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TypeError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_fixed_width() {
        let ts = now();
        assert_eq!(ts.len(), "2026-10-16T09:30:00Z".len());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn format_parse_agree() {
        let ts = "2026-01-02T03:04:05Z";
        assert_eq!(format(parse(ts).unwrap()), ts);
    }

    #[test]
    fn offsets_compare_as_instants() {
        let utc = parse("2026-01-01T10:00:00Z").unwrap();
        let shifted = parse("2026-01-01T11:30:00+02:00").unwrap();
        assert!(shifted < utc);
    }

    #[test]
    fn fractional_seconds_order_correctly() {
        let a = parse("2026-01-01T10:00:00.5Z").unwrap();
        let b = parse("2026-01-01T10:00:00.25Z").unwrap();
        assert!(b < a);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            parse("yesterday"),
            Err(TypeError::InvalidTimestamp { .. })
        ));
    }
}
