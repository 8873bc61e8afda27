//! Timestamp parsing, formatting, and uniqueness resolution.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::error::SensorError;

/// The legacy human-readable timestamp form accepted alongside epoch millis.
const LEGACY_FORMAT: &str = "%m/%d/%Y-%H:%M:%S";

/// Resolves a candidate timestamp to the value actually assigned to a record.
///
/// Implementations that guarantee uniqueness must never return a value they
/// have returned before within the same run.
pub trait TimestampResolver {
    fn resolve(&mut self, candidate_millis: i64) -> i64;
}

/// Resolver that guarantees a unique timestamp per call by probing linearly
/// upward from the candidate, one millisecond at a time, until a free slot is
/// found. The probing policy is an implementation detail; callers may only
/// rely on uniqueness and on resolved values never being below the candidate.
#[derive(Debug, Default)]
pub struct UniqueTstampSet {
    used: HashSet<i64>,
}

impl UniqueTstampSet {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimestampResolver for UniqueTstampSet {
    fn resolve(&mut self, candidate_millis: i64) -> i64 {
        let mut millis = candidate_millis;
        while !self.used.insert(millis) {
            millis += 1;
        }
        millis
    }
}

/// Resolver that echoes the candidate unchanged, for runs where timestamp
/// collisions are acceptable.
#[derive(Debug, Default)]
pub struct PassthroughTstamps;

impl TimestampResolver for PassthroughTstamps {
    fn resolve(&mut self, candidate_millis: i64) -> i64 {
        candidate_millis
    }
}

/// Returns the current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parses a timestamp given either as epoch milliseconds or in the legacy
/// `MM/dd/yyyy-HH:mm:ss` form.
pub fn parse_timestamp_millis(text: &str) -> Result<i64, SensorError> {
    if let Ok(millis) = text.parse::<i64>() {
        return Ok(millis);
    }
    NaiveDateTime::parse_from_str(text, LEGACY_FORMAT)
        .map(|datetime| datetime.and_utc().timestamp_millis())
        .map_err(|_| SensorError::Timestamp {
            text: text.to_string(),
            reason: format!(
                "must be epoch milliseconds or match the format {}",
                "MM/dd/yyyy-HH:mm:ss"
            ),
        })
}

/// Formats epoch milliseconds as an RFC 3339 UTC timestamp, or `None` when
/// the value is outside the representable range.
pub fn format_timestamp(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|datetime| datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_set_echoes_fresh_candidates() {
        let mut tstamps = UniqueTstampSet::new();
        assert_eq!(tstamps.resolve(1000), 1000);
        assert_eq!(tstamps.resolve(5000), 5000);
    }

    #[test]
    fn test_unique_set_probes_past_collisions() {
        let mut tstamps = UniqueTstampSet::new();
        assert_eq!(tstamps.resolve(1000), 1000);
        assert_eq!(tstamps.resolve(1000), 1001);
        assert_eq!(tstamps.resolve(1000), 1002);
        assert_eq!(tstamps.resolve(1001), 1003);
    }

    #[test]
    fn test_unique_set_never_repeats() {
        let mut tstamps = UniqueTstampSet::new();
        let mut seen = HashSet::new();
        for _ in 0..500 {
            assert!(seen.insert(tstamps.resolve(42)));
        }
    }

    #[test]
    fn test_passthrough_allows_collisions() {
        let mut tstamps = PassthroughTstamps;
        assert_eq!(tstamps.resolve(7), 7);
        assert_eq!(tstamps.resolve(7), 7);
    }

    #[test]
    fn test_parse_epoch_millis() {
        assert_eq!(parse_timestamp_millis("1096236000000").unwrap(), 1_096_236_000_000);
        assert_eq!(parse_timestamp_millis("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_legacy_format() {
        let millis = parse_timestamp_millis("01/02/2006-15:04:05").unwrap();
        let formatted = format_timestamp(millis).unwrap();
        assert!(formatted.starts_with("2006-01-02T15:04:05"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let error = parse_timestamp_millis("yesterday").unwrap_err();
        assert!(matches!(error, SensorError::Timestamp { text, .. } if text == "yesterday"));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(0).as_deref(),
            Some("1970-01-01T00:00:00.000Z")
        );
        assert!(format_timestamp(i64::MAX).is_none());
    }
}
