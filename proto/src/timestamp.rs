//! Conversions between `google.protobuf.Timestamp` and `chrono`.

use chrono::{DateTime, SecondsFormat, Utc};
use prost_types::Timestamp;

pub fn from_datetime(value: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: value.timestamp(),
        nanos: value.timestamp_subsec_nanos() as i32,
    }
}

/// `None` when the value is outside chrono's range or carries negative nanos.
pub fn to_datetime(value: &Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(value.nanos).ok()?;
    DateTime::from_timestamp(value.seconds, nanos)
}

/// RFC 3339 in UTC with only as many fractional digits as needed.
pub fn to_rfc3339(value: &Timestamp) -> Option<String> {
    to_datetime(value).map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

pub fn parse_rfc3339(raw: &str) -> Result<Timestamp, chrono::ParseError> {
    let parsed = DateTime::parse_from_rfc3339(raw)?;
    Ok(from_datetime(parsed.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_second_precision_survives() {
        let ts = Timestamp {
            seconds: 0,
            nanos: 500_000_000,
        };
        let text = to_rfc3339(&ts).unwrap();
        assert_eq!(text, "1970-01-01T00:00:00.500Z");
        assert_eq!(parse_rfc3339(&text).unwrap(), ts);
    }

    #[test]
    fn negative_nanos_have_no_datetime() {
        let ts = Timestamp {
            seconds: 10,
            nanos: -1,
        };
        assert!(to_datetime(&ts).is_none());
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        let ts = parse_rfc3339("2023-11-15T00:13:20+02:00").unwrap();
        assert_eq!(ts.seconds, 1_700_000_000);
    }
}
