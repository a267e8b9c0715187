use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Renders unix seconds as an RFC 3339 UTC timestamp like `2020-01-01T00:00:00Z`.
pub fn to_iso8601(unix: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(unix, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Parses the date a user asks about into unix seconds.
///
/// Accepts `YYYY-MM-DD` (midnight UTC), `YYYY-MM-DDTHH:MM:SS` (UTC),
/// a full RFC 3339 timestamp, or plain unix seconds.
pub fn parse_target_date(input: &str) -> crate::Result<i64> {
    let input = input.trim();
    let invalid = || crate::Error::InvalidDate(input.to_string());

    if input.is_empty() {
        return Err(invalid());
    }

    if let Ok(seconds) = input.parse::<i64>() {
        return Ok(seconds);
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        return Ok(midnight.and_utc().timestamp());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.timestamp());
    }

    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_date() {
        assert_eq!(parse_target_date("2020-01-01").unwrap(), 1_577_836_800);
        assert_eq!(parse_target_date(" 2020-01-01 ").unwrap(), 1_577_836_800);
        assert_eq!(
            parse_target_date("2020-01-01T01:00:00+01:00").unwrap(),
            1_577_836_800
        );
        assert_eq!(parse_target_date("2020-01-01T00:00:10").unwrap(), 1_577_836_810);
        assert_eq!(parse_target_date("1577836800").unwrap(), 1_577_836_800);
    }

    #[test]
    fn test_parse_target_date_rejects_garbage() {
        assert!(parse_target_date("").is_err());
        assert!(parse_target_date("yesterday").is_err());
        assert!(parse_target_date("2020-13-01").is_err());
    }

    #[test]
    fn test_to_iso8601() {
        assert_eq!(to_iso8601(1_577_836_800).unwrap(), "2020-01-01T00:00:00Z");
        assert_eq!(to_iso8601(0).unwrap(), "1970-01-01T00:00:00Z");
    }
}
