//! Calendar-day extraction for fuzzy matching.
//!
//! A record's day is taken in its own local offset: an RFC 3339 timestamp
//! keeps the offset it was written with, and a naive date or datetime is
//! already local. Nothing is converted to UTC first.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// A timestamp that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unparsable timestamp '{0}'")]
pub struct TimestampError(pub String);

/// The calendar day a timestamp falls on, in its own offset.
pub fn local_day(raw: &str) -> Result<Date, TimestampError> {
    let s = raw.trim();

    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(dt.date());
    }
    let naive_formats = [
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
        ),
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
        ),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    ];
    for format in naive_formats {
        if let Ok(dt) = PrimitiveDateTime::parse(s, format) {
            return Ok(dt.date());
        }
    }
    let date_formats = [
        format_description!("[year]-[month]-[day]"),
        format_description!("[day]/[month]/[year]"),
    ];
    for format in date_formats {
        if let Ok(date) = Date::parse(s, format) {
            return Ok(date);
        }
    }
    Err(TimestampError(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn plain_dates() {
        assert_eq!(local_day("2024-01-05"), Ok(date!(2024 - 01 - 05)));
        assert_eq!(local_day(" 05/01/2024 "), Ok(date!(2024 - 01 - 05)));
    }

    #[test]
    fn naive_datetimes() {
        assert_eq!(local_day("2024-02-03 23:59:59"), Ok(date!(2024 - 02 - 03)));
        assert_eq!(local_day("2024-02-03T08:15:00.123"), Ok(date!(2024 - 02 - 03)));
        assert_eq!(local_day("2024-02-03T08:15"), Ok(date!(2024 - 02 - 03)));
    }

    #[test]
    fn offset_timestamps_keep_their_own_day() {
        // 23:30 on the 5th in New York is already the 6th in UTC.
        assert_eq!(
            local_day("2024-01-05T23:30:00-05:00"),
            Ok(date!(2024 - 01 - 05))
        );
        assert_eq!(local_day("2024-01-05T00:10:00Z"), Ok(date!(2024 - 01 - 05)));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(local_day("yesterday").is_err());
        assert!(local_day("2024-13-01").is_err());
        assert!(local_day("").is_err());
    }
}
