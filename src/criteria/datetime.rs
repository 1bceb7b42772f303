//! Date/time and age parsing for temporal criteria
//!
//! Values without an explicit offset are placed into a [`NaiveZone`]:
//! operands typed by the user are local time, stored values are local
//! time except for `last_auth`, whose legacy values were written in UTC.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::errors::CriteriaError;

/// Formats carrying an explicit UTC offset
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M%z",
    "%Y-%m-%dT%H:%M%z",
];

/// Formats without an offset
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Legacy storage format for validity periods
const LEGACY_FORMAT: &str = "%d/%m/%y %H:%M";

/// Zone assumed for values that carry no offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaiveZone {
    Local,
    Utc,
}

impl NaiveZone {
    fn place(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            NaiveZone::Utc => Some(Utc.from_utc_datetime(&naive)),
            NaiveZone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// Parse a date/time, placing offset-less values into `zone`.
///
/// Returns `None` when the text is not a recognised date/time.
pub fn parse_datetime(text: &str, zone: NaiveZone) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return zone.place(naive);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return zone.place(date.and_hms_opt(0, 0, 0)?);
    }
    None
}

/// Parse a stored value, which may also be in the legacy format
pub fn parse_stored(text: &str, zone: NaiveZone) -> Option<DateTime<Utc>> {
    parse_datetime(text, zone).or_else(|| {
        NaiveDateTime::parse_from_str(text.trim(), LEGACY_FORMAT)
            .ok()
            .and_then(|naive| zone.place(naive))
    })
}

/// Age threshold for the last authentication, e.g. `10h`, `7d` or `2y`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthAge {
    amount: i64,
    unit: AgeUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgeUnit {
    Hours,
    Days,
    Years,
}

impl AuthAge {
    /// The age as a duration. A year counts as 365 days.
    pub fn duration(&self) -> Duration {
        let hours = match self.unit {
            AgeUnit::Hours => self.amount,
            AgeUnit::Days => self.amount * 24,
            AgeUnit::Years => self.amount * 24 * 365,
        };
        Duration::hours(hours)
    }

    /// Whether an authentication at `last_auth` is more recent than the age
    pub fn is_newer(&self, last_auth: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        last_auth + self.duration() > now
    }
}

impl FromStr for AuthAge {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CriteriaError::malformed(s, "expected an age like 10h, 7d or 2y");

        let s = s.trim();
        let split = s.len().checked_sub(1).ok_or_else(malformed)?;
        if !s.is_char_boundary(split) {
            return Err(malformed());
        }
        let (amount, unit) = s.split_at(split);

        let unit = match unit {
            "h" => AgeUnit::Hours,
            "d" => AgeUnit::Days,
            "y" => AgeUnit::Years,
            _ => return Err(malformed()),
        };
        let amount: i64 = amount.parse().map_err(|_| malformed())?;
        // keeps the hour count far inside the range chrono can represent
        if !(0..=100_000).contains(&amount) {
            return Err(malformed());
        }

        Ok(Self { amount, unit })
    }
}

impl fmt::Display for AuthAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            AgeUnit::Hours => 'h',
            AgeUnit::Days => 'd',
            AgeUnit::Years => 'y',
        };
        write!(f, "{}{}", self.amount, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_explicit_offsets() {
        assert_eq!(
            parse_datetime("2021-06-01T10:00:00+02:00", NaiveZone::Local),
            Some(utc(2021, 6, 1, 8, 0))
        );
        assert_eq!(
            parse_datetime("2021-06-01 10:00:00.123456+0200", NaiveZone::Local)
                .map(|d| d.timestamp()),
            Some(utc(2021, 6, 1, 8, 0).timestamp())
        );
        assert_eq!(
            parse_datetime("2021-06-01T10:00:00Z", NaiveZone::Local),
            Some(utc(2021, 6, 1, 10, 0))
        );
    }

    #[test]
    fn test_naive_values_use_zone() {
        assert_eq!(
            parse_datetime("2019-05-01 12:30", NaiveZone::Utc),
            Some(utc(2019, 5, 1, 12, 30))
        );
        assert_eq!(
            parse_datetime("2020-01-01", NaiveZone::Utc),
            Some(utc(2020, 1, 1, 0, 0))
        );
        assert!(parse_datetime("2020-01-01", NaiveZone::Local).is_some());
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_datetime("", NaiveZone::Utc), None);
        assert_eq!(parse_datetime("yesterday", NaiveZone::Utc), None);
        assert_eq!(parse_datetime("2020-13-45", NaiveZone::Utc), None);
    }

    #[test]
    fn test_legacy_stored_format() {
        assert_eq!(parse_datetime("24/12/20 18:00", NaiveZone::Utc), None);
        assert_eq!(
            parse_stored("24/12/20 18:00", NaiveZone::Utc),
            Some(utc(2020, 12, 24, 18, 0))
        );
    }

    #[test]
    fn test_auth_age_parsing() {
        let age: AuthAge = "10h".parse().unwrap();
        assert_eq!(age.duration(), Duration::hours(10));
        let age: AuthAge = "7d".parse().unwrap();
        assert_eq!(age.duration(), Duration::days(7));
        let age: AuthAge = "2y".parse().unwrap();
        assert_eq!(age.duration(), Duration::days(730));
        assert_eq!(age.to_string(), "2y");

        assert!("".parse::<AuthAge>().is_err());
        assert!("d".parse::<AuthAge>().is_err());
        assert!("10w".parse::<AuthAge>().is_err());
        assert!("-1d".parse::<AuthAge>().is_err());
        assert!("1é".parse::<AuthAge>().is_err());
    }

    #[test]
    fn test_auth_age_recency() {
        let age: AuthAge = "7d".parse().unwrap();
        let now = utc(2024, 3, 10, 12, 0);
        assert!(age.is_newer(utc(2024, 3, 8, 12, 0), now));
        assert!(!age.is_newer(utc(2024, 3, 1, 12, 0), now));
    }
}
