use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical EXIF `DateTimeOriginal` layout.
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Layout of the prefix put in front of every sorted file name.
pub const FILE_PREFIX_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Civil capture time at second precision. Never carries an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Drops any sub-second part of `value`. Leap seconds are rejected.
    pub fn new(value: NaiveDateTime) -> Option<Self> {
        if value.nanosecond() >= 1_000_000_000 {
            return None;
        }
        value.with_nanosecond(0).map(Self)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN))
    }

    /// Parses exactly `YYYY:MM:DD HH:MM:SS`, every field zero-padded.
    pub fn parse_exif(raw: &str) -> Option<Self> {
        if !has_exif_shape(raw) {
            return None;
        }
        NaiveDateTime::parse_from_str(raw, EXIF_DATE_FORMAT)
            .ok()
            .and_then(Self::new)
    }

    pub fn file_prefix(&self) -> String {
        self.0.format(FILE_PREFIX_FORMAT).to_string()
    }
}

fn has_exif_shape(raw: &str) -> bool {
    raw.len() == 19
        && raw.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 | 13 | 16 => b == b':',
            10 => b == b' ',
            _ => b.is_ascii_digit(),
        })
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateSource {
    Exif,
    FileName { rule: String },
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exif => f.write_str("exif"),
            Self::FileName { rule } => write!(f, "file name `{rule}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolved {
    pub timestamp: Timestamp,
    pub source: DateSource,
}

#[cfg(test)]
mod tests {
    use super::Timestamp;
    use chrono::{NaiveDate, NaiveDateTime};

    #[test]
    fn exif_string_reformats_as_file_prefix() {
        let ts = Timestamp::parse_exif("2024:03:15 09:07:00").expect("valid exif date");
        assert_eq!(ts.file_prefix(), "20240315-090700");
    }

    #[test]
    fn parse_exif_rejects_other_layouts() {
        assert!(Timestamp::parse_exif("2024-03-15 09:07:00").is_none());
        assert!(Timestamp::parse_exif("0000:00:00 00:00:00").is_none());
        assert!(Timestamp::parse_exif("").is_none());
    }

    #[test]
    fn parse_exif_requires_fixed_width_fields() {
        assert!(Timestamp::parse_exif("2019:1:5 3:4:5").is_none());
        assert!(Timestamp::parse_exif(" 2019:12:31 23:59:59 ").is_none());
        assert!(Timestamp::parse_exif("2019:12:31 23:59:59\n").is_none());
        assert!(Timestamp::parse_exif("2019:12:31T23:59:59").is_none());
        assert!(Timestamp::parse_exif("2019:12:31 23:59:59").is_some());
    }

    #[test]
    fn leap_seconds_are_rejected() {
        assert!(Timestamp::parse_exif("2019:12:31 23:59:60").is_none());

        let leap = NaiveDateTime::parse_from_str("2016-12-31 23:59:60", "%Y-%m-%d %H:%M:%S")
            .expect("chrono accepts a leap second");
        assert!(Timestamp::new(leap).is_none());
    }

    #[test]
    fn new_truncates_sub_second_precision() {
        let with_millis =
            NaiveDateTime::parse_from_str("2021-09-25 12:34:56.789", "%Y-%m-%d %H:%M:%S%.f")
                .expect("valid datetime");
        let ts = Timestamp::new(with_millis).expect("not a leap second");
        assert_eq!(ts.file_prefix(), "20210925-123456");
        assert_eq!(Some(ts), Timestamp::parse_exif("2021:09:25 12:34:56"));
    }

    #[test]
    fn from_date_defaults_to_midnight() {
        let date = NaiveDate::from_ymd_opt(2022, 7, 14).expect("valid date");
        assert_eq!(Timestamp::from_date(date).file_prefix(), "20220714-000000");
    }
}
