use crate::error::SortError;
use crate::metadata::Timestamp;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

/// How the captured part of a file name is turned into a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// Full date and time in chrono's `strftime` syntax.
    DateTime(&'static str),
    /// Date only; the time of day is midnight.
    Date(&'static str),
}

impl DateFormat {
    fn parse(self, text: &str) -> Option<Timestamp> {
        match self {
            Self::DateTime(fmt) => NaiveDateTime::parse_from_str(text, fmt)
                .ok()
                .and_then(Timestamp::new),
            Self::Date(fmt) => NaiveDate::parse_from_str(text, fmt)
                .ok()
                .map(Timestamp::from_date),
        }
    }
}

/// Built-in rules, most specific app conventions first. The first rule whose
/// pattern matches the whole file name decides.
pub const RULE_TABLE: &[(&str, DateFormat)] = &[
    (r"PHOTO-(\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2}).*", DateFormat::DateTime("%Y-%m-%d-%H-%M-%S")),
    (r"threema-(\d{8}-\d{9}).*", DateFormat::DateTime("%Y%m%d-%H%M%S%3f")),
    (r"image-(\d{8}-\d{6}).*", DateFormat::DateTime("%Y%m%d-%H%M%S")),
    (r"IMG-(\d{8})-WA.*", DateFormat::Date("%Y%m%d")),
];

#[derive(Debug, Clone)]
pub struct ExtractorRule {
    pattern: String,
    regex: Regex,
    format: DateFormat,
}

impl ExtractorRule {
    /// Compiles `pattern` so that it only matches an entire file name.
    pub fn new(pattern: &str, format: DateFormat) -> Result<Self, SortError> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|err| {
            SortError::InvalidRule {
                pattern: pattern.to_string(),
                reason: err.to_string(),
            }
        })?;
        // captures_len counts the implicit whole-match group
        if regex.captures_len() != 2 {
            return Err(SortError::InvalidRule {
                pattern: pattern.to_string(),
                reason: format!(
                    "expected exactly one capture group, found {}",
                    regex.captures_len() - 1
                ),
            });
        }

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            format,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn extract(&self, file_name: &str) -> Option<Timestamp> {
        let caps = self.regex.captures(file_name)?;
        self.format.parse(caps.get(1)?.as_str())
    }
}

pub fn builtin_rules() -> Result<Vec<ExtractorRule>, SortError> {
    compile_rules(RULE_TABLE)
}

pub fn compile_rules(table: &[(&str, DateFormat)]) -> Result<Vec<ExtractorRule>, SortError> {
    table
        .iter()
        .map(|(pattern, format)| ExtractorRule::new(pattern, *format))
        .collect()
}
