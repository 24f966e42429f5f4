use crate::error::SortError;
use crate::exif_reader::{read_date_time_original, ExifDate};
use crate::filename_date::{builtin_rules, ExtractorRule};
use crate::metadata::{DateSource, Resolved, Timestamp};
use log::debug;
use std::path::Path;

/// One way of finding the capture time of a file.
///
/// `Ok(None)` means the strategy abstains and the next one is asked.
pub trait DateStrategy {
    fn date_for(&self, path: &Path) -> Result<Option<Resolved>, SortError>;
}

/// Embedded `DateTimeOriginal` tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifStrategy;

impl DateStrategy for ExifStrategy {
    fn date_for(&self, path: &Path) -> Result<Option<Resolved>, SortError> {
        match read_date_time_original(path)? {
            ExifDate::Present(raw) => match Timestamp::parse_exif(&raw) {
                Some(timestamp) => Ok(Some(Resolved {
                    timestamp,
                    source: DateSource::Exif,
                })),
                None => {
                    debug!("unparseable DateTimeOriginal {raw:?} in {}", path.display());
                    Ok(None)
                }
            },
            ExifDate::NotPresent | ExifDate::Unreadable => Ok(None),
        }
    }
}

impl DateStrategy for ExtractorRule {
    fn date_for(&self, path: &Path) -> Result<Option<Resolved>, SortError> {
        let Some(file_name) = path.file_name() else {
            return Ok(None);
        };
        Ok(self
            .extract(&file_name.to_string_lossy())
            .map(|timestamp| Resolved {
                timestamp,
                source: DateSource::FileName {
                    rule: self.pattern().to_string(),
                },
            }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Resolved),
    Unresolved,
}

/// Asks each strategy in turn and keeps the first answer.
pub struct DateResolver {
    strategies: Vec<Box<dyn DateStrategy>>,
}

impl DateResolver {
    pub fn new(strategies: Vec<Box<dyn DateStrategy>>) -> Self {
        Self { strategies }
    }

    /// EXIF first, then the file name rules in table order.
    pub fn with_rules(rules: Vec<ExtractorRule>) -> Self {
        let mut strategies: Vec<Box<dyn DateStrategy>> = Vec::with_capacity(rules.len() + 1);
        strategies.push(Box::new(ExifStrategy));
        strategies.extend(
            rules
                .into_iter()
                .map(|rule| Box::new(rule) as Box<dyn DateStrategy>),
        );
        Self::new(strategies)
    }

    pub fn builtin() -> Result<Self, SortError> {
        Ok(Self::with_rules(builtin_rules()?))
    }

    pub fn resolve(&self, path: &Path) -> Result<Resolution, SortError> {
        for strategy in &self.strategies {
            if let Some(resolved) = strategy.date_for(path)? {
                return Ok(Resolution::Resolved(resolved));
            }
        }
        Ok(Resolution::Unresolved)
    }
}
