mod error;
mod exif_reader;
mod filename_date;
mod metadata;
mod outcome;
mod renamer;
mod resolver;
mod sorter;

pub use error::SortError;
pub use exif_reader::{read_date_time_original, ExifDate};
pub use filename_date::{builtin_rules, compile_rules, DateFormat, ExtractorRule, RULE_TABLE};
pub use metadata::{DateSource, Resolved, Timestamp, EXIF_DATE_FORMAT, FILE_PREFIX_FORMAT};
pub use outcome::{Outcome, OutcomeKind};
pub use renamer::{place, target_path};
pub use resolver::{DateResolver, DateStrategy, ExifStrategy, Resolution};
pub use sorter::{process_file, sort_directory, FileJob, SortOptions, SortSummary};
