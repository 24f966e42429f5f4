use crate::error::SortError;
use crate::metadata::Resolved;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Moved,
    SkippedExists,
    Unresolved,
    Failed,
}

/// Result of handling one file. Exactly one is produced per file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub source: PathBuf,
    pub target: Option<PathBuf>,
    pub resolved: Option<Resolved>,
    pub cause: Option<String>,
}

impl Outcome {
    pub fn moved(source: &Path, target: PathBuf) -> Self {
        Self::new(OutcomeKind::Moved, source, Some(target), None)
    }

    pub fn skipped_exists(source: &Path, target: PathBuf) -> Self {
        Self::new(OutcomeKind::SkippedExists, source, Some(target), None)
    }

    pub fn unresolved(source: &Path) -> Self {
        Self::new(OutcomeKind::Unresolved, source, None, None)
    }

    pub fn failed(source: &Path, target: Option<PathBuf>, cause: &SortError) -> Self {
        Self::new(OutcomeKind::Failed, source, target, Some(cause.to_string()))
    }

    pub fn with_resolved(mut self, resolved: Resolved) -> Self {
        self.resolved = Some(resolved);
        self
    }

    fn new(
        kind: OutcomeKind,
        source: &Path,
        target: Option<PathBuf>,
        cause: Option<String>,
    ) -> Self {
        Self {
            kind,
            source: source.to_path_buf(),
            target,
            resolved: None,
            cause,
        }
    }
}
