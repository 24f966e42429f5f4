use crate::outcome::{Outcome, OutcomeKind};
use crate::renamer::place;
use crate::resolver::{DateResolver, Resolution};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone)]
pub struct SortOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// A regular file found under the input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    pub path: PathBuf,
    pub file_name: String,
}

impl FileJob {
    pub fn new(path: PathBuf) -> Option<Self> {
        let file_name = path.file_name()?.to_string_lossy().to_string();
        Some(Self { path, file_name })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SortSummary {
    pub scanned_files: usize,
    pub skipped_non_regular: usize,
    pub walk_errors: usize,
    pub moved: usize,
    pub skipped_existing: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub outcomes: Vec<Outcome>,
}

impl SortSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome.kind {
            OutcomeKind::Moved => self.moved += 1,
            OutcomeKind::SkippedExists => self.skipped_existing += 1,
            OutcomeKind::Unresolved => self.unresolved += 1,
            OutcomeKind::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// Sorts every regular file below `input_dir` into `output_dir`.
///
/// Only problems with the input directory itself or with the built-in
/// rule table are errors; every per-file problem ends up in the summary.
pub fn sort_directory(options: &SortOptions) -> Result<SortSummary> {
    let input_meta = fs::metadata(&options.input_dir).with_context(|| {
        format!(
            "input directory does not exist: {}",
            options.input_dir.display()
        )
    })?;
    if !input_meta.is_dir() {
        anyhow::bail!(
            "input path is not a directory: {}",
            options.input_dir.display()
        );
    }
    fs::read_dir(&options.input_dir).with_context(|| {
        format!(
            "input directory is not readable: {}",
            options.input_dir.display()
        )
    })?;

    let resolver = DateResolver::builtin().context("built-in file name rules are invalid")?;

    info!(
        "Sorting files from {} to {}",
        options.input_dir.display(),
        options.output_dir.display()
    );

    let mut summary = SortSummary::default();
    let jobs = collect_jobs(&options.input_dir, &options.output_dir, &mut summary);
    for job in &jobs {
        let outcome = process_file(&resolver, job, &options.output_dir);
        log_outcome(&outcome);
        summary.record(outcome);
    }

    Ok(summary)
}

/// Resolves the capture date of one file and moves it.
pub fn process_file(resolver: &DateResolver, job: &FileJob, output_dir: &Path) -> Outcome {
    debug!("Handling {}", job.file_name);
    match resolver.resolve(&job.path) {
        Ok(Resolution::Resolved(resolved)) => {
            debug!(
                "Extracted date [{}] from {} via {}",
                resolved.timestamp, job.file_name, resolved.source
            );
            place(&job.path, output_dir, &resolved.timestamp).with_resolved(resolved)
        }
        Ok(Resolution::Unresolved) => Outcome::unresolved(&job.path),
        Err(err) => Outcome::failed(&job.path, None, &err),
    }
}

fn log_outcome(outcome: &Outcome) {
    let source = outcome.source.display();
    let target = outcome
        .target
        .as_deref()
        .map(|t| t.display().to_string())
        .unwrap_or_default();
    match outcome.kind {
        OutcomeKind::Moved => info!("Moved {source} to [{target}]"),
        OutcomeKind::SkippedExists => warn!("Skipped {source}: [{target}] already exists"),
        OutcomeKind::Unresolved => error!("No capture date found for {source}"),
        OutcomeKind::Failed => error!(
            "Failed to handle {source}: {}",
            outcome.cause.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Snapshot of the regular files to handle. Taken before anything is moved
/// so files arriving in the output directory are never picked up again.
/// Symlinks are neither followed nor processed.
fn collect_jobs(root: &Path, output_dir: &Path, summary: &mut SortSummary) -> Vec<FileJob> {
    let output_canonical = fs::canonicalize(output_dir).ok();
    let mut jobs = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_nested_output_dir(entry, output_canonical.as_deref()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Could not read entry below {}: {err}", root.display());
                summary.walk_errors += 1;
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        if !entry.file_type().is_file() {
            debug!("Skipping non-regular entry {}", entry.path().display());
            summary.skipped_non_regular += 1;
            continue;
        }

        summary.scanned_files += 1;
        if let Some(job) = FileJob::new(entry.into_path()) {
            jobs.push(job);
        }
    }

    jobs
}

fn is_nested_output_dir(entry: &DirEntry, output_canonical: Option<&Path>) -> bool {
    let Some(output) = output_canonical else {
        return false;
    };
    entry.depth() > 0
        && entry.file_type().is_dir()
        && fs::canonicalize(entry.path()).is_ok_and(|path| path == output)
}
