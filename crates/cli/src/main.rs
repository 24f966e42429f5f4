use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;
use photo_sorter_core::{sort_directory, OutcomeKind, SortOptions, SortSummary};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "photo-sorter")]
#[command(version)]
#[command(
    about = "Moves photos into one folder, prefixing each name with its capture time (YYYYMMDD-HHMMSS_)"
)]
struct Cli {
    /// Directory to read photos from (walked recursively)
    input_dir: PathBuf,
    /// Existing directory the renamed photos are moved into
    output_dir: PathBuf,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    summary: SummaryFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let summary = sort_directory(&SortOptions {
        input_dir: cli.input_dir,
        output_dir: cli.output_dir,
    })?;

    match cli.summary {
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        SummaryFormat::Text => print_summary(&summary),
    }

    Ok(())
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn print_summary(summary: &SortSummary) {
    let left_in_place: Vec<_> = summary
        .outcomes
        .iter()
        .filter(|o| matches!(o.kind, OutcomeKind::Unresolved | OutcomeKind::Failed))
        .collect();
    if !left_in_place.is_empty() {
        println!("left in place:");
        for outcome in left_in_place {
            match &outcome.cause {
                Some(cause) => println!("  {} ({cause})", outcome.source.display()),
                None => println!("  {} (no capture date)", outcome.source.display()),
            }
        }
    }

    println!(
        "scanned={} moved={} skipped_existing={} unresolved={} failed={} non_regular_skip={} walk_errors={}",
        summary.scanned_files,
        summary.moved,
        summary.skipped_existing,
        summary.unresolved,
        summary.failed,
        summary.skipped_non_regular,
        summary.walk_errors
    );
}
