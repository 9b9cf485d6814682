//! Merges two edited versions of a file against their common original, the
//! way `svn merge` handles text files, and prints the result.
//!
//! ```sh
//! cargo run --example merge-file -- original.txt mine.txt theirs.txt
//! cargo run --example merge-file -- --diff original.txt mine.txt
//! ```

use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context as _, Result};
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use svn_delta_core::{Config, MergeLabels, merge_text, unified_diff};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Line-based 3-way merge of text files
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    original: PathBuf,

    modified: PathBuf,

    /// Omitted with `--diff`.
    latest: Option<PathBuf>,

    /// YAML configuration; defaults apply to anything it leaves out.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print a unified diff from ORIGINAL to MODIFIED instead of merging.
    #[arg(long)]
    diff: bool,

    /// Show the original text inside conflict markers.
    #[arg(long)]
    show_original: bool,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

fn read(path: &PathBuf) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(args.verbose.log_level_filter().to_string().to_lowercase())
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to initialise tracing")?;

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path).context("Failed to load configuration")?,
        None => Config::default(),
    };
    config.output.display_original_in_conflict |= args.show_original;

    let original = read(&args.original)?;
    let modified = read(&args.modified)?;

    if args.diff {
        print!(
            "{}",
            unified_diff(
                &original,
                &modified,
                &args.original.display().to_string(),
                &args.modified.display().to_string(),
                &config.output,
            )
        );
        return Ok(ExitCode::SUCCESS);
    }

    let latest_path = args.latest.as_ref().context("LATEST is required unless --diff is given")?;
    let latest = read(latest_path)?;

    let labels = [&args.original, &args.modified, latest_path].map(|path| path.display().to_string());
    let result = merge_text(
        &original,
        &modified,
        &latest,
        &MergeLabels {
            original: &labels[0],
            modified: &labels[1],
            latest: &labels[2],
        },
        &config,
    );

    print!("{}", result.text);
    if result.has_conflicts() {
        info!(conflicts = result.conflicts, "Merge left conflicts");
        return Ok(ExitCode::from(1));
    }

    Ok(ExitCode::SUCCESS)
}
