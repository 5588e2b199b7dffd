//! Cached command - scan a runfolder through a snapshot cache.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::cli::scan::print_runs;
use crate::cli::OutputFormat;
use crate::run::cache::DEFAULT_RESCAN_DELAY;
use crate::run::{load_or_scan, ScanConfig};

#[derive(Args)]
pub struct CachedArgs {
    /// Runfolder directory
    #[arg(required = true)]
    pub runfolder: PathBuf,

    /// Directory holding run_*.xml snapshots
    #[arg(long, required = true)]
    pub cache_dir: PathBuf,

    /// Flowcell id to use instead of the one recorded in the runfolder
    #[arg(long)]
    pub flowcell_id: Option<String>,

    /// Seconds a changed runfolder must be quiet before it is rescanned
    #[arg(long, default_value_t = DEFAULT_RESCAN_DELAY.as_secs())]
    pub rescan_delay: u64,
}

/// Execute the cached command
///
/// # Errors
///
/// Returns an error if snapshots cannot be read or written, or the
/// runfolder cannot be scanned.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: CachedArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = ScanConfig {
        flowcell_id: args.flowcell_id.clone(),
        output_dir: Some(args.cache_dir.clone()),
        rescan_delay: Duration::from_secs(args.rescan_delay),
    };
    let cached = load_or_scan(&args.runfolder, &args.cache_dir, &config)?;
    if verbose {
        eprintln!(
            "{} runs from {} ({})",
            cached.runs.len(),
            args.cache_dir.display(),
            cached.status
        );
    }
    print_runs(&cached.runs, format)
}
