//! Gerald command - build the run one alignment directory belongs to.

use std::path::PathBuf;

use clap::Args;

use crate::cli::scan::print_runs;
use crate::cli::OutputFormat;
use crate::run::get_specific_run;

#[derive(Args)]
pub struct GeraldArgs {
    /// GERALD_* directory, or a HiSeq Aligned* directory
    #[arg(required = true)]
    pub gerald_dir: PathBuf,

    /// Flowcell id to use instead of the one recorded in the runfolder
    #[arg(long)]
    pub flowcell_id: Option<String>,

    /// Save the run snapshot into this directory
    #[arg(long)]
    pub save: Option<PathBuf>,
}

/// Execute the gerald command
///
/// # Errors
///
/// Returns an error if any stage of the run cannot be read.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: GeraldArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let run = get_specific_run(&args.gerald_dir, args.flowcell_id.as_deref())
        .map_err(|e| anyhow::anyhow!("{}: {e}", args.gerald_dir.display()))?;

    if let Some(dir) = &args.save {
        std::fs::create_dir_all(dir)?;
        let path = run.save(dir)?;
        if verbose {
            eprintln!("Saved {}", path.display());
        }
    }

    print_runs(std::slice::from_ref(&run), format)
}
