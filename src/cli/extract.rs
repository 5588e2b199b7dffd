//! Extract-sequence command - keep read ids and a slice of each sequence.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::eland::extract_eland_sequence;
use crate::utils::opener::open_maybe_compressed;

#[derive(Args)]
pub struct ExtractArgs {
    /// ELAND or sequence file (.gz and .bz2 are decompressed)
    #[arg(required = true)]
    pub input: PathBuf,

    /// First base to keep (0-based)
    #[arg(short, long, default_value = "0")]
    pub start: usize,

    /// One past the last base to keep
    #[arg(short, long, default_value_t = usize::MAX)]
    pub end: usize,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the extract-sequence command
///
/// # Errors
///
/// Returns an error if the input cannot be read or the output written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ExtractArgs, _format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    if args.end < args.start {
        anyhow::bail!("--end ({}) is before --start ({})", args.end, args.start);
    }
    let reader = open_maybe_compressed(&args.input)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {e}", args.input.display()))?;

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    extract_eland_sequence(reader, writer, args.start, args.end)?;

    if verbose {
        if let Some(path) = &args.output {
            eprintln!("Wrote {}", path.display());
        }
    }
    Ok(())
}
