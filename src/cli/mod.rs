//! Command-line interface for runfolder.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **scan**: Discover every pipeline run in a runfolder
//! - **gerald**: Build the run an alignment directory belongs to
//! - **show**: Print a saved `run_*.xml` snapshot
//! - **report**: Per-lane cluster and mapping report
//! - **cached**: Scan through a snapshot cache directory
//! - **extract-sequence**: Trim the sequence column of an ELAND file
//!
//! ## Usage
//!
//! ```text
//! # List runs in a runfolder
//! runfolder scan /data/080416_HWI-EAS229_0024_207BTAAXX
//!
//! # Save snapshots next to the current directory
//! runfolder scan /data/080416_HWI-EAS229_0024_207BTAAXX --save --output-dir .
//!
//! # JSON output for scripting
//! runfolder show run_207BTAAXX_2008-04-19.xml --format json
//!
//! # Lane report straight from an alignment directory
//! runfolder report /data/.../GERALD_19-04-2008_diane
//! ```

use clap::{Parser, Subcommand};

pub mod cached;
pub mod extract;
pub mod gerald;
pub mod report;
pub mod scan;
pub mod show;

#[derive(Parser)]
#[command(name = "runfolder")]
#[command(version)]
#[command(about = "Inspect Illumina pipeline runfolders")]
#[command(
    long_about = "runfolder reads the metadata an Illumina GA/HiSeq pipeline leaves in a runfolder.\n\nIt finds every image-analysis, base-calling and alignment combination and provides:\n- Versions, dates and lane parameters of each stage\n- Cluster statistics and ELAND alignment counts per lane\n- XML run snapshots that can be saved and reloaded"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover pipeline runs in a runfolder
    Scan(scan::ScanArgs),

    /// Build a run from one GERALD or Aligned directory
    Gerald(gerald::GeraldArgs),

    /// Show a saved run snapshot
    Show(show::ShowArgs),

    /// Per-lane summary report
    Report(report::ReportArgs),

    /// Load runs from a snapshot cache, rescanning when it is out of date
    Cached(cached::CachedArgs),

    /// Write read ids with a slice of their sequence
    ExtractSequence(extract::ExtractArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
