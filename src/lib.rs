//! # illumina-runfolder
//!
//! A library for reading the metadata an Illumina GA/HiSeq pipeline leaves
//! in a runfolder.
//!
//! A runfolder collects a decade's worth of output formats: image analysis
//! encoded in directory names or IPAR/RTA parameter XML, Bustard base-calling
//! configs, GERALD and CASAVA alignment configs, `Summary.htm` tables in
//! several shapes and six generations of ELAND alignment files.
//!
//! `illumina-runfolder` reads all of them into one model and writes it back
//! out as versioned XML run snapshots.
//!
//! ## Features
//!
//! - **Run discovery**: Finds every image-analysis / base-calling / alignment
//!   combination, GA `GERALD*` and HiSeq `Aligned*`/`Unaligned*` layouts alike
//! - **ELAND counting**: Match codes and per-chromosome hits for every result
//!   format, read lazily and transparently decompressed
//! - **Summary statistics**: Cluster counts and intensities from HTML and XML reports
//! - **Snapshots**: `run_<flowcell>_<date>.xml` files that reload field for field
//!
//! ## Example
//!
//! ```rust,no_run
//! use illumina_runfolder::{get_runs, summary_report};
//! use std::path::Path;
//!
//! let runs = get_runs(Path::new("/data/080416_HWI-EAS229_0024_207BTAAXX"), None).unwrap();
//! for run in &runs {
//!     println!("{}", run.name());
//! }
//! println!("{}", summary_report(&runs).unwrap());
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Sample keys, match-code counters and summary statistics
//! - [`element`]: Owned XML tree used by every reader and snapshot
//! - [`parsing`]: One reader per pipeline stage
//! - [`eland`]: ELAND result discovery and counting
//! - [`run`]: Pipeline runs, discovery, snapshot cache and reports
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod eland;
pub mod element;
pub mod parsing;
pub mod run;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::counts::{MappedReads, MatchCode, MatchCodes};
pub use core::sample_key::SampleKey;
pub use core::types::*;
pub use eland::{ElandCollection, ResultLane};
pub use element::Element;
pub use parsing::gerald::Alignment;
pub use parsing::ParseError;
pub use run::{get_runs, get_specific_run, load_or_scan, summary_report, PipelineRun};
