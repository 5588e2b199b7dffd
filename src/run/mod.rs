//! Whole-run view of a runfolder.
//!
//! A [`PipelineRun`] ties one image-analysis, one base-calling and at most
//! one alignment stage together under a flowcell id. [`get_runs`] finds
//! every such combination, [`PipelineRun::save`] writes it as a
//! `run_<flowcell>_<date>.xml` snapshot and [`load_or_scan`] reuses those
//! snapshots while they are current.

pub mod cache;
pub mod discovery;
pub mod pipeline;
pub mod report;

pub use cache::{load_or_scan, CacheStatus, CachedRuns, ScanConfig};
pub use discovery::{get_runs, get_specific_run, hiseq_match_aligned_unaligned, AlignedPair};
pub use pipeline::{ImageAnalysis, PipelineRun};
pub use report::{summarize_mapped_reads, summary_report};
