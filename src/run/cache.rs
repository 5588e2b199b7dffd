//! Reusing saved run snapshots instead of rescanning a runfolder.
//!
//! Counting ELAND files is the slow part of a scan, so [`load_or_scan`]
//! prefers the `run_*.xml` snapshots in a cache directory. A runfolder that
//! changed after its snapshots were written is rescanned, but only once it
//! has been quiet for [`ScanConfig::rescan_delay`]; until then the stale
//! snapshots are served.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use crate::parsing::ParseError;
use crate::run::discovery::get_runs;
use crate::run::pipeline::PipelineRun;
use crate::utils::fs::{list_files, mtime, newest_dir_mtime};

/// Written to the cache directory after every rescan, so a scan that found
/// no runs still counts as current.
pub const SCAN_MARKER: &str = ".last_scan";

/// Quiet period before a changed runfolder is rescanned
pub const DEFAULT_RESCAN_DELAY: Duration = Duration::from_secs(30 * 60);

/// Options shared by scanning commands
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Use this flowcell id instead of looking one up
    pub flowcell_id: Option<String>,
    /// Where `scan --save` writes snapshots
    pub output_dir: Option<PathBuf>,
    pub rescan_delay: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            flowcell_id: None,
            output_dir: None,
            rescan_delay: DEFAULT_RESCAN_DELAY,
        }
    }
}

/// How [`load_or_scan`] produced its runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Snapshots were newer than the runfolder
    Fresh,
    /// The runfolder changed recently; old snapshots were served
    Stale,
    /// The runfolder was scanned and new snapshots were written
    Rescanned,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::Stale => write!(f, "stale"),
            Self::Rescanned => write!(f, "rescanned"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachedRuns {
    pub runs: Vec<PipelineRun>,
    pub status: CacheStatus,
}

/// `run_*.xml` files in `cache_dir`
///
/// # Errors
///
/// Returns an IO error if the directory exists but cannot be listed.
pub fn snapshot_files(cache_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    list_files(cache_dir, |name| name.starts_with("run_") && name.ends_with(".xml"))
}

fn load_all(paths: &[PathBuf]) -> Result<Vec<PipelineRun>, ParseError> {
    paths.iter().map(|p| PipelineRun::load(p)).collect()
}

fn is_quiet(changed: Option<NaiveDateTime>, delay: Duration) -> bool {
    let Some(changed) = changed else {
        return true;
    };
    let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
    Utc::now().naive_utc().signed_duration_since(changed) >= delay
}

/// Runs for `runfolder`, from snapshots in `cache_dir` when they are current.
///
/// # Errors
///
/// Propagates snapshot read errors, scan errors and snapshot write errors,
/// including `ParseError::NotReady` for alignment files still being written.
pub fn load_or_scan(
    runfolder: &Path,
    cache_dir: &Path,
    config: &ScanConfig,
) -> Result<CachedRuns, ParseError> {
    let snapshots = snapshot_files(cache_dir)?;
    let marker = cache_dir.join(SCAN_MARKER);
    let runfolder_changed = newest_dir_mtime(runfolder);

    if !snapshots.is_empty() || marker.exists() {
        let cached_at = snapshots
            .iter()
            .chain(std::iter::once(&marker))
            .filter_map(|p| mtime(p))
            .min();
        if cached_at >= runfolder_changed {
            debug!(path = %cache_dir.display(), snapshots = snapshots.len(), "Snapshot cache hit");
            return Ok(CachedRuns {
                runs: load_all(&snapshots)?,
                status: CacheStatus::Fresh,
            });
        }
        if !is_quiet(runfolder_changed, config.rescan_delay) {
            warn!(
                path = %runfolder.display(),
                "Runfolder is still changing, serving previous snapshots"
            );
            return Ok(CachedRuns {
                runs: load_all(&snapshots)?,
                status: CacheStatus::Stale,
            });
        }
    }

    info!(path = %runfolder.display(), "Snapshot cache miss, rescanning");
    let runs = get_runs(runfolder, config.flowcell_id.as_deref())?;
    fs::create_dir_all(cache_dir)?;
    remove_superseded(&snapshots, &runs)?;
    for run in &runs {
        run.save(cache_dir)?;
    }
    fs::write(&marker, Utc::now().to_rfc3339())?;
    Ok(CachedRuns {
        runs,
        status: CacheStatus::Rescanned,
    })
}

/// Deletes snapshots whose names no longer match any of `runs`.
fn remove_superseded(snapshots: &[PathBuf], runs: &[PipelineRun]) -> std::io::Result<()> {
    let current: Vec<String> = runs.iter().map(PipelineRun::name).collect();
    for path in snapshots {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if !current.iter().any(|c| c == name) {
            info!(path = %path.display(), "Removing superseded snapshot");
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.rescan_delay, Duration::from_secs(1800));
        assert!(config.flowcell_id.is_none());
    }

    #[test]
    fn test_is_quiet() {
        let now = Utc::now().naive_utc();
        assert!(is_quiet(None, DEFAULT_RESCAN_DELAY));
        assert!(!is_quiet(Some(now), DEFAULT_RESCAN_DELAY));
        assert!(is_quiet(Some(now - chrono::Duration::hours(1)), DEFAULT_RESCAN_DELAY));
        assert!(is_quiet(Some(now), Duration::ZERO));
    }

    #[test]
    fn test_empty_runfolder_rescans() {
        let runfolder = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let cached = load_or_scan(runfolder.path(), cache.path(), &ScanConfig::default()).unwrap();
        assert_eq!(cached.status, CacheStatus::Rescanned);
        assert!(cached.runs.is_empty());
        assert!(snapshot_files(cache.path()).unwrap().is_empty());
        assert!(cache.path().join(SCAN_MARKER).exists());

        let cached = load_or_scan(runfolder.path(), cache.path(), &ScanConfig::default()).unwrap();
        assert_eq!(cached.status, CacheStatus::Fresh);
        assert!(cached.runs.is_empty());
    }
}
