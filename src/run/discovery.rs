//! Finding every [`PipelineRun`] in a runfolder.
//!
//! Image-analysis candidates live under `Data/`: `*Firecrest*`, `IPAR_*`
//! and the RTA `Intensities` directory. Alignment output is found one of
//! two ways:
//!
//! 1. **HiSeq**: `Aligned<suffix>` / `Unaligned<suffix>` pairs at the
//!    runfolder root, matched on the shared suffix.
//! 2. **GA**: every `Bustard*`/`BaseCalls` directory under the image
//!    analysis, crossed with every `GERALD*` directory inside it.
//!
//! GA discovery only runs when HiSeq discovery found nothing. A stage that
//! fails to parse is logged and that combination is skipped.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::parsing::bustard::bustard;
use crate::parsing::firecrest::firecrest;
use crate::parsing::gerald::gerald;
use crate::parsing::ipar::ipar;
use crate::parsing::ParseError;
use crate::run::pipeline::{ImageAnalysis, PipelineRun};
use crate::utils::fs::{file_name, list_dirs};
use crate::utils::validation::ALIGNED_DIR_RE;

/// An `Unaligned` directory and its `Aligned` partner, if it has one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedPair {
    pub aligned: Option<PathBuf>,
    pub unaligned: PathBuf,
}

/// Pair the `Aligned*` and `Unaligned*` directories of a HiSeq runfolder by
/// suffix (`Aligned_6mm` goes with `Unaligned_6mm`).
///
/// An `Aligned` directory with no partner is logged and dropped.
///
/// # Errors
///
/// Returns an IO error if the runfolder cannot be listed.
pub fn hiseq_match_aligned_unaligned(runfolder: &Path) -> io::Result<Vec<AlignedPair>> {
    let mut aligned = BTreeMap::new();
    let mut unaligned = BTreeMap::new();
    for dir in list_dirs(runfolder, |name| ALIGNED_DIR_RE.is_match(name))? {
        let Some(caps) = ALIGNED_DIR_RE.captures(file_name(&dir)) else {
            continue;
        };
        let suffix = caps["suffix"].to_string();
        if &caps["kind"] == "Aligned" {
            aligned.insert(suffix, dir);
        } else {
            unaligned.insert(suffix, dir);
        }
    }

    let mut pairs = Vec::new();
    for (suffix, unaligned) in unaligned {
        pairs.push(AlignedPair {
            aligned: aligned.remove(&suffix),
            unaligned,
        });
    }
    for dir in aligned.values() {
        warn!(path = %dir.display(), "Aligned directory without a matching Unaligned directory, skipping");
    }
    Ok(pairs)
}

fn image_analysis_candidates(datadir: &Path) -> io::Result<Vec<(PathBuf, Option<ImageAnalysis>)>> {
    let mut found = Vec::new();
    for dir in list_dirs(datadir, |name| name.contains("Firecrest"))? {
        info!(path = %dir.display(), "Found firecrest directory");
        let image = match firecrest(&dir) {
            Ok(Some(f)) => Some(ImageAnalysis::Firecrest(f)),
            Ok(None) => {
                warn!(path = %dir.display(), "Empty or invalid firecrest directory");
                None
            }
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Unreadable firecrest directory");
                None
            }
        };
        found.push((dir, image));
    }

    let is_ipar = |name: &str| name.starts_with("IPAR_") || name == "Intensities";
    for dir in list_dirs(datadir, is_ipar)? {
        info!(path = %dir.display(), "Found IPAR directory");
        let image = match ipar(&dir) {
            Ok(i) => Some(ImageAnalysis::Ipar(i)),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Empty or invalid IPAR directory");
                None
            }
        };
        found.push((dir, image));
    }
    Ok(found)
}

fn hiseq_runs(
    runfolder: &Path,
    flowcell_id: Option<&str>,
    image: &ImageAnalysis,
) -> Result<Vec<PipelineRun>, ParseError> {
    let mut runs = Vec::new();
    for pair in hiseq_match_aligned_unaligned(runfolder)? {
        let b = match bustard(&pair.unaligned) {
            Ok(b) => b,
            Err(e) => {
                error!(path = %pair.unaligned.display(), error = %e, "Ignoring unaligned directory");
                continue;
            }
        };
        let g = match pair.aligned.as_deref().map(gerald).transpose() {
            Ok(g) => g,
            Err(e) => {
                error!(path = ?pair.aligned, error = %e, "Ignoring aligned directory");
                continue;
            }
        };
        let mut run = PipelineRun::new(runfolder, flowcell_id);
        run.image_analysis = Some(image.clone());
        run.bustard = Some(b);
        run.gerald = g;
        runs.push(run);
    }
    Ok(runs)
}

fn gerald_runs(
    runfolder: &Path,
    flowcell_id: Option<&str>,
    image_dir: &Path,
    image: &ImageAnalysis,
) -> Result<Vec<PipelineRun>, ParseError> {
    info!(path = %image_dir.display(), "Looking for bustard directories");
    let mut runs = Vec::new();
    let is_bustard = |name: &str| name.starts_with("Bustard") || name == "BaseCalls";
    for bustard_dir in list_dirs(image_dir, is_bustard)? {
        info!(path = %bustard_dir.display(), "Found bustard directory");
        let b = match bustard(&bustard_dir) {
            Ok(b) => b,
            Err(e) => {
                error!(path = %bustard_dir.display(), error = %e, "Ignoring bustard directory");
                continue;
            }
        };
        for gerald_dir in list_dirs(&bustard_dir, |name| name.starts_with("GERALD"))? {
            info!(path = %gerald_dir.display(), "Found gerald directory");
            match gerald(&gerald_dir) {
                Ok(g) => {
                    let mut run = PipelineRun::new(runfolder, flowcell_id);
                    run.image_analysis = Some(image.clone());
                    run.bustard = Some(b.clone());
                    run.gerald = Some(g);
                    runs.push(run);
                }
                Err(e) => {
                    error!(path = %gerald_dir.display(), error = %e, "Ignoring gerald directory");
                }
            }
        }
    }
    Ok(runs)
}

/// Every image-analysis / base-calling / alignment combination in a
/// runfolder.
///
/// # Errors
///
/// Returns `ParseError::Io` if a directory cannot be listed. Problems with
/// individual stages only drop that combination.
pub fn get_runs(runfolder: &Path, flowcell_id: Option<&str>) -> Result<Vec<PipelineRun>, ParseError> {
    let datadir = runfolder.join("Data");
    info!(path = %datadir.display(), "Searching for runs");

    let mut runs = Vec::new();
    for (image_dir, image) in image_analysis_candidates(&datadir)? {
        let Some(image) = image else { continue };
        let hiseq = hiseq_runs(runfolder, flowcell_id, &image)?;
        if hiseq.is_empty() {
            runs.extend(gerald_runs(runfolder, flowcell_id, &image_dir, &image)?);
        } else {
            runs.extend(hiseq);
        }
    }
    info!(path = %runfolder.display(), runs = runs.len(), "Finished runfolder scan");
    Ok(runs)
}

fn image_analysis_at(image_dir: &Path) -> Result<ImageAnalysis, ParseError> {
    let name = file_name(image_dir);
    let lower = name.to_ascii_lowercase();
    if lower.contains("firecrest") {
        firecrest(image_dir)?
            .map(ImageAnalysis::Firecrest)
            .ok_or_else(|| ParseError::InvalidFormat(format!("{name} is an empty firecrest directory")))
    } else if lower.contains("ipar") || lower.contains("intensities") {
        Ok(ImageAnalysis::Ipar(ipar(image_dir)?))
    } else {
        Err(ParseError::UnrecognizedDirectory(format!(
            "{name} does not contain an image processing step"
        )))
    }
}

/// Build the one run an alignment directory belongs to.
///
/// A GA `GERALD*` directory sits at `Data/<image>/<bustard>/<gerald>`.
/// A HiSeq `Aligned<suffix>` directory sits at the runfolder root, with
/// `Unaligned<suffix>` as its base calls and `Data/Intensities` as its
/// image analysis.
///
/// # Errors
///
/// Returns `ParseError::UnrecognizedDirectory` if the expected parent
/// directories are missing or unrecognized, and propagates stage errors.
pub fn get_specific_run(gerald_dir: &Path, flowcell_id: Option<&str>) -> Result<PipelineRun, ParseError> {
    let gerald_dir = fs::canonicalize(gerald_dir)?;
    let missing = || ParseError::UnrecognizedDirectory(gerald_dir.display().to_string());

    let aligned = ALIGNED_DIR_RE
        .captures(file_name(&gerald_dir))
        .filter(|caps| &caps["kind"] == "Aligned")
        .map(|caps| caps["suffix"].to_string());

    let (runfolder, image_dir, bustard_dir) = if let Some(suffix) = aligned {
        let runfolder = gerald_dir.parent().ok_or_else(missing)?.to_path_buf();
        let image_dir = runfolder.join("Data").join("Intensities");
        let bustard_dir = runfolder.join(format!("Unaligned{suffix}"));
        (runfolder, image_dir, bustard_dir)
    } else {
        let bustard_dir = gerald_dir.parent().ok_or_else(missing)?.to_path_buf();
        let image_dir = bustard_dir.parent().ok_or_else(missing)?.to_path_buf();
        let runfolder = image_dir
            .parent()
            .and_then(Path::parent)
            .ok_or_else(missing)?
            .to_path_buf();
        (runfolder, image_dir, bustard_dir)
    };

    info!(
        runfolder = %runfolder.display(),
        image_dir = %image_dir.display(),
        bustard_dir = %bustard_dir.display(),
        gerald_dir = %gerald_dir.display(),
        "Building run from alignment directory"
    );

    let mut run = PipelineRun::new(&runfolder, flowcell_id);
    run.image_analysis = Some(image_analysis_at(&image_dir)?);
    run.bustard = Some(bustard(&bustard_dir)?);
    run.gerald = Some(gerald(&gerald_dir)?);
    info!(path = %gerald_dir.display(), "Constructed PipelineRun");
    Ok(run)
}
