//! IPAR / RTA image-analysis directories (`IPAR_*`, `Intensities`).
//!
//! Unlike Firecrest the interesting metadata lives in a parameter file, the
//! first of `RTAConfig.xml`, `config.xml` or `../.params`. Its `<Run>` element
//! is kept whole and queried on demand.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::element::Element;
use crate::parsing::{parse_field, ParseError};
use crate::utils::fs::{file_name, mtime};

/// `<Run Name=...>` values that identify an image-analysis parameter tree
pub const SOFTWARE_NAMES: [&str; 3] = ["IPAR_1.01", "IPAR_1.3", "Intensities"];

/// Directory name prefixes handled here
pub const DIRECTORY_PREFIXES: [&str; 2] = ["IPAR", "Intensities"];

/// Parameter files in the order they are tried, relative to the IPAR directory
const PARAM_FILES: [&str; 3] = ["RTAConfig.xml", "config.xml", "../.params"];

/// Tiles imaged for one lane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSelection {
    pub sample: Option<String>,
    /// Inclusive `(min, max)` tile numbers
    pub tile_range: Option<(u32, u32)>,
}

#[derive(Debug, Clone)]
pub struct Ipar {
    /// The `<Run>` element of the parameter file
    pub tree: Option<Element>,
    pub date: NaiveDateTime,
    /// Contents of `Matrix/s_matrix.txt`, present for IPAR 1.01
    pub matrix: Option<String>,
    pub pathname: Option<PathBuf>,
}

/// Location is not part of the parsed metadata
impl PartialEq for Ipar {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree && self.date == other.date && self.matrix == other.matrix
    }
}

impl Ipar {
    pub const XML_TAG: &'static str = "IPAR";
    pub const XML_VERSION: u32 = 1;

    /// Software name from `Software/@Name`
    #[must_use]
    pub fn software(&self) -> Option<&str> {
        self.tree.as_ref()?.find("Software")?.attr("Name")
    }

    /// Software version from `Software/@Version`
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.tree.as_ref()?.find("Software")?.attr("Version")
    }

    fn cycle(&self, which: &str) -> Option<u32> {
        self.tree
            .as_ref()?
            .find("Cycles")?
            .attr(which)?
            .trim()
            .parse()
            .ok()
    }

    #[must_use]
    pub fn start(&self) -> Option<u32> {
        self.cycle("First")
    }

    #[must_use]
    pub fn stop(&self) -> Option<u32> {
        self.cycle("Last")
    }

    #[must_use]
    pub fn runfolder_name(&self) -> Option<&str> {
        self.tree.as_ref()?.find_text("RunParameters/RunFolder")
    }

    /// Run time as seconds since the epoch
    #[must_use]
    pub fn time(&self) -> i64 {
        self.date.and_utc().timestamp()
    }

    /// Per-lane tile selection keyed by lane `Index`
    #[must_use]
    pub fn tiles(&self) -> BTreeMap<u32, TileSelection> {
        let mut tiles = BTreeMap::new();
        let Some(selection) = self.tree.as_ref().and_then(|t| t.find("TileSelection")) else {
            return tiles;
        };
        for lane in &selection.children {
            let Some(index) = lane.attr("Index").and_then(|i| i.trim().parse::<u32>().ok())
            else {
                continue;
            };
            let sample = lane.find_text("Sample").map(str::to_string);
            let tile_range = lane.find("TileRange").and_then(|r| {
                let min = r.attr("Min")?.trim().parse().ok()?;
                let max = r.attr("Max")?.trim().parse().ok()?;
                Some((min, max))
            });
            tiles.insert(index, TileSelection { sample, tile_range });
        }
        tiles
    }

    /// Every intensity and noise file the run should have produced, e.g.
    /// `s_1_0001_int.txt.p.gz`. `None` if the parameters name no compression
    /// suffix.
    #[must_use]
    pub fn file_list(&self) -> Option<Vec<String>> {
        let suffix = self
            .tree
            .as_ref()?
            .find("RunParameters/CompressionSuffix")?
            .text()
            .to_string();

        let mut files = Vec::new();
        for (lane, selection) in self.tiles() {
            let (Some(sample), Some((start, stop))) = (&selection.sample, selection.tile_range)
            else {
                continue;
            };
            for file_type in ["int", "nse"] {
                for tile in start..=stop {
                    files.push(format!("{sample}_{lane}_{tile:04}_{file_type}.txt{suffix}"));
                }
            }
        }
        Some(files)
    }

    #[must_use]
    pub fn to_xml(&self) -> Element {
        let mut root = Element::new(Self::XML_TAG).with_attr("version", Self::XML_VERSION);
        root.push(Element::text_element("timestamp", self.time()));
        if let Some(tree) = &self.tree {
            root.push(tree.clone());
        }
        if let Some(matrix) = &self.matrix {
            root.push(Element::verbatim_element("matrix", matrix.as_str()));
        }
        root
    }

    /// Rebuild from a snapshot element.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Xml` for a different root tag and
    /// `ParseError::InvalidFormat` for a bad or missing timestamp.
    pub fn from_xml(tree: &Element) -> Result<Self, ParseError> {
        tree.expect_tag(Self::XML_TAG)?;
        tree.warn_if_newer(Self::XML_VERSION);

        let mut ipar = Ipar {
            tree: None,
            date: NaiveDateTime::default(),
            matrix: None,
            pathname: None,
        };
        let mut have_time = false;

        for element in &tree.children {
            match element.tag().as_str() {
                "timestamp" => {
                    let secs: i64 = parse_field("timestamp", element.text())?;
                    ipar.date = DateTime::from_timestamp(secs, 0)
                        .map(|d| d.naive_utc())
                        .ok_or_else(|| ParseError::InvalidFormat(format!("timestamp {secs}")))?;
                    have_time = true;
                }
                "run" => ipar.tree = Some(element.clone()),
                "matrix" => ipar.matrix = element.text.clone(),
                _ => warn!(tag = %element.name, "Unrecognized IPAR tag, skipping"),
            }
        }

        if !have_time {
            return Err(ParseError::InvalidFormat("IPAR missing timestamp".into()));
        }
        Ok(ipar)
    }
}

/// Load the `<Run>` element of a parameter file if it describes image analysis.
///
/// # Errors
///
/// Returns `ParseError::Xml` if the file is not well-formed XML.
pub fn load_param_tree(paramfile: &Path) -> Result<Option<Element>, ParseError> {
    let root = Element::parse_file(paramfile)?;
    let run = root
        .child("Run")
        .filter(|run| run.attr("Name").is_some_and(|n| SOFTWARE_NAMES.contains(&n)));
    if run.is_none() {
        info!(path = %paramfile.display(), "No image analysis run found in parameter file");
    }
    Ok(run.cloned())
}

/// Read an IPAR or Intensities directory.
///
/// A directory without a parameter file still produces an [`Ipar`] with no
/// tree, dated by the directory's modification time.
///
/// # Errors
///
/// Returns `ParseError::UnrecognizedDirectory` if the name does not start
/// with `IPAR` or `Intensities`, and propagates IO/XML errors from the
/// matrix and parameter files.
pub fn ipar(pathname: &Path) -> Result<Ipar, ParseError> {
    info!(path = %pathname.display(), "Searching IPAR directory");
    let name = file_name(pathname);
    let prefix = name.split('_').next().unwrap_or_default();
    if !DIRECTORY_PREFIXES.contains(&prefix) {
        return Err(ParseError::UnrecognizedDirectory(name.to_string()));
    }

    let matrix_path = pathname.join("Matrix").join("s_matrix.txt");
    let matrix = if matrix_path.exists() {
        Some(fs::read_to_string(&matrix_path)?)
    } else {
        None
    };

    for candidate in PARAM_FILES {
        let paramfile = pathname.join(candidate);
        if paramfile.exists() {
            info!(path = %paramfile.display(), "Found IPAR config file");
            return Ok(Ipar {
                tree: load_param_tree(&paramfile)?,
                date: mtime(&paramfile).unwrap_or_else(|| Utc::now().naive_utc()),
                matrix,
                pathname: Some(pathname.to_path_buf()),
            });
        }
    }

    warn!(path = %pathname.display(), "No IPAR parameter file found");
    Ok(Ipar {
        tree: None,
        date: mtime(pathname).unwrap_or_else(|| Utc::now().naive_utc()),
        matrix,
        pathname: Some(pathname.to_path_buf()),
    })
}
