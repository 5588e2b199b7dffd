//! GERALD / CASAVA alignment directories.
//!
//! The `config.xml` comes in two schemas: GA configs list per-lane values
//! under `LaneSpecificRunParameters/<TAG>/s_<lane>`, HiSeq configs hold one
//! `Projects/<element name="...">` block per lane.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::core::types::{AlignmentSoftware, LANES_PER_FLOWCELL};
use crate::eland::{eland, ElandCollection};
use crate::element::Element;
use crate::parsing::genome_map::GenomeMap;
use crate::parsing::summary::Summary;
use crate::parsing::{parse_field, ParseError};
use crate::utils::fs::mtime;
use crate::utils::validation::{CASAVA_VERSION_RE, GERALD_VERSION_RE, SOFTWARE_ATTR_RE};

/// Placeholder GERALD writes when no genome was configured
pub const ELAND_GENOME_SENTINEL: &str = "Need_to_specify_ELAND_genome_directory";

/// `ChipWideRunParameters/TIME_STAMP`, e.g. `Sat Apr 19 19:08:30 2008`
pub const TIME_STAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Per-lane analysis settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneParameters {
    pub analysis: Option<String>,
    pub eland_genome: Option<String>,
    pub read_length: Option<String>,
    pub use_bases: Option<String>,
}

/// Which `config.xml` schema a tree follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSchema {
    /// `LaneSpecificRunParameters/ANALYSIS/s_<lane>`
    Ga,
    /// `Projects/*[@name]`
    HiSeq,
    /// Neither; no lane parameters
    Unknown,
}

#[must_use]
pub fn detect_config_schema(tree: &Element) -> ConfigSchema {
    if tree.find("LaneSpecificRunParameters/ANALYSIS").is_some() {
        ConfigSchema::Ga
    } else if tree.child("Projects").is_some() {
        ConfigSchema::HiSeq
    } else {
        ConfigSchema::Unknown
    }
}

fn chip_attribute(tree: &Element, tag: &str) -> Option<String> {
    tree.find_text(&format!("ChipWideRunParameters/{tag}"))
        .map(str::to_string)
}

fn genome_or_chip(tree: &Element, genome: Option<String>) -> Option<String> {
    genome
        .or_else(|| chip_attribute(tree, "ELAND_GENOME"))
        .filter(|g| g != ELAND_GENOME_SENTINEL)
}

/// Lane value from a flat GA container such as `LaneSpecificRunParameters/ANALYSIS`
fn ga_attribute(tree: &Element, tag: &str, lane_id: &str) -> Result<Option<String>, ParseError> {
    let Some(container) = tree.find(&format!("LaneSpecificRunParameters/{tag}")) else {
        return Ok(None);
    };
    if container.children.len() > LANES_PER_FLOWCELL as usize {
        return Err(ParseError::FormatChanged(
            "GERALD config.xml file changed".into(),
        ));
    }
    Ok(container
        .children
        .iter()
        .find(|c| c.name.split('_').nth(1) == Some(lane_id))
        .and_then(|c| c.text.clone()))
}

/// Per-lane parameters keyed by lane id (GA) or project name (HiSeq).
///
/// # Errors
///
/// Returns `ParseError::FormatChanged` if a GA lane container has more
/// entries than the flowcell has lanes.
pub fn lane_parameters(tree: &Element) -> Result<BTreeMap<String, LaneParameters>, ParseError> {
    let mut lanes = BTreeMap::new();
    match detect_config_schema(tree) {
        ConfigSchema::Ga => {
            let Some(analysis) = tree.find("LaneSpecificRunParameters/ANALYSIS") else {
                return Ok(lanes);
            };
            for element in &analysis.children {
                let Some((_, lane_id)) = element.name.split_once('_') else {
                    warn!(tag = %element.name, "Unexpected lane tag in GERALD config");
                    continue;
                };
                let params = LaneParameters {
                    analysis: ga_attribute(tree, "ANALYSIS", lane_id)?,
                    eland_genome: genome_or_chip(tree, ga_attribute(tree, "ELAND_GENOME", lane_id)?),
                    read_length: ga_attribute(tree, "READ_LENGTH", lane_id)?
                        .or_else(|| chip_attribute(tree, "READ_LENGTH")),
                    use_bases: ga_attribute(tree, "USE_BASES", lane_id)?,
                };
                lanes.insert(lane_id.to_string(), params);
            }
        }
        ConfigSchema::HiSeq => {
            let Some(projects) = tree.child("Projects") else {
                return Ok(lanes);
            };
            for element in &projects.children {
                let Some(name) = element.attr("name") else {
                    warn!(tag = %element.name, "Project without a name attribute");
                    continue;
                };
                let text = |tag: &str| element.find_text(tag).map(str::to_string);
                let params = LaneParameters {
                    analysis: text("ANALYSIS"),
                    eland_genome: genome_or_chip(tree, text("ELAND_GENOME")),
                    read_length: text("READ_LENGTH1"),
                    use_bases: text("USE_BASES1"),
                };
                lanes.insert(name.to_string(), params);
            }
        }
        ConfigSchema::Unknown => {}
    }
    Ok(lanes)
}

/// Which summary file an alignment directory provides
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummarySource {
    Xml(PathBuf),
    Htm(PathBuf),
    /// HiSeq `../Data/reports/Summary` directory
    HiSeqReports(PathBuf),
}

/// `Summary.xml` beats `Summary.htm`, which beats the HiSeq reports tree
#[must_use]
pub fn detect_summary_source(gerald_dir: &Path) -> Option<SummarySource> {
    let xml = gerald_dir.join("Summary.xml");
    if xml.exists() {
        return Some(SummarySource::Xml(xml));
    }
    let htm = gerald_dir.join("Summary.htm");
    if htm.exists() {
        return Some(SummarySource::Htm(htm));
    }
    let reports = gerald_dir
        .join("..")
        .join("Data")
        .join("reports")
        .join("Summary");
    reports.is_dir().then_some(SummarySource::HiSeqReports(reports))
}

/// One GERALD or CASAVA alignment run
#[derive(Debug, Clone)]
pub struct Alignment {
    pub kind: AlignmentSoftware,
    /// Root of `config.xml`
    pub tree: Element,
    pub lanes: BTreeMap<String, LaneParameters>,
    pub date: Option<NaiveDateTime>,
    pub summary: Option<Summary>,
    pub eland_results: ElandCollection,
    pub pathname: Option<PathBuf>,
}

/// Location is not part of the parsed metadata
impl PartialEq for Alignment {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.tree == other.tree
            && self.lanes == other.lanes
            && self.date == other.date
            && self.summary == other.summary
            && self.eland_results == other.eland_results
    }
}

impl Alignment {
    pub const XML_VERSION: u32 = 1;

    /// Build from a config tree, deriving lane parameters.
    ///
    /// # Errors
    ///
    /// See [`lane_parameters`].
    pub fn new(kind: AlignmentSoftware, tree: Element) -> Result<Self, ParseError> {
        Ok(Self {
            kind,
            lanes: lane_parameters(&tree)?,
            date: time_stamp(&tree),
            tree,
            summary: None,
            eland_results: ElandCollection::new(),
            pathname: None,
        })
    }

    /// `(software, version)` from the embedded version string, if recognized
    #[must_use]
    pub fn software_version(&self) -> Option<(String, String)> {
        match self.kind {
            AlignmentSoftware::Gerald => {
                let text = chip_attribute(&self.tree, "SOFTWARE_VERSION")?;
                if let Some(caps) = GERALD_VERSION_RE.captures(&text) {
                    Some(("GERALD".to_string(), caps["version"].to_string()))
                } else {
                    CASAVA_VERSION_RE
                        .captures(&text)
                        .map(|caps| ("CASAVA".to_string(), caps["version"].to_string()))
                }
            }
            AlignmentSoftware::Casava => {
                let text = self.tree.child("Software")?.attr("Version")?;
                let caps = SOFTWARE_ATTR_RE.captures(text.trim())?;
                Some((caps["name"].to_string(), caps["version"].to_string()))
            }
        }
    }

    #[must_use]
    pub fn software(&self) -> Option<String> {
        self.software_version().map(|(software, _)| software)
    }

    #[must_use]
    pub fn version(&self) -> Option<String> {
        self.software_version().map(|(_, version)| version)
    }

    /// Run time as seconds since the epoch
    #[must_use]
    pub fn time(&self) -> Option<i64> {
        self.date.map(|d| d.and_utc().timestamp())
    }

    /// Parameters for a numbered lane
    #[must_use]
    pub fn lane(&self, lane: u32) -> Option<&LaneParameters> {
        self.lanes.get(&lane.to_string())
    }

    /// Name of the runfolder the config was written for
    #[must_use]
    pub fn runfolder_name(&self) -> Option<String> {
        let name = match self.kind {
            AlignmentSoftware::Gerald => {
                let root = chip_attribute(&self.tree, "EXPT_DIR_ROOT")?;
                let expt_dir = chip_attribute(&self.tree, "EXPT_DIR")?;
                let root = root.trim_end_matches('/');
                let relative = expt_dir
                    .strip_prefix(root)
                    .map_or(expt_dir.as_str(), |rest| rest.trim_start_matches('/'));
                relative.split('/').next().unwrap_or_default().to_string()
            }
            AlignmentSoftware::Casava => {
                let expt_dir = self.tree.find_text("Defaults/EXPT_DIR")?;
                expt_dir
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            }
        };
        (!name.is_empty()).then_some(name)
    }

    /// Chromosome maps for every numbered lane with a configured genome
    #[must_use]
    pub fn genome_maps(&self) -> BTreeMap<u32, GenomeMap> {
        let mut by_dir: BTreeMap<&str, GenomeMap> = BTreeMap::new();
        let mut maps = BTreeMap::new();
        for (lane_id, params) in &self.lanes {
            let (Ok(lane), Some(genome)) = (lane_id.parse::<u32>(), params.eland_genome.as_deref())
            else {
                continue;
            };
            let map = by_dir.entry(genome).or_insert_with(|| {
                GenomeMap::scan_genome_dir(Path::new(genome)).unwrap_or_else(|e| {
                    warn!(genome, error = %e, "Unable to read genome directory");
                    GenomeMap::new()
                })
            });
            maps.insert(lane, map.clone());
        }
        maps
    }

    /// # Errors
    ///
    /// Propagates ELAND counting errors, including `ParseError::NotReady`.
    pub fn to_xml(&self) -> Result<Element, ParseError> {
        let mut root =
            Element::new(self.kind.xml_tag()).with_attr("version", Self::XML_VERSION);
        if let Some(time) = self.time() {
            root.push(Element::text_element("timestamp", time));
        }
        root.push(self.tree.clone());
        if let Some(summary) = &self.summary {
            root.push(summary.to_xml());
        }
        if !self.eland_results.is_empty() {
            root.push(self.eland_results.to_xml()?);
        }
        Ok(root)
    }

    /// Rebuild from a `Gerald` or `Casava` snapshot element.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidFormat` for other tags or a snapshot
    /// without a config tree.
    pub fn from_xml(tree: &Element) -> Result<Self, ParseError> {
        let kind = if tree.is(AlignmentSoftware::Gerald.xml_tag()) {
            AlignmentSoftware::Gerald
        } else if tree.is(AlignmentSoftware::Casava.xml_tag()) {
            AlignmentSoftware::Casava
        } else {
            return Err(ParseError::InvalidFormat(format!(
                "Expected Gerald or Casava, found {}",
                tree.name
            )));
        };
        tree.warn_if_newer(Self::XML_VERSION);

        let mut config = None;
        let mut date = None;
        let mut summary = None;
        let mut eland_results = ElandCollection::new();
        for element in &tree.children {
            match element.tag().as_str() {
                "timestamp" => {
                    let secs: i64 = parse_field("timestamp", element.text())?;
                    date = DateTime::from_timestamp(secs, 0).map(|d| d.naive_utc());
                }
                "summary" => summary = Some(Summary::from_xml(element)?),
                "elandcollection" => eland_results = ElandCollection::from_xml(element)?,
                _ if config.is_none() => config = Some(element.clone()),
                _ => warn!(tag = %element.name, "Unrecognized alignment tag, skipping"),
            }
        }

        let config = config
            .ok_or_else(|| ParseError::InvalidFormat("Alignment snapshot without config".into()))?;
        let mut alignment = Self::new(kind, config)?;
        alignment.date = date;
        alignment.summary = summary;
        alignment.eland_results = eland_results;
        Ok(alignment)
    }
}

fn time_stamp(tree: &Element) -> Option<NaiveDateTime> {
    let text = chip_attribute(tree, "TIME_STAMP")?;
    match NaiveDateTime::parse_from_str(text.trim(), TIME_STAMP_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(time_stamp = %text, error = %e, "Unparseable GERALD TIME_STAMP");
            None
        }
    }
}

fn read_summary(source: &SummarySource) -> Result<Summary, ParseError> {
    match source {
        SummarySource::Xml(path) | SummarySource::Htm(path) => {
            info!(path = %path.display(), "Parsing summary");
            Summary::from_file(path)
        }
        SummarySource::HiSeqReports(dir) => {
            info!(path = %dir.display(), "Parsing HiSeq summary reports");
            Summary::from_hiseq_dir(dir)
        }
    }
}

/// Read a GERALD/CASAVA/Aligned directory.
///
/// # Errors
///
/// Returns `ParseError::MissingFile` without a `config.xml`, and propagates
/// config, summary and result-discovery errors.
pub fn gerald(pathname: &Path) -> Result<Alignment, ParseError> {
    info!(path = %pathname.display(), "Parsing gerald config.xml");
    let config_path = pathname.join("config.xml");
    if !config_path.exists() {
        return Err(ParseError::MissingFile(config_path));
    }
    let tree = Element::parse_file(&config_path)?;

    let source = detect_summary_source(pathname);
    let kind = match (&source, detect_config_schema(&tree)) {
        (Some(SummarySource::HiSeqReports(_)), _) | (None, ConfigSchema::HiSeq) => {
            AlignmentSoftware::Casava
        }
        _ => AlignmentSoftware::Gerald,
    };

    let mut alignment = Alignment::new(kind, tree)?;
    alignment.pathname = Some(pathname.to_path_buf());
    if alignment.date.is_none() {
        alignment.date = mtime(&config_path);
    }
    alignment.summary = match &source {
        Some(source) => Some(read_summary(source)?),
        None => {
            warn!(path = %pathname.display(), "No summary file found");
            None
        }
    };
    alignment.eland_results = eland(pathname, &alignment.genome_maps())?;

    debug!(
        path = %pathname.display(),
        kind = %alignment.kind,
        version = ?alignment.version(),
        results = alignment.eland_results.len(),
        "Parsed alignment directory"
    );
    Ok(alignment)
}
