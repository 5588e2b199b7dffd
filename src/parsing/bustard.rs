//! Bustard / BaseCalls base-calling directories.
//!
//! Four layouts exist, detected once by [`detect_layout`]:
//!
//! | Layout | Marker | Metadata source |
//! |--------|--------|-----------------|
//! | HiSeq  | `DemultiplexedBustardConfig.xml` | config tree |
//! | GA2    | `config.xml` | config tree, crosstalk from `BaseCallParameters/Matrix` |
//! | Summary | `BustardSummary.xml` | summary tree |
//! | GA1    | none | directory name `Bustard<ver>_<DD-MM-YYYY>_<user>` |
//!
//! Per-lane phasing comes from `params<N>.xml` files when they exist.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use tracing::{debug, info, warn};

use crate::core::types::{SequenceFormat, EUROPEAN_DATE_FORMAT};
use crate::element::Element;
use crate::parsing::{parse_field, ParseError};
use crate::utils::fs::{file_name, list_files};
use crate::utils::validation::{check_lane, BUSTARD_DIR_RE, PARAMS_FILE_RE};

const BASE_ORDER: [&str; 4] = ["A", "C", "G", "T"];
const AUTO_MATRIX_HEADER: &str = "# Auto-generated frequency response matrix";

/// Per-lane phasing estimate
#[derive(Debug, Clone, PartialEq)]
pub struct Phasing {
    pub lane: u32,
    pub phasing: f64,
    pub prephasing: f64,
}

impl Phasing {
    pub const XML_TAG: &'static str = "Phasing";

    /// Read `params<N>.xml`; the lane is the last character of the file stem.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidFormat` if the lane is not 1-8 or a value
    /// is missing.
    pub fn from_file(path: &Path) -> Result<Self, ParseError> {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let lane_char = stem.chars().last().unwrap_or(' ');
        let lane = lane_char
            .to_digit(10)
            .ok_or_else(|| ParseError::InvalidFormat(format!("No lane in {stem}")))?;
        if let Some(msg) = check_lane(lane) {
            return Err(ParseError::InvalidFormat(format!("{}: {msg}", path.display())));
        }

        let tree = Element::parse_file(path)?;
        let mut phasing = Self::from_xml(&tree)?;
        phasing.lane = lane;
        Ok(phasing)
    }

    #[must_use]
    pub fn to_xml(&self) -> Element {
        Element::new(Self::XML_TAG)
            .with_attr("lane", self.lane)
            .with_child(Element::text_element("Phasing", self.phasing))
            .with_child(Element::text_element("Prephasing", self.prephasing))
    }

    /// Accepts both the snapshot `<Phasing lane=..>` form and the
    /// `<Parameters>` root of a `params<N>.xml` file.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidFormat` for other tags or missing values.
    pub fn from_xml(tree: &Element) -> Result<Self, ParseError> {
        if !(tree.is("Phasing") || tree.is("Parameters")) {
            return Err(ParseError::InvalidFormat(format!(
                "Expected Phasing or Parameters, found {}",
                tree.name
            )));
        }
        let lane = match tree.attr("lane") {
            Some(l) => parse_field("lane", l)?,
            None => 0,
        };
        let value = |tag: &str| -> Result<f64, ParseError> {
            let text = tree
                .find_text(tag)
                .ok_or_else(|| ParseError::InvalidFormat(format!("Missing {tag}")))?;
            parse_field(tag, text)
        };
        Ok(Self {
            lane,
            phasing: value("Phasing")?,
            prephasing: value("Prephasing")?,
        })
    }
}

/// 4x4 crosstalk coefficients keyed by called base
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CrosstalkMatrix {
    pub base: BTreeMap<String, Vec<f64>>,
}

impl CrosstalkMatrix {
    pub const XML_TAG: &'static str = "MatrixElements";

    /// Read either the auto-generated 9-line matrix or 16 bare values.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidFormat` for any other layout.
    pub fn from_file(path: &Path) -> Result<Self, ParseError> {
        let text = fs::read_to_string(path)?;
        let lines: Vec<&str> = text.lines().collect();
        let floats = |line: &str| -> Result<Vec<f64>, ParseError> {
            line.split_whitespace()
                .map(|v| parse_field("matrix value", v))
                .collect()
        };

        let mut base = BTreeMap::new();
        if lines.len() == 9 && lines[0].trim() == AUTO_MATRIX_HEADER {
            for (name, line) in BASE_ORDER.iter().zip(&lines[5..9]) {
                base.insert((*name).to_string(), floats(line)?);
            }
        } else if lines.len() == 16 {
            for (name, chunk) in BASE_ORDER.iter().zip(lines.chunks(4)) {
                let row = chunk
                    .iter()
                    .map(|v| parse_field("matrix value", v))
                    .collect::<Result<Vec<f64>, _>>()?;
                base.insert((*name).to_string(), row);
            }
        } else {
            return Err(ParseError::InvalidFormat(format!(
                "matrix file {} is unusual",
                path.display()
            )));
        }
        Ok(Self { base })
    }

    #[must_use]
    pub fn to_xml(&self) -> Element {
        let mut root = Element::new(Self::XML_TAG);
        for name in self.base.keys() {
            root.push(Element::text_element("Base", name));
        }
        for values in self.base.values() {
            for value in values {
                root.push(Element::text_element("Element", value));
            }
        }
        root
    }

    /// Bases are listed first, then the matrix row by row.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidFormat` if the element count does not
    /// fill whole rows.
    pub fn from_xml(tree: &Element) -> Result<Self, ParseError> {
        tree.expect_tag(Self::XML_TAG)?;
        let mut bases = Vec::new();
        let mut values = Vec::new();
        for element in &tree.children {
            match element.tag().as_str() {
                "base" => bases.push(element.text().to_string()),
                "element" => values.push(parse_field::<f64>("Element", element.text())?),
                _ => warn!(tag = %element.name, "Unrecognized crosstalk tag, skipping"),
            }
        }
        if bases.is_empty() || values.len() != bases.len() * bases.len() {
            return Err(ParseError::InvalidFormat(format!(
                "{} matrix elements for {} bases",
                values.len(),
                bases.len()
            )));
        }
        let width = bases.len();
        let base = bases
            .into_iter()
            .zip(values.chunks(width).map(<[f64]>::to_vec))
            .collect();
        Ok(Self { base })
    }
}

/// Which flavor of base-calling directory this is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BustardLayout {
    Hiseq(PathBuf),
    Ga2(PathBuf),
    Summary(PathBuf),
    Ga1,
}

/// Pick the layout from the marker files present.
#[must_use]
pub fn detect_layout(pathname: &Path) -> BustardLayout {
    let demultiplexed = pathname.join("DemultiplexedBustardConfig.xml");
    let config = pathname.join("config.xml");
    let summary = pathname.join("BustardSummary.xml");
    if demultiplexed.exists() {
        BustardLayout::Hiseq(demultiplexed)
    } else if config.exists() {
        BustardLayout::Ga2(config)
    } else if summary.exists() {
        BustardLayout::Summary(summary)
    } else {
        BustardLayout::Ga1
    }
}

#[derive(Debug, Clone, Default)]
pub struct Bustard {
    /// Version encoded in a `Bustard<ver>_...` directory name
    pub path_version: Option<String>,
    pub date: Option<NaiveDate>,
    pub user: Option<String>,
    pub phasing: BTreeMap<u32, Phasing>,
    pub crosstalk: Option<CrosstalkMatrix>,
    pub bustard_config: Option<Element>,
    pub sequence_format: Option<SequenceFormat>,
    pub pathname: Option<PathBuf>,
}

/// Location is not part of the parsed metadata
impl PartialEq for Bustard {
    fn eq(&self, other: &Self) -> bool {
        self.path_version == other.path_version
            && self.date == other.date
            && self.user == other.user
            && self.phasing == other.phasing
            && self.crosstalk == other.crosstalk
            && self.bustard_config == other.bustard_config
            && self.sequence_format == other.sequence_format
    }
}

impl Bustard {
    pub const XML_TAG: &'static str = "Bustard";
    pub const XML_VERSION: u32 = 2;

    fn config_software(&self) -> Option<&Element> {
        self.bustard_config.as_ref()?.find("Run/Software")
    }

    /// `Software/@Name` from the config, `RTA` for a config without one,
    /// `Bustard` for legacy directories
    #[must_use]
    pub fn software(&self) -> Option<&str> {
        if let Some(software) = self.config_software() {
            return software.attr("Name");
        }
        if self.bustard_config.is_some() {
            Some("RTA")
        } else if self.path_version.is_some() {
            Some("Bustard")
        } else {
            None
        }
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.config_software()
            .and_then(|s| s.attr("Version"))
            .or(self.path_version.as_deref())
    }

    /// Run date as seconds since the epoch
    #[must_use]
    pub fn time(&self) -> Option<i64> {
        Some(self.date?.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
    }

    #[must_use]
    pub fn to_xml(&self) -> Element {
        let mut root = Element::new(Self::XML_TAG).with_attr("version", Self::XML_VERSION);
        if let Some(version) = &self.path_version {
            root.push(Element::text_element("version", version));
        }
        if let Some(time) = self.time() {
            root.push(Element::text_element("run_time", time));
        }
        if let Some(user) = &self.user {
            root.push(Element::text_element("user", user));
        }
        let mut params = Element::new("Parameters");
        for phasing in self.phasing.values() {
            params.push(phasing.to_xml());
        }
        root.push(params);
        if let Some(crosstalk) = &self.crosstalk {
            root.push(crosstalk.to_xml());
        }
        if let Some(format) = self.sequence_format {
            root.push(Element::text_element("sequence_format", format));
        }
        if let Some(config) = &self.bustard_config {
            root.push(config.clone());
        }
        root
    }

    /// Rebuild from a snapshot element.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Xml` for a different root tag, or
    /// `ParseError::InvalidFormat` for malformed phasing or crosstalk values.
    pub fn from_xml(tree: &Element) -> Result<Self, ParseError> {
        tree.expect_tag(Self::XML_TAG)?;
        tree.warn_if_newer(Self::XML_VERSION);

        let mut b = Bustard::default();
        for element in &tree.children {
            match element.tag().as_str() {
                "version" => b.path_version = element.text.clone(),
                "run_time" => {
                    let secs: i64 = parse_field("run_time", element.text())?;
                    b.date = DateTime::from_timestamp(secs, 0).map(|d| d.date_naive());
                }
                "user" => b.user = element.text.clone(),
                "parameters" => {
                    for param in &element.children {
                        let p = Phasing::from_xml(param)?;
                        b.phasing.insert(p.lane, p);
                    }
                }
                "matrixelements" => b.crosstalk = Some(CrosstalkMatrix::from_xml(element)?),
                "sequence_format" => b.sequence_format = SequenceFormat::from_name(element.text()),
                "basecallanalysis" | "bustardsummary" => b.bustard_config = Some(element.clone()),
                _ if element.child("Run").is_some() => b.bustard_config = Some(element.clone()),
                _ => warn!(tag = %element.name, "Unrecognized Bustard tag, skipping"),
            }
        }
        Ok(b)
    }

    /// Fill version/date/user from a `Bustard<ver>_<date>_<user>` name; other
    /// names (such as `BaseCalls`) leave them unset.
    fn update_from_pathname(&mut self, pathname: &Path) -> Result<(), ParseError> {
        let name = file_name(pathname);
        let Some(caps) = BUSTARD_DIR_RE.captures(name) else {
            return Ok(());
        };
        self.path_version = Some(caps["version"].to_string());
        self.date = Some(
            NaiveDate::parse_from_str(&caps["date"], EUROPEAN_DATE_FORMAT)
                .map_err(|e| ParseError::InvalidFormat(format!("{name}: bad date: {e}")))?,
        );
        self.user = Some(caps["user"].to_string());
        Ok(())
    }
}

/// Locate the crosstalk matrix described by a GA2 `config.xml`.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` when the config lacks the
/// `Run/BaseCallParameters/Matrix` section or names a matrix file that does
/// not exist.
pub fn crosstalk_from_config(
    bustard_path: &Path,
    config: &Element,
) -> Result<Option<CrosstalkMatrix>, ParseError> {
    let run = config
        .child("Run")
        .ok_or_else(|| ParseError::InvalidFormat("Expected Run element in Bustard config".into()))?;
    let call_parameters = run
        .child("BaseCallParameters")
        .ok_or_else(|| ParseError::InvalidFormat("Missing BaseCallParameters section".into()))?;
    let matrix = call_parameters.child("Matrix").ok_or_else(|| {
        ParseError::InvalidFormat("Expected Matrix in Bustard BaseCallParameters".into())
    })?;

    let flag = |tag: &str| -> Result<u32, ParseError> {
        parse_field(tag, matrix.find_text(tag).unwrap_or("0"))
    };
    let auto_flag = flag("AutoFlag")?;
    let auto_lane = flag("AutoLane")?;

    if auto_flag != 0 {
        // lane 0 means every lane was used; any one of them will do
        let lane = if auto_lane == 0 { 1 } else { auto_lane };
        let candidates = [
            format!("s_{lane}_02_matrix.txt"),
            format!("s_{lane}_1_matrix.txt"),
        ];
        let path = candidates
            .iter()
            .map(|name| bustard_path.join("Matrix").join(name))
            .find(|p| p.exists())
            .ok_or_else(|| {
                ParseError::InvalidFormat(format!("Couldn't find matrix for lane {auto_lane}"))
            })?;
        return CrosstalkMatrix::from_file(&path).map(Some);
    }

    call_parameters
        .child(CrosstalkMatrix::XML_TAG)
        .map(CrosstalkMatrix::from_xml)
        .transpose()
}

/// Infer which raw read files the base caller wrote
#[must_use]
pub fn detect_sequence_format(pathname: &Path) -> Option<SequenceFormat> {
    let files = list_files(pathname, |_| true).ok()?;
    let names: Vec<&str> = files.iter().map(|p| file_name(p)).collect();
    let has = |pred: &dyn Fn(&str) -> bool| names.iter().any(|n| pred(n));

    if has(&|n| n.contains("_qseq.txt")) {
        Some(SequenceFormat::Qseq)
    } else if has(&|n| n.contains("_sequence.txt") || n.contains(".fastq")) {
        Some(SequenceFormat::Fastq)
    } else if has(&|n| n.contains("_seq.txt")) {
        Some(SequenceFormat::Raw)
    } else {
        None
    }
}

fn add_phasing(b: &mut Bustard, pathname: &Path) -> Result<(), ParseError> {
    for paramfile in list_files(pathname, |n| PARAMS_FILE_RE.is_match(n))? {
        let phasing = Phasing::from_file(&paramfile)?;
        b.phasing.insert(phasing.lane, phasing);
    }
    Ok(())
}

/// Read a base-calling directory.
///
/// # Errors
///
/// Returns `ParseError::UnrecognizedDirectory` for a legacy directory whose
/// name does not follow the Bustard grammar, and propagates IO/XML errors
/// from the config and phasing files. Problems locating the crosstalk matrix
/// are logged and leave it unset.
pub fn bustard(pathname: &Path) -> Result<Bustard, ParseError> {
    info!(path = %pathname.display(), "Searching Bustard directory");
    let mut b = Bustard {
        pathname: Some(pathname.to_path_buf()),
        sequence_format: detect_sequence_format(pathname),
        ..Bustard::default()
    };

    match detect_layout(pathname) {
        BustardLayout::Hiseq(config) => {
            b.bustard_config = Some(Element::parse_file(&config)?);
        }
        BustardLayout::Ga2(config) => {
            b.update_from_pathname(pathname)?;
            let tree = Element::parse_file(&config)?;
            b.crosstalk = crosstalk_from_config(pathname, &tree).unwrap_or_else(|e| {
                warn!(path = %pathname.display(), error = %e, "No crosstalk matrix");
                None
            });
            b.bustard_config = Some(tree);
        }
        BustardLayout::Summary(summary) => {
            b.update_from_pathname(pathname)?;
            b.bustard_config = Some(Element::parse_file(&summary)?);
        }
        BustardLayout::Ga1 => {
            let name = file_name(pathname);
            if !BUSTARD_DIR_RE.is_match(name) {
                return Err(ParseError::UnrecognizedDirectory(name.to_string()));
            }
            b.update_from_pathname(pathname)?;
            b.crosstalk = legacy_crosstalk(pathname, b.path_version.as_deref());
        }
    }

    add_phasing(&mut b, pathname)?;
    debug!(
        path = %pathname.display(),
        software = ?b.software(),
        version = ?b.version(),
        lanes = b.phasing.len(),
        "Parsed Bustard directory"
    );
    Ok(b)
}

fn legacy_crosstalk(pathname: &Path, version: Option<&str>) -> Option<CrosstalkMatrix> {
    let mut candidates = Vec::new();
    // 1.9.5 and 1.9.6 wrote matrix<N>.txt, identical for every lane
    if matches!(version, Some("1.9.5" | "1.9.6")) {
        candidates.push(pathname.join("matrix1.txt"));
    }
    candidates.push(pathname.join("Matrix").join("s_matrix.txt"));

    let path = candidates.into_iter().find(|p| p.exists())?;
    CrosstalkMatrix::from_file(&path)
        .map_err(|e| warn!(path = %path.display(), error = %e, "Ignoring crosstalk matrix"))
        .ok()
}
