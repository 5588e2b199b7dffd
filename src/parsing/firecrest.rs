//! Legacy Firecrest image-analysis directories.
//!
//! Everything except the crosstalk matrix is encoded in the directory name:
//! `C<start>-<stop>_Firecrest<version>_<DD-MM-YYYY>_<user>`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use tracing::{debug, warn};

use crate::core::types::EUROPEAN_DATE_FORMAT;
use crate::element::Element;
use crate::parsing::{parse_field, ParseError};
use crate::utils::fs::{file_name, list_dirs};
use crate::utils::validation::FIRECREST_DIR_RE;

#[derive(Debug, Clone)]
pub struct Firecrest {
    pub start: u32,
    pub stop: u32,
    pub version: String,
    pub date: NaiveDate,
    pub user: String,
    /// Contents of `Matrix/s_matrix.txt`
    pub matrix: Option<String>,
    pub pathname: Option<PathBuf>,
}

/// Location is not part of the parsed metadata
impl PartialEq for Firecrest {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start
            && self.stop == other.stop
            && self.version == other.version
            && self.date == other.date
            && self.user == other.user
            && self.matrix == other.matrix
    }
}

impl Firecrest {
    pub const XML_TAG: &'static str = "Firecrest";
    pub const XML_VERSION: u32 = 1;

    #[must_use]
    pub fn software(&self) -> &'static str {
        "Firecrest"
    }

    /// Run date as seconds since the epoch
    #[must_use]
    pub fn time(&self) -> i64 {
        self.date.and_hms_opt(0, 0, 0).map_or(0, |d| d.and_utc().timestamp())
    }

    #[must_use]
    pub fn to_xml(&self) -> Element {
        let mut root = Element::new(Self::XML_TAG).with_attr("version", Self::XML_VERSION);
        root.push(Element::text_element("version", &self.version));
        root.push(Element::text_element("FirstCycle", self.start));
        root.push(Element::text_element("LastCycle", self.stop));
        root.push(Element::text_element("run_time", self.time()));
        root.push(Element::text_element("user", &self.user));
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
    /// `ParseError::InvalidFormat` if a required field is missing.
    pub fn from_xml(tree: &Element) -> Result<Self, ParseError> {
        tree.expect_tag(Self::XML_TAG)?;
        tree.warn_if_newer(Self::XML_VERSION);

        let mut start = None;
        let mut stop = None;
        let mut version = None;
        let mut date = None;
        let mut user = None;
        let mut matrix = None;

        for element in &tree.children {
            match element.tag().as_str() {
                "version" => version = Some(element.text().to_string()),
                "firstcycle" => start = Some(parse_field("FirstCycle", element.text())?),
                "lastcycle" => stop = Some(parse_field("LastCycle", element.text())?),
                "run_time" => {
                    let secs: i64 = parse_field("run_time", element.text())?;
                    date = DateTime::from_timestamp(secs, 0).map(|d| d.date_naive());
                }
                "user" => user = Some(element.text().to_string()),
                "matrix" => matrix = element.text.clone(),
                _ => warn!(tag = %element.name, "Unrecognized Firecrest tag, skipping"),
            }
        }

        let missing = |field: &str| ParseError::InvalidFormat(format!("Firecrest missing {field}"));
        Ok(Self {
            start: start.ok_or_else(|| missing("FirstCycle"))?,
            stop: stop.ok_or_else(|| missing("LastCycle"))?,
            version: version.ok_or_else(|| missing("version"))?,
            date: date.ok_or_else(|| missing("run_time"))?,
            user: user.unwrap_or_default(),
            matrix,
            pathname: None,
        })
    }
}

/// Read a Firecrest directory.
///
/// Returns `Ok(None)` when the directory has neither a crosstalk matrix nor
/// any Bustard output, meaning analysis never ran there.
///
/// # Errors
///
/// Returns `ParseError::UnrecognizedDirectory` if the name does not follow
/// the Firecrest grammar, or `ParseError::Io` if the matrix cannot be read.
pub fn firecrest(pathname: &Path) -> Result<Option<Firecrest>, ParseError> {
    let name = file_name(pathname);
    let caps = FIRECREST_DIR_RE
        .captures(name)
        .ok_or_else(|| ParseError::UnrecognizedDirectory(name.to_string()))?;

    let date = NaiveDate::parse_from_str(&caps["date"], EUROPEAN_DATE_FORMAT)
        .map_err(|e| ParseError::InvalidFormat(format!("{name}: bad date: {e}")))?;

    let matrix_path = pathname.join("Matrix").join("s_matrix.txt");
    let matrix = if matrix_path.exists() {
        Some(fs::read_to_string(&matrix_path)?)
    } else if list_dirs(pathname, |n| n.starts_with("Bustard"))?.is_empty() {
        debug!(path = %pathname.display(), "Firecrest directory has no matrix and no Bustard output");
        return Ok(None);
    } else {
        None
    };

    Ok(Some(Firecrest {
        start: parse_field("start cycle", &caps["start"])?,
        stop: parse_field("stop cycle", &caps["stop"])?,
        version: caps["version"].to_string(),
        date,
        user: caps["user"].to_string(),
        matrix,
        pathname: Some(pathname.to_path_buf()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATRIX: &str = "# Auto-generated frequency response matrix
> A
> C
> G
> T
0.77 0.15 -0.04 0.04
0.76 1.02 -0.05 0.06
-0.10 -0.10 1.17 -0.03
-0.13 -0.12 0.80 1.27
";

    fn make_dir(root: &Path, name: &str, matrix: bool, bustard: bool) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        if matrix {
            fs::create_dir_all(dir.join("Matrix")).unwrap();
            fs::write(dir.join("Matrix").join("s_matrix.txt"), MATRIX).unwrap();
        }
        if bustard {
            fs::create_dir_all(dir.join("Bustard1.9.6_20-10-2008_diane")).unwrap();
        }
        dir
    }

    #[test]
    fn test_firecrest_from_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = make_dir(tmp.path(), "C1-37_Firecrest1.9.6_20-10-2008_diane", true, false);

        let f = firecrest(&dir).unwrap().unwrap();
        assert_eq!(f.start, 1);
        assert_eq!(f.stop, 37);
        assert_eq!(f.version, "1.9.6");
        assert_eq!(f.user, "diane");
        assert_eq!(f.date, NaiveDate::from_ymd_opt(2008, 10, 20).unwrap());
        assert_eq!(f.software(), "Firecrest");
        assert_eq!(f.matrix.as_deref(), Some(MATRIX));
    }

    #[test]
    fn test_firecrest_without_matrix() {
        let tmp = tempfile::tempdir().unwrap();
        let with_bustard =
            make_dir(tmp.path(), "C1-33_Firecrest1.8.28_19-04-2008_diane", false, true);
        let f = firecrest(&with_bustard).unwrap().unwrap();
        assert!(f.matrix.is_none());

        let empty = make_dir(tmp.path(), "C1-2_Firecrest1.8.28_19-04-2008_diane", false, false);
        assert!(firecrest(&empty).unwrap().is_none());
    }

    #[test]
    fn test_firecrest_rejects_other_names() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = make_dir(tmp.path(), "IPAR_1.3", true, false);
        assert!(matches!(
            firecrest(&dir),
            Err(ParseError::UnrecognizedDirectory(_))
        ));
    }

    #[test]
    fn test_firecrest_xml_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = make_dir(tmp.path(), "C1-37_Firecrest1.9.6_20-10-2008_diane", true, false);
        let f = firecrest(&dir).unwrap().unwrap();

        let text = f.to_xml().to_xml_string().unwrap();
        let again = Firecrest::from_xml(&Element::parse_str(&text).unwrap()).unwrap();
        assert_eq!(f, again);
        assert_eq!(f.time(), again.time());
        assert_eq!(again.matrix.as_deref(), Some(MATRIX));
    }

    #[test]
    fn test_firecrest_xml_unknown_tag_is_skipped() {
        let xml = r#"<Firecrest version="1">
            <version>1.9.6</version><FirstCycle>1</FirstCycle><LastCycle>37</LastCycle>
            <run_time>1224460800</run_time><user>diane</user><Extra>x</Extra>
        </Firecrest>"#;
        let f = Firecrest::from_xml(&Element::parse_str(xml).unwrap()).unwrap();
        assert_eq!(f.date, NaiveDate::from_ymd_opt(2008, 10, 20).unwrap());
        assert!(f.matrix.is_none());
    }
}
