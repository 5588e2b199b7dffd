//! One image-analysis / base-calling / alignment combination and its snapshot.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use tracing::{info, warn};

use crate::core::types::{AlignmentSoftware, SNAPSHOT_DATE_FORMAT};
use crate::element::Element;
use crate::parsing::bustard::Bustard;
use crate::parsing::firecrest::Firecrest;
use crate::parsing::flowcell::find_flowcell_id;
use crate::parsing::gerald::Alignment;
use crate::parsing::ipar::Ipar;
use crate::parsing::ParseError;

/// Image-analysis stage of a run
#[derive(Debug, Clone, PartialEq)]
pub enum ImageAnalysis {
    Firecrest(Firecrest),
    Ipar(Ipar),
}

impl ImageAnalysis {
    #[must_use]
    pub fn software(&self) -> Option<&str> {
        match self {
            Self::Firecrest(f) => Some(f.software()),
            Self::Ipar(i) => i.software(),
        }
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Firecrest(f) => Some(&f.version),
            Self::Ipar(i) => i.version(),
        }
    }

    #[must_use]
    pub fn start(&self) -> Option<u32> {
        match self {
            Self::Firecrest(f) => Some(f.start),
            Self::Ipar(i) => i.start(),
        }
    }

    #[must_use]
    pub fn stop(&self) -> Option<u32> {
        match self {
            Self::Firecrest(f) => Some(f.stop),
            Self::Ipar(i) => i.stop(),
        }
    }

    #[must_use]
    pub fn date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Firecrest(f) => f.date.and_hms_opt(0, 0, 0),
            Self::Ipar(i) => Some(i.date),
        }
    }

    /// Run time as seconds since the epoch
    #[must_use]
    pub fn time(&self) -> i64 {
        match self {
            Self::Firecrest(f) => f.time(),
            Self::Ipar(i) => i.time(),
        }
    }

    #[must_use]
    pub fn pathname(&self) -> Option<&Path> {
        match self {
            Self::Firecrest(f) => f.pathname.as_deref(),
            Self::Ipar(i) => i.pathname.as_deref(),
        }
    }

    #[must_use]
    pub fn to_xml(&self) -> Element {
        match self {
            Self::Firecrest(f) => f.to_xml(),
            Self::Ipar(i) => i.to_xml(),
        }
    }
}

/// Everything known about one processing of a flowcell
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Runfolder the run was discovered in
    pub pathname: Option<PathBuf>,
    pub flowcell_id: String,
    pub image_analysis: Option<ImageAnalysis>,
    pub bustard: Option<Bustard>,
    pub gerald: Option<Alignment>,
}

/// Location is not part of the parsed metadata
impl PartialEq for PipelineRun {
    fn eq(&self, other: &Self) -> bool {
        self.flowcell_id == other.flowcell_id
            && self.image_analysis == other.image_analysis
            && self.bustard == other.bustard
            && self.gerald == other.gerald
    }
}

impl PipelineRun {
    pub const XML_TAG: &'static str = "PipelineRun";
    pub const XML_VERSION: u32 = 1;
    const FLOWCELL_TAG: &'static str = "FlowcellID";

    /// An empty run for `runfolder`. Without an explicit id the flowcell is
    /// looked up in the runfolder's own metadata.
    #[must_use]
    pub fn new(runfolder: &Path, flowcell_id: Option<&str>) -> Self {
        let flowcell_id = flowcell_id.map_or_else(|| find_flowcell_id(runfolder), str::to_string);
        Self {
            pathname: Some(runfolder.to_path_buf()),
            flowcell_id,
            image_analysis: None,
            bustard: None,
            gerald: None,
        }
    }

    /// Runfolder name recorded by the alignment or image-analysis config
    #[must_use]
    pub fn runfolder_name(&self) -> Option<String> {
        if let Some(name) = self.gerald.as_ref().and_then(Alignment::runfolder_name) {
            return Some(name);
        }
        match &self.image_analysis {
            Some(ImageAnalysis::Ipar(i)) => i.runfolder_name().map(str::to_string),
            _ => None,
        }
    }

    /// Latest timestamp of any stage
    #[must_use]
    pub fn time(&self) -> Option<i64> {
        [
            self.image_analysis.as_ref().map(ImageAnalysis::time),
            self.bustard.as_ref().and_then(Bustard::time),
            self.gerald.as_ref().and_then(Alignment::time),
        ]
        .into_iter()
        .flatten()
        .max()
    }

    /// Snapshot file name, `run_<flowcell>_<YYYY-MM-DD>.xml`
    #[must_use]
    pub fn name(&self) -> String {
        let date = self
            .time()
            .and_then(|t| DateTime::from_timestamp(t, 0))
            .unwrap_or_default()
            .format(SNAPSHOT_DATE_FORMAT);
        format!("run_{}_{date}.xml", self.flowcell_id)
    }

    /// # Errors
    ///
    /// Propagates alignment counting errors, including `ParseError::NotReady`.
    pub fn to_xml(&self) -> Result<Element, ParseError> {
        let mut root = Element::new(Self::XML_TAG).with_attr("version", Self::XML_VERSION);
        root.push(Element::text_element(Self::FLOWCELL_TAG, &self.flowcell_id));
        if let Some(image_analysis) = &self.image_analysis {
            root.push(image_analysis.to_xml());
        }
        if let Some(bustard) = &self.bustard {
            root.push(bustard.to_xml());
        }
        if let Some(gerald) = &self.gerald {
            root.push(gerald.to_xml()?);
        }
        Ok(root)
    }

    /// Rebuild from a `PipelineRun` snapshot element.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Xml` for a different root tag,
    /// `ParseError::InvalidFormat` when the image analysis or base calling
    /// stage is missing, and propagates errors from the stage readers.
    pub fn from_xml(tree: &Element) -> Result<Self, ParseError> {
        tree.expect_tag(Self::XML_TAG)?;
        tree.warn_if_newer(Self::XML_VERSION);

        let mut run = Self {
            pathname: None,
            flowcell_id: String::new(),
            image_analysis: None,
            bustard: None,
            gerald: None,
        };
        for element in &tree.children {
            if element.is(Self::FLOWCELL_TAG) {
                run.flowcell_id = element.text().to_string();
            } else if element.is(Firecrest::XML_TAG) {
                run.image_analysis = Some(ImageAnalysis::Firecrest(Firecrest::from_xml(element)?));
            } else if element.is(Ipar::XML_TAG) {
                run.image_analysis = Some(ImageAnalysis::Ipar(Ipar::from_xml(element)?));
            } else if element.is(Bustard::XML_TAG) {
                run.bustard = Some(Bustard::from_xml(element)?);
            } else if element.is(AlignmentSoftware::Gerald.xml_tag())
                || element.is(AlignmentSoftware::Casava.xml_tag())
            {
                run.gerald = Some(Alignment::from_xml(element)?);
            } else {
                warn!(tag = %element.name, "PipelineRun unrecognized tag, skipping");
            }
        }
        if run.image_analysis.is_none() {
            return Err(ParseError::InvalidFormat(format!(
                "{} snapshot for {} has no image analysis stage",
                Self::XML_TAG,
                run.flowcell_id
            )));
        }
        if run.bustard.is_none() {
            return Err(ParseError::InvalidFormat(format!(
                "{} snapshot for {} has no base calling stage",
                Self::XML_TAG,
                run.flowcell_id
            )));
        }
        Ok(run)
    }

    /// Write the snapshot into `destdir` and return its path.
    ///
    /// # Errors
    ///
    /// Propagates serialization and IO errors.
    pub fn save(&self, destdir: &Path) -> Result<PathBuf, ParseError> {
        let dest = destdir.join(self.name());
        info!(path = %dest.display(), "Saving run report");
        self.to_xml()?.write_file(&dest)?;
        Ok(dest)
    }

    /// Read a snapshot written by [`PipelineRun::save`].
    ///
    /// # Errors
    ///
    /// Propagates IO and XML errors and errors from [`PipelineRun::from_xml`].
    pub fn load(path: &Path) -> Result<Self, ParseError> {
        info!(path = %path.display(), "Loading run report");
        Self::from_xml(&Element::parse_file(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn firecrest_stage() -> Firecrest {
        Firecrest {
            start: 1,
            stop: 37,
            version: "1.9.6".to_string(),
            date: NaiveDate::from_ymd_opt(2008, 10, 20).unwrap(),
            user: "diane".to_string(),
            matrix: None,
            pathname: None,
        }
    }

    fn bustard_stage(day: u32) -> Bustard {
        Bustard {
            path_version: Some("1.9.6".to_string()),
            date: NaiveDate::from_ymd_opt(2008, 10, day),
            user: Some("diane".to_string()),
            ..Bustard::default()
        }
    }

    fn run() -> PipelineRun {
        PipelineRun {
            pathname: None,
            flowcell_id: "207BTAAXX".to_string(),
            image_analysis: Some(ImageAnalysis::Firecrest(firecrest_stage())),
            bustard: Some(bustard_stage(22)),
            gerald: None,
        }
    }

    #[test]
    fn test_name_uses_latest_stage() {
        assert_eq!(run().name(), "run_207BTAAXX_2008-10-22.xml");

        let mut earlier = run();
        earlier.bustard = Some(bustard_stage(19));
        assert_eq!(earlier.name(), "run_207BTAAXX_2008-10-20.xml");
    }

    #[test]
    fn test_image_analysis_interface() {
        let image = ImageAnalysis::Firecrest(firecrest_stage());
        assert_eq!(image.software(), Some("Firecrest"));
        assert_eq!(image.version(), Some("1.9.6"));
        assert_eq!(image.start(), Some(1));
        assert_eq!(image.stop(), Some(37));
        assert_eq!(
            image.date(),
            NaiveDate::from_ymd_opt(2008, 10, 20).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
        assert_eq!(image.pathname(), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let r = run();
        let path = r.save(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "run_207BTAAXX_2008-10-22.xml");

        let loaded = PipelineRun::load(&path).unwrap();
        assert_eq!(loaded, r);
        assert_eq!(loaded.name(), r.name());
    }

    #[test]
    fn test_unknown_tags_are_skipped() {
        let tree = run()
            .to_xml()
            .unwrap()
            .with_child(Element::text_element("Surprise", "x"));
        assert_eq!(PipelineRun::from_xml(&tree).unwrap(), run());
    }

    #[test]
    fn test_snapshot_needs_both_stages() {
        let mut no_bustard = run();
        no_bustard.bustard = None;
        let err = PipelineRun::from_xml(&no_bustard.to_xml().unwrap()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(ref m) if m.contains("base calling")));

        let mut no_image = run();
        no_image.image_analysis = None;
        let err = PipelineRun::from_xml(&no_image.to_xml().unwrap()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(ref m) if m.contains("image analysis")));
    }

    #[test]
    fn test_wrong_root_tag() {
        let tree = Element::new("Gerald");
        assert!(PipelineRun::from_xml(&tree).is_err());
    }
}
