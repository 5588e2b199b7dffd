//! Flowcell id lookup for a runfolder.
//!
//! Sources, first hit wins: `RunInfo.xml`, `Config/FlowcellId.xml`, the
//! last `_` token of the runfolder name, then `"unknown"`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use serde_xml_rs::from_reader;
use tracing::{debug, warn};

use crate::element::Element;
use crate::utils::fs::file_name;
use crate::utils::validation::flowcell_from_dir_name;

pub const UNKNOWN_FLOWCELL: &str = "unknown";

#[derive(Debug, Deserialize, PartialEq, Eq)]
struct RunInfo {
    #[serde(rename = "Run")]
    run: RunInfoRun,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
struct RunInfoRun {
    #[serde(rename = "Flowcell", default)]
    flowcell: Option<String>,
}

/// `RunInfo/Run/Flowcell` from a runfolder's `RunInfo.xml`
#[must_use]
pub fn flowcell_from_run_info(runfolder: &Path) -> Option<String> {
    let path = runfolder.join("RunInfo.xml");
    let file = File::open(&path).ok()?;
    match from_reader::<_, RunInfo>(BufReader::new(file)) {
        Ok(info) => info
            .run
            .flowcell
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unable to read RunInfo.xml");
            None
        }
    }
}

/// `<FlowcellId><Text>` from `Config/FlowcellId.xml`
#[must_use]
pub fn flowcell_from_config(runfolder: &Path) -> Option<String> {
    let path = runfolder.join("Config").join("FlowcellId.xml");
    if !path.exists() {
        return None;
    }
    match Element::parse_file(&path) {
        Ok(root) => root
            .find_text("Text")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unable to read FlowcellId.xml");
            None
        }
    }
}

/// Resolve a runfolder's flowcell id, never failing.
#[must_use]
pub fn find_flowcell_id(runfolder: &Path) -> String {
    if let Some(id) = flowcell_from_run_info(runfolder) {
        debug!(flowcell = %id, "Flowcell id from RunInfo.xml");
        return id;
    }
    if let Some(id) = flowcell_from_config(runfolder) {
        debug!(flowcell = %id, "Flowcell id from Config/FlowcellId.xml");
        return id;
    }
    let name = fs_name(runfolder);
    if let Some(id) = flowcell_from_dir_name(&name) {
        debug!(flowcell = %id, "Flowcell id from runfolder name");
        return id;
    }
    warn!(
        path = %runfolder.display(),
        "Flowcell id was not found, guessing {UNKNOWN_FLOWCELL}"
    );
    UNKNOWN_FLOWCELL.to_string()
}

/// Directory name, looking through `.` and trailing separators
fn fs_name(path: &Path) -> String {
    let name = file_name(path);
    if !name.is_empty() {
        return name.to_string();
    }
    path.canonicalize()
        .ok()
        .map(|p| file_name(&p).to_string())
        .unwrap_or_default()
}
