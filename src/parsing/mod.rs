//! Readers for the per-stage metadata a pipeline writes into a runfolder.
//!
//! - **Image analysis**: [`firecrest`] (legacy, encoded in the directory
//!   name) and [`ipar`] (IPAR/RTA parameter XML)
//! - **Base calling**: [`bustard`] (phasing, crosstalk, software version)
//! - **QC summary**: [`summary`] (8/10 column `Summary.htm`, `Summary.xml`,
//!   HiSeq `read<N>.xml`)
//! - **Alignment**: [`gerald`] (GERALD/CASAVA `config.xml`)
//! - **Genome maps**: [`genome_map`] (`*.vld` directories, `genomesizes.xml`)
//! - **Flowcell ids**: [`flowcell`] (`RunInfo.xml`, `Config/FlowcellId.xml`)
//!
//! Every reader can write itself to an [`Element`](crate::element::Element)
//! and be rebuilt from one; the pair is what run snapshots are made of.
//!
//! ## Example
//!
//! ```rust,no_run
//! use illumina_runfolder::parsing::firecrest::firecrest;
//! use std::path::Path;
//!
//! let dir = Path::new("080416_HWI-EAS229/Data/C1-33_Firecrest1.8.28_19-04-2008_diane");
//! if let Some(image) = firecrest(dir).unwrap() {
//!     println!("cycles {}-{}", image.start, image.stop);
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::core::counts::CountsError;
use crate::core::mean_range::MeanRangeError;
use crate::element::XmlError;

pub mod bustard;
pub mod firecrest;
pub mod flowcell;
pub mod genome_map;
pub mod gerald;
pub mod html;
pub mod ipar;
pub mod summary;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unrecognized directory name: {0}")]
    UnrecognizedDirectory(String),

    #[error("Missing required file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("{0}")]
    FormatChanged(String),

    #[error("{}: alignment isn't done, try again later", .0.display())]
    NotReady(PathBuf),

    #[error(transparent)]
    Counts(#[from] CountsError),
}

impl ParseError {
    /// True for conditions that go away by themselves, such as an alignment
    /// file that exists but has not been written yet
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ParseError::NotReady(_))
    }
}

impl From<MeanRangeError> for ParseError {
    fn from(err: MeanRangeError) -> Self {
        ParseError::FormatChanged(err.to_string())
    }
}

/// Parse a required numeric child text, naming the field in the error
pub(crate) fn parse_field<T: std::str::FromStr>(field: &str, text: &str) -> Result<T, ParseError> {
    text.trim()
        .parse()
        .map_err(|_| ParseError::InvalidFormat(format!("{field}: cannot parse {text:?}")))
}
