//! Alignment result file families and filename detection.

use std::fmt;
use std::path::Path;

use crate::core::sample_key::SampleKey;
use crate::utils::fs::file_name;
use crate::utils::validation::{HISEQ_EXPORT_RE, LANE_RESULT_RE};

/// Sample name used by the legacy `s_<lane>_...` files
pub const LEGACY_SAMPLE: &str = "s";

/// Result file family, in discovery preference order.
///
/// Within one directory a file of an earlier family replaces results from a
/// later one for the same sample key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElandFormat {
    /// `<sample>_<index>_L00<lane>[_R<end>]_<part>_export.txt`
    HiSeqExport,
    /// `s_<lane>[_<end>]_eland_result.txt`
    Result,
    /// `s_<lane>[_<end>]_eland_extended.txt`
    Extended,
    /// `s_<lane>[_<end>]_eland_multi.txt`
    Multi,
    /// `s_<lane>[_<end>]_export.txt`
    Export,
    /// `s_<lane>[_<end>]_sequence.txt`, unaligned reads
    Sequence,
}

impl ElandFormat {
    /// Discovery preference; lower wins
    #[must_use]
    pub fn priority(self) -> u8 {
        self as u8
    }

    /// Whether the file carries alignments (everything but raw sequence)
    #[must_use]
    pub fn is_aligned(self) -> bool {
        self != Self::Sequence
    }

    fn from_kind(kind: &str) -> Option<Self> {
        Some(match kind {
            "eland_result" => Self::Result,
            "eland_extended" => Self::Extended,
            "eland_multi" => Self::Multi,
            "export" => Self::Export,
            "sequence" => Self::Sequence,
            _ => return None,
        })
    }
}

impl fmt::Display for ElandFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HiSeqExport => "hiseq_export",
            Self::Result => "eland_result",
            Self::Extended => "eland_extended",
            Self::Multi => "eland_multi",
            Self::Export => "export",
            Self::Sequence => "sequence",
        };
        f.write_str(name)
    }
}

/// What a result file name says about its contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElandFileName {
    pub format: ElandFormat,
    pub key: SampleKey,
    /// Split-file part number, HiSeq exports only
    pub part: Option<u32>,
}

/// Classify a result file by name alone.
///
/// The read defaults to 1 when the name carries no end number.
///
/// # Examples
///
/// ```
/// use illumina_runfolder::eland::format::{detect_format, ElandFormat};
///
/// let found = detect_format("s_3_2_eland_multi.txt.bz2").unwrap();
/// assert_eq!(found.format, ElandFormat::Multi);
/// assert_eq!(found.key.lane, Some(3));
/// assert_eq!(found.key.read, Some(2));
/// assert!(detect_format("s_3_qseq.txt").is_none());
/// ```
#[must_use]
pub fn detect_format(name: &str) -> Option<ElandFileName> {
    if let Some(caps) = HISEQ_EXPORT_RE.captures(name) {
        let key = SampleKey::from_text(
            caps.name("lane").map(|m| m.as_str()),
            Some(caps.name("end").map_or("1", |m| m.as_str())),
            caps.name("sample").map(|m| m.as_str()),
        );
        return Some(ElandFileName {
            format: ElandFormat::HiSeqExport,
            key,
            part: caps.name("part").and_then(|m| m.as_str().parse().ok()),
        });
    }

    let caps = LANE_RESULT_RE.captures(name)?;
    let format = ElandFormat::from_kind(&caps["kind"])?;
    let key = SampleKey::from_text(
        Some(&caps["lane"]),
        Some(caps.name("end").map_or("1", |m| m.as_str())),
        Some(LEGACY_SAMPLE),
    );
    Some(ElandFileName {
        format,
        key,
        part: None,
    })
}

/// [`detect_format`] on the final component of a path
#[must_use]
pub fn detect_path_format(path: &Path) -> Option<ElandFileName> {
    detect_format(file_name(path))
}
