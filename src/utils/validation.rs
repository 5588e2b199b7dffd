//! Centralized runfolder naming grammars and validation helpers.
//!
//! Every directory-name convention the discovery code relies on is a single
//! named regex here, with its capture groups documented next to it.

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::types::LANES_PER_FLOWCELL;

lazy_static! {
    /// A dotted version number anywhere in a string.
    /// Groups: 1 = version
    pub static ref VERSION_RE: Regex = Regex::new(r"([0-9]+(?:\.[0-9]+)*)").unwrap();

    /// `C<start>-<stop>_Firecrest<version>_<DD-MM-YYYY>_<user>[_n]`.
    /// Groups: `start`, `stop`, `version`, `date`, `user`
    pub static ref FIRECREST_DIR_RE: Regex = Regex::new(
        r"^C(?P<start>\d+)-(?P<stop>\d+)_Firecrest(?P<version>[0-9.]+)_(?P<date>\d{1,2}-\d{1,2}-\d{4})_(?P<user>[^_]+)(?:_\d+)?$"
    )
    .unwrap();

    /// `Bustard<version>_<DD-MM-YYYY>_<user>[_n]`.
    /// Groups: `version`, `date`, `user`
    pub static ref BUSTARD_DIR_RE: Regex = Regex::new(
        r"^Bustard(?P<version>[0-9.]+)_(?P<date>\d{1,2}-\d{1,2}-\d{4})_(?P<user>[^_]+)(?:_.*)?$"
    )
    .unwrap();

    /// `Aligned<suffix>` or `Unaligned<suffix>` at the runfolder root.
    /// Groups: `kind`, `suffix`
    pub static ref ALIGNED_DIR_RE: Regex =
        Regex::new(r"^(?P<kind>Aligned|Unaligned)(?P<suffix>.*)$").unwrap();

    /// Per-lane Bustard phasing file `params<N>.xml`.
    /// Groups: `lane`
    pub static ref PARAMS_FILE_RE: Regex = Regex::new(r"^params(?P<lane>.)\.xml$").unwrap();

    /// GA-era `SOFTWARE_VERSION` text, e.g. `@(#) Id: GERALD.pl,v 1.171 ...`.
    /// Groups: `version`
    pub static ref GERALD_VERSION_RE: Regex =
        Regex::new(r"GERALD\.pl,v (?P<version>\d+(?:\.\d+)+)").unwrap();

    /// `CASAVA-<version>` in a `SOFTWARE_VERSION` value.
    /// Groups: `version`
    pub static ref CASAVA_VERSION_RE: Regex =
        Regex::new(r"CASAVA-(?P<version>\d+(?:\.\d+)+)").unwrap();

    /// HiSeq `<Software Version="<name>-<version>">` attribute.
    /// Groups: `name`, `version`
    pub static ref SOFTWARE_ATTR_RE: Regex =
        Regex::new(r"^(?P<name>[A-Za-z][A-Za-z0-9_]*)-(?P<version>\d+(?:\.\d+)*)").unwrap();

    /// HiSeq demultiplexed export `<sample>_<index>_L00<lane>[_R<end>]_<part>_export.txt[.gz|.bz2]`.
    /// Groups: `sample`, `index`, `lane`, `end`, `part`
    pub static ref HISEQ_EXPORT_RE: Regex = Regex::new(
        r"^(?P<sample>.+?)_(?P<index>[A-Za-z-]+|NoIndex)_L00(?P<lane>\d)(?:_R(?P<end>\d))?_(?P<part>\d+)_export\.txt(?:\.bz2|\.gz)?$"
    )
    .unwrap();

    /// Legacy per-lane results `s_<lane>[_<end>]_<kind>.txt[.gz|.bz2]`.
    /// Groups: `lane`, `end`, `kind`
    pub static ref LANE_RESULT_RE: Regex = Regex::new(
        r"^s_(?P<lane>\d)(?:_(?P<end>\d))?_(?P<kind>eland_result|eland_extended|eland_multi|export|sequence)\.txt(?:\.bz2|\.gz)?$"
    )
    .unwrap();

    /// A `<n0>:<n1>:<n2>` hit-count triple from multi/extended/export files.
    /// Groups: 1..=3 = hits with 0, 1, 2 mismatches
    pub static ref MULTI_HITS_RE: Regex = Regex::new(r"^(\d+):(\d+):(\d+)$").unwrap();

    /// Substituted bases in an export mismatch descriptor
    pub static ref MISMATCH_BASE_RE: Regex = Regex::new(r"[ACGT]").unwrap();

    /// Leading `<?xml ...?>` declaration
    pub static ref XML_DECLARATION_RE: Regex = Regex::new(r"^\s*<\?xml.*?\?>").unwrap();
}

/// Check that a lane number is on the flowcell.
///
/// # Examples
///
/// ```
/// use illumina_runfolder::utils::validation::is_valid_lane;
///
/// assert!(is_valid_lane(1));
/// assert!(is_valid_lane(8));
/// assert!(!is_valid_lane(0));
/// assert!(!is_valid_lane(9));
/// ```
#[must_use]
pub fn is_valid_lane(lane: u32) -> bool {
    (1..=LANES_PER_FLOWCELL).contains(&lane)
}

/// Returns an error message if `lane` is off the flowcell, None if it is fine.
#[must_use]
pub fn check_lane(lane: u32) -> Option<String> {
    if is_valid_lane(lane) {
        None
    } else {
        Some(format!(
            "Lane {lane} is outside the flowcell (1..={LANES_PER_FLOWCELL})"
        ))
    }
}

/// Guess a flowcell id from the last `_`-delimited token of a runfolder name
#[must_use]
pub fn flowcell_from_dir_name(name: &str) -> Option<String> {
    let token = name.rsplit('_').next()?.trim();
    if token.is_empty() || token == name.trim() {
        None
    } else {
        Some(token.to_string())
    }
}
