use serde::{Deserialize, Serialize};

/// Number of lanes on a GA/HiSeq flowcell
pub const LANES_PER_FLOWCELL: u32 = 8;

/// Every lane number on a flowcell, in order
pub const LANE_LIST: [u32; LANES_PER_FLOWCELL as usize] = [1, 2, 3, 4, 5, 6, 7, 8];

/// Day-first date format used in pipeline directory names (`20-10-2008`)
pub const EUROPEAN_DATE_FORMAT: &str = "%d-%m-%Y";

/// Date format used in snapshot file names
pub const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Which alignment stage produced a Gerald-style directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentSoftware {
    /// GA-era GERALD.pl
    Gerald,
    /// HiSeq-era CASAVA
    Casava,
}

impl AlignmentSoftware {
    /// Tag used for this stage in run snapshots
    #[must_use]
    pub fn xml_tag(self) -> &'static str {
        match self {
            Self::Gerald => "Gerald",
            Self::Casava => "Casava",
        }
    }
}

impl std::fmt::Display for AlignmentSoftware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gerald => write!(f, "GERALD"),
            Self::Casava => write!(f, "CASAVA"),
        }
    }
}

/// Layout of reads in an unaligned sequence file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceType {
    /// One read per line, colon-separated fields
    Scarf,
    /// Four lines per read
    Fastq,
}

impl SequenceType {
    /// Parse the name stored in snapshots
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "scarf" => Some(Self::Scarf),
            "fastq" => Some(Self::Fastq),
            _ => None,
        }
    }
}

impl std::fmt::Display for SequenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scarf => write!(f, "scarf"),
            Self::Fastq => write!(f, "fastq"),
        }
    }
}

/// Raw read files written by the base caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceFormat {
    /// `*_qseq.txt`
    Qseq,
    /// `*_sequence.txt` or `*.fastq`
    Fastq,
    /// `*_seq.txt` / scarf
    Raw,
}

impl SequenceFormat {
    /// Parse the name stored in snapshots
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "qseq" => Some(Self::Qseq),
            "fastq" => Some(Self::Fastq),
            "raw" => Some(Self::Raw),
            _ => None,
        }
    }
}

impl std::fmt::Display for SequenceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Qseq => write!(f, "qseq"),
            Self::Fastq => write!(f, "fastq"),
            Self::Raw => write!(f, "raw"),
        }
    }
}
