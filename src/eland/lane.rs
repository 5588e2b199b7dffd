//! Per-lane alignment results and the line grammars that count them.
//!
//! Counting is lazy: a [`ResultLane`] found during discovery remembers its
//! files and reads them the first time a count is asked for.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::core::counts::{MappedReads, MatchCode, MatchCodes};
use crate::core::types::SequenceType;
use crate::eland::format::{detect_path_format, ElandFormat};
use crate::element::Element;
use crate::parsing::genome_map::GenomeMap;
use crate::parsing::{parse_field, ParseError};
use crate::utils::opener::open_maybe_compressed;
use crate::utils::validation::{MISMATCH_BASE_RE, MULTI_HITS_RE};

/// Hit counts of 255 mean "too many to list"
const TOO_MANY_HITS: u64 = 255;

/// Column of the match field in export files
const EXPORT_MATCH_COLUMN: usize = 10;
/// Column of the mismatch descriptor in export files
const EXPORT_DESCRIPTOR_COLUMN: usize = 13;

/// How a match field was scored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScore {
    /// `QC`, `NM` or `RM`; counted directly
    Qc,
    /// A `n0:n1:n2` hit triple
    Read,
    /// Neither; export files put a chromosome here
    Unrecognized,
}

/// Score a multi/extended/export match field into `match_codes`.
///
/// A class count of exactly 1 is a unique hit, counts in `2..255` add to
/// the repeat counter and 255 is left out.
pub fn score_mapped_mismatches(field: &str, match_codes: &mut MatchCodes) -> MatchScore {
    match field {
        "QC" => match_codes.bump(MatchCode::QC, 1),
        "NM" => match_codes.bump(MatchCode::NM, 1),
        "RM" => match_codes.bump(MatchCode::RM, 1),
        _ => {
            let Some(caps) = MULTI_HITS_RE.captures(field) else {
                return MatchScore::Unrecognized;
            };
            for mismatches in 0..3 {
                let hits: u64 = caps[mismatches + 1].parse().unwrap_or(0);
                if hits == 1 {
                    match_codes.bump(MatchCode::unique(mismatches), 1);
                } else if (2..TOO_MANY_HITS).contains(&hits) {
                    match_codes.bump(MatchCode::repeat(mismatches), hits);
                }
            }
            return MatchScore::Read;
        }
    }
    MatchScore::Qc
}

/// Classify an export mismatch descriptor by its substituted bases and
/// count the read against `chromosome`.
pub fn count_mapped_export(
    mapped_reads: &mut MappedReads,
    chromosome: &str,
    descriptor: &str,
) -> MatchCode {
    mapped_reads.bump(chromosome, 1);
    match MISMATCH_BASE_RE.find_iter(descriptor).count() {
        0 => MatchCode::U0,
        1 => MatchCode::U1,
        _ => MatchCode::U2,
    }
}

/// Count one location per `chr:pos` entry of a multi-format hit list.
/// Entries without a chromosome reuse the previous one.
fn count_mapped_multireads(mapped_reads: &mut MappedReads, genome_map: &GenomeMap, hits: &str) {
    let mut chromosome: Option<&str> = None;
    for hit in hits.split(',') {
        let fragment: Vec<&str> = hit.split(':').collect();
        if fragment.len() == 2 {
            chromosome = Some(fragment[0]);
        }
        if let Some(name) = chromosome {
            mapped_reads.bump(genome_map.resolve(name), 1);
        }
    }
}

/// Totals for one or more aligned result files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElandCounts {
    pub match_codes: MatchCodes,
    pub mapped_reads: MappedReads,
    pub reads: u64,
}

impl ElandCounts {
    #[must_use]
    pub fn merge(&self, other: &ElandCounts) -> Self {
        Self {
            match_codes: self.match_codes.merge(&other.match_codes),
            mapped_reads: self.mapped_reads.merge(&other.mapped_reads),
            reads: self.reads + other.reads,
        }
    }
}

/// `eland_result.txt`: field 2 is a match code, field 6 the chromosome file.
///
/// # Errors
///
/// Returns `ParseError::Io` on read failure and `ParseError::Counts` for a
/// code outside the nine known ones.
pub fn count_eland_result<R: BufRead>(
    reader: R,
    genome_map: &GenomeMap,
) -> Result<ElandCounts, ParseError> {
    let mut counts = ElandCounts::default();
    for line in reader.lines() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }
        counts.reads += 1;
        counts.match_codes.bump(fields[2].parse()?, 1);
        if fields.len() >= 7 {
            counts.mapped_reads.bump(genome_map.resolve(fields[6]), 1);
        }
    }
    Ok(counts)
}

/// `eland_multi.txt` / `eland_extended.txt`: field 2 is a QC code or hit
/// triple, field 3 an optional `chr:pos` hit list.
///
/// # Errors
///
/// Returns `ParseError::Io` on read failure.
pub fn count_eland_multi<R: BufRead>(
    reader: R,
    genome_map: &GenomeMap,
) -> Result<ElandCounts, ParseError> {
    let mut counts = ElandCounts::default();
    for line in reader.lines() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }
        counts.reads += 1;
        let score = score_mapped_mismatches(fields[2], &mut counts.match_codes);
        if score == MatchScore::Read {
            if let Some(hits) = fields.get(3).filter(|h| **h != "-") {
                count_mapped_multireads(&mut counts.mapped_reads, genome_map, hits);
            }
        }
    }
    Ok(counts)
}

/// `export.txt`: tab-separated, match field at column 10 and mismatch
/// descriptor at column 13.
///
/// # Errors
///
/// Returns `ParseError::Io` on read failure.
pub fn count_eland_export<R: BufRead>(
    reader: R,
    genome_map: &GenomeMap,
) -> Result<ElandCounts, ParseError> {
    let mut counts = ElandCounts::default();
    for line in reader.lines() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(matched) = fields.get(EXPORT_MATCH_COLUMN) else {
            continue;
        };
        counts.reads += 1;
        if score_mapped_mismatches(matched, &mut counts.match_codes) != MatchScore::Unrecognized {
            continue;
        }
        let descriptor = fields.get(EXPORT_DESCRIPTOR_COLUMN).copied().unwrap_or("");
        let code = count_mapped_export(
            &mut counts.mapped_reads,
            genome_map.resolve(matched),
            descriptor,
        );
        counts.match_codes.bump(code, 1);
    }
    Ok(counts)
}

/// Read layout and count of an unaligned sequence file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceCounts {
    pub sequence_type: SequenceType,
    pub reads: u64,
}

/// Lines starting with `@` are fastq (four lines per read), anything else
/// is scarf (one line per read).
///
/// # Errors
///
/// Returns `ParseError::Io` on read failure.
pub fn count_sequence<R: BufRead>(reader: R) -> Result<SequenceCounts, ParseError> {
    let mut lines = 0u64;
    let mut sequence_type = SequenceType::Scarf;
    for line in reader.lines() {
        let line = line?;
        if lines == 0 && line.starts_with('@') {
            sequence_type = SequenceType::Fastq;
        }
        lines += 1;
    }
    let reads = match sequence_type {
        SequenceType::Fastq => lines / 4,
        SequenceType::Scarf => lines,
    };
    Ok(SequenceCounts {
        sequence_type,
        reads,
    })
}

/// Opens an alignment file, treating a zero-byte file as one still being
/// written. The size is checked before decoding because an empty `.gz` or
/// `.bz2` fails in the decoder rather than reading as empty.
fn open_nonempty(path: &Path) -> Result<Box<dyn BufRead>, ParseError> {
    if std::fs::metadata(path)?.len() == 0 {
        return Err(ParseError::NotReady(path.to_path_buf()));
    }
    let mut reader = open_maybe_compressed(path)?;
    if reader.fill_buf()?.is_empty() {
        return Err(ParseError::NotReady(path.to_path_buf()));
    }
    Ok(reader)
}

/// Counts for aligned lanes, read on first use
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElandLane {
    pub genome_map: GenomeMap,
    counts: OnceLock<ElandCounts>,
}

impl ElandLane {
    pub const XML_TAG: &'static str = "ElandLane";

    #[must_use]
    pub fn new(genome_map: GenomeMap) -> Self {
        Self {
            genome_map,
            counts: OnceLock::new(),
        }
    }

    /// A lane whose counts are already known, as when loaded from a snapshot
    #[must_use]
    pub fn with_counts(genome_map: GenomeMap, counts: ElandCounts) -> Self {
        Self {
            genome_map,
            counts: OnceLock::from(counts),
        }
    }

    /// Sum the counts of every file in `pathnames`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::NotReady` if a file is still empty, and IO or
    /// match-code errors from the line grammars.
    pub fn counts(&self, pathnames: &[PathBuf]) -> Result<&ElandCounts, ParseError> {
        if let Some(counts) = self.counts.get() {
            return Ok(counts);
        }
        let mut total = ElandCounts::default();
        for path in pathnames {
            let format = detect_path_format(path).map(|f| f.format);
            let reader = open_nonempty(path)?;
            let counts = match format {
                Some(ElandFormat::Result) => count_eland_result(reader, &self.genome_map)?,
                Some(ElandFormat::Multi | ElandFormat::Extended) => {
                    count_eland_multi(reader, &self.genome_map)?
                }
                Some(ElandFormat::Export | ElandFormat::HiSeqExport) => {
                    count_eland_export(reader, &self.genome_map)?
                }
                Some(ElandFormat::Sequence) | None => {
                    return Err(ParseError::InvalidFormat(format!(
                        "{} is not an alignment result",
                        path.display()
                    )))
                }
            };
            debug!(path = %path.display(), reads = counts.reads, "Counted alignment file");
            total = total.merge(&counts);
        }
        Ok(self.counts.get_or_init(|| total))
    }
}

/// Counts for unaligned sequence lanes, read on first use
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceLane {
    counts: OnceLock<SequenceCounts>,
}

impl SequenceLane {
    pub const XML_TAG: &'static str = "SequenceLane";

    #[must_use]
    pub fn with_counts(counts: SequenceCounts) -> Self {
        Self {
            counts: OnceLock::from(counts),
        }
    }

    /// Count reads across `pathnames`; the first file decides the layout.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::NotReady` if a file is still empty.
    pub fn counts(&self, pathnames: &[PathBuf]) -> Result<&SequenceCounts, ParseError> {
        if let Some(counts) = self.counts.get() {
            return Ok(counts);
        }
        let mut total: Option<SequenceCounts> = None;
        for path in pathnames {
            let counts = count_sequence(open_nonempty(path)?)?;
            total = Some(match total {
                Some(t) => SequenceCounts {
                    reads: t.reads + counts.reads,
                    ..t
                },
                None => counts,
            });
        }
        let total = total.unwrap_or(SequenceCounts {
            sequence_type: SequenceType::Scarf,
            reads: 0,
        });
        Ok(self.counts.get_or_init(|| total))
    }
}

/// Aligned or unaligned payload of a [`ResultLane`]
#[derive(Debug, Clone, PartialEq)]
pub enum ResultKind {
    Eland(ElandLane),
    Sequence(SequenceLane),
}

/// Results for one `(lane, read, sample)`
#[derive(Debug, Clone)]
pub struct ResultLane {
    /// Source files; empty for lanes loaded from a snapshot
    pub pathnames: Vec<PathBuf>,
    pub sample_name: String,
    pub lane_id: u32,
    /// 1-based read number
    pub end: u32,
    pub kind: ResultKind,
}

/// Source files are not part of the parsed metadata
impl PartialEq for ResultLane {
    fn eq(&self, other: &Self) -> bool {
        self.sample_name == other.sample_name
            && self.lane_id == other.lane_id
            && self.end == other.end
            && self.kind == other.kind
    }
}

impl ResultLane {
    const VERSION: u32 = 2;

    #[must_use]
    pub fn new(sample_name: &str, lane_id: u32, end: u32, kind: ResultKind) -> Self {
        Self {
            pathnames: Vec::new(),
            sample_name: sample_name.to_string(),
            lane_id,
            end,
            kind,
        }
    }

    #[must_use]
    pub fn is_aligned(&self) -> bool {
        matches!(self.kind, ResultKind::Eland(_))
    }

    /// # Errors
    ///
    /// See [`ElandLane::counts`].
    pub fn reads(&self) -> Result<u64, ParseError> {
        match &self.kind {
            ResultKind::Eland(lane) => Ok(lane.counts(&self.pathnames)?.reads),
            ResultKind::Sequence(lane) => Ok(lane.counts(&self.pathnames)?.reads),
        }
    }

    /// Alignment counts; `None` for sequence-only lanes.
    ///
    /// # Errors
    ///
    /// See [`ElandLane::counts`].
    pub fn eland_counts(&self) -> Result<Option<&ElandCounts>, ParseError> {
        match &self.kind {
            ResultKind::Eland(lane) => lane.counts(&self.pathnames).map(Some),
            ResultKind::Sequence(_) => Ok(None),
        }
    }

    /// Layout of a sequence-only lane.
    ///
    /// # Errors
    ///
    /// See [`SequenceLane::counts`].
    pub fn sequence_type(&self) -> Result<Option<SequenceType>, ParseError> {
        match &self.kind {
            ResultKind::Sequence(lane) => Ok(Some(lane.counts(&self.pathnames)?.sequence_type)),
            ResultKind::Eland(_) => Ok(None),
        }
    }

    /// Serialize, counting the source files first if needed.
    ///
    /// # Errors
    ///
    /// Propagates counting errors, including `ParseError::NotReady`.
    pub fn to_xml(&self) -> Result<Element, ParseError> {
        let tag = match self.kind {
            ResultKind::Eland(_) => ElandLane::XML_TAG,
            ResultKind::Sequence(_) => SequenceLane::XML_TAG,
        };
        let mut root = Element::new(tag)
            .with_attr("version", Self::VERSION)
            .with_child(Element::text_element("SampleName", &self.sample_name))
            .with_child(Element::text_element("LaneID", self.lane_id))
            .with_child(Element::text_element("End", self.end));

        match &self.kind {
            ResultKind::Eland(lane) => {
                let counts = lane.counts(&self.pathnames)?;
                root.push(lane.genome_map.to_xml());
                let mut mapped = Element::new("MappedReads");
                for (name, count) in counts.mapped_reads.iter() {
                    mapped.push(
                        Element::new("MappedItem")
                            .with_attr("name", name)
                            .with_attr("value", count),
                    );
                }
                root.push(mapped);
                let mut codes = Element::new("MatchCodes");
                for (code, count) in counts.match_codes.iter() {
                    codes.push(
                        Element::new("Code")
                            .with_attr("name", code)
                            .with_attr("value", count),
                    );
                }
                root.push(codes);
                root.push(Element::text_element("Reads", counts.reads));
            }
            ResultKind::Sequence(lane) => {
                let counts = lane.counts(&self.pathnames)?;
                root.push(Element::text_element("Reads", counts.reads));
                root.push(Element::text_element("SequenceType", counts.sequence_type));
            }
        }
        Ok(root)
    }

    /// Rebuild from an `ElandLane` or `SequenceLane` snapshot element.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidFormat` for other tags or malformed
    /// numbers, and `ParseError::Counts` for unknown match codes.
    pub fn from_xml(tree: &Element) -> Result<Self, ParseError> {
        tree.warn_if_newer(Self::VERSION);
        let aligned = if tree.is(ElandLane::XML_TAG) {
            true
        } else if tree.is(SequenceLane::XML_TAG) {
            false
        } else {
            return Err(ParseError::InvalidFormat(format!(
                "Expected ElandLane or SequenceLane, found {}",
                tree.name
            )));
        };

        let mut sample_name = String::new();
        let mut lane_id = 0;
        let mut end = 1;
        let mut reads = 0;
        let mut genome_map = GenomeMap::new();
        let mut mapped_reads = MappedReads::new();
        let mut match_codes = MatchCodes::new();
        let mut sequence_type = SequenceType::Scarf;

        for element in &tree.children {
            match element.tag().as_str() {
                "samplename" => sample_name = element.text().to_string(),
                "laneid" => lane_id = parse_field("LaneID", element.text())?,
                "end" => end = parse_field("End", element.text())?,
                "reads" => reads = parse_field("Reads", element.text())?,
                "genomemap" => genome_map = GenomeMap::from_xml(element),
                "mappedreads" => {
                    mapped_reads = element
                        .children
                        .iter()
                        .map(name_value)
                        .collect::<Result<_, _>>()?;
                }
                "matchcodes" => {
                    let pairs = element
                        .children
                        .iter()
                        .map(name_value)
                        .collect::<Result<Vec<_>, _>>()?;
                    match_codes =
                        MatchCodes::from_pairs(pairs.iter().map(|(n, v)| (n.as_str(), *v)))?;
                }
                "sequencetype" => {
                    sequence_type = SequenceType::from_name(element.text()).ok_or_else(|| {
                        ParseError::InvalidFormat(format!(
                            "Unknown sequence type {:?}",
                            element.text()
                        ))
                    })?;
                }
                _ => warn!(tag = %element.name, "ResultLane unrecognized tag"),
            }
        }

        let kind = if aligned {
            ResultKind::Eland(ElandLane::with_counts(
                genome_map,
                ElandCounts {
                    match_codes,
                    mapped_reads,
                    reads,
                },
            ))
        } else {
            ResultKind::Sequence(SequenceLane::with_counts(SequenceCounts {
                sequence_type,
                reads,
            }))
        };
        Ok(Self::new(&sample_name, lane_id, end, kind))
    }
}

fn name_value(item: &Element) -> Result<(String, u64), ParseError> {
    let name = item
        .attr("name")
        .ok_or_else(|| ParseError::InvalidFormat(format!("{} without name", item.name)))?;
    let value = item
        .attr("value")
        .ok_or_else(|| ParseError::InvalidFormat(format!("{name} without value")))?;
    Ok((name.to_string(), parse_field(name, value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::io::Cursor;

    fn codes(pairs: &[(&str, u64)]) -> MatchCodes {
        MatchCodes::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_score_mapped_mismatches() {
        let mut mc = MatchCodes::new();
        assert_eq!(score_mapped_mismatches("QC", &mut mc), MatchScore::Qc);
        assert_eq!(score_mapped_mismatches("NM", &mut mc), MatchScore::Qc);
        assert_eq!(mc, codes(&[("QC", 1), ("NM", 1)]));

        assert_eq!(score_mapped_mismatches("1:0:0", &mut mc), MatchScore::Read);
        assert_eq!(score_mapped_mismatches("2:4:16", &mut mc), MatchScore::Read);
        assert_eq!(
            mc,
            codes(&[("QC", 1), ("NM", 1), ("U0", 1), ("R0", 2), ("R1", 4), ("R2", 16)])
        );

        score_mapped_mismatches("1:1:1", &mut mc);
        score_mapped_mismatches("0:0:1", &mut mc);
        assert_eq!(mc.get(MatchCode::U0), 2);
        assert_eq!(mc.get(MatchCode::U1), 1);
        assert_eq!(mc.get(MatchCode::U2), 2);

        let before = mc;
        assert_eq!(score_mapped_mismatches("chr3.fa", &mut mc), MatchScore::Unrecognized);
        assert_eq!(mc, before);
    }

    #[test]
    fn test_too_many_hits_excluded() {
        let mut mc = MatchCodes::new();
        score_mapped_mismatches("1:0:2", &mut mc);
        assert_eq!(mc, codes(&[("U0", 1), ("R2", 2)]));

        let mut mc = MatchCodes::new();
        score_mapped_mismatches("0:255:254", &mut mc);
        assert_eq!(mc, codes(&[("R2", 254)]));
    }

    #[test]
    fn test_count_mapped_export() {
        let cases = [
            ("38", MatchCode::U0),
            ("36A4", MatchCode::U1),
            ("30A2T2", MatchCode::U2),
            ("26AG2T2", MatchCode::U2),
            ("26^AG$4", MatchCode::U2),
            ("26^2$4", MatchCode::U0),
        ];
        for (descriptor, expected) in cases {
            let mut mapped = MappedReads::new();
            assert_eq!(count_mapped_export(&mut mapped, "chr3.fa", descriptor), expected);
            assert_eq!(mapped.get("chr3.fa"), Some(1));
        }
    }

    const EXPORT_QC: &str = "ILLUMINA-33A494 1       1       1       3291    1036    0       1       GANNTCCTCACCCGACANNNNNNNANNNCGGGNNACTC  \\XBB]^^^^[`````BBBBBBBBBBBBBBBBBBBBBBB  QC";
    const EXPORT_EXACT: &str = "ILLUMINA-33A494 1       1       1       2678    1045    0       1       AAGGTGAAGAAGGAGATGNNGATGATGACGACGATAGA  ]]WW[[W]W]]R\\WWZ[RBBS^\\XVa____]W[]]___  chrX.fa         148341829       F       38       45";
    const EXPORT_MISMATCH: &str = "ILLUMINA-33A494 1       1       1       2678    1045    0       1       AAGGTGAAGAAGGAGATGNNGATGATGACGACGATAGA  ]]WW[[W]W]]R\\WWZ[RBBS^\\XVa____]W[]]___  chrX.fa         148341829       F       18AA15G1T       45";
    const EXPORT_MULTI: &str = "ILLUMINA-33A494 1       1       1       4405    1046    0       1       GTGGTTTCGCTGGATAGTNNGTAGGGACAGTGGGAATC  ``````````__a__V^XBB^SW^^a_____a______  9:2:1";

    fn export(line: &str) -> ElandCounts {
        count_eland_export(Cursor::new(line), &GenomeMap::new()).unwrap()
    }

    #[test]
    fn test_export_lines() {
        let qc = export(EXPORT_QC);
        assert_eq!(qc.match_codes, codes(&[("QC", 1)]));
        assert!(qc.mapped_reads.is_empty());
        assert_eq!(qc.reads, 1);

        let exact = export(EXPORT_EXACT);
        assert_eq!(exact.match_codes, codes(&[("U0", 1)]));
        assert_eq!(exact.mapped_reads.get("chrX.fa"), Some(1));

        let mismatch = export(EXPORT_MISMATCH);
        assert_eq!(mismatch.match_codes, codes(&[("U2", 1)]));

        let multi = export(EXPORT_MULTI);
        assert_eq!(multi.match_codes, codes(&[("U2", 1), ("R0", 9), ("R1", 2)]));
        assert!(multi.mapped_reads.is_empty());
    }

    #[test]
    fn test_eland_result_line() {
        let line = ">HWI-EAS229_24_207BTAAXX:1:7:599:759\tACATAGNCACAGACATAAACATAGACATAGAC\tU0\t1\t1\t3\tchrUextra.fa\t28189829\tR\tD.\n";
        let counts = count_eland_result(Cursor::new(line), &GenomeMap::new()).unwrap();
        assert_eq!(counts.match_codes, codes(&[("U0", 1)]));
        assert_eq!(counts.mapped_reads.get("chrUextra.fa"), Some(1));
        assert_eq!(counts.reads, 1);

        let mut genome = GenomeMap::new();
        genome.insert("chrUextra.fa", "dm3/chrUextra.fa");
        let counts = count_eland_result(Cursor::new(line), &genome).unwrap();
        assert_eq!(counts.mapped_reads.get("dm3/chrUextra.fa"), Some(1));
    }

    #[test]
    fn test_eland_result_unknown_code() {
        let line = ">r1\tACGT\tXX\n";
        assert!(matches!(
            count_eland_result(Cursor::new(line), &GenomeMap::new()),
            Err(ParseError::Counts(_))
        ));
    }

    #[test]
    fn test_eland_multi_locations() {
        let text = "\
>r1\tACGT\t1:0:2\tchr1.fa:100F0,200R2,chr2.fa:5F2\n\
>r2\tACGT\tNM\t-\n\
>r3\tACGT\t0:1:0\tchrX.fa:7R1\n\
>r4\tACGT\t2:0:0\t-\n";
        let counts = count_eland_multi(Cursor::new(text), &GenomeMap::new()).unwrap();
        assert_eq!(counts.reads, 4);
        assert_eq!(
            counts.match_codes,
            codes(&[("NM", 1), ("U0", 1), ("U1", 1), ("R0", 2), ("R2", 2)])
        );
        assert_eq!(counts.mapped_reads.get("chr1.fa"), Some(2));
        assert_eq!(counts.mapped_reads.get("chr2.fa"), Some(1));
        assert_eq!(counts.mapped_reads.get("chrX.fa"), Some(1));
    }

    #[test]
    fn test_sequence_layouts() {
        let fastq = "@r1\nACGT\n+\nIIII\n@r2\nACGT\n+\nIIII\n";
        let counts = count_sequence(Cursor::new(fastq)).unwrap();
        assert_eq!(counts.sequence_type, SequenceType::Fastq);
        assert_eq!(counts.reads, 2);

        let scarf = "HWI-EAS229:1:1:100:200:ACGT:IIII\nHWI-EAS229:1:1:100:201:ACGT:IIII\nHWI-EAS229:1:1:100:202:ACGT:IIII\n";
        let counts = count_sequence(Cursor::new(scarf)).unwrap();
        assert_eq!(counts.sequence_type, SequenceType::Scarf);
        assert_eq!(counts.reads, 3);
    }

    #[test]
    fn test_empty_file_is_not_ready() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("s_1_eland_result.txt");
        fs::write(&path, "").unwrap();
        let lane = ResultLane {
            pathnames: vec![path],
            ..ResultLane::new("s", 1, 1, ResultKind::Eland(ElandLane::default()))
        };
        let err = lane.reads().unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_empty_compressed_file_is_not_ready() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["s_1_eland_result.txt.bz2", "s_1_eland_result.txt.gz"] {
            let path = tmp.path().join(name);
            fs::write(&path, "").unwrap();
            let lane = ResultLane {
                pathnames: vec![path],
                ..ResultLane::new("s", 1, 1, ResultKind::Eland(ElandLane::default()))
            };
            let err = lane.reads().unwrap_err();
            assert!(matches!(err, ParseError::NotReady(_)), "{name}: {err}");
        }
    }

    #[test]
    fn test_split_files_are_summed() {
        let tmp = tempfile::tempdir().unwrap();
        let mut pathnames = Vec::new();
        for part in 1..=2 {
            let path = tmp
                .path()
                .join(format!("11111_CCAATT_L001_R1_00{part}_export.txt"));
            fs::write(&path, format!("{EXPORT_EXACT}\n{EXPORT_QC}\n")).unwrap();
            pathnames.push(path);
        }
        let lane = ResultLane {
            pathnames,
            ..ResultLane::new("11111", 1, 1, ResultKind::Eland(ElandLane::default()))
        };
        let counts = lane.eland_counts().unwrap().unwrap();
        assert_eq!(counts.reads, 4);
        assert_eq!(counts.match_codes, codes(&[("QC", 2), ("U0", 2)]));
        assert_eq!(counts.mapped_reads.get("chrX.fa"), Some(2));
    }

    #[test]
    fn test_xml_round_trip() {
        let mut genome = GenomeMap::new();
        genome.insert("chr1.fa", "mm9/chr1.fa");
        let eland = ResultLane::new(
            "s",
            3,
            2,
            ResultKind::Eland(ElandLane::with_counts(
                genome,
                ElandCounts {
                    match_codes: codes(&[("U0", 10), ("NM", 3)]),
                    mapped_reads: [("mm9/chr1.fa".to_string(), 10)].into_iter().collect(),
                    reads: 13,
                },
            )),
        );
        let xml = eland.to_xml().unwrap();
        assert_eq!(ResultLane::from_xml(&xml).unwrap(), eland);

        let sequence = ResultLane::new(
            "s",
            4,
            1,
            ResultKind::Sequence(SequenceLane::with_counts(SequenceCounts {
                sequence_type: SequenceType::Fastq,
                reads: 42,
            })),
        );
        let xml = sequence.to_xml().unwrap();
        assert!(xml.is("SequenceLane"));
        let again = ResultLane::from_xml(&xml).unwrap();
        assert_eq!(again, sequence);
        assert_eq!(again.sequence_type().unwrap(), Some(SequenceType::Fastq));
    }
}
