//! Find alignment result files under a GERALD/Aligned directory.
//!
//! Base directories are scanned in order: the directory itself, `Temp/`,
//! then every `Project_*/Sample_*`. Inside one base directory the preferred
//! [`ElandFormat`] wins and equal formats collect split parts. A later base
//! directory replaces whatever an earlier one found for the same key.

use std::collections::{btree_map, BTreeMap};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::sample_key::SampleKey;
use crate::eland::collection::ElandCollection;
use crate::eland::format::{detect_path_format, ElandFormat};
use crate::eland::lane::{ElandLane, ResultKind, ResultLane, SequenceLane};
use crate::parsing::genome_map::GenomeMap;
use crate::parsing::ParseError;
use crate::utils::fs::{list_dirs, list_files};

/// One discovered result file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchedFile {
    pub path: PathBuf,
    pub format: ElandFormat,
    pub part: Option<u32>,
}

impl MatchedFile {
    /// Final path component
    #[must_use]
    pub fn filename(&self) -> &str {
        crate::utils::fs::file_name(&self.path)
    }
}

/// Result files grouped by sample key
#[derive(Debug, Clone, Default)]
pub struct ElandMatches {
    matches: BTreeMap<SampleKey, Vec<MatchedFile>>,
}

impl ElandMatches {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &SampleKey) -> Option<&[MatchedFile]> {
        self.matches.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SampleKey> {
        self.matches.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, SampleKey, Vec<MatchedFile>> {
        self.matches.iter()
    }

    /// Record a file if its name is a known result grammar.
    ///
    /// A preferred format replaces the files held for its key, the same
    /// format adds another part, and a less preferred one is ignored.
    /// Returns whether the file was kept.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        let Some(found) = detect_path_format(&path) else {
            return false;
        };
        let file = MatchedFile {
            path,
            format: found.format,
            part: found.part,
        };

        let files = self.matches.entry(found.key).or_default();
        match files.first().map(|f| f.format.priority()) {
            Some(held) if found.format.priority() > held => return false,
            Some(held) if found.format.priority() < held => files.clear(),
            _ => {}
        }
        files.push(file);
        files.sort();
        true
    }

    /// Collect every result file directly inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if `dir` exists but cannot be listed.
    pub fn scan_dir(dir: &Path) -> io::Result<Self> {
        let mut matches = Self::new();
        for path in list_files(dir, |_| true)? {
            if matches.add(path.clone()) {
                debug!(path = %path.display(), "Found alignment result");
            }
        }
        Ok(matches)
    }

    /// Replace keys with those found in a later base directory
    pub fn overlay(&mut self, later: ElandMatches) {
        self.matches.extend(later.matches);
    }

    /// Scan a GERALD/Aligned directory and its override locations.
    ///
    /// # Errors
    ///
    /// Returns an IO error if a base directory cannot be listed.
    pub fn search(gerald_dir: &Path) -> io::Result<Self> {
        let mut matches = Self::new();
        for basedir in result_basedirs(gerald_dir)? {
            matches.overlay(Self::scan_dir(&basedir)?);
        }
        Ok(matches)
    }
}

/// Directories that may hold result files, in scan order
fn result_basedirs(gerald_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = vec![gerald_dir.to_path_buf()];
    let temp = gerald_dir.join("Temp");
    if temp.is_dir() {
        dirs.push(temp);
    }
    for project in list_dirs(gerald_dir, |n| n.starts_with("Project_"))? {
        dirs.extend(list_dirs(&project, |n| n.starts_with("Sample_"))?);
    }
    Ok(dirs)
}

/// Build the result collection for a GERALD/Aligned directory.
///
/// `genome_maps` supplies the chromosome map per lane; lanes without one
/// count reads under their raw chromosome names. Files are not read until a
/// count is requested.
///
/// # Errors
///
/// Returns `ParseError::Io` if a base directory cannot be listed.
pub fn eland(
    gerald_dir: &Path,
    genome_maps: &BTreeMap<u32, GenomeMap>,
) -> Result<ElandCollection, ParseError> {
    let matches = ElandMatches::search(gerald_dir)?;
    let mut collection = ElandCollection::new();
    for (key, files) in matches.iter() {
        let Some(first) = files.first() else { continue };
        let lane_id = key.lane.unwrap_or_default();
        let kind = if first.format.is_aligned() {
            let genome_map = genome_maps.get(&lane_id).cloned().unwrap_or_default();
            ResultKind::Eland(ElandLane::new(genome_map))
        } else {
            ResultKind::Sequence(SequenceLane::default())
        };
        info!(key = %key, files = files.len(), format = %first.format, "Adding alignment results");
        let lane = ResultLane {
            pathnames: files.iter().map(|f| f.path.clone()).collect(),
            ..ResultLane::new(
                key.sample.as_deref().unwrap_or_default(),
                lane_id,
                key.read.unwrap_or(1),
                kind,
            )
        };
        collection.insert(key.clone(), lane);
    }
    Ok(collection)
}

/// Copy read ids with the `start..end` slice of their sequence.
///
/// Lines with a single field are treated as bare sequence. Slice bounds past
/// the end of a sequence are clamped.
///
/// # Errors
///
/// Returns any IO error from reading or writing.
pub fn extract_eland_sequence<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    start: usize,
    end: usize,
) -> io::Result<()> {
    fn slice(text: &str, start: usize, end: usize) -> &str {
        let end = end.min(text.len());
        text.get(start.min(end)..end).unwrap_or("")
    }

    for line in reader.lines() {
        let line = line?;
        let record: Vec<&str> = line.split_whitespace().collect();
        match record.as_slice() {
            [] => writeln!(writer)?,
            [sequence] => writeln!(writer, "{}", slice(sequence, start, end))?,
            [id, sequence, ..] => writeln!(writer, "{id}\t{}", slice(sequence, start, end))?,
        }
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    #[test]
    fn test_eland_replacing() {
        let key = SampleKey::new(Some(1), Some(1), Some("s"));
        let mut em = ElandMatches::new();
        assert!(em.add("s_1_sequence.txt"));
        assert_eq!(em.len(), 1);
        assert_eq!(em.get(&key).unwrap()[0].filename(), "s_1_sequence.txt");

        assert!(em.add("s_1_eland_result.txt"));
        assert_eq!(em.len(), 1);
        let files = em.get(&key).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename(), "s_1_eland_result.txt");

        assert!(!em.add("s_1_export.txt"));
        assert!(!em.add("Summary.htm"));
        assert_eq!(em.keys().collect::<Vec<_>>(), vec![&key]);
    }

    #[test]
    fn test_parts() {
        let mut em = ElandMatches::new();
        for name in [
            "11111_CCAATT_L001_R1_001_export.txt.gz",
            "11111_CCAATT_L001_R1_002_export.txt.gz",
            "11111_CCAATT_L001_R1_003_export.txt.gz",
            "11112_AAGGTT_L001_R1_001_export.txt.gz",
            "11112_AAGGTT_L001_R1_002_export.txt.gz",
        ] {
            em.add(name);
        }
        assert_eq!(em.len(), 2);
        let key11111 = SampleKey::new(Some(1), Some(1), Some("11111"));
        let key11112 = SampleKey::new(Some(1), Some(1), Some("11112"));
        assert_eq!(em.get(&key11111).unwrap().len(), 3);
        assert_eq!(em.get(&key11112).unwrap().len(), 2);
    }

    #[test]
    fn test_later_basedir_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let gerald = tmp.path();
        fs::write(gerald.join("s_1_eland_result.txt"), "x\n").unwrap();
        fs::write(gerald.join("s_2_eland_result.txt"), "x\n").unwrap();
        fs::create_dir(gerald.join("Temp")).unwrap();
        // less preferred format, but the later directory still wins
        fs::write(gerald.join("Temp").join("s_1_sequence.txt"), "x\n").unwrap();

        let em = ElandMatches::search(gerald).unwrap();
        assert_eq!(em.len(), 2);
        let lane1 = em.get(&SampleKey::new(Some(1), Some(1), Some("s"))).unwrap();
        assert_eq!(lane1[0].format, ElandFormat::Sequence);
        assert!(lane1[0].path.starts_with(gerald.join("Temp")));
        let lane2 = em.get(&SampleKey::new(Some(2), Some(1), Some("s"))).unwrap();
        assert_eq!(lane2[0].format, ElandFormat::Result);
    }

    #[test]
    fn test_project_sample_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let sample_dir = tmp.path().join("Project_11111").join("Sample_11111");
        fs::create_dir_all(&sample_dir).unwrap();
        fs::write(sample_dir.join("11111_NoIndex_L003_R1_001_export.txt"), "x\n").unwrap();

        let collection = eland(tmp.path(), &BTreeMap::new()).unwrap();
        let key = SampleKey::new(Some(3), Some(1), Some("11111"));
        let lane = collection.get(&key).unwrap();
        assert!(lane.is_aligned());
        assert_eq!(lane.sample_name, "11111");
        assert_eq!(lane.lane_id, 3);
        assert_eq!(lane.pathnames.len(), 1);
    }

    #[test]
    fn test_eland_uses_lane_genome_map() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("s_1_eland_result.txt"),
            ">r1\tACGT\tU0\t1\t0\t0\tchr1.fa\t100\tF\t..\n>r2\tACGT\tNM\t0\t0\t0\n",
        )
        .unwrap();
        fs::write(tmp.path().join("s_2_sequence.txt"), "@r1\nACGT\n+\nIIII\n").unwrap();

        let mut genome = GenomeMap::new();
        genome.insert("chr1.fa", "mm9/chr1.fa");
        let maps: BTreeMap<u32, GenomeMap> = [(1, genome)].into_iter().collect();

        let collection = eland(tmp.path(), &maps).unwrap();
        let lane1 = collection.get(&SampleKey::new(Some(1), Some(1), Some("s"))).unwrap();
        let counts = lane1.eland_counts().unwrap().unwrap();
        assert_eq!(counts.reads, 2);
        assert_eq!(counts.mapped_reads.get("mm9/chr1.fa"), Some(1));

        let lane2 = collection.get(&SampleKey::new(Some(2), Some(1), Some("s"))).unwrap();
        assert!(!lane2.is_aligned());
        assert_eq!(lane2.reads().unwrap(), 1);
    }

    #[test]
    fn test_extract_eland_sequence() {
        let input = ">HWI-EAS229_24_207BTAAXX:1:7:599:759\tACATAGNCACAGACATAAACATAGACATAGAC\tU0\nACGTACGT\n";
        let mut out = Vec::new();
        extract_eland_sequence(Cursor::new(input), &mut out, 2, 6).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            ">HWI-EAS229_24_207BTAAXX:1:7:599:759\tATAG\nGTAC\n"
        );

        let mut out = Vec::new();
        extract_eland_sequence(Cursor::new("r1 ACG\n"), &mut out, 1, 10).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "r1\tCG\n");
    }
}
