//! Map ELAND chromosome file names to `genome/chromosome` names.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::element::Element;
use crate::parsing::{parse_field, ParseError};
use crate::utils::fs::{file_name, list_files};

/// Known `(contig, total bases) -> genome` signatures
const GENOME_SIGNATURES: &[(&str, u64, &str)] = &[
    ("chr1", 197_195_432, "mm9"),
    ("chr1", 247_249_719, "hg19"),
    ("chr1", 200_994_015, "galGal3"),
    ("chrI", 230_218, "sacCer3"),
    ("chrI", 15_072_421, "elegans190"),
    ("1", 60_348_388, "danRe6"),
    ("chr2L", 23_011_544, "dm3"),
];

/// An ELAND genome index file and whether it was reached through a symlink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VldInfo {
    pub path: PathBuf,
    pub is_link: bool,
}

/// Chromosome file name -> qualified name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenomeMap {
    contigs: BTreeMap<String, String>,
}

impl GenomeMap {
    pub const XML_TAG: &'static str = "GenomeMap";
    const ITEM_TAG: &'static str = "GenomeItem";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.contigs.get(name).map(String::as_str)
    }

    /// Qualified name for `name`, or `name` itself when unmapped
    #[must_use]
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.get(name).unwrap_or(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.contigs.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.contigs.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contigs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.contigs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Build a map from the `*.vld` files of an ELAND genome directory.
    ///
    /// A missing directory logs a warning and yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory exists but cannot be listed.
    pub fn scan_genome_dir(genome_dir: &Path) -> Result<Self, ParseError> {
        if !genome_dir.is_dir() {
            warn!(path = %genome_dir.display(), "Genome directory not found");
            return Ok(Self::new());
        }
        info!(path = %genome_dir.display(), "Building genome map");
        let vlds: Vec<VldInfo> = list_files(genome_dir, |n| n.ends_with(".vld"))?
            .into_iter()
            .map(|path| {
                let is_link = fs::symlink_metadata(&path)
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false);
                VldInfo { path, is_link }
            })
            .collect();
        Ok(Self::from_vld_list(file_name(genome_dir), &vlds))
    }

    /// Linked index files name shared contigs (`Lambda.fa -> Lambda.fa`);
    /// everything else is qualified with the genome name.
    #[must_use]
    pub fn from_vld_list(genome: &str, vlds: &[VldInfo]) -> Self {
        let mut map = Self::new();
        for vld in vlds {
            let target = fs::canonicalize(&vld.path).unwrap_or_else(|_| vld.path.clone());
            let vld_name = file_name(&target);
            let name = vld_name.strip_suffix(".vld").unwrap_or(vld_name);
            if vld.is_link {
                map.insert(name, name);
            } else {
                map.insert(name, format!("{genome}/{name}"));
            }
        }
        map
    }

    /// Read a HiSeq `genomesizes.xml`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Xml` if the file is unreadable and
    /// `ParseError::InvalidFormat` if the genome cannot be identified.
    pub fn from_genomesizes(path: &Path) -> Result<Self, ParseError> {
        Self::from_genomesizes_element(&Element::parse_file(path)?)
    }

    /// Build from a parsed `<sequenceSizes>` element.
    ///
    /// # Errors
    ///
    /// See [`GenomeMap::from_genomesizes`].
    pub fn from_genomesizes_element(root: &Element) -> Result<Self, ParseError> {
        let mut sizes = BTreeMap::new();
        let mut file_names = Vec::new();
        for element in &root.children {
            let attr = |name: &str| {
                element.attr(name).ok_or_else(|| {
                    ParseError::InvalidFormat(format!("{} missing {name}", element.name))
                })
            };
            let contig = attr("contigName")?;
            let bases: u64 = parse_field("totalBases", attr("totalBases")?)?;
            sizes.insert(contig.to_string(), bases);
            file_names.push(attr("fileName")?.to_string());
        }

        let genome = guess_genome(&sizes)?;
        let mut map = Self::new();
        for name in file_names {
            let qualified = format!("{genome}/{name}");
            map.insert(name, qualified);
        }
        Ok(map)
    }

    #[must_use]
    pub fn to_xml(&self) -> Element {
        let mut root = Element::new(Self::XML_TAG);
        for (name, value) in self.iter() {
            root.push(
                Element::new(Self::ITEM_TAG)
                    .with_attr("name", name)
                    .with_attr("value", value),
            );
        }
        root
    }

    #[must_use]
    pub fn from_xml(tree: &Element) -> Self {
        let mut map = Self::new();
        for item in &tree.children {
            match (item.attr("name"), item.attr("value")) {
                (Some(name), Some(value)) => map.insert(name, value),
                _ => warn!(tag = %item.name, "GenomeMap item without name/value"),
            }
        }
        map
    }
}

impl FromIterator<(String, String)> for GenomeMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            contigs: iter.into_iter().collect(),
        }
    }
}

/// Identify a genome from its contig sizes.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` when no signature matches and there
/// is more than one contig.
pub fn guess_genome(contig_sizes: &BTreeMap<String, u64>) -> Result<String, ParseError> {
    for (contig, size, genome) in GENOME_SIGNATURES {
        if contig_sizes.get(*contig) == Some(size) {
            return Ok((*genome).to_string());
        }
    }
    if let [name] = contig_sizes.keys().collect::<Vec<_>>()[..] {
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name);
        return Ok(stem.to_string());
    }
    Err(ParseError::InvalidFormat(
        "Unrecognized genome type, update detection code".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINI_GENOME_XML: &str = r#"<sequenceSizes>
        <chromosome fileName="chr2.fa" contigName="chr2" totalBases="181748087"/>
        <chromosome fileName="chr1.fa" contigName="chr1" totalBases="197195432"/>
</sequenceSizes>
"#;

    #[test]
    fn test_genomesizes_xml() {
        let root = Element::parse_str(MINI_GENOME_XML).unwrap();
        let map = GenomeMap::from_genomesizes_element(&root).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("chr1.fa"), Some("mm9/chr1.fa"));
        assert_eq!(map.get("chr2.fa"), Some("mm9/chr2.fa"));
    }

    #[test]
    fn test_genomesizes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("11111_NoIndex_L001_genomesize.xml");
        fs::write(&path, MINI_GENOME_XML).unwrap();
        let map = GenomeMap::from_genomesizes(&path).unwrap();
        assert!(map.contains("chr1.fa"));
    }

    #[test]
    fn test_guess_genome() {
        let sizes: BTreeMap<String, u64> =
            [("chrI".to_string(), 230_218)].into_iter().collect();
        assert_eq!(guess_genome(&sizes).unwrap(), "sacCer3");

        let single: BTreeMap<String, u64> = [("phiX.fa".to_string(), 5386)].into_iter().collect();
        assert_eq!(guess_genome(&single).unwrap(), "phiX");

        let unknown: BTreeMap<String, u64> =
            [("a".to_string(), 1), ("b".to_string(), 2)].into_iter().collect();
        assert!(matches!(
            guess_genome(&unknown),
            Err(ParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_vld_list() {
        let vlds = [
            ("chr1.fa.vld", false),
            ("chr2.fa.vld", false),
            ("chr3.fa.vld", false),
            ("Lambda.fa.vld", true),
        ]
        .map(|(path, is_link)| VldInfo {
            path: PathBuf::from(path),
            is_link,
        });
        let map = GenomeMap::from_vld_list("mm9", &vlds);
        assert_eq!(map.len(), 4);
        assert_eq!(map.get("chr1.fa"), Some("mm9/chr1.fa"));
        assert_eq!(map.get("Lambda.fa"), Some("Lambda.fa"));
        assert_eq!(map.resolve("chrM.fa"), "chrM.fa");
    }

    #[test]
    fn test_scan_genome_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let genome_dir = tmp.path().join("mm9");
        fs::create_dir(&genome_dir).unwrap();
        for name in ["chr1", "chr2", "chr3"] {
            fs::write(genome_dir.join(format!("{name}.fa.vld")), name).unwrap();
        }
        fs::write(genome_dir.join("README"), "").unwrap();

        let map = GenomeMap::scan_genome_dir(&genome_dir).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("chr1.fa"), Some("mm9/chr1.fa"));

        assert!(GenomeMap::scan_genome_dir(&tmp.path().join("missing"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_xml_round_trip() {
        let map: GenomeMap = [
            ("chr1.fa".to_string(), "mm9/chr1.fa".to_string()),
            ("Lambda.fa".to_string(), "Lambda.fa".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(GenomeMap::from_xml(&map.to_xml()), map);
    }
}
