//! Lane-level QC summaries ("Lane Results Summary").
//!
//! Three generations of GA report plus the HiSeq per-read files:
//!
//! | Source | Shape |
//! |--------|-------|
//! | `Summary.htm` < 0.3 | 8 columns: lane then 7 mean/range cells |
//! | `Summary.htm` >= 0.3 | 10 columns: lane, yield, 8 mean/range cells; optional `: Read 1`/`: Read 2` tables |
//! | `Summary.xml` | `LaneResultsSummary/Read/Lane` with `<tag><mean/><stdev/></tag>` |
//! | `reports/Summary/read<N>.xml` | one element per lane, values in attributes |

use std::collections::BTreeMap;
use std::fs;
use std::ops::Index;
use std::path::Path;

use tracing::{info, warn};

use crate::core::mean_range::{format_number, parse_mean_range, to_number, MeanRange, SummaryValue};
use crate::element::Element;
use crate::parsing::html::{extract_named_tables, NamedTables};
use crate::parsing::{parse_field, ParseError};
use crate::utils::validation::XML_DECLARATION_RE;

/// HTML tables holding lane results, with the read end each one describes
const HTML_TABLES: [(&str, usize); 3] = [
    ("Lane Results Summary", 0),
    ("Lane Results Summary : Read 1", 0),
    ("Lane Results Summary : Read 2", 1),
];

/// `Summary.xml` tag -> snapshot tag
const GERALD_TAGS: [(&str, &str); 8] = [
    ("clusterCountRaw", "Cluster"),
    ("clusterCountPF", "ClusterPF"),
    ("oneSig", "AverageFirstCycleIntensity"),
    ("signal20AsPctOf1", "PercentIntensityAfter20Cycles"),
    ("percentClustersPF", "PercentPassFilterClusters"),
    ("percentUniquelyAlignedPF", "PercentPassFilterAlign"),
    ("averageAlignScorePF", "AverageAlignmentScore"),
    ("errorPF", "PercentErrorRate"),
];

/// HiSeq `read<N>.xml` attribute -> snapshot tag; the deviation is `<attr>SD`
const HISEQ_ATTRIBUTES: [(&str, &str); 7] = [
    ("ClustersRaw", "Cluster"),
    ("ClustersPF", "ClusterPF"),
    ("FirstCycleIntPF", "AverageFirstCycleIntensity"),
    ("PrcIntensityAfter20CyclesPF", "PercentIntensityAfter20Cycles"),
    ("PrcPFClusters", "PercentPassFilterClusters"),
    ("PrcAlign", "PercentPassFilterAlign"),
    ("ErrRatePhiX", "PercentErrorRate"),
];

/// One row of the lane results table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LaneResultSummary {
    pub lane: u32,
    /// 0 for read 1, 1 for read 2
    pub end: usize,
    pub lane_yield: Option<u64>,
    pub cluster: Option<SummaryValue>,
    pub cluster_pass_filter: Option<SummaryValue>,
    pub average_first_cycle_intensity: Option<SummaryValue>,
    pub percent_intensity_after_20_cycles: Option<SummaryValue>,
    pub percent_pass_filter_clusters: Option<SummaryValue>,
    pub percent_pass_filter_align: Option<SummaryValue>,
    pub average_alignment_score: Option<SummaryValue>,
    pub percent_error_rate: Option<SummaryValue>,
}

impl LaneResultSummary {
    pub const XML_TAG: &'static str = "LaneResultSummary";

    /// Statistic fields with their snapshot tags
    #[must_use]
    pub fn values(&self) -> [(&'static str, Option<SummaryValue>); 8] {
        [
            ("Cluster", self.cluster),
            ("ClusterPF", self.cluster_pass_filter),
            ("AverageFirstCycleIntensity", self.average_first_cycle_intensity),
            ("PercentIntensityAfter20Cycles", self.percent_intensity_after_20_cycles),
            ("PercentPassFilterClusters", self.percent_pass_filter_clusters),
            ("PercentPassFilterAlign", self.percent_pass_filter_align),
            ("AverageAlignmentScore", self.average_alignment_score),
            ("PercentErrorRate", self.percent_error_rate),
        ]
    }

    fn slot(&mut self, tag: &str) -> Option<&mut Option<SummaryValue>> {
        Some(match tag {
            "Cluster" => &mut self.cluster,
            "ClusterPF" => &mut self.cluster_pass_filter,
            "AverageFirstCycleIntensity" => &mut self.average_first_cycle_intensity,
            "PercentIntensityAfter20Cycles" => &mut self.percent_intensity_after_20_cycles,
            "PercentPassFilterClusters" => &mut self.percent_pass_filter_clusters,
            "PercentPassFilterAlign" => &mut self.percent_pass_filter_align,
            "AverageAlignmentScore" => &mut self.average_alignment_score,
            "PercentErrorRate" => &mut self.percent_error_rate,
            _ => return None,
        })
    }

    /// Parse one flattened `Summary.htm` row.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::FormatChanged` unless the row has 8 or 10 cells
    /// and every statistic cell parses.
    pub fn from_html_row(row: &[String], end: usize) -> Result<Self, ParseError> {
        if !matches!(row.len(), 8 | 10) {
            return Err(ParseError::FormatChanged(format!(
                "Summary.htm file format changed, len(data)={}",
                row.len()
            )));
        }

        let mut lrs = Self {
            lane: parse_field("lane", &row[0])?,
            end,
            ..Self::default()
        };
        let parse = |cell: &String| parse_mean_range(cell).map(Some);

        if row.len() == 8 {
            lrs.cluster = parse(&row[1])?;
            lrs.average_first_cycle_intensity = parse(&row[2])?;
            lrs.percent_intensity_after_20_cycles = parse(&row[3])?;
            lrs.percent_pass_filter_clusters = parse(&row[4])?;
            lrs.percent_pass_filter_align = parse(&row[5])?;
            lrs.average_alignment_score = parse(&row[6])?;
            lrs.percent_error_rate = parse(&row[7])?;
        } else {
            lrs.lane_yield = row[1].trim().parse().ok();
            lrs.cluster = parse(&row[2])?;
            lrs.cluster_pass_filter = parse(&row[3])?;
            lrs.average_first_cycle_intensity = parse(&row[4])?;
            lrs.percent_intensity_after_20_cycles = parse(&row[5])?;
            lrs.percent_pass_filter_clusters = parse(&row[6])?;
            lrs.percent_pass_filter_align = parse(&row[7])?;
            lrs.average_alignment_score = parse(&row[8])?;
            lrs.percent_error_rate = parse(&row[9])?;
        }
        Ok(lrs)
    }

    /// Parse a `<Lane>` element of a GERALD/CASAVA `Summary.xml`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::FormatChanged` if a statistic lacks its
    /// `mean`/`stdev` children.
    pub fn from_gerald_xml(end: usize, element: &Element) -> Result<Self, ParseError> {
        let lane = element
            .find_text("laneNumber")
            .ok_or_else(|| ParseError::InvalidFormat("Lane without laneNumber".into()))?;
        let mut lrs = Self {
            lane: parse_field("laneNumber", lane)?,
            end,
            lane_yield: element
                .find_text("laneYield")
                .map(|y| parse_field("laneYield", y))
                .transpose()?,
            ..Self::default()
        };

        for (gerald_tag, tag) in GERALD_TAGS {
            let value = match element.child(gerald_tag) {
                Some(node) => Some(parse_xml_mean_range(node)?),
                None => {
                    info!(tag = gerald_tag, "Couldn't find summary statistic");
                    None
                }
            };
            if let Some(slot) = lrs.slot(tag) {
                *slot = value;
            }
        }
        Ok(lrs)
    }

    /// Parse one lane element of a HiSeq `read<N>.xml`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidFormat` if the `key` attribute or any
    /// value/deviation attribute is missing or not numeric.
    pub fn from_hiseq_xml(end: usize, element: &Element) -> Result<Self, ParseError> {
        let attr = |name: &str| -> Result<f64, ParseError> {
            let text = element
                .attr(name)
                .ok_or_else(|| ParseError::InvalidFormat(format!("Missing {name} attribute")))?;
            to_number(text)
                .ok_or_else(|| ParseError::InvalidFormat(format!("{name}: cannot parse {text:?}")))
        };

        let key = element
            .attr("key")
            .ok_or_else(|| ParseError::InvalidFormat("Lane without key".into()))?;
        let mut lrs = Self {
            lane: parse_field("key", key)?,
            end,
            ..Self::default()
        };
        for (name, tag) in HISEQ_ATTRIBUTES {
            let value = MeanRange::new(attr(name)?, attr(&format!("{name}SD"))?);
            if let Some(slot) = lrs.slot(tag) {
                *slot = Some(value.into());
            }
        }
        Ok(lrs)
    }

    #[must_use]
    pub fn to_xml(&self) -> Element {
        let mut root = Element::new(Self::XML_TAG)
            .with_attr("lane", self.lane)
            .with_attr("end", self.end);
        if let Some(lane_yield) = self.lane_yield {
            root.push(Element::text_element("LaneYield", lane_yield));
        }
        for (tag, value) in self.values() {
            match value {
                Some(SummaryValue::Range(r)) => root.push(
                    Element::new(tag)
                        .with_attr("mean", format_number(r.mean))
                        .with_attr("deviation", format_number(r.deviation)),
                ),
                Some(SummaryValue::Single(v)) => {
                    root.push(Element::text_element(tag, format_number(v)));
                }
                None => {}
            }
        }
        root
    }

    /// Rebuild from a snapshot element.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Xml` for a different tag and
    /// `ParseError::InvalidFormat` for a bad `lane` attribute.
    pub fn from_xml(tree: &Element) -> Result<Self, ParseError> {
        tree.expect_tag(Self::XML_TAG)?;
        let lane = tree
            .attr("lane")
            .ok_or_else(|| ParseError::InvalidFormat("LaneResultSummary without lane".into()))?;
        let mut lrs = Self {
            lane: parse_field("lane", lane)?,
            end: tree.attr("end").map_or(Ok(0), |e| parse_field("end", e))?,
            ..Self::default()
        };

        for element in &tree.children {
            if element.name == "LaneYield" {
                lrs.lane_yield = element.text().trim().parse().ok();
                continue;
            }
            let value = parse_summary_element(element);
            match lrs.slot(&element.name) {
                Some(slot) => *slot = value,
                None => warn!(tag = %element.name, "Unrecognized summary tag, skipping"),
            }
        }
        Ok(lrs)
    }
}

/// `mean`/`deviation` attributes give a range, plain text a single value
fn parse_summary_element(element: &Element) -> Option<SummaryValue> {
    match (element.attr("mean"), element.attr("deviation")) {
        (Some(mean), Some(deviation)) => Some(
            MeanRange::new(
                to_number(mean).unwrap_or(f64::NAN),
                to_number(deviation).unwrap_or(f64::NAN),
            )
            .into(),
        ),
        _ => to_number(element.text()).map(SummaryValue::Single),
    }
}

/// Read `<mean>`/`<stdev>` children; empty text means NaN.
///
/// # Errors
///
/// Returns `ParseError::FormatChanged` if either child is missing or holds
/// something other than a number.
pub fn parse_xml_mean_range(element: &Element) -> Result<SummaryValue, ParseError> {
    let (Some(mean), Some(stdev)) = (element.child("mean"), element.child("stdev")) else {
        return Err(ParseError::FormatChanged(
            "Summary.xml file format changed, expected mean/stdev tags".into(),
        ));
    };
    let value = |node: &Element| -> Result<f64, ParseError> {
        match node.text.as_deref() {
            None => Ok(f64::NAN),
            Some(text) => to_number(text).ok_or_else(|| {
                ParseError::FormatChanged(format!("Summary.xml value {text:?} is not a number"))
            }),
        }
    };
    Ok(MeanRange::new(value(mean)?, value(stdev)?).into())
}

/// Which grammar a summary file is written in
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryFormat {
    /// `Summary.xml` with a `<Summary>` root
    GeraldXml(Element),
    /// `Summary.htm`, either HTML or XHTML
    Html,
}

/// Decide how to read a summary document: an XML declaration followed by a
/// `<Summary>` root is GERALD XML, anything else goes through the HTML
/// table extractor.
#[must_use]
pub fn detect_summary_format(text: &str) -> SummaryFormat {
    let first_line = text.lines().next().unwrap_or("");
    if XML_DECLARATION_RE.is_match(first_line) {
        match Element::parse_str(text) {
            Ok(root) if root.is("summary") => return SummaryFormat::GeraldXml(root),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Summary declares XML but is not well-formed"),
        }
    }
    SummaryFormat::Html
}

/// Lane results for one or two read ends
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    lane_results: Vec<BTreeMap<u32, LaneResultSummary>>,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            lane_results: vec![BTreeMap::new()],
        }
    }
}

impl Index<usize> for Summary {
    type Output = BTreeMap<u32, LaneResultSummary>;

    fn index(&self, end: usize) -> &Self::Output {
        &self.lane_results[end]
    }
}

impl Summary {
    pub const XML_TAG: &'static str = "Summary";
    pub const XML_VERSION: u32 = 3;

    /// Number of read ends (1 or 2)
    #[must_use]
    pub fn len(&self) -> usize {
        self.lane_results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lane_results.iter().all(BTreeMap::is_empty)
    }

    #[must_use]
    pub fn is_paired_end(&self) -> bool {
        self.lane_results.len() == 2
    }

    #[must_use]
    pub fn end(&self, end: usize) -> Option<&BTreeMap<u32, LaneResultSummary>> {
        self.lane_results.get(end)
    }

    #[must_use]
    pub fn lane(&self, end: usize, lane: u32) -> Option<&LaneResultSummary> {
        self.lane_results.get(end)?.get(&lane)
    }

    /// Every row, ordered by end then lane
    pub fn iter(&self) -> impl Iterator<Item = &LaneResultSummary> {
        self.lane_results.iter().flat_map(BTreeMap::values)
    }

    fn insert(&mut self, lrs: LaneResultSummary) {
        while self.lane_results.len() <= lrs.end {
            self.lane_results.push(BTreeMap::new());
        }
        self.lane_results[lrs.end].insert(lrs.lane, lrs);
    }

    /// Read a GA `Summary.htm` or `Summary.xml`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be read and
    /// `ParseError::FormatChanged` for table shapes no known pipeline wrote.
    pub fn from_file(path: &Path) -> Result<Self, ParseError> {
        // Summary.htm is usually Latin-1; the tables themselves are ASCII
        let text = String::from_utf8_lossy(&fs::read(path)?).into_owned();
        let summary = Self::from_text(&text)?;
        if summary.lane_results[0].is_empty() {
            warn!(path = %path.display(), "No Lane Results Summary found");
        }
        Ok(summary)
    }

    /// Parse summary text after detecting its grammar.
    ///
    /// # Errors
    ///
    /// See [`Summary::from_file`].
    pub fn from_text(text: &str) -> Result<Self, ParseError> {
        match detect_summary_format(text) {
            SummaryFormat::GeraldXml(root) => Self::from_gerald_xml(&root),
            SummaryFormat::Html => Self::from_html_tables(&extract_named_tables(text)),
        }
    }

    /// Build from the named tables of a `Summary.htm`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::FormatChanged` if a lane table's rows have a
    /// length no known report generation used.
    pub fn from_html_tables(tables: &NamedTables) -> Result<Self, ParseError> {
        let mut summary = Self::default();
        for (name, end) in HTML_TABLES {
            let Some(rows) = tables.get(name) else {
                continue;
            };
            let data: &[Vec<String>] = match rows.last().map(Vec::len) {
                None => continue,
                Some(8) => &rows[1..],
                // the first two rows are headers; chip-wide averages follow lane 8
                Some(n) if n > 8 => &rows[2.min(rows.len())..10.min(rows.len())],
                Some(n) => {
                    return Err(ParseError::FormatChanged(format!(
                        "Summary.htm file format changed, table {name:?} has {n} columns"
                    )))
                }
            };
            while summary.lane_results.len() <= end {
                summary.lane_results.push(BTreeMap::new());
            }
            for row in data {
                summary.insert(LaneResultSummary::from_html_row(row, end)?);
            }
        }
        Ok(summary)
    }

    /// Build from a parsed `Summary.xml` root.
    ///
    /// # Errors
    ///
    /// See [`LaneResultSummary::from_gerald_xml`].
    pub fn from_gerald_xml(root: &Element) -> Result<Self, ParseError> {
        let mut summary = Self::default();
        for table in root.children.iter().filter(|c| c.is("LaneResultsSummary")) {
            for read in table.children_named("Read") {
                let number: usize = read
                    .find_text("readNumber")
                    .map_or(Ok(1), |n| parse_field("readNumber", n))?;
                let end = number.saturating_sub(1);
                for lane in read.children.iter().filter(|c| c.is("Lane")) {
                    summary.insert(LaneResultSummary::from_gerald_xml(end, lane)?);
                }
            }
        }
        Ok(summary)
    }

    /// Read a HiSeq `reports/Summary` directory (`read1.xml`, `read2.xml`).
    ///
    /// # Errors
    ///
    /// Propagates XML errors and malformed lane attributes.
    pub fn from_hiseq_dir(dir: &Path) -> Result<Self, ParseError> {
        let mut summary = Self::default();
        for (end, name) in ["read1.xml", "read2.xml"].iter().enumerate() {
            let path = dir.join(name);
            if !path.exists() {
                if end == 0 {
                    warn!(path = %path.display(), "No read1.xml");
                }
                continue;
            }
            let root = Element::parse_file(&path)?;
            while summary.lane_results.len() <= end {
                summary.lane_results.push(BTreeMap::new());
            }
            for lane in &root.children {
                summary.insert(LaneResultSummary::from_hiseq_xml(end, lane)?);
            }
        }
        Ok(summary)
    }

    #[must_use]
    pub fn to_xml(&self) -> Element {
        let mut root = Element::new(Self::XML_TAG).with_attr("version", Self::XML_VERSION);
        for lrs in self.iter() {
            root.push(lrs.to_xml());
        }
        root
    }

    /// Rebuild from a snapshot element.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Xml` for a different root tag.
    pub fn from_xml(tree: &Element) -> Result<Self, ParseError> {
        tree.expect_tag(Self::XML_TAG)?;
        tree.warn_if_newer(Self::XML_VERSION);
        let mut summary = Self::default();
        for element in &tree.children {
            if element.is(LaneResultSummary::XML_TAG) {
                summary.insert(LaneResultSummary::from_xml(element)?);
            } else {
                warn!(tag = %element.name, "Unrecognized Summary tag, skipping");
            }
        }
        Ok(summary)
    }
}
