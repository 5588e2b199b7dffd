//! Plain-text cluster and mapping summary for a set of runs.

use std::collections::BTreeMap;

use crate::core::counts::{MappedReads, MatchCode};
use crate::core::sample_key::SampleKey;
use crate::eland::{ResultKind, ResultLane};
use crate::parsing::genome_map::GenomeMap;
use crate::parsing::gerald::Alignment;
use crate::parsing::ParseError;
use crate::run::pipeline::PipelineRun;

/// Collapse per-chromosome counts into per-genome totals.
///
/// Names with a directory prefix (`hg18/chr1.fa`) are whole-genome hits and
/// are summed under that prefix; everything else, such as spike-in or
/// contamination references, is kept under its own name.
#[must_use]
pub fn summarize_mapped_reads(genome_map: &GenomeMap, mapped_reads: &MappedReads) -> BTreeMap<String, u64> {
    let mut summarized = BTreeMap::new();
    for (name, count) in mapped_reads.iter() {
        let (prefix, leaf) = name.rsplit_once('/').unwrap_or(("", name));
        let key = if !prefix.is_empty() && !genome_map.contains(prefix) {
            prefix
        } else {
            leaf
        };
        *summarized.entry(key.to_string()).or_insert(0) += count;
    }
    summarized
}

#[allow(clippy::cast_precision_loss)] // read counts are far below 2^52
fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Report lines for one result lane.
///
/// # Errors
///
/// Propagates counting errors, including `ParseError::NotReady`.
pub fn summarize_lane(gerald: &Alignment, key: &SampleKey, result: &ResultLane) -> Result<Vec<String>, ParseError> {
    let mut report = vec![
        format!("Sample name {}", result.sample_name),
        format!("Lane id {} end {}", result.lane_id, result.end),
    ];

    let end = (result.end as usize).saturating_sub(1);
    let summary_lane = gerald
        .summary
        .as_ref()
        .and_then(|s| s.lane(end, key.lane.unwrap_or(result.lane_id)));
    if let Some(cluster) = summary_lane.and_then(|l| l.cluster) {
        report.push(format!("Clusters {cluster}"));
    }
    if let Some(cluster_pf) = summary_lane.and_then(|l| l.cluster_pass_filter) {
        report.push(format!("Clusters PF {cluster_pf}"));
    }

    let reads = result.reads()?;
    report.push(format!("Total Reads: {reads}"));

    if let Some(counts) = result.eland_counts()? {
        let mc = &counts.match_codes;
        let nm = mc.get(MatchCode::NM);
        let qc = mc.get(MatchCode::QC);
        report.push(format!("No Match: {nm} ({:.2} %)", percent(nm, reads)));
        report.push(format!("QC Failed: {qc} ({:.2} %)", percent(qc, reads)));
        report.push(format!(
            "Unique (0,1,2 mismatches) {} {} {}",
            mc.get(MatchCode::U0),
            mc.get(MatchCode::U1),
            mc.get(MatchCode::U2)
        ));
        report.push(format!(
            "Repeat (0,1,2 mismatches) {} {} {}",
            mc.get(MatchCode::R0),
            mc.get(MatchCode::R1),
            mc.get(MatchCode::R2)
        ));

        if let ResultKind::Eland(lane) = &result.kind {
            report.push("Mapped Reads".to_string());
            for (name, count) in summarize_mapped_reads(&lane.genome_map, &counts.mapped_reads) {
                report.push(format!("  {name}: {count}"));
            }
        }
    }
    if let Some(sequence_type) = result.sequence_type()? {
        report.push(format!("Sequence type: {sequence_type}"));
    }
    report.push(String::new());
    Ok(report)
}

/// Cluster numbers and mapped read counts for every lane of every run.
///
/// # Errors
///
/// Propagates counting errors, including `ParseError::NotReady`.
pub fn summary_report(runs: &[PipelineRun]) -> Result<String, ParseError> {
    let mut report = Vec::new();
    for run in runs {
        report.push(format!("Summary for {}", run.name()));
        let Some(gerald) = &run.gerald else {
            report.push("No alignment results".to_string());
            report.push(String::new());
            continue;
        };
        for (key, result) in &gerald.eland_results {
            report.extend(summarize_lane(gerald, key, result)?);
            report.push("---".to_string());
            report.push(String::new());
        }
    }
    Ok(report.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::counts::MatchCodes;
    use crate::core::types::AlignmentSoftware;
    use crate::eland::{ElandCollection, ElandCounts, ElandLane};
    use crate::element::Element;

    #[test]
    fn test_summarize_mapped_reads() {
        let mapped: MappedReads = [
            ("hg18/chr1.fa".to_string(), 10),
            ("hg18/chr2.fa".to_string(), 5),
            ("Lambda.fa".to_string(), 3),
            ("phix/phi.fa".to_string(), 2),
        ]
        .into_iter()
        .collect();
        let mut genome_map = GenomeMap::new();
        genome_map.insert("phix", "phix");

        let summary = summarize_mapped_reads(&genome_map, &mapped);
        assert_eq!(summary.get("hg18"), Some(&15));
        assert_eq!(summary.get("Lambda.fa"), Some(&3));
        assert_eq!(summary.get("phi.fa"), Some(&2));
        assert_eq!(summary.len(), 3);
    }

    #[test]
    fn test_report_lines() {
        let match_codes = MatchCodes::new()
            .with_updated(MatchCode::NM, 2)
            .with_updated(MatchCode::U0, 6)
            .with_updated(MatchCode::R1, 2);
        let counts = ElandCounts {
            match_codes,
            mapped_reads: [("dm3/chr2L.fa".to_string(), 8)].into_iter().collect(),
            reads: 10,
        };
        let key = SampleKey::new(Some(3), Some(1), Some("s"));
        let mut results = ElandCollection::new();
        results.insert(
            key,
            ResultLane::new("s", 3, 1, ResultKind::Eland(ElandLane::with_counts(GenomeMap::new(), counts))),
        );

        let mut gerald = Alignment::new(AlignmentSoftware::Gerald, Element::new("RunParameters")).unwrap();
        gerald.eland_results = results;
        let run = PipelineRun {
            pathname: None,
            flowcell_id: "FC1".to_string(),
            image_analysis: None,
            bustard: None,
            gerald: Some(gerald),
        };

        let text = summary_report(&[run]).unwrap();
        assert!(text.starts_with("Summary for run_FC1_"));
        assert!(text.contains("Lane id 3 end 1"));
        assert!(text.contains("Total Reads: 10"));
        assert!(text.contains("No Match: 2 (20.00 %)"));
        assert!(text.contains("Unique (0,1,2 mismatches) 6 0 0"));
        assert!(text.contains("Repeat (0,1,2 mismatches) 0 2 0"));
        assert!(text.contains("  dm3: 8"));
    }
}
