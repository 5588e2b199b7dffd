//! Report command - per-lane cluster and mapping summary.

use std::path::{Path, PathBuf};

use clap::Args;

use crate::cli::OutputFormat;
use crate::core::counts::MatchCode;
use crate::eland::ResultKind;
use crate::run::{get_runs, get_specific_run, summarize_mapped_reads, summary_report, PipelineRun};

#[derive(Args)]
pub struct ReportArgs {
    /// Runfolder, GERALD/Aligned directory, or run_*.xml snapshot
    #[arg(required = true)]
    pub input: PathBuf,

    /// Flowcell id to use instead of the one recorded in the runfolder
    #[arg(long)]
    pub flowcell_id: Option<String>,
}

fn load_runs(input: &Path, flowcell_id: Option<&str>) -> anyhow::Result<Vec<PipelineRun>> {
    if input.is_file() {
        return Ok(vec![PipelineRun::load(input)?]);
    }
    if input.join("config.xml").is_file() {
        return Ok(vec![get_specific_run(input, flowcell_id)?]);
    }
    Ok(get_runs(input, flowcell_id)?)
}

/// Execute the report command
///
/// # Errors
///
/// Returns an error if the input cannot be read or an alignment file is not
/// finished yet.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ReportArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let runs = load_runs(&args.input, args.flowcell_id.as_deref())?;
    if verbose {
        eprintln!("Reporting on {} runs", runs.len());
    }
    if runs.is_empty() {
        eprintln!("No runs found in {}", args.input.display());
        return Ok(());
    }

    match format {
        OutputFormat::Text => println!("{}", summary_report(&runs)?),
        OutputFormat::Json => print_json_report(&runs)?,
        OutputFormat::Tsv => print_tsv_report(&runs)?,
    }
    Ok(())
}

fn print_json_report(runs: &[PipelineRun]) -> anyhow::Result<()> {
    let mut output = Vec::new();
    for run in runs {
        let Some(gerald) = &run.gerald else { continue };
        for (key, lane) in &gerald.eland_results {
            let cluster = gerald
                .summary
                .as_ref()
                .and_then(|s| s.lane((lane.end as usize).saturating_sub(1), lane.lane_id))
                .and_then(|l| l.cluster);
            let mut entry = serde_json::json!({
                "run": run.name(),
                "key": key.to_string(),
                "sample": lane.sample_name,
                "lane": lane.lane_id,
                "read": lane.end,
                "reads": lane.reads()?,
                "clusters": cluster,
            });
            if let (Some(counts), ResultKind::Eland(eland)) = (lane.eland_counts()?, &lane.kind) {
                entry["match_codes"] = serde_json::to_value(counts.match_codes)?;
                entry["mapped_reads"] =
                    serde_json::to_value(summarize_mapped_reads(&eland.genome_map, &counts.mapped_reads))?;
            }
            if let Some(sequence_type) = lane.sequence_type()? {
                entry["sequence_type"] = serde_json::json!(sequence_type.to_string());
            }
            output.push(entry);
        }
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_report(runs: &[PipelineRun]) -> anyhow::Result<()> {
    println!("run\tlane\tread\tsample\treads\tNM\tQC\tU0\tU1\tU2\tR0\tR1\tR2");
    for run in runs {
        let Some(gerald) = &run.gerald else { continue };
        let name = run.name();
        for lane in gerald.eland_results.values() {
            let codes = match lane.eland_counts()? {
                Some(counts) => counts
                    .match_codes
                    .iter()
                    .filter(|(code, _)| *code != MatchCode::RM)
                    .map(|(_, n)| n.to_string())
                    .collect::<Vec<_>>()
                    .join("\t"),
                None => vec!["-"; 8].join("\t"),
            };
            println!(
                "{name}\t{}\t{}\t{}\t{}\t{codes}",
                lane.lane_id,
                lane.end,
                lane.sample_name,
                lane.reads()?
            );
        }
    }
    Ok(())
}
