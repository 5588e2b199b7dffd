//! Show command - print the contents of a saved run snapshot.

use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::parsing::gerald::Alignment;
use crate::run::PipelineRun;

#[derive(Args)]
pub struct ShowArgs {
    /// run_<flowcell>_<date>.xml snapshot
    #[arg(required = true)]
    pub snapshot: PathBuf,
}

/// Execute the show command
///
/// # Errors
///
/// Returns an error if the snapshot cannot be read.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ShowArgs, format: OutputFormat, _verbose: bool) -> anyhow::Result<()> {
    let run = PipelineRun::load(&args.snapshot)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {e}", args.snapshot.display()))?;

    match format {
        OutputFormat::Text => print_text_run(&run),
        OutputFormat::Json => print_json_run(&run)?,
        OutputFormat::Tsv => print_tsv_run(&run),
    }
    Ok(())
}

fn print_text_run(run: &PipelineRun) {
    println!("{}", run.name());
    println!("Flowcell: {}", run.flowcell_id);
    if let Some(name) = run.runfolder_name() {
        println!("Runfolder: {name}");
    }

    if let Some(image) = &run.image_analysis {
        println!();
        println!("Image analysis: {}", image.software().unwrap_or("unknown"));
        if let Some(version) = image.version() {
            println!("  Version: {version}");
        }
        if let (Some(start), Some(stop)) = (image.start(), image.stop()) {
            println!("  Cycles:  {start}-{stop}");
        }
        if let Some(date) = image.date() {
            println!("  Date:    {date}");
        }
    }

    if let Some(bustard) = &run.bustard {
        println!();
        println!("Base calling: {}", bustard.software().unwrap_or("unknown"));
        if let Some(version) = bustard.version() {
            println!("  Version: {version}");
        }
        for (lane, phasing) in &bustard.phasing {
            println!(
                "  Lane {lane}: phasing {} prephasing {}",
                phasing.phasing, phasing.prephasing
            );
        }
    }

    if let Some(gerald) = &run.gerald {
        println!();
        print_text_alignment(gerald);
    }
}

fn print_text_alignment(gerald: &Alignment) {
    println!("Alignment: {}", gerald.software().unwrap_or_else(|| gerald.kind.to_string()));
    if let Some(version) = gerald.version() {
        println!("  Version: {version}");
    }
    if let Some(date) = gerald.date {
        println!("  Date:    {date}");
    }
    for (lane, params) in &gerald.lanes {
        println!(
            "  Lane {lane}: analysis {} genome {} read length {}",
            params.analysis.as_deref().unwrap_or("-"),
            params.eland_genome.as_deref().unwrap_or("-"),
            params.read_length.as_deref().unwrap_or("-"),
        );
    }

    if let Some(summary) = &gerald.summary {
        for lane in summary.iter() {
            println!("  Summary read {} lane {}:", lane.end + 1, lane.lane);
            for (tag, value) in lane.values() {
                if let Some(value) = value {
                    println!("    {tag}: {value}");
                }
            }
        }
    }
}

fn print_json_run(run: &PipelineRun) -> anyhow::Result<()> {
    let image = run.image_analysis.as_ref().map(|i| {
        serde_json::json!({
            "software": i.software(),
            "version": i.version(),
            "start": i.start(),
            "stop": i.stop(),
            "date": i.date().map(|d| d.to_string()),
        })
    });
    let bustard = run.bustard.as_ref().map(|b| {
        serde_json::json!({
            "software": b.software(),
            "version": b.version(),
            "date": b.date.map(|d| d.to_string()),
            "phasing": b.phasing.iter().map(|(lane, p)| serde_json::json!({
                "lane": lane,
                "phasing": p.phasing,
                "prephasing": p.prephasing,
            })).collect::<Vec<_>>(),
        })
    });
    let gerald = run.gerald.as_ref().map(|g| {
        serde_json::json!({
            "software": g.software(),
            "version": g.version(),
            "date": g.date.map(|d| d.to_string()),
            "lanes": g.lanes.iter().map(|(lane, p)| serde_json::json!({
                "lane": lane,
                "analysis": p.analysis,
                "eland_genome": p.eland_genome,
                "read_length": p.read_length,
                "use_bases": p.use_bases,
            })).collect::<Vec<_>>(),
            "summary": g.summary.as_ref().map(|s| s.iter().map(|l| {
                let values: serde_json::Map<String, serde_json::Value> = l
                    .values()
                    .into_iter()
                    .filter_map(|(tag, v)| Some((tag.to_string(), serde_json::to_value(v?).ok()?)))
                    .collect();
                serde_json::json!({
                    "lane": l.lane,
                    "read": l.end + 1,
                    "lane_yield": l.lane_yield,
                    "values": values,
                })
            }).collect::<Vec<_>>()),
        })
    });

    let output = serde_json::json!({
        "name": run.name(),
        "flowcell_id": run.flowcell_id,
        "runfolder_name": run.runfolder_name(),
        "image_analysis": image,
        "base_calling": bustard,
        "alignment": gerald,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// One row per summary lane
fn print_tsv_run(run: &PipelineRun) {
    println!("run\tread\tlane\tstatistic\tmean\tdeviation");
    let Some(summary) = run.gerald.as_ref().and_then(|g| g.summary.as_ref()) else {
        return;
    };
    let name = run.name();
    for lane in summary.iter() {
        for (tag, value) in lane.values() {
            let Some(value) = value else { continue };
            println!(
                "{name}\t{}\t{}\t{tag}\t{}\t{}",
                lane.end + 1,
                lane.lane,
                value.mean(),
                value.deviation().map_or_else(String::new, |d| d.to_string()),
            );
        }
    }
}
