//! Scan command - discover every run in a runfolder.

use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::run::{get_runs, PipelineRun};

#[derive(Args)]
pub struct ScanArgs {
    /// Runfolder directory
    #[arg(required = true)]
    pub runfolder: PathBuf,

    /// Flowcell id to use instead of the one recorded in the runfolder
    #[arg(long)]
    pub flowcell_id: Option<String>,

    /// Save a run_<flowcell>_<date>.xml snapshot for every run found
    #[arg(long)]
    pub save: bool,

    /// Directory for saved snapshots
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
}

/// Execute the scan command
///
/// # Errors
///
/// Returns an error if the runfolder cannot be listed or a snapshot cannot
/// be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ScanArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let runs = get_runs(&args.runfolder, args.flowcell_id.as_deref())?;
    if verbose {
        eprintln!("Found {} runs in {}", runs.len(), args.runfolder.display());
    }
    if runs.is_empty() {
        eprintln!("No runs found in {}", args.runfolder.display());
        return Ok(());
    }

    if args.save {
        std::fs::create_dir_all(&args.output_dir)?;
        for run in &runs {
            let path = run.save(&args.output_dir)?;
            if verbose {
                eprintln!("Saved {}", path.display());
            }
        }
    }

    print_runs(&runs, format)
}

/// Print one line/object/row per run
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print_runs(runs: &[PipelineRun], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print_text_runs(runs),
        OutputFormat::Json => print_json_runs(runs)?,
        OutputFormat::Tsv => print_tsv_runs(runs),
    }
    Ok(())
}

struct RunRow {
    name: String,
    flowcell_id: String,
    image: String,
    bustard: String,
    gerald: String,
    lanes: usize,
}

fn stage(software: Option<&str>, version: Option<&str>) -> String {
    match (software, version) {
        (Some(s), Some(v)) => format!("{s} {v}"),
        (Some(s), None) => s.to_string(),
        (None, Some(v)) => v.to_string(),
        (None, None) => "-".to_string(),
    }
}

fn run_row(run: &PipelineRun) -> RunRow {
    let image = run
        .image_analysis
        .as_ref()
        .map_or_else(|| stage(None, None), |i| stage(i.software(), i.version()));
    let bustard = run
        .bustard
        .as_ref()
        .map_or_else(|| stage(None, None), |b| stage(b.software(), b.version()));
    let gerald = run.gerald.as_ref().map_or_else(
        || stage(None, None),
        |g| stage(g.software().as_deref(), g.version().as_deref()),
    );
    RunRow {
        name: run.name(),
        flowcell_id: run.flowcell_id.clone(),
        image,
        bustard,
        gerald,
        lanes: run.gerald.as_ref().map_or(0, |g| g.eland_results.len()),
    }
}

fn print_text_runs(runs: &[PipelineRun]) {
    for run in runs {
        let row = run_row(run);
        println!("{}", row.name);
        println!("  Flowcell:       {}", row.flowcell_id);
        println!("  Image analysis: {}", row.image);
        println!("  Base calling:   {}", row.bustard);
        println!("  Alignment:      {}", row.gerald);
        println!("  Result lanes:   {}", row.lanes);
        if let Some(path) = &run.pathname {
            println!("  Runfolder:      {}", path.display());
        }
        println!();
    }
}

fn print_json_runs(runs: &[PipelineRun]) -> anyhow::Result<()> {
    let output: Vec<serde_json::Value> = runs
        .iter()
        .map(|run| {
            let row = run_row(run);
            serde_json::json!({
                "name": row.name,
                "flowcell_id": row.flowcell_id,
                "runfolder": run.pathname.as_ref().map(|p| p.display().to_string()),
                "runfolder_name": run.runfolder_name(),
                "image_analysis": row.image,
                "base_calling": row.bustard,
                "alignment": row.gerald,
                "result_lanes": row.lanes,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_runs(runs: &[PipelineRun]) {
    println!("name\tflowcell_id\timage_analysis\tbase_calling\talignment\tresult_lanes");
    for run in runs {
        let row = run_row(run);
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.name, row.flowcell_id, row.image, row.bustard, row.gerald, row.lanes
        );
    }
}
