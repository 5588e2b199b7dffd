use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod eland;
mod element;
mod parsing;
mod run;
mod utils;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("illumina_runfolder=debug,info")
    } else {
        EnvFilter::new("illumina_runfolder=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Scan(args) => {
            cli::scan::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Gerald(args) => {
            cli::gerald::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Show(args) => {
            cli::show::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Report(args) => {
            cli::report::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Cached(args) => {
            cli::cached::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::ExtractSequence(args) => {
            cli::extract::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
