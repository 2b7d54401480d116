use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use artimerge::config::{default_sources, load_sources, RunConfig};
use artimerge::extract::{run_all, ExtractConfig};
use artimerge::merge::{check_inputs, merge_sources, MergeOutcome};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Drive the artifact analyzers, then merge their CSVs into one timeline table"
)]
struct Args {
    /// Directory holding the analyzer executables
    #[arg(long, default_value = "tools")]
    tools_dir: PathBuf,

    /// Event log file to parse
    #[arg(long, default_value = "input.evtx")]
    evtx: PathBuf,

    /// MFT dump to parse
    #[arg(long, default_value = "input_mft.bin")]
    mft: PathBuf,

    /// Registry hive to parse
    #[arg(long, default_value = "NTUSER.DAT")]
    registry: PathBuf,

    /// Batch definition for the registry analyzer
    #[arg(long, default_value = "Kroll_Batch.reb")]
    batch: PathBuf,

    /// Directory the analyzers write their CSVs to
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Merge whatever CSVs are already in the output directory, without
    /// invoking the analyzers
    #[arg(long)]
    skip_extract: bool,

    /// JSON file overriding the source list
    /// (array of {csv_path, source, artifact_type})
    #[arg(long)]
    sources: Option<PathBuf>,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();
    info!("starting artifact processing");

    if !args.skip_extract {
        let extract = ExtractConfig {
            tools_dir: args.tools_dir.clone(),
            evtx_file: args.evtx.clone(),
            mft_file: args.mft.clone(),
            registry_file: args.registry.clone(),
            batch_file: args.batch.clone(),
            output_dir: args.output_dir.clone(),
        };
        run_all(&extract)?;
    }

    let sources = match &args.sources {
        Some(path) => load_sources(path)?,
        None => default_sources(&args.output_dir),
    };

    let paths: Vec<_> = sources.iter().map(|s| s.csv_path.clone()).collect();
    check_inputs(&paths);

    info!("merging results");
    let config = RunConfig {
        sources,
        output_path: args.output_dir.join("combined_results.csv"),
    };

    match merge_sources(&config)? {
        MergeOutcome::Written { rows, columns } => {
            info!(rows, columns, path = %config.output_path.display(), "processing completed");
        }
        MergeOutcome::NoValidData => {
            info!("processing completed with no valid data to merge");
        }
    }

    Ok(())
}
