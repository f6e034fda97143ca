use anyhow::Result;
use clap::Parser;
use gammon_pipeline::board::parse::parse_predictions;
use std::path::PathBuf;

/// Turn detector label files into per-frame board state records.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// A label file, or a directory of them
    predictions: PathBuf,

    /// Output state file, or directory when predictions is a directory
    output: PathBuf,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    parse_predictions(&args.predictions, &args.output)?;

    Ok(())
}
