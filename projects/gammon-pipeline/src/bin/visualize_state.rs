use anyhow::Result;
use clap::Parser;
use gammon_pipeline::board::visualize::visualize;
use std::path::PathBuf;

/// Render board state records, optionally next to their source frames.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// A state file, or a directory of them
    states: PathBuf,

    /// Output image, or directory when states is a directory
    output: PathBuf,

    /// Frame image, or directory of frames matched by name
    #[arg(long)]
    frames: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    visualize(&args.states, args.frames.as_deref(), &args.output)?;

    Ok(())
}
