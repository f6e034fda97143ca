mod cli;

use cli::Args;
use gammon_pipeline::pipeline::orchestrator::run_pipeline;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse_args();

    match run_pipeline(args.config(), &args.request()) {
        Ok(summary) => {
            tracing::info!(
                "Wrote {:?} ({} frames)",
                summary.video_path,
                summary.encoded_frames
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Pipeline failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
