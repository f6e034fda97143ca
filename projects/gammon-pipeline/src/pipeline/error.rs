use crate::pipeline::types::Stage;
use std::io;
use std::path::PathBuf;

/// Exit code for failures of the driver itself rather than of a stage.
pub const DRIVER_FAILURE_EXIT_CODE: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} stage exited with code {code}")]
    StageFailed { stage: Stage, code: i32 },
    #[error("failed to start {stage} stage ({program:?}): {source}")]
    Spawn {
        stage: Stage,
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no *_frames directory found in {run_dir:?}")]
    FramesDirNotFound { run_dir: PathBuf },
    #[error("several *_frames directories found in {run_dir:?}: {candidates:?}")]
    AmbiguousFramesDir {
        run_dir: PathBuf,
        candidates: Vec<PathBuf>,
    },
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl PipelineError {
    /// Process exit code for this failure: the failing stage's own code, or
    /// 1 for anything that went wrong in the driver.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::StageFailed { code, .. } => u8::try_from(*code)
                .ok()
                .filter(|c| *c != 0)
                .unwrap_or(DRIVER_FAILURE_EXIT_CODE),
            _ => DRIVER_FAILURE_EXIT_CODE,
        }
    }
}
