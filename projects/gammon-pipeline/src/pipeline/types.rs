use std::fmt;
use std::path::{Path, PathBuf};

/// Default encoding rate of the visualization sequence.
pub const DEFAULT_FPS: u32 = 4;

/// Detector classes kept for the board: board, player-1 and player-2 checkers.
pub const DEFAULT_CLASSES: [u32; 3] = [0, 1, 2];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Detect,
    Parse,
    Visualize,
    Encode,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Detect, Stage::Parse, Stage::Visualize, Stage::Encode];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Detect => "detect",
            Stage::Parse => "parse",
            Stage::Visualize => "visualize",
            Stage::Encode => "encode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub stage: Stage,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl StageCommand {
    pub fn new(stage: Stage, program: &Path) -> Self {
        Self {
            stage,
            program: program.to_path_buf(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }
}

impl fmt::Display for StageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Tool locations and encoding settings for a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub inference_root: PathBuf,
    pub detector: PathBuf,
    pub parser: PathBuf,
    pub visualizer: PathBuf,
    pub ffmpeg: PathBuf,
    pub fps: u32,
    pub classes: Vec<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inference_root: PathBuf::from("inference"),
            detector: PathBuf::from("yolo"),
            parser: resolve_sibling_tool("parse-predictions"),
            visualizer: resolve_sibling_tool("visualize-state"),
            ffmpeg: PathBuf::from("ffmpeg"),
            fps: DEFAULT_FPS,
            classes: DEFAULT_CLASSES.to_vec(),
        }
    }
}

/// A binary shipped next to the running executable, or the bare name for a
/// `PATH` lookup when there is none.
pub fn resolve_sibling_tool(name: &str) -> PathBuf {
    let file_name = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&file_name)))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(name))
}

/// What the user asked for: the three driver arguments.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub model: String,
    pub source: PathBuf,
    pub run_name: String,
}

/// Where the detector put its artifacts for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionOutput {
    pub run_dir: PathBuf,
    pub labels_dir: PathBuf,
    pub frames_dir: PathBuf,
}
