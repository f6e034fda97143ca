use clap::Parser;
use gammon_pipeline::pipeline::types::{
    resolve_sibling_tool, PipelineConfig, RunRequest, DEFAULT_CLASSES, DEFAULT_FPS,
};
use std::path::PathBuf;

/// Detect checkers in a backgammon video, parse board states, and render
/// them into an annotated video under `<inference-root>/<name>`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Detection model weights
    pub model: String,

    /// Video or image source to run detection on
    pub source: PathBuf,

    /// Run name; outputs go to <inference-root>/<name>
    pub name: String,

    /// Root directory for run outputs
    #[arg(long, env = "GAMMON_INFERENCE_ROOT", default_value = "inference")]
    pub inference_root: PathBuf,

    /// Detector executable
    #[arg(long, env = "GAMMON_DETECTOR", default_value = "yolo")]
    pub detector: PathBuf,

    /// Prediction parser executable (defaults to the bundled parse-predictions)
    #[arg(long, env = "GAMMON_PARSER")]
    pub parser: Option<PathBuf>,

    /// State visualizer executable (defaults to the bundled visualize-state)
    #[arg(long, env = "GAMMON_VISUALIZER")]
    pub visualizer: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, env = "GAMMON_FFMPEG", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Frame rate of the encoded video
    #[arg(long, default_value_t = DEFAULT_FPS, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: u32,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            inference_root: self.inference_root.clone(),
            detector: self.detector.clone(),
            parser: self
                .parser
                .clone()
                .unwrap_or_else(|| resolve_sibling_tool("parse-predictions")),
            visualizer: self
                .visualizer
                .clone()
                .unwrap_or_else(|| resolve_sibling_tool("visualize-state")),
            ffmpeg: self.ffmpeg.clone(),
            fps: self.fps,
            classes: DEFAULT_CLASSES.to_vec(),
        }
    }

    pub fn request(&self) -> RunRequest {
        RunRequest {
            model: self.model.clone(),
            source: self.source.clone(),
            run_name: self.name.clone(),
        }
    }
}
