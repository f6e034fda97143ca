// Command lines of the four stages
//
// Every stage is an external process; the driver only builds its arguments
// from the run layout.

use crate::board::visualize::vis_file_name;
use crate::pipeline::types::{DetectionOutput, PipelineConfig, RunRequest, Stage, StageCommand};
use crate::run_context::RunLayout;
use std::path::Path;

/// printf-style pattern the encoder reads the visualization sequence with.
pub const VIS_PATTERN: &str = "vis_%04d.jpg";

/// `yolo detect predict ...` saving labels with confidences and raw frames
/// under `<inference_root>/<run_name>`, overwriting a previous run of the
/// same name.
pub fn detector_command(config: &PipelineConfig, request: &RunRequest) -> StageCommand {
    let classes: Vec<String> = config.classes.iter().map(|c| c.to_string()).collect();

    StageCommand::new(Stage::Detect, &config.detector)
        .arg("detect")
        .arg("predict")
        .arg(format!("model={}", request.model))
        .arg(format!("source={}", request.source.display()))
        .arg(format!("project={}", config.inference_root.display()))
        .arg(format!("name={}", request.run_name))
        .arg(format!("classes=[{}]", classes.join(",")))
        .arg("save_txt=True")
        .arg("save_conf=True")
        .arg("save_frames=True")
        .arg("exist_ok=True")
}

pub fn parser_command(
    config: &PipelineConfig,
    detection: &DetectionOutput,
    layout: &RunLayout,
) -> StageCommand {
    StageCommand::new(Stage::Parse, &config.parser)
        .path_arg(&detection.labels_dir)
        .path_arg(&layout.states_dir)
}

pub fn visualizer_command(
    config: &PipelineConfig,
    detection: &DetectionOutput,
    layout: &RunLayout,
) -> StageCommand {
    StageCommand::new(Stage::Visualize, &config.visualizer)
        .path_arg(&layout.states_dir)
        .path_arg(&layout.vis_dir)
        .arg("--frames")
        .path_arg(&detection.frames_dir)
}

/// Constant-rate H.264 encode of `vis_%04d.jpg`. The scale filter rounds the
/// size down to even dimensions, which yuv420p requires.
pub fn encoder_command(config: &PipelineConfig, layout: &RunLayout) -> StageCommand {
    StageCommand::new(Stage::Encode, &config.ffmpeg)
        .arg("-y")
        .arg("-framerate")
        .arg(config.fps.to_string())
        .arg("-i")
        .path_arg(&layout.vis_dir.join(VIS_PATTERN))
        .arg("-vf")
        .arg("scale=trunc(iw/2)*2:trunc(ih/2)*2")
        .arg("-c:v")
        .arg("libx264")
        .arg("-pix_fmt")
        .arg("yuv420p")
        .path_arg(&layout.video_path)
}

/// Number of images the encoder will pick up: `vis_0001.jpg`, `vis_0002.jpg`,
/// ... up to the first gap.
pub fn count_vis_sequence(vis_dir: &Path) -> usize {
    (1u32..)
        .take_while(|i| vis_dir.join(vis_file_name(*i)).is_file())
        .count()
}

pub fn sequence_duration_secs(frames: usize, fps: u32) -> f64 {
    if fps == 0 {
        return 0.0;
    }
    frames as f64 / fps as f64
}
