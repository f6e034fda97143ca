// Pipeline orchestrator: runs detect -> parse -> visualize -> encode
//
// Stages run one at a time, each only after the previous process exited
// successfully. The first failure aborts the run; nothing is cleaned up.

use crate::pipeline::commands::{
    count_vis_sequence, detector_command, encoder_command, parser_command, sequence_duration_secs,
    visualizer_command,
};
use crate::pipeline::error::PipelineError;
use crate::pipeline::runner::{CommandRunner, SystemRunner};
use crate::pipeline::types::{DetectionOutput, PipelineConfig, RunRequest, StageCommand};
use crate::run_context::{find_frames_dir, write_manifest, RunLayout};
use std::path::PathBuf;
use std::time::Instant;

/// Artifacts of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub layout: RunLayout,
    pub detection: DetectionOutput,
    pub video_path: PathBuf,
    pub encoded_frames: usize,
}

pub struct Pipeline<R: CommandRunner> {
    config: PipelineConfig,
    runner: R,
}

impl<R: CommandRunner> Pipeline<R> {
    pub fn new(config: PipelineConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn into_runner(self) -> R {
        self.runner
    }

    fn run_stage(&mut self, command: &StageCommand) -> Result<(), PipelineError> {
        tracing::info!("[{}] {}", command.stage, command);
        let start_inst = Instant::now();

        let code = self.runner.run(command)?;
        let elapsed = start_inst.elapsed().as_secs_f64();

        if code != 0 {
            tracing::error!(
                "[{}] exited with code {} after {:.1}s",
                command.stage,
                code,
                elapsed
            );
            return Err(PipelineError::StageFailed {
                stage: command.stage,
                code,
            });
        }

        tracing::info!("[{}] finished in {:.1}s", command.stage, elapsed);
        Ok(())
    }

    /// Run the detector and report where it wrote labels and frames.
    pub fn detect(
        &mut self,
        request: &RunRequest,
        layout: &RunLayout,
    ) -> Result<DetectionOutput, PipelineError> {
        let command = detector_command(&self.config, request);
        self.run_stage(&command)?;

        let frames_dir = find_frames_dir(&layout.run_dir)?;
        tracing::info!("Detector frames directory: {:?}", frames_dir);

        Ok(DetectionOutput {
            run_dir: layout.run_dir.clone(),
            labels_dir: layout.labels_dir.clone(),
            frames_dir,
        })
    }

    pub fn run(&mut self, request: &RunRequest) -> Result<RunSummary, PipelineError> {
        let layout = RunLayout::new(&self.config.inference_root, &request.run_name);
        tracing::info!(
            "Starting run '{}' (model={}, source={:?}) in {:?}",
            request.run_name,
            request.model,
            request.source,
            layout.run_dir
        );

        write_manifest(&layout, &request.model, &request.source)?;

        let detection = self.detect(request, &layout)?;

        layout.create_stage_dirs()?;

        self.run_stage(&parser_command(&self.config, &detection, &layout))?;
        self.run_stage(&visualizer_command(&self.config, &detection, &layout))?;

        let encoded_frames = count_vis_sequence(&layout.vis_dir);
        tracing::info!(
            "Encoding {} frames at {} fps ({:.2}s)",
            encoded_frames,
            self.config.fps,
            sequence_duration_secs(encoded_frames, self.config.fps)
        );
        self.run_stage(&encoder_command(&self.config, &layout))?;

        Ok(RunSummary {
            video_path: layout.video_path.clone(),
            layout,
            detection,
            encoded_frames,
        })
    }
}

/// Run the whole pipeline with real processes.
pub fn run_pipeline(
    config: PipelineConfig,
    request: &RunRequest,
) -> Result<RunSummary, PipelineError> {
    Pipeline::new(config, SystemRunner).run(request)
}
