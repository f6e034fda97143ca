use crate::pipeline::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffix the detector gives its saved-frames directory.
pub const FRAMES_DIR_SUFFIX: &str = "_frames";

/// Filesystem layout of one run: `<inference_root>/<run_name>/...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub run_name: String,
    pub inference_root: PathBuf,
    pub run_dir: PathBuf,
    pub labels_dir: PathBuf,
    pub states_dir: PathBuf,
    pub vis_dir: PathBuf,
    pub video_path: PathBuf,
    pub manifest_path: PathBuf,
}

impl RunLayout {
    pub fn new(inference_root: &Path, run_name: &str) -> Self {
        let run_dir = inference_root.join(run_name);
        Self {
            run_name: run_name.to_string(),
            inference_root: inference_root.to_path_buf(),
            labels_dir: run_dir.join("labels"),
            states_dir: run_dir.join("states"),
            vis_dir: run_dir.join("vis"),
            video_path: run_dir.join("output.mp4"),
            manifest_path: run_dir.join("run.json"),
            run_dir,
        }
    }

    /// Create the parser and visualizer output directories if absent.
    pub fn create_stage_dirs(&self) -> Result<(), PipelineError> {
        for dir in [&self.states_dir, &self.vis_dir] {
            fs::create_dir_all(dir).map_err(|source| PipelineError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunManifest {
    pub run_name: String,
    pub model: String,
    pub source: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Write `run.json` into the run directory, replacing any previous one.
pub fn write_manifest(
    layout: &RunLayout,
    model: &str,
    source: &Path,
) -> Result<RunManifest, PipelineError> {
    fs::create_dir_all(&layout.run_dir).map_err(|source| PipelineError::Io {
        path: layout.run_dir.clone(),
        source,
    })?;

    let manifest = RunManifest {
        run_name: layout.run_name.clone(),
        model: model.to_string(),
        source: source.to_path_buf(),
        created_at: Utc::now(),
    };

    let content = serde_json::to_string_pretty(&manifest)?;
    fs::write(&layout.manifest_path, content).map_err(|source| PipelineError::Io {
        path: layout.manifest_path.clone(),
        source,
    })?;

    Ok(manifest)
}

pub fn read_manifest(layout: &RunLayout) -> Result<RunManifest, PipelineError> {
    let content =
        fs::read_to_string(&layout.manifest_path).map_err(|source| PipelineError::Io {
            path: layout.manifest_path.clone(),
            source,
        })?;
    Ok(serde_json::from_str(&content)?)
}

/// The unique direct child directory of `run_dir` whose name ends in `_frames`.
pub fn find_frames_dir(run_dir: &Path) -> Result<PathBuf, PipelineError> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(run_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|name| name.ends_with(FRAMES_DIR_SUFFIX))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => Err(PipelineError::FramesDirNotFound {
            run_dir: run_dir.to_path_buf(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(PipelineError::AmbiguousFramesDir {
            run_dir: run_dir.to_path_buf(),
            candidates,
        }),
    }
}
