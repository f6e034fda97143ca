// State visualizer: board state records (+ detector frames) -> vis_%04d.jpg
//
// Each output image is the captured frame on the left and the rendered board
// state on the right, scaled to the frame height.

use crate::board::render::render_board_state;
use crate::run_artifacts::BoardState;
use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use opencv::core::{self, Mat, Size, Vector};
use opencv::prelude::*;
use opencv::{imgcodecs, imgproc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Extension of the frames saved by the detector.
pub const FRAME_EXTENSION: &str = "jpg";

/// Output name of the visualization for a frame index: `vis_0007.jpg`.
pub fn vis_file_name(frame_index: u32) -> String {
    format!("vis_{:04}.jpg", frame_index)
}

/// Frame index encoded as the trailing `_<n>` of a file stem.
pub fn frame_index(stem: &str) -> Result<u32> {
    let suffix = stem.rsplit('_').next().unwrap_or(stem);
    suffix
        .parse::<u32>()
        .with_context(|| format!("No frame index at the end of {:?}", stem))
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow!("Path is not valid UTF-8: {:?}", path))
}

pub fn read_state(path: &Path) -> Result<BoardState> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state record {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Malformed state record {:?}", path))
}

pub fn read_frame(path: &Path) -> Result<Mat> {
    let frame = imgcodecs::imread(path_str(path)?, imgcodecs::IMREAD_COLOR)?;
    if frame.empty() {
        bail!("Failed to decode frame image {:?}", path);
    }
    Ok(frame)
}

pub fn write_image(path: &Path, img: &Mat) -> Result<()> {
    if !imgcodecs::imwrite(path_str(path)?, img, &Vector::new())? {
        bail!("Failed to write image {:?}", path);
    }
    Ok(())
}

/// Place the state rendering to the right of the frame, resized to the frame
/// height with its aspect ratio kept.
pub fn join_state_and_frame(state_img: &Mat, frame: &Mat) -> Result<Mat> {
    let height = frame.rows();
    let scale = height as f64 / state_img.rows() as f64;
    let width = ((state_img.cols() as f64 * scale).round() as i32).max(1);

    let mut resized = Mat::default();
    imgproc::resize(
        state_img,
        &mut resized,
        Size::new(width, height),
        0.0,
        0.0,
        imgproc::INTER_AREA,
    )?;

    let mut parts = Vector::<Mat>::new();
    parts.push(frame.try_clone()?);
    parts.push(resized);

    let mut combined = Mat::default();
    core::hconcat(&parts, &mut combined)?;
    Ok(combined)
}

/// Render one state record, joined with its frame when one is given.
pub fn visualize_single_state(
    state: &BoardState,
    frame_path: Option<&Path>,
    output_path: &Path,
) -> Result<()> {
    let state_img = render_board_state(state)?;

    let output = match frame_path {
        Some(frame_path) => {
            if !frame_path.exists() {
                bail!("No such frame file exists: {:?}", frame_path);
            }
            join_state_and_frame(&state_img, &read_frame(frame_path)?)?
        }
        None => state_img,
    };

    write_image(output_path, &output)
}

/// Files of `dir` keyed by stem, restricted to one extension.
fn files_by_stem(dir: &Path, extension: &str) -> Result<BTreeMap<String, PathBuf>> {
    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.insert(stem.to_string(), path.clone());
        }
    }
    Ok(files)
}

/// Render every state record of `states` next to its frame from `frames`.
///
/// Every state record must have a frame of the same stem. Frames without a
/// state record (the detector writes no label file for an empty frame) are
/// rendered as unparseable so the `vis_%04d` sequence has no gaps.
/// Returns the number of images written.
pub fn visualize_states(states: &Path, frames: &Path, output: &Path) -> Result<usize> {
    if !frames.is_dir() {
        bail!("States is a directory but frames is not: {:?}", frames);
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create visualization directory {:?}", output))?;

    let state_files = files_by_stem(states, "json")?;
    let frame_files = files_by_stem(frames, FRAME_EXTENSION)?;

    if let Some(stem) = state_files.keys().find(|s| !frame_files.contains_key(*s)) {
        bail!(
            "No such frame file exists: {:?}",
            frames.join(format!("{}.{}", stem, FRAME_EXTENSION))
        );
    }

    let pb = ProgressBar::new(frame_files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rendered ({eta})")?
            .progress_chars("#>-"),
    );

    let mut missing_states = 0;
    for (stem, frame_path) in &frame_files {
        let index = frame_index(stem)?;

        let state = match state_files.get(stem) {
            Some(state_path) => read_state(state_path)?,
            None => {
                missing_states += 1;
                BoardState::Unparseable
            }
        };

        visualize_single_state(&state, Some(frame_path), &output.join(vis_file_name(index)))?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    if missing_states > 0 {
        warn!(
            "{} frames had no state record and were rendered as unparseable",
            missing_states
        );
    }
    info!("Rendered {} visualizations into {:?}", frame_files.len(), output);

    Ok(frame_files.len())
}

/// Entry point shared by directory and single-record mode.
pub fn visualize(states: &Path, frames: Option<&Path>, output: &Path) -> Result<usize> {
    if states.is_dir() {
        let frames =
            frames.ok_or_else(|| anyhow!("States is a directory but no frames were given"))?;
        return visualize_states(states, frames, output);
    }

    let state = read_state(states)?;
    visualize_single_state(&state, frames, output)?;
    Ok(1)
}
