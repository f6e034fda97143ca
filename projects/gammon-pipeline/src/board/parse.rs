// Prediction parser: detector label files -> board state records
//
// Boards are located first, every checker is projected into the unit square
// of the board it lies on, and checkers are then bucketed into the six point
// slots of each board half.

use crate::board::geometry::{boxes_intersect, deduplicate, project_onto_board};
use crate::run_artifacts::{class_id, BoardState, Detection, POINT_COUNT};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Boxes overlapping by more than this are the same object.
pub const IOU_THRESHOLD: f64 = 0.8;

/// Max horizontal distance (board units) between a checker and its point slot.
pub const CHECKER_POINT_X_TOLERANCE: f64 = 0.07;

/// Points on one half-board (six upper, six lower).
pub const HALF_BOARD_POINTS: usize = 12;

const SLOTS_PER_SIDE: usize = 6;

/// Read space-delimited label rows.
pub fn read_detections<R: Read>(reader: R) -> Result<Vec<Detection>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b' ')
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut detections = Vec::new();
    for (line, row) in reader.deserialize::<Detection>().enumerate() {
        let row = row.with_context(|| format!("Malformed label row {}", line + 1))?;
        detections.push(row);
    }
    Ok(detections)
}

pub fn read_label_file(path: &Path) -> Result<Vec<Detection>> {
    let file =
        fs::File::open(path).with_context(|| format!("Failed to open label file {:?}", path))?;
    read_detections(file).with_context(|| format!("Failed to read label file {:?}", path))
}

/// Locate the two boards, left board first. `None` unless exactly two remain
/// after deduplication.
fn find_boards(predictions: &[Detection]) -> Option<[Detection; 2]> {
    let mut boards: Vec<Detection> = predictions
        .iter()
        .filter(|p| p.class_id == class_id::BOARD)
        .copied()
        .collect();
    boards.sort_by(|a, b| a.x_center.total_cmp(&b.x_center));

    match deduplicate(&boards, IOU_THRESHOLD).as_slice() {
        [left, right] => Some([*left, *right]),
        _ => None,
    }
}

/// Signed counts of one half-board, index 0 is local point 1.
///
/// `checkers` are in board coordinates. Lower slots (y > 0.5) are local points
/// 6..1 left to right, upper slots (y < 0.5) are local points 7..12.
pub fn parse_half_board_state(checkers: &[Detection]) -> [i32; HALF_BOARD_POINTS] {
    let mut state = [0; HALF_BOARD_POINTS];

    for upper in [true, false] {
        for slot in 0..SLOTS_PER_SIDE {
            let slot_x = slot as f64 / SLOTS_PER_SIDE as f64 + 1.0 / SLOTS_PER_SIDE as f64 / 2.0;

            let on_point: Vec<Detection> = checkers
                .iter()
                .filter(|c| if upper { c.y_center < 0.5 } else { c.y_center > 0.5 })
                .filter(|c| (c.x_center - slot_x).abs() < CHECKER_POINT_X_TOLERANCE)
                .copied()
                .collect();

            let local_point = if upper { 7 + slot } else { SLOTS_PER_SIDE - slot };

            let p1 = on_point
                .iter()
                .filter(|c| c.class_id == class_id::CHECKER_P1)
                .count();
            let p2 = on_point
                .iter()
                .filter(|c| c.class_id == class_id::CHECKER_P2)
                .count();

            // Majority vote, ties go to the lower class id; an empty point
            // counts as player 2 with zero checkers
            let owner = if p1 == 0 && p2 == 0 {
                class_id::CHECKER_P2
            } else if p1 >= p2 {
                class_id::CHECKER_P1
            } else {
                class_id::CHECKER_P2
            };

            let count = deduplicate(&on_point, IOU_THRESHOLD).len() as i32;
            state[local_point - 1] = if owner == class_id::CHECKER_P2 {
                count
            } else {
                -count
            };
        }
    }

    state
}

/// Assemble the full board from the two halves.
///
/// Points 1-6 and 19-24 lie on the right board, 7-18 on the left board.
fn merge_half_boards(
    left: &[i32; HALF_BOARD_POINTS],
    right: &[i32; HALF_BOARD_POINTS],
) -> [i32; POINT_COUNT] {
    let mut full = [0; POINT_COUNT];
    for point in 1..=POINT_COUNT {
        full[point - 1] = match point {
            1..=6 => right[point - 1],
            7..=18 => left[point - 7],
            _ => right[point - 13],
        };
    }
    full
}

/// Parse the board state of one frame's predictions.
pub fn parse_board_state(predictions: &[Detection]) -> BoardState {
    let Some(boards) = find_boards(predictions) else {
        warn!("Not two board predictions");
        return BoardState::Unparseable;
    };

    // A checker overlapping both boards is projected onto both
    let mut per_board: [Vec<Detection>; 2] = [Vec::new(), Vec::new()];
    for (board, projected) in boards.iter().zip(per_board.iter_mut()) {
        projected.extend(
            predictions
                .iter()
                .filter(|p| p.is_checker() && boxes_intersect(board, p))
                .map(|p| project_onto_board(p, board)),
        );
    }

    if per_board.iter().all(|p| p.is_empty()) {
        warn!("No checker predictions on either board");
        return BoardState::Unparseable;
    }

    debug!(
        "Projected {} checkers onto left board, {} onto right board",
        per_board[0].len(),
        per_board[1].len()
    );

    let left = parse_half_board_state(&per_board[0]);
    let right = parse_half_board_state(&per_board[1]);

    BoardState::Valid(merge_half_boards(&left, &right))
}

/// Parse one label file and write its state record to `output_path`.
pub fn parse_single_prediction(prediction_path: &Path, output_path: &Path) -> Result<BoardState> {
    let predictions = read_label_file(prediction_path)?;
    let state = parse_board_state(&predictions);

    if state == BoardState::Unparseable {
        warn!("Unable to parse board state from {:?}", prediction_path);
    }

    let content = serde_json::to_string_pretty(&state)?;
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write state record {:?}", output_path))?;

    Ok(state)
}

/// Parse a label file, or every file of a labels directory into
/// `output/<stem>.json`. Returns the number of records written.
pub fn parse_predictions(predictions: &Path, output: &Path) -> Result<usize> {
    if !predictions.is_dir() {
        parse_single_prediction(predictions, output)?;
        return Ok(1);
    }

    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create states directory {:?}", output))?;

    let mut label_files: Vec<PathBuf> = fs::read_dir(predictions)
        .with_context(|| format!("Failed to list labels directory {:?}", predictions))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    label_files.sort();

    let pb = ProgressBar::new(label_files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} parsed ({eta})")?
            .progress_chars("#>-"),
    );

    let mut unparseable = 0;
    for label_path in &label_files {
        let file_name = label_path
            .with_extension("json")
            .file_name()
            .map(|n| n.to_os_string())
            .with_context(|| format!("Label path has no file name: {:?}", label_path))?;

        if parse_single_prediction(label_path, &output.join(file_name))?
            == BoardState::Unparseable
        {
            unparseable += 1;
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Parsed {} label files into {:?} ({} unparseable)",
        label_files.len(),
        output,
        unparseable
    );

    Ok(label_files.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEFT_BOARD: (f64, f64, f64, f64) = (0.25, 0.5, 0.4, 0.8);
    const RIGHT_BOARD: (f64, f64, f64, f64) = (0.75, 0.5, 0.4, 0.8);

    fn det(class_id: u32, x: f64, y: f64, w: f64, h: f64) -> Detection {
        Detection {
            class_id,
            x_center: x,
            y_center: y,
            width: w,
            height: h,
            conf: 0.9,
        }
    }

    fn board(b: (f64, f64, f64, f64)) -> Detection {
        det(class_id::BOARD, b.0, b.1, b.2, b.3)
    }

    /// A checker at board-local (x, y) on the given board.
    fn checker_on(b: (f64, f64, f64, f64), class_id: u32, x: f64, y: f64) -> Detection {
        let (bx, by, bw, bh) = b;
        det(
            class_id,
            bx - bw / 2.0 + x * bw,
            by - bh / 2.0 + y * bh,
            0.02,
            0.02,
        )
    }

    fn slot_x(slot: usize) -> f64 {
        slot as f64 / 6.0 + 1.0 / 12.0
    }

    #[test]
    fn test_read_detections_parses_rows() {
        let text = "0 0.25 0.5 0.4 0.8 0.95\n2 0.3 0.2 0.02 0.02 0.71\n";
        let rows = read_detections(text.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].class_id, class_id::BOARD);
        assert_eq!(rows[1].class_id, class_id::CHECKER_P2);
        assert_eq!(rows[1].conf, 0.71);
    }

    #[test]
    fn test_read_detections_rejects_malformed_row() {
        assert!(read_detections("1 0.5 0.5\n".as_bytes()).is_err());
        assert!(read_detections("x 0.5 0.5 0.1 0.1 0.9\n".as_bytes()).is_err());
    }

    #[test]
    fn test_read_detections_empty_file() {
        assert!(read_detections("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_half_board_slots_and_signs() {
        let checkers = vec![
            // Lower half, slot 0 -> local point 6, two P2 checkers
            det(class_id::CHECKER_P2, slot_x(0), 0.9, 0.05, 0.05),
            det(class_id::CHECKER_P2, slot_x(0), 0.8, 0.05, 0.05),
            // Upper half, slot 5 -> local point 12, one P1 checker
            det(class_id::CHECKER_P1, slot_x(5), 0.1, 0.05, 0.05),
            // Lower half, slot 5 -> local point 1, tie 1:1 goes to P1
            det(class_id::CHECKER_P1, slot_x(5), 0.9, 0.05, 0.05),
            det(class_id::CHECKER_P2, slot_x(5), 0.8, 0.05, 0.05),
        ];

        let state = parse_half_board_state(&checkers);
        assert_eq!(state[5], 2);
        assert_eq!(state[11], -1);
        assert_eq!(state[0], -2);
        assert_eq!(state.iter().filter(|c| **c != 0).count(), 3);
    }

    #[test]
    fn test_half_board_ignores_checkers_between_points() {
        // Exactly between slot 0 and slot 1, 0.083 from each centre
        let checkers = vec![det(class_id::CHECKER_P1, 1.0 / 6.0, 0.9, 0.05, 0.05)];
        assert_eq!(parse_half_board_state(&checkers), [0; HALF_BOARD_POINTS]);
    }

    #[test]
    fn test_half_board_counts_duplicates_once() {
        let checkers = vec![
            det(class_id::CHECKER_P1, slot_x(2), 0.1, 0.05, 0.05),
            det(class_id::CHECKER_P1, slot_x(2) + 0.001, 0.1, 0.05, 0.05),
        ];
        let state = parse_half_board_state(&checkers);
        // Upper slot 2 -> local point 9
        assert_eq!(state[8], -1);
    }

    #[test]
    fn test_merge_half_boards_mapping() {
        let left: [i32; 12] = std::array::from_fn(|i| 100 + i as i32 + 1);
        let right: [i32; 12] = std::array::from_fn(|i| 200 + i as i32 + 1);
        let full = merge_half_boards(&left, &right);

        assert_eq!(full[0], 201); // Point_1 <- right 1
        assert_eq!(full[5], 206); // Point_6 <- right 6
        assert_eq!(full[6], 101); // Point_7 <- left 1
        assert_eq!(full[11], 106); // Point_12 <- left 6
        assert_eq!(full[12], 107); // Point_13 <- left 7
        assert_eq!(full[17], 112); // Point_18 <- left 12
        assert_eq!(full[18], 207); // Point_19 <- right 7
        assert_eq!(full[23], 212); // Point_24 <- right 12
    }

    #[test]
    fn test_parse_board_state_full_board() {
        let predictions = vec![
            // Boards listed right first: sorting must still put left at index 0
            board(RIGHT_BOARD),
            board(LEFT_BOARD),
            // Right board, lower slot 5 -> local 1 -> Point_1: three P2
            checker_on(RIGHT_BOARD, class_id::CHECKER_P2, slot_x(5), 0.95),
            checker_on(RIGHT_BOARD, class_id::CHECKER_P2, slot_x(5), 0.88),
            checker_on(RIGHT_BOARD, class_id::CHECKER_P2, slot_x(5), 0.81),
            // Left board, lower slot 0 -> local 6 -> Point_12: two P1
            checker_on(LEFT_BOARD, class_id::CHECKER_P1, slot_x(0), 0.95),
            checker_on(LEFT_BOARD, class_id::CHECKER_P1, slot_x(0), 0.88),
            // Left board, upper slot 0 -> local 7 -> Point_13: one P2
            checker_on(LEFT_BOARD, class_id::CHECKER_P2, slot_x(0), 0.05),
            // Right board, upper slot 5 -> local 12 -> Point_24: one P1
            checker_on(RIGHT_BOARD, class_id::CHECKER_P1, slot_x(5), 0.05),
            // Dice are ignored
            det(class_id::DIE, 0.5, 0.5, 0.03, 0.03),
        ];

        let state = parse_board_state(&predictions);
        assert_eq!(state.point(1), Some(3));
        assert_eq!(state.point(12), Some(-2));
        assert_eq!(state.point(13), Some(1));
        assert_eq!(state.point(24), Some(-1));

        let BoardState::Valid(points) = state else {
            panic!("expected a valid state");
        };
        assert_eq!(points.iter().map(|c| c.abs()).sum::<i32>(), 7);
    }

    #[test]
    fn test_duplicate_board_boxes_collapse() {
        let predictions = vec![
            board(LEFT_BOARD),
            det(class_id::BOARD, 0.251, 0.5, 0.4, 0.8),
            board(RIGHT_BOARD),
            checker_on(LEFT_BOARD, class_id::CHECKER_P1, slot_x(3), 0.1),
        ];

        let state = parse_board_state(&predictions);
        // Left upper slot 3 -> local 10 -> Point_16
        assert_eq!(state.point(16), Some(-1));
    }

    #[test]
    fn test_unparseable_without_two_boards() {
        let one_board = vec![
            board(LEFT_BOARD),
            checker_on(LEFT_BOARD, class_id::CHECKER_P1, slot_x(0), 0.1),
        ];
        assert_eq!(parse_board_state(&one_board), BoardState::Unparseable);

        let three_boards = vec![
            board(LEFT_BOARD),
            board(RIGHT_BOARD),
            det(class_id::BOARD, 0.5, 0.5, 0.1, 0.1),
            checker_on(LEFT_BOARD, class_id::CHECKER_P1, slot_x(0), 0.1),
        ];
        assert_eq!(parse_board_state(&three_boards), BoardState::Unparseable);

        assert_eq!(parse_board_state(&[]), BoardState::Unparseable);
    }

    #[test]
    fn test_unparseable_without_checkers() {
        let predictions = vec![
            board(LEFT_BOARD),
            board(RIGHT_BOARD),
            det(class_id::DIE, 0.3, 0.3, 0.03, 0.03),
        ];
        assert_eq!(parse_board_state(&predictions), BoardState::Unparseable);
    }

    #[test]
    fn test_parse_predictions_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let labels = tmp.path().join("labels");
        let states = tmp.path().join("states");
        fs::create_dir_all(&labels).unwrap();

        fs::write(
            labels.join("game_1.txt"),
            "0 0.25 0.5 0.4 0.8 0.9\n0 0.75 0.5 0.4 0.8 0.9\n2 0.0833 0.13 0.02 0.02 0.8\n",
        )
        .unwrap();
        fs::write(labels.join("game_2.txt"), "0 0.25 0.5 0.4 0.8 0.9\n").unwrap();

        let written = parse_predictions(&labels, &states).unwrap();
        assert_eq!(written, 2);

        let first: BoardState =
            serde_json::from_str(&fs::read_to_string(states.join("game_1.json")).unwrap())
                .unwrap();
        assert!(matches!(first, BoardState::Valid(_)));

        let second: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(states.join("game_2.json")).unwrap())
                .unwrap();
        assert_eq!(second["status"], "UNPARSEABLE");
    }

    #[test]
    fn test_parse_predictions_single_file() {
        let tmp = tempfile::tempdir().unwrap();
        let label = tmp.path().join("frame_3.txt");
        let output = tmp.path().join("out.json");
        fs::write(&label, "").unwrap();

        assert_eq!(parse_predictions(&label, &output).unwrap(), 1);
        let state: BoardState =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(state, BoardState::Unparseable);
    }

    #[test]
    fn test_parse_predictions_propagates_malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let labels = tmp.path().join("labels");
        fs::create_dir_all(&labels).unwrap();
        fs::write(labels.join("bad_1.txt"), "not a label row\n").unwrap();

        assert!(parse_predictions(&labels, &tmp.path().join("states")).is_err());
    }
}
