// Board state rendering
//
// Draws a schematic backgammon board in "board units": x in [-5, 5] and
// y in [-3, 3] with y pointing up. Points 1-12 sit on the bottom edge,
// points 13-24 on the top edge.

use crate::run_artifacts::{BoardState, POINT_COUNT};
use anyhow::Result;
use opencv::core::{self, Mat, Point, Rect, Scalar};
use opencv::imgproc;
use opencv::prelude::*;

/// Pixels per board unit.
pub const PIXELS_PER_UNIT: f64 = 120.0;

const X_MIN: f64 = -5.0;
const X_MAX: f64 = 5.0;
const Y_MIN: f64 = -3.0;
const Y_MAX: f64 = 3.0;

const BOARD_WIDTH: f64 = 3.5;
const BOARD_HEIGHT: f64 = 5.0;
/// Bottom-left corners of the left and right board outlines.
const BOARD_ORIGINS: [(f64, f64); 2] = [(-4.0, -2.5), (0.5, -2.5)];

pub const CHECKER_RADIUS: f64 = 0.2;
/// Checkers drawn per point before falling back to a count label.
pub const MAX_DRAWN_CHECKERS: usize = 6;

fn black() -> Scalar {
    Scalar::new(0.0, 0.0, 0.0, 0.0)
}

fn white() -> Scalar {
    Scalar::all(255.0)
}

fn red() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

/// Canvas size in pixels (width, height).
pub fn canvas_size() -> (i32, i32) {
    (
        ((X_MAX - X_MIN) * PIXELS_PER_UNIT).round() as i32,
        ((Y_MAX - Y_MIN) * PIXELS_PER_UNIT).round() as i32,
    )
}

/// Board units to pixel coordinates.
pub fn to_pixel(x: f64, y: f64) -> Point {
    Point::new(
        ((x - X_MIN) * PIXELS_PER_UNIT).round() as i32,
        ((Y_MAX - y) * PIXELS_PER_UNIT).round() as i32,
    )
}

fn to_pixels(length: f64) -> i32 {
    (length * PIXELS_PER_UNIT).round() as i32
}

/// Horizontal position of a 1-based point.
pub fn point_x(point: usize) -> f64 {
    match point {
        1..=6 => 3.5 - (point as f64 - 1.0) * 0.5,
        7..=12 => -1.0 - (point as f64 - 7.0) * 0.5,
        13..=18 => -3.5 + (point as f64 - 13.0) * 0.5,
        _ => 1.0 + (point as f64 - 19.0) * 0.5,
    }
}

pub fn is_top(point: usize) -> bool {
    (13..=POINT_COUNT).contains(&point)
}

/// Center of the `index`-th checker stacked on a point, counted from the edge.
pub fn checker_center(point: usize, index: usize) -> (f64, f64) {
    let (y_start, direction) = if is_top(point) { (2.5, -1.0) } else { (-2.5, 1.0) };
    let y = y_start + direction * (index as f64 * 2.0 * CHECKER_RADIUS + CHECKER_RADIUS);
    (point_x(point), y)
}

fn put_centered_text(
    img: &mut Mat,
    text: &str,
    center: Point,
    scale: f64,
    color: Scalar,
    thickness: i32,
) -> Result<core::Size> {
    let mut baseline = 0;
    let size = imgproc::get_text_size(
        text,
        imgproc::FONT_HERSHEY_SIMPLEX,
        scale,
        thickness,
        &mut baseline,
    )?;
    imgproc::put_text(
        img,
        text,
        Point::new(center.x - size.width / 2, center.y + size.height / 2),
        imgproc::FONT_HERSHEY_SIMPLEX,
        scale,
        color,
        thickness,
        imgproc::LINE_AA,
        false,
    )?;
    Ok(size)
}

fn draw_boards(img: &mut Mat) -> Result<()> {
    for (x, y) in BOARD_ORIGINS {
        // Top-left corner in pixel space is the board's (x, y + height)
        let top_left = to_pixel(x, y + BOARD_HEIGHT);
        imgproc::rectangle(
            img,
            Rect::new(
                top_left.x,
                top_left.y,
                to_pixels(BOARD_WIDTH),
                to_pixels(BOARD_HEIGHT),
            ),
            black(),
            2,
            imgproc::LINE_8,
            0,
        )?;
    }
    Ok(())
}

fn draw_point(img: &mut Mat, point: usize, count: i32) -> Result<()> {
    let x = point_x(point);
    let top = is_top(point);
    let (y_start, y_end, direction) = if top {
        (2.5, 1.5, -1.0)
    } else {
        (-2.5, -1.5, 1.0)
    };

    imgproc::line(
        img,
        to_pixel(x, y_start),
        to_pixel(x, y_end),
        black(),
        2,
        imgproc::LINE_AA,
        0,
    )?;

    let abs_count = count.unsigned_abs() as usize;
    if abs_count == 0 {
        return Ok(());
    }

    // Player 1 (negative) is white, player 2 (positive) black
    let fill = if count < 0 { white() } else { black() };
    let radius = to_pixels(CHECKER_RADIUS);

    for i in 0..abs_count.min(MAX_DRAWN_CHECKERS) {
        let (cx, cy) = checker_center(point, i);
        let center = to_pixel(cx, cy);
        imgproc::circle(img, center, radius, fill, -1, imgproc::LINE_AA, 0)?;
        imgproc::circle(img, center, radius, black(), 2, imgproc::LINE_AA, 0)?;
    }

    if abs_count > MAX_DRAWN_CHECKERS {
        let y = y_end
            + direction
                * (MAX_DRAWN_CHECKERS as f64 * 2.0 * CHECKER_RADIUS + CHECKER_RADIUS);
        put_centered_text(img, &abs_count.to_string(), to_pixel(x, y), 0.8, black(), 2)?;
    }

    Ok(())
}

fn draw_unparseable_banner(img: &mut Mat) -> Result<()> {
    let text = "UNABLE TO PARSE BOARD";
    let scale = 2.0;
    let thickness = 4;
    let center = to_pixel(-1.0, 0.0);

    let mut baseline = 0;
    let size = imgproc::get_text_size(
        text,
        imgproc::FONT_HERSHEY_SIMPLEX,
        scale,
        thickness,
        &mut baseline,
    )?;
    let pad = 16;
    let banner = Rect::new(
        center.x - size.width / 2 - pad,
        center.y - size.height / 2 - pad,
        size.width + 2 * pad,
        size.height + 2 * pad,
    );

    // Half-transparent white box
    let mut overlay = img.try_clone()?;
    imgproc::rectangle(&mut overlay, banner, white(), -1, imgproc::LINE_8, 0)?;
    let mut blended = Mat::default();
    core::add_weighted(&overlay, 0.5, &*img, 0.5, 0.0, &mut blended, -1)?;
    blended.copy_to(img)?;

    imgproc::rectangle(img, banner, black(), 2, imgproc::LINE_8, 0)?;
    put_centered_text(img, text, center, scale, red(), thickness)?;
    Ok(())
}

/// Render a board state onto a fresh white BGR canvas.
pub fn render_board_state(state: &BoardState) -> Result<Mat> {
    let (width, height) = canvas_size();
    let mut img = Mat::new_rows_cols_with_default(height, width, core::CV_8UC3, white())?;

    draw_boards(&mut img)?;

    match state {
        BoardState::Valid(points) => {
            for (i, count) in points.iter().enumerate() {
                draw_point(&mut img, i + 1, *count)?;
            }
        }
        BoardState::Unparseable => draw_unparseable_banner(&mut img)?,
    }

    Ok(img)
}
