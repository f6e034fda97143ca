use crate::run_artifacts::Detection;
use geo::{Area, BooleanOps, Intersects};
use geo_types::{coord, Polygon, Rect};

/// Convert a center-based detection box to a geo_types Polygon
pub fn to_polygon(d: &Detection) -> Polygon<f64> {
    let half_w = d.width / 2.0;
    let half_h = d.height / 2.0;
    Rect::new(
        coord! { x: d.x_center - half_w, y: d.y_center - half_h },
        coord! { x: d.x_center + half_w, y: d.y_center + half_h },
    )
    .to_polygon()
}

/// Intersection over union of two polygons, 0 when the union is empty.
pub fn iou(a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
    // Degenerate boxes have no area to share
    if a.unsigned_area() <= 0.0 || b.unsigned_area() <= 0.0 {
        return 0.0;
    }

    let union = a.union(b).unsigned_area();
    if union <= 0.0 {
        return 0.0;
    }

    a.intersection(b).unsigned_area() / union
}

/// Greedy IoU deduplication: walking in input order, keep each box not yet
/// dropped and drop every later box overlapping it by more than `iou_threshold`.
pub fn deduplicate(detections: &[Detection], iou_threshold: f64) -> Vec<Detection> {
    let polygons: Vec<Polygon<f64>> = detections.iter().map(to_polygon).collect();
    let mut dropped = vec![false; detections.len()];
    let mut keep = Vec::new();

    for i in 0..detections.len() {
        if dropped[i] {
            continue;
        }
        keep.push(detections[i]);

        for j in (i + 1)..detections.len() {
            if !dropped[j] && iou(&polygons[i], &polygons[j]) > iou_threshold {
                dropped[j] = true;
            }
        }
    }

    keep
}

pub fn boxes_intersect(a: &Detection, b: &Detection) -> bool {
    to_polygon(a).intersects(&to_polygon(b))
}

/// Express a prediction in the [0, 1] coordinate system of a board box.
pub fn project_onto_board(pred: &Detection, board: &Detection) -> Detection {
    Detection {
        class_id: pred.class_id,
        conf: pred.conf,
        x_center: (pred.x_center - board.x_center + board.width / 2.0) / board.width,
        y_center: (pred.y_center - board.y_center + board.height / 2.0) / board.height,
        width: pred.width / board.width,
        height: pred.height / board.height,
    }
}
