// Run artifact struct definitions
//
// This module contains the records that are persisted as files within a run's
// output directory: detector label rows (`labels/*.txt`) and parsed board
// states (`states/*.json`).

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Detector class ids, as configured in the detection model.
pub mod class_id {
    pub const BOARD: u32 = 0;
    pub const CHECKER_P1: u32 = 1;
    pub const CHECKER_P2: u32 = 2;
    pub const DIE: u32 = 3;
    pub const POINT: u32 = 4;
}

/// Number of points on a backgammon board.
pub const POINT_COUNT: usize = 24;

/// One detection row of a label file:
/// `class x_center y_center width height conf`, coordinates normalized [0, 1].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    pub conf: f64,
}

impl Detection {
    pub fn is_checker(&self) -> bool {
        self.class_id == class_id::CHECKER_P1 || self.class_id == class_id::CHECKER_P2
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoardStatus {
    Valid,
    Unparseable,
}

/// Parsed state of the whole board for one frame.
///
/// `Valid` holds the signed checker count of each point, `points[0]` being
/// `Point_1`. Positive counts are player-2 checkers, negative counts player-1.
///
/// On disk this is a flat JSON object: `{"Point_1": 0, ..., "Point_24": 2,
/// "status": "VALID"}` or `{"status": "UNPARSEABLE"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardState {
    Valid([i32; POINT_COUNT]),
    Unparseable,
}

impl BoardState {
    pub fn status(&self) -> BoardStatus {
        match self {
            BoardState::Valid(_) => BoardStatus::Valid,
            BoardState::Unparseable => BoardStatus::Unparseable,
        }
    }

    /// Signed count at a 1-based point index.
    pub fn point(&self, point: usize) -> Option<i32> {
        match self {
            BoardState::Valid(points) if (1..=POINT_COUNT).contains(&point) => {
                Some(points[point - 1])
            }
            _ => None,
        }
    }
}

pub fn point_key(point: usize) -> String {
    format!("Point_{}", point)
}

fn parse_point_key(key: &str) -> Option<usize> {
    key.strip_prefix("Point_")
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| (1..=POINT_COUNT).contains(n))
}

impl Serialize for BoardState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BoardState::Valid(points) => {
                let mut map = serializer.serialize_map(Some(POINT_COUNT + 1))?;
                for (i, count) in points.iter().enumerate() {
                    map.serialize_entry(&point_key(i + 1), count)?;
                }
                map.serialize_entry("status", &BoardStatus::Valid)?;
                map.end()
            }
            BoardState::Unparseable => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("status", &BoardStatus::Unparseable)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for BoardState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;

        // A record without a status is treated as valid
        let status = match raw.get("status") {
            Some(value) => BoardStatus::deserialize(value).map_err(D::Error::custom)?,
            None => BoardStatus::Valid,
        };

        if status == BoardStatus::Unparseable {
            return Ok(BoardState::Unparseable);
        }

        let mut points = [0; POINT_COUNT];
        for (key, value) in &raw {
            // Unknown keys are ignored
            let Some(point) = parse_point_key(key) else {
                continue;
            };
            let count = value
                .as_i64()
                .and_then(|c| i32::try_from(c).ok())
                .ok_or_else(|| D::Error::custom(format!("{} is not an integer count", key)))?;
            points[point - 1] = count;
        }

        Ok(BoardState::Valid(points))
    }
}
