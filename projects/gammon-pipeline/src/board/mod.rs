// Board state parsing and rendering

pub mod geometry;
pub mod parse;
pub mod render;
pub mod visualize;
