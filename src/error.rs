use std::io;

use crate::types::Point;

/// All error types for the octree engine.
#[derive(thiserror::Error, Debug)]
pub enum OctreeError {
    #[error("Capacity error: leaf at max depth {depth} is full, point {point} not inserted")]
    Capacity { point: Point, depth: u32 },
    #[error("Bounds error: point {point} lies outside the root volume")]
    OutOfBounds { point: Point },
    #[error("Not found: point {0} is not stored in the octree")]
    NotFound(Point),
    #[error("Move reverted: {from} could not be moved to {to}: {source}")]
    MoveReverted {
        from: Point,
        to: Point,
        #[source]
        source: Box<OctreeError>,
    },
    #[error("Input error: {0}")]
    Input(String),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OctreeError>;
