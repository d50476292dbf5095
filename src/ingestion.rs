use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{OctreeError, Result};
use crate::octree::Octree;
use crate::types::Point;

/// Statistics about a loaded point file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionStats {
    /// Non-blank lines read.
    pub lines: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Points the tree refused (capacity or bounds).
    pub rejected: usize,
}

/// Read a point file and insert its points into `tree` in file order.
pub fn load_points(path: &Path, tree: &mut Octree) -> Result<IngestionStats> {
    let content = fs::read_to_string(path).map_err(|e| {
        OctreeError::Input(format!("Failed to read {}: {e}", path.display()))
    })?;
    let points = parse_points(&content)?;
    debug!(path = %path.display(), points = points.len(), "Parsed point file");

    let stats = insert_points(tree, &points);
    info!(
        inserted = stats.inserted,
        duplicates = stats.duplicates,
        rejected = stats.rejected,
        "Loaded points"
    );
    Ok(stats)
}

/// Parse "x y z" lines into `(line_number, point)` pairs.
///
/// Blank lines are skipped. Lines are parsed in parallel; the result keeps
/// file order.
pub fn parse_points(content: &str) -> Result<Vec<(usize, Point)>> {
    let lines: Vec<&str> = content.lines().collect();
    let parsed: Vec<Option<(usize, Point)>> = lines
        .par_iter()
        .enumerate()
        .map(|(i, line)| parse_line(line, i + 1).map(|p| p.map(|p| (i + 1, p))))
        .collect::<Result<_>>()?;
    Ok(parsed.into_iter().flatten().collect())
}

fn parse_line(line: &str, line_no: usize) -> Result<Option<Point>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.is_empty() {
        return Ok(None);
    }
    if fields.len() != 3 {
        return Err(OctreeError::Parse {
            line: line_no,
            message: format!("expected 3 coordinates, found {}", fields.len()),
        });
    }

    let mut coords = [0.0_f32; 3];
    for (slot, field) in coords.iter_mut().zip(&fields) {
        *slot = field.parse().map_err(|e| OctreeError::Parse {
            line: line_no,
            message: format!("invalid coordinate {field:?}: {e}"),
        })?;
    }
    Ok(Some(Point::from(coords)))
}

/// Insert parsed points, skipping ones already stored.
pub fn insert_points(tree: &mut Octree, points: &[(usize, Point)]) -> IngestionStats {
    let mut stats = IngestionStats {
        lines: points.len(),
        ..Default::default()
    };

    for &(line, point) in points {
        if tree.contains(point) {
            warn!(line, %point, "Point already exists, skipping duplicate");
            stats.duplicates += 1;
            continue;
        }
        match tree.insert(point) {
            Ok(()) => stats.inserted += 1,
            Err(e) => {
                warn!(line, %e, "Point not inserted");
                stats.rejected += 1;
            }
        }
    }
    stats
}
