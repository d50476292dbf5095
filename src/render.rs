//! Plain-text and JSON renderings of a tree and of query results.

use std::io::Write;

use crate::error::Result;
use crate::octree::Octree;
use crate::types::Point;

/// Indented dump, two spaces per level.
pub fn write_tree<W: Write>(tree: &Octree, w: &mut W) -> Result<()> {
    let snapshot = tree.snapshot();
    for node in snapshot.iter() {
        let indent = "  ".repeat(node.depth as usize);
        if node.is_leaf {
            writeln!(
                w,
                "{indent}Leaf Node at depth {} with {} points:",
                node.depth,
                node.points.len()
            )?;
            for p in &node.points {
                writeln!(w, "{indent}  Point: {p}")?;
            }
        } else {
            writeln!(w, "{indent}Internal Node at depth {}", node.depth)?;
        }
    }
    Ok(())
}

/// One `Point within cube:` line per result.
pub fn write_range_query<W: Write>(points: &[Point], w: &mut W) -> Result<()> {
    for p in points {
        writeln!(w, "Point within cube: {p}")?;
    }
    Ok(())
}

/// Pretty-printed JSON snapshot of the whole tree.
pub fn write_tree_json<W: Write>(tree: &Octree, w: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, &tree.snapshot())?;
    writeln!(w)?;
    Ok(())
}
