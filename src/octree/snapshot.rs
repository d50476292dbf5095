use serde::Serialize;

use crate::types::Point;

use super::node::OctreeNode;

/// Owned, serializable copy of a node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub center: Point,
    pub size: f32,
    pub depth: u32,
    pub is_leaf: bool,
    pub min: Point,
    pub max: Point,
    pub points: Vec<Point>,
    pub children: Vec<NodeSnapshot>,
}

impl From<&OctreeNode> for NodeSnapshot {
    fn from(node: &OctreeNode) -> Self {
        Self {
            center: node.center,
            size: node.size,
            depth: node.depth,
            is_leaf: node.is_leaf(),
            min: node.bounds.min,
            max: node.bounds.max,
            points: node.points().to_vec(),
            children: node
                .children()
                .map(|c| c.iter().map(NodeSnapshot::from).collect())
                .unwrap_or_default(),
        }
    }
}

/// Pre-order walk over a snapshot.
pub struct SnapshotIter<'a> {
    stack: Vec<&'a NodeSnapshot>,
}

impl<'a> Iterator for SnapshotIter<'a> {
    type Item = &'a NodeSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

impl NodeSnapshot {
    pub fn iter(&self) -> SnapshotIter<'_> {
        SnapshotIter { stack: vec![self] }
    }
}
