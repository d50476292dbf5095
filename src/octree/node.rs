use crate::config::OctreeConfig;
use crate::error::{OctreeError, Result};
use crate::types::{Cube, Point};

/// How loudly structural events are logged.
///
/// Collision probing inserts and removes a throwaway point; those events
/// go to `trace` so they don't drown out real edits at `debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reporting {
    Verbose,
    Quiet,
}

macro_rules! report {
    ($mode:expr, $($arg:tt)+) => {
        match $mode {
            Reporting::Verbose => tracing::debug!($($arg)+),
            Reporting::Quiet => tracing::trace!($($arg)+),
        }
    };
}

/// Payload of a node: either points or exactly eight children, never both.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Leaf(Vec<Point>),
    Internal(Box<[OctreeNode; 8]>),
}

/// A cube-shaped region of the octree.
#[derive(Debug, Clone)]
pub struct OctreeNode {
    pub center: Point,
    pub bounds: Cube,
    /// Half edge length.
    pub size: f32,
    /// Distance from the root (root = 0).
    pub depth: u32,
    pub kind: NodeKind,
}

/// Outcome of trying to move a stored point without leaving its leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeafUpdate {
    Missing,
    Updated,
    Outside,
}

/// Compute the octant index (0..7) for a point relative to a node centre.
///
/// Bit layout: 4 = x upper, 2 = y upper, 1 = z upper. "Upper" means
/// `>= center`, so the split is half-open and every point has exactly one
/// owning child.
pub fn octant_index(center: Point, p: Point) -> usize {
    let mut idx = 0;
    if p.x >= center.x {
        idx |= 4;
    }
    if p.y >= center.y {
        idx |= 2;
    }
    if p.z >= center.z {
        idx |= 1;
    }
    idx
}

/// Centre of the child cube for a given octant.
pub fn child_center(center: Point, half_size: f32, octant: usize) -> Point {
    let shift = |bit: usize| if octant & bit != 0 { half_size } else { -half_size };
    Point::new(center.x + shift(4), center.y + shift(2), center.z + shift(1))
}

/// Bounds of the child cube for a given octant.
///
/// Faces come from the parent's centre and bounds rather than from the
/// child's own centre, so siblings share the exact plane `octant_index`
/// splits on.
pub(crate) fn child_bounds(center: Point, parent: &Cube, octant: usize) -> Cube {
    let pick = |bit: usize, c: f32, lo: f32, hi: f32| {
        if octant & bit != 0 { (c, hi) } else { (lo, c) }
    };
    let (min_x, max_x) = pick(4, center.x, parent.min.x, parent.max.x);
    let (min_y, max_y) = pick(2, center.y, parent.min.y, parent.max.y);
    let (min_z, max_z) = pick(1, center.z, parent.min.z, parent.max.z);
    Cube {
        min: Point::new(min_x, min_y, min_z),
        max: Point::new(max_x, max_y, max_z),
    }
}

impl OctreeNode {
    /// Empty leaf covering `center ± size`.
    pub fn new(center: Point, size: f32, depth: u32, capacity: usize) -> Self {
        Self::with_bounds(center, Cube::around(center, size), size, depth, capacity)
    }

    fn with_bounds(center: Point, bounds: Cube, size: f32, depth: u32, capacity: usize) -> Self {
        Self {
            center,
            bounds,
            size,
            depth,
            kind: NodeKind::Leaf(Vec::with_capacity(capacity)),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Points held directly by this node (empty for internal nodes).
    pub fn points(&self) -> &[Point] {
        match &self.kind {
            NodeKind::Leaf(points) => points,
            NodeKind::Internal(_) => &[],
        }
    }

    /// The eight children, if this node is internal.
    pub fn children(&self) -> Option<&[OctreeNode; 8]> {
        match &self.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Internal(children) => Some(&**children),
        }
    }

    /// Count total nodes in the subtree (including self).
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .map(|c| c.iter().map(OctreeNode::node_count).sum::<usize>())
            .unwrap_or(0)
    }

    /// Count leaves in the subtree.
    pub fn leaf_count(&self) -> usize {
        match self.children() {
            None => 1,
            Some(children) => children.iter().map(OctreeNode::leaf_count).sum(),
        }
    }

    /// Depth of the deepest node in the subtree.
    pub fn deepest(&self) -> u32 {
        match self.children() {
            None => self.depth,
            Some(children) => children
                .iter()
                .map(OctreeNode::deepest)
                .max()
                .unwrap_or(self.depth),
        }
    }

    /// Append every stored point in depth-first, octant-index order.
    pub fn collect_points(&self, out: &mut Vec<Point>) {
        match &self.kind {
            NodeKind::Leaf(points) => out.extend_from_slice(points),
            NodeKind::Internal(children) => {
                for child in children.iter() {
                    child.collect_points(out);
                }
            }
        }
    }

    /// Owning leaf of `p`, following the same single path insertion took.
    pub fn find(&self, p: Point) -> Option<&OctreeNode> {
        match &self.kind {
            NodeKind::Leaf(points) => points.contains(&p).then_some(self),
            NodeKind::Internal(children) => children[octant_index(self.center, p)].find(p),
        }
    }

    pub(crate) fn insert(
        &mut self,
        p: Point,
        config: &OctreeConfig,
        reporting: Reporting,
    ) -> Result<()> {
        match &mut self.kind {
            NodeKind::Internal(children) => {
                let octant = octant_index(self.center, p);
                children[octant].insert(p, config, reporting)
            }
            NodeKind::Leaf(points) => {
                if points.len() < config.max_points {
                    points.push(p);
                    report!(reporting, point = %p, depth = self.depth, "Inserted point");
                    Ok(())
                } else if self.depth >= config.max_depth {
                    Err(OctreeError::Capacity {
                        point: p,
                        depth: self.depth,
                    })
                } else {
                    self.split_and_insert(p, config, reporting)
                }
            }
        }
    }

    /// Turn this full leaf into an internal node, push its points down,
    /// then route `p`. If `p` is rejected further down, the leaf is
    /// restored exactly as it was.
    fn split_and_insert(
        &mut self,
        p: Point,
        config: &OctreeConfig,
        reporting: Reporting,
    ) -> Result<()> {
        let held = self.split(config.max_points);
        report!(reporting, depth = self.depth, points = held.len(), "Split leaf");

        let result = held
            .iter()
            .chain(std::iter::once(&p))
            .try_for_each(|&q| self.insert(q, config, reporting));

        if result.is_err() {
            report!(reporting, depth = self.depth, "Undoing split after rejected insert");
            self.kind = NodeKind::Leaf(held);
        }
        result
    }

    /// Replace the leaf payload with eight empty children; returns the
    /// points that were held.
    fn split(&mut self, capacity: usize) -> Vec<Point> {
        let half = self.size / 2.0;
        let children: [OctreeNode; 8] = std::array::from_fn(|i| {
            OctreeNode::with_bounds(
                child_center(self.center, half, i),
                child_bounds(self.center, &self.bounds, i),
                half,
                self.depth + 1,
                capacity,
            )
        });
        match std::mem::replace(&mut self.kind, NodeKind::Internal(Box::new(children))) {
            NodeKind::Leaf(points) => points,
            NodeKind::Internal(_) => Vec::new(),
        }
    }

    /// Remove the first exact match of `p`. Returns whether a point was removed.
    pub(crate) fn remove(&mut self, p: Point, config: &OctreeConfig, reporting: Reporting) -> bool {
        match &mut self.kind {
            NodeKind::Leaf(points) => match points.iter().position(|q| *q == p) {
                Some(i) => {
                    // `Vec::remove` shifts the tail down, keeping order.
                    points.remove(i);
                    report!(reporting, point = %p, depth = self.depth, "Deleted point");
                    true
                }
                None => false,
            },
            NodeKind::Internal(children) => {
                let removed = children[octant_index(self.center, p)].remove(p, config, reporting);
                if removed {
                    self.try_merge(config, reporting);
                }
                removed
            }
        }
    }

    /// Collapse the children back into this node when they are all leaves
    /// and their combined points fit in one leaf.
    fn try_merge(&mut self, config: &OctreeConfig, reporting: Reporting) -> bool {
        let NodeKind::Internal(children) = &self.kind else {
            return false;
        };

        let mut total = 0;
        for child in children.iter() {
            match &child.kind {
                NodeKind::Leaf(points) => total += points.len(),
                NodeKind::Internal(_) => return false,
            }
        }
        if total > config.max_points {
            return false;
        }

        let mut merged = Vec::with_capacity(config.max_points);
        for child in children.iter() {
            merged.extend_from_slice(child.points());
        }
        self.kind = NodeKind::Leaf(merged);
        report!(reporting, depth = self.depth, points = total, "Merged children");
        true
    }

    /// Move `old` to `new` in place if `new` would be routed to the same
    /// leaf as `old`.
    pub(crate) fn update_in_leaf(&mut self, old: Point, new: Point) -> LeafUpdate {
        match &mut self.kind {
            NodeKind::Leaf(points) => match points.iter_mut().find(|q| **q == old) {
                None => LeafUpdate::Missing,
                Some(_) if !self.bounds.contains_half_open(new) => LeafUpdate::Outside,
                Some(slot) => {
                    *slot = new;
                    LeafUpdate::Updated
                }
            },
            NodeKind::Internal(children) => {
                let octant = octant_index(self.center, old);
                let child = &mut children[octant];
                if octant_index(self.center, new) != octant {
                    return match child.find(old) {
                        Some(_) => LeafUpdate::Outside,
                        None => LeafUpdate::Missing,
                    };
                }
                child.update_in_leaf(old, new)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_depth: u32) -> OctreeConfig {
        OctreeConfig {
            max_depth,
            ..Default::default()
        }
    }

    fn root() -> OctreeNode {
        OctreeNode::new(Point::default(), 1000.0, 0, 2)
    }

    fn stored(node: &OctreeNode) -> usize {
        let mut out = Vec::new();
        node.collect_points(&mut out);
        out.len()
    }

    #[test]
    fn octant_bits() {
        let c = Point::new(0.0, 0.0, 0.0);
        assert_eq!(octant_index(c, Point::new(-1.0, -1.0, -1.0)), 0);
        assert_eq!(octant_index(c, Point::new(-1.0, -1.0, 1.0)), 1);
        assert_eq!(octant_index(c, Point::new(-1.0, 1.0, -1.0)), 2);
        assert_eq!(octant_index(c, Point::new(1.0, -1.0, -1.0)), 4);
        assert_eq!(octant_index(c, Point::new(1.0, 1.0, 1.0)), 7);
        // Exactly on the centre goes to the upper side on every axis.
        assert_eq!(octant_index(c, c), 7);
    }

    #[test]
    fn child_centers_follow_octant_bits() {
        let c = Point::new(10.0, 20.0, 30.0);
        assert_eq!(child_center(c, 5.0, 0), Point::new(5.0, 15.0, 25.0));
        assert_eq!(child_center(c, 5.0, 4), Point::new(15.0, 15.0, 25.0));
        assert_eq!(child_center(c, 5.0, 7), Point::new(15.0, 25.0, 35.0));
    }

    #[test]
    fn children_tile_the_parent() {
        let mut node = root();
        let cfg = config(5);
        for p in [
            Point::new(1.0, 1.0, 1.0),
            Point::new(-1.0, -1.0, -1.0),
            Point::new(2.0, 2.0, 2.0),
        ] {
            node.insert(p, &cfg, Reporting::Quiet).unwrap();
        }
        let children = node.children().expect("root should have split");
        for (i, child) in children.iter().enumerate() {
            assert_eq!(child.depth, 1);
            assert_eq!(child.size, 500.0);
            assert_eq!(octant_index(node.center, child.center), i);
            assert!(node.bounds.contains_inclusive(child.bounds.min));
            assert!(node.bounds.contains_inclusive(child.bounds.max));
        }
    }

    #[test]
    fn leaf_fills_then_splits() {
        let mut node = root();
        let cfg = config(5);
        node.insert(Point::new(100.0, 100.0, 100.0), &cfg, Reporting::Quiet).unwrap();
        node.insert(Point::new(-100.0, 100.0, 100.0), &cfg, Reporting::Quiet).unwrap();
        assert!(node.is_leaf());
        assert_eq!(node.points().len(), 2);

        node.insert(Point::new(100.0, -100.0, 100.0), &cfg, Reporting::Quiet).unwrap();
        assert!(!node.is_leaf());
        assert!(node.points().is_empty());
        assert_eq!(stored(&node), 3);
        assert_eq!(node.node_count(), 9);
    }

    #[test]
    fn rejected_insert_undoes_split() {
        // max_depth 1: the root may split once; three points in the same
        // octant cannot be separated.
        let mut node = root();
        let cfg = config(1);
        node.insert(Point::new(1.0, 1.0, 1.0), &cfg, Reporting::Quiet).unwrap();
        node.insert(Point::new(2.0, 2.0, 2.0), &cfg, Reporting::Quiet).unwrap();

        let err = node
            .insert(Point::new(3.0, 3.0, 3.0), &cfg, Reporting::Quiet)
            .unwrap_err();
        assert!(matches!(err, OctreeError::Capacity { depth: 1, .. }));
        assert!(node.is_leaf(), "split must be rolled back");
        assert_eq!(
            node.points(),
            &[Point::new(1.0, 1.0, 1.0), Point::new(2.0, 2.0, 2.0)]
        );
    }

    #[test]
    fn capacity_at_max_depth_zero() {
        let mut node = root();
        let cfg = config(0);
        node.insert(Point::new(1.0, 0.0, 0.0), &cfg, Reporting::Quiet).unwrap();
        node.insert(Point::new(2.0, 0.0, 0.0), &cfg, Reporting::Quiet).unwrap();
        assert!(node.insert(Point::new(3.0, 0.0, 0.0), &cfg, Reporting::Quiet).is_err());
        assert_eq!(node.node_count(), 1);
    }

    #[test]
    fn remove_preserves_order() {
        let mut node = OctreeNode::new(Point::default(), 1000.0, 0, 3);
        let cfg = OctreeConfig {
            max_points: 3,
            ..Default::default()
        };
        let a = Point::new(1.0, 0.0, 0.0);
        let b = Point::new(2.0, 0.0, 0.0);
        let c = Point::new(3.0, 0.0, 0.0);
        for p in [a, b, c] {
            node.insert(p, &cfg, Reporting::Quiet).unwrap();
        }
        assert!(node.remove(a, &cfg, Reporting::Quiet));
        assert_eq!(node.points(), &[b, c]);
        assert!(!node.remove(a, &cfg, Reporting::Quiet));
    }

    #[test]
    fn merge_collects_children_in_index_order() {
        let mut node = root();
        let cfg = config(5);
        let hi = Point::new(100.0, 100.0, 100.0); // octant 7
        let lo = Point::new(-100.0, -100.0, -100.0); // octant 0
        let mid = Point::new(100.0, -100.0, -100.0); // octant 4
        for p in [hi, lo, mid] {
            node.insert(p, &cfg, Reporting::Quiet).unwrap();
        }
        assert!(!node.is_leaf());

        assert!(node.remove(mid, &cfg, Reporting::Quiet));
        assert!(node.is_leaf());
        assert_eq!(node.points(), &[lo, hi]);
    }

    #[test]
    fn merge_skipped_when_grandchildren_exist() {
        let mut node = root();
        let cfg = config(5);
        // Three points in octant 7 force a second-level split.
        let pts = [
            Point::new(100.0, 100.0, 100.0),
            Point::new(700.0, 700.0, 700.0),
            Point::new(800.0, 800.0, 100.0),
            Point::new(-100.0, -100.0, -100.0),
        ];
        for p in pts {
            node.insert(p, &cfg, Reporting::Quiet).unwrap();
        }
        assert!(node.remove(pts[3], &cfg, Reporting::Quiet));
        // Octant 7 is still internal, so the root must not collapse.
        assert!(!node.is_leaf());
        assert_eq!(stored(&node), 3);
    }

    #[test]
    fn update_in_leaf_outcomes() {
        let mut node = root();
        let cfg = config(5);
        let p = Point::new(10.0, 10.0, 10.0);
        node.insert(p, &cfg, Reporting::Quiet).unwrap();

        assert_eq!(
            node.update_in_leaf(Point::new(1.0, 1.0, 1.0), p),
            LeafUpdate::Missing
        );
        assert_eq!(
            node.update_in_leaf(p, Point::new(20.0, 10.0, 10.0)),
            LeafUpdate::Updated
        );
        assert_eq!(node.points(), &[Point::new(20.0, 10.0, 10.0)]);
        // Root max face is outside the half-open ownership test.
        assert_eq!(
            node.update_in_leaf(Point::new(20.0, 10.0, 10.0), Point::new(1000.0, 0.0, 0.0)),
            LeafUpdate::Outside
        );
    }

    #[test]
    fn siblings_share_the_split_plane() {
        // 0.1 and 0.3 are not exactly representable; child faces must
        // still coincide with the parent centre.
        let center = Point::new(0.1, 0.1, 0.1);
        let mut node = OctreeNode::new(center, 0.3, 0, 2);
        let cfg = config(5);
        for p in [
            Point::new(0.3, 0.3, 0.3),
            Point::new(-0.1, -0.1, -0.1),
            Point::new(0.3, -0.1, -0.1),
        ] {
            node.insert(p, &cfg, Reporting::Quiet).unwrap();
        }
        let children = node.children().unwrap();
        for (i, child) in children.iter().enumerate() {
            let (lo, hi) = if i & 4 != 0 {
                (center.x, node.bounds.max.x)
            } else {
                (node.bounds.min.x, center.x)
            };
            assert_eq!(child.bounds.min.x, lo);
            assert_eq!(child.bounds.max.x, hi);
        }
        assert_eq!(child_bounds(center, &node.bounds, 7).min, center);
        assert_eq!(child_bounds(center, &node.bounds, 0).max, center);
    }

    #[test]
    fn update_in_leaf_follows_routing_off_grid() {
        let center = Point::new(0.1, 0.1, 0.1);
        let mut node = OctreeNode::new(center, 0.3, 0, 2);
        let cfg = config(5);
        let a = Point::new(0.3, 0.3, 0.3);
        for p in [a, Point::new(-0.1, -0.1, -0.1), Point::new(0.3, -0.1, -0.1)] {
            node.insert(p, &cfg, Reporting::Quiet).unwrap();
        }

        // Just below the split plane belongs to the sibling octant.
        let below = Point::new(f32::from_bits(center.x.to_bits() - 1), a.y, a.z);
        assert_eq!(node.update_in_leaf(a, below), LeafUpdate::Outside);
        assert!(node.find(a).is_some());

        let on_plane = Point::new(center.x, a.y, a.z);
        assert_eq!(node.update_in_leaf(a, on_plane), LeafUpdate::Updated);
        assert!(node.find(on_plane).is_some());
    }
}
