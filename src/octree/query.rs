use serde::Serialize;

use crate::types::{Cube, Point};

use super::node::{NodeKind, OctreeNode};

/// Result of a nearest-neighbour search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub point: Point,
    /// True (not squared) Euclidean distance to the target.
    pub distance: f32,
}

/// Collect every point inside `query` (inclusive on both corners).
///
/// Subtrees whose cube does not touch the query box are skipped; surviving
/// internal nodes visit all eight children. Output is in depth-first,
/// octant-index order.
pub fn range_query(node: &OctreeNode, query: &Cube, out: &mut Vec<Point>) {
    if !node.bounds.overlaps(query) {
        return;
    }
    match &node.kind {
        NodeKind::Leaf(points) => {
            out.extend(points.iter().copied().filter(|p| query.contains_inclusive(*p)));
        }
        NodeKind::Internal(children) => {
            for child in children.iter() {
                range_query(child, query, out);
            }
        }
    }
}

/// Closest stored point to `target`, ignoring an exact match of `target`.
pub fn nearest_neighbor(root: &OctreeNode, target: Point) -> Option<Neighbor> {
    let mut search = NearestSearch {
        target,
        best: None,
        best_dist_sq: f32::MAX,
    };
    search.visit(root);
    search.best.map(|point| Neighbor {
        point,
        distance: search.best_dist_sq.sqrt(),
    })
}

struct NearestSearch {
    target: Point,
    best: Option<Point>,
    best_dist_sq: f32,
}

impl NearestSearch {
    fn visit(&mut self, node: &OctreeNode) {
        if node.bounds.distance_squared_to(self.target) > self.best_dist_sq {
            return;
        }
        match &node.kind {
            NodeKind::Leaf(points) => {
                for &p in points {
                    if p == self.target {
                        continue;
                    }
                    let d = p.distance_squared(self.target);
                    if d < self.best_dist_sq {
                        self.best_dist_sq = d;
                        self.best = Some(p);
                    }
                }
            }
            NodeKind::Internal(children) => {
                // Closest cubes first so the bound tightens early.
                let mut order: [(f32, usize); 8] = std::array::from_fn(|i| {
                    (children[i].bounds.distance_squared_to(self.target), i)
                });
                order.sort_by(|a, b| a.0.total_cmp(&b.0));
                for (_, i) in order {
                    self.visit(&children[i]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::config::OctreeConfig;
    use crate::octree::node::Reporting;

    fn build(points: &[Point]) -> OctreeNode {
        let cfg = OctreeConfig::default();
        let mut root = OctreeNode::new(Point::default(), cfg.max_size, 0, cfg.max_points);
        for &p in points {
            root.insert(p, &cfg, Reporting::Quiet).unwrap();
        }
        root
    }

    fn query(root: &OctreeNode, min: Point, max: Point) -> Vec<Point> {
        let mut out = Vec::new();
        range_query(root, &Cube { min, max }, &mut out);
        out
    }

    #[test]
    fn range_query_finds_only_inner_point() {
        let root = build(&[
            Point::new(0.0, 0.0, 0.0),
            Point::new(100.0, 100.0, 100.0),
            Point::new(-100.0, -100.0, -100.0),
        ]);
        let found = query(&root, Point::new(-10.0, -10.0, -10.0), Point::new(10.0, 10.0, 10.0));
        assert_eq!(found, vec![Point::new(0.0, 0.0, 0.0)]);
    }

    #[test]
    fn range_query_bounds_are_inclusive() {
        let root = build(&[Point::new(10.0, 10.0, 10.0), Point::new(-10.0, 0.0, 0.0)]);
        let found = query(&root, Point::new(-10.0, -10.0, -10.0), Point::new(10.0, 10.0, 10.0));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn range_query_traversal_order() {
        let lo = Point::new(-5.0, -5.0, -5.0); // octant 0
        let hi = Point::new(5.0, 5.0, 5.0); // octant 7
        let mid = Point::new(5.0, -5.0, -5.0); // octant 4
        let root = build(&[hi, mid, lo]);
        let found = query(&root, Point::new(-10.0, -10.0, -10.0), Point::new(10.0, 10.0, 10.0));
        assert_eq!(found, vec![lo, mid, hi]);
    }

    #[test]
    fn range_query_disjoint_box_is_empty() {
        let root = build(&[Point::new(1.0, 1.0, 1.0)]);
        let found = query(&root, Point::new(2000.0, 2000.0, 2000.0), Point::new(3000.0, 3000.0, 3000.0));
        assert!(found.is_empty());
    }

    #[test]
    fn nearest_excludes_self() {
        let root = build(&[Point::new(0.0, 0.0, 0.0), Point::new(5.0, 0.0, 0.0)]);
        let n = nearest_neighbor(&root, Point::new(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(n.point, Point::new(5.0, 0.0, 0.0));
        assert_relative_eq!(n.distance, 5.0);
    }

    #[test]
    fn nearest_on_empty_or_self_only_is_none() {
        let root = build(&[]);
        assert!(nearest_neighbor(&root, Point::new(1.0, 2.0, 3.0)).is_none());

        let root = build(&[Point::new(1.0, 2.0, 3.0)]);
        assert!(nearest_neighbor(&root, Point::new(1.0, 2.0, 3.0)).is_none());
    }

    #[test]
    fn nearest_crosses_octant_boundaries() {
        // Target sits just below the x split; the nearest point is across it.
        let points = [
            Point::new(1.0, 0.0, 0.0),
            Point::new(-40.0, 0.0, 0.0),
            Point::new(-500.0, -500.0, -500.0),
            Point::new(600.0, 600.0, 600.0),
        ];
        let root = build(&points);
        let n = nearest_neighbor(&root, Point::new(-1.0, 0.0, 0.0)).unwrap();
        assert_eq!(n.point, Point::new(1.0, 0.0, 0.0));
        assert_relative_eq!(n.distance, 2.0);
    }

    #[test]
    fn nearest_matches_brute_force() {
        let mut points = Vec::new();
        let mut seed = 7_u32;
        for _ in 0..60 {
            let mut next = || {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                ((seed >> 8) % 1800) as f32 - 900.0
            };
            points.push(Point::new(next(), next(), next()));
        }
        points.dedup();
        let cfg = OctreeConfig {
            max_depth: 10,
            ..Default::default()
        };
        let mut root = OctreeNode::new(Point::default(), cfg.max_size, 0, cfg.max_points);
        let mut stored = Vec::new();
        for &p in &points {
            if root.insert(p, &cfg, Reporting::Quiet).is_ok() {
                stored.push(p);
            }
        }

        for target in [
            Point::new(0.0, 0.0, 0.0),
            Point::new(333.0, -120.0, 45.0),
            Point::new(-999.0, 999.0, 0.0),
        ] {
            let expected = stored
                .iter()
                .filter(|&&p| p != target)
                .map(|&p| p.distance_squared(target))
                .fold(f32::MAX, f32::min);
            let n = nearest_neighbor(&root, target).unwrap();
            assert_relative_eq!(n.point.distance_squared(target), expected);
        }
    }
}
