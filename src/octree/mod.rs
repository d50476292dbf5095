pub mod node;
pub mod query;
pub mod snapshot;

use tracing::{debug, error, warn};

use crate::config::OctreeConfig;
use crate::error::{OctreeError, Result};
use crate::types::{Cube, Point};

pub use node::{NodeKind, OctreeNode, octant_index};
pub use query::Neighbor;
pub use snapshot::NodeSnapshot;

use node::{LeafUpdate, Reporting};

/// How a successful position update was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moved {
    /// The new position stayed inside the owning leaf; coordinates were
    /// overwritten with no structural change.
    InPlace,
    /// The point was deleted and inserted again at its new position.
    Relocated,
}

/// A bounded point octree.
///
/// The root cube is fixed at construction. Leaves hold up to
/// `max_points` points and split on overflow until `max_depth`; a delete
/// that leaves all-leaf siblings with few enough points merges them back.
#[derive(Debug, Clone)]
pub struct Octree {
    root: OctreeNode,
    config: OctreeConfig,
    len: usize,
}

impl Octree {
    /// Empty tree covering `center ± half_size`, other parameters default.
    ///
    /// `half_size` must be positive and finite; nothing fits in the root
    /// otherwise. Use [`Octree::with_config`] to have it checked.
    pub fn new(center: Point, half_size: f32) -> Self {
        let config = OctreeConfig {
            max_size: half_size,
            ..Default::default()
        };
        Self::build(center, config)
    }

    /// Empty tree covering `center ± config.max_size`.
    pub fn with_config(center: Point, config: OctreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(center, config))
    }

    fn build(center: Point, config: OctreeConfig) -> Self {
        Self {
            root: OctreeNode::new(center, config.max_size, 0, config.max_points),
            config,
            len: 0,
        }
    }

    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    /// Depth of the deepest node currently in the tree.
    pub fn max_depth_reached(&self) -> u32 {
        self.root.deepest()
    }

    /// Every stored point, depth-first in octant-index order.
    pub fn points(&self) -> Vec<Point> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect_points(&mut out);
        out
    }

    /// Insert a point.
    ///
    /// Fails with [`OctreeError::OutOfBounds`] for non-finite points or
    /// points outside the root cube, and with [`OctreeError::Capacity`]
    /// when the destination leaf is full at `max_depth`. A failed insert
    /// leaves the tree unchanged. Duplicates are not checked here.
    pub fn insert(&mut self, point: Point) -> Result<()> {
        self.insert_with(point, Reporting::Verbose)
            .inspect_err(|e| warn!(%e, "Insert rejected"))
    }

    fn insert_with(&mut self, point: Point, reporting: Reporting) -> Result<()> {
        if !point.is_finite() || !self.root.bounds.contains_inclusive(point) {
            return Err(OctreeError::OutOfBounds { point });
        }
        self.root.insert(point, &self.config, reporting)?;
        self.len += 1;
        Ok(())
    }

    /// Delete one exact match of `point`. Absent points are a no-op.
    pub fn remove(&mut self, point: Point) -> bool {
        self.remove_with(point, Reporting::Verbose)
    }

    fn remove_with(&mut self, point: Point, reporting: Reporting) -> bool {
        let removed = self.root.remove(point, &self.config, reporting);
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Leaf owning an exact match of `point`.
    pub fn find(&self, point: Point) -> Option<&OctreeNode> {
        self.root.find(point)
    }

    pub fn contains(&self, point: Point) -> bool {
        self.find(point).is_some()
    }

    /// Move a stored point.
    ///
    /// Stays in place when `new` is still owned by the same leaf;
    /// otherwise the old point is deleted and `new` inserted. If that
    /// insert is rejected the old point is put back and
    /// [`OctreeError::MoveReverted`] is returned.
    pub fn update_position(&mut self, old: Point, new: Point) -> Result<Moved> {
        match self.root.update_in_leaf(old, new) {
            LeafUpdate::Missing => {
                warn!(point = %old, "Point to move not found");
                Err(OctreeError::NotFound(old))
            }
            LeafUpdate::Updated => {
                debug!(from = %old, to = %new, "Updated point in place");
                Ok(Moved::InPlace)
            }
            LeafUpdate::Outside => {
                self.remove(old);
                match self.insert(new) {
                    Ok(()) => {
                        debug!(from = %old, to = %new, "Relocated point");
                        Ok(Moved::Relocated)
                    }
                    Err(source) => {
                        if let Err(e) = self.insert(old) {
                            error!(%e, point = %old, "Failed to restore point after rejected move");
                        }
                        warn!(from = %old, to = %new, "Move rejected, reverted to old position");
                        Err(OctreeError::MoveReverted {
                            from: old,
                            to: new,
                            source: Box::new(source),
                        })
                    }
                }
            }
        }
    }

    /// All points inside the box `[min, max]`, bounds inclusive.
    pub fn query_range(&self, min: Point, max: Point) -> Vec<Point> {
        let mut out = Vec::new();
        query::range_query(&self.root, &Cube { min, max }, &mut out);
        debug!(count = out.len(), %min, %max, "Range query");
        out
    }

    /// Closest stored point other than `target` itself.
    pub fn nearest_neighbor(&self, target: Point) -> Option<Neighbor> {
        query::nearest_neighbor(&self.root, target)
    }

    /// Whether another point lies within `box_size` of `point` on every axis.
    ///
    /// `point` is inserted for the duration of the probe and removed
    /// again, so the stored content is unchanged afterwards.
    pub fn detect_collision(&mut self, point: Point, box_size: f32) -> bool {
        let inserted = self.insert_with(point, Reporting::Quiet).is_ok();

        let probe = Cube::around(point, box_size);
        let hits = self.query_range(probe.min, probe.max).len();

        if inserted {
            self.remove_with(point, Reporting::Quiet);
        }

        // The probe point matches its own box when it made it into the tree.
        let collision = hits > usize::from(inserted);
        if collision {
            debug!(%point, hits, "Collision detected");
        }
        collision
    }

    /// Drop every node and point, keeping the root cube.
    pub fn clear(&mut self) {
        self.root = OctreeNode::new(
            self.root.center,
            self.config.max_size,
            0,
            self.config.max_points,
        );
        self.len = 0;
    }

    /// Serializable copy of the whole structure.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot::from(&self.root)
    }
}
