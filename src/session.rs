//! Line-oriented command layer over an [`Octree`].
//!
//! Parsing and state changes live here; reading stdin and writing dump
//! files is left to the binary.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::config::SessionConfig;
use crate::error::OctreeError;
use crate::octree::{Moved, Neighbor, Octree};
use crate::types::Point;

/// Movement keys: `w`/`s` on y, `d`/`a` on x, `e`/`f` on z.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
    Right,
    Left,
    Up,
    Down,
}

impl Direction {
    /// Parse a single movement key.
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "w" => Direction::Forward,
            "s" => Direction::Back,
            "d" => Direction::Right,
            "a" => Direction::Left,
            "e" => Direction::Up,
            "f" => Direction::Down,
            _ => return None,
        })
    }

    /// `p` moved by `step` along this direction.
    pub fn apply(self, p: Point, step: f32) -> Point {
        match self {
            Direction::Forward => Point::new(p.x, p.y + step, p.z),
            Direction::Back => Point::new(p.x, p.y - step, p.z),
            Direction::Right => Point::new(p.x + step, p.y, p.z),
            Direction::Left => Point::new(p.x - step, p.y, p.z),
            Direction::Up => Point::new(p.x, p.y, p.z + step),
            Direction::Down => Point::new(p.x, p.y, p.z - step),
        }
    }
}

/// One parsed input line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Move(Direction),
    /// Nearest neighbour of the given point, or of the selection.
    Nearest(Option<Point>),
    Insert(Point),
    Delete(Point),
    Search(Point),
    Range { min: Point, max: Point },
    Select(Point),
    Print,
    Quit,
}

impl FromStr for Command {
    type Err = OctreeError;

    /// `s` and `d` alone are movement keys; followed by coordinates they
    /// mean search and delete.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let Some(head) = tokens.next() else {
            return Err(OctreeError::Input("empty command".into()));
        };
        let args = tokens
            .map(|t| {
                t.parse::<f32>()
                    .map_err(|e| OctreeError::Input(format!("invalid number {t:?}: {e}")))
            })
            .collect::<Result<Vec<f32>, _>>()?;

        let point = |args: &[f32]| -> Result<Point, OctreeError> {
            <[f32; 3]>::try_from(args).map(Point::from).map_err(|_| {
                OctreeError::Input(format!("{head} expects 3 coordinates, got {}", args.len()))
            })
        };

        match (head, args.len()) {
            ("q", 0) => Ok(Command::Quit),
            ("p", 0) => Ok(Command::Print),
            ("n", 0) => Ok(Command::Nearest(None)),
            ("n", _) => Ok(Command::Nearest(Some(point(&args)?))),
            ("i", _) => Ok(Command::Insert(point(&args)?)),
            ("d", n) if n > 0 => Ok(Command::Delete(point(&args)?)),
            ("s", n) if n > 0 => Ok(Command::Search(point(&args)?)),
            ("select", _) => Ok(Command::Select(point(&args)?)),
            ("r", 6) => Ok(Command::Range {
                min: point(&args[..3])?,
                max: point(&args[3..])?,
            }),
            ("r", n) => Err(OctreeError::Input(format!(
                "r expects 6 coordinates, got {n}"
            ))),
            (key, 0) => Direction::from_key(key)
                .map(Command::Move)
                .ok_or_else(|| OctreeError::Input(format!("unknown command {key:?}"))),
            (key, _) => Err(OctreeError::Input(format!("unknown command {key:?}"))),
        }
    }
}

/// Outcome of one command, ready to print.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Moved { from: Point, to: Point, how: Moved },
    OutOfBounds(Point),
    Collision(Point),
    MoveFailed(String),
    NoSelection,
    Nearest { target: Point, neighbor: Option<Neighbor> },
    Inserted(Point),
    Duplicate(Point),
    InsertFailed(String),
    Deleted(Point),
    NotDeleted(Point),
    Found(Point),
    NotFound(Point),
    Range(Vec<Point>),
    Selected(Point),
    Print,
    Quit,
}

impl Reply {
    /// Whether the tree changed, so a fresh dump is due.
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            Reply::Moved { .. } | Reply::Inserted(_) | Reply::Deleted(_)
        )
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Moved { to, how: Moved::InPlace, .. } => {
                write!(f, "Updated point in place within the same node to {to}")
            }
            Reply::Moved { from, to, how: Moved::Relocated } => {
                write!(f, "Updated point from {from} to {to}")
            }
            Reply::OutOfBounds(p) => write!(f, "Can't go out of the bounds: {p}"),
            Reply::Collision(p) => {
                write!(f, "Collision detected at {p}. Reverting to old position.")
            }
            Reply::MoveFailed(reason) => write!(f, "Move failed: {reason}"),
            Reply::NoSelection => write!(f, "No point selected. Use: select x y z"),
            Reply::Nearest {
                target,
                neighbor: Some(n),
            } => write!(
                f,
                "Nearest neighbor to {target} is {} with distance {:.2}",
                n.point, n.distance
            ),
            Reply::Nearest { neighbor: None, .. } => write!(f, "No nearest neighbor found."),
            Reply::Inserted(p) => write!(f, "Inserted point {p}"),
            Reply::Duplicate(p) => {
                write!(f, "Point {p} already exists in the octree. Skipping duplicate.")
            }
            Reply::InsertFailed(reason) => write!(f, "Insert failed: {reason}"),
            Reply::Deleted(p) => write!(f, "Deleted point {p}"),
            Reply::NotDeleted(p) => write!(f, "Point {p} not found, nothing deleted."),
            Reply::Found(p) => write!(f, "Point {p} found in the octree."),
            Reply::NotFound(p) => write!(f, "Point {p} not found in the octree."),
            Reply::Range(points) => write!(f, "Total points within the cube: {}", points.len()),
            Reply::Selected(p) => write!(f, "Selected point: {p}"),
            Reply::Print => write!(f, "Octree structure written."),
            Reply::Quit => write!(f, "Bye."),
        }
    }
}

/// An octree plus the currently selected point.
#[derive(Debug)]
pub struct Session {
    tree: Octree,
    selected: Option<Point>,
    config: SessionConfig,
}

impl Session {
    pub fn new(tree: Octree, config: SessionConfig) -> Self {
        Self {
            tree,
            selected: None,
            config,
        }
    }

    pub fn tree(&self) -> &Octree {
        &self.tree
    }

    pub fn selected(&self) -> Option<Point> {
        self.selected
    }

    pub fn into_tree(self) -> Octree {
        self.tree
    }

    pub fn apply(&mut self, command: Command) -> Reply {
        debug!(?command, "Applying command");
        match command {
            Command::Move(dir) => self.move_selected(dir),
            Command::Nearest(target) => match target.or(self.selected) {
                Some(target) => Reply::Nearest {
                    target,
                    neighbor: self.tree.nearest_neighbor(target),
                },
                None => Reply::NoSelection,
            },
            Command::Insert(p) => {
                if self.tree.contains(p) {
                    return Reply::Duplicate(p);
                }
                match self.tree.insert(p) {
                    Ok(()) => Reply::Inserted(p),
                    Err(e) => Reply::InsertFailed(e.to_string()),
                }
            }
            Command::Delete(p) => {
                if !self.tree.remove(p) {
                    return Reply::NotDeleted(p);
                }
                if self.selected == Some(p) && !self.tree.contains(p) {
                    self.selected = None;
                }
                Reply::Deleted(p)
            }
            Command::Search(p) => {
                if self.tree.contains(p) {
                    Reply::Found(p)
                } else {
                    Reply::NotFound(p)
                }
            }
            Command::Range { min, max } => Reply::Range(self.tree.query_range(min, max)),
            Command::Select(p) => self.select(p),
            Command::Print => Reply::Print,
            Command::Quit => Reply::Quit,
        }
    }

    /// Select a stored point for movement commands.
    pub fn select(&mut self, p: Point) -> Reply {
        if self.tree.contains(p) {
            self.selected = Some(p);
            Reply::Selected(p)
        } else {
            Reply::NotFound(p)
        }
    }

    /// Step the selection; refused when it would leave the root volume or
    /// land within the collision box of another point.
    fn move_selected(&mut self, dir: Direction) -> Reply {
        let Some(from) = self.selected else {
            return Reply::NoSelection;
        };
        let to = dir.apply(from, self.config.step);

        if !self.tree.root().bounds.contains_inclusive(to) {
            return Reply::OutOfBounds(to);
        }
        let box_size = self.tree.config().collision_size;
        if self.tree.detect_collision(to, box_size) {
            return Reply::Collision(to);
        }

        match self.tree.update_position(from, to) {
            Ok(how) => {
                self.selected = Some(to);
                Reply::Moved { from, to, how }
            }
            Err(e) => Reply::MoveFailed(e.to_string()),
        }
    }
}
