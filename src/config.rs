use std::path::PathBuf;

use clap::Parser;

use crate::error::{OctreeError, Result};
use crate::types::Point;

/// Root half-extent used when none is given.
pub const MAX_SIZE: f32 = 1000.0;
/// Hard ceiling on node depth (root is depth 0).
pub const MAX_DEPTH: u32 = 5;
/// Leaf capacity before a split is attempted.
pub const MAX_POINTS: usize = 2;
/// Default collision half-box around a moving point.
pub const COLLISION_SIZE: f32 = 30.0;
/// Default movement step of the interactive session.
pub const STEP: f32 = 50.0;

/// Octree parameters. Fixed for the lifetime of a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct OctreeConfig {
    pub max_size: f32,
    pub max_depth: u32,
    pub max_points: usize,
    pub collision_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_size: MAX_SIZE,
            max_depth: MAX_DEPTH,
            max_points: MAX_POINTS,
            collision_size: COLLISION_SIZE,
        }
    }
}

impl OctreeConfig {
    /// Reject parameter combinations the tree cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_size.is_finite() && self.max_size > 0.0) {
            return Err(OctreeError::Config(format!(
                "max_size must be a positive finite number, got {}",
                self.max_size
            )));
        }
        if self.max_points == 0 {
            return Err(OctreeError::Config("max_points must be > 0".into()));
        }
        if !(self.collision_size.is_finite() && self.collision_size >= 0.0) {
            return Err(OctreeError::Config(format!(
                "collision_size must be a non-negative finite number, got {}",
                self.collision_size
            )));
        }
        Ok(())
    }
}

/// Interactive session parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub step: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { step: STEP }
    }
}

/// Fully resolved application configuration (constructed from CLI args).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input: Option<PathBuf>,
    pub tree_out: PathBuf,
    pub range_out: PathBuf,
    pub json: bool,
    pub select: Option<Point>,
    pub octree: OctreeConfig,
    pub session: SessionConfig,
    pub serve: Option<String>,
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: None,
            tree_out: PathBuf::from("Octree.txt"),
            range_out: PathBuf::from("RangeQuery.txt"),
            json: false,
            select: None,
            octree: OctreeConfig::default(),
            session: SessionConfig::default(),
            serve: None,
            verbose: false,
        }
    }
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "octree-engine",
    about = "Bounded 3-D point octree with range, nearest-neighbour and collision queries",
    version
)]
pub struct CliArgs {
    /// Point file, one "x y z" triple per line
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// Where the tree dump is written after every change
    #[arg(long, default_value = "Octree.txt")]
    pub tree_out: PathBuf,

    /// Where range query results are appended
    #[arg(long, default_value = "RangeQuery.txt")]
    pub range_out: PathBuf,

    /// Write the tree dump as JSON instead of indented text
    #[arg(long)]
    pub json: bool,

    /// Initially selected point for movement commands
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    pub select: Option<Vec<f32>>,

    /// Root half-extent
    #[arg(long, default_value_t = MAX_SIZE)]
    pub max_size: f32,

    /// Max octree depth
    #[arg(long, default_value_t = MAX_DEPTH)]
    pub max_depth: u32,

    /// Max points per leaf before splitting
    #[arg(long, default_value_t = MAX_POINTS)]
    pub max_points: usize,

    /// Collision half-box around a moving point
    #[arg(long, default_value_t = COLLISION_SIZE)]
    pub collision_size: f32,

    /// Movement step for w/a/s/d/e/f
    #[arg(long, default_value_t = STEP)]
    pub step: f32,

    /// Serve the HTTP API on this address instead of the interactive loop
    #[arg(long, value_name = "ADDR")]
    pub serve: Option<String>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl From<CliArgs> for AppConfig {
    fn from(args: CliArgs) -> Self {
        let select = args
            .select
            .as_deref()
            .and_then(|c| <[f32; 3]>::try_from(c).ok())
            .map(Point::from);

        AppConfig {
            input: args.input,
            tree_out: args.tree_out,
            range_out: args.range_out,
            json: args.json,
            select,
            octree: OctreeConfig {
                max_size: args.max_size,
                max_depth: args.max_depth,
                max_points: args.max_points,
                collision_size: args.collision_size,
            },
            session: SessionConfig { step: args.step },
            serve: args.serve,
            verbose: args.verbose,
        }
    }
}
