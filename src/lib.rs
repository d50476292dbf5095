pub mod config;
pub mod error;
pub mod ingestion;
pub mod octree;
pub mod render;
#[cfg(feature = "server")]
pub mod server;
pub mod session;
pub mod types;

pub use config::{AppConfig, OctreeConfig, SessionConfig};
pub use error::{OctreeError, Result};
pub use octree::{Moved, Neighbor, Octree};
pub use types::{Cube, Point};
