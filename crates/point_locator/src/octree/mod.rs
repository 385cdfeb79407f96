//! Adaptive octree point locator.
//!
//! Leaves split into eight octants once they hold `max_points_per_leaf` ids,
//! so resolution follows the data instead of a fixed grid.
//!
//! # Module Structure
//!
//! - [`node`]: `OctreeNode` - partition and data bounds, membership tests,
//!   boundary distance
//! - [`tree`]: `Octree` - node arena, insertion state machine, searches
//! - `config`: `OctreeConfig` - leaf capacity, depth limit, tolerance
//! - `locator`: `OctreePointIndex` - root sizing and the locator interface

mod config;
mod locator;
pub mod node;
pub mod tree;

pub use config::OctreeConfig;
pub use locator::OctreePointIndex;
pub use node::{NodeContent, NodeId, OctreeNode};
pub use tree::{Octree, OctreeStats};
