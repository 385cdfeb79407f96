//! Uniform-grid point locator.
//!
//! Space inside the bounds is cut into `divisions[0] × divisions[1] ×
//! divisions[2]` equal buckets. Only occupied buckets are materialized, keyed
//! by `i + j·nx + k·nx·ny`.

mod config;
mod locator;
pub mod neighbors;

pub use config::GridConfig;
pub use locator::{GridPointIndex, GridStats};
