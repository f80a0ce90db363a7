//! Surface grid data model
//!
//! - [`SurfaceGrid`]: point buffer, height accumulator and lifecycle operations
//! - [`ObstacleMask`]: immutable padded obstacle flags

pub mod obstacle;
pub mod surface_grid;

pub use obstacle::{ObstacleLayout, ObstacleMask, OBSTACLE, OPEN};
pub use surface_grid::{SurfaceGrid, MAX_GRID_DIMENSION, RIPPLE_STRENGTH};
