//! Stencil solver trait definition
//!
//! This module defines the `StencilSolver` trait, the backend-agnostic
//! interface for the three per-step surface updates. The CPU and GPU solvers
//! both implement it and must produce the same grid state for the same input.

use crate::grid::SurfaceGrid;

/// Which update rule a simulation step applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateFamily {
    /// Closed-form wave evaluated from elapsed time
    Procedural,
    /// Two-pass accumulator diffusion with clamped edges
    Diffusion,
    /// Diffusion that treats masked points as walls
    Obstacle,
}

/// Backend-agnostic interface for the surface update stencils
///
/// Every method reads and writes the caller's [`SurfaceGrid`]; solvers keep no
/// grid state between calls. Device failures inside a GPU solver go to the
/// device's fatal handler and never return.
pub trait StencilSolver {
    /// Overwrite every height with the procedural wave at `time`
    ///
    /// # Arguments
    ///
    /// * `grid` - Grid to update in place
    /// * `time` - Wave time (elapsed milliseconds times `PROCEDURAL_TIME_SCALE`)
    fn step_procedural(&mut self, grid: &mut SurfaceGrid, time: f32);

    /// One diffusion step: accumulate neighbour differences, then fold into heights
    fn step_heightfield(&mut self, grid: &mut SurfaceGrid);

    /// One diffusion step around the grid's obstacle mask
    ///
    /// Obstacle points keep both their height and accumulator unchanged, and
    /// open points read their own height in place of a blocked neighbour.
    fn step_heightfield_obstacle(&mut self, grid: &mut SurfaceGrid);

    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Check if this is the GPU backend
    ///
    /// # Returns
    ///
    /// `true` if GPU-accelerated, `false` if CPU-only
    fn is_gpu_accelerated(&self) -> bool;

    /// Dispatch to the update rule for `family`
    fn step(&mut self, family: UpdateFamily, grid: &mut SurfaceGrid, time: f32) {
        match family {
            UpdateFamily::Procedural => self.step_procedural(grid, time),
            UpdateFamily::Diffusion => self.step_heightfield(grid),
            UpdateFamily::Obstacle => self.step_heightfield_obstacle(grid),
        }
    }
}
