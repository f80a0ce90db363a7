//! Surface stencil solver module
//!
//! This module provides a unified GPU/CPU abstraction for the per-step surface
//! updates. The core abstraction is the `StencilSolver` trait, which has both
//! CPU and GPU implementations producing the same grid state.
//!
//! # Feature Flags
//!
//! - `gpu` (default): Enables the GPU solver via wgpu. Disable with `--no-default-features`
//!   for environments without GPU access.
//!
//! # Example
//!
//! ```rust,ignore
//! use surface_sim_core::grid::SurfaceGrid;
//! use surface_sim_core::solver::{CpuStencilSolver, StencilSolver};
//!
//! let mut grid = SurfaceGrid::new(256, 256, 0.006)?;
//! grid.add_ripple(128, 128)?;
//! let mut solver = CpuStencilSolver::new();
//! solver.step_heightfield(&mut grid);
//! ```

mod cpu;
pub mod stencil;
#[allow(clippy::module_name_repetitions)]
mod r#trait;

#[cfg(feature = "gpu")]
mod gpu;
#[cfg(feature = "gpu")]
pub mod kernels;

// Re-exports
pub use cpu::{
    step_heightfield_cpu, step_heightfield_obstacle_cpu, step_procedural_cpu, CpuStencilSolver,
    MaskStrategy,
};
pub use r#trait::{StencilSolver, UpdateFamily};
pub use stencil::{DECAY, PROCEDURAL_TIME_SCALE};

#[cfg(feature = "gpu")]
pub use gpu::GpuStencilSolver;
#[cfg(feature = "gpu")]
pub use kernels::KernelKind;
