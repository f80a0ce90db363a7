//! Surface Simulation Core Library
//!
//! A height-field water surface simulation with a small GPU compute runtime.
//! A grid of points evolves under one of three update rules, each available as
//! a host loop and as a wgpu compute kernel that must agree numerically:
//!
//! - Procedural wave: a closed-form function of elapsed time
//! - Diffusion: a decaying Laplacian relaxation with clamped edges
//! - Obstacle-aware diffusion: the same relaxation around a static obstacle mask
//!
//! ## Compute Runtime
//!
//! With the default `gpu` feature, [`gpu::ComputeDevice`] picks the fastest GPU
//! across all backends and owns the only device context in the process. Every
//! runtime failure is unrecoverable and goes to a replaceable
//! [`fatal::FatalHandler`].

// Core types and utilities
pub mod core_types;
pub mod error;
pub mod fatal;

pub mod config;
pub mod grid;
pub mod simulation;
pub mod solver;

#[cfg(feature = "gpu")]
pub mod gpu;

// Re-export core types
pub use core_types::Vec4;
pub use error::{ComputeError, ConfigError, GridError};
pub use fatal::{FatalHandler, PanicOnFatal, ProcessAbort, SharedFatalHandler};

pub use config::{KernelPolicy, SimulationConfig};
pub use grid::{ObstacleLayout, SurfaceGrid};
pub use simulation::{SimulationEngine, SimulationMode};
pub use solver::{CpuStencilSolver, MaskStrategy, StencilSolver};

#[cfg(feature = "gpu")]
pub use gpu::ComputeDevice;
#[cfg(feature = "gpu")]
pub use solver::GpuStencilSolver;
