//! Height-field surface simulation
//!
//! [`SimulationEngine`] drives a [`crate::grid::SurfaceGrid`] through one of six
//! [`SimulationMode`]s: the procedural wave, clamped diffusion and
//! obstacle-aware diffusion, each on the host or on the compute device.

mod engine;
pub mod mode;

pub use engine::SimulationEngine;
pub use mode::SimulationMode;
