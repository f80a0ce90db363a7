//! Simulation engine
//!
//! `SimulationEngine` owns the surface grid and both solvers and exposes the
//! four commands the UI layer drives: set mode, advance, disturb and reset.

use super::mode::SimulationMode;
use crate::config::SimulationConfig;
use crate::core_types::Vec4;
use crate::error::{ComputeError, ConfigError, GridResult};
use crate::fatal::{default_handler, SharedFatalHandler};
use crate::grid::SurfaceGrid;
use crate::solver::{CpuStencilSolver, StencilSolver, UpdateFamily, PROCEDURAL_TIME_SCALE};
use tracing::{debug, info};

#[cfg(feature = "gpu")]
use crate::gpu::ComputeDevice;
#[cfg(feature = "gpu")]
use crate::solver::GpuStencilSolver;
#[cfg(feature = "gpu")]
use std::sync::Arc;

/// Height-field surface simulation
///
/// Host modes always work. Device modes need a [`ComputeDevice`] supplied at
/// construction; selecting one without a device is fatal on the next step.
pub struct SimulationEngine {
    grid: SurfaceGrid,
    mode: SimulationMode,
    cpu: CpuStencilSolver,
    #[cfg(feature = "gpu")]
    gpu: Option<GpuStencilSolver>,
    fatal: SharedFatalHandler,
    steps: u64,
}

impl SimulationEngine {
    /// Create a host-only engine
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any configured field is invalid, including a
    /// tile size no device kernel could be built with.
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = SurfaceGrid::with_layout(
            config.width,
            config.height,
            config.spacing,
            config.obstacle_layout,
        )?;
        info!(
            "Created simulation engine: {}x{} grid, host only",
            config.width, config.height
        );
        Ok(Self {
            grid,
            mode: SimulationMode::default(),
            cpu: CpuStencilSolver::with_mask_strategy(config.mask_strategy),
            #[cfg(feature = "gpu")]
            gpu: None,
            fatal: default_handler(),
            steps: 0,
        })
    }

    /// Create an engine that can run device modes on `device`
    ///
    /// The engine adopts the device's fatal handler.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any configured field is invalid or the tile
    /// does not fit the device's work-group limits.
    #[cfg(feature = "gpu")]
    pub fn with_device(
        config: &SimulationConfig,
        device: ComputeDevice,
    ) -> Result<Self, ConfigError> {
        device
            .work_group_limits()
            .check(config.tile_size, config.tile_size)
            .map_err(|reason| {
                ConfigError::Invalid(format!("tile_size {}: {reason}", config.tile_size))
            })?;
        let mut engine = Self::new(config)?;
        engine.fatal = Arc::clone(device.fatal_handler());
        info!("Attached compute device '{}'", device.adapter_name());
        engine.gpu = Some(GpuStencilSolver::new(
            device,
            config.tile_size,
            config.kernel_policy,
        ));
        Ok(engine)
    }

    /// Replace the handler used for engine-level fatal errors
    #[must_use]
    pub fn with_fatal_handler(mut self, fatal: SharedFatalHandler) -> Self {
        self.fatal = fatal;
        self
    }

    /// Select the mode used by subsequent steps.
    ///
    /// Switching to a different update family resets the grid first.
    pub fn set_mode(&mut self, mode: SimulationMode) {
        if mode.family() != self.mode.family() {
            debug!("Mode family change {} -> {}, resetting", self.mode, mode);
            self.grid.reset();
        }
        self.mode = mode;
    }

    /// Advance one step.
    ///
    /// `elapsed_ms` is wall-clock time since start; only the procedural modes
    /// use it. Device failures never return.
    pub fn advance(&mut self, elapsed_ms: f32) {
        let time = elapsed_ms * PROCEDURAL_TIME_SCALE;
        let family = self.mode.family();
        if self.mode.runs_on_device() {
            self.advance_on_device(family, time);
        } else {
            self.cpu.step(family, &mut self.grid, time);
        }
        self.steps += 1;
    }

    #[cfg(feature = "gpu")]
    fn advance_on_device(&mut self, family: UpdateFamily, time: f32) {
        match self.gpu.as_mut() {
            Some(solver) => solver.step(family, &mut self.grid, time),
            None => device_unavailable(&self.fatal, self.mode),
        }
    }

    #[cfg(not(feature = "gpu"))]
    fn advance_on_device(&mut self, _family: UpdateFamily, _time: f32) {
        device_unavailable(&self.fatal, self.mode);
    }

    /// Inject a ripple at grid point `(x, y)`. Works in every mode.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GridError::OutOfBounds`] outside the grid.
    pub fn add_disturbance(&mut self, x: i64, y: i64) -> GridResult<()> {
        self.grid.add_ripple(x, y)
    }

    /// Zero every height and accumulator value.
    pub fn reset(&mut self) {
        self.grid.reset();
    }

    /// Current point positions for drawing
    #[must_use]
    pub fn points(&self) -> &[Vec4] {
        self.grid.points()
    }

    /// The surface grid
    #[must_use]
    pub fn grid(&self) -> &SurfaceGrid {
        &self.grid
    }

    /// Current mode
    #[must_use]
    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    /// Steps advanced since construction
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Whether device modes can run
    #[must_use]
    pub fn has_device(&self) -> bool {
        #[cfg(feature = "gpu")]
        {
            self.gpu.is_some()
        }
        #[cfg(not(feature = "gpu"))]
        {
            false
        }
    }

    /// Name of the attached compute device, if any
    #[must_use]
    pub fn device_name(&self) -> Option<&str> {
        #[cfg(feature = "gpu")]
        {
            self.gpu.as_ref().map(|solver| solver.device().adapter_name())
        }
        #[cfg(not(feature = "gpu"))]
        {
            None
        }
    }
}

fn device_unavailable(fatal: &SharedFatalHandler, mode: SimulationMode) -> ! {
    fatal.fatal(&ComputeError::DeviceUnavailable { mode: mode.name() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fatal::PanicOnFatal;
    use crate::grid::RIPPLE_STRENGTH;
    use std::sync::Arc;

    fn small_engine() -> SimulationEngine {
        SimulationEngine::new(&SimulationConfig::with_size(24, 18)).unwrap()
    }

    #[test]
    fn test_default_mode_is_procedural_host() {
        let engine = small_engine();
        assert_eq!(engine.mode(), SimulationMode::ProceduralHost);
        assert!(!engine.has_device());
        assert_eq!(engine.device_name(), None);
    }

    #[test]
    fn test_family_switch_resets() {
        let mut engine = small_engine();
        engine.set_mode(SimulationMode::DiffusionHost);
        engine.add_disturbance(5, 5).unwrap();
        engine.advance(0.0);
        assert!(engine.points().iter().any(|p| p.y != 0.0));

        engine.set_mode(SimulationMode::ProceduralHost);
        assert!(engine.points().iter().all(|p| p.y == 0.0));
        assert!(engine.grid().accumulator().iter().all(|&a| a == 0.0));
    }

    #[test]
    fn test_same_family_keeps_state() {
        let mut engine = small_engine();
        engine.set_mode(SimulationMode::DiffusionHost);
        engine.add_disturbance(5, 5).unwrap();
        engine.set_mode(SimulationMode::DiffusionDevice);
        assert_eq!(engine.grid().accumulator_at(5, 5), RIPPLE_STRENGTH);
    }

    #[test]
    fn test_diffusion_to_obstacle_resets() {
        let mut engine = small_engine();
        engine.set_mode(SimulationMode::DiffusionHost);
        engine.add_disturbance(2, 2).unwrap();
        engine.set_mode(SimulationMode::ObstacleHost);
        assert_eq!(engine.grid().accumulator_at(2, 2), 0.0);
    }

    #[test]
    fn test_disturbance_in_procedural_mode() {
        let mut engine = small_engine();
        engine.add_disturbance(1, 1).unwrap();
        assert_eq!(engine.grid().accumulator_at(1, 1), RIPPLE_STRENGTH);
        assert!(engine.add_disturbance(24, 0).is_err());
    }

    #[test]
    fn test_procedural_uses_scaled_time() {
        let mut engine = small_engine();
        engine.advance(400.0);
        let expected =
            crate::solver::stencil::procedural_height(3, 4, engine.grid().spacing(), 20.0);
        assert_eq!(engine.grid().height_at(3, 4), expected);
        assert_eq!(engine.steps(), 1);
    }

    #[test]
    fn test_zero_tile_rejected_at_construction() {
        let config = SimulationConfig {
            tile_size: 0,
            ..SimulationConfig::with_size(8, 8)
        };
        assert!(matches!(
            SimulationEngine::new(&config),
            Err(ConfigError::Invalid(msg)) if msg.contains("tile_size 0")
        ));
        let config = SimulationConfig {
            tile_size: 33,
            ..config
        };
        assert!(SimulationEngine::new(&config).is_err());
    }

    #[test]
    #[should_panic(expected = "fatal device selection")]
    fn test_device_mode_without_device_is_fatal() {
        let mut engine = small_engine().with_fatal_handler(Arc::new(PanicOnFatal));
        engine.set_mode(SimulationMode::DiffusionDevice);
        engine.advance(0.0);
    }
}
