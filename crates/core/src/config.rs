//! Simulation configuration
//!
//! Defaults reproduce the stock setup: a 1024x1024 grid at 0.006 spacing,
//! 16x16 work-groups and kernels rebuilt every step. Configurations can be
//! saved and loaded as JSON.

use crate::error::ConfigError;
use crate::grid::{ObstacleLayout, MAX_GRID_DIMENSION};
use crate::solver::MaskStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Default grid edge length in points
pub const DEFAULT_GRID_SIZE: usize = 1024;
/// Default lattice spacing
pub const DEFAULT_SPACING: f32 = 0.006;
/// Default work-group edge length
pub const DEFAULT_TILE_SIZE: u32 = 16;
/// Largest accepted work-group edge length
pub const MAX_TILE_SIZE: u32 = 32;

/// When device kernels are compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KernelPolicy {
    /// Build, run and release the kernel on every step
    #[default]
    RecompileEachStep,
    /// Build each kernel once and keep it for the solver's lifetime
    Cached,
}

/// Simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Grid width in points
    pub width: usize,
    /// Grid height in points
    pub height: usize,
    /// Distance between adjacent lattice points
    pub spacing: f32,
    /// Work-group edge length for device kernels
    pub tile_size: u32,
    /// Device kernel lifetime
    pub kernel_policy: KernelPolicy,
    /// Obstacle layout of the grid
    pub obstacle_layout: ObstacleLayout,
    /// How the CPU obstacle stencil skips obstacle points
    pub mask_strategy: MaskStrategy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_SIZE,
            height: DEFAULT_GRID_SIZE,
            spacing: DEFAULT_SPACING,
            tile_size: DEFAULT_TILE_SIZE,
            kernel_policy: KernelPolicy::default(),
            obstacle_layout: ObstacleLayout::default(),
            mask_strategy: MaskStrategy::default(),
        }
    }
}

impl SimulationConfig {
    /// Default configuration with a different grid size
    #[must_use]
    pub fn with_size(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Check every field without building anything.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dims = 1..=MAX_GRID_DIMENSION;
        if !dims.contains(&self.width) || !dims.contains(&self.height) {
            return Err(ConfigError::Invalid(format!(
                "grid {}x{} outside 1..={MAX_GRID_DIMENSION}",
                self.width, self.height
            )));
        }
        if !self.spacing.is_finite() || self.spacing <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "spacing {} must be finite and positive",
                self.spacing
            )));
        }
        if !(1..=MAX_TILE_SIZE).contains(&self.tile_size) {
            return Err(ConfigError::Invalid(format!(
                "tile_size {} outside 1..={MAX_TILE_SIZE}",
                self.tile_size
            )));
        }
        Ok(())
    }

    /// Load and validate a JSON configuration. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        info!("Loaded simulation config from {}", path.display());
        Ok(config)
    }

    /// Write the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!((config.width, config.height), (1024, 1024));
        assert_eq!(config.spacing, 0.006);
        assert_eq!(config.tile_size, 16);
        assert_eq!(config.kernel_policy, KernelPolicy::RecompileEachStep);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        assert!(SimulationConfig::with_size(0, 8).validate().is_err());
        let config = SimulationConfig {
            spacing: -1.0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
        let config = SimulationConfig {
            tile_size: 64,
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"width": 64, "kernel_policy": "Cached"}"#).unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, DEFAULT_GRID_SIZE);
        assert_eq!(config.kernel_policy, KernelPolicy::Cached);
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("surface-sim-config-{}.json", std::process::id()));
        let config = SimulationConfig {
            obstacle_layout: ObstacleLayout::BorderOnly,
            mask_strategy: MaskStrategy::Branchless,
            ..SimulationConfig::with_size(32, 16)
        };
        config.save(&path).unwrap();
        let loaded = SimulationConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let result = SimulationConfig::load("/nonexistent/surface-sim.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
