//! Error types for the surface simulation.
//!
//! Compute-runtime failures ([`ComputeError`]) are never returned to simulation
//! callers: they are handed to a [`crate::fatal::FatalHandler`] which aborts.
//! Grid and configuration failures are ordinary recoverable results.

use thiserror::Error;

/// Failure inside the compute runtime.
///
/// Variants are grouped the way the runtime fails: discovery, resource
/// creation, compilation, and dispatch/read-back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComputeError {
    /// No compute platform (graphics backend) reported any adapter.
    #[error("Did not find any compute platform")]
    NoPlatform,

    /// Platforms exist but none exposes a GPU-class device.
    #[error("Did not find an available GPU device")]
    NoGpuDevice,

    /// A device-backed mode was requested but the engine has no device.
    #[error("Mode '{mode}' requires a compute device but none is attached")]
    DeviceUnavailable {
        /// Name of the requested mode
        mode: &'static str,
    },

    /// Device context or queue creation failed.
    #[error("Cannot create compute context on '{adapter}': {reason}")]
    ContextCreation {
        /// Adapter the context was requested on
        adapter: String,
        /// Driver message
        reason: String,
    },

    /// Another `ComputeDevice` is alive in this process.
    #[error("A compute device is already claimed by this process")]
    DeviceAlreadyClaimed,

    /// Device memory allocation failed.
    #[error("Cannot allocate device memory for '{label}' ({size} bytes): {reason}")]
    BufferAllocation {
        /// Buffer label
        label: String,
        /// Requested size in bytes
        size: u64,
        /// Driver message
        reason: String,
    },

    /// Kernel source failed to build. `log` holds the compiler diagnostics.
    #[error("Cannot build program '{entry_point}'\n{log}")]
    Compilation {
        /// Entry point that was being built
        entry_point: String,
        /// Full compiler diagnostic log
        log: String,
    },

    /// Kernel enqueue failed.
    #[error("Cannot run kernel '{entry_point}': {reason}")]
    Dispatch {
        /// Entry point being dispatched
        entry_point: String,
        /// Reason for the failure
        reason: String,
    },

    /// Copy back from device memory failed.
    #[error("Cannot copy back from device: {0}")]
    ReadBack(String),

    /// An error the device reported outside any operation scope.
    #[error("Uncaptured device error: {0}")]
    Uncaptured(String),
}

impl ComputeError {
    /// Short name of the failing operation class, used in diagnostics.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::NoPlatform | Self::NoGpuDevice => "device discovery",
            Self::DeviceUnavailable { .. } => "device selection",
            Self::ContextCreation { .. } | Self::DeviceAlreadyClaimed => "context creation",
            Self::BufferAllocation { .. } => "buffer allocation",
            Self::Compilation { .. } => "kernel compilation",
            Self::Dispatch { .. } | Self::Uncaptured(_) => "kernel dispatch",
            Self::ReadBack(_) => "buffer read-back",
        }
    }
}

/// Convenience alias for `Result<T, ComputeError>`.
pub type ComputeResult<T> = Result<T, ComputeError>;

/// Invalid grid construction or access.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GridError {
    /// Width or height outside `1..=MAX_GRID_DIMENSION`.
    #[error("Invalid grid dimensions {width}x{height} (each must be in 1..={max})")]
    InvalidDimensions {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
        /// Largest accepted dimension
        max: usize,
    },

    /// Spacing must be finite and positive.
    #[error("Invalid grid spacing {0} (must be finite and positive)")]
    InvalidSpacing(f32),

    /// A grid coordinate fell outside `[0, width) x [0, height)`.
    #[error("Grid coordinate ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        /// Requested column
        x: i64,
        /// Requested row
        y: i64,
        /// Grid width
        width: usize,
        /// Grid height
        height: usize,
    },
}

/// Convenience alias for `Result<T, GridError>`.
pub type GridResult<T> = Result<T, GridError>;

/// Failure loading or saving a [`crate::SimulationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed.
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file was not valid JSON for the config schema.
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The config describes an unusable grid or tile.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// The grid rejected the configured layout.
    #[error(transparent)]
    Grid(#[from] GridError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compilation_error_carries_log() {
        let err = ComputeError::Compilation {
            entry_point: "heightfield_p1".to_string(),
            log: "error: expected ';'".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("heightfield_p1"));
        assert!(msg.contains("expected ';'"));
        assert_eq!(err.operation(), "kernel compilation");
    }

    #[test]
    fn test_operation_classes() {
        assert_eq!(ComputeError::NoPlatform.operation(), "device discovery");
        assert_eq!(ComputeError::DeviceAlreadyClaimed.operation(), "context creation");
        assert_eq!(
            ComputeError::ReadBack("map failed".into()).operation(),
            "buffer read-back"
        );
    }
}
