//! Simulation modes
//!
//! Six modes pair an update family with a backend. Indices follow the
//! `family * 2 + device` numbering used by the UI and the C ABI.

use crate::solver::UpdateFamily;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Update family and backend applied on each step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SimulationMode {
    /// 0: procedural wave on the host
    #[default]
    ProceduralHost,
    /// 1: procedural wave on the device
    ProceduralDevice,
    /// 2: diffusion on the host
    DiffusionHost,
    /// 3: diffusion on the device
    DiffusionDevice,
    /// 4: obstacle-aware diffusion on the host
    ObstacleHost,
    /// 5: obstacle-aware diffusion on the device
    ObstacleDevice,
}

impl SimulationMode {
    /// Every mode in index order
    pub const ALL: [Self; 6] = [
        Self::ProceduralHost,
        Self::ProceduralDevice,
        Self::DiffusionHost,
        Self::DiffusionDevice,
        Self::ObstacleHost,
        Self::ObstacleDevice,
    ];

    /// Mode for a numeric index, `None` above 5.
    #[must_use]
    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Numeric index (0..=5)
    #[must_use]
    pub fn index(self) -> u32 {
        match self {
            Self::ProceduralHost => 0,
            Self::ProceduralDevice => 1,
            Self::DiffusionHost => 2,
            Self::DiffusionDevice => 3,
            Self::ObstacleHost => 4,
            Self::ObstacleDevice => 5,
        }
    }

    /// Update family; modes with equal `index / 2` share one.
    #[must_use]
    pub fn family(self) -> UpdateFamily {
        match self {
            Self::ProceduralHost | Self::ProceduralDevice => UpdateFamily::Procedural,
            Self::DiffusionHost | Self::DiffusionDevice => UpdateFamily::Diffusion,
            Self::ObstacleHost | Self::ObstacleDevice => UpdateFamily::Obstacle,
        }
    }

    /// Whether the mode dispatches kernels on the compute device
    #[must_use]
    pub fn runs_on_device(self) -> bool {
        self.index() % 2 == 1
    }

    /// Short stable name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ProceduralHost => "procedural",
            Self::ProceduralDevice => "procedural-device",
            Self::DiffusionHost => "heightfield",
            Self::DiffusionDevice => "heightfield-device",
            Self::ObstacleHost => "heightfield-obstacle",
            Self::ObstacleDevice => "heightfield-obstacle-device",
        }
    }
}

impl fmt::Display for SimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
