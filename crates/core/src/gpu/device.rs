//! Compute device discovery and ownership
//!
//! A [`ComputeDevice`] walks every graphics backend, keeps GPU-class adapters
//! and opens a context on the one with the highest throughput score. At most
//! one device may be alive per process; a second claim fails until the first
//! device is dropped.

use crate::error::{ComputeError, ComputeResult};
use crate::fatal::{default_handler, SharedFatalHandler};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Backends probed during discovery, in probe order. Each acts as a platform.
pub const PLATFORMS: [(wgpu::Backends, &str); 4] = [
    (wgpu::Backends::VULKAN, "Vulkan"),
    (wgpu::Backends::METAL, "Metal"),
    (wgpu::Backends::DX12, "DirectX 12"),
    (wgpu::Backends::GL, "OpenGL"),
];

static DEVICE_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Process-wide single-device token, released on drop
#[derive(Debug)]
struct DeviceClaim;

impl DeviceClaim {
    fn acquire() -> ComputeResult<Self> {
        DEVICE_CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self)
            .map_err(|_| ComputeError::DeviceAlreadyClaimed)
    }
}

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        DEVICE_CLAIMED.store(false, Ordering::Release);
    }
}

/// Relative clock weight of a device class, `None` for non-GPU adapters.
///
/// Backends do not expose clock rates; discrete parts are assumed to clock
/// highest and software adapters are excluded.
#[must_use]
pub fn clock_weight(device_type: wgpu::DeviceType) -> Option<u32> {
    match device_type {
        wgpu::DeviceType::DiscreteGpu => Some(4),
        wgpu::DeviceType::IntegratedGpu => Some(2),
        wgpu::DeviceType::VirtualGpu => Some(1),
        wgpu::DeviceType::Cpu | wgpu::DeviceType::Other => None,
    }
}

/// A GPU-class adapter considered during selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCandidate {
    /// Adapter name reported by the driver
    pub name: String,
    /// Platform (backend) the adapter was found on
    pub platform: &'static str,
    /// Parallel compute capacity. Uses the per-workgroup invocation limit.
    pub compute_units: u32,
    /// Relative clock weight from [`clock_weight`]
    pub clock_weight: u32,
    /// Largest permitted local work size product
    pub max_work_group_size: u32,
}

impl DeviceCandidate {
    /// Profile an adapter, returning `None` if it is not GPU-class.
    #[must_use]
    pub fn from_adapter(adapter: &wgpu::Adapter, platform: &'static str) -> Option<Self> {
        let info = adapter.get_info();
        let clock_weight = clock_weight(info.device_type)?;
        let limits = adapter.limits();
        Some(Self {
            name: info.name,
            platform,
            compute_units: limits.max_compute_invocations_per_workgroup,
            clock_weight,
            max_work_group_size: limits.max_compute_invocations_per_workgroup,
        })
    }

    /// `compute_units * clock_weight`
    #[must_use]
    pub fn throughput_score(&self) -> u64 {
        u64::from(self.compute_units) * u64::from(self.clock_weight)
    }
}

/// Index of the candidate with the strictly highest throughput score.
///
/// Ties keep the earliest candidate. Returns `None` for an empty slice.
#[must_use]
pub fn select_fastest(candidates: &[DeviceCandidate]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = candidate.throughput_score();
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

/// An opened compute context on the fastest GPU in the system
///
/// Owns the device and its in-order queue. Every failure during allocation,
/// compilation, dispatch or read-back is handed to the fatal handler.
pub struct ComputeDevice {
    pub(crate) device: Arc<wgpu::Device>,
    pub(crate) queue: Arc<wgpu::Queue>,
    adapter_info: wgpu::AdapterInfo,
    max_work_group_size: u32,
    fatal: SharedFatalHandler,
    // Dropped last so the context is gone before another claim succeeds
    _claim: DeviceClaim,
}

impl std::fmt::Debug for ComputeDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeDevice")
            .field("adapter", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .field("max_work_group_size", &self.max_work_group_size)
            .finish_non_exhaustive()
    }
}

impl ComputeDevice {
    /// Discover and open the fastest GPU, aborting the process on failure.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fatal_handler(default_handler())
    }

    /// Discover and open the fastest GPU, sending any failure to `fatal`.
    #[must_use]
    pub fn with_fatal_handler(fatal: SharedFatalHandler) -> Self {
        match Self::try_new(Arc::clone(&fatal)) {
            Ok(device) => device,
            Err(e) => fatal.fatal(&e),
        }
    }

    /// Discover and open the fastest GPU.
    ///
    /// Later failures on the returned device still go to `fatal`.
    ///
    /// # Errors
    ///
    /// - [`ComputeError::DeviceAlreadyClaimed`] if another device is alive
    /// - [`ComputeError::NoPlatform`] if no backend reports any adapter
    /// - [`ComputeError::NoGpuDevice`] if no backend exposes a GPU
    /// - [`ComputeError::ContextCreation`] if the chosen adapter refuses a device
    pub fn try_new(fatal: SharedFatalHandler) -> ComputeResult<Self> {
        let claim = DeviceClaim::acquire()?;

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let mut found_platform = false;
        let mut candidates: Vec<(wgpu::Adapter, DeviceCandidate)> = Vec::new();
        for (backend, platform) in PLATFORMS {
            let adapters = instance.enumerate_adapters(backend);
            if adapters.is_empty() {
                debug!("Platform {} reports no adapters", platform);
                continue;
            }
            found_platform = true;
            for adapter in adapters {
                match DeviceCandidate::from_adapter(&adapter, platform) {
                    Some(candidate) => {
                        debug!(
                            "Found GPU '{}' on {} (score {})",
                            candidate.name,
                            platform,
                            candidate.throughput_score()
                        );
                        candidates.push((adapter, candidate));
                    }
                    None => debug!(
                        "Skipping non-GPU adapter '{}' on {}",
                        adapter.get_info().name,
                        platform
                    ),
                }
            }
        }

        if !found_platform {
            return Err(ComputeError::NoPlatform);
        }

        let profiles: Vec<DeviceCandidate> = candidates.iter().map(|(_, c)| c.clone()).collect();
        let best = select_fastest(&profiles).ok_or(ComputeError::NoGpuDevice)?;
        let (adapter, chosen) = candidates.swap_remove(best);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Surface Sim Compute Device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| ComputeError::ContextCreation {
            adapter: chosen.name.clone(),
            reason: e.to_string(),
        })?;

        let uncaptured = Arc::clone(&fatal);
        device.on_uncaptured_error(Box::new(move |error: wgpu::Error| {
            uncaptured.fatal(&ComputeError::Uncaptured(error.to_string()));
        }));

        info!(
            "Compute device selected: {} on {} (score {})",
            chosen.name,
            chosen.platform,
            chosen.throughput_score()
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info: adapter.get_info(),
            max_work_group_size: chosen.max_work_group_size,
            fatal,
            _claim: claim,
        })
    }

    /// Whether a device is currently claimed in this process
    #[must_use]
    pub fn is_claimed() -> bool {
        DEVICE_CLAIMED.load(Ordering::Acquire)
    }

    /// Get adapter name for logging
    #[must_use]
    pub fn adapter_name(&self) -> &str {
        &self.adapter_info.name
    }

    /// Get adapter information
    #[must_use]
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Largest permitted local work size product
    #[must_use]
    pub fn max_work_group_size(&self) -> u32 {
        self.max_work_group_size
    }

    /// Handler that receives this device's failures
    #[must_use]
    pub fn fatal_handler(&self) -> &SharedFatalHandler {
        &self.fatal
    }

    /// Hand `error` to the fatal handler.
    pub fn fail(&self, error: &ComputeError) -> ! {
        self.fatal.fatal(error)
    }
}

impl Default for ComputeDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `op` inside validation and out-of-memory error scopes.
///
/// Returns the driver message of the first captured error.
pub(crate) fn capture_errors<T>(device: &wgpu::Device, op: impl FnOnce() -> T) -> Result<T, String> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = op();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    match validation.or(out_of_memory) {
        Some(error) => Err(error.to_string()),
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, compute_units: u32, clock_weight: u32) -> DeviceCandidate {
        DeviceCandidate {
            name: name.to_string(),
            platform: "Vulkan",
            compute_units,
            clock_weight,
            max_work_group_size: 256,
        }
    }

    #[test]
    fn test_select_fastest_prefers_highest_score() {
        let candidates = [
            candidate("integrated", 256, 2),
            candidate("discrete", 1024, 4),
            candidate("virtual", 1024, 1),
        ];
        assert_eq!(select_fastest(&candidates), Some(1));
    }

    #[test]
    fn test_select_fastest_tie_keeps_first() {
        let candidates = [candidate("a", 512, 2), candidate("b", 256, 4)];
        assert_eq!(select_fastest(&candidates), Some(0));
    }

    #[test]
    fn test_select_fastest_empty() {
        assert_eq!(select_fastest(&[]), None);
    }

    #[test]
    fn test_clock_weight_excludes_software() {
        assert_eq!(clock_weight(wgpu::DeviceType::Cpu), None);
        assert_eq!(clock_weight(wgpu::DeviceType::Other), None);
        assert!(
            clock_weight(wgpu::DeviceType::DiscreteGpu)
                > clock_weight(wgpu::DeviceType::IntegratedGpu)
        );
    }
}
