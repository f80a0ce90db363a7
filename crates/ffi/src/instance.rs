use std::ptr;
use std::sync::RwLock;

use surface_sim_core::{SimulationConfig, SimulationEngine};

use crate::error::{DefaultSurfaceSimError, SurfaceSimErrorCode};
use crate::helpers::{track_error, track_result};

/// Opaque surface simulation handle.
///
/// # Thread Safety
/// The engine sits behind an `RwLock`: point queries take a read lock, while
/// `surface_sim_advance` and the other commands take the write lock briefly.
/// Safe to call from a UI thread and a render thread at the same time.
///
/// ## C++ Example
/// ```cpp
/// SurfaceSimInstance* sim = nullptr;
/// if (surface_sim_new(1024, 1024, 0.006f, &sim) != SurfaceSimErrorCode::Ok) {
///     return;
/// }
/// surface_sim_set_mode(sim, 2);
/// surface_sim_add_disturbance(sim, 512, 512);
/// surface_sim_advance(sim, elapsed_ms);
/// surface_sim_destroy(sim);
/// ```
pub struct SurfaceSimInstance {
    pub(crate) engine: RwLock<SimulationEngine>,
}

impl SurfaceSimInstance {
    fn config(width: u32, height: u32, spacing: f32) -> SimulationConfig {
        SimulationConfig {
            spacing,
            ..SimulationConfig::with_size(width as usize, height as usize)
        }
    }

    /// Host-only instance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGridParameters` if the dimensions or spacing are rejected.
    pub(crate) fn new(
        width: u32,
        height: u32,
        spacing: f32,
    ) -> Result<Box<Self>, DefaultSurfaceSimError> {
        let engine = SimulationEngine::new(&Self::config(width, height, spacing))?;
        Ok(Box::new(Self {
            engine: RwLock::new(engine),
        }))
    }

    /// Instance with the fastest available compute device attached.
    ///
    /// Device discovery failures go to the process-wide fatal handler.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGridParameters` if the dimensions or spacing are rejected.
    #[cfg(feature = "gpu")]
    pub(crate) fn new_with_device(
        width: u32,
        height: u32,
        spacing: f32,
    ) -> Result<Box<Self>, DefaultSurfaceSimError> {
        let config = Self::config(width, height, spacing);
        config.validate()?;
        let device = surface_sim_core::ComputeDevice::new();
        let engine = SimulationEngine::with_device(&config, device)?;
        Ok(Box::new(Self {
            engine: RwLock::new(engine),
        }))
    }
}

fn write_instance(
    result: Result<Box<SurfaceSimInstance>, DefaultSurfaceSimError>,
    out_instance: *mut *mut SurfaceSimInstance,
) -> SurfaceSimErrorCode {
    match track_result(result) {
        Ok(instance) => {
            unsafe {
                *out_instance = Box::into_raw(instance);
            }
            SurfaceSimErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                *out_instance = ptr::null_mut();
            }
            code
        }
    }
}

/// Create a host-only simulation of `width x height` points.
///
/// Returns
/// - `Ok` - `out_instance` holds a valid pointer
/// - `NullPointer` - `out_instance` is null
/// - `InvalidGridParameters` - a dimension is outside `1..=16384` or spacing is not finite and positive
///
/// Device modes selected on a host-only instance abort the process on the next advance.
///
/// # Safety
///
/// - `out_instance` must be a valid pointer to writable memory.
/// - The caller owns the returned instance and must call `surface_sim_destroy` exactly once.
#[no_mangle]
pub unsafe extern "C" fn surface_sim_new(
    width: u32,
    height: u32,
    spacing: f32,
    out_instance: *mut *mut SurfaceSimInstance,
) -> SurfaceSimErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultSurfaceSimError::null_pointer("out_instance"));
    }
    write_instance(SurfaceSimInstance::new(width, height, spacing), out_instance)
}

/// Create a simulation that can run device modes.
///
/// Picks the fastest GPU across all backends. If no GPU exists, or a device is
/// already owned by another instance, the process aborts with a diagnostic.
///
/// # Safety
///
/// Same contract as `surface_sim_new`.
#[cfg(feature = "gpu")]
#[no_mangle]
pub unsafe extern "C" fn surface_sim_new_with_device(
    width: u32,
    height: u32,
    spacing: f32,
    out_instance: *mut *mut SurfaceSimInstance,
) -> SurfaceSimErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultSurfaceSimError::null_pointer("out_instance"));
    }
    write_instance(
        SurfaceSimInstance::new_with_device(width, height, spacing),
        out_instance,
    )
}

/// Destroy an instance created by `surface_sim_new*`, releasing its device.
///
/// A null `ptr` is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `surface_sim_new*` and not freed already.
/// - The caller must not use the pointer again.
#[no_mangle]
pub unsafe extern "C" fn surface_sim_destroy(ptr: *mut SurfaceSimInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: `ptr` came from `Box::into_raw` in `write_instance` and is live.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}
