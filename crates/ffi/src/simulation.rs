use surface_sim_core::SimulationMode;

use crate::error::{DefaultSurfaceSimError, SurfaceSimErrorCode};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, with_engine_mut};
use crate::instance::SurfaceSimInstance;

/// Select the update mode (0-5, `family * 2 + device`).
///
/// Switching to a different update family zeroes the surface.
///
/// Returns `InvalidMode` for an index above 5, `NullPointer` for a null `ptr`.
#[no_mangle]
pub extern "C" fn surface_sim_set_mode(
    ptr: *const SurfaceSimInstance,
    mode: u32,
) -> SurfaceSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let mode =
            SimulationMode::from_index(mode).ok_or(DefaultSurfaceSimError::invalid_mode(mode))?;
        with_engine_mut(instance, |engine| engine.set_mode(mode))
    })
}

/// Advance one step. `elapsed_ms` is wall-clock milliseconds since start.
///
/// Device failures abort the process.
///
/// Returns `InvalidParameter` for a non-finite `elapsed_ms`.
#[no_mangle]
pub extern "C" fn surface_sim_advance(
    ptr: *const SurfaceSimInstance,
    elapsed_ms: f32,
) -> SurfaceSimErrorCode {
    handle_ffi_result_error(|| {
        if !elapsed_ms.is_finite() {
            return Err(DefaultSurfaceSimError::invalid_parameter(format!(
                "elapsed_ms must be finite, got {elapsed_ms}"
            )));
        }
        let instance = instance_from_ptr(ptr)?;
        with_engine_mut(instance, |engine| engine.advance(elapsed_ms))
    })
}

/// Inject a ripple at grid point `(x, y)`. Allowed in every mode.
///
/// Returns `OutOfBounds` if the point lies outside the grid.
#[no_mangle]
pub extern "C" fn surface_sim_add_disturbance(
    ptr: *const SurfaceSimInstance,
    x: i64,
    y: i64,
) -> SurfaceSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_engine_mut(instance, |engine| engine.add_disturbance(x, y))??;
        Ok(())
    })
}

/// Zero every height and accumulator value.
#[no_mangle]
pub extern "C" fn surface_sim_reset(ptr: *const SurfaceSimInstance) -> SurfaceSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_engine_mut(instance, surface_sim_core::SimulationEngine::reset)
    })
}
