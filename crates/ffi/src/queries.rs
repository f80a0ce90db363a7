use crate::error::{DefaultSurfaceSimError, SurfaceSimErrorCode};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, track_result, with_engine};
use crate::instance::SurfaceSimInstance;

/// Grid and mode summary for a UI frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceSimInfo {
    /// Points per row
    pub width: u32,
    /// Rows
    pub height: u32,
    /// Lattice spacing
    pub spacing: f32,
    /// Current mode index (0-5)
    pub mode: u32,
    /// Steps advanced so far
    pub steps: u64,
    /// Whether device modes can run
    pub has_device: bool,
}

/// Number of points (`width * height`). Returns 0 for a null `ptr`.
#[no_mangle]
pub extern "C" fn surface_sim_point_count(ptr: *const SurfaceSimInstance) -> usize {
    let count = instance_from_ptr(ptr).and_then(|instance| with_engine(instance, |e| e.points().len()));
    track_result(count).unwrap_or(0)
}

/// Fill `out_info` with the grid dimensions and current mode.
///
/// # Safety
/// `out_info` must be null or point to writable memory for one `SurfaceSimInfo`.
#[no_mangle]
pub unsafe extern "C" fn surface_sim_get_info(
    ptr: *const SurfaceSimInstance,
    out_info: *mut SurfaceSimInfo,
) -> SurfaceSimErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: caller contract above.
        let out = unsafe { out_info.as_mut() }
            .ok_or_else(|| DefaultSurfaceSimError::null_pointer("out_info"))?;
        let instance = instance_from_ptr(ptr)?;
        *out = with_engine(instance, |engine| {
            let grid = engine.grid();
            SurfaceSimInfo {
                width: grid.width() as u32,
                height: grid.height() as u32,
                spacing: grid.spacing(),
                mode: engine.mode().index(),
                steps: engine.steps(),
                has_device: engine.has_device(),
            }
        })?;
        Ok(())
    })
}

/// Copy the point positions into `out_points` as `(x, y, z, w)` floats,
/// row-major. `capacity` is the number of floats `out_points` can hold and
/// must be at least `4 * surface_sim_point_count(ptr)`.
///
/// # Safety
/// `out_points` must be null or point to `capacity` writable floats.
#[no_mangle]
pub unsafe extern "C" fn surface_sim_copy_points(
    ptr: *const SurfaceSimInstance,
    out_points: *mut f32,
    capacity: usize,
) -> SurfaceSimErrorCode {
    handle_ffi_result_error(|| {
        if out_points.is_null() {
            return Err(DefaultSurfaceSimError::null_pointer("out_points"));
        }
        let instance = instance_from_ptr(ptr)?;
        with_engine(instance, |engine| {
            let flat = engine.grid().points_flat();
            if capacity < flat.len() {
                return Err(DefaultSurfaceSimError::invalid_parameter(format!(
                    "capacity {capacity} is smaller than {} floats",
                    flat.len()
                )));
            }
            // SAFETY: non-null and at least `flat.len()` floats per caller contract.
            let out = unsafe { std::slice::from_raw_parts_mut(out_points, flat.len()) };
            out.copy_from_slice(flat);
            Ok(())
        })?
    })
}

/// Height of grid point `(i, j)`, or NaN when out of range or `ptr` is null.
#[no_mangle]
pub extern "C" fn surface_sim_height_at(ptr: *const SurfaceSimInstance, i: u32, j: u32) -> f32 {
    let height = instance_from_ptr(ptr).and_then(|instance| {
        with_engine(instance, |engine| {
            let grid = engine.grid();
            let (i, j) = (i as usize, j as usize);
            (i < grid.width() && j < grid.height()).then(|| grid.height_at(i, j))
        })
    });
    track_result(height).ok().flatten().unwrap_or(f32::NAN)
}
