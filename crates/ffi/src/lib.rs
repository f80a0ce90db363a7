//! C ABI for the surface simulation
//!
//! Exposes the engine commands (create, set mode, advance, disturb, reset,
//! destroy) and point queries to a native UI shell. Every fallible call returns
//! a [`SurfaceSimErrorCode`]; details are available from
//! `surface_sim_get_last_error` on the same thread. The header is generated by
//! `cbindgen` at build time.

mod error;
mod helpers;
mod instance;
mod queries;
mod simulation;

pub use error::{surface_sim_get_last_error, surface_sim_get_last_error_code, SurfaceSimErrorCode};
#[cfg(feature = "gpu")]
pub use instance::surface_sim_new_with_device;
pub use instance::{surface_sim_destroy, surface_sim_new, SurfaceSimInstance};
pub use queries::{
    surface_sim_copy_points, surface_sim_get_info, surface_sim_height_at, surface_sim_point_count,
    SurfaceSimInfo,
};
pub use simulation::{
    surface_sim_add_disturbance, surface_sim_advance, surface_sim_reset, surface_sim_set_mode,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::ptr;

    fn create(width: u32, height: u32) -> *mut SurfaceSimInstance {
        let mut sim = ptr::null_mut();
        let code = unsafe { surface_sim_new(width, height, 0.5, &mut sim) };
        assert_eq!(code, SurfaceSimErrorCode::Ok);
        assert!(!sim.is_null());
        sim
    }

    #[test]
    fn test_lifecycle_and_queries() {
        let sim = create(8, 6);
        assert_eq!(surface_sim_point_count(sim), 48);

        assert_eq!(surface_sim_set_mode(sim, 2), SurfaceSimErrorCode::Ok);
        assert_eq!(surface_sim_add_disturbance(sim, 3, 2), SurfaceSimErrorCode::Ok);
        assert_eq!(surface_sim_advance(sim, 16.0), SurfaceSimErrorCode::Ok);
        assert!(surface_sim_height_at(sim, 3, 2) > 0.0);

        let mut info = SurfaceSimInfo::default();
        assert_eq!(unsafe { surface_sim_get_info(sim, &mut info) }, SurfaceSimErrorCode::Ok);
        assert_eq!((info.width, info.height, info.mode, info.steps), (8, 6, 2, 1));
        assert!(!info.has_device);

        let mut points = vec![0.0_f32; 48 * 4];
        let code = unsafe { surface_sim_copy_points(sim, points.as_mut_ptr(), points.len()) };
        assert_eq!(code, SurfaceSimErrorCode::Ok);
        assert_eq!(points[(2 * 8 + 3) * 4 + 1], surface_sim_height_at(sim, 3, 2));
        assert_eq!(points[3], 1.0);

        assert_eq!(surface_sim_reset(sim), SurfaceSimErrorCode::Ok);
        assert_eq!(surface_sim_height_at(sim, 3, 2), 0.0);
        unsafe { surface_sim_destroy(sim) };
    }

    #[test]
    fn test_errors_set_last_error() {
        let sim = create(4, 4);

        assert_eq!(surface_sim_set_mode(sim, 6), SurfaceSimErrorCode::InvalidMode);
        assert_eq!(surface_sim_get_last_error_code(), SurfaceSimErrorCode::InvalidMode);
        let msg = unsafe { CStr::from_ptr(surface_sim_get_last_error()) };
        assert!(msg.to_string_lossy().contains('6'));

        assert_eq!(surface_sim_add_disturbance(sim, 4, 0), SurfaceSimErrorCode::OutOfBounds);
        assert_eq!(surface_sim_advance(sim, f32::NAN), SurfaceSimErrorCode::InvalidParameter);

        let mut small = [0.0_f32; 4];
        let code = unsafe { surface_sim_copy_points(sim, small.as_mut_ptr(), small.len()) };
        assert_eq!(code, SurfaceSimErrorCode::InvalidParameter);

        assert_eq!(surface_sim_reset(sim), SurfaceSimErrorCode::Ok);
        assert!(surface_sim_get_last_error().is_null());
        unsafe { surface_sim_destroy(sim) };
    }

    #[test]
    fn test_null_and_invalid_arguments() {
        assert_eq!(surface_sim_advance(ptr::null(), 1.0), SurfaceSimErrorCode::NullPointer);
        assert_eq!(surface_sim_point_count(ptr::null()), 0);
        assert!(surface_sim_height_at(ptr::null(), 0, 0).is_nan());
        unsafe { surface_sim_destroy(ptr::null_mut()) };

        let code = unsafe { surface_sim_new(4, 4, 1.0, ptr::null_mut()) };
        assert_eq!(code, SurfaceSimErrorCode::NullPointer);

        let mut sim = ptr::null_mut();
        let code = unsafe { surface_sim_new(0, 4, 1.0, &mut sim) };
        assert_eq!(code, SurfaceSimErrorCode::InvalidGridParameters);
        assert!(sim.is_null());

        let code = unsafe { surface_sim_new(4, 4, -1.0, &mut sim) };
        assert_eq!(code, SurfaceSimErrorCode::InvalidGridParameters);
    }
}
