use crate::error::{with_last_error_mut, DefaultSurfaceSimError, SurfaceSimError, SurfaceSimErrorCode};
use crate::instance::SurfaceSimInstance;
use std::ffi::CString;
use surface_sim_core::SimulationEngine;

/// Set the thread-local error message and code.
pub(crate) fn set_last_error(error: &impl SurfaceSimError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Record an error and return its code.
#[inline]
pub(crate) fn track_error(error: &impl SurfaceSimError) -> SurfaceSimErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result, or clear the last error on success.
pub(crate) fn track_result<T>(
    result: Result<T, DefaultSurfaceSimError>,
) -> Result<T, SurfaceSimErrorCode> {
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error)),
    }
}

/// Run `f` and convert its outcome into a status code.
pub(crate) fn handle_ffi_result_error<F>(f: F) -> SurfaceSimErrorCode
where
    F: FnOnce() -> Result<(), DefaultSurfaceSimError>,
{
    match track_result(f()) {
        Ok(()) => SurfaceSimErrorCode::Ok,
        Err(code) => code,
    }
}

/// Clear the thread-local error message and code.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = SurfaceSimErrorCode::Ok;
    });
}

/// Borrow an instance from a caller-supplied pointer.
pub(crate) fn instance_from_ptr<'a>(
    ptr: *const SurfaceSimInstance,
) -> Result<&'a SurfaceSimInstance, DefaultSurfaceSimError> {
    // SAFETY: callers promise `ptr` is null or came from `surface_sim_new*` and is live.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultSurfaceSimError::null_pointer("ptr"))
}

pub(crate) fn with_engine<F, T>(
    instance: &SurfaceSimInstance,
    func: F,
) -> Result<T, DefaultSurfaceSimError>
where
    F: FnOnce(&SimulationEngine) -> T,
{
    let engine = instance
        .engine
        .read()
        .map_err(|_| DefaultSurfaceSimError::lock_poisoned("RwLock"))?;
    Ok(func(&engine))
}

pub(crate) fn with_engine_mut<F, T>(
    instance: &SurfaceSimInstance,
    func: F,
) -> Result<T, DefaultSurfaceSimError>
where
    F: FnOnce(&mut SimulationEngine) -> T,
{
    let mut engine = instance
        .engine
        .write()
        .map_err(|_| DefaultSurfaceSimError::lock_poisoned("RwLock"))?;
    Ok(func(&mut engine))
}
