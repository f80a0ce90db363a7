use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use surface_sim_core::{ConfigError, GridError};

/// Common interface for FFI error types.
///
/// - `code()` - the status code returned across the FFI boundary
/// - `msg()` - the diagnostic message stored for `surface_sim_get_last_error`
pub(crate) trait SurfaceSimError {
    /// Status code returned across the FFI boundary.
    fn code(&self) -> SurfaceSimErrorCode;

    /// Human-readable error message.
    fn msg(&self) -> &str;
}

/// Default `SurfaceSimError` used by every exported function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultSurfaceSimError {
    code: SurfaceSimErrorCode,
    msg: String,
}

impl DefaultSurfaceSimError {
    /// Null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`, `"ptr"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: SurfaceSimErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Poisoned lock.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: SurfaceSimErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Invalid grid dimensions or spacing.
    pub fn invalid_grid(message: &str) -> Self {
        Self {
            code: SurfaceSimErrorCode::InvalidGridParameters,
            msg: format!("Grid parameters: {message}"),
        }
    }

    /// Mode index outside `0..=5`.
    pub fn invalid_mode(index: u32) -> Self {
        Self {
            code: SurfaceSimErrorCode::InvalidMode,
            msg: format!("Mode index {index} outside 0..=5"),
        }
    }

    /// Disturbance outside the grid.
    pub fn out_of_bounds(message: &str) -> Self {
        Self {
            code: SurfaceSimErrorCode::OutOfBounds,
            msg: message.to_string(),
        }
    }

    /// Invalid parameter passed to function.
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: SurfaceSimErrorCode::InvalidParameter,
            msg: message,
        }
    }
}

impl SurfaceSimError for DefaultSurfaceSimError {
    fn code(&self) -> SurfaceSimErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

impl From<GridError> for DefaultSurfaceSimError {
    fn from(error: GridError) -> Self {
        match error {
            GridError::OutOfBounds { .. } => Self::out_of_bounds(&error.to_string()),
            GridError::InvalidDimensions { .. } | GridError::InvalidSpacing(_) => {
                Self::invalid_grid(&error.to_string())
            }
        }
    }
}

impl From<ConfigError> for DefaultSurfaceSimError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Grid(grid) => grid.into(),
            other => Self::invalid_grid(&other.to_string()),
        }
    }
}

/// FFI status codes returned by surface simulation functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceSimErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Width, height or spacing rejected.
    InvalidGridParameters = 3,

    /// Invalid parameter passed to function.
    InvalidParameter = 4,

    /// Mode index outside `0..=5`.
    InvalidMode = 5,

    /// Disturbance coordinates outside the grid.
    OutOfBounds = 6,
}

impl From<DefaultSurfaceSimError> for SurfaceSimErrorCode {
    fn from(error: DefaultSurfaceSimError) -> Self {
        error.code
    }
}

thread_local! {
    /// Most recent FFI error on this thread (C string, code).
    /// The `CString` is kept here so pointers handed out stay valid.
    static LAST_ERROR: RefCell<(Option<CString>, SurfaceSimErrorCode)> = const { RefCell::new((None, SurfaceSimErrorCode::Ok)) };
}

pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, SurfaceSimErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, SurfaceSimErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns null if the last call on this thread succeeded.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```cpp
/// SurfaceSimInstance* sim = nullptr;
/// if (surface_sim_new(1024, 1024, 0.006f, &sim) != SurfaceSimErrorCode::Ok) {
///     printf("create failed: %s\n", surface_sim_get_last_error());
/// }
/// ```
#[no_mangle]
pub extern "C" fn surface_sim_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code (`Ok` if the last call succeeded).
#[no_mangle]
pub extern "C" fn surface_sim_get_last_error_code() -> SurfaceSimErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
