//! Abort policy for unrecoverable compute failures
//!
//! Every compute-runtime failure is a precondition violation: there is no retry
//! and no fallback from device to host. The action taken is a replaceable
//! collaborator so test harnesses can observe it instead of losing the process.

use crate::error::ComputeError;
use std::sync::Arc;

/// Handles an unrecoverable compute failure. Never returns.
pub trait FatalHandler: Send + Sync {
    /// Report `error` and stop the current control flow.
    fn fatal(&self, error: &ComputeError) -> !;
}

/// Default handler: print a diagnostic on stderr and exit with status 1.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessAbort;

impl FatalHandler for ProcessAbort {
    fn fatal(&self, error: &ComputeError) -> ! {
        tracing::error!(operation = error.operation(), "{error}");
        eprintln!("Fatal error during {}: {error}", error.operation());
        std::process::exit(1);
    }
}

/// Handler that panics with the error message.
///
/// Intended for tests: the failure unwinds to the test harness where it can be
/// matched with `#[should_panic]` or `catch_unwind`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicOnFatal;

impl FatalHandler for PanicOnFatal {
    fn fatal(&self, error: &ComputeError) -> ! {
        tracing::warn!(operation = error.operation(), "fatal compute error: {error}");
        panic!("fatal {}: {error}", error.operation());
    }
}

/// Shared handle to the process abort policy.
pub type SharedFatalHandler = Arc<dyn FatalHandler>;

/// The default shared handler ([`ProcessAbort`]).
#[must_use]
pub fn default_handler() -> SharedFatalHandler {
    Arc::new(ProcessAbort)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "fatal device discovery")]
    fn test_panic_handler_surfaces_error() {
        let handler: SharedFatalHandler = Arc::new(PanicOnFatal);
        handler.fatal(&ComputeError::NoGpuDevice);
    }
}
