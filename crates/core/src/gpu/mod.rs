//! GPU compute runtime
//!
//! Thin ownership layer over wgpu for data-parallel kernels:
//!
//! - [`ComputeDevice`]: discovers the fastest GPU and owns its context and queue
//! - [`DeviceBuffer`]: device memory, released on drop
//! - [`KernelProgram`]: a compiled WGSL entry point with bound arguments
//!
//! Every runtime failure is unrecoverable and is handed to the device's
//! [`FatalHandler`](crate::fatal::FatalHandler).
//!
//! # Example
//!
//! ```rust,ignore
//! use surface_sim_core::gpu::{BufferAccess, ComputeDevice};
//!
//! let device = ComputeDevice::new();
//! let data = [1.0_f32; 64];
//! let buffer = device.allocate("data", BufferAccess::ReadWrite, 256, Some(bytemuck::cast_slice(&data)));
//! let mut kernel = device.build_kernel(SOURCE, "double", (64, 1));
//! kernel.set_buffer(0, &buffer);
//! kernel.dispatch(64, 1, 64, 1);
//! let mut out = [0.0_f32; 64];
//! device.read_buffer(&buffer, 0, bytemuck::cast_slice_mut(&mut out));
//! ```

pub mod buffer;
pub mod device;
pub mod kernel;

pub use buffer::{BufferAccess, DeviceBuffer, PendingRead};
pub use device::{clock_weight, select_fastest, ComputeDevice, DeviceCandidate, PLATFORMS};
pub use kernel::{KernelArg, KernelProgram, WorkGroupLimits};
