//! Device memory buffers and host read-back
//!
//! All device buffers are storage buffers that can be copied in both
//! directions. Read-back goes through a mappable staging buffer.

use super::device::{capture_errors, ComputeDevice};
use crate::error::{ComputeError, ComputeResult};
use crate::fatal::SharedFatalHandler;
use std::sync::{mpsc, Arc};
use tracing::trace;
use wgpu::util::DeviceExt;

/// How kernels may access a buffer
///
/// Read-only buffers must be declared `var<storage, read>` in kernel source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferAccess {
    /// Kernels read and write the buffer
    ReadWrite,
    /// Kernels only read the buffer
    ReadOnly,
}

/// A region of device memory
///
/// The memory is released when the buffer is dropped or passed to
/// [`DeviceBuffer::release`].
#[derive(Debug)]
pub struct DeviceBuffer {
    buffer: Arc<wgpu::Buffer>,
    label: String,
    size: u64,
    access: BufferAccess,
}

impl DeviceBuffer {
    /// Size in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Declared kernel access
    #[must_use]
    pub fn access(&self) -> BufferAccess {
        self.access
    }

    /// Debug label
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn raw(&self) -> &Arc<wgpu::Buffer> {
        &self.buffer
    }

    /// Release the device memory now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        trace!("Releasing device buffer '{}' ({} bytes)", self.label, self.size);
        self.buffer.destroy();
    }
}

/// An enqueued device-to-host copy
///
/// Created by [`ComputeDevice::enqueue_read`]. The copy runs in queue order
/// after all previously submitted kernels; [`PendingRead::wait`] blocks until it
/// has landed.
pub struct PendingRead {
    device: Arc<wgpu::Device>,
    staging: wgpu::Buffer,
    receiver: mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>,
    size: u64,
    fatal: SharedFatalHandler,
}

impl PendingRead {
    /// Number of bytes being read
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Block until the copy completes and write it into `destination`.
    ///
    /// `destination` must be exactly [`PendingRead::size`] bytes.
    pub fn wait(self, destination: &mut [u8]) {
        if let Err(e) = self.try_wait(destination) {
            self.fatal.fatal(&e);
        }
    }

    fn try_wait(&self, destination: &mut [u8]) -> ComputeResult<()> {
        if destination.len() as u64 != self.size {
            return Err(ComputeError::ReadBack(format!(
                "destination holds {} bytes, read is {} bytes",
                destination.len(),
                self.size
            )));
        }

        let _ = self.device.poll(wgpu::Maintain::Wait);
        self.receiver
            .recv()
            .map_err(|e| ComputeError::ReadBack(e.to_string()))?
            .map_err(|e| ComputeError::ReadBack(e.to_string()))?;

        {
            let mapped = self.staging.slice(..).get_mapped_range();
            destination.copy_from_slice(&mapped);
        }
        self.staging.unmap();
        Ok(())
    }
}

impl ComputeDevice {
    /// Allocate `size` bytes of device memory, optionally initialised from
    /// `host_data`. Allocation failure is fatal.
    pub fn allocate(
        &self,
        label: &str,
        access: BufferAccess,
        size: u64,
        host_data: Option<&[u8]>,
    ) -> DeviceBuffer {
        self.try_allocate(label, access, size, host_data)
            .unwrap_or_else(|e| self.fail(&e))
    }

    /// Fallible form of [`ComputeDevice::allocate`].
    ///
    /// # Errors
    ///
    /// [`ComputeError::BufferAllocation`] if `size` is zero, does not match
    /// `host_data`, or the driver rejects the allocation.
    pub fn try_allocate(
        &self,
        label: &str,
        access: BufferAccess,
        size: u64,
        host_data: Option<&[u8]>,
    ) -> ComputeResult<DeviceBuffer> {
        let allocation_error = |reason: String| ComputeError::BufferAllocation {
            label: label.to_string(),
            size,
            reason,
        };

        if size == 0 {
            return Err(allocation_error("zero-sized buffer".to_string()));
        }
        if let Some(data) = host_data {
            if data.len() as u64 != size {
                return Err(allocation_error(format!(
                    "host data is {} bytes",
                    data.len()
                )));
            }
        }

        let usage =
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST;
        let buffer = capture_errors(&self.device, || match host_data {
            Some(contents) => self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            }),
            None => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            }),
        })
        .map_err(allocation_error)?;

        trace!("Allocated device buffer '{}' ({} bytes, {:?})", label, size, access);
        Ok(DeviceBuffer {
            buffer: Arc::new(buffer),
            label: label.to_string(),
            size,
            access,
        })
    }

    /// Enqueue a copy of `size` bytes starting at `offset` into host memory.
    ///
    /// `offset` and `size` must be multiples of 4.
    pub fn enqueue_read(&self, buffer: &DeviceBuffer, offset: u64, size: u64) -> PendingRead {
        self.try_enqueue_read(buffer, offset, size)
            .unwrap_or_else(|e| self.fail(&e))
    }

    fn try_enqueue_read(
        &self,
        buffer: &DeviceBuffer,
        offset: u64,
        size: u64,
    ) -> ComputeResult<PendingRead> {
        if size == 0 || offset % 4 != 0 || size % 4 != 0 {
            return Err(ComputeError::ReadBack(format!(
                "read of {size} bytes at offset {offset} from '{}' is not 4-byte aligned",
                buffer.label
            )));
        }
        if offset + size > buffer.size {
            return Err(ComputeError::ReadBack(format!(
                "read of {size} bytes at offset {offset} exceeds '{}' ({} bytes)",
                buffer.label, buffer.size
            )));
        }

        let staging = capture_errors(&self.device, || {
            let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("read-back staging"),
                size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("read-back"),
                });
            encoder.copy_buffer_to_buffer(buffer.raw(), offset, &staging, 0, size);
            self.queue.submit(Some(encoder.finish()));
            staging
        })
        .map_err(ComputeError::ReadBack)?;

        let (sender, receiver) = mpsc::channel();
        staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        Ok(PendingRead {
            device: Arc::clone(&self.device),
            staging,
            receiver,
            size,
            fatal: Arc::clone(self.fatal_handler()),
        })
    }

    /// Blocking read of `destination.len()` bytes starting at `offset`.
    pub fn read_buffer(&self, buffer: &DeviceBuffer, offset: u64, destination: &mut [u8]) {
        self.enqueue_read(buffer, offset, destination.len() as u64)
            .wait(destination);
    }
}
