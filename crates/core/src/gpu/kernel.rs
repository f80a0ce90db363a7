//! Compiled compute kernels and their argument bindings
//!
//! Kernel source is WGSL with every argument in bind group 0 and the binding
//! number equal to the argument index. Scalar arguments are declared
//! `var<uniform>` and buffer arguments `var<storage>`.
//!
//! The work-group size a program is built with is fixed by the source's
//! `@workgroup_size` attribute; dispatches must use exactly that local size.

use super::buffer::DeviceBuffer;
use super::device::{capture_errors, ComputeDevice};
use crate::error::{ComputeError, ComputeResult};
use crate::fatal::SharedFatalHandler;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, trace};
use wgpu::util::DeviceExt;

// Uniform buffers are sized in 16-byte rows
const UNIFORM_ALIGNMENT: usize = 16;

/// Work-group limits of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkGroupLimits {
    /// Largest local size along x
    pub max_x: u32,
    /// Largest local size along y
    pub max_y: u32,
    /// Largest local size product
    pub max_invocations: u32,
}

impl WorkGroupLimits {
    /// Limits reported by a wgpu device or adapter
    #[must_use]
    pub fn from_limits(limits: &wgpu::Limits) -> Self {
        Self {
            max_x: limits.max_compute_workgroup_size_x,
            max_y: limits.max_compute_workgroup_size_y,
            max_invocations: limits.max_compute_invocations_per_workgroup,
        }
    }

    /// Check a `local_x x local_y` work-group against these limits.
    ///
    /// # Errors
    ///
    /// A message naming the violated limit.
    pub fn check(&self, local_x: u32, local_y: u32) -> Result<(), String> {
        if local_x == 0 || local_y == 0 {
            return Err(format!("local size {local_x}x{local_y} is empty"));
        }
        if local_x > self.max_x || local_y > self.max_y {
            return Err(format!(
                "local size {local_x}x{local_y} exceeds per-axis limit {}x{}",
                self.max_x, self.max_y
            ));
        }
        let invocations = u64::from(local_x) * u64::from(local_y);
        if invocations > u64::from(self.max_invocations) {
            return Err(format!(
                "local size {local_x}x{local_y} exceeds {} invocations per work-group",
                self.max_invocations
            ));
        }
        Ok(())
    }
}

/// A kernel argument value
#[derive(Debug, Clone, Copy)]
pub enum KernelArg<'a> {
    /// Raw bytes of a scalar, copied at bind time
    Scalar(&'a [u8]),
    /// A device buffer, bound by reference
    Buffer(&'a DeviceBuffer),
}

enum BoundArg {
    Uniform(wgpu::Buffer),
    Storage(Arc<wgpu::Buffer>),
}

impl BoundArg {
    fn resource(&self) -> wgpu::BindingResource<'_> {
        match self {
            Self::Uniform(buffer) => buffer.as_entire_binding(),
            Self::Storage(buffer) => buffer.as_entire_binding(),
        }
    }
}

/// A compiled entry point with its bound arguments
///
/// Arguments stay bound until the next dispatch. Dropping the program releases
/// the pipeline.
pub struct KernelProgram {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    fatal: SharedFatalHandler,
    pipeline: wgpu::ComputePipeline,
    entry_point: String,
    work_group: (u32, u32),
    limits: WorkGroupLimits,
    args: Vec<Option<BoundArg>>,
}

impl std::fmt::Debug for KernelProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelProgram")
            .field("entry_point", &self.entry_point)
            .field("work_group", &self.work_group)
            .field("bound_args", &self.args.iter().filter(|a| a.is_some()).count())
            .finish_non_exhaustive()
    }
}

impl KernelProgram {
    /// Entry point this program was built for
    #[must_use]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Work-group size the program was compiled with
    #[must_use]
    pub fn work_group_size(&self) -> (u32, u32) {
        self.work_group
    }

    /// Bind argument `index`.
    pub fn set_arg(&mut self, index: u32, arg: KernelArg<'_>) {
        let bound = match arg {
            KernelArg::Scalar(bytes) => {
                let padded_len = bytes.len().next_multiple_of(UNIFORM_ALIGNMENT).max(UNIFORM_ALIGNMENT);
                let mut contents = bytes.to_vec();
                contents.resize(padded_len, 0);
                BoundArg::Uniform(self.device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("kernel scalar"),
                        contents: &contents,
                        usage: wgpu::BufferUsages::UNIFORM,
                    },
                ))
            }
            KernelArg::Buffer(buffer) => BoundArg::Storage(Arc::clone(buffer.raw())),
        };

        let slot = index as usize;
        if self.args.len() <= slot {
            self.args.resize_with(slot + 1, || None);
        }
        self.args[slot] = Some(bound);
    }

    /// Bind a plain-data scalar as argument `index`.
    pub fn set_scalar<T: bytemuck::Pod>(&mut self, index: u32, value: T) {
        self.set_arg(index, KernelArg::Scalar(bytemuck::bytes_of(&value)));
    }

    /// Bind a device buffer as argument `index`.
    pub fn set_buffer(&mut self, index: u32, buffer: &DeviceBuffer) {
        self.set_arg(index, KernelArg::Buffer(buffer));
    }

    /// Enqueue the kernel over a `global_width x global_height` range split
    /// into `local_x x local_y` work-groups.
    ///
    /// The local size must equal [`KernelProgram::work_group_size`] and fit the
    /// device limits. The global range is rounded up to whole work-groups;
    /// kernels must guard against indices past the real extent. Failure is
    /// fatal.
    pub fn dispatch(&mut self, global_width: u32, global_height: u32, local_x: u32, local_y: u32) {
        if let Err(e) = self.try_dispatch(global_width, global_height, local_x, local_y) {
            self.fatal.fatal(&e);
        }
    }

    fn dispatch_error(&self, reason: String) -> ComputeError {
        ComputeError::Dispatch {
            entry_point: self.entry_point.clone(),
            reason,
        }
    }

    /// Fallible form of [`KernelProgram::dispatch`].
    ///
    /// # Errors
    ///
    /// [`ComputeError::Dispatch`] if the local size breaks a device limit or
    /// differs from the compiled work-group size, an argument is unbound, or
    /// the enqueue fails. Bound arguments are kept on error.
    pub fn try_dispatch(
        &mut self,
        global_width: u32,
        global_height: u32,
        local_x: u32,
        local_y: u32,
    ) -> ComputeResult<()> {
        self.limits
            .check(local_x, local_y)
            .map_err(|reason| self.dispatch_error(reason))?;
        if (local_x, local_y) != self.work_group {
            let (x, y) = self.work_group;
            return Err(self.dispatch_error(format!(
                "local size {local_x}x{local_y} differs from compiled work-group {x}x{y}"
            )));
        }

        {
            let entries = self
                .args
                .iter()
                .enumerate()
                .map(|(binding, arg)| {
                    arg.as_ref()
                        .map(|bound| wgpu::BindGroupEntry {
                            binding: binding as u32,
                            resource: bound.resource(),
                        })
                        .ok_or_else(|| self.dispatch_error(format!("argument {binding} is not set")))
                })
                .collect::<ComputeResult<Vec<_>>>()?;

            let groups_x = global_width.div_ceil(local_x);
            let groups_y = global_height.div_ceil(local_y);
            capture_errors(&self.device, || {
                let layout = self.pipeline.get_bind_group_layout(0);
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(self.entry_point.as_str()),
                    layout: &layout,
                    entries: &entries,
                });
                let mut encoder = self
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some(self.entry_point.as_str()),
                    });
                {
                    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                        label: Some(self.entry_point.as_str()),
                        timestamp_writes: None,
                    });
                    pass.set_pipeline(&self.pipeline);
                    pass.set_bind_group(0, &bind_group, &[]);
                    pass.dispatch_workgroups(groups_x, groups_y, 1);
                }
                self.queue.submit(Some(encoder.finish()));
            })
            .map_err(|reason| self.dispatch_error(reason))?;

            trace!(
                "Dispatched '{}' over {}x{} work-groups",
                self.entry_point,
                groups_x,
                groups_y
            );
        }

        self.args.clear();
        Ok(())
    }

    /// Release the pipeline now.
    pub fn release(self) {
        trace!("Releasing kernel '{}'", self.entry_point);
    }
}

impl ComputeDevice {
    /// Compile `source` and create a program for `entry_point`.
    ///
    /// `work_group` must match the entry point's `@workgroup_size`.
    /// Compilation failure is fatal; the error carries the full build log.
    pub fn build_kernel(
        &self,
        source: &str,
        entry_point: &str,
        work_group: (u32, u32),
    ) -> KernelProgram {
        self.try_build_kernel(source, entry_point, work_group)
            .unwrap_or_else(|e| self.fail(&e))
    }

    /// Work-group limits of this device
    #[must_use]
    pub fn work_group_limits(&self) -> WorkGroupLimits {
        WorkGroupLimits::from_limits(&self.device.limits())
    }

    /// Fallible form of [`ComputeDevice::build_kernel`].
    ///
    /// # Errors
    ///
    /// [`ComputeError::Compilation`] with the compiler log if the source does
    /// not parse, does not validate, or lacks `entry_point`, or if
    /// `work_group` does not fit the device limits.
    pub fn try_build_kernel(
        &self,
        source: &str,
        entry_point: &str,
        work_group: (u32, u32),
    ) -> ComputeResult<KernelProgram> {
        let compile_error = |log: String| ComputeError::Compilation {
            entry_point: entry_point.to_string(),
            log,
        };

        let limits = self.work_group_limits();
        limits
            .check(work_group.0, work_group.1)
            .map_err(compile_error)?;

        let module = capture_errors(&self.device, || {
            self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(entry_point),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })
        .map_err(compile_error)?;

        let info = pollster::block_on(module.get_compilation_info());
        let log = build_log(&info);
        if info
            .messages
            .iter()
            .any(|m| m.message_type == wgpu::CompilationMessageType::Error)
        {
            return Err(compile_error(log));
        }
        if !log.is_empty() {
            debug!("Build log for '{}':\n{}", entry_point, log);
        }

        let pipeline = capture_errors(&self.device, || {
            self.device
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(entry_point),
                    layout: None,
                    module: &module,
                    entry_point: Some(entry_point),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                })
        })
        .map_err(compile_error)?;

        debug!("Built kernel '{}'", entry_point);
        Ok(KernelProgram {
            device: Arc::clone(&self.device),
            queue: Arc::clone(&self.queue),
            fatal: Arc::clone(self.fatal_handler()),
            pipeline,
            entry_point: entry_point.to_string(),
            work_group,
            limits,
            args: Vec::new(),
        })
    }
}

fn build_log(info: &wgpu::CompilationInfo) -> String {
    let mut log = String::new();
    for message in &info.messages {
        let kind = match message.message_type {
            wgpu::CompilationMessageType::Error => "error",
            wgpu::CompilationMessageType::Warning => "warning",
            wgpu::CompilationMessageType::Info => "info",
        };
        match &message.location {
            Some(loc) => {
                let _ = writeln!(
                    log,
                    "{kind} at {}:{}: {}",
                    loc.line_number, loc.line_position, message.message
                );
            }
            None => {
                let _ = writeln!(log, "{kind}: {}", message.message);
            }
        }
    }
    log
}
