//! GPU-based stencil solver implementation
//!
//! This module provides a GPU implementation of the `StencilSolver` trait on top
//! of the [`crate::gpu`] runtime. Only available with the `gpu` feature.
//!
//! # Kernel Files
//!
//! Kernels are located in `shaders/`:
//! - `procedural.wgsl` - closed-form wave
//! - `heightfield.wgsl` - clamped-edge diffusion, pass 1
//! - `heightfield_obstacle.wgsl` - obstacle-aware diffusion, pass 1
//!
//! # Step Protocol
//!
//! Each step stages the grid into fresh device buffers, binds the arguments,
//! dispatches over the grid in `tile_size x tile_size` work-groups, reads the
//! result back with a blocking read and releases every buffer. Pass 2 of the
//! diffusion steps (folding the accumulator into heights) runs on the host.

use super::kernels::KernelKind;
use super::StencilSolver;
use crate::config::KernelPolicy;
use crate::gpu::{BufferAccess, ComputeDevice, DeviceBuffer, KernelProgram};
use crate::grid::SurfaceGrid;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

// Grid dimensions in the integer types the kernels use
#[derive(Debug, Clone, Copy)]
struct Extent {
    width: u32,
    height: u32,
}

impl Extent {
    // Grid dimensions are capped at MAX_GRID_DIMENSION, far inside i32
    #[expect(clippy::cast_possible_truncation)]
    fn of(grid: &SurfaceGrid) -> Self {
        Self {
            width: grid.width() as u32,
            height: grid.height() as u32,
        }
    }

    #[expect(clippy::cast_possible_wrap)]
    fn width_i32(self) -> i32 {
        self.width as i32
    }

    #[expect(clippy::cast_possible_wrap)]
    fn height_i32(self) -> i32 {
        self.height as i32
    }
}

/// GPU-based stencil solver
///
/// Owns the compute device for its lifetime. With [`KernelPolicy::Cached`] each
/// kernel is built on first use and kept until the solver is dropped.
pub struct GpuStencilSolver {
    device: ComputeDevice,
    tile_size: u32,
    policy: KernelPolicy,
    kernels: FxHashMap<KernelKind, KernelProgram>,
}

impl GpuStencilSolver {
    /// Create a solver dispatching `tile_size x tile_size` work-groups.
    #[must_use]
    pub fn new(device: ComputeDevice, tile_size: u32, policy: KernelPolicy) -> Self {
        debug!(
            "GPU stencil solver on '{}' (tile {}, {:?})",
            device.adapter_name(),
            tile_size,
            policy
        );
        Self {
            device,
            tile_size,
            policy,
            kernels: FxHashMap::default(),
        }
    }

    /// The owned compute device
    #[must_use]
    pub fn device(&self) -> &ComputeDevice {
        &self.device
    }

    /// Kernel lifetime policy
    #[must_use]
    pub fn policy(&self) -> KernelPolicy {
        self.policy
    }

    /// Number of kernels currently held
    #[must_use]
    pub fn cached_kernels(&self) -> usize {
        self.kernels.len()
    }

    fn take_kernel(&mut self, kind: KernelKind) -> KernelProgram {
        match self.kernels.remove(&kind) {
            Some(kernel) => kernel,
            None => {
                trace!("Building kernel '{}'", kind.entry_point());
                self.device.build_kernel(
                    &kind.source_for_tile(self.tile_size),
                    kind.entry_point(),
                    (self.tile_size, self.tile_size),
                )
            }
        }
    }

    fn finish_kernel(&mut self, kind: KernelKind, kernel: KernelProgram) {
        match self.policy {
            KernelPolicy::Cached => {
                self.kernels.insert(kind, kernel);
            }
            KernelPolicy::RecompileEachStep => kernel.release(),
        }
    }

    fn stage_mesh(&self, grid: &SurfaceGrid) -> DeviceBuffer {
        let bytes: &[u8] = bytemuck::cast_slice(grid.points());
        self.device
            .allocate("mesh", BufferAccess::ReadWrite, bytes.len() as u64, Some(bytes))
    }

    fn stage_accumulator(&self, grid: &SurfaceGrid) -> DeviceBuffer {
        let bytes: &[u8] = bytemuck::cast_slice(grid.accumulator());
        self.device.allocate(
            "heightfield",
            BufferAccess::ReadWrite,
            bytes.len() as u64,
            Some(bytes),
        )
    }

    // Shared by both diffusion kernels: arguments 0..=3 are width, height,
    // mesh, accumulator; the obstacle kernel adds the mask as argument 4.
    fn run_diffusion(&mut self, kind: KernelKind, grid: &mut SurfaceGrid) {
        let extent = Extent::of(grid);
        let mesh = self.stage_mesh(grid);
        let accumulator = self.stage_accumulator(grid);
        let mask = (kind == KernelKind::HeightfieldObstacle).then(|| {
            let bytes: &[u8] = bytemuck::cast_slice(grid.obstacles().as_slice());
            self.device
                .allocate("obstacles", BufferAccess::ReadOnly, bytes.len() as u64, Some(bytes))
        });

        let mut kernel = self.take_kernel(kind);
        kernel.set_scalar(0, extent.width_i32());
        kernel.set_scalar(1, extent.height_i32());
        kernel.set_buffer(2, &mesh);
        kernel.set_buffer(3, &accumulator);
        if let Some(mask) = &mask {
            kernel.set_buffer(4, mask);
        }
        kernel.dispatch(extent.width, extent.height, self.tile_size, self.tile_size);

        self.device
            .read_buffer(&accumulator, 0, bytemuck::cast_slice_mut(grid.accumulator_mut()));
        self.finish_kernel(kind, kernel);

        mesh.release();
        accumulator.release();
        if let Some(mask) = mask {
            mask.release();
        }
    }
}

impl StencilSolver for GpuStencilSolver {
    fn step_procedural(&mut self, grid: &mut SurfaceGrid, time: f32) {
        let kind = KernelKind::Procedural;
        let extent = Extent::of(grid);
        let mesh = self.stage_mesh(grid);

        let mut kernel = self.take_kernel(kind);
        kernel.set_scalar(0, time);
        kernel.set_scalar(1, grid.spacing());
        kernel.set_scalar(2, extent.width_i32());
        kernel.set_scalar(3, extent.height_i32());
        kernel.set_buffer(4, &mesh);
        kernel.dispatch(extent.width, extent.height, self.tile_size, self.tile_size);

        self.device
            .read_buffer(&mesh, 0, bytemuck::cast_slice_mut(grid.points_mut()));
        self.finish_kernel(kind, kernel);
        mesh.release();
    }

    fn step_heightfield(&mut self, grid: &mut SurfaceGrid) {
        self.run_diffusion(KernelKind::Heightfield, grid);
        grid.fold_accumulator(false);
    }

    fn step_heightfield_obstacle(&mut self, grid: &mut SurfaceGrid) {
        self.run_diffusion(KernelKind::HeightfieldObstacle, grid);
        grid.fold_accumulator(true);
    }

    fn name(&self) -> &'static str {
        "gpu"
    }

    fn is_gpu_accelerated(&self) -> bool {
        true
    }
}
