//! CPU-based stencil solver implementation
//!
//! This module provides a CPU implementation of the `StencilSolver` trait using
//! Rayon row parallelism. It is always available and serves as the reference
//! the GPU kernels are checked against.

use super::stencil::{
    clamped_neighbours, diffuse, diffuse_masked, neighbour_mean, procedural_height,
};
use super::StencilSolver;
use crate::core_types::Vec4;
use crate::grid::{ObstacleMask, SurfaceGrid};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How the CPU obstacle stencil skips obstacle points
///
/// Both strategies produce bit-identical results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MaskStrategy {
    /// Skip obstacle points with an explicit branch
    #[default]
    Branching,
    /// Multiply the update by the open flag, as the GPU kernel does
    Branchless,
}

/// CPU-based stencil solver using Rayon for parallelism
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuStencilSolver {
    mask_strategy: MaskStrategy,
}

impl CpuStencilSolver {
    /// Create a CPU solver with the default branching obstacle strategy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a CPU solver with an explicit obstacle strategy
    #[must_use]
    pub fn with_mask_strategy(mask_strategy: MaskStrategy) -> Self {
        Self { mask_strategy }
    }

    /// Obstacle strategy in use
    #[must_use]
    pub fn mask_strategy(&self) -> MaskStrategy {
        self.mask_strategy
    }
}

impl StencilSolver for CpuStencilSolver {
    fn step_procedural(&mut self, grid: &mut SurfaceGrid, time: f32) {
        let width = grid.width();
        let spacing = grid.spacing();
        step_procedural_cpu(grid.points_mut(), width, spacing, time);
    }

    fn step_heightfield(&mut self, grid: &mut SurfaceGrid) {
        let (width, height) = (grid.width(), grid.height());
        let (points, accumulator, _) = grid.stencil_fields();
        step_heightfield_cpu(points, accumulator, width, height);
        grid.fold_accumulator(false);
    }

    fn step_heightfield_obstacle(&mut self, grid: &mut SurfaceGrid) {
        let width = grid.width();
        let strategy = self.mask_strategy;
        let (points, accumulator, mask) = grid.stencil_fields();
        step_heightfield_obstacle_cpu(points, accumulator, mask, width, strategy);
        grid.fold_accumulator(true);
    }

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn is_gpu_accelerated(&self) -> bool {
        false
    }
}

/// Write the procedural wave height into every point
///
/// # Arguments
///
/// * `points` - Row-major points, `width` per row
/// * `width` - Grid width in points
/// * `spacing` - Lattice spacing
/// * `time` - Wave time
pub fn step_procedural_cpu(points: &mut [Vec4], width: usize, spacing: f32, time: f32) {
    points
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(j, row)| {
            for (i, point) in row.iter_mut().enumerate() {
                point.y = procedural_height(i, j, spacing, time);
            }
        });
}

/// Diffusion pass 1 with clamped edges
///
/// Reads heights from `points` and updates `accumulator` in place. Heights are
/// not modified; the caller folds the accumulator afterwards.
pub fn step_heightfield_cpu(points: &[Vec4], accumulator: &mut [f32], width: usize, height: usize) {
    accumulator
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(j, row)| {
            let (lj, hj) = clamped_neighbours(j, height);
            for (i, acc) in row.iter_mut().enumerate() {
                let (li, hi) = clamped_neighbours(i, width);
                let mean = neighbour_mean(
                    points[j * width + li].y,
                    points[j * width + hi].y,
                    points[lj * width + i].y,
                    points[hj * width + i].y,
                );
                *acc = diffuse(*acc, mean, points[j * width + i].y);
            }
        });
}

/// Diffusion pass 1 around an obstacle mask
///
/// A neighbour whose padded cell is an obstacle is replaced by the point
/// itself. The padded wall guarantees edge points never index outside the grid.
pub fn step_heightfield_obstacle_cpu(
    points: &[Vec4],
    accumulator: &mut [f32],
    mask: &ObstacleMask,
    width: usize,
    strategy: MaskStrategy,
) {
    accumulator
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(j, row)| {
            for (i, acc) in row.iter_mut().enumerate() {
                let flag = mask.flag(i, j);
                if strategy == MaskStrategy::Branching && flag != 0 {
                    continue;
                }

                let li = if mask.padded_flag(i, j + 1) != 0 { i } else { i - 1 };
                let hi = if mask.padded_flag(i + 2, j + 1) != 0 { i } else { i + 1 };
                let lj = if mask.padded_flag(i + 1, j) != 0 { j } else { j - 1 };
                let hj = if mask.padded_flag(i + 1, j + 2) != 0 { j } else { j + 1 };

                let mean = neighbour_mean(
                    points[j * width + li].y,
                    points[j * width + hi].y,
                    points[lj * width + i].y,
                    points[hj * width + i].y,
                );
                let center = points[j * width + i].y;

                *acc = match strategy {
                    MaskStrategy::Branching => diffuse(*acc, mean, center),
                    MaskStrategy::Branchless => diffuse_masked(*acc, mean, center, open_weight(flag)),
                };
            }
        });
}

// 1.0 for an open point, 0.0 for an obstacle
#[inline]
#[expect(clippy::cast_precision_loss)]
fn open_weight(flag: i32) -> f32 {
    (1 - flag) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{ObstacleLayout, RIPPLE_STRENGTH};
    use crate::solver::stencil::DECAY;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_grid_is_fixed_point() {
        let mut grid = SurfaceGrid::new(9, 7, 0.1).unwrap();
        let mut solver = CpuStencilSolver::new();
        for _ in 0..5 {
            solver.step_heightfield(&mut grid);
            solver.step_heightfield_obstacle(&mut grid);
        }
        assert!(grid.points().iter().all(|p| p.y == 0.0));
        assert!(grid.accumulator().iter().all(|&a| a == 0.0));
    }

    #[test]
    fn test_single_ripple_two_steps() {
        let mut grid = SurfaceGrid::new(5, 5, 1.0).unwrap();
        let mut solver = CpuStencilSolver::new();
        grid.add_ripple(2, 2).unwrap();

        solver.step_heightfield(&mut grid);
        let center = 20.0 * DECAY;
        assert_relative_eq!(grid.height_at(2, 2), center);
        for (i, j) in [(1, 2), (3, 2), (2, 1), (2, 3), (0, 0)] {
            assert_eq!(grid.height_at(i, j), 0.0);
        }

        solver.step_heightfield(&mut grid);
        let neighbour = (center / 4.0) * DECAY;
        for (i, j) in [(1, 2), (3, 2), (2, 1), (2, 3)] {
            assert_relative_eq!(grid.height_at(i, j), neighbour, max_relative = 1e-6);
        }
        // Diagonals only see the ripple on the third step
        assert_eq!(grid.height_at(1, 1), 0.0);
    }

    #[test]
    fn test_edge_reads_itself() {
        let mut grid = SurfaceGrid::new(3, 1, 1.0).unwrap();
        grid.set_height(0, 0, 4.0);
        let mut solver = CpuStencilSolver::new();
        solver.step_heightfield(&mut grid);

        // Point 0: left = self, right = 0, below = above = self
        let expected_acc = ((4.0 + 0.0 + 4.0 + 4.0) * 0.25 - 4.0) * DECAY;
        assert_relative_eq!(grid.accumulator_at(0, 0), expected_acc);
        assert_relative_eq!(grid.height_at(0, 0), 4.0 + expected_acc);
    }

    #[test]
    fn test_obstacle_points_frozen() {
        let mut grid = SurfaceGrid::new(12, 12, 1.0).unwrap();
        grid.add_ripple(6, 6).unwrap();
        grid.add_ripple(2, 2).unwrap();
        let mut solver = CpuStencilSolver::new();
        for _ in 0..10 {
            solver.step_heightfield_obstacle(&mut grid);
        }
        assert_eq!(grid.height_at(6, 6), 0.0);
        assert_eq!(grid.accumulator_at(6, 6), RIPPLE_STRENGTH);
        assert_ne!(grid.height_at(2, 2), 0.0);
    }

    #[test]
    fn test_blocked_neighbour_reads_self() {
        // 12x12 block covers columns and rows 5..=7, so (5, 6) is blocked
        for strategy in [MaskStrategy::Branching, MaskStrategy::Branchless] {
            let mut grid = SurfaceGrid::new(12, 12, 1.0).unwrap();
            grid.set_height(4, 6, 2.0);
            grid.set_height(3, 6, 1.0);
            grid.set_height(5, 6, 9.0);

            CpuStencilSolver::with_mask_strategy(strategy).step_heightfield_obstacle(&mut grid);

            let expected_acc = ((1.0 + 2.0 + 0.0 + 0.0) / 4.0 - 2.0) * DECAY;
            assert_relative_eq!(grid.accumulator_at(4, 6), expected_acc);
            assert_relative_eq!(grid.height_at(4, 6), 2.0 + expected_acc);
            assert_eq!(grid.height_at(5, 6), 9.0, "{strategy:?}");
        }
    }

    #[test]
    fn test_border_only_obstacle_matches_clamped() {
        // With only the wall, the obstacle stencil replaces out-of-grid
        // neighbours by self exactly like clamping does.
        let mut masked = SurfaceGrid::with_layout(6, 4, 1.0, ObstacleLayout::BorderOnly).unwrap();
        let mut clamped = masked.clone();
        masked.add_ripple(0, 0).unwrap();
        clamped.add_ripple(0, 0).unwrap();

        let mut solver = CpuStencilSolver::new();
        for _ in 0..4 {
            solver.step_heightfield_obstacle(&mut masked);
            solver.step_heightfield(&mut clamped);
        }
        assert_eq!(masked.points(), clamped.points());
        assert_eq!(masked.accumulator(), clamped.accumulator());
    }

    #[test]
    fn test_branchless_matches_branching() {
        let mut a = SurfaceGrid::new(30, 24, 0.05).unwrap();
        for (x, y) in [(3, 3), (15, 12), (29, 0), (10, 20)] {
            a.add_ripple(x, y).unwrap();
        }
        let mut b = a.clone();

        let mut branching = CpuStencilSolver::with_mask_strategy(MaskStrategy::Branching);
        let mut branchless = CpuStencilSolver::with_mask_strategy(MaskStrategy::Branchless);
        for _ in 0..20 {
            branching.step_heightfield_obstacle(&mut a);
            branchless.step_heightfield_obstacle(&mut b);
        }
        assert_eq!(a.points(), b.points());
        assert_eq!(a.accumulator(), b.accumulator());
    }

    #[test]
    fn test_procedural_is_pure() {
        let mut a = SurfaceGrid::new(16, 8, 0.1).unwrap();
        let mut b = SurfaceGrid::new(16, 8, 0.1).unwrap();
        b.add_ripple(4, 4).unwrap();
        b.set_height(1, 1, 9.0);

        let mut solver = CpuStencilSolver::new();
        solver.step_procedural(&mut a, 12.5);
        solver.step_procedural(&mut b, 12.5);
        assert_eq!(a.points(), b.points());
        assert_eq!(a.height_at(5, 3), procedural_height(5, 3, 0.1, 12.5));
    }
}
