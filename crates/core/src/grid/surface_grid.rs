//! Height-field surface grid
//!
//! Owns the point buffer, the height accumulator and the obstacle mask. All
//! three are created together and live together; reset clears the dynamic
//! state but keeps the lattice coordinates and the mask.

use super::obstacle::{ObstacleLayout, ObstacleMask};
use crate::core_types::Vec4;
use crate::error::{GridError, GridResult};
use rayon::prelude::*;
use tracing::debug;

/// Accumulator offset injected by [`SurfaceGrid::add_ripple`].
pub const RIPPLE_STRENGTH: f32 = 20.0;

/// Largest accepted width or height. Keeps every kernel index inside `i32`.
pub const MAX_GRID_DIMENSION: usize = 16_384;

/// Grid of homogeneous points whose `y` component evolves over time.
#[derive(Debug, Clone)]
pub struct SurfaceGrid {
    width: usize,
    height: usize,
    spacing: f32,
    points: Vec<Vec4>,
    accumulator: Vec<f32>,
    obstacles: ObstacleMask,
}

impl SurfaceGrid {
    /// Create a grid with the default centered obstacle block.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if a dimension is outside `1..=MAX_GRID_DIMENSION`
    /// or `spacing` is not finite and positive.
    pub fn new(width: usize, height: usize, spacing: f32) -> GridResult<Self> {
        Self::with_layout(width, height, spacing, ObstacleLayout::CenteredBlock)
    }

    /// Create a grid with an explicit obstacle layout.
    ///
    /// Points are laid out with `x = i*spacing - height*spacing/2` and
    /// `z = j*spacing - width*spacing/2`, `y = 0`, `w = 1`.
    ///
    /// # Errors
    ///
    /// Same as [`SurfaceGrid::new`].
    pub fn with_layout(
        width: usize,
        height: usize,
        spacing: f32,
        layout: ObstacleLayout,
    ) -> GridResult<Self> {
        let valid = 1..=MAX_GRID_DIMENSION;
        if !valid.contains(&width) || !valid.contains(&height) {
            return Err(GridError::InvalidDimensions {
                width,
                height,
                max: MAX_GRID_DIMENSION,
            });
        }
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(GridError::InvalidSpacing(spacing));
        }

        let x_offset = height as f32 * spacing / 2.0;
        let z_offset = width as f32 * spacing / 2.0;
        let points = (0..height)
            .flat_map(|j| (0..width).map(move |i| (i, j)))
            .map(|(i, j)| {
                Vec4::new(
                    i as f32 * spacing - x_offset,
                    0.0,
                    j as f32 * spacing - z_offset,
                    1.0,
                )
            })
            .collect();

        let obstacles = ObstacleMask::new(width, height, layout);
        debug!(
            "Created {}x{} surface grid (spacing {}, {} obstacle points)",
            width,
            height,
            spacing,
            obstacles.interior_obstacle_count()
        );

        Ok(Self {
            width,
            height,
            spacing,
            points,
            accumulator: vec![0.0; width * height],
            obstacles,
        })
    }

    /// Zero every height and accumulator value.
    pub fn reset(&mut self) {
        self.points.par_iter_mut().for_each(|p| p.y = 0.0);
        self.accumulator.fill(0.0);
    }

    /// Add [`RIPPLE_STRENGTH`] to the accumulator at grid point `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] if `(x, y)` is outside the grid; the
    /// grid is left unchanged.
    pub fn add_ripple(&mut self, x: i64, y: i64) -> GridResult<()> {
        let idx = self.checked_index(x, y)?;
        self.accumulator[idx] += RIPPLE_STRENGTH;
        Ok(())
    }

    fn checked_index(&self, x: i64, y: i64) -> GridResult<usize> {
        match (usize::try_from(x), usize::try_from(y)) {
            (Ok(i), Ok(j)) if i < self.width && j < self.height => Ok(self.index(i, j)),
            _ => Err(GridError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            }),
        }
    }

    /// Row-major index of grid point `(i, j)`.
    #[inline]
    #[must_use]
    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.width + i
    }

    /// Grid width in points
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in points
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance between adjacent lattice points
    #[must_use]
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Number of points (`width * height`)
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; a grid has at least one point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point positions, row-major with `j` outer.
    #[must_use]
    pub fn points(&self) -> &[Vec4] {
        &self.points
    }

    /// Point positions as a flat float buffer: offset `4*(j*width+i) + component`.
    #[must_use]
    pub fn points_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.points)
    }

    /// Height (`y`) of grid point `(i, j)`.
    #[must_use]
    pub fn height_at(&self, i: usize, j: usize) -> f32 {
        self.points[self.index(i, j)].y
    }

    /// Accumulator value of grid point `(i, j)`.
    #[must_use]
    pub fn accumulator_at(&self, i: usize, j: usize) -> f32 {
        self.accumulator[self.index(i, j)]
    }

    /// Height accumulator, row-major.
    #[must_use]
    pub fn accumulator(&self) -> &[f32] {
        &self.accumulator
    }

    /// Obstacle mask over the padded grid.
    #[must_use]
    pub fn obstacles(&self) -> &ObstacleMask {
        &self.obstacles
    }

    pub(crate) fn points_mut(&mut self) -> &mut [Vec4] {
        &mut self.points
    }

    pub(crate) fn accumulator_mut(&mut self) -> &mut [f32] {
        &mut self.accumulator
    }

    /// Split borrow for the diffusion pass: heights are read while the
    /// accumulator is written.
    pub(crate) fn stencil_fields(&mut self) -> (&[Vec4], &mut [f32], &ObstacleMask) {
        (&self.points, &mut self.accumulator, &self.obstacles)
    }

    /// Pass 2 of every diffusion step: `y += accumulator`.
    ///
    /// With `masked`, obstacle points are left untouched.
    pub(crate) fn fold_accumulator(&mut self, masked: bool) {
        let width = self.width;
        let obstacles = &self.obstacles;
        self.points
            .par_chunks_mut(width)
            .zip(self.accumulator.par_chunks(width))
            .enumerate()
            .for_each(|(j, (row, acc_row))| {
                for (i, (point, &acc)) in row.iter_mut().zip(acc_row).enumerate() {
                    if !masked || !obstacles.is_obstacle(i, j) {
                        point.y += acc;
                    }
                }
            });
    }

    #[cfg(test)]
    pub(crate) fn set_height(&mut self, i: usize, j: usize, value: f32) {
        let idx = self.index(i, j);
        self.points[idx].y = value;
    }
}
