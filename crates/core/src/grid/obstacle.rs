//! Padded obstacle mask
//!
//! The mask covers a `(width + 2) x (height + 2)` grid: a closed one-cell wall
//! around the simulation grid plus interior obstacle markers. Grid point
//! `(i, j)` lives at padded cell `(i + 1, j + 1)`.

use serde::{Deserialize, Serialize};

/// Mask value for an open cell.
pub const OPEN: i32 = 0;
/// Mask value for an obstacle cell.
pub const OBSTACLE: i32 = 1;

/// Which interior cells are marked as obstacles at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ObstacleLayout {
    /// Centered rectangle covering roughly a third of each dimension.
    #[default]
    CenteredBlock,
    /// Only the padded border wall; every grid point is open.
    BorderOnly,
}

/// Immutable obstacle flags over the padded grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObstacleMask {
    width: usize,
    height: usize,
    cells: Vec<i32>,
}

impl ObstacleMask {
    /// Build the mask for a `width x height` grid.
    ///
    /// Every border cell of the padded grid is an obstacle. With
    /// [`ObstacleLayout::CenteredBlock`], point `(i, j)` is also an obstacle when
    /// `|i - width/2| < width/6` and `|j - height/2| < height/6` (integer division).
    #[must_use]
    pub fn new(width: usize, height: usize, layout: ObstacleLayout) -> Self {
        let padded_width = width + 2;
        let padded_height = height + 2;
        let mut cells = vec![OPEN; padded_width * padded_height];

        if layout == ObstacleLayout::CenteredBlock {
            let (cx, cy) = (width as i64 / 2, height as i64 / 2);
            let (rx, ry) = (width as i64 / 6, height as i64 / 6);
            for j in 0..height {
                for i in 0..width {
                    if (i as i64 - cx).abs() < rx && (j as i64 - cy).abs() < ry {
                        cells[(j + 1) * padded_width + i + 1] = OBSTACLE;
                    }
                }
            }
        }

        // Closed walls
        for pj in 0..padded_height {
            cells[pj * padded_width] = OBSTACLE;
            cells[pj * padded_width + padded_width - 1] = OBSTACLE;
        }
        for pi in 0..padded_width {
            cells[pi] = OBSTACLE;
            cells[(padded_height - 1) * padded_width + pi] = OBSTACLE;
        }

        Self {
            width,
            height,
            cells,
        }
    }

    /// Width of the padded grid (`width + 2`)
    #[must_use]
    pub fn padded_width(&self) -> usize {
        self.width + 2
    }

    /// Height of the padded grid (`height + 2`)
    #[must_use]
    pub fn padded_height(&self) -> usize {
        self.height + 2
    }

    /// Flag at padded cell `(pi, pj)`.
    #[inline]
    #[must_use]
    pub fn padded_flag(&self, pi: usize, pj: usize) -> i32 {
        self.cells[pj * self.padded_width() + pi]
    }

    /// Flag of grid point `(i, j)`.
    #[inline]
    #[must_use]
    pub fn flag(&self, i: usize, j: usize) -> i32 {
        self.padded_flag(i + 1, j + 1)
    }

    /// Whether grid point `(i, j)` is an obstacle.
    #[inline]
    #[must_use]
    pub fn is_obstacle(&self, i: usize, j: usize) -> bool {
        self.flag(i, j) != OPEN
    }

    /// Flat row-major flags, offset `(j + 1) * padded_width + (i + 1)`.
    #[must_use]
    pub fn as_slice(&self) -> &[i32] {
        &self.cells
    }

    /// Number of grid points (not border cells) marked as obstacles.
    #[must_use]
    pub fn interior_obstacle_count(&self) -> usize {
        (0..self.height)
            .flat_map(|j| (0..self.width).map(move |i| (i, j)))
            .filter(|&(i, j)| self.is_obstacle(i, j))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_is_closed() {
        let mask = ObstacleMask::new(12, 9, ObstacleLayout::CenteredBlock);
        let (pw, ph) = (mask.padded_width(), mask.padded_height());
        assert_eq!(mask.as_slice().len(), pw * ph);

        for pi in 0..pw {
            assert_eq!(mask.padded_flag(pi, 0), OBSTACLE);
            assert_eq!(mask.padded_flag(pi, ph - 1), OBSTACLE);
        }
        for pj in 0..ph {
            assert_eq!(mask.padded_flag(0, pj), OBSTACLE);
            assert_eq!(mask.padded_flag(pw - 1, pj), OBSTACLE);
        }
    }

    #[test]
    fn test_centered_block_extent() {
        let mask = ObstacleMask::new(12, 12, ObstacleLayout::CenteredBlock);
        // width/2 = 6, width/6 = 2 -> columns 5..=7
        for j in 0..12 {
            for i in 0..12 {
                let expected = (5..=7).contains(&i) && (5..=7).contains(&j);
                assert_eq!(mask.is_obstacle(i, j), expected, "point ({i}, {j})");
            }
        }
        assert_eq!(mask.interior_obstacle_count(), 9);
    }

    #[test]
    fn test_small_grid_has_no_interior_block() {
        // width/6 == 0, so no interior cell satisfies |i - c| < 0
        let mask = ObstacleMask::new(4, 4, ObstacleLayout::CenteredBlock);
        assert_eq!(mask.interior_obstacle_count(), 0);
    }

    #[test]
    fn test_border_only_layout() {
        let mask = ObstacleMask::new(30, 30, ObstacleLayout::BorderOnly);
        assert_eq!(mask.interior_obstacle_count(), 0);
        assert_eq!(mask.padded_flag(0, 5), OBSTACLE);
    }

    #[test]
    fn test_padded_offset_layout() {
        let mask = ObstacleMask::new(12, 12, ObstacleLayout::CenteredBlock);
        let pw = mask.padded_width();
        let (i, j) = (6, 6);
        assert_eq!(mask.as_slice()[(j + 1) * pw + (i + 1)], OBSTACLE);
        assert_eq!(mask.as_slice()[2 * pw + 2], OPEN);
    }
}
