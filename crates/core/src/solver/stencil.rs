//! Per-point update rules shared by the CPU solver and the WGSL kernels
//!
//! The kernels in `shaders/` evaluate exactly these expressions in the same
//! operation order. Any change here must be mirrored in the shader text.

/// Decay applied to the accumulator each diffusion step
pub const DECAY: f32 = 0.998;

/// Multiplier from elapsed wall-clock milliseconds to procedural wave time
pub const PROCEDURAL_TIME_SCALE: f32 = 0.05;

/// Procedural wave height at lattice point `(i, j)`.
///
/// ```text
/// y = 0.1 sin(0.01t + i s) + 0.15 sin(0.02t + j s) + 0.2 sin(0.03t + (i+j) s)
/// ```
#[inline]
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn procedural_height(i: usize, j: usize, spacing: f32, time: f32) -> f32 {
    let fi = i as f32;
    let fj = j as f32;
    0.1 * (0.01 * time + fi * spacing).sin()
        + 0.15 * (0.02 * time + fj * spacing).sin()
        + 0.2 * (0.03 * time + (i + j) as f32 * spacing).sin()
}

/// Mean of the four orthogonal neighbours, summed left, right, below, above.
#[inline]
#[must_use]
pub fn neighbour_mean(left: f32, right: f32, below: f32, above: f32) -> f32 {
    (left + right + below + above) * 0.25
}

/// Accumulator update for an open point.
#[inline]
#[must_use]
pub fn diffuse(acc: f32, mean: f32, center: f32) -> f32 {
    (acc + (mean - center)) * DECAY
}

/// Branch-free accumulator update.
///
/// `open` is `1.0` for an open point and `0.0` for an obstacle. For `1.0` the
/// result is bit-identical to [`diffuse`]; for `0.0` it returns `acc` unchanged.
#[inline]
#[must_use]
pub fn diffuse_masked(acc: f32, mean: f32, center: f32, open: f32) -> f32 {
    let delta = (mean - center) * open;
    let decay = 1.0 + (DECAY - 1.0) * open;
    (acc + delta) * decay
}

/// Clamped neighbour indices `(low, high)` of `k` along an axis of length `len`.
///
/// Edge points use themselves in place of the missing neighbour.
#[inline]
#[must_use]
pub fn clamped_neighbours(k: usize, len: usize) -> (usize, usize) {
    (k.saturating_sub(1), (k + 1).min(len - 1))
}
