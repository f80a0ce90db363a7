//! Vector type alias for homogeneous point positions.

use nalgebra::Vector4;

/// Homogeneous 4-component point `(x, y, z, w)`.
///
/// This is a simple alias for `nalgebra::Vector4<f32>`. It is `#[repr(C)]`
/// storage of four consecutive floats, so a `&[Vec4]` can be viewed as the
/// flat float buffer that renderers and compute kernels consume.
pub type Vec4 = Vector4<f32>;

