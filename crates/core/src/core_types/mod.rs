//! Core types shared by the grid, solvers and FFI layer.

pub mod vec4;

pub use vec4::Vec4;
