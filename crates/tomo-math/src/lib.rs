//! Numerical primitives for the tomographic inversion core.

pub mod lsqr;
pub mod sparse;
