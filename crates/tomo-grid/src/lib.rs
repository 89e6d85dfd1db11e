//! Forward/sensitivity provider seam for the inversion loop.
//!
//! The solver only sees the [`forward::ForwardModel`] trait; the
//! bundled [`straight::StraightRayModel`] is the straight-ray
//! implementation used for iteration-0 seeding and testing. Curved-ray
//! tracers plug in behind the same trait.

pub mod derivative;
pub mod forward;
pub mod straight;
