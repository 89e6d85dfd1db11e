// ─────────────────────────────────────────────────────────────────────
// BhTomo Core — Forward Model Interface
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! The contract the inversion loop holds against any ray tracer.

use ndarray::{Array1, Array2};
use tomo_math::sparse::CsrMatrix;
use tomo_types::error::TomoResult;
use tomo_types::state::RayPath;

/// Output of one tracing pass over the full observation set.
#[derive(Debug, Clone)]
pub struct TraceOutput {
    /// Predicted value per observation.
    pub travel_times: Vec<f64>,
    /// Path length per (observation, cell); supersedes the previous
    /// iteration's matrix.
    pub sensitivity: CsrMatrix,
    /// Geometric path of each observation's ray.
    pub rays: Vec<RayPath>,
}

/// A forward/sensitivity provider.
///
/// Whether rays are straight or bent is the implementation's business;
/// the inversion loop calls the same operations every outer iteration.
pub trait ForwardModel {
    /// Number of slowness unknowns (grid cells).
    fn n_cells(&self) -> usize;

    /// Cell-center coordinates per axis (y empty on 2D grids).
    fn cell_centers(&self) -> (Array1<f64>, Array1<f64>, Array1<f64>);

    /// Cheap straight-line sensitivity matrix, the iteration-0 seed.
    /// `tx`/`rx` are paired [n, 3] coordinate arrays.
    fn straight_ray_matrix(&self, tx: &Array2<f64>, rx: &Array2<f64>) -> TomoResult<CsrMatrix>;

    /// Trace through `slowness` and return predicted values, the new
    /// sensitivity matrix and the ray geometries.
    fn raytrace(
        &self,
        slowness: &[f64],
        tx: &Array2<f64>,
        rx: &Array2<f64>,
    ) -> TomoResult<TraceOutput>;

    /// Finite-difference smoothing operators (Dx, Dy, Dz) of the given
    /// order over the cell grid. Dy has zero rows on 2D grids.
    fn derivative_operators(&self, order: u8) -> TomoResult<(CsrMatrix, CsrMatrix, CsrMatrix)>;
}
