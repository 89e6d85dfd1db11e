// ─────────────────────────────────────────────────────────────────────
// BhTomo Core — Straight-Ray Model
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Straight-ray forward model.
//!
//! Builds path-length sensitivity rows by marching each Tx–Rx segment
//! in fixed steps and binning step lengths into the cells the midpoints
//! fall in. Samples outside the grid contribute nothing, which leaves a
//! zero row for a fully untraced observation.

use ndarray::{Array1, Array2};
use tomo_math::sparse::CsrMatrix;
use tomo_types::error::{TomoError, TomoResult};
use tomo_types::state::{Grid, RayPath};

use crate::derivative::derivative_operators;
use crate::forward::{ForwardModel, TraceOutput};

/// Ray march samples per ray.
const DEFAULT_RAY_SAMPLES: usize = 256;

#[derive(Debug, Clone)]
pub struct StraightRayModel {
    grid: Grid,
    samples: usize,
}

impl StraightRayModel {
    pub fn new(grid: Grid) -> Self {
        StraightRayModel {
            grid,
            samples: DEFAULT_RAY_SAMPLES,
        }
    }

    pub fn with_samples(grid: Grid, samples: usize) -> Self {
        StraightRayModel { grid, samples }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Accumulate per-cell path lengths of every Tx–Rx segment.
    fn build_matrix(&self, tx: &Array2<f64>, rx: &Array2<f64>) -> TomoResult<CsrMatrix> {
        if tx.nrows() != rx.nrows() {
            return Err(TomoError::DimensionMismatch(format!(
                "{} sources vs {} receivers",
                tx.nrows(),
                rx.nrows()
            )));
        }
        let n_obs = tx.nrows();
        let n_cells = self.grid.n_cells();
        let mut triplets: Vec<(usize, usize, f64)> = Vec::new();

        for i in 0..n_obs {
            let sx = tx[[i, 0]];
            let sy = tx[[i, 1]];
            let sz = tx[[i, 2]];
            let ex = rx[[i, 0]];
            let ey = rx[[i, 1]];
            let ez = rx[[i, 2]];
            let length =
                ((ex - sx).powi(2) + (ey - sy).powi(2) + (ez - sz).powi(2)).sqrt();
            if length == 0.0 {
                continue;
            }
            let dl = length / self.samples as f64;

            for k in 0..self.samples {
                // Midpoint sampling keeps node-aligned rays out of the
                // ambiguous boundary case.
                let t = (k as f64 + 0.5) / self.samples as f64;
                let x = sx + t * (ex - sx);
                let y = sy + t * (ey - sy);
                let z = sz + t * (ez - sz);

                if let Some(cell) = self.locate_cell(x, y, z) {
                    triplets.push((i, cell, dl));
                }
            }
        }

        Ok(CsrMatrix::from_triplets(n_obs, n_cells, &triplets))
    }

    /// Flat cell index containing (x, y, z), None outside the grid.
    fn locate_cell(&self, x: f64, y: f64, z: f64) -> Option<usize> {
        let ix = locate(&self.grid.grx, x)?;
        let iz = locate(&self.grid.grz, z)?;
        let iy = if self.grid.is_3d() {
            locate(&self.grid.gry, y)?
        } else {
            0
        };
        Some(self.grid.cell_index(ix, iy, iz))
    }
}

/// Interval index of `x` within sorted `nodes`, clamping the upper
/// node onto the last cell.
fn locate(nodes: &Array1<f64>, x: f64) -> Option<usize> {
    let n = nodes.len();
    if n < 2 || x < nodes[0] || x > nodes[n - 1] {
        return None;
    }
    let mut lo = 0;
    let mut hi = n - 1;
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if nodes[mid] <= x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(lo.min(n - 2))
}

impl ForwardModel for StraightRayModel {
    fn n_cells(&self) -> usize {
        self.grid.n_cells()
    }

    fn cell_centers(&self) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
        self.grid.cell_centers()
    }

    fn straight_ray_matrix(&self, tx: &Array2<f64>, rx: &Array2<f64>) -> TomoResult<CsrMatrix> {
        self.build_matrix(tx, rx)
    }

    fn raytrace(
        &self,
        slowness: &[f64],
        tx: &Array2<f64>,
        rx: &Array2<f64>,
    ) -> TomoResult<TraceOutput> {
        if slowness.len() != self.grid.n_cells() {
            return Err(TomoError::DimensionMismatch(format!(
                "slowness has {} cells, grid has {}",
                slowness.len(),
                self.grid.n_cells()
            )));
        }
        let sensitivity = self.build_matrix(tx, rx)?;
        let mut travel_times = vec![0.0; sensitivity.nrows];
        sensitivity.spmv(slowness, &mut travel_times);

        let rays: Vec<RayPath> = (0..tx.nrows())
            .map(|i| {
                vec![
                    [tx[[i, 0]], tx[[i, 1]], tx[[i, 2]]],
                    [rx[[i, 0]], rx[[i, 1]], rx[[i, 2]]],
                ]
            })
            .collect();

        Ok(TraceOutput {
            travel_times,
            sensitivity,
            rays,
        })
    }

    fn derivative_operators(&self, order: u8) -> TomoResult<(CsrMatrix, CsrMatrix, CsrMatrix)> {
        derivative_operators(&self.grid, order)
    }
}
