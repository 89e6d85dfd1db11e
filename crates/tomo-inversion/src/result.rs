// ─────────────────────────────────────────────────────────────────────
// BhTomo Core — Tomogram
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Inversion result and diagnostics store.
//!
//! Append-only while a run executes; readers only ever get committed,
//! complete copies via [`Tomogram::snapshot`].

use ndarray::Array1;
use tomo_math::sparse::CsrMatrix;
use tomo_types::state::RayPath;

/// Per-iteration diagnostics retained when `save_inv_data` is set.
#[derive(Debug, Clone)]
pub struct IterationSnapshot {
    /// Slowness field after the iteration's update.
    pub s: Vec<f64>,
    /// Per-observation residual, observed − L·s with the re-traced L.
    pub residuals: Vec<f64>,
}

/// The evolving inversion state handed to the presentation layer.
#[derive(Debug, Clone)]
pub struct Tomogram {
    /// Current slowness field, one value per grid cell.
    pub s: Vec<f64>,
    /// Cell-center coordinates (y empty on 2D grids).
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub z: Array1<f64>,
    /// Latest sensitivity matrix.
    pub l: CsrMatrix,
    /// Latest ray geometries.
    pub rays: Vec<RayPath>,
    /// Solver residual norm, one entry per completed outer iteration.
    pub res: Vec<f64>,
    /// (survey, trace) origin of each observation row.
    pub no_trace: Vec<(usize, usize)>,
    /// Retained per-iteration diagnostics.
    pub inv_data: Vec<IterationSnapshot>,
    pub completed_iterations: usize,
    /// Set when the run was cancelled between iterations.
    pub cancelled: bool,
}

impl Tomogram {
    pub fn new(
        x: Array1<f64>,
        y: Array1<f64>,
        z: Array1<f64>,
        n_cells: usize,
        no_trace: Vec<(usize, usize)>,
    ) -> Self {
        Tomogram {
            s: Vec::new(),
            x,
            y,
            z,
            l: CsrMatrix::zeros(0, n_cells),
            rays: Vec::new(),
            res: Vec::new(),
            no_trace,
            inv_data: Vec::new(),
            completed_iterations: 0,
            cancelled: false,
        }
    }

    pub fn push_snapshot(&mut self, s: Vec<f64>, residuals: Vec<f64>) {
        self.inv_data.push(IterationSnapshot { s, residuals });
    }

    /// Committed copy for display while (or after) a run executes.
    pub fn snapshot(&self) -> Tomogram {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tomogram_is_empty() {
        let t = Tomogram::new(
            Array1::zeros(3),
            Array1::zeros(0),
            Array1::zeros(4),
            12,
            vec![(0, 0), (0, 1)],
        );
        assert!(t.s.is_empty());
        assert!(t.res.is_empty());
        assert_eq!(t.l.ncols, 12);
        assert_eq!(t.completed_iterations, 0);
        assert!(!t.cancelled);
    }

    #[test]
    fn test_snapshot_is_decoupled_copy() {
        let mut t = Tomogram::new(
            Array1::zeros(1),
            Array1::zeros(0),
            Array1::zeros(1),
            1,
            vec![],
        );
        t.s = vec![0.5];
        let snap = t.snapshot();
        t.s[0] = 0.9;
        t.res.push(1.0);
        assert!((snap.s[0] - 0.5).abs() < 1e-15);
        assert!(snap.res.is_empty());
    }
}
