// ─────────────────────────────────────────────────────────────────────
// BhTomo Core — LSQR Inversion Loop
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! The damped iterative inversion loop.
//!
//! Port of `inversionUI.py invLSQR` with the GUI stripped out: results
//! come back as a [`Tomogram`], progress goes through a non-blocking
//! callback, cancellation through an atomic flag checked only between
//! outer iterations.
//!
//! Each outer iteration linearizes around a scalar baseline slowness,
//! solves the damped sparse system with LSQR, clamps the per-iteration
//! velocity variation and re-traces rays through the updated field.
//! The straight/curved distinction is a phase label on the iteration
//! counter; both phases run the identical body.

use std::sync::atomic::{AtomicBool, Ordering};

use tomo_grid::forward::ForwardModel;
use tomo_math::lsqr::lsqr;
use tomo_math::sparse::CsrMatrix;
use tomo_types::config::InversionConfig;
use tomo_types::error::{TomoError, TomoResult};
use tomo_types::state::ObservationSet;

use crate::result::Tomogram;

/// Minimum non-zero sensitivity rows for a solvable geometry.
const MIN_NONZERO_ROWS: usize = 2;

/// Ray phase label carried by progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayPhase {
    Straight,
    Curved,
}

/// Fire-and-forget notification emitted once per outer iteration.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent {
    pub iteration: usize,
    pub phase: RayPhase,
}

/// Fixed-slowness cell constraints appended as weighted rows.
#[derive(Debug, Clone, Default)]
pub struct SlownessConstraints {
    pub cells: Vec<usize>,
    pub values: Vec<f64>,
}

/// One configured inversion run.
pub struct LsqrInversion<'a> {
    config: &'a InversionConfig,
    constraints: Option<&'a SlownessConstraints>,
    progress: Option<Box<dyn Fn(ProgressEvent) + 'a>>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> LsqrInversion<'a> {
    pub fn new(config: &'a InversionConfig) -> Self {
        LsqrInversion {
            config,
            constraints: None,
            progress: None,
            cancel: None,
        }
    }

    pub fn with_constraints(mut self, constraints: &'a SlownessConstraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// The callback must not block; the loop never waits on it.
    pub fn on_progress(mut self, callback: impl Fn(ProgressEvent) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Cooperative cancellation, honoured between outer iterations.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Run the full Solve → Damp → Retrace loop.
    pub fn run<F: ForwardModel>(
        &self,
        model: &F,
        obs: &ObservationSet,
    ) -> TomoResult<Tomogram> {
        self.config.validate()?;
        if obs.is_empty() {
            return Err(TomoError::NoValidObservations {
                total: obs.mask.len(),
            });
        }

        let n_cells = model.n_cells();
        let (cx, cy, cz) = model.cell_centers();
        let mut tomo = Tomogram::new(cx, cy, cz, n_cells, obs.origin.clone());

        // Iteration-0 seed: cheap straight-line matrix.
        let mut l = model.straight_ray_matrix(&obs.tx, &obs.rx)?;
        let nonzero = l.nonzero_rows();
        if nonzero < MIN_NONZERO_ROWS {
            return Err(TomoError::DegenerateGeometry {
                nonzero_rows: nonzero,
                required: MIN_NONZERO_ROWS,
            });
        }

        let smoothing_active =
            self.config.alpha_x > 0.0 || self.config.alpha_y > 0.0 || self.config.alpha_z > 0.0;
        let operators = if smoothing_active {
            Some(model.derivative_operators(self.config.order)?)
        } else {
            None
        };

        let n_iterations = self.config.total_iterations();
        let mut s_prev: Vec<f64> = Vec::new();

        for no_iter in 0..n_iterations {
            if let Some(flag) = self.cancel {
                if flag.load(Ordering::Relaxed) {
                    tomo.cancelled = true;
                    break;
                }
            }
            let phase = if no_iter < self.config.num_it_straight {
                RayPhase::Straight
            } else {
                RayPhase::Curved
            };

            // Scalar baseline slowness: picked apparent slownesses on
            // the first pass, the current field's mean afterwards.
            let row_sums = l.row_sums();
            let l_mean = if no_iter == 0 {
                mean_apparent_slowness(&obs.values, &row_sums)
            } else {
                tomo.s.iter().sum::<f64>() / tomo.s.len() as f64
            };
            if no_iter == 0 {
                s_prev = vec![l_mean; n_cells];
            }

            // Residual against the uniform-baseline prediction.
            let dt: Vec<f64> = obs
                .values
                .iter()
                .zip(row_sums.iter())
                .map(|(&t, &rs)| t - rs * l_mean)
                .collect();

            let ans = self.solve_system(&l, &dt, operators.as_ref(), l_mean);
            if !ans.converged {
                log::warn!(
                    "LSQR hit the iteration cap ({}) at outer iteration {no_iter}, \
                     applying best correction anyway",
                    self.config.max_solver_iterations
                );
            }
            tomo.res.push(ans.residual);
            log::debug!("outer iteration {no_iter}: residual norm {:.6e}", ans.residual);

            // Velocity-variation clamp around the previous field.
            let mut x = ans.x;
            clamp_velocity_variation(&mut x, &s_prev, l_mean, self.config.dv_max);

            let s_new: Vec<f64> = x.iter().map(|&xi| xi + l_mean).collect();
            s_prev.clone_from(&s_new);

            // Re-trace through the updated field; the new matrix and
            // rays supersede the previous iteration's.
            let traced = model.raytrace(&s_new, &obs.tx, &obs.rx)?;
            l = traced.sensitivity;
            tomo.s = s_new;
            tomo.rays = traced.rays;
            tomo.l = l.clone();
            tomo.completed_iterations = no_iter + 1;

            if self.config.save_inv_data {
                let mut predicted = vec![0.0; l.nrows];
                l.spmv(&tomo.s, &mut predicted);
                let residuals: Vec<f64> = obs
                    .values
                    .iter()
                    .zip(predicted.iter())
                    .map(|(&t, &p)| t - p)
                    .collect();
                tomo.push_snapshot(tomo.s.clone(), residuals);
            }

            if let Some(callback) = &self.progress {
                callback(ProgressEvent {
                    iteration: no_iter,
                    phase,
                });
            }
        }

        Ok(tomo)
    }

    /// Plain damped solve, or the stacked regularized system when
    /// smoothing weights or constraints are active.
    fn solve_system(
        &self,
        l: &CsrMatrix,
        dt: &[f64],
        operators: Option<&(CsrMatrix, CsrMatrix, CsrMatrix)>,
        l_mean: f64,
    ) -> tomo_math::lsqr::LsqrResult {
        let cfg = self.config;
        let constraints = self.constraints.filter(|_| cfg.use_constraints);

        if operators.is_none() && constraints.is_none() {
            return lsqr(l, dt, cfg.tol, cfg.tol, cfg.max_solver_iterations);
        }

        let mut blocks: Vec<CsrMatrix> = Vec::new();
        let mut rhs = dt.to_vec();
        if let Some((dx, dy, dz)) = operators {
            for (d, alpha) in [(dx, cfg.alpha_x), (dy, cfg.alpha_y), (dz, cfg.alpha_z)] {
                if alpha > 0.0 && d.nrows > 0 {
                    blocks.push(d.scaled(alpha));
                    rhs.extend(std::iter::repeat(0.0).take(d.nrows));
                }
            }
        }
        if let Some(cont) = constraints {
            let triplets: Vec<(usize, usize, f64)> = cont
                .cells
                .iter()
                .enumerate()
                .map(|(row, &cell)| (row, cell, cfg.w_cont))
                .collect();
            blocks.push(CsrMatrix::from_triplets(cont.cells.len(), l.ncols, &triplets));
            rhs.extend(cont.values.iter().map(|&sv| cfg.w_cont * (sv - l_mean)));
        }

        let all: Vec<&CsrMatrix> = std::iter::once(l).chain(blocks.iter()).collect();
        let a = CsrMatrix::vstack(&all);
        let ans = lsqr(&a, &rhs, cfg.tol, cfg.tol, cfg.max_solver_iterations);

        // Residual bookkeeping stays comparable across iterations: keep
        // the data-misfit part only.
        let mut predicted = vec![0.0; l.nrows];
        l.spmv(&ans.x, &mut predicted);
        let data_residual = predicted
            .iter()
            .zip(dt.iter())
            .map(|(&p, &d)| (d - p) * (d - p))
            .sum::<f64>()
            .sqrt();
        tomo_math::lsqr::LsqrResult {
            residual: data_residual,
            ..ans
        }
    }
}

/// Mean of observed value over total ray length, skipping untraced
/// (zero row sum) observations.
fn mean_apparent_slowness(values: &ndarray::Array1<f64>, row_sums: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (&t, &rs) in values.iter().zip(row_sums.iter()) {
        if rs != 0.0 {
            sum += t / rs;
            count += 1;
        }
    }
    // At least MIN_NONZERO_ROWS rows are non-zero by the time this runs.
    sum / count as f64
}

/// Rescale `x` so no cell's relative slowness change versus `s_prev`
/// exceeds `dv_max`.
///
/// The factor is the original's global scalar minimum, not a per-cell
/// clamp: one uniform damping factor scales the whole correction.
/// Cells with a zero correction are excluded from the minimization.
/// Returns the factor when damping fired.
pub fn clamp_velocity_variation(
    x: &mut [f64],
    s_prev: &[f64],
    l_mean: f64,
    dv_max: f64,
) -> Option<f64> {
    let max_change = x
        .iter()
        .zip(s_prev.iter())
        .map(|(&xi, &sp)| (sp / (xi + l_mean) - 1.0).abs())
        .fold(0.0_f64, f64::max);
    if !(max_change > dv_max) {
        return None;
    }

    let fac = x
        .iter()
        .zip(s_prev.iter())
        .filter(|&(&xi, _)| xi != 0.0)
        .map(|(&xi, &sp)| ((sp / (dv_max + 1.0) - l_mean) / xi).abs())
        .fold(f64::INFINITY, f64::min);
    if !fac.is_finite() {
        return None;
    }

    for xi in x.iter_mut() {
        *xi *= fac;
    }
    Some(fac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_noop_within_bound() {
        let mut x = vec![0.001, -0.002];
        let s_prev = vec![1.0, 1.0];
        let fac = clamp_velocity_variation(&mut x, &s_prev, 1.0, 0.05);
        assert!(fac.is_none());
        assert!((x[0] - 0.001).abs() < 1e-15);
    }

    #[test]
    fn test_clamp_limits_realized_change() {
        let dv = 0.01;
        let mut x = vec![-0.9, 0.9];
        let s_prev = vec![1.0, 1.0];
        let fac = clamp_velocity_variation(&mut x, &s_prev, 1.0, dv).unwrap();
        assert!(fac > 0.0 && fac < 1.0);
        for (&xi, &sp) in x.iter().zip(s_prev.iter()) {
            let realized = (sp / (xi + 1.0) - 1.0).abs();
            assert!(realized <= dv + 1e-12, "realized change {realized}");
        }
        // The binding (negative) cell sits exactly on the bound.
        let realized0 = (s_prev[0] / (x[0] + 1.0) - 1.0).abs();
        assert!((realized0 - dv).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_ignores_zero_corrections() {
        let dv = 0.01;
        let mut x = vec![0.0, 0.9];
        let s_prev = vec![1.0, 1.0];
        let fac = clamp_velocity_variation(&mut x, &s_prev, 1.0, dv);
        assert!(fac.is_some());
        assert_eq!(x[0], 0.0);
        let realized1 = (s_prev[1] / (x[1] + 1.0) - 1.0).abs();
        assert!(realized1 <= dv + 1e-12);
    }

    #[test]
    fn test_clamp_all_zero_correction_is_noop() {
        // A drifted baseline can exceed dv_max with x = 0; with no
        // non-zero denominator there is nothing to rescale.
        let mut x = vec![0.0, 0.0];
        let s_prev = vec![2.0, 2.0];
        let fac = clamp_velocity_variation(&mut x, &s_prev, 1.0, 0.01);
        assert!(fac.is_none());
    }

    #[test]
    fn test_mean_apparent_slowness_skips_zero_rows() {
        let values = ndarray::Array1::from_vec(vec![2.0, 100.0, 4.0]);
        let row_sums = vec![4.0, 0.0, 8.0];
        let m = mean_apparent_slowness(&values, &row_sums);
        assert!((m - 0.5).abs() < 1e-15);
    }
}
