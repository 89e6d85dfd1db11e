// ─────────────────────────────────────────────────────────────────────
// BhTomo Core — LSQR
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! LSQR iterative least-squares solver (Paige & Saunders, 1982).
//!
//! Solves `min ‖A·x − b‖₂` for sparse rectangular `A` via Golub-Kahan
//! bidiagonalization, one `A·v` and one `Aᵀ·u` product per iteration.
//! Stopping follows the reference implementation: the solve ends when
//! the residual satisfies the `atol`/`btol` compatibility tests or the
//! iteration cap is reached. Reaching the cap is not an error; the
//! caller gets the best iterate found so far.

use crate::sparse::CsrMatrix;

/// Result of an LSQR solve.
#[derive(Debug, Clone)]
pub struct LsqrResult {
    /// Best least-squares iterate.
    pub x: Vec<f64>,
    /// Bidiagonalization iterations performed.
    pub iterations: usize,
    /// Final residual norm ‖b − A·x‖₂.
    pub residual: f64,
    /// Whether a tolerance test was satisfied before the cap.
    pub converged: bool,
}

// ───────────────────────── BLAS-like helpers ─────────────────────────

#[inline]
fn vec_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

#[inline]
fn vec_scale(v: &mut [f64], alpha: f64) {
    for x in v.iter_mut() {
        *x *= alpha;
    }
}

/// `y = y + alpha * x` (axpy).
#[inline]
fn vec_axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}

// ───────────────────────────── solver ────────────────────────────────

/// Solve `min ‖A·x − b‖₂`.
///
/// `atol`/`btol` are the relative tolerances of the Paige-Saunders
/// stopping tests; `iter_lim` caps the bidiagonalization iterations.
pub fn lsqr(a: &CsrMatrix, b: &[f64], atol: f64, btol: f64, iter_lim: usize) -> LsqrResult {
    assert_eq!(b.len(), a.nrows, "rhs length must match row count");
    let n = a.ncols;

    let mut x = vec![0.0; n];

    // u = b / beta
    let mut u = b.to_vec();
    let bnorm = vec_norm(&u);
    if bnorm == 0.0 {
        return LsqrResult {
            x,
            iterations: 0,
            residual: 0.0,
            converged: true,
        };
    }
    let mut beta = bnorm;
    vec_scale(&mut u, 1.0 / beta);

    // v = A'u / alpha
    let mut v = vec![0.0; n];
    a.spmv_transpose(&u, &mut v);
    let mut alpha = vec_norm(&v);
    if alpha == 0.0 {
        // b is orthogonal to the range of A; x = 0 is the minimizer.
        return LsqrResult {
            x,
            iterations: 0,
            residual: bnorm,
            converged: true,
        };
    }
    vec_scale(&mut v, 1.0 / alpha);

    let mut w = v.clone();
    let mut phibar = beta;
    let mut rhobar = alpha;
    let mut anorm_sq = alpha * alpha;

    let mut scratch_m = vec![0.0; a.nrows];
    let mut scratch_n = vec![0.0; n];

    let mut iterations = 0;
    let mut converged = false;

    while iterations < iter_lim {
        iterations += 1;

        // u = A v - alpha u
        a.spmv(&v, &mut scratch_m);
        for (ui, &avi) in u.iter_mut().zip(scratch_m.iter()) {
            *ui = avi - alpha * *ui;
        }
        beta = vec_norm(&u);
        if beta > 0.0 {
            vec_scale(&mut u, 1.0 / beta);
        }
        anorm_sq += beta * beta;

        // v = A'u - beta v
        a.spmv_transpose(&u, &mut scratch_n);
        for (vi, &atui) in v.iter_mut().zip(scratch_n.iter()) {
            *vi = atui - beta * *vi;
        }
        alpha = vec_norm(&v);
        if alpha > 0.0 {
            vec_scale(&mut v, 1.0 / alpha);
        }
        anorm_sq += alpha * alpha;

        // Givens rotation eliminating beta from the bidiagonal system.
        let rho = rhobar.hypot(beta);
        let c = rhobar / rho;
        let s = beta / rho;
        let theta = s * alpha;
        rhobar = -c * alpha;
        let phi = c * phibar;
        phibar *= s;

        // x += (phi/rho) w;  w = v - (theta/rho) w
        let t1 = phi / rho;
        let t2 = -theta / rho;
        vec_axpy(t1, &w, &mut x);
        for (wi, &vi) in w.iter_mut().zip(v.iter()) {
            *wi = vi + t2 * *wi;
        }

        // Stopping tests (Paige & Saunders tests 1 and 2).
        let rnorm = phibar;
        let arnorm = alpha * (c * phibar).abs();
        let anorm = anorm_sq.sqrt();
        let xnorm = vec_norm(&x);

        if rnorm <= btol * bnorm + atol * anorm * xnorm {
            converged = true;
            break;
        }
        if anorm * rnorm > 0.0 && arnorm / (anorm * rnorm) <= atol {
            converged = true;
            break;
        }
        if alpha == 0.0 {
            converged = true;
            break;
        }
    }

    // Report the true residual of the returned iterate, not the
    // recurrence estimate.
    a.spmv(&x, &mut scratch_m);
    let residual = scratch_m
        .iter()
        .zip(b.iter())
        .map(|(&ax, &bi)| (bi - ax) * (bi - ax))
        .sum::<f64>()
        .sqrt();

    LsqrResult {
        x,
        iterations,
        residual,
        converged,
    }
}
