// ─────────────────────────────────────────────────────────────────────
// BhTomo Core — Smoothing Operators
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Finite-difference regularization operators over the cell grid.
//!
//! First order penalizes the slowness gradient between neighbouring
//! cells, second order the curvature across cell triples. Spacings come
//! from cell-center distances, so non-uniform grids are handled.

use tomo_math::sparse::CsrMatrix;
use tomo_types::error::{TomoError, TomoResult};
use tomo_types::state::Grid;

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
    Z,
}

/// (Dx, Dy, Dz) of the given order (1 or 2). Dy has zero rows on a 2D
/// grid.
pub fn derivative_operators(
    grid: &Grid,
    order: u8,
) -> TomoResult<(CsrMatrix, CsrMatrix, CsrMatrix)> {
    if !(1..=2).contains(&order) {
        return Err(TomoError::ConfigError(format!(
            "derivative order must be 1 or 2, got {order}"
        )));
    }
    let dx = axis_operator(grid, Axis::X, order);
    let dy = if grid.is_3d() {
        axis_operator(grid, Axis::Y, order)
    } else {
        CsrMatrix::zeros(0, grid.n_cells())
    };
    let dz = axis_operator(grid, Axis::Z, order);
    Ok((dx, dy, dz))
}

fn axis_operator(grid: &Grid, axis: Axis, order: u8) -> CsrMatrix {
    let (nx, ny, nz) = grid.cell_dims();
    let (cx, cy, cz) = grid.cell_centers();
    // `along` runs over the differentiated axis, (a, b) over the other
    // two.
    let (centers, along, na, nb) = match axis {
        Axis::X => (cx, nx, ny, nz),
        Axis::Y => (cy, ny, nx, nz),
        Axis::Z => (cz, nz, nx, ny),
    };
    let cell = |i: usize, a: usize, b: usize| match axis {
        Axis::X => grid.cell_index(i, a, b),
        Axis::Y => grid.cell_index(a, i, b),
        Axis::Z => grid.cell_index(a, b, i),
    };

    let n_cells = grid.n_cells();
    let stencil = order as usize + 1;
    if along < stencil {
        return CsrMatrix::zeros(0, n_cells);
    }

    let mut triplets = Vec::new();
    let mut row = 0;
    for b in 0..nb {
        for a in 0..na {
            for i in 0..along - stencil + 1 {
                match order {
                    1 => {
                        let h = centers[i + 1] - centers[i];
                        triplets.push((row, cell(i, a, b), -1.0 / h));
                        triplets.push((row, cell(i + 1, a, b), 1.0 / h));
                    }
                    _ => {
                        let h1 = centers[i + 1] - centers[i];
                        let h2 = centers[i + 2] - centers[i + 1];
                        triplets.push((row, cell(i, a, b), 2.0 / (h1 * (h1 + h2))));
                        triplets.push((row, cell(i + 1, a, b), -2.0 / (h1 * h2)));
                        triplets.push((row, cell(i + 2, a, b), 2.0 / (h2 * (h1 + h2))));
                    }
                }
                row += 1;
            }
        }
    }
    CsrMatrix::from_triplets(row, n_cells, &triplets)
}
