// ─────────────────────────────────────────────────────────────────────
// BhTomo Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use ndarray::{Array1, Array2};

/// Discretization of the inter-borehole panel.
///
/// Node coordinate vectors per axis; an empty `gry` denotes a 2D
/// (x, z) grid. Cells live between consecutive nodes, so each axis
/// contributes `len - 1` cells.
#[derive(Debug, Clone)]
pub struct Grid {
    pub grx: Array1<f64>,
    pub gry: Array1<f64>,
    pub grz: Array1<f64>,
}

impl Grid {
    /// 2D grid from node vectors.
    pub fn new_2d(grx: Array1<f64>, grz: Array1<f64>) -> Self {
        Grid {
            grx,
            gry: Array1::zeros(0),
            grz,
        }
    }

    /// 3D grid from node vectors.
    pub fn new_3d(grx: Array1<f64>, gry: Array1<f64>, grz: Array1<f64>) -> Self {
        Grid { grx, gry, grz }
    }

    pub fn is_3d(&self) -> bool {
        self.gry.len() >= 2
    }

    /// Cells per axis (nx, ny, nz); ny = 1 on 2D grids.
    pub fn cell_dims(&self) -> (usize, usize, usize) {
        let nx = self.grx.len().saturating_sub(1);
        let ny = if self.is_3d() { self.gry.len() - 1 } else { 1 };
        let nz = self.grz.len().saturating_sub(1);
        (nx, ny, nz)
    }

    /// Total cell count, one slowness unknown per cell.
    pub fn n_cells(&self) -> usize {
        let (nx, ny, nz) = self.cell_dims();
        nx * ny * nz
    }

    /// Cell-center coordinates per axis, midpoints of consecutive nodes.
    pub fn cell_centers(&self) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
        (
            midpoints(&self.grx),
            if self.is_3d() {
                midpoints(&self.gry)
            } else {
                Array1::zeros(0)
            },
            midpoints(&self.grz),
        )
    }

    /// Flat cell index of cell (ix, iy, iz); x fastest, z slowest.
    pub fn cell_index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        let (nx, ny, _) = self.cell_dims();
        (iz * ny + iy) * nx + ix
    }
}

fn midpoints(nodes: &Array1<f64>) -> Array1<f64> {
    if nodes.len() < 2 {
        return Array1::zeros(0);
    }
    let n = nodes.len() - 1;
    Array1::from_shape_fn(n, |i| 0.5 * (nodes[i] + nodes[i + 1]))
}

/// Geometric ray path, a polyline of (x, y, z) points.
pub type RayPath = Vec<[f64; 3]>;

/// The assembled per-run view across the selected surveys.
///
/// `values`, `uncertainties`, `origin`, `tx`, `rx` hold only the valid
/// observations; `mask` is full length (one flag per input trace over
/// all selected surveys, in selection order).
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSet {
    pub values: Array1<f64>,
    pub uncertainties: Array1<f64>,
    /// (survey position in selection, trace index) of each observation.
    pub origin: Vec<(usize, usize)>,
    pub mask: Vec<bool>,
    /// Source coordinates of the valid observations [n, 3].
    pub tx: Array2<f64>,
    /// Receiver coordinates of the valid observations [n, 3].
    pub rx: Array2<f64>,
}

impl ObservationSet {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
