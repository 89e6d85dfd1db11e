// ─────────────────────────────────────────────────────────────────────
// BhTomo Core — Mog
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Multi-offset gather (MOG) survey data.
//!
//! One `Mog` holds the picks recorded between a transmitter and a
//! receiver borehole. Read-only to the inversion core; ownership stays
//! with the caller's survey store.

use ndarray::{Array1, Array2};

use crate::config::DataQuantity;

/// Sentinel marking a trace whose pick does not exist. Python: -1.
pub const NOT_PICKED: f64 = -1.0;

/// One multi-offset gather survey.
#[derive(Debug, Clone)]
pub struct Mog {
    pub name: String,
    pub ntrace: usize,
    /// Picked travel times [ntrace]; `NOT_PICKED` where unpicked.
    pub tt: Array1<f64>,
    /// Travel-time uncertainty estimates [ntrace].
    pub et: Array1<f64>,
    /// Per-trace static time correction, added to picked travel times.
    pub t0: Array1<f64>,
    /// Global uncertainty scale factor.
    pub f_et: f64,
    /// Peak-to-peak amplitude attribute and its uncertainty.
    pub tau_app: Array1<f64>,
    pub tau_app_et: Array1<f64>,
    /// Centroid-frequency attribute and its uncertainty.
    pub tau_fce: Array1<f64>,
    pub tau_fce_et: Array1<f64>,
    /// Hybrid attribute and its uncertainty.
    pub tau_hyb: Array1<f64>,
    pub tau_hyb_et: Array1<f64>,
    /// User-controlled trace inclusion flags [ntrace].
    pub in_vect: Vec<bool>,
    /// Transmitter coordinates [ntrace, 3].
    pub tx: Array2<f64>,
    /// Receiver coordinates [ntrace, 3].
    pub rx: Array2<f64>,
    /// Transmitter direction cosines [ntrace, 3].
    pub tx_cos_dir: Array2<f64>,
    /// Receiver direction cosines [ntrace, 3].
    pub rx_cos_dir: Array2<f64>,
}

impl Mog {
    /// Create an empty gather: nothing picked, every trace included.
    pub fn new(name: &str, ntrace: usize) -> Self {
        Mog {
            name: name.to_string(),
            ntrace,
            tt: Array1::from_elem(ntrace, NOT_PICKED),
            et: Array1::zeros(ntrace),
            t0: Array1::zeros(ntrace),
            f_et: 1.0,
            tau_app: Array1::from_elem(ntrace, NOT_PICKED),
            tau_app_et: Array1::zeros(ntrace),
            tau_fce: Array1::from_elem(ntrace, NOT_PICKED),
            tau_fce_et: Array1::zeros(ntrace),
            tau_hyb: Array1::from_elem(ntrace, NOT_PICKED),
            tau_hyb_et: Array1::zeros(ntrace),
            in_vect: vec![true; ntrace],
            tx: Array2::zeros((ntrace, 3)),
            rx: Array2::zeros((ntrace, 3)),
            tx_cos_dir: Array2::zeros((ntrace, 3)),
            rx_cos_dir: Array2::zeros((ntrace, 3)),
        }
    }

    /// Travel times with the static `t0` correction applied.
    /// Unpicked traces keep the sentinel.
    pub fn corrected_travel_times(&self) -> Array1<f64> {
        let mut out = self.tt.clone();
        for (i, v) in out.iter_mut().enumerate() {
            if *v != NOT_PICKED {
                *v += self.t0[i];
            }
        }
        out
    }

    /// The (value, uncertainty) pair for a quantity.
    ///
    /// Travel times are returned uncorrected here; the assembler applies
    /// `corrected_travel_times` so the correction happens exactly once.
    pub fn quantity_pair(&self, quantity: DataQuantity) -> (&Array1<f64>, &Array1<f64>) {
        match quantity {
            DataQuantity::Traveltime => (&self.tt, &self.et),
            DataQuantity::AmplitudePeakToPeak => (&self.tau_app, &self.tau_app_et),
            DataQuantity::CentroidFrequency => (&self.tau_fce, &self.tau_fce_et),
            DataQuantity::AmplitudeHybrid => (&self.tau_hyb, &self.tau_hyb_et),
        }
    }

    /// Straight-line Tx–Rx distance of one trace.
    pub fn offset(&self, trace: usize) -> f64 {
        let dx = self.tx[[trace, 0]] - self.rx[[trace, 0]];
        let dy = self.tx[[trace, 1]] - self.rx[[trace, 1]];
        let dz = self.tx[[trace, 2]] - self.rx[[trace, 2]];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}
