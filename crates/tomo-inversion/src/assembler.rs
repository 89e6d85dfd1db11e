// ─────────────────────────────────────────────────────────────────────
// BhTomo Core — Observation Assembler
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Observation assembly across multi-offset gathers.
//!
//! Port of `model.py getModelData`: concatenates the selected surveys
//! for one quantity, masks unpicked and excluded traces, scales
//! uncertainties and optionally drops physically implausible picks.
//! Surveys are passed in explicitly; there is no ambient session state.

use ndarray::{Array1, Array2};
use tomo_types::config::DataQuantity;
use tomo_types::error::{TomoError, TomoResult};
use tomo_types::mog::{Mog, NOT_PICKED};
use tomo_types::state::ObservationSet;

/// Assemble one [`ObservationSet`] from `mogs`, in the given order.
///
/// Validity = picked AND included; with `vapp_max` set, observations
/// whose apparent velocity (straight Tx–Rx distance over value) exceeds
/// the ceiling are additionally dropped. That filter is soft: it logs
/// and excludes, it never fails the run.
pub fn assemble(
    mogs: &[&Mog],
    quantity: DataQuantity,
    vapp_max: Option<f64>,
) -> TomoResult<ObservationSet> {
    if mogs.is_empty() {
        return Err(TomoError::EmptySelection);
    }

    let total: usize = mogs.iter().map(|m| m.ntrace).sum();
    let mut mask = Vec::with_capacity(total);
    let mut values = Vec::new();
    let mut uncertainties = Vec::new();
    let mut origin = Vec::new();
    let mut tx_rows: Vec<f64> = Vec::new();
    let mut rx_rows: Vec<f64> = Vec::new();
    let mut n_implausible = 0usize;

    for (mog_pos, mog) in mogs.iter().enumerate() {
        // Travel times carry the static t0 correction; amplitude
        // attributes are used as recorded.
        let corrected;
        let (vals, errs) = match quantity {
            DataQuantity::Traveltime => {
                corrected = mog.corrected_travel_times();
                (&corrected, &mog.et)
            }
            _ => mog.quantity_pair(quantity),
        };

        for trace in 0..mog.ntrace {
            let v = vals[trace];
            let mut valid = v != NOT_PICKED && mog.in_vect[trace];

            if valid {
                if let Some(vlim) = vapp_max {
                    let vapp = if v > 0.0 {
                        mog.offset(trace) / v
                    } else {
                        f64::INFINITY
                    };
                    if vapp > vlim {
                        n_implausible += 1;
                        valid = false;
                    }
                }
            }

            mask.push(valid);
            if valid {
                values.push(v);
                uncertainties.push(mog.f_et * errs[trace]);
                origin.push((mog_pos, trace));
                for k in 0..3 {
                    tx_rows.push(mog.tx[[trace, k]]);
                    rx_rows.push(mog.rx[[trace, k]]);
                }
            }
        }
    }

    if n_implausible > 0 {
        log::warn!(
            "{n_implausible} observations above apparent-velocity ceiling {:?}, excluded",
            vapp_max
        );
    }

    if values.is_empty() {
        return Err(TomoError::NoValidObservations { total });
    }

    let n = values.len();
    Ok(ObservationSet {
        values: Array1::from_vec(values),
        uncertainties: Array1::from_vec(uncertainties),
        origin,
        mask,
        tx: Array2::from_shape_vec((n, 3), tx_rows)
            .map_err(|e| TomoError::DimensionMismatch(e.to_string()))?,
        rx: Array2::from_shape_vec((n, 3), rx_rows)
            .map_err(|e| TomoError::DimensionMismatch(e.to_string()))?,
    })
}
