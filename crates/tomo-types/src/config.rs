// ─────────────────────────────────────────────────────────────────────
// BhTomo Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::error::{TomoError, TomoResult};

/// Physical quantity inverted for.
///
/// Maps 1:1 to the `type1` strings of the original Python
/// (`model.py getModelData`): "tt", "amp", "fce", "hyb".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataQuantity {
    /// Picked first-arrival travel times.
    #[default]
    #[serde(rename = "tt")]
    Traveltime,
    /// Peak-to-peak amplitude attenuation attribute.
    #[serde(rename = "amp")]
    AmplitudePeakToPeak,
    /// Centroid-frequency downshift attribute.
    #[serde(rename = "fce")]
    CentroidFrequency,
    /// Hybrid amplitude/frequency attribute.
    #[serde(rename = "hyb")]
    AmplitudeHybrid,
}

/// Immutable per-run inversion parameters.
///
/// Field set mirrors `InvLSQRParams` (inversionUI.py). `dv_max` is a
/// fraction (0.01 = 1%), not a percentage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InversionConfig {
    /// Indices of the selected surveys, in assembly order.
    pub selected_mogs: Vec<usize>,
    #[serde(default)]
    pub quantity: DataQuantity,
    /// Outer iterations run before the label switches to curved-ray.
    /// Both phases execute the identical loop body.
    #[serde(default = "default_num_it_straight")]
    pub num_it_straight: usize,
    #[serde(default)]
    pub num_it_curved: usize,
    /// Relative-residual tolerance of the inner LSQR solve.
    #[serde(default = "default_tol")]
    pub tol: f64,
    /// Iteration cap of the inner LSQR solve.
    #[serde(default = "default_max_solver_iterations")]
    pub max_solver_iterations: usize,
    /// Maximum allowed relative slowness change per outer iteration.
    #[serde(default = "default_dv_max")]
    pub dv_max: f64,
    /// Smoothing weights per axis; any weight > 0 activates the
    /// regularized stacked system.
    #[serde(default)]
    pub alpha_x: f64,
    #[serde(default)]
    pub alpha_y: f64,
    #[serde(default)]
    pub alpha_z: f64,
    /// Finite-difference order of the smoothing operators (1 or 2).
    #[serde(default = "default_order")]
    pub order: u8,
    /// Apply fixed-slowness cell constraints when present.
    #[serde(default)]
    pub use_constraints: bool,
    /// Weight of the constraint rows.
    #[serde(default)]
    pub w_cont: f64,
    /// Apparent-velocity ceiling; observations above it are excluded
    /// (soft data-quality filter).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vapp_max: Option<f64>,
    /// Retain per-iteration (slowness, residual) snapshots.
    #[serde(default = "default_save_inv_data")]
    pub save_inv_data: bool,
}

fn default_num_it_straight() -> usize {
    1
}
fn default_tol() -> f64 {
    1e-6
}
fn default_max_solver_iterations() -> usize {
    100
}
fn default_dv_max() -> f64 {
    0.05
}
fn default_order() -> u8 {
    1
}
fn default_save_inv_data() -> bool {
    true
}

impl Default for InversionConfig {
    fn default() -> Self {
        InversionConfig {
            selected_mogs: Vec::new(),
            quantity: DataQuantity::Traveltime,
            num_it_straight: default_num_it_straight(),
            num_it_curved: 0,
            tol: default_tol(),
            max_solver_iterations: default_max_solver_iterations(),
            dv_max: default_dv_max(),
            alpha_x: 0.0,
            alpha_y: 0.0,
            alpha_z: 0.0,
            order: default_order(),
            use_constraints: false,
            w_cont: 0.0,
            vapp_max: None,
            save_inv_data: default_save_inv_data(),
        }
    }
}

impl InversionConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> TomoResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Total number of outer iterations.
    pub fn total_iterations(&self) -> usize {
        self.num_it_straight + self.num_it_curved
    }

    pub fn validate(&self) -> TomoResult<()> {
        if self.selected_mogs.is_empty() {
            return Err(TomoError::EmptySelection);
        }
        if self.total_iterations() == 0 {
            return Err(TomoError::ConfigError(
                "num_it_straight + num_it_curved must be >= 1".to_string(),
            ));
        }
        if !self.tol.is_finite() || self.tol <= 0.0 {
            return Err(TomoError::ConfigError(
                "tol must be finite and > 0".to_string(),
            ));
        }
        if self.max_solver_iterations == 0 {
            return Err(TomoError::ConfigError(
                "max_solver_iterations must be >= 1".to_string(),
            ));
        }
        if !self.dv_max.is_finite() || !(0.0..=1.0).contains(&self.dv_max) || self.dv_max == 0.0 {
            return Err(TomoError::ConfigError(
                "dv_max must be finite and in (0, 1]".to_string(),
            ));
        }
        for (name, alpha) in [
            ("alpha_x", self.alpha_x),
            ("alpha_y", self.alpha_y),
            ("alpha_z", self.alpha_z),
        ] {
            if !alpha.is_finite() || alpha < 0.0 {
                return Err(TomoError::ConfigError(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if !(1..=2).contains(&self.order) {
            return Err(TomoError::ConfigError(
                "smoothing order must be 1 or 2".to_string(),
            ));
        }
        if self.use_constraints && (!self.w_cont.is_finite() || self.w_cont <= 0.0) {
            return Err(TomoError::ConfigError(
                "w_cont must be finite and > 0 when constraints are used".to_string(),
            ));
        }
        if let Some(vlim) = self.vapp_max {
            if !vlim.is_finite() || vlim <= 0.0 {
                return Err(TomoError::ConfigError(
                    "vapp_max must be finite and > 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}
