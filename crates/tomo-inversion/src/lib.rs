// ─────────────────────────────────────────────────────────────────────
// BhTomo Core — Inversion
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Linearized iterative tomographic inversion.
//!
//! Observation assembly across multi-offset gathers, the damped LSQR
//! inversion loop, and the result/diagnostics store.

pub mod assembler;
pub mod result;
pub mod solver;
