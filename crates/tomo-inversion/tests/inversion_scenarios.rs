// ─────────────────────────────────────────────────────────────────────
// BhTomo Core — Inversion Scenario Tests
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! End-to-end inversion scenarios on synthetic crosshole geometries.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::Array1;
use tomo_grid::straight::StraightRayModel;
use tomo_inversion::assembler::assemble;
use tomo_inversion::solver::{LsqrInversion, RayPhase, SlownessConstraints};
use tomo_types::config::{DataQuantity, InversionConfig};
use tomo_types::error::TomoError;
use tomo_types::mog::Mog;
use tomo_types::state::Grid;

/// 10 x 10 unit-cell panel.
fn unit_grid() -> Grid {
    Grid::new_2d(
        Array1::linspace(0.0, 10.0, 11),
        Array1::linspace(0.0, 10.0, 11),
    )
}

/// One gather of vertical rays spanning the panel top to bottom at
/// x = 0.5, 1.5, …, through a homogeneous medium of velocity `v`.
fn vertical_mog(n: usize, v: f64) -> Mog {
    let mut mog = Mog::new("vertical", n);
    for i in 0..n {
        let x = i as f64 + 0.5;
        mog.tx[[i, 0]] = x;
        mog.tx[[i, 2]] = 0.0;
        mog.rx[[i, 0]] = x;
        mog.rx[[i, 2]] = 10.0;
        mog.tt[i] = 10.0 / v;
        mog.et[i] = 0.1;
    }
    mog
}

/// Two cells stacked vertically, one ray confined to each, with
/// prescribed travel times (unit path lengths).
fn two_cell_problem(t0: f64, t1: f64) -> (StraightRayModel, Mog) {
    let grid = Grid::new_2d(Array1::linspace(0.0, 1.0, 2), Array1::linspace(0.0, 2.0, 3));
    let model = StraightRayModel::new(grid);
    let mut mog = Mog::new("pair", 2);
    for (i, (za, zb, t)) in [(0.0, 1.0, t0), (1.0, 2.0, t1)].iter().enumerate() {
        mog.tx[[i, 0]] = 0.5;
        mog.tx[[i, 2]] = *za;
        mog.rx[[i, 0]] = 0.5;
        mog.rx[[i, 2]] = *zb;
        mog.tt[i] = *t;
        mog.et[i] = 0.1;
    }
    (model, mog)
}

fn base_config() -> InversionConfig {
    InversionConfig {
        selected_mogs: vec![0],
        tol: 1e-12,
        max_solver_iterations: 200,
        dv_max: 1.0,
        save_inv_data: false,
        ..InversionConfig::default()
    }
}

#[test]
fn scenario_a_homogeneous_field_recovered() {
    // All-vertical homogeneous geometry: the inverted field must be the
    // uniform 1/mean(apparent velocity).
    let model = StraightRayModel::new(unit_grid());
    let mog = vertical_mog(10, 2.0);
    let obs = assemble(&[&mog], DataQuantity::Traveltime, None).unwrap();

    let config = base_config();
    let tomo = LsqrInversion::new(&config).run(&model, &obs).unwrap();

    assert_eq!(tomo.s.len(), 100);
    for (i, &s) in tomo.s.iter().enumerate() {
        assert!((s - 0.5).abs() < 1e-8, "cell {i}: slowness {s}, expected 0.5");
    }
    assert_eq!(tomo.res.len(), 1);
    assert!(tomo.res[0] < 1e-8);
    assert_eq!(tomo.completed_iterations, 1);
    assert!(!tomo.cancelled);
}

#[test]
fn scenario_b_velocity_ceiling_empties_observation_set() {
    // Ceiling below the true velocity: every pick is implausible and
    // the run must fail before any iteration.
    let mog = vertical_mog(10, 2.0);
    let err = assemble(&[&mog], DataQuantity::Traveltime, Some(1.0)).unwrap_err();
    assert!(matches!(err, TomoError::NoValidObservations { total: 10 }));
}

#[test]
fn scenario_c_velocity_variation_clamped_to_one_percent() {
    // Unclamped corrections would swing the cells by far more than 1%;
    // the uniform damping factor must hold the binding cell at exactly
    // dv_max.
    let (model, mog) = two_cell_problem(0.1, 1.9);
    let obs = assemble(&[&mog], DataQuantity::Traveltime, None).unwrap();
    let mut config = base_config();
    config.dv_max = 0.01;

    let tomo = LsqrInversion::new(&config).run(&model, &obs).unwrap();

    // Baseline l_mean = mean(0.1, 1.9) = 1.0.
    let realized: Vec<f64> = tomo.s.iter().map(|&s| (1.0 / s - 1.0).abs()).collect();
    for (i, &r) in realized.iter().enumerate() {
        assert!(r <= 0.01 + 1e-9, "cell {i} moved {r}");
    }
    // Cell 0 takes the negative correction and sits on the bound.
    assert!((realized[0] - 0.01).abs() < 1e-6, "binding cell moved {}", realized[0]);
}

#[test]
fn scenario_d_two_surveys_merge_and_partition() {
    let model = StraightRayModel::new(unit_grid());
    let mut a = vertical_mog(6, 2.0);
    a.tt[5] = -1.0; // one unpicked trace
    let b = vertical_mog(4, 2.0);
    let obs = assemble(&[&a, &b], DataQuantity::Traveltime, None).unwrap();

    assert_eq!(obs.len(), 5 + 4);
    assert_eq!(obs.mask.len(), 10);

    let config = base_config();
    let tomo = LsqrInversion::new(&config).run(&model, &obs).unwrap();
    let from_a = tomo.no_trace.iter().filter(|(m, _)| *m == 0).count();
    let from_b = tomo.no_trace.iter().filter(|(m, _)| *m == 1).count();
    assert_eq!(from_a, 5);
    assert_eq!(from_b, 4);
}

#[test]
fn residual_history_has_one_entry_per_iteration() {
    // Inner solves that hit the cap still record exactly one residual
    // per outer iteration.
    let (model, mog) = two_cell_problem(0.5, 1.5);
    let obs = assemble(&[&mog], DataQuantity::Traveltime, None).unwrap();
    let mut config = base_config();
    config.num_it_straight = 2;
    config.num_it_curved = 1;
    config.max_solver_iterations = 1;
    config.tol = 1e-15;

    let tomo = LsqrInversion::new(&config).run(&model, &obs).unwrap();
    assert_eq!(tomo.res.len(), 3);
    assert_eq!(tomo.completed_iterations, 3);
}

#[test]
fn progress_events_carry_iteration_and_phase() {
    let (model, mog) = two_cell_problem(0.5, 1.5);
    let obs = assemble(&[&mog], DataQuantity::Traveltime, None).unwrap();
    let mut config = base_config();
    config.num_it_straight = 2;
    config.num_it_curved = 1;

    let events = RefCell::new(Vec::new());
    let tomo = LsqrInversion::new(&config)
        .on_progress(|e| events.borrow_mut().push(e))
        .run(&model, &obs)
        .unwrap();

    let events = events.into_inner();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].iteration, 0);
    assert_eq!(events[0].phase, RayPhase::Straight);
    assert_eq!(events[1].phase, RayPhase::Straight);
    assert_eq!(events[2].iteration, 2);
    assert_eq!(events[2].phase, RayPhase::Curved);
    assert_eq!(tomo.completed_iterations, 3);
}

#[test]
fn cancellation_before_start_commits_nothing() {
    let (model, mog) = two_cell_problem(0.5, 1.5);
    let obs = assemble(&[&mog], DataQuantity::Traveltime, None).unwrap();
    let config = base_config();

    let cancel = AtomicBool::new(true);
    let tomo = LsqrInversion::new(&config)
        .with_cancel_flag(&cancel)
        .run(&model, &obs)
        .unwrap();

    assert!(tomo.cancelled);
    assert_eq!(tomo.completed_iterations, 0);
    assert!(tomo.res.is_empty());
    assert!(tomo.s.is_empty());
}

#[test]
fn cancellation_takes_effect_at_iteration_boundary() {
    let (model, mog) = two_cell_problem(0.5, 1.5);
    let obs = assemble(&[&mog], DataQuantity::Traveltime, None).unwrap();
    let mut config = base_config();
    config.num_it_straight = 5;

    let cancel = AtomicBool::new(false);
    let tomo = LsqrInversion::new(&config)
        .with_cancel_flag(&cancel)
        .on_progress(|_| cancel.store(true, Ordering::Relaxed))
        .run(&model, &obs)
        .unwrap();

    // The first iteration committed completely, nothing after it ran.
    assert!(tomo.cancelled);
    assert_eq!(tomo.completed_iterations, 1);
    assert_eq!(tomo.res.len(), 1);
    assert_eq!(tomo.s.len(), 2);
    assert_eq!(tomo.rays.len(), 2);
}

#[test]
fn degenerate_geometry_rejected_after_first_trace() {
    // Rays entirely outside the panel leave an all-zero matrix.
    let model = StraightRayModel::new(unit_grid());
    let mut mog = Mog::new("outside", 3);
    for i in 0..3 {
        mog.tx[[i, 0]] = -20.0;
        mog.rx[[i, 0]] = -20.0;
        mog.tx[[i, 2]] = 0.0;
        mog.rx[[i, 2]] = 10.0;
        mog.tt[i] = 5.0;
    }
    let obs = assemble(&[&mog], DataQuantity::Traveltime, None).unwrap();
    let err = LsqrInversion::new(&base_config())
        .run(&model, &obs)
        .unwrap_err();
    assert!(matches!(
        err,
        TomoError::DegenerateGeometry {
            nonzero_rows: 0,
            required: 2
        }
    ));
}

#[test]
fn smoothing_pulls_neighbouring_cells_together() {
    let (model, mog) = two_cell_problem(0.5, 1.5);
    let obs = assemble(&[&mog], DataQuantity::Traveltime, None).unwrap();

    let plain = base_config();
    let rough = LsqrInversion::new(&plain).run(&model, &obs).unwrap();
    let gap_plain = (rough.s[0] - rough.s[1]).abs();

    let mut smoothed_cfg = base_config();
    smoothed_cfg.alpha_z = 10.0;
    let smooth = LsqrInversion::new(&smoothed_cfg).run(&model, &obs).unwrap();
    let gap_smooth = (smooth.s[0] - smooth.s[1]).abs();

    assert!(gap_plain > 0.5, "unsmoothed gap {gap_plain}");
    assert!(
        gap_smooth < 0.5 * gap_plain,
        "smoothing gap {gap_smooth} vs plain {gap_plain}"
    );
}

#[test]
fn constraints_pin_fixed_cells() {
    let (model, mog) = two_cell_problem(0.5, 1.5);
    let obs = assemble(&[&mog], DataQuantity::Traveltime, None).unwrap();
    let mut config = base_config();
    config.use_constraints = true;
    config.w_cont = 100.0;

    let cont = SlownessConstraints {
        cells: vec![0],
        values: vec![1.0],
    };
    let tomo = LsqrInversion::new(&config)
        .with_constraints(&cont)
        .run(&model, &obs)
        .unwrap();

    assert!((tomo.s[0] - 1.0).abs() < 0.01, "pinned cell at {}", tomo.s[0]);
    assert!(tomo.s[1] > 1.3, "free cell at {}", tomo.s[1]);
}

#[test]
fn diagnostics_snapshots_accumulate_per_iteration() {
    let (model, mog) = two_cell_problem(0.5, 1.5);
    let obs = assemble(&[&mog], DataQuantity::Traveltime, None).unwrap();
    let mut config = base_config();
    config.num_it_straight = 1;
    config.num_it_curved = 2;
    config.save_inv_data = true;

    let tomo = LsqrInversion::new(&config).run(&model, &obs).unwrap();
    assert_eq!(tomo.inv_data.len(), 3);
    for snap in &tomo.inv_data {
        assert_eq!(snap.s.len(), 2);
        assert_eq!(snap.residuals.len(), 2);
    }
    // The last snapshot matches the final committed state.
    assert_eq!(tomo.inv_data[2].s, tomo.s);
}

#[test]
fn empty_config_rejected_before_anything_runs() {
    let (model, mog) = two_cell_problem(0.5, 1.5);
    let obs = assemble(&[&mog], DataQuantity::Traveltime, None).unwrap();
    let mut config = base_config();
    config.selected_mogs.clear();
    let err = LsqrInversion::new(&config).run(&model, &obs).unwrap_err();
    assert!(matches!(err, TomoError::EmptySelection));
}

#[test]
fn straight_and_curved_phases_share_the_loop_body() {
    // Same totals, different phase splits: identical fields.
    let (model, mog) = two_cell_problem(0.9, 1.1);
    let obs = assemble(&[&mog], DataQuantity::Traveltime, None).unwrap();

    let mut cfg_a = base_config();
    cfg_a.num_it_straight = 3;
    cfg_a.num_it_curved = 0;
    let mut cfg_b = base_config();
    cfg_b.num_it_straight = 1;
    cfg_b.num_it_curved = 2;

    let ta = LsqrInversion::new(&cfg_a).run(&model, &obs).unwrap();
    let tb = LsqrInversion::new(&cfg_b).run(&model, &obs).unwrap();
    for (a, b) in ta.s.iter().zip(tb.s.iter()) {
        assert!((a - b).abs() < 1e-12);
    }
}
