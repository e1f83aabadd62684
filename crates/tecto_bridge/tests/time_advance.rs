mod common;

use common::{assert_close, fresh_model, start, write_config};
use tecto_bridge::{ArgumentError, BridgeError, StepReport, bridge};

#[test]
fn escarpment_scenario() {
    let (_dir, h) = fresh_model();
    let b = bridge();
    assert_eq!(b.current_time(h).unwrap(), 0.0);
    assert_eq!(b.time_step(h).unwrap(), 0.5);

    let report = b.run_for_steps(h, 3, 0.5, false).unwrap();
    assert_eq!(
        report,
        StepReport {
            requested: 3,
            completed: 3
        }
    );
    assert!(!report.is_partial());
    assert_close(b.current_time(h).unwrap(), 1.5);

    b.destroy_model(h).unwrap();
    // A retired handle is stopped on the host side.
    assert_eq!(
        b.current_time(h),
        Err(BridgeError::Argument(ArgumentError::StaleHandle(h.to_raw())))
    );
    assert!(b.destroy_model(h).is_err());
}

#[test]
fn run_for_dt_advances_by_dt() {
    let (_dir, h) = fresh_model();
    let b = bridge();
    for dt in [0.1, 0.25, 2.0] {
        let before = b.current_time(h).unwrap();
        let elapsed = b.run_for_dt(h, dt, false).unwrap();
        assert!(elapsed >= 0.0);
        assert_close(b.current_time(h).unwrap(), before + dt);
    }
    b.destroy_model(h).unwrap();
}

#[test]
fn until_time_lands_on_target() {
    let (_dir, h) = fresh_model();
    let b = bridge();
    // 0.75 + 0.75 + 0.5
    assert_eq!(b.run_until_time(h, 2.0, 0.75, false).unwrap(), 3);
    assert_close(b.current_time(h).unwrap(), 2.0);
    // Evenly divided interval
    assert_eq!(b.run_until_time(h, 3.0, 0.25, false).unwrap(), 4);
    assert_close(b.current_time(h).unwrap(), 3.0);
    // Already there
    assert_eq!(b.run_until_time(h, 3.0, 0.25, false).unwrap(), 0);
    // Clamped final step on a step size that is not exact in binary
    assert_eq!(b.run_until_time(h, 3.5, 0.2, false).unwrap(), 3);
    assert_close(b.current_time(h).unwrap(), 3.5);
    b.destroy_model(h).unwrap();
}

#[test]
fn interrupted_run_reports_partial_count() {
    start();
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(dir.path(), "fails.cfg", "dt = 0.5\nfail_at_step = 2\n");
    let b = bridge();
    let h = b.create_model(cfg.to_str().unwrap()).unwrap();

    let report = b.run_for_steps(h, 5, 0.5, false).unwrap();
    assert_eq!(report.completed, 2);
    assert!(report.is_partial());
    assert_close(b.current_time(h).unwrap(), 1.0);

    // The guest raises on a single step at the failing index.
    assert!(matches!(b.run_for_dt(h, 0.5, false), Err(BridgeError::Call(_))));
    b.destroy_model(h).unwrap();
}

#[test]
fn models_are_independent() {
    let (_d1, a) = fresh_model();
    let (_d2, c) = fresh_model();
    assert_ne!(a, c);
    let b = bridge();
    b.run_for_steps(a, 4, 0.5, false).unwrap();
    assert_close(b.current_time(a).unwrap(), 2.0);
    assert_eq!(b.current_time(c).unwrap(), 0.0);
    b.destroy_model(a).unwrap();
    b.destroy_model(c).unwrap();
}
