//! Diagnostics recorded by the bridge. One test, so nothing else in this
//! binary touches the last-error slot.

mod common;

use common::{start, write_config};
use tecto_bridge::{BridgeError, CallFailure, CallFailureKind, EntryPoint, bridge};

#[test]
fn failures_are_converted_and_recorded() {
    start();
    let b = bridge();
    let before = b.live_models();

    let err = b.create_model("/nonexistent/escarpment.cfg").unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Call(CallFailure {
            entry: EntryPoint::CreateModel,
            kind: CallFailureKind::Raised { .. },
        })
    ));
    let recorded = b.last_error().unwrap();
    assert!(recorded.contains("FileNotFoundError"), "{recorded}");
    assert!(recorded.starts_with("create_enhanced_model failed"), "{recorded}");
    assert_eq!(b.live_models(), before);

    let dir = tempfile::tempdir().unwrap();
    let bad = write_config(dir.path(), "bad.cfg", "dt 0.5\n");
    assert!(b.create_model(bad.to_str().unwrap()).is_err());
    assert!(b.last_error().unwrap().contains("malformed config line"));

    let good = write_config(dir.path(), "good.cfg", "dt = 0.5\n");
    let h = b.create_model(good.to_str().unwrap()).unwrap();
    assert!(b.run_for_steps(h, 0, 0.5, false).is_err());
    assert!(b.last_error().unwrap().contains("num_steps must be positive"));
    assert!(b.run_until_time(h, 1.0, 0.0, false).is_err());
    assert!(b.last_error().unwrap().contains("dt must be positive"));

    // Successful calls leave the previous diagnostic in place.
    assert_eq!(b.current_time(h).unwrap(), 0.0);
    assert!(b.last_error().unwrap().contains("dt must be positive"));

    b.destroy_model(h).unwrap();
    let stale = b.time_step(h).unwrap_err();
    assert_eq!(b.last_error().unwrap(), stale.to_string());
}
