mod common;

use common::fresh_model;
use tecto_bridge::{
    ArgumentError, ArrayView, ArrayViewMut, BridgeError, CallFailure, CallFailureKind, Components,
    EntryPoint, bridge,
};
use tecto_synth::{ElevationStats, Grid, rotational_field_at};

#[test]
fn interpolation_is_idempotent() {
    let (_dir, h) = fresh_model();
    let b = bridge();
    let grid = Grid::regular(11, 0.0, 10.0, 0.0);
    let coords = ArrayView::vectors(grid.coords()).unwrap();
    let first = b.interpolate_scalar_field_vec(h, coords, 3, 1.0).unwrap();
    let second = b.interpolate_scalar_field_vec(h, coords, 3, 1.0).unwrap();
    assert_eq!(first.len(), 121);
    assert_eq!(first, second);
    b.destroy_model(h).unwrap();
}

#[test]
fn interpolation_writes_into_caller_buffer() {
    let (_dir, h) = fresh_model();
    let b = bridge();
    // Low and high sides of the escarpment.
    let coords = [0.0, 5.0, 0.0, 10.0, 5.0, 0.0];
    let mut out = [f64::NAN; 2];
    let mut view = ArrayViewMut::scalars(&mut out);
    b.interpolate_scalar_field(h, ArrayView::vectors(&coords).unwrap(), 1, 1.0, &mut view)
        .unwrap();
    assert!(out[0] < 1.0, "{out:?}");
    assert!(out[1] > 99.0, "{out:?}");
    b.destroy_model(h).unwrap();
}

#[test]
fn zero_velocity_leaves_field_unchanged() {
    let (_dir, h) = fresh_model();
    let b = bridge();
    let probe = Grid::regular(11, 0.0, 10.0, 0.0);
    let probe = ArrayView::vectors(probe.coords()).unwrap();
    let before = ElevationStats::of(&b.interpolate_scalar_field_vec(h, probe, 3, 1.0).unwrap());

    let samples = Grid::regular(8, 1.0, 9.0, 0.0);
    let zeros = vec![0.0; samples.coords().len()];
    b.apply_velocity_field(
        h,
        ArrayView::vectors(samples.coords()).unwrap(),
        ArrayView::vectors(&zeros).unwrap(),
        0.5,
        3,
        1.0,
    )
    .unwrap();
    b.run_for_dt(h, 0.5, false).unwrap();

    let after = ElevationStats::of(&b.interpolate_scalar_field_vec(h, probe, 3, 1.0).unwrap());
    assert!(before.approx_eq(&after, 1e-9), "{before:?} vs {after:?}");
    b.destroy_model(h).unwrap();
}

#[test]
fn uplift_raises_the_field() {
    let (_dir, h) = fresh_model();
    let b = bridge();
    let samples = Grid::regular(8, 1.0, 9.0, 0.0);
    let probe = ArrayView::vectors(samples.coords()).unwrap();
    let before = ElevationStats::of(&b.interpolate_scalar_field_vec(h, probe, 5, 1.0).unwrap());

    let mut vel = rotational_field_at(0.0, samples.coords(), [5.0, 5.0], 0.1);
    for v in vel.chunks_exact_mut(3) {
        v[2] = 2.0;
    }
    b.apply_velocity_field(h, probe, ArrayView::vectors(&vel).unwrap(), 1.0, 3, 1.0)
        .unwrap();
    b.run_for_dt(h, 1.0, false).unwrap();

    let after = ElevationStats::of(&b.interpolate_scalar_field_vec(h, probe, 5, 1.0).unwrap());
    assert!((after.mean - before.mean - 2.0).abs() < 1e-6, "{before:?} -> {after:?}");
    b.destroy_model(h).unwrap();
}

#[test]
fn malformed_arrays_are_rejected_on_the_host() {
    let (_dir, h) = fresh_model();
    let b = bridge();
    let coords = [0.0; 6];
    let vel = [0.0; 9];
    let err = b
        .apply_velocity_field(
            h,
            ArrayView::vectors(&coords).unwrap(),
            ArrayView::vectors(&vel).unwrap(),
            1.0,
            3,
            1.0,
        )
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::Argument(ArgumentError::PointCountMismatch { left: 2, right: 3 })
    );

    let scalars = ArrayView::scalars(&coords);
    let err = b
        .interpolate_scalar_field_vec(h, scalars, 3, 1.0)
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::Argument(ArgumentError::ComponentMismatch {
            expected: 3,
            found: 1
        })
    );

    let mut short = [0.0; 1];
    let mut out = ArrayViewMut::scalars(&mut short);
    let err = b
        .interpolate_scalar_field(h, ArrayView::vectors(&coords).unwrap(), 3, 1.0, &mut out)
        .unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Argument(ArgumentError::PointCountMismatch { .. })
    ));

    let null = unsafe { ArrayView::from_raw_parts(std::ptr::null(), 4, Components::Vector3) };
    assert_eq!(null, Err(ArgumentError::NullBuffer { points: 4 }));
    b.destroy_model(h).unwrap();
}

#[test]
fn guest_rejection_is_a_call_failure() {
    let (_dir, h) = fresh_model();
    let b = bridge();
    let coords = [1.0, 1.0, 0.0];
    let err = b
        .interpolate_scalar_field_vec(h, ArrayView::vectors(&coords).unwrap(), 0, 1.0)
        .unwrap_err();
    match err {
        BridgeError::Call(CallFailure {
            entry: EntryPoint::InterpolateElevation,
            kind: CallFailureKind::Raised { message, traceback },
        }) => {
            assert!(message.contains("ValueError"), "{message}");
            assert!(traceback.is_some_and(|tb| tb.contains("_idw")));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // The model survives a failed call.
    assert_eq!(b.current_time(h).unwrap(), 0.0);
    b.destroy_model(h).unwrap();
}
