//! Argument construction and result conversion for every entry point.
//!
//! Guest failures come back in two forms: an exception, or the guest's own
//! failure value (a negative number, a non-zero status, `None`). Both become a
//! [`CallFailure`] here so nothing raised in the guest escapes past this module.

use numpy::ndarray::ArrayView2;
use numpy::prelude::*;
use numpy::{PyArray2, PyArrayDyn};
use pyo3::prelude::*;
use pyo3::types::PyBool;

use crate::array::{ArrayView, ArrayViewMut};
use crate::entry_points::{EntryPoint, EntryPointTable};
use crate::errors::{CallFailure, CallFailureKind};

type CallResult<T> = Result<T, CallFailure>;

pub(crate) struct CallMarshaler<'a, 'py> {
    py: Python<'py>,
    table: &'a EntryPointTable,
}

impl<'a, 'py> CallMarshaler<'a, 'py> {
    pub(crate) fn new(py: Python<'py>, table: &'a EntryPointTable) -> Self {
        Self { py, table }
    }

    fn invoke(
        &self,
        entry: EntryPoint,
        args: impl IntoPy<Py<pyo3::types::PyTuple>>,
    ) -> CallResult<Bound<'py, PyAny>> {
        tracing::debug!(entry = entry.symbol(), "calling guest");
        self.table
            .get(self.py, entry)
            .call1(args)
            .map_err(|e| raised(self.py, entry, e))
    }

    pub(crate) fn create_model(&self, config_path: &str) -> CallResult<i64> {
        let entry = EntryPoint::CreateModel;
        let out = self.invoke(entry, (config_path,))?;
        let handle = unmarshal_int(entry, &out)?;
        if handle < 0 {
            return Err(sentinel(entry, format!("handle {handle}")));
        }
        Ok(handle)
    }

    pub(crate) fn destroy_model(&self, guest: i64) -> CallResult<()> {
        let entry = EntryPoint::DestroyModel;
        let out = self.invoke(entry, (guest,))?;
        unmarshal_status(entry, &out)
    }

    pub(crate) fn run_for_dt(&self, guest: i64, dt: f64, verbose: bool) -> CallResult<f64> {
        let entry = EntryPoint::RunForDt;
        let out = self.invoke(entry, (guest, dt, verbose))?;
        unmarshal_non_negative(entry, &out)
    }

    pub(crate) fn run_for_steps(
        &self,
        guest: i64,
        steps: u32,
        dt: f64,
        verbose: bool,
    ) -> CallResult<u32> {
        let entry = EntryPoint::RunForSteps;
        let out = self.invoke(entry, (guest, i64::from(steps), dt, verbose))?;
        unmarshal_count(entry, &out)
    }

    pub(crate) fn run_until_time(
        &self,
        guest: i64,
        target_time: f64,
        dt: f64,
        verbose: bool,
    ) -> CallResult<u32> {
        let entry = EntryPoint::RunUntilTime;
        let out = self.invoke(entry, (guest, target_time, dt, verbose))?;
        unmarshal_count(entry, &out)
    }

    pub(crate) fn apply_velocity(
        &self,
        guest: i64,
        coords: &ArrayView<'_>,
        velocities: &ArrayView<'_>,
        timer: f64,
        k: i32,
        power: f64,
    ) -> CallResult<()> {
        let entry = EntryPoint::ApplyVelocity;
        // SAFETY: both views outlive this call, and the wrappers are dropped
        // (or only referenced by the guest) before it returns.
        let (c, v) = unsafe {
            (
                borrow_readonly(self.py, entry, coords)?,
                borrow_readonly(self.py, entry, velocities)?,
            )
        };
        let points = coords.points() as i64;
        let out = self.invoke(entry, (guest, c, v, points, timer, k, power))?;
        unmarshal_status(entry, &out)
    }

    pub(crate) fn interpolate_elevation(
        &self,
        guest: i64,
        coords: &ArrayView<'_>,
        k: i32,
        power: f64,
        out: &mut ArrayViewMut<'_>,
    ) -> CallResult<()> {
        let entry = EntryPoint::InterpolateElevation;
        // SAFETY: see `apply_velocity`.
        let c = unsafe { borrow_readonly(self.py, entry, coords)? };
        let result = self.invoke(entry, (guest, c, k, power))?;
        copy_out(entry, &result, out)
    }

    pub(crate) fn current_time(&self, guest: i64) -> CallResult<f64> {
        let entry = EntryPoint::CurrentTime;
        let out = self.invoke(entry, (guest,))?;
        unmarshal_non_negative(entry, &out)
    }

    pub(crate) fn time_step(&self, guest: i64) -> CallResult<f64> {
        let entry = EntryPoint::TimeStep;
        let out = self.invoke(entry, (guest,))?;
        unmarshal_non_negative(entry, &out)
    }
}

/// Wraps a host view as a read-only `(N, C)` NumPy array without copying.
///
/// # Safety
///
/// The returned array aliases `view`. It must not be used after the borrow
/// of `view` ends, and the guest entry point receiving it must not retain it
/// past the call.
unsafe fn borrow_readonly<'py>(
    py: Python<'py>,
    entry: EntryPoint,
    view: &ArrayView<'_>,
) -> CallResult<Bound<'py, PyArray2<f64>>> {
    let shape = (view.points(), view.components().count());
    let host = ArrayView2::from_shape(shape, view.as_slice()).map_err(|_| {
        CallFailure::new(
            entry,
            CallFailureKind::ShapeMismatch {
                expected: shape.0 * shape.1,
                found: view.as_slice().len(),
            },
        )
    })?;
    // SAFETY: the container does not own the data; validity is guaranteed by
    // this function's caller for the duration of the call.
    let array = unsafe { PyArray2::borrow_from_array_bound(&host, py.None().into_bound(py)) };
    array
        .call_method1("setflags", (false,))
        .map_err(|e| raised(py, entry, e))?;
    Ok(array)
}

fn copy_out(
    entry: EntryPoint,
    result: &Bound<'_, PyAny>,
    out: &mut ArrayViewMut<'_>,
) -> CallResult<()> {
    if result.is_none() {
        return Err(sentinel(entry, "None".into()));
    }
    let array = result.downcast::<PyArrayDyn<f64>>().map_err(|_| {
        CallFailure::new(
            entry,
            CallFailureKind::Unmarshal {
                expected: "float64 ndarray",
                found: type_name(result),
            },
        )
    })?;
    let readonly = array.try_readonly().map_err(|e| {
        CallFailure::new(
            entry,
            CallFailureKind::Unmarshal {
                expected: "readable ndarray",
                found: e.to_string(),
            },
        )
    })?;
    let expected = out.points() * out.components().count();
    let copied = match readonly.as_slice() {
        Ok(contiguous) => out.copy_from(contiguous),
        Err(_) => out.copy_from_iter(readonly.as_array().iter().copied()),
    };
    copied.map_err(|found| {
        CallFailure::new(entry, CallFailureKind::ShapeMismatch { expected, found })
    })
}

fn raised(py: Python<'_>, entry: EntryPoint, err: PyErr) -> CallFailure {
    let traceback = err.traceback_bound(py).and_then(|tb| tb.format().ok());
    CallFailure::new(
        entry,
        CallFailureKind::Raised {
            message: err.to_string(),
            traceback,
        },
    )
}

fn sentinel(entry: EntryPoint, what: String) -> CallFailure {
    CallFailure::new(entry, CallFailureKind::Sentinel(what))
}

fn type_name(obj: &Bound<'_, PyAny>) -> String {
    obj.get_type()
        .name()
        .map(|n| n.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string())
}

fn unmarshal_int(entry: EntryPoint, obj: &Bound<'_, PyAny>) -> CallResult<i64> {
    if obj.is_none() {
        return Err(sentinel(entry, "None".into()));
    }
    if obj.is_instance_of::<PyBool>() {
        return Err(CallFailure::new(
            entry,
            CallFailureKind::Unmarshal {
                expected: "int",
                found: "bool".into(),
            },
        ));
    }
    obj.extract::<i64>().map_err(|_| {
        CallFailure::new(
            entry,
            CallFailureKind::Unmarshal {
                expected: "int",
                found: type_name(obj),
            },
        )
    })
}

fn unmarshal_status(entry: EntryPoint, obj: &Bound<'_, PyAny>) -> CallResult<()> {
    match unmarshal_int(entry, obj)? {
        0 => Ok(()),
        code => Err(sentinel(entry, format!("status {code}"))),
    }
}

fn unmarshal_count(entry: EntryPoint, obj: &Bound<'_, PyAny>) -> CallResult<u32> {
    let n = unmarshal_int(entry, obj)?;
    if n < 0 {
        return Err(sentinel(entry, format!("count {n}")));
    }
    u32::try_from(n).map_err(|_| {
        CallFailure::new(
            entry,
            CallFailureKind::Unmarshal {
                expected: "32-bit count",
                found: n.to_string(),
            },
        )
    })
}

fn unmarshal_non_negative(entry: EntryPoint, obj: &Bound<'_, PyAny>) -> CallResult<f64> {
    if obj.is_none() {
        return Err(sentinel(entry, "None".into()));
    }
    if obj.is_instance_of::<PyBool>() {
        return Err(CallFailure::new(
            entry,
            CallFailureKind::Unmarshal {
                expected: "float",
                found: "bool".into(),
            },
        ));
    }
    let v = obj.extract::<f64>().map_err(|_| {
        CallFailure::new(
            entry,
            CallFailureKind::Unmarshal {
                expected: "float",
                found: type_name(obj),
            },
        )
    })?;
    if v.is_nan() || v < 0.0 {
        return Err(sentinel(entry, format!("{v}")));
    }
    Ok(v)
}
