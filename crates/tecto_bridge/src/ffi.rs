//! C ABI over the process-wide bridge.
//!
//! Every export returns the sentinel of its C signature on failure (`-1`, or
//! `-1.0` for doubles) and leaves the diagnostic in `gospl_last_error`. No
//! panic unwinds across this boundary.

use std::ffi::CStr;
use std::panic::{AssertUnwindSafe, catch_unwind};

use libc::{c_char, c_double, c_int, size_t};

use crate::array::{ArrayView, ArrayViewMut, Components};
use crate::bridge::bridge;
use crate::config::BridgeConfig;
use crate::errors::{ArgumentError, BridgeError, BridgeResult};
use crate::handle::ModelHandle;

const FAIL: c_int = -1;
const FAIL_F64: c_double = -1.0;

macro_rules! ffi_guard {
    ($sentinel:expr, $body:block) => {
        match catch_unwind(AssertUnwindSafe(|| $body)) {
            Ok(v) => v,
            Err(payload) => {
                bridge().note_message(panic_message(payload.as_ref()));
                $sentinel
            }
        }
    };
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown payload".to_string());
    format!("panic inside bridge call: {detail}")
}

/// Errors raised before the bridge is entered are recorded here; the bridge
/// records its own.
fn host_checked<T>(r: Result<T, ArgumentError>) -> BridgeResult<T> {
    r.map_err(|e| {
        let e = BridgeError::from(e);
        bridge().note(&e);
        e
    })
}

fn handle(raw: c_int) -> BridgeResult<ModelHandle> {
    host_checked(ModelHandle::from_raw(raw).ok_or(ArgumentError::StaleHandle(raw)))
}

fn count(raw: c_int) -> BridgeResult<usize> {
    host_checked(usize::try_from(raw).map_err(|_| ArgumentError::NegativeCount(i64::from(raw))))
}

fn status(r: BridgeResult<()>) -> c_int {
    match r {
        Ok(()) => 0,
        Err(_) => FAIL,
    }
}

fn install_logging() {
    use tracing_subscriber::EnvFilter;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tecto_bridge=info"));
    // A host that installed its own subscriber keeps it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Starts the embedded runtime and loads the guest module. Returns 0 on
/// success, -1 on error.
#[unsafe(no_mangle)]
pub extern "C" fn initialize_gospl_extensions() -> c_int {
    ffi_guard!(FAIL, {
        install_logging();
        status(bridge().start(&BridgeConfig::from_env()))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn finalize_gospl_extensions() {
    ffi_guard!((), { bridge().shutdown() })
}

/// # Safety
///
/// `config_path` must be null or a NUL-terminated string valid for the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn create_enhanced_model(config_path: *const c_char) -> c_int {
    ffi_guard!(FAIL, {
        if config_path.is_null() {
            let _ = host_checked::<()>(Err(ArgumentError::InvalidPath("null pointer".into())));
            return FAIL;
        }
        // SAFETY: non-null and NUL-terminated per the contract above.
        let path = unsafe { CStr::from_ptr(config_path) };
        let Ok(path) = host_checked(
            path.to_str()
                .map_err(|e| ArgumentError::InvalidPath(e.to_string())),
        ) else {
            return FAIL;
        };
        match bridge().create_model(path) {
            Ok(h) => h.to_raw(),
            Err(_) => FAIL,
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn destroy_model(handle_raw: c_int) -> c_int {
    ffi_guard!(FAIL, {
        let Ok(h) = handle(handle_raw) else {
            return FAIL;
        };
        status(bridge().destroy_model(h))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn run_processes_for_dt(handle_raw: c_int, dt: c_double, verbose: c_int) -> c_double {
    ffi_guard!(FAIL_F64, {
        let Ok(h) = handle(handle_raw) else {
            return FAIL_F64;
        };
        bridge().run_for_dt(h, dt, verbose != 0).unwrap_or(FAIL_F64)
    })
}

/// Returns the number of steps completed, which is short of `num_steps` when
/// the guest stopped early.
#[unsafe(no_mangle)]
pub extern "C" fn run_processes_for_steps(
    handle_raw: c_int,
    num_steps: c_int,
    dt: c_double,
    verbose: c_int,
) -> c_int {
    ffi_guard!(FAIL, {
        let (Ok(h), Ok(n)) = (handle(handle_raw), count(num_steps)) else {
            return FAIL;
        };
        let steps = u32::try_from(n).unwrap_or(u32::MAX);
        match bridge().run_for_steps(h, steps, dt, verbose != 0) {
            Ok(report) => c_int::try_from(report.completed).unwrap_or(c_int::MAX),
            Err(_) => FAIL,
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn run_processes_until_time(
    handle_raw: c_int,
    target_time: c_double,
    dt: c_double,
    verbose: c_int,
) -> c_int {
    ffi_guard!(FAIL, {
        let Ok(h) = handle(handle_raw) else {
            return FAIL;
        };
        match bridge().run_until_time(h, target_time, dt, verbose != 0) {
            Ok(n) => c_int::try_from(n).unwrap_or(c_int::MAX),
            Err(_) => FAIL,
        }
    })
}

/// # Safety
///
/// `coords` and `velocities` must each point to `num_points * 3` readable
/// doubles for the duration of the call, or be null when `num_points` is 0.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn apply_velocity_data(
    handle_raw: c_int,
    coords: *const c_double,
    velocities: *const c_double,
    num_points: c_int,
    timer: c_double,
    k: c_int,
    power: c_double,
) -> c_int {
    ffi_guard!(FAIL, {
        let (Ok(h), Ok(n)) = (handle(handle_raw), count(num_points)) else {
            return FAIL;
        };
        // SAFETY: forwarded from this function's contract.
        let views = unsafe {
            ArrayView::from_raw_parts(coords, n, Components::Vector3).and_then(|c| {
                ArrayView::from_raw_parts(velocities, n, Components::Vector3).map(|v| (c, v))
            })
        };
        let Ok((c, v)) = host_checked(views) else {
            return FAIL;
        };
        status(bridge().apply_velocity_field(h, c, v, timer, k, power))
    })
}

/// On failure the contents of `elevations` are unspecified.
///
/// # Safety
///
/// `coords` must point to `num_points * 3` readable doubles and `elevations`
/// to `num_points` writable doubles that nothing else accesses during the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn interpolate_elevation_to_points(
    handle_raw: c_int,
    coords: *const c_double,
    num_points: c_int,
    elevations: *mut c_double,
    k: c_int,
    power: c_double,
) -> c_int {
    ffi_guard!(FAIL, {
        let (Ok(h), Ok(n)) = (handle(handle_raw), count(num_points)) else {
            return FAIL;
        };
        // SAFETY: forwarded from this function's contract.
        let views = unsafe {
            ArrayView::from_raw_parts(coords, n, Components::Vector3).and_then(|c| {
                ArrayViewMut::from_raw_parts(elevations, n, Components::Scalar).map(|e| (c, e))
            })
        };
        let Ok((c, mut out)) = host_checked(views) else {
            return FAIL;
        };
        status(bridge().interpolate_scalar_field(h, c, k, power, &mut out))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn get_current_time(handle_raw: c_int) -> c_double {
    ffi_guard!(FAIL_F64, {
        let Ok(h) = handle(handle_raw) else {
            return FAIL_F64;
        };
        bridge().current_time(h).unwrap_or(FAIL_F64)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn get_time_step(handle_raw: c_int) -> c_double {
    ffi_guard!(FAIL_F64, {
        let Ok(h) = handle(handle_raw) else {
            return FAIL_F64;
        };
        bridge().time_step(h).unwrap_or(FAIL_F64)
    })
}

/// Fills a 10x10 rotational velocity field over [0, 10]². Returns the number
/// of points written (100), or -1 on error.
///
/// # Safety
///
/// `coords` and `velocities` must each point to 300 writable doubles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn create_velocity_field(
    t: c_double,
    center_x: c_double,
    center_y: c_double,
    amplitude: c_double,
    coords: *mut c_double,
    velocities: *mut c_double,
) -> c_int {
    ffi_guard!(FAIL, {
        let field = tecto_synth::rotational_field(t, [center_x, center_y], amplitude);
        let n = field.len();
        // SAFETY: forwarded from this function's contract.
        let views = unsafe {
            ArrayViewMut::from_raw_parts(coords, n, Components::Vector3).and_then(|c| {
                ArrayViewMut::from_raw_parts(velocities, n, Components::Vector3).map(|v| (c, v))
            })
        };
        let Ok((mut c, mut v)) = host_checked(views) else {
            return FAIL;
        };
        if c.copy_from(&field.coords).is_err() || v.copy_from(&field.velocities).is_err() {
            return FAIL;
        }
        c_int::try_from(n).unwrap_or(FAIL)
    })
}

/// Copies the most recent diagnostic into `buf` as a NUL-terminated string,
/// truncating to `len - 1` bytes. Returns the full length in bytes, or 0 when
/// nothing has failed yet. `buf` may be null to query the length.
///
/// # Safety
///
/// `buf` must be null or point to `len` writable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gospl_last_error(buf: *mut c_char, len: size_t) -> c_int {
    ffi_guard!(FAIL, {
        let Some(message) = bridge().last_error() else {
            if !buf.is_null() && len > 0 {
                // SAFETY: at least one writable byte.
                unsafe { *buf = 0 };
            }
            return 0;
        };
        let bytes = message.as_bytes();
        if !buf.is_null() && len > 0 {
            let n = bytes.len().min(len - 1);
            // SAFETY: `n + 1 <= len` bytes are writable and the source is a
            // distinct allocation.
            unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buf, n);
                *buf.add(n) = 0;
            }
        }
        c_int::try_from(bytes.len()).unwrap_or(c_int::MAX)
    })
}
