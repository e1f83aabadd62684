//! The exported C functions against a running bridge. One test: the bridge
//! is process-wide and the last-error slot is checked verbatim.

mod common;

use std::ffi::{CStr, CString};
use std::ptr;

use libc::c_char;
use tecto_bridge::ModelHandle;
use tecto_bridge::config::{MODULE_ENV, PATH_ENV};
use tecto_bridge::ffi::*;

use common::{assert_close, escarpment, guest_dir};

fn last_error() -> String {
    let mut buf = [0 as c_char; 512];
    let len = unsafe { gospl_last_error(buf.as_mut_ptr(), buf.len()) };
    assert!(len > 0 && (len as usize) < buf.len());
    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_str()
        .unwrap()
        .to_string()
}

#[test]
fn exports_drive_a_model_end_to_end() {
    // SAFETY: the only test in this binary, and it has not started any
    // thread that reads the environment.
    unsafe {
        std::env::set_var(MODULE_ENV, "gospl_python_interface");
        std::env::set_var(PATH_ENV, guest_dir());
    }
    assert_eq!(initialize_gospl_extensions(), 0);
    assert_eq!(initialize_gospl_extensions(), 0);

    let dir = tempfile::tempdir().unwrap();
    let cfg = CString::new(escarpment(dir.path()).to_str().unwrap()).unwrap();
    let h = unsafe { create_enhanced_model(cfg.as_ptr()) };
    assert!(h >= 0);
    assert!(ModelHandle::from_raw(h).is_some());
    assert_eq!(get_current_time(h), 0.0);
    assert_eq!(get_time_step(h), 0.5);

    assert_eq!(run_processes_for_steps(h, 3, 0.5, 0), 3);
    assert_close(get_current_time(h), 1.5);
    assert!(run_processes_for_dt(h, 0.5, 0) >= 0.0);
    assert_eq!(run_processes_until_time(h, 3.0, 0.75, 0), 2);
    assert_close(get_current_time(h), 3.0);

    let coords = [0.0, 0.0, 0.0, 10.0, 10.0, 0.0];
    let mut elevations = [f64::NAN; 2];
    let status = unsafe {
        interpolate_elevation_to_points(h, coords.as_ptr(), 2, elevations.as_mut_ptr(), 1, 1.0)
    };
    assert_eq!(status, 0);
    assert!(elevations[0] < 1.0, "{elevations:?}");
    assert!(elevations[1] > 99.0, "{elevations:?}");

    let velocities = [0.0; 6];
    let status =
        unsafe { apply_velocity_data(h, coords.as_ptr(), velocities.as_ptr(), 2, 1.0, 3, 1.0) };
    assert_eq!(status, 0);

    // A null buffer with points is stopped before the guest is called.
    let status =
        unsafe { apply_velocity_data(h, ptr::null(), velocities.as_ptr(), 2, 1.0, 3, 1.0) };
    assert_eq!(status, -1);
    let full = last_error();
    assert!(full.contains("null buffer with 2 points"), "{full}");
    assert_eq!(
        unsafe { gospl_last_error(ptr::null_mut(), 0) } as usize,
        full.len()
    );

    let mut short = [1 as c_char; 8];
    let len = unsafe { gospl_last_error(short.as_mut_ptr(), short.len()) };
    assert_eq!(len as usize, full.len());
    let truncated = unsafe { CStr::from_ptr(short.as_ptr()) }.to_str().unwrap();
    assert_eq!(truncated, &full[..7]);

    // Guest failures come back as sentinels too.
    let missing = CString::new("/nonexistent/escarpment.cfg").unwrap();
    assert_eq!(unsafe { create_enhanced_model(missing.as_ptr()) }, -1);
    assert!(last_error().contains("FileNotFoundError"));
    assert_eq!(unsafe { create_enhanced_model(ptr::null()) }, -1);
    assert_eq!(run_processes_for_steps(h, -2, 0.5, 0), -1);
    assert!(last_error().contains("negative count: -2"));

    assert_eq!(destroy_model(h), 0);
    assert_eq!(get_current_time(h), -1.0);
    assert!(last_error().contains("is not live"));
    assert_eq!(destroy_model(h), -1);

    finalize_gospl_extensions();
    assert_eq!(initialize_gospl_extensions(), -1);
    assert!(last_error().contains("restart is not supported"));
}
