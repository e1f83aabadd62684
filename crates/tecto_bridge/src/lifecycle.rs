//! Boot and teardown of the embedded interpreter.
//!
//! Uninitialized -> Ready on a successful start, Ready -> Finalized on
//! shutdown. Finalized is terminal: the interpreter cannot be booted twice in
//! one process.

use std::fmt;
use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3::types::PyList;

use crate::config::BridgeConfig;
use crate::entry_points::EntryPointTable;
use crate::errors::BridgeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeState {
    Uninitialized,
    Ready,
    Finalized,
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuntimeState::Uninitialized => "uninitialized",
            RuntimeState::Ready => "ready",
            RuntimeState::Finalized => "finalized",
        })
    }
}

/// A loaded guest module together with its resolved entry points.
pub(crate) struct LoadedGuest {
    pub module: Py<PyModule>,
    pub table: EntryPointTable,
}

#[derive(Debug)]
pub(crate) struct RuntimeLifecycle {
    state: RuntimeState,
    // Set once this bridge booted the interpreter; a host that already runs
    // one keeps ownership of it.
    owns_interpreter: bool,
}

impl RuntimeLifecycle {
    pub(crate) const fn new() -> Self {
        Self {
            state: RuntimeState::Uninitialized,
            owns_interpreter: false,
        }
    }

    pub(crate) fn state(&self) -> RuntimeState {
        self.state
    }

    pub(crate) fn start(&mut self, config: &BridgeConfig) -> Result<LoadedGuest, BridgeError> {
        if self.state == RuntimeState::Finalized {
            return Err(BridgeError::RuntimeStart(
                "runtime was finalized; restart is not supported".into(),
            ));
        }
        if boot()? {
            self.owns_interpreter = true;
            tracing::info!("embedded interpreter initialized");
        }
        let paths = config.resolved_search_paths();
        let guest = Python::with_gil(|py| -> Result<LoadedGuest, BridgeError> {
            register_array_exchange(py)?;
            extend_search_path(py, &paths).map_err(|e| {
                BridgeError::RuntimeStart(format!("cannot extend module search path: {e}"))
            })?;
            let module = py
                .import_bound(config.module.as_str())
                .map_err(|e| BridgeError::ModuleLoad {
                    module: config.module.clone(),
                    reason: e.to_string(),
                })?;
            let table = EntryPointTable::resolve(&module)?;
            Ok(LoadedGuest {
                module: module.unbind(),
                table,
            })
        })?;
        self.state = RuntimeState::Ready;
        Ok(guest)
    }

    /// Releases `guest` under the interpreter lock, then tears the interpreter
    /// down if this bridge booted it.
    pub(crate) fn shutdown(&mut self, guest: Option<LoadedGuest>) {
        if self.state == RuntimeState::Finalized {
            return;
        }
        if let Some(guest) = guest {
            Python::with_gil(|_py| drop(guest));
        }
        if self.state == RuntimeState::Uninitialized && !self.owns_interpreter {
            return;
        }
        if self.owns_interpreter {
            // SAFETY: every object the bridge held was dropped above while the
            // interpreter lock was held, and the bridge lock keeps other
            // bridge calls out.
            match unsafe { finalize() } {
                Ok(()) => tracing::info!("embedded interpreter finalized"),
                Err(code) => tracing::warn!(code, "interpreter finalization reported an error"),
            }
        }
        self.state = RuntimeState::Finalized;
    }
}

/// Returns true when this call performed the initialization.
fn boot() -> Result<bool, BridgeError> {
    // SAFETY: Py_IsInitialized may be called before, during and after init.
    if unsafe { pyo3::ffi::Py_IsInitialized() } != 0 {
        return Ok(false);
    }
    pyo3::prepare_freethreaded_python();
    // SAFETY: as above.
    if unsafe { pyo3::ffi::Py_IsInitialized() } == 0 {
        return Err(BridgeError::RuntimeStart(
            "interpreter did not initialize".into(),
        ));
    }
    Ok(true)
}

fn register_array_exchange(py: Python<'_>) -> Result<(), BridgeError> {
    py.import_bound("numpy")
        .map(|_| ())
        .map_err(|e| BridgeError::RuntimeStart(format!("array exchange unavailable: {e}")))
}

fn extend_search_path(py: Python<'_>, paths: &[PathBuf]) -> PyResult<()> {
    let sys_path = py
        .import_bound("sys")?
        .getattr("path")?
        .downcast_into::<PyList>()?;
    // Front insertion in reverse keeps the configured order.
    for p in paths.iter().rev() {
        let entry = p.to_string_lossy();
        if sys_path.contains(entry.as_ref())? {
            continue;
        }
        sys_path.insert(0, entry.as_ref())?;
        tracing::debug!(path = %entry, "added guest search path");
    }
    Ok(())
}

/// # Safety
///
/// No Python object may outlive this call, and no other thread may be
/// executing Python code.
unsafe fn finalize() -> Result<(), i32> {
    // SAFETY: guarded by the caller's contract.
    unsafe {
        if pyo3::ffi::Py_IsInitialized() == 0 {
            return Ok(());
        }
        // The thread state is never released: it dies with the interpreter.
        let _gil = pyo3::ffi::PyGILState_Ensure();
        match pyo3::ffi::Py_FinalizeEx() {
            0 => Ok(()),
            code => Err(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names() {
        assert_eq!(RuntimeState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(RuntimeState::Ready.to_string(), "ready");
        assert_eq!(RuntimeState::Finalized.to_string(), "finalized");
    }

    #[test]
    fn shutdown_before_start_is_a_no_op() {
        let mut lc = RuntimeLifecycle::new();
        lc.shutdown(None);
        assert_eq!(lc.state(), RuntimeState::Uninitialized);
    }
}
