//! The process-wide bridge.
//!
//! Every operation takes the bridge lock for its full duration, then the
//! interpreter lock, so at most one host thread is ever inside the guest.
//! Both are scoped guards and are released on every exit path.

use std::sync::{Mutex, MutexGuard, PoisonError};

use pyo3::prelude::*;

use crate::array::{ArrayView, ArrayViewMut, Components};
use crate::config::BridgeConfig;
use crate::entry_points::{EntryPoint, EntryPointTable};
use crate::errors::{ArgumentError, BridgeError, BridgeResult, CallFailure, CallFailureKind};
use crate::handle::{HandleRegistry, ModelHandle};
use crate::lifecycle::{LoadedGuest, RuntimeLifecycle, RuntimeState};
use crate::marshal::CallMarshaler;

static BRIDGE: Bridge = Bridge::new();

/// The bridge shared by the whole process.
pub fn bridge() -> &'static Bridge {
    &BRIDGE
}

/// Outcome of a stepped run. A short count means the guest stopped early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepReport {
    pub requested: u32,
    pub completed: u32,
}

impl StepReport {
    pub fn is_partial(&self) -> bool {
        self.completed < self.requested
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeInfo {
    pub module: String,
    /// File the guest module was loaded from, when it has one.
    pub origin: Option<String>,
    pub entry_points: Vec<&'static str>,
    pub live_models: usize,
}

struct Session {
    module_name: String,
    guest: LoadedGuest,
    registry: HandleRegistry,
}

struct Inner {
    lifecycle: RuntimeLifecycle,
    session: Option<Session>,
    last_error: Option<String>,
}

pub struct Bridge {
    inner: Mutex<Inner>,
}

impl Bridge {
    const fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                lifecycle: RuntimeLifecycle::new(),
                session: None,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RuntimeState {
        self.lock().lifecycle.state()
    }

    /// Boots the interpreter, loads the guest module and resolves its entry
    /// points. Succeeds immediately when already running.
    pub fn start(&self, config: &BridgeConfig) -> BridgeResult<()> {
        let mut inner = self.lock();
        if inner.lifecycle.state() == RuntimeState::Ready {
            tracing::debug!("bridge already running");
            return Ok(());
        }
        match inner.lifecycle.start(config) {
            Ok(guest) => {
                tracing::info!(module = %config.module, "bridge ready");
                inner.session = Some(Session {
                    module_name: config.module.clone(),
                    guest,
                    registry: HandleRegistry::with_limit(config.max_models),
                });
                Ok(())
            }
            Err(e) => Err(inner.fail(None, e)),
        }
    }

    /// Drops every guest reference and tears the interpreter down. Safe to
    /// call in any state, including after a failed start.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        let guest = inner.session.take().map(|mut s| {
            let leaked = s.registry.clear();
            if leaked > 0 {
                tracing::warn!(leaked, "shutting down with live models");
            }
            s.guest
        });
        inner.lifecycle.shutdown(guest);
    }

    /// Diagnostic of the most recent failure, if any.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn live_models(&self) -> usize {
        self.lock()
            .session
            .as_ref()
            .map_or(0, |s| s.registry.len())
    }

    pub fn info(&self) -> Option<BridgeInfo> {
        let inner = self.lock();
        let s = inner.session.as_ref()?;
        let origin = Python::with_gil(|py| {
            s.guest
                .module
                .bind(py)
                .getattr("__file__")
                .and_then(|f| f.extract::<String>())
                .ok()
        });
        Some(BridgeInfo {
            module: s.module_name.clone(),
            origin,
            entry_points: s.guest.table.symbols().collect(),
            live_models: s.registry.len(),
        })
    }

    /// Records a failure detected outside a guest call.
    pub(crate) fn note(&self, err: &BridgeError) {
        let mut inner = self.lock();
        tracing::error!(error = %err, "bridge call rejected");
        inner.last_error = Some(err.to_string());
    }

    pub(crate) fn note_message(&self, message: String) {
        let mut inner = self.lock();
        tracing::error!(%message, "bridge call aborted");
        inner.last_error = Some(message);
    }

    fn call<T>(
        &self,
        entry: EntryPoint,
        f: impl FnOnce(&CallMarshaler<'_, '_>, &mut HandleRegistry) -> BridgeResult<T>,
    ) -> BridgeResult<T> {
        let mut inner = self.lock();
        let state = inner.lifecycle.state();
        let result = match inner.session.as_mut() {
            Some(session) if state == RuntimeState::Ready => {
                let table: &EntryPointTable = &session.guest.table;
                let registry = &mut session.registry;
                Python::with_gil(|py| f(&CallMarshaler::new(py, table), registry))
            }
            _ => Err(BridgeError::NotReady(state)),
        };
        result.map_err(|e| inner.fail(Some(entry), e))
    }

    pub fn create_model(&self, config_path: &str) -> BridgeResult<ModelHandle> {
        self.call(EntryPoint::CreateModel, |m, registry| {
            let guest = m.create_model(config_path)?;
            if registry.contains_guest(guest) {
                return Err(CallFailure::new(
                    EntryPoint::CreateModel,
                    CallFailureKind::Sentinel(format!("guest reused live handle {guest}")),
                )
                .into());
            }
            match registry.insert(guest) {
                Ok(handle) => {
                    tracing::info!(%handle, guest, config = config_path, "model created");
                    Ok(handle)
                }
                Err(e) => {
                    // Nothing on the host can reach the model; hand it back.
                    if let Err(cleanup) = m.destroy_model(guest) {
                        tracing::warn!(
                            guest,
                            error = %cleanup,
                            "unregistered model leaked in guest"
                        );
                    }
                    Err(e.into())
                }
            }
        })
    }

    /// On success the handle is retired and never resolves again.
    pub fn destroy_model(&self, handle: ModelHandle) -> BridgeResult<()> {
        self.call(EntryPoint::DestroyModel, |m, registry| {
            let guest = registry.resolve(handle)?;
            m.destroy_model(guest)?;
            registry.remove(handle)?;
            tracing::info!(%handle, "model destroyed");
            Ok(())
        })
    }

    /// Advances one step of `dt`; returns wall-clock seconds spent in the guest.
    pub fn run_for_dt(&self, handle: ModelHandle, dt: f64, verbose: bool) -> BridgeResult<f64> {
        self.call(EntryPoint::RunForDt, |m, registry| {
            let guest = registry.resolve(handle)?;
            Ok(m.run_for_dt(guest, dt, verbose)?)
        })
    }

    pub fn run_for_steps(
        &self,
        handle: ModelHandle,
        steps: u32,
        dt: f64,
        verbose: bool,
    ) -> BridgeResult<StepReport> {
        self.call(EntryPoint::RunForSteps, |m, registry| {
            let guest = registry.resolve(handle)?;
            let completed = m.run_for_steps(guest, steps, dt, verbose)?;
            if completed > steps {
                return Err(CallFailure::new(
                    EntryPoint::RunForSteps,
                    CallFailureKind::Unmarshal {
                        expected: "count no larger than requested",
                        found: completed.to_string(),
                    },
                )
                .into());
            }
            let report = StepReport {
                requested: steps,
                completed,
            };
            if report.is_partial() {
                tracing::warn!(%handle, requested = steps, completed, "stepped run stopped early");
            }
            Ok(report)
        })
    }

    /// Steps of at most `dt`, the last one clamped to land on `target_time`.
    pub fn run_until_time(
        &self,
        handle: ModelHandle,
        target_time: f64,
        dt: f64,
        verbose: bool,
    ) -> BridgeResult<u32> {
        self.call(EntryPoint::RunUntilTime, |m, registry| {
            let guest = registry.resolve(handle)?;
            Ok(m.run_until_time(guest, target_time, dt, verbose)?)
        })
    }

    /// Hands scattered velocity samples to the guest, which interpolates them
    /// onto its mesh with `k` neighbours weighted by `1 / d^power`.
    pub fn apply_velocity_field(
        &self,
        handle: ModelHandle,
        coords: ArrayView<'_>,
        velocities: ArrayView<'_>,
        timer: f64,
        k: i32,
        power: f64,
    ) -> BridgeResult<()> {
        self.call(EntryPoint::ApplyVelocity, |m, registry| {
            coords.expect_components(Components::Vector3)?;
            velocities.expect_components(Components::Vector3)?;
            if coords.points() != velocities.points() {
                return Err(ArgumentError::PointCountMismatch {
                    left: coords.points(),
                    right: velocities.points(),
                }
                .into());
            }
            let guest = registry.resolve(handle)?;
            Ok(m.apply_velocity(guest, &coords, &velocities, timer, k, power)?)
        })
    }

    /// Samples the guest's elevation field at `coords` into `out`. On failure
    /// the contents of `out` are unspecified.
    pub fn interpolate_scalar_field(
        &self,
        handle: ModelHandle,
        coords: ArrayView<'_>,
        k: i32,
        power: f64,
        out: &mut ArrayViewMut<'_>,
    ) -> BridgeResult<()> {
        self.call(EntryPoint::InterpolateElevation, |m, registry| {
            coords.expect_components(Components::Vector3)?;
            if out.components() != Components::Scalar {
                return Err(ArgumentError::ComponentMismatch {
                    expected: 1,
                    found: out.components().count(),
                }
                .into());
            }
            if out.points() != coords.points() {
                return Err(ArgumentError::PointCountMismatch {
                    left: coords.points(),
                    right: out.points(),
                }
                .into());
            }
            let guest = registry.resolve(handle)?;
            Ok(m.interpolate_elevation(guest, &coords, k, power, out)?)
        })
    }

    pub fn interpolate_scalar_field_vec(
        &self,
        handle: ModelHandle,
        coords: ArrayView<'_>,
        k: i32,
        power: f64,
    ) -> BridgeResult<Vec<f64>> {
        let mut values = vec![0.0; coords.points()];
        let mut out = ArrayViewMut::scalars(&mut values);
        self.interpolate_scalar_field(handle, coords, k, power, &mut out)?;
        Ok(values)
    }

    pub fn current_time(&self, handle: ModelHandle) -> BridgeResult<f64> {
        self.call(EntryPoint::CurrentTime, |m, registry| {
            let guest = registry.resolve(handle)?;
            Ok(m.current_time(guest)?)
        })
    }

    pub fn time_step(&self, handle: ModelHandle) -> BridgeResult<f64> {
        self.call(EntryPoint::TimeStep, |m, registry| {
            let guest = registry.resolve(handle)?;
            Ok(m.time_step(guest)?)
        })
    }
}

impl Inner {
    fn fail(&mut self, entry: Option<EntryPoint>, err: BridgeError) -> BridgeError {
        let entry = entry.map_or("start", EntryPoint::symbol);
        if let BridgeError::Call(CallFailure {
            kind: CallFailureKind::Raised {
                traceback: Some(tb),
                ..
            },
            ..
        }) = &err
        {
            tracing::debug!(entry, traceback = %tb, "guest traceback");
        }
        tracing::error!(entry, error = %err, "bridge call failed");
        self.last_error = Some(err.to_string());
        err
    }
}
