//! The fixed set of guest operations, resolved once at startup.

use std::fmt;

use pyo3::prelude::*;

use crate::errors::BridgeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    CreateModel,
    DestroyModel,
    RunForDt,
    RunForSteps,
    RunUntilTime,
    ApplyVelocity,
    InterpolateElevation,
    CurrentTime,
    TimeStep,
}

impl EntryPoint {
    pub const COUNT: usize = 9;

    pub const ALL: [EntryPoint; Self::COUNT] = [
        EntryPoint::CreateModel,
        EntryPoint::DestroyModel,
        EntryPoint::RunForDt,
        EntryPoint::RunForSteps,
        EntryPoint::RunUntilTime,
        EntryPoint::ApplyVelocity,
        EntryPoint::InterpolateElevation,
        EntryPoint::CurrentTime,
        EntryPoint::TimeStep,
    ];

    /// Attribute name looked up on the guest module.
    pub const fn symbol(self) -> &'static str {
        match self {
            EntryPoint::CreateModel => "create_enhanced_model",
            EntryPoint::DestroyModel => "destroy_model",
            EntryPoint::RunForDt => "run_processes_for_dt",
            EntryPoint::RunForSteps => "run_processes_for_steps",
            EntryPoint::RunUntilTime => "run_processes_until_time",
            EntryPoint::ApplyVelocity => "apply_velocity_data",
            EntryPoint::InterpolateElevation => "interpolate_elevation_to_points",
            EntryPoint::CurrentTime => "get_current_time",
            EntryPoint::TimeStep => "get_time_step",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Either every entry point is resolved or the table does not exist.
pub struct EntryPointTable {
    callables: [Py<PyAny>; EntryPoint::COUNT],
}

impl EntryPointTable {
    /// Looks up every entry point on `module`, stopping at the first one that
    /// is absent or not callable.
    pub fn resolve(module: &Bound<'_, PyModule>) -> Result<Self, BridgeError> {
        let mut found: Vec<Py<PyAny>> = Vec::with_capacity(EntryPoint::COUNT);
        for entry in EntryPoint::ALL {
            let name = entry.symbol();
            let attr = match module.getattr(name) {
                Ok(attr) if attr.is_callable() => attr,
                _ => return Err(BridgeError::EntryPointMissing { name }),
            };
            tracing::debug!(entry = name, "resolved entry point");
            found.push(attr.unbind());
        }
        let callables = found
            .try_into()
            .map_err(|_| BridgeError::EntryPointMissing { name: "<table>" })?;
        Ok(Self { callables })
    }

    pub fn get<'py>(&self, py: Python<'py>, entry: EntryPoint) -> &Bound<'py, PyAny> {
        self.callables[entry.index()].bind(py)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &'static str> {
        EntryPoint::ALL.iter().map(|e| e.symbol())
    }
}
