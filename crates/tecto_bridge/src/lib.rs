//! Host-side bridge to a landscape evolution model running in an embedded
//! CPython interpreter.
//!
//! The interpreter and the guest module are process-wide; reach them through
//! [`bridge()`]. The same operations are exported with a C ABI from [`ffi`].

#![allow(clippy::too_many_arguments)]

pub mod array;
pub mod config;
pub mod entry_points;
pub mod errors;
pub mod ffi;
pub mod handle;

mod bridge;
mod lifecycle;
mod marshal;

pub use array::{ArrayView, ArrayViewMut, Components};
pub use bridge::{Bridge, BridgeInfo, StepReport, bridge};
pub use config::BridgeConfig;
pub use entry_points::EntryPoint;
pub use errors::{ArgumentError, BridgeError, BridgeResult, CallFailure, CallFailureKind};
pub use handle::{HandleRegistry, MAX_MODELS, ModelHandle};
pub use lifecycle::RuntimeState;
