//! Error taxonomy for the host/guest boundary.
//!
//! Startup errors (`RuntimeStart`, `ModuleLoad`, `EntryPointMissing`) leave the
//! bridge unusable for the rest of the process. `Call` is local to one
//! operation. `Argument` is raised on the host side before anything crosses
//! into the guest.

use thiserror::Error;

use crate::entry_points::EntryPoint;
use crate::lifecycle::RuntimeState;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("embedded runtime failed to start: {0}")]
    RuntimeStart(String),

    #[error("guest module '{module}' could not be loaded: {reason}")]
    ModuleLoad { module: String, reason: String },

    #[error("guest module is missing entry point '{name}'")]
    EntryPointMissing { name: &'static str },

    #[error(transparent)]
    Call(#[from] CallFailure),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error("bridge is not ready (state: {0})")]
    NotReady(RuntimeState),
}

impl BridgeError {
    /// True for the errors only a process restart can clear.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            BridgeError::RuntimeStart(_)
                | BridgeError::ModuleLoad { .. }
                | BridgeError::EntryPointMissing { .. }
        )
    }
}

/// One entry-point invocation that failed inside the guest or could not be
/// converted back into host types.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} failed: {kind}", .entry.symbol())]
pub struct CallFailure {
    pub entry: EntryPoint,
    pub kind: CallFailureKind,
}

impl CallFailure {
    pub fn new(entry: EntryPoint, kind: CallFailureKind) -> Self {
        Self { entry, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallFailureKind {
    #[error("guest raised {message}")]
    Raised {
        message: String,
        traceback: Option<String>,
    },

    #[error("guest reported failure ({0})")]
    Sentinel(String),

    #[error("expected {expected}, guest returned {found}")]
    Unmarshal { expected: &'static str, found: String },

    #[error("expected {expected} values, guest returned {found}")]
    ShapeMismatch { expected: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("null buffer with {points} points")]
    NullBuffer { points: usize },

    #[error("buffer holds {len} values, {needed} required")]
    BufferTooSmall { needed: usize, len: usize },

    #[error("point count mismatch: {left} vs {right}")]
    PointCountMismatch { left: usize, right: usize },

    #[error("expected {expected} components per point, got {found}")]
    ComponentMismatch { expected: usize, found: usize },

    #[error("negative count: {0}")]
    NegativeCount(i64),

    #[error("model handle {0} is not live")]
    StaleHandle(i32),

    #[error("handle registry is full")]
    RegistryFull,

    #[error("invalid path argument: {0}")]
    InvalidPath(String),
}
