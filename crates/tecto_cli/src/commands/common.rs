use std::fmt;
use std::path::Path;

use serde::Serialize;
use tecto_bridge::{BridgeError, ModelHandle, bridge};

use crate::args::Cli;

#[derive(Debug)]
pub(crate) enum Failure {
    /// The bridge could not start, or the command line was unusable.
    Startup(String),
    /// A model operation failed after startup.
    Operation(String),
}

impl Failure {
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            Failure::Startup(_) => 2,
            Failure::Operation(_) => 1,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Startup(m) | Failure::Operation(m) => f.write_str(m),
        }
    }
}

impl From<BridgeError> for Failure {
    fn from(e: BridgeError) -> Self {
        if e.is_startup() {
            Failure::Startup(e.to_string())
        } else {
            Failure::Operation(e.to_string())
        }
    }
}

pub(crate) fn start(cli: &Cli) -> Result<(), Failure> {
    let cfg = cli.bridge_config();
    tracing::debug!(module = %cfg.module, paths = ?cfg.search_paths, "starting bridge");
    bridge().start(&cfg)?;
    Ok(())
}

/// A model destroyed when the guard drops.
pub(crate) struct OpenModel {
    handle: ModelHandle,
}

impl OpenModel {
    pub(crate) fn create(config: &Path) -> Result<Self, Failure> {
        let path = config.to_str().ok_or_else(|| {
            Failure::Startup(format!("config path is not UTF-8: {}", config.display()))
        })?;
        let handle = bridge().create_model(path)?;
        Ok(Self { handle })
    }

    pub(crate) fn handle(&self) -> ModelHandle {
        self.handle
    }
}

impl Drop for OpenModel {
    fn drop(&mut self) {
        if let Err(e) = bridge().destroy_model(self.handle) {
            tracing::warn!(handle = %self.handle, error = %e, "model was not destroyed");
        }
    }
}

pub(crate) fn print_json(value: &impl Serialize) -> Result<(), Failure> {
    let text = serde_json::to_string(value)
        .map_err(|e| Failure::Operation(format!("cannot encode output: {e}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn require_positive(name: &str, value: f64) -> Result<(), Failure> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Failure::Startup(format!("--{name} must be positive, got {value}")))
    }
}
