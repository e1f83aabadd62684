#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tecto_bridge::{BridgeConfig, ModelHandle, bridge};

pub fn guest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("guest")
}

/// Only the test guest directory is searched.
pub fn guest_config(module: &str) -> BridgeConfig {
    BridgeConfig {
        module: module.to_string(),
        search_paths: vec![guest_dir()],
        include_cwd: false,
        ..BridgeConfig::default()
    }
}

/// Starts the shared bridge with the test guest. Safe to call from every test.
pub fn start() {
    bridge()
        .start(&guest_config("gospl_python_interface"))
        .expect("bridge should start with the test guest");
}

pub fn write_config(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

pub fn escarpment(dir: &Path) -> PathBuf {
    write_config(dir, "escarpment.cfg", "# escarpment\nnx = 20\nextent = 10.0\ndt = 0.5\n")
}

/// A fresh model on the escarpment config, alive for the returned temp dir.
pub fn fresh_model() -> (tempfile::TempDir, ModelHandle) {
    start();
    let dir = tempfile::tempdir().unwrap();
    let cfg = escarpment(dir.path());
    let h = bridge()
        .create_model(cfg.to_str().unwrap())
        .expect("escarpment model");
    (dir, h)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= 1e-9,
        "expected {expected}, got {actual}"
    );
}
