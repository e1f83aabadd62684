//! Where the bridge looks for the guest module.

use std::path::PathBuf;

use crate::handle::MAX_MODELS;

pub const DEFAULT_MODULE: &str = "gospl_python_interface";
pub const MODULE_ENV: &str = "TECTO_GUEST_MODULE";
pub const PATH_ENV: &str = "TECTO_GUEST_PATH";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Importable name of the guest module.
    pub module: String,
    /// Prepended to the guest search path; the first entry wins.
    pub search_paths: Vec<PathBuf>,
    /// Whether the process working directory is searched before `search_paths`.
    pub include_cwd: bool,
    /// Live models allowed at once; anything above the registry cap is clamped.
    pub max_models: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            module: DEFAULT_MODULE.to_string(),
            search_paths: vec![PathBuf::from("."), PathBuf::from("..")],
            include_cwd: true,
            max_models: MAX_MODELS,
        }
    }
}

impl BridgeConfig {
    /// Defaults overlaid with `TECTO_GUEST_MODULE` and `TECTO_GUEST_PATH`.
    pub fn from_env() -> Self {
        Self::default().overlay(
            std::env::var(MODULE_ENV).ok(),
            std::env::var_os(PATH_ENV),
        )
    }

    fn overlay(mut self, module: Option<String>, paths: Option<std::ffi::OsString>) -> Self {
        if let Some(m) = module.filter(|m| !m.trim().is_empty()) {
            self.module = m.trim().to_string();
        }
        if let Some(paths) = paths {
            let mut extra: Vec<PathBuf> = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            extra.append(&mut self.search_paths);
            self.search_paths = extra;
        }
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn with_max_models(mut self, max_models: usize) -> Self {
        self.max_models = max_models;
        self
    }

    /// Adds a path ahead of every other configured path.
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.insert(0, path.into());
        self
    }

    /// Search order as it should appear at the front of the guest path.
    pub fn resolved_search_paths(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = Vec::new();
        if self.include_cwd {
            if let Ok(cwd) = std::env::current_dir() {
                out.push(cwd);
            }
        }
        for p in &self.search_paths {
            let p = std::path::absolute(p).unwrap_or_else(|_| p.clone());
            if !out.contains(&p) {
                out.push(p);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_prepends_env_paths() {
        let joined = std::env::join_paths(["/opt/guest", "/srv/guest"]).unwrap();
        let cfg = BridgeConfig::default().overlay(Some(" my_guest ".into()), Some(joined));
        assert_eq!(cfg.module, "my_guest");
        assert_eq!(
            cfg.search_paths,
            vec![
                PathBuf::from("/opt/guest"),
                PathBuf::from("/srv/guest"),
                PathBuf::from("."),
                PathBuf::from(".."),
            ]
        );
    }

    #[test]
    fn model_limit_defaults_to_registry_cap() {
        assert_eq!(BridgeConfig::default().max_models, MAX_MODELS);
        assert_eq!(BridgeConfig::default().with_max_models(4).max_models, 4);
    }

    #[test]
    fn blank_module_keeps_default() {
        let cfg = BridgeConfig::default().overlay(Some("  ".into()), None);
        assert_eq!(cfg.module, DEFAULT_MODULE);
    }

    #[test]
    fn resolved_paths_start_with_cwd_and_dedupe() {
        let cwd = std::env::current_dir().unwrap();
        let cfg = BridgeConfig::default().with_search_path(cwd.clone());
        let resolved = cfg.resolved_search_paths();
        assert_eq!(resolved[0], cwd);
        assert_eq!(resolved.iter().filter(|p| **p == cwd).count(), 1);
    }

    #[test]
    fn later_builder_paths_take_precedence() {
        let cfg = BridgeConfig {
            include_cwd: false,
            search_paths: Vec::new(),
            ..BridgeConfig::default()
        }
        .with_search_path("/a")
        .with_search_path("/b");
        assert_eq!(
            cfg.resolved_search_paths(),
            vec![PathBuf::from("/b"), PathBuf::from("/a")]
        );
    }
}
