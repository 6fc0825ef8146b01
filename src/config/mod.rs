use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::editor::history::{DEFAULT_HISTORY_BYTE_BUDGET, DEFAULT_HISTORY_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigPathError {
    #[error("HOME is not set and no XDG directory was provided")]
    MissingHomeDirectory,
}

const APP_DIR: &str = "radiomark";
const APP_CONFIG_FILE: &str = "config.json";
const DEFAULT_MAX_CANVAS_DIMENSION: u32 = 8192;

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub history_limit: usize,
    pub history_byte_budget: usize,
    pub font_path: Option<PathBuf>,
    pub fallback_image_path: Option<PathBuf>,
    pub storage_dir: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
    pub remote_endpoint: Option<String>,
    pub max_canvas_dimension: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_byte_budget: DEFAULT_HISTORY_BYTE_BUDGET,
            font_path: None,
            fallback_image_path: None,
            storage_dir: None,
            export_dir: None,
            remote_endpoint: None,
            max_canvas_dimension: DEFAULT_MAX_CANVAS_DIMENSION,
        }
    }
}

impl AppConfig {
    /// Local persistence directory, falling back to the XDG data home.
    pub fn resolved_storage_dir(&self) -> Result<PathBuf, ConfigPathError> {
        if let Some(dir) = &self.storage_dir {
            return Ok(dir.clone());
        }
        let (xdg_data_home, home) = data_env_dirs();
        data_dir(APP_DIR, xdg_data_home.as_deref(), home.as_deref())
    }

    pub fn resolved_export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    load_app_config_from(&path)
}

pub fn load_app_config_from(path: &Path) -> AppConfig {
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

fn data_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = xdg_root(xdg_config_home, home, ".config")?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn data_dir(
    app_dir: &str,
    xdg_data_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = xdg_root(xdg_data_home, home, ".local/share")?;
    path.push(app_dir);
    Ok(path)
}

fn xdg_root(
    xdg_home: Option<&Path>,
    home: Option<&Path>,
    home_fallback: &str,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(home_fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("radiomark-config-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            "radiomark",
            "config.json",
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/config-root/radiomark/config.json"));
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path("radiomark", "config.json", None, Some(Path::new("/tmp/home")))
            .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/home/.config/radiomark/config.json"));
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path("radiomark", "config.json", None, None).unwrap_err();
        assert_eq!(error, ConfigPathError::MissingHomeDirectory);
    }

    #[test]
    fn data_dir_falls_back_to_local_share() {
        let path = data_dir("radiomark", None, Some(Path::new("/tmp/home"))).expect("data dir");
        assert_eq!(path, PathBuf::from("/tmp/home/.local/share/radiomark"));
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = scratch_dir("missing");
        let config = load_app_config_with(Some(&dir), None);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.max_canvas_dimension, DEFAULT_MAX_CANVAS_DIMENSION);
        assert!(config.font_path.is_none());
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_keys() {
        let dir = scratch_dir("partial");
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{ "history_limit": 10, "font_path": "/fonts/a.ttf" }"#)
            .expect("write config");

        let config = load_app_config_from(&path);
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.font_path, Some(PathBuf::from("/fonts/a.ttf")));
        assert_eq!(config.max_canvas_dimension, DEFAULT_MAX_CANVAS_DIMENSION);
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        let dir = scratch_dir("malformed");
        let path = dir.join("config.json");
        std::fs::write(&path, "{ not json").expect("write config");

        let config = load_app_config_from(&path);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn explicit_storage_dir_wins() {
        let config = AppConfig {
            storage_dir: Some(PathBuf::from("/srv/radiomark")),
            ..AppConfig::default()
        };
        assert_eq!(
            config.resolved_storage_dir().expect("storage dir"),
            PathBuf::from("/srv/radiomark")
        );
    }

    #[test]
    fn history_byte_budget_and_export_dir_are_read() {
        let dir = scratch_dir("budget");
        let path = dir.join("config.json");
        std::fs::write(
            &path,
            r#"{ "history_byte_budget": 1048576, "export_dir": "/srv/exports" }"#,
        )
        .expect("write config");

        let config = load_app_config_from(&path);
        assert_eq!(config.history_byte_budget, 1_048_576);
        assert_eq!(config.resolved_export_dir(), PathBuf::from("/srv/exports"));
        assert_eq!(
            AppConfig::default().history_byte_budget,
            DEFAULT_HISTORY_BYTE_BUDGET
        );
    }
}
