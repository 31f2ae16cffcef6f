use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::i18n::DEFAULT_LANGUAGE;

pub const APP_DIR_NAME: &str = "UpKiller";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const DEFAULT_AUTO_SCAN_MINUTES: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Operator settings persisted between launches.
///
/// Keys are PascalCase on disk so a settings file written by earlier releases
/// keeps loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Config {
    pub filter: String,
    pub include_windows_update: bool,
    pub show_only_active: bool,
    pub auto_scan_minutes: u32,
    pub auto_scan_enabled: bool,
    pub language: String,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter: String::new(),
            include_windows_update: false,
            show_only_active: true,
            auto_scan_minutes: DEFAULT_AUTO_SCAN_MINUTES,
            auto_scan_enabled: false,
            language: DEFAULT_LANGUAGE.to_string(),
            config_path: default_config_path(),
        }
    }
}

impl Config {
    /// Copy with out-of-range values replaced by their defaults.
    pub fn normalized(mut self) -> Self {
        if self.auto_scan_minutes == 0 {
            self.auto_scan_minutes = DEFAULT_AUTO_SCAN_MINUTES;
        }
        let language = self.language.trim().to_ascii_lowercase();
        self.language = if language.is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            language
        };
        self
    }
}

pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.auto_scan_minutes == 0 {
        return Err(ConfigError::Invalid(
            "auto_scan_minutes must be at least 1".into(),
        ));
    }

    if cfg.language.trim().is_empty() {
        return Err(ConfigError::Invalid("language is required".into()));
    }

    if cfg.config_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("config_path is required".into()));
    }

    Ok(())
}

pub fn stable_app_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().join(APP_DIR_NAME))
        .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR_NAME))
}

pub fn default_config_path() -> PathBuf {
    stable_app_data_dir().join(SETTINGS_FILE_NAME)
}

/// Loads settings from `path` (or the default location). A missing file yields
/// defaults bound to that path.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !config_path.exists() {
        return Ok(Config {
            config_path,
            ..Config::default()
        });
    }

    let raw = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
        path: config_path.clone(),
        source,
    })?;
    let mut cfg: Config = json5::from_str(&raw).map_err(|error| ConfigError::Parse {
        path: config_path.clone(),
        message: error.to_string(),
    })?;
    cfg.config_path = config_path;
    Ok(cfg.normalized())
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    validate(cfg)?;
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_string_pretty(cfg)?;
    std::fs::write(&cfg.config_path, json).map_err(|source| ConfigError::Io {
        path: cfg.config_path.clone(),
        source,
    })
}
