//! Persisted user settings and download-root resolution.
//!
//! Settings live as pretty JSON in `<data dir>/settings.json`:
//!
//! ```json
//! {
//!   "roms_path": "/home/me/ROMs",
//!   "ra_api_key": ""
//! }
//! ```
//!
//! A missing or unreadable file yields the defaults; only saving reports
//! errors.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Settings file name inside the data directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// Directory name used under the platform config directory.
pub const APP_DIR_NAME: &str = "romifleur";

/// Errors raised while persisting settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Writing the settings file failed.
    #[error("IO error on settings file {path}: {source}")]
    Io {
        /// Settings file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Settings could not be serialized.
    #[error("cannot serialize settings: {source}")]
    Serialize {
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// User settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Download root; relative paths resolve against the working directory.
    pub roms_path: PathBuf,
    /// RetroAchievements web API key; empty disables lookups.
    pub ra_api_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            roms_path: default_roms_path(),
            ra_api_key: String::new(),
        }
    }
}

/// `~/ROMs`, or `./ROMs` when no home directory is known.
#[must_use]
pub fn default_roms_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ROMs")
}

/// Resolves the data directory.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/romifleur`
/// 2. the platform config directory (`dirs::config_dir()`) + `romifleur`
/// 3. `./.romifleur`
#[must_use]
pub fn default_data_dir() -> PathBuf {
    if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg_config_home).join(APP_DIR_NAME);
    }
    dirs::config_dir().map_or_else(
        || PathBuf::from(format!(".{APP_DIR_NAME}")),
        |dir| dir.join(APP_DIR_NAME),
    )
}

/// Makes `configured` absolute and creates it; falls back to `fallback`
/// (created as well) when that fails.
#[must_use]
pub fn resolve_download_root(configured: &Path, fallback: &Path) -> PathBuf {
    let path = if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(configured))
            .unwrap_or_else(|_| configured.to_path_buf())
    };

    match std::fs::create_dir_all(&path) {
        Ok(()) => path,
        Err(e) => {
            warn!(
                path = %path.display(),
                fallback = %fallback.display(),
                error = %e,
                "cannot create download root, using fallback"
            );
            if let Err(e) = std::fs::create_dir_all(fallback) {
                warn!(path = %fallback.display(), error = %e, "cannot create fallback download root");
            }
            fallback.to_path_buf()
        }
    }
}

/// Settings shared across services, optionally backed by a file.
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    settings: RwLock<Settings>,
}

impl SettingsStore {
    /// Loads `<data_dir>/settings.json`, falling back to defaults.
    #[must_use]
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let settings = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Settings>(&raw) {
                Ok(settings) => {
                    debug!(path = %path.display(), "loaded settings");
                    settings
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid settings file, using defaults");
                    Settings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read settings, using defaults");
                Settings::default()
            }
        };
        Self {
            path: Some(path),
            settings: RwLock::new(settings),
        }
    }

    /// Creates a store that is never written to disk.
    #[must_use]
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            path: None,
            settings: RwLock::new(settings),
        }
    }

    /// Settings file path, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current settings.
    #[must_use]
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Updates the given fields and persists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be written. The in-memory
    /// settings are updated regardless.
    pub fn update(
        &self,
        roms_path: Option<PathBuf>,
        ra_api_key: Option<String>,
    ) -> Result<(), ConfigError> {
        {
            let mut settings = self
                .settings
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(roms_path) = roms_path {
                settings.roms_path = roms_path;
            }
            if let Some(ra_api_key) = ra_api_key {
                settings.ra_api_key = ra_api_key;
            }
        }
        self.save()
    }

    /// Writes the settings file; a no-op for in-memory stores.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization or the write fails.
    pub fn save(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string_pretty(&self.settings())
            .map_err(|source| ConfigError::Serialize { source })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, raw).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "saved settings");
        Ok(())
    }

    /// Resolved, existing download root.
    #[must_use]
    pub fn download_root(&self) -> PathBuf {
        resolve_download_root(&self.settings().roms_path, &default_roms_path())
    }
}
