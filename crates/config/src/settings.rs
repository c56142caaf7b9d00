// Application settings
// Loaded from ~/.config/accessgrid/settings.toml

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use accessgrid_io::{AssignmentColumns, ConflictMarkers, LoadOptions};
use accessgrid_recon::{MatrixScope, ReconOptions};

/// Environment variable naming an explicit settings file.
pub const ENV_CONFIG: &str = "ACCESSGRID_CONFIG";

/// Matrix rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixSettings {
    /// Which access tuples get a matrix row
    pub scope: MatrixScope,
    /// Cell text for a profile that holds the access
    pub present: String,
    /// Cell text for a flagged row's conflict column
    pub conflict: String,
}

impl Default for MatrixSettings {
    fn default() -> Self {
        Self {
            scope: MatrixScope::Catalogue,
            present: "✔".into(),
            conflict: "⚠".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Results kept per session before the oldest is evicted
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { capacity: accessgrid_recon::cache::DEFAULT_CAPACITY }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub columns: AssignmentColumns,
    pub conflicts: ConflictMarkers,
    pub matrix: MatrixSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Read { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => {
                write!(f, "cannot read settings {}: {message}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "invalid settings {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Settings {
    /// Get the default settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("accessgrid");
        config_dir.join("settings.toml")
    }

    /// Load settings: `explicit`, else `$ACCESSGRID_CONFIG`, else the
    /// default path, else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env = std::env::var_os(ENV_CONFIG).map(PathBuf::from);
        match locate(explicit, env) {
            Some(path) => Self::load_from(&path),
            None => {
                let path = Self::config_path();
                if path.is_file() {
                    Self::load_from(&path)
                } else {
                    log::debug!("no settings file at {}; using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load one file. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let settings = Self::from_toml(&contents).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        log::debug!("settings loaded from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| e.to_string())
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| e.to_string())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            columns: self.columns.clone(),
            markers: self.conflicts.clone(),
        }
    }

    pub fn recon_options(&self) -> ReconOptions {
        ReconOptions { matrix_scope: self.matrix.scope }
    }
}

/// An explicit path wins over the environment; neither means "use the
/// default location if it exists".
fn locate(explicit: Option<&Path>, env: Option<PathBuf>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| env.filter(|p| !p.as_os_str().is_empty()))
}
