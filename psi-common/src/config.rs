//! Configuration loading and root folder resolution
//!
//! Bootstrap settings live in a single TOML file shared by both binaries.
//! Every section is optional; a missing or partial file falls back to the
//! compiled defaults below.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (`PSI_ROOT_FOLDER`, `PSI_CONFIG`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "PSI_ROOT_FOLDER";

/// Environment variable naming an explicit config file
pub const CONFIG_FILE_ENV: &str = "PSI_CONFIG";

/// Database file created inside the root folder
pub const DATABASE_FILE_NAME: &str = "psi.db";

/// Storm index page of the imagery site
pub const DEFAULT_BASE_URL: &str = "https://storms.ngs.noaa.gov/";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder for the database and the tar cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub tagging: TaggingConfig,

    #[serde(default)]
    pub collector: CollectorConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path; when set, log lines are appended here as well as
    /// written to stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Open the configured log file for appending, creating its folder
    ///
    /// Returns `None` when no file is configured.
    pub fn open_log_file(&self) -> Result<Option<std::fs::File>> {
        let Some(path) = &self.file else {
            return Ok(None);
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Some(file))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Tag consensus settings
///
/// Values are kept as text here and validated by the tagger, which owns the
/// corresponding types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggingConfig {
    /// "strict" (more than one distinct value disagrees) or "lenient"
    /// (more than two distinct values disagree)
    #[serde(default = "default_threshold")]
    pub disagreement_threshold: String,

    /// Only "true" is read as a boolean literal; "false" stays free text
    #[serde(default)]
    pub legacy_boolean_literals: bool,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            disagreement_threshold: default_threshold(),
            legacy_boolean_literals: false,
        }
    }
}

/// Catalog reader and archive fetcher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Download directory; defaults to `<root>/tar_cache`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tar_cache_dir: Option<PathBuf>,

    /// Fixed pause between download attempts
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            tar_cache_dir: None,
            retry_delay_secs: default_retry_delay_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_threshold() -> String {
    "strict".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_retry_delay_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl TomlConfig {
    /// Parse configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from `path`, or from the default location
    ///
    /// A missing file is not an error: a warning is logged and defaults are
    /// returned. A file that exists but does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => locate_config_file(),
        };

        let Some(path) = path else {
            debug!("No config file found, using built-in defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Config file {} not found, using built-in defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Tar cache directory, defaulting to `<root>/tar_cache`
    pub fn tar_cache_dir(&self, root_folder: &Path) -> PathBuf {
        self.collector
            .tar_cache_dir
            .clone()
            .unwrap_or_else(|| root_folder.join("tar_cache"))
    }
}

/// Write configuration atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Root folder resolution
///
/// 1. Command-line argument (highest priority)
/// 2. `PSI_ROOT_FOLDER` environment variable
/// 3. `root_folder` from the TOML config
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Create the root folder if missing and return the database path inside it
pub fn ensure_root_folder(root_folder: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root_folder).map_err(|e| {
        Error::Config(format!(
            "Failed to create root folder {}: {}",
            root_folder.display(),
            e
        ))
    })?;
    Ok(root_folder.join(DATABASE_FILE_NAME))
}

/// Find the first existing config file
///
/// `PSI_CONFIG` wins; otherwise `~/.config/psi/config.toml`, then
/// `/etc/psi/config.toml` on Linux.
fn locate_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("psi").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/psi/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("psi"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\psi"))
    } else {
        // ~/.local/share/psi on Linux, ~/Library/Application Support/psi on macOS
        dirs::data_local_dir()
            .map(|d| d.join("psi"))
            .unwrap_or_else(|| PathBuf::from("./psi_data"))
    }
}
