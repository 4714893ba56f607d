//! Configuration loading and root folder resolution
//!
//! Values come from, in order of precedence: command-line arguments,
//! environment variables, the TOML config file, compiled defaults. A missing
//! config file is never fatal.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Primary root folder environment variable
pub const ROOT_FOLDER_ENV: &str = "READLOG_ROOT_FOLDER";
/// Short alias, consulted after `READLOG_ROOT_FOLDER`
pub const ROOT_ALIAS_ENV: &str = "READLOG_ROOT";
/// Gemini API key environment variable
pub const GEMINI_API_KEY_ENV: &str = "READLOG_GEMINI_API_KEY";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "readlog.db";

/// Defaults used when neither CLI, environment nor TOML supply a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub host: String,
    pub port: u16,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("readlog"))
            .unwrap_or_else(|| PathBuf::from("./readlog_data"));

        Self {
            root_folder,
            log_level: "info".to_string(),
            log_file: None,
            host: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

/// Which book store backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Contents of the TOML config file
///
/// Every field is optional so that partial files are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_capacity: Option<usize>,
}

/// Load a TOML config file
///
/// A missing file logs a warning and yields the defaults; a file that exists
/// but cannot be read or parsed is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file not found at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Default config file location for a module
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("readlog").join(format!("{}.toml", module_name)))
}

/// Resolve the Gemini API key: environment first, then TOML
pub fn resolve_gemini_api_key(toml: &TomlConfig) -> Option<String> {
    let from_env = std::env::var(GEMINI_API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty());
    let from_toml = toml
        .gemini_api_key
        .clone()
        .filter(|k| !k.trim().is_empty());

    if from_env.is_some() && from_toml.is_some() {
        warn!(
            "Gemini API key set in both {} and the config file; using the environment",
            GEMINI_API_KEY_ENV
        );
    }
    from_env.or(from_toml)
}

/// Root folder resolution
///
/// 1. Command-line argument
/// 2. `READLOG_ROOT_FOLDER`, then `READLOG_ROOT`
/// 3. `root_folder` in the TOML config
/// 4. Compiled default
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            config_path: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Override the config file consulted in step 3
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    fn config_file_path(&self) -> Option<PathBuf> {
        self.config_path
            .clone()
            .or_else(|| default_config_path(&self.module_name))
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        for var in [ROOT_FOLDER_ENV, ROOT_ALIAS_ENV] {
            if let Ok(path) = std::env::var(var) {
                if !path.is_empty() {
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(config_path) = self.config_file_path() {
            match load_toml_config(&config_path) {
                Ok(TomlConfig {
                    root_folder: Some(root),
                    ..
                }) => return root,
                Ok(_) => {}
                Err(e) => warn!("Ignoring unreadable config file: {}", e),
            }
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Prepares the root folder and reports derived paths
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder (and parents); safe to call repeatedly
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}
