//! Configuration loading and root folder resolution
//!
//! [ARCH-INIT-005] Root folder resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `NASHIR_ROOT_FOLDER` environment variable
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::info;

/// Name of the shared SQLite database file under the root folder
pub const DATABASE_FILE: &str = "nashir.db";

/// Environment variable consulted at resolution tier 2
pub const ROOT_FOLDER_ENV: &str = "NASHIR_ROOT_FOLDER";

/// Service configuration from database
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    pub module_name: String,
    pub host: String,
    pub port: u16,
    pub enabled: bool,
}

/// Resolves the root folder for a service following [ARCH-INIT-005]
///
/// The `service_name` is only used for logging; all services share one
/// root folder and one database file.
pub struct RootFolderResolver {
    service_name: &'static str,
    cli_arg: Option<String>,
}

impl RootFolderResolver {
    pub fn new(service_name: &'static str) -> Self {
        Self {
            service_name,
            cli_arg: None,
        }
    }

    /// Supply a command-line override (tier 1)
    pub fn with_cli_arg(mut self, cli_arg: Option<String>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    /// Resolve the root folder, walking the four tiers in order
    pub fn resolve(&self) -> PathBuf {
        // Tier 1: command-line argument
        if let Some(path) = &self.cli_arg {
            info!("{}: root folder from command line: {}", self.service_name, path);
            return PathBuf::from(path);
        }

        // Tier 2: environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            info!("{}: root folder from {}: {}", self.service_name, ROOT_FOLDER_ENV, path);
            return PathBuf::from(path);
        }

        // Tier 3: TOML config file
        if let Ok(config_path) = find_config_file() {
            if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
                if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                    if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                        info!(
                            "{}: root folder from {}: {}",
                            self.service_name,
                            config_path.display(),
                            root_folder
                        );
                        return PathBuf::from(root_folder);
                    }
                }
            }
        }

        // Tier 4: OS-dependent compiled default
        let path = default_root_folder();
        info!("{}: root folder default: {}", self.service_name, path.display());
        path
    }
}

/// Prepares a resolved root folder for use: directory creation and
/// database path derivation.
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder (and parents) if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    /// Path of the shared SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn root_folder(&self) -> &PathBuf {
        &self.root_folder
    }
}

/// Locate the configuration file for the platform
fn find_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/nashir/config.toml first, then /etc/nashir/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("nashir").join("config.toml"));
        let system_config = PathBuf::from("/etc/nashir/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let config_path = dirs::config_dir()
        .map(|d| d.join("nashir").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", config_path)))
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/nashir (or /var/lib/nashir for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("nashir"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/nashir"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/nashir
        dirs::data_dir()
            .map(|d| d.join("nashir"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/nashir"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\nashir
        dirs::data_local_dir()
            .map(|d| d.join("nashir"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\nashir"))
    } else {
        PathBuf::from("./nashir_data")
    }
}

/// Load service configuration from database
pub async fn load_module_config(db: &SqlitePool, module_name: &str) -> Result<ModuleConfig> {
    let record = sqlx::query_as::<_, (String, String, i64, i64)>(
        "SELECT module_name, host, port, enabled FROM module_config WHERE module_name = ?",
    )
    .bind(module_name)
    .fetch_one(db)
    .await?;

    Ok(ModuleConfig {
        module_name: record.0,
        host: record.1,
        port: record.2 as u16,
        enabled: record.3 != 0,
    })
}

/// Read a setting value, if present
pub async fn get_setting(db: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?
            .flatten();
    Ok(value)
}

/// Read a setting parsed as i64, falling back to `default` when missing
/// or malformed
pub async fn get_setting_i64(db: &SqlitePool, key: &str, default: i64) -> Result<i64> {
    Ok(get_setting(db, key)
        .await?
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default))
}

/// Read a setting as an owned string, falling back to `default`
pub async fn get_setting_string(db: &SqlitePool, key: &str, default: &str) -> Result<String> {
    Ok(get_setting(db, key).await?.unwrap_or_else(|| default.to_string()))
}

/// Write a setting value (insert or replace)
pub async fn set_setting(db: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(db)
        .await?;
    Ok(())
}
