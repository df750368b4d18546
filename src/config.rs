//! Configuration for buildledger.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (BUILDLEDGER_HOME, BUILDLEDGER_DB)
//! 2. Config file (.buildledger/config.yaml)
//! 3. Defaults (~/.buildledger, database at ~/.buildledger/state.db)
//!
//! Config file discovery:
//! - Searches current directory and parents for .buildledger/config.yaml
//! - `paths.home` is relative to the .buildledger/ directory
//! - `paths.database` is relative to the resolved home

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::store::{StoreConfig, DEFAULT_BUSY_TIMEOUT, DEFAULT_READ_CONNECTIONS};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".buildledger";
const DATABASE_FILE: &str = "state.db";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub store: Option<StoreFileConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .buildledger/)
    pub home: Option<String>,
    /// Database file (relative to home)
    pub database: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreFileConfig {
    pub busy_timeout_ms: Option<u64>,
    pub read_connections: Option<usize>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Database file
    pub database: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Store tuning
    pub store: StoreSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub busy_timeout_ms: u64,
    pub read_connections: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
            read_connections: DEFAULT_READ_CONNECTIONS,
        }
    }
}

impl ResolvedConfig {
    /// Store configuration for the resolved database with the given partitions
    pub fn store_config<I, S>(&self, partitions: I) -> StoreConfig
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StoreConfig::new(&self.database)
            .with_partitions(partitions)
            .with_busy_timeout(Duration::from_millis(self.store.busy_timeout_ms))
            .with_read_connections(self.store.read_connections)
    }
}

/// Environment overrides, captured once so resolution stays testable
#[derive(Debug, Clone, Default)]
struct EnvOverrides {
    home: Option<PathBuf>,
    database: Option<PathBuf>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            home: std::env::var("BUILDLEDGER_HOME").ok().map(PathBuf::from),
            database: std::env::var("BUILDLEDGER_DB").ok().map(PathBuf::from),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Combine the config file, environment and defaults
fn resolve(
    file: Option<(PathBuf, ConfigFile)>,
    env: EnvOverrides,
    default_home: PathBuf,
) -> ResolvedConfig {
    let (config_file, paths, store_file) = match file {
        Some((path, config)) => (Some(path), config.paths, config.store),
        None => (None, PathsConfig::default(), None),
    };

    let config_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));

    let home = match (env.home, paths.home.as_deref()) {
        (Some(env_home), _) => env_home,
        (None, Some(home)) => resolve_path(config_dir, home),
        _ => default_home,
    };

    let database = match (env.database, paths.database.as_deref()) {
        (Some(env_db), _) => env_db,
        (None, Some(db)) => resolve_path(&home, db),
        (None, None) => home.join(DATABASE_FILE),
    };

    let defaults = StoreSettings::default();
    let store = StoreSettings {
        busy_timeout_ms: store_file
            .as_ref()
            .and_then(|s| s.busy_timeout_ms)
            .unwrap_or(defaults.busy_timeout_ms),
        read_connections: store_file
            .as_ref()
            .and_then(|s| s.read_connections)
            .unwrap_or(defaults.read_connections),
    };

    ResolvedConfig {
        home,
        database,
        config_file,
        store,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let file = match find_config_file() {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    Ok(resolve(file, EnvOverrides::from_env(), default_home))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
