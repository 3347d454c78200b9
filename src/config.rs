use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

// ======================================================
// CONSTANTS
// ======================================================

const SYSTEM_CONFIG_PATH: &str = "/etc/brick/storage.json";
const DEFAULT_ROOT: &str = "/var/lib/containers/storage";
const DEFAULT_DRIVER: &str = "overlay";

pub const ROOT_ENV: &str = "BRICK_STORAGE_ROOT";
pub const DRIVER_ENV: &str = "BRICK_STORAGE_DRIVER";

// ======================================================
// CONFIG FILE
// ======================================================

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Storage driver name, e.g. "overlay" or "vfs".
    #[serde(default)]
    pub driver: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-user config if present, otherwise the system one.
pub fn config_path() -> PathBuf {
    if let Some(dir) = dirs::config_dir() {
        let user = dir.join("brick").join("storage.json");
        if user.exists() {
            return user;
        }
    }
    PathBuf::from(SYSTEM_CONFIG_PATH)
}

/// A missing file is an empty config.
pub fn load_config(path: &Path) -> Result<StorageConfig, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(r) => r,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StorageConfig::default()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ======================================================
// RESOLUTION
// ======================================================

/// Where the store lives and which driver laid it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    pub root: PathBuf,
    pub driver: String,
}

/// Resolve the store location using four-tier precedence:
/// 1. command-line flags
/// 2. BRICK_STORAGE_ROOT / BRICK_STORAGE_DRIVER
/// 3. the config file
/// 4. built-in defaults
///
/// Empty values are ignored at every tier.
pub fn resolve_location(
    flag_root: Option<PathBuf>,
    flag_driver: Option<String>,
    env: impl Fn(&str) -> Option<String>,
    file: &StorageConfig,
) -> StoreLocation {
    let root = flag_root
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| non_empty(env(ROOT_ENV)).map(PathBuf::from))
        .or_else(|| file.root.clone().filter(|p| !p.as_os_str().is_empty()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));

    let driver = non_empty(flag_driver)
        .or_else(|| non_empty(env(DRIVER_ENV)))
        .or_else(|| non_empty(file.driver.clone()))
        .unwrap_or_else(|| DEFAULT_DRIVER.to_string());

    StoreLocation { root, driver }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let loc = resolve_location(None, None, no_env, &StorageConfig::default());

        assert_eq!(loc.root, PathBuf::from("/var/lib/containers/storage"));
        assert_eq!(loc.driver, "overlay");
    }

    #[test]
    fn test_precedence_flag_env_file() {
        let file = StorageConfig {
            root: Some(PathBuf::from("/from/file")),
            driver: Some("vfs".to_string()),
        };
        let vars = HashMap::from([(ROOT_ENV, "/from/env".to_string())]);
        let env = |k: &str| vars.get(k).cloned();

        let loc = resolve_location(None, None, &env, &file);
        assert_eq!(loc.root, PathBuf::from("/from/env"));
        assert_eq!(loc.driver, "vfs");

        let loc = resolve_location(
            Some(PathBuf::from("/from/flag")),
            Some("btrfs".to_string()),
            &env,
            &file,
        );
        assert_eq!(loc.root, PathBuf::from("/from/flag"));
        assert_eq!(loc.driver, "btrfs");
    }

    #[test]
    fn test_empty_values_fall_through() {
        let file = StorageConfig {
            root: Some(PathBuf::new()),
            driver: Some("  ".to_string()),
        };
        let env = |_: &str| Some(String::new());

        let loc = resolve_location(Some(PathBuf::new()), Some(String::new()), env, &file);
        assert_eq!(loc.root, PathBuf::from(DEFAULT_ROOT));
        assert_eq!(loc.driver, DEFAULT_DRIVER);
    }

    #[test]
    fn test_load_config_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");

        let cfg = load_config(&path).unwrap();
        assert!(cfg.root.is_none());

        fs::write(&path, r#"{"root": "/srv/storage", "driver": "vfs"}"#).unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.root, Some(PathBuf::from("/srv/storage")));
        assert_eq!(cfg.driver.as_deref(), Some("vfs"));

        fs::write(&path, "root = nope").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
    }
}
