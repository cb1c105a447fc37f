//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$RECEIPTBOX_CONFIG` (environment variable)
//! 2. `~/.config/receiptbox/config.toml` (Linux/macOS)
//!    `%APPDATA%\receiptbox\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! The library itself never calls [`load_config`]; the storage root reaches
//! [`AttachmentStore`](crate::store::AttachmentStore) explicitly.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::store::DEFAULT_MAX_ATTACHMENT_SIZE;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Attachment storage settings.
    pub storage: StorageConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Attachment storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one subdirectory per account.
    pub root: Option<PathBuf>,
    /// Largest accepted attachment in bytes (default: 67108864 = 64 MB).
    pub max_attachment_size: u64,
    /// `fsync` each attachment before reporting it saved.
    pub sync_writes: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_attachment_size: DEFAULT_MAX_ATTACHMENT_SIZE,
            sync_writes: true,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("RECEIPTBOX_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("receiptbox").join("config.toml"))
}

/// Resolve the attachment root: explicit setting, else the user data directory.
pub fn storage_root(storage: &StorageConfig) -> PathBuf {
    if let Some(ref dir) = storage.root {
        return dir.clone();
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("receiptbox")
        .join("attachments")
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("receiptbox")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("receiptbox.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert!(cfg.storage.root.is_none());
        assert_eq!(cfg.storage.max_attachment_size, 64 * 1024 * 1024);
        assert!(cfg.storage.sync_writes);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let mut cfg = Config::default();
        cfg.storage.root = Some(PathBuf::from("/srv/receipts"));
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.storage.root, cfg.storage.root);
        assert_eq!(parsed.general.log_level, cfg.general.log_level);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[storage]
root = "/tmp/family-files"
sync_writes = false
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.storage.root, Some(PathBuf::from("/tmp/family-files")));
        assert!(!cfg.storage.sync_writes);
        // Other fields use defaults
        assert_eq!(cfg.storage.max_attachment_size, DEFAULT_MAX_ATTACHMENT_SIZE);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_storage_root_prefers_explicit() {
        let storage = StorageConfig {
            root: Some(PathBuf::from("/x")),
            ..StorageConfig::default()
        };
        assert_eq!(storage_root(&storage), PathBuf::from("/x"));
        assert!(storage_root(&StorageConfig::default()).ends_with("receiptbox/attachments"));
    }

    #[test]
    fn test_log_file_path_in_cache_dir() {
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(PathBuf::from("/var/cache/rb"));
        assert_eq!(log_file_path(&cfg), PathBuf::from("/var/cache/rb/receiptbox.log"));
    }
}
