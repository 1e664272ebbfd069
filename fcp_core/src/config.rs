use directories::ProjectDirs;
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::record::CategorySet;
use crate::transfer::codec::Format;
use crate::transfer::constants::{DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_PAGE_SIZE};

const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "fcp";
const APP_NAME: &str = "fcp";
const CONFIG_FILE: &str = "config.json";

/// Overrides the config directory (used by tests and scripted runs)
pub const CONFIG_DIR_ENV: &str = "FCP_CONFIG_DIR";

/// Persisted defaults for transfers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FcpConfig {
    pub page_size: u32,
    pub format: Format,
    pub casts: bool,
    pub reactions: bool,
    pub links: bool,
    /// Per remote call timeout; 0 disables it
    pub call_timeout_secs: u64,
}

impl Default for FcpConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            format: Format::Binary,
            casts: true,
            reactions: true,
            links: true,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
        }
    }
}

/// Get the config directory path for this app
pub fn get_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

impl FcpConfig {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        get_config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Load config from disk or return default
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save config to disk
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no config directory")
        })?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, json)
    }

    pub fn filters(&self) -> CategorySet {
        CategorySet {
            casts: self.casts,
            reactions: self.reactions,
            links: self.links,
        }
    }
}

/// Typed options for one download, upload or conversion
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub filters: CategorySet,
    pub page_size: u32,
    /// Resign every record with this key before submitting it
    pub signing_key: Option<SigningKey>,
    pub format: Format,
    pub call_timeout: Option<Duration>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::from_config(&FcpConfig::default())
    }
}

impl TransferOptions {
    pub fn from_config(config: &FcpConfig) -> Self {
        let call_timeout = match config.call_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            filters: config.filters(),
            page_size: config.page_size,
            signing_key: None,
            format: config.format,
            call_timeout,
        }
    }

    pub fn with_filters(mut self, filters: CategorySet) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_signing_key(mut self, key: SigningKey) -> Self {
        self.signing_key = Some(key);
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }
}
