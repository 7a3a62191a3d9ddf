use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CodecError, CodecResult};

/// Top-level configuration (loaded from wacrypt.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WacryptConfig {
    pub log: LogConfig,
    pub encrypt: EncryptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Header values written into newly authored containers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptConfig {
    /// App version string recorded in the header (default: 2.22.5.13)
    pub app_version: String,
    /// Last two digits of the owner's phone number (default: "00")
    pub jid_suffix: String,
    /// Backup schema version, omitted from the header when unset
    pub backup_version: Option<i32>,
    /// zlib-compress the payload before encryption (default: true)
    pub compress: bool,
    /// Feature table: flag name ("f_5" .. "f_39") → value.
    ///
    /// There is no built-in default set; flags not listed stay false.
    pub features: BTreeMap<String, bool>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for EncryptConfig {
    fn default() -> Self {
        Self {
            app_version: "2.22.5.13".into(),
            jid_suffix: "00".into(),
            backup_version: None,
            compress: true,
            features: BTreeMap::new(),
        }
    }
}

impl WacryptConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> CodecResult<Self> {
        if !path.exists() {
            tracing::warn!(
                "config file not found: {}  (using defaults)",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| CodecError::Config(format!("parsing config {}: {e}", path.display())))
    }
}
