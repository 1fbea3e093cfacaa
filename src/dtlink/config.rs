use crate::codec::export::ExportStyle;
use crate::error::{DtError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080/";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_COMPRESS_THRESHOLD: usize = 1024;

pub const KEYS: [&str; 5] = [
    "server-url",
    "link-base",
    "timeout",
    "compress-threshold",
    "export-style",
];

/// Configuration for dtlink, stored in `config.json` in the user config directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DtConfig {
    /// Remote store the sync client talks to
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Prefix for shareable links; the server URL when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_base: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Request bodies above this many bytes are sent gzip-compressed
    #[serde(default = "default_compress_threshold")]
    pub compress_threshold: usize,

    #[serde(default)]
    pub export_style: ExportStyle,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_compress_threshold() -> usize {
    DEFAULT_COMPRESS_THRESHOLD
}

impl Default for DtConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            link_base: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            compress_threshold: DEFAULT_COMPRESS_THRESHOLD,
            export_style: ExportStyle::default(),
        }
    }
}

impl DtConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(DtError::Io)?;
        let config: DtConfig = serde_json::from_str(&content).map_err(DtError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(DtError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(DtError::Serialization)?;
        fs::write(config_path, content).map_err(DtError::Io)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn link_base(&self) -> &str {
        self.link_base.as_deref().unwrap_or(&self.server_url)
    }

    /// `DTLINK_SERVER` and `--server` win over the stored value.
    pub fn with_server_override(mut self, server: Option<String>) -> Self {
        if let Some(url) = server.filter(|s| !s.trim().is_empty()) {
            self.server_url = url;
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "server-url" => Some(self.server_url.clone()),
            "link-base" => Some(self.link_base().to_string()),
            "timeout" => Some(self.timeout_secs.to_string()),
            "compress-threshold" => Some(self.compress_threshold.to_string()),
            "export-style" => Some(self.export_style.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "server-url" => {
                reqwest::Url::parse(value).map_err(|e| format!("Invalid URL '{}': {}", value, e))?;
                self.server_url = value.to_string();
            }
            "link-base" => {
                reqwest::Url::parse(value).map_err(|e| format!("Invalid URL '{}': {}", value, e))?;
                self.link_base = Some(value.to_string());
            }
            "timeout" => {
                let secs: u64 = value
                    .parse()
                    .map_err(|_| format!("Invalid timeout: {} (expected whole seconds)", value))?;
                if secs == 0 {
                    return Err("Timeout must be at least 1 second".to_string());
                }
                self.timeout_secs = secs;
            }
            "compress-threshold" => {
                self.compress_threshold = value
                    .parse()
                    .map_err(|_| format!("Invalid byte count: {}", value))?;
            }
            "export-style" => {
                self.export_style = value.parse()?;
            }
            other => return Err(format!("Unknown config key: {}", other)),
        }
        Ok(())
    }
}
