//! File configuration: `~/.config/blobstream/config.toml`.
//!
//! The TOML surface mirrors the runtime structs but in human units
//! (milliseconds/seconds); conversion happens in `to_*_config`. Invalid
//! values are advisory — the validating constructors log and substitute
//! defaults instead of failing.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backoff::BackoffConfig;
use crate::stream::StreamConfig;

/// Backoff parameters (optional `[backoff]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffSettings {
    /// First wait between attempts, in milliseconds.
    pub initial_ms: u64,
    /// Ceiling on a single wait, in seconds.
    pub max_duration_secs: u64,
    /// Jitter half-width cap, in seconds.
    pub jitter_limit_secs: u64,
    /// Wait multiplier after each failed attempt.
    pub factor: f64,
    /// Retries after the free initial attempt.
    pub max_retry_count: usize,
    /// Overall wall-clock budget per retried call, in seconds.
    pub time_limit_secs: u64,
    /// Log each failed attempt at warn level.
    pub error_log: bool,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_ms: 10,
            max_duration_secs: 3600,
            jitter_limit_secs: 60,
            factor: 1.5,
            max_retry_count: 50,
            time_limit_secs: 300,
            error_log: true,
        }
    }
}

impl BackoffSettings {
    pub fn to_backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            initial_duration: Duration::from_millis(self.initial_ms),
            max_duration: Duration::from_secs(self.max_duration_secs),
            jitter_limit: Duration::from_secs(self.jitter_limit_secs),
            backoff_factor: self.factor,
            max_retry_count: self.max_retry_count,
            backoff_time_limit: Duration::from_secs(self.time_limit_secs),
            error_log: self.error_log,
        }
    }
}

/// Stream session parameters (`[stream]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Bytes fetched per ranged read.
    pub chunk_size: usize,
    /// Multipart part size for uploads.
    pub part_size: usize,
    /// Content type recorded with uploaded objects.
    pub content_type: String,
    /// Route ranged fetches through the backoff executor.
    pub enable_backoff: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            chunk_size: 512 * 1024,
            part_size: 64 * 1024 * 1024,
            content_type: "application/octet-stream".to_string(),
            enable_backoff: false,
        }
    }
}

/// Top-level configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobStreamConfig {
    #[serde(default)]
    pub stream: StreamSettings,
    /// Optional backoff tuning; when missing, built-in defaults apply if
    /// `stream.enable_backoff` is set.
    #[serde(default)]
    pub backoff: Option<BackoffSettings>,
}

impl BlobStreamConfig {
    /// Resolve the runtime [`StreamConfig`] for sessions.
    pub fn to_stream_config(&self) -> StreamConfig {
        let backoff = if self.stream.enable_backoff {
            Some(
                self.backoff
                    .clone()
                    .unwrap_or_default()
                    .to_backoff_config(),
            )
        } else {
            None
        };
        StreamConfig {
            chunk_size: self.stream.chunk_size,
            part_size: self.stream.part_size,
            content_type: self.stream.content_type.clone(),
            backoff,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("blobstream")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BlobStreamConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BlobStreamConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path (tests, alternate profiles).
pub fn load_from(path: &Path) -> Result<BlobStreamConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: BlobStreamConfig = toml::from_str(&data)?;
    Ok(cfg)
}
