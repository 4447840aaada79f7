//! Link configuration: address plus retry policy, loaded from JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use wirelink_core::RetryPolicy;

/// Configuration consumed by both roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub host: String,
    pub port: u16,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8765,
            max_retries: 5,
            retry_delay_ms: 2000,
        }
    }
}

impl LinkConfig {
    /// Connection URI for the dialer.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }

    /// Retry policy derived from this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }

    /// Load configuration from a JSON file, self-healing on failure.
    ///
    /// A missing or invalid file is backed up (as `<stem>_bak.<ext>`),
    /// rewritten with pretty-printed defaults, and the defaults are
    /// returned. Never fails.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path)
            .map_err(|err| err.to_string())
            .and_then(|text| serde_json::from_str(&text).map_err(|err| err.to_string()))
        {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), %err, "invalid configuration file, recreating defaults");
                back_up(path);

                let defaults = Self::default();
                match serde_json::to_string_pretty(&defaults) {
                    Ok(text) => {
                        if let Err(err) = std::fs::write(path, text) {
                            warn!(path = %path.display(), %err, "could not write default configuration");
                        }
                    }
                    Err(err) => warn!(%err, "could not serialize default configuration"),
                }
                defaults
            }
        }
    }
}

/// Rename a broken config aside instead of destroying it.
fn back_up(path: &Path) {
    if !path.exists() {
        return;
    }

    let stem = path.file_stem().map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    let backup_name = match path.extension() {
        Some(ext) => format!("{stem}_bak.{}", ext.to_string_lossy()),
        None => format!("{stem}_bak"),
    };
    let backup = path.with_file_name(backup_name);

    warn!(backup = %backup.display(), "backing up old configuration file");
    if let Err(err) = std::fs::rename(path, &backup) {
        warn!(%err, "backup failed");
    }
}
