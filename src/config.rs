//! Purpose: Persisted client preferences (base URL, page size, probe budget, log capacity).
//! Exports: `BoardConfig`, `default_config_path`, `BASE_URL_ENV`, default constants.
//! Role: Read once at CLI startup; `config set-url` is the only writer.
//! Invariants: A missing file means defaults; a malformed file is an `Io` error, never ignored.
//! Invariants: Precedence is file < `BOARD_BASE_URL` < explicit override.
#![allow(clippy::result_large_err)]

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::{DEFAULT_ACTIVITY_CAPACITY, DEFAULT_MAX_PROBES, Error, ErrorKind};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const BASE_URL_ENV: &str = "BOARD_BASE_URL";

pub fn default_config_path() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".board").join("config.json")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoardConfig {
    pub base_url: String,
    pub page_size: u32,
    pub max_probes: u32,
    pub activity_capacity: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_probes: DEFAULT_MAX_PROBES,
            activity_capacity: DEFAULT_ACTIVITY_CAPACITY,
        }
    }
}

impl BoardConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message(format!("failed to read config {}", path.display()))
                    .with_source(err));
            }
        };
        serde_json::from_str(&text).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("invalid config {}", path.display()))
                .with_hint("Fix or delete the file to fall back to defaults.")
                .with_source(err)
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message(format!("failed to create {}", parent.display()))
                    .with_source(err)
            })?;
        }
        let mut text = serde_json::to_string_pretty(self).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode config")
                .with_source(err)
        })?;
        text.push('\n');
        fs::write(path, text).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to write config {}", path.display()))
                .with_source(err)
        })
    }

    /// Applies the environment and an explicit override, in that order.
    pub fn resolve(mut self, env_base_url: Option<String>, flag_base_url: Option<String>) -> Self {
        if let Some(url) = flag_base_url.or(env_base_url) {
            let url = url.trim();
            if !url.is_empty() {
                self.base_url = url.to_string();
            }
        }
        self
    }

    /// Validates and stores a new preferred base URL.
    pub fn set_base_url(&mut self, raw: &str) -> Result<(), Error> {
        let url = crate::api::RequestGateway::validate_base_url(raw)?;
        self.base_url = url.as_str().trim_end_matches('/').to_string();
        Ok(())
    }
}
