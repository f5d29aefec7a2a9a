use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{AdminError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:3025";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const SCHEMA_FILE: &str = "user.proto";

/// Schema installed beside `config.toml` when no `schema_path` is set.
pub const BUNDLED_SCHEMA: &str = include_str!("../proto/user.proto");

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct Config {
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub page_size: Option<u32>,
    pub schema_path: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).map_err(|e| AdminError::ConfigRead {
                path: config_path.clone(),
                source: e,
            })?;

        Self::parse(&contents).map_err(|e| AdminError::ConfigParse {
            path: config_path,
            source: e,
        })
    }

    fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "admin-panel")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(AdminError::NoConfigDir)
    }

    /// Base URL with env var taking precedence over config file
    pub fn api_url(&self) -> String {
        if let Ok(url) = std::env::var("ADMIN_API_URL") {
            if !url.trim().is_empty() {
                return url;
            }
        }

        self.api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.filter(|n| *n > 0).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Configured schema, or `user.proto` in the config directory.
    pub fn schema_path(&self) -> Result<PathBuf> {
        match &self.schema_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_path()?.with_file_name(SCHEMA_FILE)),
        }
    }

    /// Resolve the schema path, installing the bundled schema at the default
    /// location if nothing is there yet. A configured path is left alone.
    pub fn ensure_schema(&self) -> Result<PathBuf> {
        let path = self.schema_path()?;
        if self.schema_path.is_none() && write_schema_if_missing(&path)? {
            tracing::info!(path = %path.display(), "installed bundled schema");
        }
        Ok(path)
    }

    /// Export directory, preferring explicit argument over config
    pub fn resolve_export_dir(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| self.export_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn write_schema_if_missing(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    let save_err = |source| AdminError::Save {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(save_err)?;
    }
    std::fs::write(path, BUNDLED_SCHEMA).map_err(save_err)?;
    Ok(true)
}
