//! Persisted authentication token.

use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::Config;
use crate::error::Result;

const TOKEN_FILE: &str = "token";

/// Where the bearer token lives between runs.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str) -> Result<()>;
    fn clear(&self);
}

/// Token kept in a file next to the config, with `ADMIN_API_TOKEN` taking
/// precedence when set.
pub struct FileTokenStore {
    path: PathBuf,
    current: Mutex<Option<String>>,
}

impl FileTokenStore {
    pub fn load() -> Result<Self> {
        let path = Config::config_path()?.with_file_name(TOKEN_FILE);
        Ok(Self::at(path))
    }

    pub fn at(path: PathBuf) -> Self {
        let from_env = std::env::var("ADMIN_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        let current = from_env.or_else(|| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
        });

        Self {
            path,
            current: Mutex::new(current),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<String> {
        self.current.lock().ok().and_then(|t| t.clone())
    }

    fn set_token(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;
        if let Ok(mut current) = self.current.lock() {
            *current = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove token file");
            }
        }
    }
}

/// Token held only for the lifetime of the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    current: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[cfg(test)]
    pub fn with_token(token: &str) -> Self {
        Self {
            current: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.current.lock().ok().and_then(|t| t.clone())
    }

    fn set_token(&self, token: &str) -> Result<()> {
        if let Ok(mut current) = self.current.lock() {
            *current = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(TOKEN_FILE);
        let store = FileTokenStore {
            path: path.clone(),
            current: Mutex::new(None),
        };

        store.set_token("abc123").unwrap();
        assert_eq!(store.token().as_deref(), Some("abc123"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "abc123");

        store.clear();
        assert!(store.token().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_memory_store_clear() {
        let store = MemoryTokenStore::with_token("t");
        assert_eq!(store.token().as_deref(), Some("t"));
        store.clear();
        assert!(store.token().is_none());
    }
}
