//! Known parameter values for a session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::ContextError;

/// Key-value store of resolved parameter values. Last write wins.
pub trait ContextStore {
    fn get(&self, name: &str) -> Option<Value>;

    fn put(&mut self, name: &str, value: Value) -> Result<(), ContextError>;

    fn entries(&self) -> BTreeMap<String, Value>;

    fn clear(&mut self) -> Result<(), ContextError>;
}

/// In-memory store, lost when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryContext {
    values: BTreeMap<String, Value>,
}

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<(String, Value)> for MemoryContext {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl ContextStore for MemoryContext {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn put(&mut self, name: &str, value: Value) -> Result<(), ContextError> {
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    fn entries(&self) -> BTreeMap<String, Value> {
        self.values.clone()
    }

    fn clear(&mut self) -> Result<(), ContextError> {
        self.values.clear();
        Ok(())
    }
}

/// Store persisted as a pretty-printed JSON object, rewritten on every put.
#[derive(Debug, Clone)]
pub struct FileContext {
    path: PathBuf,
    values: BTreeMap<String, Value>,
}

impl FileContext {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ContextError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| ContextError::Malformed {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(ContextError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        debug!(path = %path.display(), entries = values.len(), "opened context");
        Ok(Self { path, values })
    }

    /// `~/.openapi-chain/context.json`, or a relative fallback without a home dir.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_default()
            .join(".openapi-chain")
            .join("context.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), ContextError> {
        let io_err = |source| ContextError::Io {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(&self.values).map_err(|source| {
            ContextError::Malformed {
                path: self.path.display().to_string(),
                source,
            }
        })?;
        std::fs::write(&self.path, text).map_err(io_err)
    }
}

impl ContextStore for FileContext {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn put(&mut self, name: &str, value: Value) -> Result<(), ContextError> {
        self.values.insert(name.to_string(), value);
        self.save()
    }

    fn entries(&self) -> BTreeMap<String, Value> {
        self.values.clone()
    }

    fn clear(&mut self) -> Result<(), ContextError> {
        self.values.clear();
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(ContextError::Io {
                path: self.path.display().to_string(),
                source: e,
            }),
            _ => Ok(()),
        }
    }
}
