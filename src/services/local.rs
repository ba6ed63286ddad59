//! File-backed local key-value store
//!
//! All entries live in one JSON object on disk. Every operation re-reads
//! the file so that other processes' writes are visible; writes replace the
//! whole file through a temp-file rename.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

use super::KeyValueStore;
use crate::config::Config;

const STORE_FILE: &str = "local_storage.json";

pub struct LocalStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl LocalStore {
    /// Open the store in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(&Config::data_dir()?)
    }

    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).context("Failed to create data directory")?;
        Ok(Self {
            path: dir.join(STORE_FILE),
            lock: Mutex::new(()),
        })
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path).context("Failed to read local storage")?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).context("Failed to parse local storage")
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string(entries).context("Failed to serialize local storage")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).context("Failed to write local storage")?;
        fs::rename(&tmp, &self.path).context("Failed to replace local storage")?;
        Ok(())
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}
