//! Key-value persistence substrate for the note collection.
//!
//! The engine persists everything under two fixed keys; the substrate is a
//! minimal durable string map so the store never cares where the bytes live.

use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
    sync::{Arc, Mutex},
};

use log::{debug, error, trace};
use tempfile::NamedTempFile;

use crate::{NotesError, Result};

/// Key holding the serialized note collection (JSON array).
pub const NOTES_KEY: &str = "notes";

/// Key holding the global reminder (stringified epoch ms); absent when unset.
pub const GLOBAL_REMINDER_KEY: &str = "globalReminder";

/// Local durable string storage.
///
/// `get` returns `None` both for missing keys and for unreadable values; the
/// store treats either as "nothing persisted". Writes are assumed fast and
/// synchronous and are never retried.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// File-backed store: one file per key inside a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens the store, creating the data directory if needed.
    pub fn open(dir: PathBuf) -> Result<Self> {
        if !dir.exists() {
            debug!("Data directory does not exist, creating: {}", dir.display());
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.key_path(key);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Writes atomically: the value lands in a temporary file in the same
    /// directory and is renamed over the target, so a crash mid-write never
    /// leaves a half-written collection behind.
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key);
        let mut temp_file = NamedTempFile::new_in(&self.dir)?;
        temp_file.write_all(value.as_bytes())?;
        temp_file.flush()?;
        temp_file
            .persist(&path)
            .map_err(|e| NotesError::Io(e.error))?;
        trace!("Wrote key {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
            trace!("Removed key {}", key);
        }
        Ok(())
    }
}

/// In-memory store backed by a shared map.
///
/// Clones share the same cells, so a test can hand one clone to the note
/// store and inspect writes through another. `write_count` counts `set`
/// calls, which is what the debounce-coalescing property observes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    cells: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls observed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.cells.lock().ok()?.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if let Ok(mut cells) = self.cells.lock() {
            cells.insert(key.to_string(), value.to_string());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if let Ok(mut cells) = self.cells.lock() {
            cells.remove(key);
        }
        Ok(())
    }
}
