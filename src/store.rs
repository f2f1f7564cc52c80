//! Persisted map of saved destinations: identifier → contact text.
//!
//! The whole map is stored as one JSON object, e.g.
//!
//! ```json
//! { "https://facebook.com/acme": "Call us: 555-0100" }
//! ```
//!
//! It is loaded once when the store is opened and rewritten wholesale after
//! every merge. Read and write failures are logged and otherwise ignored: a
//! broken store must never stop a post from being generated.

use crate::error::StoreError;
use crate::posts::Destination;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Where the serialised map lives.
pub trait StoreBackend: Send + Sync {
    /// Raw contents, or `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replace the stored contents.
    fn save(&self, contents: &str) -> Result<(), StoreError>;
}

/// JSON file on disk, replaced atomically via a temp file and rename.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StoreBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn save(&self, contents: &str) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.io_err(e))?;

        // Temp file in the target directory keeps the rename on one filesystem.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_err(e))?;
        tmp.write_all(contents.as_bytes())
            .map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;
        Ok(())
    }
}

/// In-memory backend, for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    contents: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from pre-existing raw contents.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
        }
    }

    /// Raw contents as last saved.
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl StoreBackend for MemoryBackend {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.contents())
    }

    fn save(&self, contents: &str) -> Result<(), StoreError> {
        *self.contents.lock().unwrap_or_else(|e| e.into_inner()) = Some(contents.to_string());
        Ok(())
    }
}

/// Saved destinations, last write wins per identifier, no eviction.
pub struct DestinationStore {
    backend: Box<dyn StoreBackend>,
    entries: Mutex<BTreeMap<String, String>>,
}

impl std::fmt::Debug for DestinationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationStore")
            .field("entries", &self.lock().len())
            .finish()
    }
}

impl DestinationStore {
    /// Load the store from `backend`.
    ///
    /// Missing data opens an empty store; unreadable or corrupt data opens an
    /// empty store and logs a warning.
    pub fn open(backend: Box<dyn StoreBackend>) -> Self {
        let entries = match backend.load() {
            Ok(Some(raw)) => match parse(&raw) {
                Ok(map) => {
                    debug!("Loaded {} saved destinations", map.len());
                    map
                }
                Err(e) => {
                    warn!("Ignoring corrupt destination store: {}", e);
                    BTreeMap::new()
                }
            },
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!("Could not read destination store: {}", e);
                BTreeMap::new()
            }
        };
        Self {
            backend,
            entries: Mutex::new(entries),
        }
    }

    /// Open a JSON file store at `path`.
    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        Self::open(Box::new(JsonFileBackend::new(path)))
    }

    /// Open an empty in-memory store.
    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryBackend::new()))
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// All saved destinations, ordered by identifier.
    pub fn entries(&self) -> Vec<Destination> {
        self.lock()
            .iter()
            .map(|(k, v)| Destination::new(k.clone(), v.clone()))
            .collect()
    }

    /// Saved contact text for `identifier` (compared after trimming).
    pub fn get(&self, identifier: &str) -> Option<String> {
        self.lock().get(identifier.trim()).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Merge the persistable subset of `destinations` and save the result.
    ///
    /// Returns how many destinations were merged. The merged map is built
    /// and saved while holding the lock, then swapped in as a whole.
    pub fn merge(&self, destinations: &[Destination]) -> usize {
        let valid: Vec<_> = destinations.iter().filter(|d| d.is_persistable()).collect();
        if valid.is_empty() {
            return 0;
        }

        let mut guard = self.lock();
        let mut next = guard.clone();
        for d in &valid {
            next.insert(d.identifier.trim().to_string(), d.contact_text.clone());
        }

        match serde_json::to_string_pretty(&next)
            .map_err(StoreError::from)
            .and_then(|raw| self.backend.save(&raw))
        {
            Ok(()) => info!("Saved {} destinations ({} total)", valid.len(), next.len()),
            Err(e) => warn!("Could not save destination store: {}", e),
        }

        *guard = next;
        valid.len()
    }
}

impl DestinationStore {
    /// [`merge`](Self::merge) on the blocking thread pool, for async callers.
    ///
    /// Saving rewrites the whole backing file, so it is kept off the async
    /// worker threads. A panicked merge is logged and counts as zero merged.
    pub async fn merge_in_background(self: &Arc<Self>, destinations: &[Destination]) -> usize {
        let store = Arc::clone(self);
        let destinations = destinations.to_vec();
        match tokio::task::spawn_blocking(move || store.merge(&destinations)).await {
            Ok(merged) => merged,
            Err(e) => {
                warn!("Destination store merge task failed: {}", e);
                0
            }
        }
    }
}

fn parse(raw: &str) -> Result<BTreeMap<String, String>, StoreError> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(raw)?)
}
