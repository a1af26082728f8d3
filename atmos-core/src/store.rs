//! Saved places and the key-value persistence port behind them.
//!
//! The store owns the ordered list of [`SavedPlace`]s. Every mutation is
//! followed by a write of the whole list to a single storage slot, and
//! storage failures are logged rather than returned so the caller keeps
//! working with the in-memory list.

use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fmt::Debug,
    fs,
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
};
use tokio::sync::watch;

use crate::{
    error::StorageError,
    model::{Coordinate, PlaceId, SavedPlace, WeatherCategory},
};

/// Storage slot holding the serialized saved-place list.
pub const SAVED_PLACES_KEY: &str = "saved_places";

/// A keyed slot of opaque bytes.
pub trait KeyValueStorage: Send + Sync + Debug {
    /// `Ok(None)` when nothing has been written under `key` yet.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;
}

/// One `<key>.json` file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;

        // Write-then-rename so a crash never leaves a truncated file behind.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;

        Ok(())
    }
}

/// In-process storage. Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.slots.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.slots.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Deduplicated, persisted list of saved places.
#[derive(Debug)]
pub struct SavedPlacesStore {
    storage: Arc<dyn KeyValueStorage>,
    places: watch::Sender<Vec<SavedPlace>>,
    /// Set while the last load could not read storage at all. Writes are
    /// held back so an empty in-memory list never replaces the real one.
    memory_only: bool,
}

impl SavedPlacesStore {
    /// Create a store over `storage` and load whatever it currently holds.
    pub fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        let (places, _) = watch::channel(Vec::new());
        let mut store = Self {
            storage,
            places,
            memory_only: false,
        };
        store.load();
        store
    }

    /// Re-read the list from storage, replacing the in-memory copy.
    ///
    /// Unreadable or undecodable data yields an empty list. When storage
    /// itself could not be read, the store stays in memory until a later
    /// load succeeds; undecodable data is overwritten by the next mutation.
    pub fn load(&mut self) -> Vec<SavedPlace> {
        let loaded = match self.read_places() {
            Ok(places) => {
                self.memory_only = false;
                places
            }
            Err(StorageError::Io(e)) => {
                tracing::warn!("Could not read saved places, keeping changes in memory: {}", e);
                self.memory_only = true;
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Failed to load saved places, starting empty: {}", e);
                self.memory_only = false;
                Vec::new()
            }
        };

        tracing::debug!("Loaded {} saved place(s)", loaded.len());
        self.places.send_replace(loaded.clone());
        loaded
    }

    fn read_places(&self) -> Result<Vec<SavedPlace>, StorageError> {
        match self.storage.read(SAVED_PLACES_KEY)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// Current list, in insertion order.
    pub fn places(&self) -> Vec<SavedPlace> {
        self.places.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.places.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.borrow().is_empty()
    }

    /// Whether mutations are currently kept out of storage.
    pub fn is_memory_only(&self) -> bool {
        self.memory_only
    }

    pub fn get(&self, id: PlaceId) -> Option<SavedPlace> {
        self.places.borrow().iter().find(|p| p.id == id).cloned()
    }

    /// Observe the list; receivers see every committed mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<SavedPlace>> {
        self.places.subscribe()
    }

    /// Insert a new place unless one with the same name (ignoring case)
    /// already exists. Returns whether anything was inserted.
    pub fn add(&mut self, name: &str, coordinate: Coordinate) -> bool {
        self.add_with_condition(name, coordinate, None)
    }

    pub fn add_with_condition(
        &mut self,
        name: &str,
        coordinate: Coordinate,
        condition: Option<WeatherCategory>,
    ) -> bool {
        let name = name.trim();
        if name.is_empty() {
            tracing::debug!("Ignoring saved place with empty name");
            return false;
        }

        let inserted = self.places.send_if_modified(|places| {
            if places.iter().any(|p| p.has_name(name)) {
                return false;
            }

            let mut place = SavedPlace::new(name, coordinate);
            place.last_known_condition = condition;
            places.push(place);
            true
        });

        if inserted {
            tracing::info!("Saved place '{}' at {}", name, coordinate);
            self.persist();
        } else {
            tracing::debug!("Place '{}' already saved", name);
        }

        inserted
    }

    /// Remove the place with `id`; a missing id leaves the list untouched.
    pub fn remove(&mut self, id: PlaceId) -> bool {
        let removed = self.places.send_if_modified(|places| {
            let before = places.len();
            places.retain(|p| p.id != id);
            places.len() != before
        });

        if removed {
            tracing::info!("Removed saved place {}", id);
            self.persist();
        }

        removed
    }

    /// Swap in a new version of an existing place, matched by id.
    pub fn replace(&mut self, place: SavedPlace) -> bool {
        let replaced = self.places.send_if_modified(|places| {
            match places.iter_mut().find(|p| p.id == place.id) {
                Some(slot) if *slot != place => {
                    *slot = place;
                    true
                }
                _ => false,
            }
        });

        if replaced {
            self.persist();
        }

        replaced
    }

    /// Write the current list to storage. Failures are logged and dropped.
    pub fn persist(&self) {
        if self.memory_only {
            tracing::debug!("Saved places were not readable, skipping write");
            return;
        }

        if let Err(e) = self.try_persist() {
            tracing::warn!("Failed to persist saved places: {}", e);
        }
    }

    fn try_persist(&self) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(&*self.places.borrow())?;
        self.storage.write(SAVED_PLACES_KEY, &bytes)
    }
}
