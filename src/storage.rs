//! Tiered GeoJSON persistence with silent degradation.
//!
//! Two tiers mirror the browser stores the map consumers read from:
//!
//! - [`ObjectStore`] (tier 1): a directory of per-key JSON envelopes
//!   `{id, data, timestamp}` with the larger capacity.
//! - [`KeyValueStore`] (tier 2): a single-file string map; documents
//!   over the ~5MB limit are simplified before writing.
//!
//! Capacity problems and I/O failures are soft on both tiers: logged,
//! reported as `false`/`None`, never raised. Neither tier migrates data
//! to the other; [`TieredStore`] composes them for callers that want
//! the store-with-fallback behavior.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use geojson::FeatureCollection;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    cli::{FetchArgs, StoreArgs},
    geo, io_utils,
};

/// Practical ceiling for the key-value tier, matching the size class of
/// a browser local store.
pub const KV_SIZE_LIMIT_BYTES: usize = 5 * 1024 * 1024;

pub trait Storage {
    /// Persists a document under `key`. Returns `false` on any failure;
    /// never panics or raises.
    fn store(&self, key: &str, document: &FeatureCollection) -> bool;
    /// Reads a document back. `None` covers both "never stored" and
    /// "unreadable".
    fn retrieve(&self, key: &str) -> Option<FeatureCollection>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    id: &'a str,
    data: &'a FeatureCollection,
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct StoredEnvelope {
    #[allow(dead_code)]
    id: String,
    data: FeatureCollection,
    #[allow(dead_code)]
    timestamp: DateTime<Utc>,
}

/// Tier 1: one JSON envelope file per key under a root directory.
pub struct ObjectStore {
    root: PathBuf,
    capacity: Option<usize>,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            capacity: None,
        }
    }

    /// Capacity in serialized bytes, injectable so tests can simulate
    /// quota exhaustion.
    pub fn with_capacity(root: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            root: root.into(),
            capacity: Some(capacity),
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl Storage for ObjectStore {
    fn store(&self, key: &str, document: &FeatureCollection) -> bool {
        let envelope = EnvelopeRef {
            id: key,
            data: document,
            timestamp: Utc::now(),
        };
        let serialized = match serde_json::to_string(&envelope) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("Could not serialize document for '{key}': {err}");
                return false;
            }
        };
        if let Some(capacity) = self.capacity
            && serialized.len() > capacity
        {
            warn!(
                "Object store capacity exceeded for '{key}' ({} > {capacity} bytes)",
                serialized.len()
            );
            return false;
        }
        if let Err(err) = fs::create_dir_all(&self.root) {
            warn!("Could not create object store root {:?}: {err}", self.root);
            return false;
        }
        match fs::write(self.entry_path(key), serialized) {
            Ok(()) => {
                debug!("Stored '{key}' in the object store");
                true
            }
            Err(err) => {
                warn!("Could not write '{key}' to the object store: {err}");
                false
            }
        }
    }

    fn retrieve(&self, key: &str) -> Option<FeatureCollection> {
        let path = self.entry_path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("Could not read {path:?}: {err}");
                return None;
            }
        };
        match serde_json::from_str::<StoredEnvelope>(&raw) {
            Ok(envelope) => Some(envelope.data),
            Err(err) => {
                warn!("Corrupt envelope at {path:?}: {err}");
                None
            }
        }
    }
}

/// Tier 2: a single JSON file mapping keys to serialized documents.
pub struct KeyValueStore {
    path: PathBuf,
    limit: usize,
}

impl KeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            limit: KV_SIZE_LIMIT_BYTES,
        }
    }

    pub fn with_limit(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit,
        }
    }

    fn load_map(&self) -> BTreeMap<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!("Corrupt key-value store at {:?}: {err}", self.path);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        }
    }
}

impl Storage for KeyValueStore {
    fn store(&self, key: &str, document: &FeatureCollection) -> bool {
        let mut serialized = match serde_json::to_string(document) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("Could not serialize document for '{key}': {err}");
                return false;
            }
        };
        if serialized.len() > self.limit {
            debug!(
                "'{key}' is {} bytes, over the {} byte limit; storing a simplified copy",
                serialized.len(),
                self.limit
            );
            let simplified = geo::simplify(document);
            serialized = match serde_json::to_string(&simplified) {
                Ok(serialized) => serialized,
                Err(err) => {
                    warn!("Could not serialize simplified document for '{key}': {err}");
                    return false;
                }
            };
            if serialized.len() > self.limit {
                warn!("'{key}' still exceeds the key-value store limit after simplification");
                return false;
            }
        }
        let mut map = self.load_map();
        map.insert(key.to_string(), serialized);
        let payload = match serde_json::to_string(&map) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("Could not serialize key-value store: {err}");
                return false;
            }
        };
        if let Some(parent) = self.path.parent()
            && let Err(err) = fs::create_dir_all(parent)
        {
            warn!("Could not create key-value store directory {parent:?}: {err}");
            return false;
        }
        match fs::write(&self.path, payload) {
            Ok(()) => {
                debug!("Stored '{key}' in the key-value store");
                true
            }
            Err(err) => {
                warn!("Could not write the key-value store: {err}");
                false
            }
        }
    }

    fn retrieve(&self, key: &str) -> Option<FeatureCollection> {
        let map = self.load_map();
        let raw = map.get(key)?;
        match serde_json::from_str(raw) {
            Ok(document) => Some(document),
            Err(err) => {
                warn!("Corrupt document under '{key}': {err}");
                None
            }
        }
    }
}

/// Store-with-fallback composition: writes try tier 1 then tier 2,
/// reads check tier 1 then tier 2. The tiers themselves stay ignorant
/// of each other.
pub struct TieredStore {
    primary: ObjectStore,
    fallback: KeyValueStore,
}

impl TieredStore {
    pub fn new(primary: ObjectStore, fallback: KeyValueStore) -> Self {
        Self { primary, fallback }
    }

    /// Conventional layout under a root directory: `objects/` for tier 1
    /// and `kv.json` for tier 2.
    pub fn open(root: &Path) -> Self {
        Self {
            primary: ObjectStore::new(root.join("objects")),
            fallback: KeyValueStore::new(root.join("kv.json")),
        }
    }
}

impl Storage for TieredStore {
    fn store(&self, key: &str, document: &FeatureCollection) -> bool {
        if self.primary.store(key, document) {
            return true;
        }
        debug!("Falling back to the key-value tier for '{key}'");
        self.fallback.store(key, document)
    }

    fn retrieve(&self, key: &str) -> Option<FeatureCollection> {
        self.primary
            .retrieve(key)
            .or_else(|| self.fallback.retrieve(key))
    }
}

pub fn execute_store(args: &StoreArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let raw = io_utils::read_input(&args.input, encoding)?;
    let collection = geo::parse_feature_collection(&raw)
        .with_context(|| format!("Parsing GeoJSON from {:?}", args.input))?;
    let store = TieredStore::open(&args.root);
    if store.store(&args.key, &collection) {
        log::info!("Stored '{}' under {:?}", args.key, args.root);
    } else {
        warn!("Document '{}' could not be stored in either tier", args.key);
    }
    Ok(())
}

pub fn execute_fetch(args: &FetchArgs) -> Result<()> {
    let store = TieredStore::open(&args.root);
    let collection = store
        .retrieve(&args.key)
        .ok_or_else(|| anyhow!("No stored document for key '{}'", args.key))?;
    io_utils::write_json(args.output.as_deref(), &collection, args.pretty)?;
    log::info!("Fetched '{}' from {:?}", args.key, args.root);
    Ok(())
}
