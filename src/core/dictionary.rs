// File: src/core/dictionary.rs
use crate::core::system::System;
use crate::core::types::{StenoKey, Translation};
use crate::error::{DictionaryError, Result};
use crate::format::DictionaryFormat;
use crate::fuzzy::reverse::ReverseIndex;
use crate::persistence::{self, ResourceResolver, SaveMode, Saver, SharedTimestamp};
use std::collections::hash_map::{self, HashMap};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError};
use std::time::SystemTime;

/// A steno dictionary: stroke sequences mapped to translations.
///
/// Keeps a reverse index of translations back to their keys, always the exact
/// inverse of the forward mapping, and searchable by similarity. Mutation goes
/// through `set`/`delete`/`update` only, so the two never drift apart.
///
/// File attributes:
/// - `path`: resource the contents are stored in.
/// - `timestamp`: last modification time of that file, to detect outside edits.
/// - `readonly`: the dictionary may not be changed nor written back.
/// - `enabled`: whether a `DictionaryCollection` consults it.
#[derive(Debug)]
pub struct StenoDictionary {
    entries: HashMap<StenoKey, Translation>,
    reverse: ReverseIndex,
    path: Option<String>,
    timestamp: SharedTimestamp,
    readonly: bool,
    enabled: bool,
    format: Option<Arc<dyn DictionaryFormat>>,
    saver: Saver,
}

impl Default for StenoDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl StenoDictionary {
    /// An in-memory dictionary with no file behind it.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            reverse: ReverseIndex::new(),
            path: None,
            timestamp: SharedTimestamp::default(),
            readonly: false,
            enabled: true,
            format: None,
            saver: Saver::new(SaveMode::Immediate),
        }
    }

    /// A new, empty dictionary bound to `resource`. Nothing is written yet.
    pub fn create(resource: &str, format: Arc<dyn DictionaryFormat>) -> Result<Self> {
        if persistence::is_asset(resource) {
            return Err(DictionaryError::AssetNotWritable(resource.to_string()));
        }
        if !format.supports_creation() {
            return Err(DictionaryError::CreationUnsupported(format.name().to_string()));
        }
        tracing::debug!(resource, format = format.name(), "creating dictionary");
        let mut dictionary = Self::new();
        dictionary.path = Some(resource.to_string());
        dictionary.format = Some(format);
        Ok(dictionary)
    }

    /// Reads `resource` through `format`. Packaged assets and files without
    /// write permission come back read-only.
    pub fn load(
        resource: &str,
        format: Arc<dyn DictionaryFormat>,
        resolver: &ResourceResolver,
        system: &System,
    ) -> Result<Self> {
        let filename = resolver.filename(resource);
        let timestamp = persistence::resource_timestamp(&filename)?;
        let bytes = fs::read(&filename).map_err(|e| DictionaryError::io(&filename, e))?;
        let entries = format.decode(&bytes, system)?;

        let mut dictionary = Self::new();
        dictionary.update(entries)?;
        dictionary.readonly = persistence::is_asset(resource) || !persistence::is_writable(&filename);
        dictionary.path = Some(resource.to_string());
        dictionary.format = Some(format);
        *dictionary.timestamp.lock().unwrap_or_else(PoisonError::into_inner) = Some(timestamp);

        tracing::debug!(
            resource,
            entries = dictionary.len(),
            readonly = dictionary.readonly,
            "dictionary loaded"
        );
        Ok(dictionary)
    }

    pub fn with_save_mode(mut self, mode: SaveMode) -> Self {
        self.saver = Saver::new(mode);
        self
    }

    /// Saves through `saver`. Dictionaries given clones of one saver take
    /// turns writing.
    pub fn with_saver(mut self, saver: Saver) -> Self {
        self.saver = saver;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = Some(path.into());
    }

    pub fn timestamp(&self) -> Option<SystemTime> {
        *self.timestamp.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn readonly(&self) -> bool {
        self.readonly
    }

    pub fn set_readonly(&mut self, readonly: bool) {
        self.readonly = readonly;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn format(&self) -> Option<&dyn DictionaryFormat> {
        self.format.as_deref()
    }

    pub fn save_mode(&self) -> SaveMode {
        self.saver.mode()
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(DictionaryError::ReadOnly(self.to_string()));
        }
        Ok(())
    }

    /// Writes the dictionary back to its file through its format, using a
    /// temp file and an atomic rename, then refreshes the timestamp.
    ///
    /// Encoding happens here; the write itself follows the save mode, so a
    /// background save returns before the file is on disk.
    pub fn save(&self) -> Result<()> {
        self.ensure_writable()?;
        let (Some(path), Some(format)) = (self.path.as_deref(), self.format.as_ref()) else {
            return Err(DictionaryError::NoFormat(self.to_string()));
        };
        if persistence::is_asset(path) {
            return Err(DictionaryError::AssetNotWritable(path.to_string()));
        }
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort();
        let bytes = format.encode(&entries)?;
        self.saver.run(PathBuf::from(path), bytes, Arc::clone(&self.timestamp))
    }

    /// Waits for background saves of this dictionary to finish.
    pub fn wait_for_save(&self) {
        self.saver.wait();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &StenoKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &StenoKey) -> Option<&Translation> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, StenoKey, Translation> {
        self.entries.iter()
    }

    pub fn keys(&self) -> hash_map::Keys<'_, StenoKey, Translation> {
        self.entries.keys()
    }

    /// Number of strokes in the longest key, computed on demand.
    pub fn longest_key(&self) -> usize {
        self.entries.keys().map(StenoKey::len).max().unwrap_or(0)
    }

    pub fn set(&mut self, key: StenoKey, value: Translation) -> Result<()> {
        self.ensure_writable()?;
        // The old value is the only way to find the stale reverse entry, so it
        // has to go before the forward entry is overwritten.
        if let Some(old) = self.entries.get(&key) {
            self.reverse.remove_key(old, &key);
        }
        self.entries.insert(key.clone(), value.clone());
        self.reverse.append_key(value, key);
        Ok(())
    }

    pub fn delete(&mut self, key: &StenoKey) -> Result<Translation> {
        self.ensure_writable()?;
        let value = self
            .entries
            .remove(key)
            .ok_or_else(|| DictionaryError::KeyNotFound(key.to_string()))?;
        self.reverse.remove_key(&value, key);
        Ok(value)
    }

    /// Sets many entries at once; later pairs win over earlier ones. An empty
    /// dictionary is filled in one pass with the reverse index rebuilt whole.
    pub fn update<I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (StenoKey, Translation)>,
    {
        self.ensure_writable()?;
        if self.entries.is_empty() {
            self.entries.extend(pairs);
            self.reverse.match_forward(self.entries.iter());
        } else {
            for (key, value) in pairs {
                self.set(key, value)?;
            }
        }
        Ok(())
    }

    /// Empties the dictionary, keeping its file attributes.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_writable()?;
        self.entries.clear();
        self.reverse.clear();
        Ok(())
    }

    /// Keys that produce exactly `value`; empty if there are none.
    pub fn reverse_lookup(&self, value: &str) -> Vec<StenoKey> {
        self.reverse.get(value).map(<[StenoKey]>::to_vec).unwrap_or_default()
    }

    pub fn similar_reverse_lookup(&self, value: &str, count: Option<usize>) -> Vec<Translation> {
        self.reverse.get_similar_keys(value, count)
    }

    pub fn partial_reverse_lookup(&self, value: &str, count: Option<usize>) -> Vec<Translation> {
        self.reverse.partial_match_keys(value, count)
    }

    pub fn regex_reverse_lookup(&self, pattern: &str, count: Option<usize>) -> Result<Vec<Translation>> {
        self.reverse.regex_match_keys(pattern, count)
    }

    /// Translations equal to `value` ignoring case.
    pub fn casereverse_lookup(&self, value: &str) -> Vec<Translation> {
        let folded = value.to_lowercase();
        self.similar_reverse_lookup(value, None)
            .into_iter()
            .filter(|v| v.to_lowercase() == folded)
            .collect()
    }
}

impl fmt::Display for StenoDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "StenoDictionary({path:?})"),
            None => f.write_str("StenoDictionary(None)"),
        }
    }
}
