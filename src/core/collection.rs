// File: src/core/collection.rs
use crate::core::dictionary::StenoDictionary;
use crate::core::types::{StenoKey, Translation};
use crate::error::{DictionaryError, Result};
use std::collections::HashSet;
use std::fmt;

/// Predicate over a matched entry; returning true hides the key from `lookup`.
pub type LookupFilter = Box<dyn Fn(&StenoKey, &Translation) -> bool + Send + Sync>;

/// Handle for removing a filter added with `add_filter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(u64);

/// A translation paired with every key that still produces it.
pub type SearchResult = (Translation, HashSet<StenoKey>);

/// Dictionaries in priority order: index 0 is consulted first and overrides
/// every dictionary after it.
#[derive(Default)]
pub struct DictionaryCollection {
    dicts: Vec<StenoDictionary>,
    filters: Vec<(FilterId, LookupFilter)>,
    next_filter: u64,
}

impl DictionaryCollection {
    pub fn new(dicts: Vec<StenoDictionary>) -> Self {
        Self { dicts, ..Self::default() }
    }

    pub fn dicts(&self) -> &[StenoDictionary] {
        &self.dicts
    }

    /// Replaces the whole list, returning the previous one. Reordering is
    /// done by handing back a rearranged list.
    pub fn set_dicts(&mut self, dicts: Vec<StenoDictionary>) -> Vec<StenoDictionary> {
        std::mem::replace(&mut self.dicts, dicts)
    }

    fn enabled(&self) -> impl DoubleEndedIterator<Item = &StenoDictionary> {
        self.dicts.iter().filter(|d| d.enabled())
    }

    /// Looks `key` up in each enabled dictionary in priority order.
    ///
    /// The first dictionary holding the key decides: if any filter catches
    /// that entry the key is reported missing, without falling through to
    /// lower-priority dictionaries.
    pub fn lookup(&self, key: &StenoKey) -> Option<&Translation> {
        let value = self.enabled().find_map(|d| d.get(key))?;
        if self.filters.iter().any(|(_, filter)| filter(key, value)) {
            return None;
        }
        Some(value)
    }

    /// Like `lookup`, without filters.
    pub fn raw_lookup(&self, key: &StenoKey) -> Option<&Translation> {
        self.enabled().find_map(|d| d.get(key))
    }

    /// Keys that produce exactly `value` under the current precedence.
    pub fn reverse_lookup(&self, value: &str) -> HashSet<StenoKey> {
        let mut keys = HashSet::new();
        // Lowest priority first; each dictionary overrides whatever keys the
        // ones below it contributed.
        for d in self.enabled().rev() {
            if !keys.is_empty() {
                keys.retain(|k| !d.contains_key(k));
            }
            keys.extend(d.reverse_lookup(value));
        }
        keys
    }

    /// Sorts candidate translations case-insensitively, drops duplicates and
    /// pairs each with its keys, skipping translations no key can produce
    /// anymore. Stops after `max_count` results.
    fn multi_reverse_lookup(
        &self,
        mut values: Vec<Translation>,
        max_count: Option<usize>,
    ) -> Vec<SearchResult> {
        values.sort_by_cached_key(|v| (v.to_lowercase(), v.clone()));
        values.dedup();
        let mut results = Vec::new();
        if max_count == Some(0) {
            return results;
        }
        for value in values {
            let keys = self.reverse_lookup(&value);
            if keys.is_empty() {
                continue;
            }
            results.push((value, keys));
            if max_count.is_some_and(|max| results.len() >= max) {
                break;
            }
        }
        results
    }

    /// Translations similar to `value` across enabled dictionaries.
    pub fn find_similar(&self, value: &str) -> Vec<SearchResult> {
        let candidates = self
            .enabled()
            .flat_map(|d| d.similar_reverse_lookup(value, None))
            .collect();
        self.multi_reverse_lookup(candidates, None)
    }

    /// Translations similar to `pattern`, followed by the ones extending it.
    pub fn find_partial(&self, pattern: &str, count: Option<usize>) -> Vec<SearchResult> {
        let candidates = self
            .enabled()
            .flat_map(|d| d.partial_reverse_lookup(pattern, count))
            .collect();
        self.multi_reverse_lookup(candidates, count)
    }

    /// Translations matching the regular expression `pattern` from the start.
    pub fn find_regex(&self, pattern: &str, count: Option<usize>) -> Result<Vec<SearchResult>> {
        let mut candidates = Vec::new();
        for d in self.enabled() {
            candidates.extend(d.regex_reverse_lookup(pattern, count)?);
        }
        Ok(self.multi_reverse_lookup(candidates, count))
    }

    /// Translations equal to `value` ignoring case, without their keys.
    pub fn casereverse_lookup(&self, value: &str) -> Vec<Translation> {
        let folded = value.to_lowercase();
        self.find_similar(value)
            .into_iter()
            .map(|(v, _)| v)
            .filter(|v| v.to_lowercase() == folded)
            .collect()
    }

    pub fn first_writable(&self) -> Result<&StenoDictionary> {
        self.dicts
            .iter()
            .find(|d| !d.readonly())
            .ok_or(DictionaryError::NoWritableDictionary)
    }

    pub fn first_writable_mut(&mut self) -> Result<&mut StenoDictionary> {
        self.dicts
            .iter_mut()
            .find(|d| !d.readonly())
            .ok_or(DictionaryError::NoWritableDictionary)
    }

    /// Writes an entry into the dictionary at `path`, or into the first
    /// writable one.
    pub fn set(&mut self, key: StenoKey, value: Translation, path: Option<&str>) -> Result<()> {
        let target = match path {
            Some(path) => self.dictionary_mut(path)?,
            None => self.first_writable_mut()?,
        };
        target.set(key, value)
    }

    /// Saves the dictionaries at `paths`, or every writable one, in order.
    pub fn save(&self, paths: Option<&[&str]>) -> Result<()> {
        let targets: Vec<&StenoDictionary> = match paths {
            Some(paths) => paths
                .iter()
                .map(|path| self.dictionary(path))
                .collect::<Result<_>>()?,
            None => self.dicts.iter().filter(|d| !d.readonly()).collect(),
        };
        for d in targets {
            d.save()?;
        }
        Ok(())
    }

    /// Waits for every member's background saves.
    pub fn wait_for_saves(&self) {
        for d in &self.dicts {
            d.wait_for_save();
        }
    }

    pub fn get(&self, path: &str) -> Option<&StenoDictionary> {
        self.dicts.iter().find(|d| d.path() == Some(path))
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut StenoDictionary> {
        self.dicts.iter_mut().find(|d| d.path() == Some(path))
    }

    pub fn dictionary(&self, path: &str) -> Result<&StenoDictionary> {
        self.get(path)
            .ok_or_else(|| DictionaryError::DictionaryNotFound(path.to_string()))
    }

    pub fn dictionary_mut(&mut self, path: &str) -> Result<&mut StenoDictionary> {
        self.get_mut(path)
            .ok_or_else(|| DictionaryError::DictionaryNotFound(path.to_string()))
    }

    /// Member paths in priority order.
    pub fn paths(&self) -> impl Iterator<Item = Option<&str>> {
        self.dicts.iter().map(StenoDictionary::path)
    }

    pub fn add_filter<F>(&mut self, filter: F) -> FilterId
    where
        F: Fn(&StenoKey, &Translation) -> bool + Send + Sync + 'static,
    {
        let id = FilterId(self.next_filter);
        self.next_filter += 1;
        self.filters.push((id, Box::new(filter)));
        id
    }

    pub fn remove_filter(&mut self, id: FilterId) -> bool {
        let before = self.filters.len();
        self.filters.retain(|(filter_id, _)| *filter_id != id);
        self.filters.len() != before
    }
}

impl fmt::Display for DictionaryCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DictionaryCollection(")?;
        for (i, d) in self.dicts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{d}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for DictionaryCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictionaryCollection")
            .field("dicts", &self.dicts)
            .field("filters", &self.filters.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;
