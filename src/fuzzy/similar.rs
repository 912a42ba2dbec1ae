// File: src/fuzzy/similar.rs
use std::borrow::Borrow;
use std::cell::{Cell, RefCell};
use std::collections::hash_map::{self, HashMap};
use std::hash::Hash;
use std::ops::ControlFlow;

/// A hash map that also keeps its keys sorted under a "similarity function",
/// so keys that are close to a query can be found in O(log n + m) next to the
/// usual O(1) exact lookups.
///
/// The similarity function maps a key to a value that compares equal for keys
/// deemed similar. Keys with close similarity values end up next to each other
/// in the sorted list, which is what prefix-style scans rely on.
///
/// The list holds `(simkey, key)` pairs ordered by simkey, then by key. New keys
/// are appended and the list is re-sorted lazily, at most once per batch of
/// insertions, when a search or a removal needs it. Changing the value of an
/// existing key costs nothing extra.
///
/// Keys must be totally ordered both raw and after the similarity function.
/// Only the operations that keep the list in sync are exposed.
#[derive(Debug)]
pub struct SimilarSearchMap<K, V, S = K> {
    map: HashMap<K, V>,
    list: RefCell<Vec<(S, K)>>,
    needs_sorting: Cell<bool>,
    simfn: fn(&K) -> S,
}

impl<K, V> SimilarSearchMap<K, V, K>
where
    K: Clone + Eq + Hash + Ord,
{
    /// A map whose similarity function is the identity.
    pub fn new() -> Self {
        Self::with_similarity(K::clone)
    }
}

impl<K, V> Default for SimilarSearchMap<K, V, K>
where
    K: Clone + Eq + Hash + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> SimilarSearchMap<K, V, S>
where
    K: Clone + Eq + Hash + Ord,
    S: Ord,
{
    pub fn with_similarity(simfn: fn(&K) -> S) -> Self {
        Self {
            map: HashMap::new(),
            list: RefCell::new(Vec::new()),
            needs_sorting: Cell::new(false),
            simfn,
        }
    }

    pub fn similarity_key(&self, key: &K) -> S {
        (self.simfn)(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key)
    }

    /// Values may change freely; keys stay put, so the list is unaffected.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get_mut(key)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, K, V> {
        self.map.iter()
    }

    pub fn keys(&self) -> hash_map::Keys<'_, K, V> {
        self.map.keys()
    }

    /// Inserts or replaces a value. A new key is appended to the list, which
    /// is then flagged for sorting.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if !self.map.contains_key(&key) {
            let simkey = (self.simfn)(&key);
            self.list.get_mut().push((simkey, key.clone()));
            self.needs_sorting.set(true);
        }
        self.map.insert(key, value)
    }

    /// Removes a key from both the map and the list.
    ///
    /// The list has to be sorted to find the key by bisection; that sort is
    /// needed for the next search anyway.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.map.remove(key)?;
        self.sort_if_needed();
        let simkey = (self.simfn)(key);
        let list = self.list.get_mut();
        if let Ok(idx) = list.binary_search_by(|(s, k)| s.cmp(&simkey).then_with(|| k.cmp(key))) {
            list.remove(idx);
        }
        Some(value)
    }

    /// Adds many items at once. Filling an empty map takes a fast path that
    /// builds the list in one pass. The list is sorted on return either way.
    pub fn update<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        if self.map.is_empty() {
            self.map.extend(items);
            let simfn = self.simfn;
            *self.list.get_mut() = self.map.keys().map(|k| (simfn(k), k.clone())).collect();
        } else {
            for (key, value) in items {
                self.insert(key, value);
            }
        }
        self.sort();
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.list.get_mut().clear();
        self.needs_sorting.set(false);
    }

    fn sort(&self) {
        self.list.borrow_mut().sort_unstable();
        self.needs_sorting.set(false);
    }

    fn sort_if_needed(&self) {
        if self.needs_sorting.get() {
            self.sort();
        }
    }

    /// Walks the sorted list from the leftmost entry whose simkey is not less
    /// than the simkey of `key`. `visit` gets each entry's simkey, the query's
    /// simkey and the raw key, and decides whether to keep going.
    pub fn scan_from<F>(&self, key: &K, mut visit: F)
    where
        F: FnMut(&S, &S, &K) -> ControlFlow<()>,
    {
        self.sort_if_needed();
        let simkey = (self.simfn)(key);
        let list = self.list.borrow();
        let start = list.partition_point(|(s, _)| *s < simkey);
        for (s, k) in &list[start..] {
            if visit(s, &simkey, k).is_break() {
                break;
            }
        }
    }

    /// Collects keys from where `key` is (or would be) in the list, for as long
    /// as `filter(entry_simkey, query_simkey)` holds, up to `count` keys.
    ///
    /// A filter that always returns true returns everything from that point on.
    pub fn filter_keys<F>(&self, key: &K, count: Option<usize>, filter: F) -> Vec<K>
    where
        F: Fn(&S, &S) -> bool,
    {
        let mut keys = Vec::new();
        if count == Some(0) {
            return keys;
        }
        self.scan_from(key, |s, simkey, k| {
            if !filter(s, simkey) {
                return ControlFlow::Break(());
            }
            keys.push(k.clone());
            if count.is_some_and(|count| keys.len() >= count) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        keys
    }

    /// Keys whose simkey equals the simkey of `key`.
    pub fn get_similar_keys(&self, key: &K, count: Option<usize>) -> Vec<K> {
        self.filter_keys(key, count, |s, simkey| s == simkey)
    }
}
