// File: src/fuzzy/reverse.rs
use crate::core::types::{StenoKey, Translation};
use crate::error::Result;
use crate::fuzzy::similar::SimilarSearchMap;
use regex::Regex;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::str::Chars;

/// Meta characters that do not change what a translation "says".
const STRIP_CHARS: &[char] = &['{', '}', '^', '&', '~', '#', '<', '>'];

const REGEX_META: &[char] = &['\\', '.', '^', '$', '*', '+', '?', '{', '}', '[', ']', '|', '(', ')'];

/// Similarity key of a translation: meta characters and whitespace trimmed
/// from both ends, then lowercased one character at a time so that a prefix
/// of the text stays a prefix of the key.
pub fn similarity_key(translation: &Translation) -> String {
    translation
        .trim_matches(|c: char| c.is_whitespace() || STRIP_CHARS.contains(&c))
        .chars()
        .flat_map(char::to_lowercase)
        .collect()
}

/// Consumes a character class whose `[` was just read, up to its closing
/// `]`. A `]` first in a class (after an optional `^`) is a literal.
fn skip_class(chars: &mut Chars<'_>) {
    let mut depth = 1usize;
    let mut first = true;
    let mut caret_allowed = true;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '^' if caret_allowed => {
                caret_allowed = false;
                continue;
            }
            ']' if first => {}
            '[' => {
                depth += 1;
                first = true;
                caret_allowed = true;
                continue;
            }
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
            _ => {}
        }
        first = false;
        caret_allowed = false;
    }
}

/// Whether `pattern` has a `|` outside every group and character class.
fn has_top_level_alternation(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    let mut depth = 0usize;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' => skip_class(&mut chars),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// The literal text every match of `pattern` has to start with.
///
/// Stops at the first regex meta character; a literal directly followed by a
/// quantifier that allows zero repetitions is dropped. Any top-level
/// alternation means no prefix is guaranteed.
fn literal_prefix(pattern: &str) -> &str {
    if has_top_level_alternation(pattern) {
        return "";
    }

    let end = pattern.find(REGEX_META).unwrap_or(pattern.len());
    let prefix = &pattern[..end];
    let optional_last = matches!(pattern[end..].chars().next(), Some('*' | '?' | '{'));
    if optional_last {
        match prefix.char_indices().last() {
            Some((idx, _)) => &prefix[..idx],
            None => prefix,
        }
    } else {
        prefix
    }
}

/// Maps translations back to the keys that produce them, searchable by
/// similarity.
#[derive(Debug)]
pub struct ReverseIndex {
    entries: SimilarSearchMap<Translation, Vec<StenoKey>, String>,
}

impl Default for ReverseIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self { entries: SimilarSearchMap::with_similarity(similarity_key) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, value: &str) -> Option<&[StenoKey]> {
        self.entries.get(value).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Translation, &[StenoKey])> {
        self.entries.iter().map(|(value, keys)| (value, keys.as_slice()))
    }

    /// Records that `key` now produces `value`.
    pub fn append_key(&mut self, value: Translation, key: StenoKey) {
        match self.entries.get_mut(&value) {
            Some(keys) => {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
            None => {
                self.entries.insert(value, vec![key]);
            }
        }
    }

    /// Forgets that `key` produces `value`. A translation left with no keys
    /// is dropped entirely so searches never report it.
    pub fn remove_key(&mut self, value: &str, key: &StenoKey) {
        let now_empty = match self.entries.get_mut(value) {
            Some(keys) => {
                keys.retain(|k| k != key);
                keys.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.entries.remove(&value.to_string());
        }
    }

    /// Rebuilds the whole index from a forward mapping in one pass.
    pub fn match_forward<'a, I>(&mut self, forward: I)
    where
        I: IntoIterator<Item = (&'a StenoKey, &'a Translation)>,
    {
        let mut grouped: HashMap<Translation, Vec<StenoKey>> = HashMap::new();
        for (key, value) in forward {
            grouped.entry(value.clone()).or_default().push(key.clone());
        }
        self.entries.clear();
        self.entries.update(grouped);
    }

    /// Translations that compare equal to `value` under the similarity key.
    pub fn get_similar_keys(&self, value: &str, count: Option<usize>) -> Vec<Translation> {
        self.entries.get_similar_keys(&value.to_string(), count)
    }

    /// Translations similar to `value` first, then the ones whose similarity
    /// key extends it ("test" finds "Test", "tested", "testing").
    pub fn partial_match_keys(&self, value: &str, count: Option<usize>) -> Vec<Translation> {
        self.entries
            .filter_keys(&value.to_string(), count, |s, simkey| s.starts_with(simkey.as_str()))
    }

    /// Translations matching `pattern` from their start, in similarity order.
    ///
    /// Only entries sharing the pattern's literal prefix are tested, and the
    /// pattern is compiled on the first candidate: a pattern with no
    /// candidates is never compiled and cannot fail.
    pub fn regex_match_keys(&self, pattern: &str, count: Option<usize>) -> Result<Vec<Translation>> {
        let mut matches = Vec::new();
        if count == Some(0) {
            return Ok(matches);
        }
        let prefix = literal_prefix(pattern).to_string();
        let mut compiled: Option<Regex> = None;
        let mut failure = None;
        self.entries.scan_from(&prefix, |s, simkey, translation| {
            if !s.starts_with(simkey.as_str()) {
                return ControlFlow::Break(());
            }
            let rx = match compiled.take() {
                Some(rx) => rx,
                None => match Regex::new(&format!("^(?:{pattern})")) {
                    Ok(rx) => rx,
                    Err(e) => {
                        failure = Some(e);
                        return ControlFlow::Break(());
                    }
                },
            };
            if rx.is_match(translation) {
                matches.push(translation.clone());
            }
            compiled = Some(rx);
            if count.is_some_and(|count| matches.len() >= count) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(matches),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DictionaryError;

    fn index(entries: &[(&str, &str)]) -> ReverseIndex {
        let mut index = ReverseIndex::new();
        for (key, value) in entries {
            index.append_key(value.to_string(), StenoKey::new(key.split('/')));
        }
        index
    }

    #[test]
    fn similarity_key_strips_meta_and_case() {
        assert_eq!(similarity_key(&"{^BEAUTIFUL}  ".to_string()), "beautiful");
        assert_eq!(similarity_key(&"{#BEAUtiful}{^}".to_string()), "beautiful");
        assert_eq!(similarity_key(&"{.}".to_string()), ".");
    }

    #[test]
    fn literal_prefix_stops_at_meta() {
        assert_eq!(literal_prefix("beau"), "beau");
        assert_eq!(literal_prefix("beautiful.?.?"), "beautiful");
        assert_eq!(literal_prefix("beautiful?"), "beautifu");
        assert_eq!(literal_prefix("ab*c"), "a");
        assert_eq!(literal_prefix("(b|u).{3}$"), "");
        assert_eq!(literal_prefix("ab(c|d)"), "ab");
        assert_eq!(literal_prefix("beau|ugly"), "");
        assert_eq!(literal_prefix("a\\|b"), "a");
        // Brackets and bars inside a class neither group nor alternate.
        assert_eq!(literal_prefix("ab[(]|cd"), "");
        assert_eq!(literal_prefix("ab[|]cd"), "ab");
        assert_eq!(literal_prefix("ab[]|]cd"), "ab");
        assert_eq!(literal_prefix("ab[^]|]cd"), "ab");
        assert_eq!(literal_prefix("ab[[:alpha:]|]cd"), "ab");
        assert_eq!(literal_prefix("ab[\\]|]|cd"), "");
    }

    #[test]
    fn regex_alternation_after_a_class_scans_everything() {
        let index = index(&[("KD", "cd"), ("A*BGS", "abx"), ("A*B", "ab(")]);
        assert_eq!(index.regex_match_keys("ab[(]|cd", None).unwrap(), ["ab(", "cd"]);
        assert_eq!(index.regex_match_keys("ab[|]", None).unwrap(), Vec::<Translation>::new());
    }

    #[test]
    fn remove_key_drops_empty_translations() {
        let mut index = index(&[("S-G", "something"), ("SPH-G", "something")]);
        index.remove_key("something", &StenoKey::new(["S-G"]));
        assert_eq!(index.get("something"), Some(&[StenoKey::new(["SPH-G"])][..]));
        index.remove_key("something", &StenoKey::new(["SPH-G"]));
        assert_eq!(index.get("something"), None);
        assert!(index.get_similar_keys("something", None).is_empty());
    }

    #[test]
    fn partial_then_regex_search() {
        let index = index(&[
            ("WAOUFL", "beautiful"),
            ("PWAOUFL", "Beautiful"),
            ("PWAOU", "beau"),
            ("PWAOUFL/HREU", "beautifully"),
            ("UG/HREU/-PBS", "ugliness"),
            ("ULG", "ugly"),
        ]);
        assert_eq!(
            index.partial_match_keys("beau", Some(4)),
            ["beau", "Beautiful", "beautiful", "beautifully"]
        );
        assert_eq!(index.partial_match_keys("UGLY", Some(2)), ["ugly"]);
        assert_eq!(
            index.regex_match_keys("beau", Some(4)).unwrap(),
            ["beau", "beautiful", "beautifully"]
        );
        assert_eq!(index.regex_match_keys("(b|u).{3}$", Some(2)).unwrap(), ["beau", "ugly"]);
        assert!(index.regex_match_keys("unmatched prefix(", Some(5)).unwrap().is_empty());
        let err = index.regex_match_keys("beautiful...(", Some(1)).unwrap_err();
        assert!(matches!(err, DictionaryError::InvalidPattern(_)));
    }

    #[test]
    fn match_forward_groups_keys_by_value() {
        let forward: Vec<(StenoKey, Translation)> = vec![
            (StenoKey::new(["S-G"]), "something".to_string()),
            (StenoKey::new(["SPH-G"]), "something".to_string()),
            (StenoKey::new(["TPHOG"]), "nothing".to_string()),
        ];
        let mut index = ReverseIndex::new();
        index.match_forward(forward.iter().map(|(k, v)| (k, v)));
        let mut keys = index.get("something").unwrap().to_vec();
        keys.sort();
        assert_eq!(keys, [StenoKey::new(["S-G"]), StenoKey::new(["SPH-G"])]);
        assert_eq!(index.len(), 2);
    }
}
