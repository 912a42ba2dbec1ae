// File: src/core/stroke.rs
use crate::core::system::System;
use crate::core::types::{StenoKey, STROKE_DELIMITER};
use crate::error::{DictionaryError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

/// A low number key directly followed by a high one, or a high one at the
/// start: number bar notation that swallowed the hyphen, e.g. "16" or "7".
fn implicit_number_rx() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new("(^|[1-4])([6-9])").expect("static pattern"))
}

/// Brings one stroke of steno text into canonical form.
///
/// The number bar rule runs first and the hyphen rules then apply to its
/// output, so canonical text maps to itself. Total over any input: text no
/// rule applies to comes back unchanged.
pub fn normalize_stroke(stroke: &str, system: &System) -> String {
    let mut stroke = stroke.to_string();
    if stroke.chars().any(|c| c.is_ascii_digit()) {
        let number_key = system.number_key();
        if !number_key.is_empty() && stroke.contains(number_key) {
            stroke = stroke.replace(number_key, "");
        }
        let hyphen_at = implicit_number_rx()
            .captures(&stroke)
            .and_then(|caps| caps.get(2))
            .map(|m| m.start());
        if let Some(start) = hyphen_at {
            stroke.insert(start, '-');
        }
    }
    if stroke.contains('-') {
        if stroke.ends_with('-') {
            stroke.pop();
        } else if stroke.chars().any(|c| system.implicit_hyphens().contains(&c)) {
            stroke.retain(|c| c != '-');
        }
    }
    stroke
}

/// Splits delimiter-joined steno and normalizes every stroke on its own.
pub fn normalize_steno(steno: &str, system: &System) -> Vec<String> {
    steno
        .split(STROKE_DELIMITER)
        .map(|stroke| normalize_stroke(stroke, system))
        .collect()
}

/// Sorts keys into steno order. Keys outside the system are rejected.
pub fn sort_steno_keys<I, S>(keys: I, system: &System) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut ranked = keys
        .into_iter()
        .map(|key| {
            let key = key.into();
            match system.key_order(&key) {
                Some(order) => Ok((order, key)),
                None => Err(DictionaryError::UnknownKey(key)),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    ranked.sort();
    Ok(ranked.into_iter().map(|(_, key)| key).collect())
}

/// Orders lookup suggestions: fewest strokes first, then fewest characters.
pub fn sort_steno_strokes(keys: &mut [StenoKey]) {
    keys.sort_by_cached_key(|key| (key.len(), key.to_string().chars().count()));
}

/// One chord, canonicalized against a steno system.
///
/// Holds the deduplicated keys in steno order and their RTFCRE text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stroke {
    steno_keys: Vec<String>,
    rtfcre: String,
    is_correction: bool,
}

impl Stroke {
    pub fn new<I, S>(keys: I, system: &System) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pressed: HashSet<String> = keys.into_iter().map(Into::into).collect();

        // The number bar turns digit-bearing keys into their numerals.
        let number_key = system.number_key();
        if pressed.contains(number_key) {
            let numerals: Vec<(String, String)> = pressed
                .iter()
                .filter_map(|key| {
                    system
                        .numeral_for(key)
                        .map(|numeral| (key.clone(), numeral.to_string()))
                })
                .collect();
            if !numerals.is_empty() {
                pressed.remove(number_key);
                for (key, numeral) in numerals {
                    pressed.remove(&key);
                    pressed.insert(numeral);
                }
            }
        }

        let steno_keys = sort_steno_keys(pressed, system)?;
        let rtfcre = if steno_keys.iter().any(|k| system.is_implicit_hyphen_key(k)) {
            steno_keys.iter().map(|k| k.trim_matches('-')).collect()
        } else {
            let pre: String = steno_keys
                .iter()
                .filter(|k| k.ends_with('-') || k.as_str() == number_key)
                .map(|k| k.trim_matches('-'))
                .collect();
            let post: String = steno_keys
                .iter()
                .filter(|k| k.starts_with('-'))
                .map(|k| k.trim_matches('-'))
                .collect();
            if post.is_empty() {
                pre
            } else {
                format!("{pre}-{post}")
            }
        };
        let is_correction = rtfcre == system.undo_stroke();

        Ok(Self { steno_keys, rtfcre, is_correction })
    }

    pub fn steno_keys(&self) -> &[String] {
        &self.steno_keys
    }

    pub fn rtfcre(&self) -> &str {
        &self.rtfcre
    }

    pub fn is_correction(&self) -> bool {
        self.is_correction
    }
}

impl fmt::Display for Stroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.is_correction { "*" } else { "" };
        write!(f, "{prefix}Stroke({} : {:?})", self.rtfcre, self.steno_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::system::SystemSpec;

    fn english() -> System {
        System::english()
    }

    #[test]
    fn normalize_number_bar() {
        let system = english();
        // Without a digit the number key is a plain key.
        assert_eq!(normalize_stroke("#S", &system), "#S");
        assert_eq!(normalize_stroke("#1", &system), "1");
        assert_eq!(normalize_stroke("16", &system), "1-6");
        assert_eq!(normalize_stroke("#16", &system), "1-6");
        assert_eq!(normalize_stroke("7", &system), "-7");
        assert_eq!(normalize_stroke("12-9", &system), "12-9");
        // The hyphen rules still apply after the number bar rule.
        assert_eq!(normalize_stroke("16-", &system), "1-6");
        assert_eq!(normalize_stroke("#16-", &system), "1-6");
        assert_eq!(normalize_stroke("16E", &system), "16E");
        assert_eq!(normalize_stroke("26U", &system), "26U");
    }

    #[test]
    fn normalize_hyphens() {
        let system = english();
        assert_eq!(normalize_stroke("S-", &system), "S");
        assert_eq!(normalize_stroke("KA-T", &system), "KAT");
        assert_eq!(normalize_stroke("*-T", &system), "*T");
        assert_eq!(normalize_stroke("S-G", &system), "S-G");
        assert_eq!(normalize_stroke("-FL", &system), "-FL");
    }

    #[test]
    fn normalize_is_idempotent() {
        let system = english();
        for raw in [
            "#S", "16", "7", "S-", "KA-T", "PW-FL", "#T-9", "", "-", "weird!", "16-", "16E", "#16-",
            "26U",
        ] {
            let once = normalize_stroke(raw, &system);
            assert_eq!(normalize_stroke(&once, &system), once, "input {raw:?}");
        }
    }

    #[test]
    fn normalize_steno_splits_strokes() {
        let system = english();
        assert_eq!(normalize_steno("S-/KA-T/16", &system), vec!["S", "KAT", "1-6"]);
    }

    #[test]
    fn stroke_number_bar_substitutes_numerals() {
        let system = english();
        let stroke = Stroke::new(["#", "S-", "T-", "-F"], &system).unwrap();
        assert_eq!(stroke.steno_keys(), ["1-", "2-", "-6"]);
        assert_eq!(stroke.rtfcre(), "12-6");
        assert!(!stroke.steno_keys().iter().any(|k| k == "#"));
    }

    #[test]
    fn stroke_number_key_without_numerals_stays() {
        let system = english();
        let stroke = Stroke::new(["#", "K-"], &system).unwrap();
        assert_eq!(stroke.steno_keys(), ["#", "K-"]);
        assert_eq!(stroke.rtfcre(), "#K");
    }

    #[test]
    fn stroke_rtfcre_hyphen_placement() {
        let system = english();
        let stroke = Stroke::new(["-G", "S-", "S-"], &system).unwrap();
        assert_eq!(stroke.steno_keys(), ["S-", "-G"]);
        assert_eq!(stroke.rtfcre(), "S-G");
        let stroke = Stroke::new(["-T", "A-", "K-"], &system).unwrap();
        assert_eq!(stroke.rtfcre(), "KAT");
        let stroke = Stroke::new(["-D"], &system).unwrap();
        assert_eq!(stroke.rtfcre(), "-D");
    }

    #[test]
    fn stroke_correction() {
        let system = english();
        let undo = Stroke::new(["*"], &system).unwrap();
        assert!(undo.is_correction());
        assert_eq!(undo.to_string(), "*Stroke(* : [\"*\"])");
        let star_t = Stroke::new(["*", "-T"], &system).unwrap();
        assert!(!star_t.is_correction());
    }

    #[test]
    fn stroke_rejects_unknown_keys() {
        let system = english();
        let err = Stroke::new(["Q-"], &system).unwrap_err();
        assert!(matches!(err, DictionaryError::UnknownKey(key) if key == "Q-"));
    }

    #[test]
    fn stroke_without_number_key_keeps_raw_keys() {
        let system: System = SystemSpec {
            name: "Digits".to_string(),
            keys: ["#", "1", "2", "S-"].iter().map(|k| k.to_string()).collect(),
            number_key: "#".to_string(),
            numbers: [("1", "1-"), ("2", "2-")]
                .iter()
                .map(|(k, n)| (k.to_string(), n.to_string()))
                .collect(),
            implicit_hyphen_keys: Vec::new(),
            undo_stroke: "*".to_string(),
        }
        .into();

        let stroke = Stroke::new(["1", "2", "S-"], &system).unwrap();
        assert_eq!(stroke.steno_keys(), ["1", "2", "S-"]);
        assert_eq!(stroke.rtfcre(), "S");

        let stroke = Stroke::new(["#", "1", "2", "S-"], &system).unwrap();
        assert_eq!(stroke.steno_keys(), ["1-", "2-", "S-"]);
        assert_eq!(stroke.rtfcre(), "12S");
    }

    #[test]
    fn sort_strokes_fewest_first() {
        let system = english();
        let mut keys: Vec<StenoKey> = ["PWAOUT/-FL", "PWAOUFL", "PW-FL"]
            .iter()
            .map(|s| StenoKey::parse(s, &system))
            .collect();
        sort_steno_strokes(&mut keys);
        let sorted: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(sorted, ["PW-FL", "PWAOUFL", "PWAOUT/-FL"]);
    }
}
