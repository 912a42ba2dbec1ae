// src/core/types.rs
use crate::core::stroke::normalize_steno;
use crate::core::system::{self, System};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separates the strokes of a multi-stroke key in its text form.
pub const STROKE_DELIMITER: &str = "/";

/// The text a dictionary entry produces.
pub type Translation = String;

/// An ordered sequence of canonical strokes: the key of every dictionary entry.
///
/// Two keys are equal (and hash alike) exactly when their canonical strokes are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StenoKey(Vec<String>);

impl StenoKey {
    /// Wraps strokes that are already in canonical form.
    pub fn new<I, S>(strokes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(strokes.into_iter().map(Into::into).collect())
    }

    /// Parses delimiter-joined steno, normalizing each stroke against `system`.
    pub fn parse(steno: &str, system: &System) -> Self {
        Self(normalize_steno(steno, system))
    }

    pub fn strokes(&self) -> &[String] {
        &self.0
    }

    /// Number of strokes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parses against the active system.
impl From<&str> for StenoKey {
    fn from(steno: &str) -> Self {
        Self::parse(steno, &system::active())
    }
}

impl fmt::Display for StenoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(STROKE_DELIMITER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_canonical_forms_are_equal_keys() {
        let system = System::english();
        assert_eq!(StenoKey::parse("KA-T/S-", &system), StenoKey::new(["KAT", "S"]));
        assert_ne!(StenoKey::parse("S/S", &system), StenoKey::parse("S", &system));
    }

    #[test]
    fn display_joins_with_delimiter() {
        let key = StenoKey::new(["PWAOUT", "-FL"]);
        assert_eq!(key.to_string(), "PWAOUT/-FL");
        assert_eq!(key.len(), 2);
    }
}
