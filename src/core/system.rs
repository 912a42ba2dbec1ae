// File: src/core/system.rs
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// The serializable shape of a keyboard layout, as it appears in config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSpec {
    pub name: String,
    /// Every key of the layout, in steno order.
    pub keys: Vec<String>,
    pub number_key: String,
    /// Letter key -> numeral key it turns into when the number key is held.
    pub numbers: HashMap<String, String>,
    pub implicit_hyphen_keys: Vec<String>,
    pub undo_stroke: String,
}

/// A keyboard layout ("steno system"): key order, number bar and hyphen rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SystemSpec", into = "SystemSpec")]
pub struct System {
    spec: SystemSpec,
    key_order: HashMap<String, usize>,
    implicit_hyphens: HashSet<char>,
}

impl From<SystemSpec> for System {
    fn from(spec: SystemSpec) -> Self {
        let mut key_order = HashMap::new();
        for (order, key) in spec.keys.iter().enumerate() {
            key_order.insert(key.clone(), order);
            // Numerals sort where their letter key does.
            if let Some(numeral) = spec.numbers.get(key) {
                key_order.insert(numeral.clone(), order);
            }
        }
        let implicit_hyphens = spec
            .implicit_hyphen_keys
            .iter()
            .flat_map(|key| key.chars())
            .filter(|&c| c != '-')
            .collect();
        Self { spec, key_order, implicit_hyphens }
    }
}

impl From<System> for SystemSpec {
    fn from(system: System) -> Self {
        system.spec
    }
}

impl System {
    /// The standard English stenotype layout.
    pub fn english() -> Self {
        let keys = [
            "#", "S-", "T-", "K-", "P-", "W-", "H-", "R-", "A-", "O-", "*", "-E", "-U", "-F", "-R",
            "-P", "-B", "-L", "-G", "-T", "-S", "-D", "-Z",
        ];
        let numbers = [
            ("S-", "1-"),
            ("T-", "2-"),
            ("P-", "3-"),
            ("H-", "4-"),
            ("A-", "5-"),
            ("O-", "0-"),
            ("-F", "-6"),
            ("-P", "-7"),
            ("-L", "-8"),
            ("-T", "-9"),
        ];
        SystemSpec {
            name: "English Stenotype".to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
            number_key: "#".to_string(),
            numbers: numbers
                .iter()
                .map(|(k, n)| (k.to_string(), n.to_string()))
                .collect(),
            implicit_hyphen_keys: ["A-", "O-", "5-", "0-", "-E", "-U", "*"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            undo_stroke: "*".to_string(),
        }
        .into()
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn number_key(&self) -> &str {
        &self.spec.number_key
    }

    pub fn undo_stroke(&self) -> &str {
        &self.spec.undo_stroke
    }

    /// The numeral a key turns into under the number bar, if it has one.
    pub fn numeral_for(&self, key: &str) -> Option<&str> {
        self.spec.numbers.get(key).map(String::as_str)
    }

    /// Rank of `key` in steno order. Numeral keys share their letter's rank.
    pub fn key_order(&self, key: &str) -> Option<usize> {
        self.key_order.get(key).copied()
    }

    pub fn is_implicit_hyphen_key(&self, key: &str) -> bool {
        self.spec.implicit_hyphen_keys.iter().any(|k| k == key)
    }

    /// Characters that, when present in a stroke, make its hyphen redundant.
    pub fn implicit_hyphens(&self) -> &HashSet<char> {
        &self.implicit_hyphens
    }
}

impl Default for System {
    fn default() -> Self {
        Self::english()
    }
}

static ACTIVE: OnceLock<RwLock<Arc<System>>> = OnceLock::new();

fn active_slot() -> &'static RwLock<Arc<System>> {
    ACTIVE.get_or_init(|| RwLock::new(Arc::new(System::english())))
}

/// The system used when steno text is parsed without an explicit layout.
pub fn active() -> Arc<System> {
    active_slot()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn set_active(system: System) {
    tracing::info!(system = system.name(), "activating steno system");
    *active_slot().write().unwrap_or_else(PoisonError::into_inner) = Arc::new(system);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numerals_share_letter_rank() {
        let system = System::english();
        assert_eq!(system.key_order("S-"), Some(1));
        assert_eq!(system.key_order("1-"), Some(1));
        assert_eq!(system.key_order("-9"), system.key_order("-T"));
        assert_eq!(system.key_order("Q-"), None);
    }

    #[test]
    fn implicit_hyphen_chars_drop_the_hyphen() {
        let system = System::english();
        let chars = system.implicit_hyphens();
        for c in ['A', 'O', '5', '0', 'E', 'U', '*'] {
            assert!(chars.contains(&c), "missing {c}");
        }
        assert!(!chars.contains(&'-'));
    }

    #[test]
    fn system_round_trips_through_json() {
        let json = serde_json::to_string(&System::english()).unwrap();
        let system: System = serde_json::from_str(&json).unwrap();
        assert_eq!(system.name(), "English Stenotype");
        assert_eq!(system.numeral_for("-F"), Some("-6"));
        assert_eq!(system.key_order("-Z"), Some(22));
    }
}
