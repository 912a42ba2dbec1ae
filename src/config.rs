// File: src/config.rs
use crate::core::collection::DictionaryCollection;
use crate::core::system::{self, System};
use crate::error::{DictionaryError, Result};
use crate::format::FormatRegistry;
use crate::persistence::{self, ResourceResolver, SaveMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One entry of the dictionary stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryConfig {
    pub path: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

fn default_asset_root() -> PathBuf {
    PathBuf::from("assets")
}

/// Engine settings as read from a JSON file. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Highest priority first.
    pub dictionaries: Vec<DictionaryConfig>,
    pub asset_root: PathBuf,
    pub save_mode: SaveMode,
    /// Custom layout; the English one when absent.
    pub system: Option<System>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dictionaries: Vec::new(),
            asset_root: default_asset_root(),
            save_mode: SaveMode::default(),
            system: None,
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| DictionaryError::io(path, e))?;
        let config: Self = serde_json::from_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            dictionaries = config.dictionaries.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn resolver(&self) -> ResourceResolver {
        ResourceResolver::new(&self.asset_root)
    }

    /// Activates the configured system, then loads every dictionary in
    /// order. A plain file that does not exist yet starts out empty.
    pub fn open_collection(&self, registry: &FormatRegistry) -> Result<DictionaryCollection> {
        let system = self.system.clone().unwrap_or_default();
        system::set_active(system.clone());

        let resolver = self.resolver();
        let mut dicts = Vec::with_capacity(self.dictionaries.len());
        for entry in &self.dictionaries {
            let loaded = registry.load_dictionary(&entry.path, &resolver, &system, self.save_mode);
            let mut dictionary = match loaded {
                Err(DictionaryError::Io { source, .. })
                    if source.kind() == io::ErrorKind::NotFound && !persistence::is_asset(&entry.path) =>
                {
                    tracing::warn!(path = %entry.path, "dictionary file missing, starting empty");
                    registry.create_dictionary(&entry.path, self.save_mode)?
                }
                other => other?,
            };
            dictionary.set_enabled(entry.enabled);
            dicts.push(dictionary);
        }

        tracing::info!(dictionaries = dicts.len(), "dictionary collection ready");
        Ok(DictionaryCollection::new(dicts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_use_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"dictionaries": [{"path": "user.json"}]}"#).unwrap();
        assert_eq!(
            config.dictionaries,
            [DictionaryConfig { path: "user.json".into(), enabled: true }]
        );
        assert_eq!(config.asset_root, PathBuf::from("assets"));
        assert_eq!(config.save_mode, SaveMode::Background);
        assert!(config.system.is_none());
    }

    #[test]
    fn save_mode_is_lowercase() {
        let config: EngineConfig = serde_json::from_str(r#"{"save_mode": "locked"}"#).unwrap();
        assert_eq!(config.save_mode, SaveMode::Locked);
        assert!(serde_json::from_str::<EngineConfig>(r#"{"save_mode": "Locked"}"#).is_err());
    }

    #[test]
    fn custom_system_round_trips() {
        let mut value = serde_json::to_value(EngineConfig {
            system: Some(System::english()),
            ..EngineConfig::default()
        })
        .unwrap();
        value["system"]["name"] = "Custom".into();
        let config: EngineConfig = serde_json::from_value(value).unwrap();
        let system = config.system.unwrap();
        assert_eq!(system.name(), "Custom");
        assert_eq!(system.key_order("-Z"), System::english().key_order("-Z"));
    }

    #[test]
    fn open_collection_keeps_order_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.json");
        fs::write(&main, r#"{"KAT": "cat"}"#).unwrap();
        let user = dir.path().join("user.json");

        let config = EngineConfig {
            dictionaries: vec![
                DictionaryConfig { path: user.to_string_lossy().into_owned(), enabled: true },
                DictionaryConfig { path: main.to_string_lossy().into_owned(), enabled: false },
            ],
            save_mode: SaveMode::Immediate,
            ..EngineConfig::default()
        };
        let dc = config.open_collection(&FormatRegistry::with_defaults()).unwrap();
        assert_eq!(dc.dicts().len(), 2);
        assert!(dc.dicts()[0].is_empty());
        assert!(!dc.dicts()[1].enabled());
        assert_eq!(dc.dicts()[1].len(), 1);
        assert_eq!(dc.raw_lookup(&"KAT".into()), None);
    }

    #[test]
    fn open_collection_rejects_unknown_extensions() {
        let config = EngineConfig {
            dictionaries: vec![DictionaryConfig { path: "notes.rtf".into(), enabled: true }],
            ..EngineConfig::default()
        };
        let err = config.open_collection(&FormatRegistry::with_defaults()).unwrap_err();
        assert!(matches!(err, DictionaryError::UnsupportedExtension { .. }));
    }
}
