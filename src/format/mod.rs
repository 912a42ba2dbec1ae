// File: src/format/mod.rs
//! Dictionary file formats and the registry that picks one by extension.

pub mod binary;
pub mod json;

use crate::core::dictionary::StenoDictionary;
use crate::core::system::System;
use crate::core::types::{StenoKey, Translation};
use crate::error::{DictionaryError, Result};
use crate::persistence::{ResourceResolver, SaveMode};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use binary::BincodeFormat;
pub use json::JsonFormat;

/// Byte-level codec for one dictionary file format.
pub trait DictionaryFormat: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// False for formats that can be read but never created from scratch.
    fn supports_creation(&self) -> bool {
        true
    }

    fn decode(&self, bytes: &[u8], system: &System) -> Result<Vec<(StenoKey, Translation)>>;

    fn encode(&self, entries: &[(&StenoKey, &Translation)]) -> Result<Vec<u8>>;
}

/// Maps lowercase file extensions to the format that handles them.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<String, Arc<dyn DictionaryFormat>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `json` and `bin` formats.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("json", JsonFormat);
        registry.register("bin", BincodeFormat);
        registry
    }

    pub fn register(&mut self, extension: &str, format: impl DictionaryFormat + 'static) {
        self.formats.insert(extension.to_lowercase(), Arc::new(format));
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    pub fn format_for(&self, resource: &str) -> Result<Arc<dyn DictionaryFormat>> {
        let extension = Path::new(resource)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match self.formats.get(&extension) {
            Some(format) => Ok(Arc::clone(format)),
            None => Err(DictionaryError::UnsupportedExtension {
                extension,
                supported: self.extensions().collect::<Vec<_>>().join(", "),
            }),
        }
    }

    /// Creates a new, empty dictionary in the format implied by `resource`.
    ///
    /// Nothing is written until the dictionary is saved.
    pub fn create_dictionary(&self, resource: &str, save_mode: SaveMode) -> Result<StenoDictionary> {
        let format = self.format_for(resource)?;
        Ok(StenoDictionary::create(resource, format)?.with_save_mode(save_mode))
    }

    /// Loads a dictionary in the format implied by `resource`.
    pub fn load_dictionary(
        &self,
        resource: &str,
        resolver: &ResourceResolver,
        system: &System,
        save_mode: SaveMode,
    ) -> Result<StenoDictionary> {
        let format = self.format_for(resource)?;
        Ok(StenoDictionary::load(resource, format, resolver, system)?.with_save_mode(save_mode))
    }
}
