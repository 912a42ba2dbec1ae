// src/lib.rs

pub mod config;
pub mod core;
pub mod error;
pub mod format;
pub mod fuzzy;
pub mod logging;
pub mod persistence;

pub use crate::config::EngineConfig;
pub use crate::core::collection::DictionaryCollection;
pub use crate::core::dictionary::StenoDictionary;
pub use crate::core::stroke::Stroke;
pub use crate::core::system::System;
pub use crate::core::types::{StenoKey, Translation};
pub use crate::error::{DictionaryError, Result};
pub use crate::format::FormatRegistry;
pub use crate::persistence::SaveMode;
