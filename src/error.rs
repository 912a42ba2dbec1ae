// File: src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Every failure the dictionary layer can report.
///
/// Lookup misses are not errors: they come back as `None` or as an empty
/// collection. Everything here propagates to the immediate caller untouched.
#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Unsupported extension: {extension}. Supported extensions: {supported}")]
    UnsupportedExtension { extension: String, supported: String },

    #[error("{0} does not support creation")]
    CreationUnsupported(String),

    #[error("packaged resource '{0}' cannot be written")]
    AssetNotWritable(String),

    #[error("dictionary '{0}' is read-only")]
    ReadOnly(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("'{0}' is not a key of the active steno system")]
    UnknownKey(String),

    #[error("no writable dictionary")]
    NoWritableDictionary,

    #[error("no dictionary with path '{0}'")]
    DictionaryNotFound(String),

    #[error("dictionary '{0}' has no format to save with")]
    NoFormat(String),

    #[error("malformed JSON dictionary: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed binary dictionary: {0}")]
    Binary(#[from] bincode::Error),

    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DictionaryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, DictionaryError>;
