// File: src/format/binary.rs
use crate::core::system::System;
use crate::core::types::{StenoKey, Translation};
use crate::error::Result;
use crate::format::DictionaryFormat;

/// Compact bincode encoding of `(strokes, translation)` pairs.
///
/// Strokes are stored already canonical, so loading skips normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeFormat;

impl DictionaryFormat for BincodeFormat {
    fn name(&self) -> &'static str {
        "Binary"
    }

    fn decode(&self, bytes: &[u8], _system: &System) -> Result<Vec<(StenoKey, Translation)>> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn encode(&self, entries: &[(&StenoKey, &Translation)]) -> Result<Vec<u8>> {
        Ok(bincode::serialize(entries)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DictionaryError;

    #[test]
    fn entries_survive_encoding() {
        let system = System::english();
        let key = StenoKey::new(["PWAOUT", "-FL"]);
        let value = "beautiful".to_string();
        let bytes = BincodeFormat.encode(&[(&key, &value)]).unwrap();
        assert_eq!(BincodeFormat.decode(&bytes, &system).unwrap(), [(key, value)]);
    }

    #[test]
    fn truncated_input_is_an_error() {
        let system = System::english();
        let err = BincodeFormat.decode(&[9, 0, 0], &system).unwrap_err();
        assert!(matches!(err, DictionaryError::Binary(_)));
    }
}
