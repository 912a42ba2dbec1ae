// File: src/format/json.rs
use crate::core::system::System;
use crate::core::types::{StenoKey, Translation};
use crate::error::Result;
use crate::format::DictionaryFormat;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Object entries in file order. Keys that normalize to the same stroke
/// sequence must resolve to the one written last.
struct OrderedEntries(Vec<(String, Translation)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedEntries;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object from steno to translation")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<OrderedEntries, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Plain JSON object from steno text to translation.
///
/// Reads UTF-8, falling back to Latin-1. Writes UTF-8 with sorted keys and
/// one entry per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl DictionaryFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "JSON"
    }

    fn decode(&self, bytes: &[u8], system: &System) -> Result<Vec<(StenoKey, Translation)>> {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => Cow::Borrowed(text),
            Err(_) => {
                tracing::warn!("dictionary is not valid UTF-8, reading it as Latin-1");
                Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect::<String>())
            }
        };
        let OrderedEntries(raw) = serde_json::from_str(&text)?;
        Ok(raw
            .into_iter()
            .map(|(steno, translation)| (StenoKey::parse(&steno, system), translation))
            .collect())
    }

    fn encode(&self, entries: &[(&StenoKey, &Translation)]) -> Result<Vec<u8>> {
        let sorted: BTreeMap<String, &str> = entries
            .iter()
            .map(|(key, translation)| (key.to_string(), translation.as_str()))
            .collect();
        let mut out = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b""));
        sorted.serialize(&mut serializer)?;
        Ok(out)
    }
}
