//! Boot registry key/value store (spec §3.6): sniffs the on-disk magic
//! and dispatches to the legacy `\n`-separated text format or the
//! structured binary format, exposing both as the same key→bytes map.

use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use igfs_common::model::Model;

use crate::error::{IgfsError, Result};
use crate::structures::raw::boot_registry::{
    StructuredEntry, LEGACY_EOF_LINE, LEGACY_MAGIC, STRUCTURED_MAGIC,
};

#[derive(Debug, Clone, Default)]
pub struct BootRegistry {
    entries: BTreeMap<String, Vec<u8>>,
}

impl BootRegistry {
    /// Parses a whole registry extent, including its leading magic.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(IgfsError::Truncated {
                needed: 4,
                available: bytes.len(),
            });
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        match magic {
            LEGACY_MAGIC => Self::parse_legacy(&bytes[4..]),
            STRUCTURED_MAGIC => Self::parse_structured(&bytes[4..]),
            _ => Err(IgfsError::InvalidImage("unrecognized boot registry magic")),
        }
    }

    fn parse_legacy(bytes: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(bytes);
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            if line == LEGACY_EOF_LINE {
                break;
            }
            if line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries.insert(key.to_string(), value.as_bytes().to_vec());
            }
        }
        Ok(Self { entries })
    }

    fn parse_structured(bytes: &[u8]) -> Result<Self> {
        let mut entries = BTreeMap::new();
        let mut offset = 0usize;
        let mut last_key: Option<String> = None;

        while offset + StructuredEntry::SIZE <= bytes.len() {
            let entry = StructuredEntry::parse(&bytes[offset..])?;
            offset += StructuredEntry::SIZE;

            if entry.flag.deleted {
                last_key = None;
                continue;
            }

            if entry.flag.continuation {
                if let Some(key) = &last_key {
                    if let Some(existing) = entries.get_mut(key) {
                        let existing: &mut Vec<u8> = existing;
                        existing.extend_from_slice(entry.value_bytes());
                    }
                }
                continue;
            }

            let key_len = entry
                .key
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(entry.key.len());
            let key = String::from_utf8_lossy(&entry.key[..key_len]).into_owned();
            entries.insert(key.clone(), entry.value_bytes().to_vec());
            last_key = Some(key);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(|v| v.as_slice())
    }

    pub fn get_str(&self, key: &str) -> Option<Cow<'_, str>> {
        self.entries.get(key).map(|v| String::from_utf8_lossy(v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }
}
