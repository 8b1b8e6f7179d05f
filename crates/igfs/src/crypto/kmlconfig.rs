//! `kml.json` configuration (spec §3.9): the Argon2id level and salt, the
//! public/private key slots a passphrase (and optionally a TPM) can
//! unwrap, and the per-partition wrapped keys they protect.

use alloc::string::String;
use alloc::vec::Vec;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::kdf::KdfLevel;
use crate::error::{IgfsError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KdfLevelConfig {
    Interactive,
    Moderate,
    Sensitive,
}

impl From<KdfLevelConfig> for KdfLevel {
    fn from(value: KdfLevelConfig) -> Self {
        match value {
            KdfLevelConfig::Interactive => KdfLevel::Interactive,
            KdfLevelConfig::Moderate => KdfLevel::Moderate,
            KdfLevelConfig::Sensitive => KdfLevel::Sensitive,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(with = "base64_field")]
    pub salt: Vec<u8>,
    pub level: KdfLevelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    #[serde(with = "base64_field")]
    pub public_key: Vec<u8>,
    #[serde(with = "base64_field")]
    pub wrapped_private_key: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEntry {
    pub minor: u32,
    #[serde(with = "base64_field")]
    pub wrapped_key: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpmConfig {
    pub handle: u32,
    #[serde(with = "base64_field")]
    pub sealed_secret: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KmlConfig {
    pub system: SystemConfig,
    pub slots: Vec<Slot>,
    pub keys: Vec<KeyEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpm: Option<TpmConfig>,
}

impl KmlConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|_| IgfsError::InvalidImage("malformed kml.json"))
    }

    pub fn to_json(&self) -> Result<alloc::string::String> {
        serde_json::to_string_pretty(self).map_err(|_| IgfsError::InvalidImage("unserializable kml config"))
    }

    pub fn wrapped_key_for(&self, minor: u32) -> Option<&[u8]> {
        self.keys
            .iter()
            .find(|entry| entry.minor == minor)
            .map(|entry| entry.wrapped_key.as_slice())
    }
}

/// Base64-encodes/decodes a `Vec<u8>` field as a JSON string, the way
/// binary fields travel through `kml.json` (spec §3.9).
mod base64_field {
    use super::BASE64;
    use alloc::string::String;
    use alloc::vec::Vec;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
