//! Encrypted extent filesystem container (spec §4.8): a small header
//! naming the nonce and payload lengths, an XChaCha20-Poly1305 ciphertext,
//! and, once decrypted, an LZF-compressed tar archive.
//!
//! Also detects whether a `Writeable`/`Login` extent is a LUKS container
//! or a plain dm-crypt volume rather than a KML-encrypted one, since
//! IGEL images can carry either (spec §3.9).

use alloc::vec::Vec;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};

use crate::error::{IgfsError, Result};

pub const EXTENT_MAGIC: u32 = u32::from_le_bytes(*b"XKML");
const NONCE_SIZE: usize = 24;
const HEADER_SIZE: usize = 4 + NONCE_SIZE + 4;

/// Detected container format of a `Writeable`/`Login` extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentContainer {
    /// A KML-encrypted extent filesystem (this module's format).
    Kml,
    /// A LUKS1/LUKS2 header (`LUKS\xba\xbe` magic).
    Luks,
    /// Unencrypted, or an opaque dm-crypt "plain" volume this library
    /// cannot distinguish from random data without the key.
    PlainOrOpaque,
}

const LUKS_MAGIC: [u8; 6] = [0x4c, 0x55, 0x4b, 0x53, 0xba, 0xbe];

/// Sniffs the first bytes of an extent's payload to classify its
/// container format, without requiring a key.
pub fn detect_container(bytes: &[u8]) -> ExtentContainer {
    if bytes.len() >= 4 && bytes[0..4] == EXTENT_MAGIC.to_le_bytes() {
        return ExtentContainer::Kml;
    }
    if bytes.len() >= LUKS_MAGIC.len() && bytes[..LUKS_MAGIC.len()] == LUKS_MAGIC {
        return ExtentContainer::Luks;
    }
    ExtentContainer::PlainOrOpaque
}

/// Decrypts and decompresses a KML-encrypted extent filesystem,
/// returning the LZF-decompressed tar archive bytes.
pub fn decrypt_extent(key: &[u8; 32], bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() < HEADER_SIZE {
        return Err(IgfsError::Truncated {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }
    let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    if magic != EXTENT_MAGIC {
        return Err(IgfsError::InvalidImage("not a KML-encrypted extent filesystem"));
    }
    let nonce = XNonce::from_slice(&bytes[4..4 + NONCE_SIZE]);
    let plain_len = u32::from_le_bytes(bytes[4 + NONCE_SIZE..HEADER_SIZE].try_into().unwrap());
    let ciphertext = &bytes[HEADER_SIZE..];

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let compressed = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| IgfsError::AeadFailure)?;

    lzf::decompress(&compressed, plain_len as usize * 2 + 64)
        .map_err(|_| IgfsError::AeadFailure)
}

/// Unpacks a decrypted, decompressed tar archive (the output of
/// [`decrypt_extent`]) to `dest`.
#[cfg(feature = "std")]
pub fn unpack_tar(tar_bytes: &[u8], dest: &std::path::Path) -> Result<()> {
    let mut archive = tar::Archive::new(tar_bytes);
    archive.unpack(dest).map_err(IgfsError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_kml_magic() {
        let mut bytes = EXTENT_MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; NONCE_SIZE + 4]);
        assert_eq!(detect_container(&bytes), ExtentContainer::Kml);
    }

    #[test]
    fn detects_luks_magic() {
        let mut bytes = LUKS_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 10]);
        assert_eq!(detect_container(&bytes), ExtentContainer::Luks);
    }

    #[test]
    fn truncated_header_is_rejected() {
        let key = [0u8; 32];
        assert!(matches!(
            decrypt_extent(&key, &[1, 2, 3]),
            Err(IgfsError::Truncated { .. })
        ));
    }
}
