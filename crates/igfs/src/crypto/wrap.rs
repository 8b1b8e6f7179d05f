//! AES-256-XTS unwrap of the per-partition keys `kmlconfig.json` carries
//! (spec §4.8 steps 2-4, and "Filesystem key unwrap").
//!
//! Each slot's `wrapped_private_key`, and each `keys[]` entry's
//! `wrapped_key`, is ciphertext under AES-256-XTS keyed by material
//! derived from the unlocking passphrase (or, transitively, the master
//! key). One 512-byte XTS sector holds each wrapped blob.

use alloc::vec::Vec;

use aes::cipher::KeyInit;
use aes::Aes256;
use sha2::{Digest, Sha512};
use xts_mode::{get_tweak_default, Xts128};
use zeroize::Zeroizing;

use crate::crypto::kdf::{derive_k1, derive_unlock_password};
use crate::crypto::kmlconfig::{KeyEntry, Slot, SystemConfig};
use crate::error::{IgfsError, Result};

const SECTOR_SIZE: usize = 512;

/// Unwraps `wrapped` with a 64-byte AES-256-XTS key pair (two 32-byte
/// AES-256 keys concatenated), tweaked by `sector`.
pub fn unwrap_key(xts_key: &[u8; 64], sector: u64, wrapped: &[u8]) -> Result<Vec<u8>> {
    if wrapped.is_empty() || wrapped.len() % 16 != 0 {
        return Err(IgfsError::InvalidImage(
            "wrapped key is not a whole number of AES blocks",
        ));
    }
    let cipher_1 = Aes256::new_from_slice(&xts_key[..32]).map_err(|_| IgfsError::UnwrapFailure)?;
    let cipher_2 = Aes256::new_from_slice(&xts_key[32..]).map_err(|_| IgfsError::UnwrapFailure)?;
    let xts = Xts128::new(cipher_1, cipher_2);

    let mut buffer = wrapped.to_vec();
    xts.decrypt_area(&mut buffer, SECTOR_SIZE, sector as u128, get_tweak_default);
    Ok(buffer)
}

/// Step 3 of master-key derivation (spec §4.8): `k2 = SHA-512(k1 ||
/// pub)`, 64 bytes, also reused unmodified for the per-partition
/// filesystem-key unwrap ("unwrapped identically using `master` as
/// `k1`").
fn derive_k2(k1: &[u8], pub_key: &[u8]) -> Zeroizing<[u8; 64]> {
    let mut hasher = Sha512::new();
    hasher.update(k1);
    hasher.update(pub_key);
    let digest = hasher.finalize();
    let mut out = [0u8; 64];
    out.copy_from_slice(&digest);
    Zeroizing::new(out)
}

/// Full master-key derivation chain for one `kmlconfig.json` slot (spec
/// §4.8 steps 1-4):
///
/// 1. `pw = base64_encode(base64_decode(extent_key)[0..20])`
///    ([`derive_unlock_password`]).
/// 2. `k1 = Argon2id(pw, system.salt, system.level)`.
/// 3. `k2 = SHA-512(k1 || slot.public_key)`.
/// 4. `master = AES-XTS-decrypt(slot.wrapped_private_key, key =
///    k2[0..32], iv = k2[32..64])`.
///
/// `extent_key` is the slot's base64-encoded unlocking secret as carried
/// in `kmlconfig.json`, not [`crate::crypto::kdf::extent_key`]'s
/// `boot_id`-derived XChaCha20-Poly1305 key; the two are unrelated (see
/// `crate::crypto::kdf`'s doc comment).
///
/// This implementation reuses [`unwrap_key`]'s existing 64-byte
/// AES-256-XTS convention (the format `aes-xts-plain64` with key-size
/// 512 names in spec §4.8 "Container modes") for step 4, treating the
/// full 64-byte `k2` as that XTS key pair and sector `0`, since a single
/// fixed-size wrapped blob carries no sequential sector number of its
/// own to tweak by, so there is nothing sector `0` would collide with.
/// Recorded as a design decision in `DESIGN.md`.
pub fn derive_master_key(extent_key: &[u8], system: &SystemConfig, slot: &Slot) -> Result<Zeroizing<Vec<u8>>> {
    let password = derive_unlock_password(extent_key)?;
    let k1 = derive_k1(password.as_bytes(), &system.salt, system.level.clone().into())?;
    let k2 = derive_k2(&k1, &slot.public_key);
    let master = unwrap_key(&k2, 0, &slot.wrapped_private_key)?;
    Ok(Zeroizing::new(master))
}

/// Filesystem key unwrap (spec §4.8): unwraps one `keys[]` entry
/// identically to [`derive_master_key`], using `master` as `k1` and the
/// entry's own public key material (if present) in place of a slot's
/// `public_key`. The result is the dm-crypt key for partition
/// `entry.minor`.
pub fn unwrap_filesystem_key(master: &[u8], pub_key: &[u8], entry: &KeyEntry) -> Result<Zeroizing<Vec<u8>>> {
    let k2 = derive_k2(master, pub_key);
    let key = unwrap_key(&k2, 0, &entry.wrapped_key)?;
    Ok(Zeroizing::new(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encrypt_and_unwrap() {
        let xts_key = [0x11u8; 64];
        let cipher_1 = Aes256::new_from_slice(&xts_key[..32]).unwrap();
        let cipher_2 = Aes256::new_from_slice(&xts_key[32..]).unwrap();
        let xts = Xts128::new(cipher_1, cipher_2);

        let mut buffer = alloc::vec![0x42u8; 32];
        xts.encrypt_area(&mut buffer, SECTOR_SIZE, 7u128, get_tweak_default);

        let key = unwrap_key(&xts_key, 7, &buffer).unwrap();
        assert_eq!(key, alloc::vec![0x42u8; 32]);
    }

    #[test]
    fn wrong_sector_does_not_recover_plaintext() {
        let xts_key = [0x11u8; 64];
        let cipher_1 = Aes256::new_from_slice(&xts_key[..32]).unwrap();
        let cipher_2 = Aes256::new_from_slice(&xts_key[32..]).unwrap();
        let xts = Xts128::new(cipher_1, cipher_2);

        let mut buffer = alloc::vec![0x42u8; 32];
        xts.encrypt_area(&mut buffer, SECTOR_SIZE, 7u128, get_tweak_default);

        let key = unwrap_key(&xts_key, 8, &buffer).unwrap();
        assert_ne!(key, alloc::vec![0x42u8; 32]);
    }

    #[test]
    fn rejects_non_block_aligned_input() {
        let xts_key = [0u8; 64];
        assert!(unwrap_key(&xts_key, 0, &[1, 2, 3]).is_err());
    }

    #[test]
    fn master_key_derivation_is_deterministic() {
        use base64::engine::general_purpose::STANDARD as BASE64;
        use base64::Engine;

        use crate::crypto::kmlconfig::KdfLevelConfig;

        let system = SystemConfig {
            salt: alloc::vec![0xAAu8; 16],
            level: KdfLevelConfig::Interactive,
        };
        // A wrapped_private_key is ciphertext of arbitrary length (a
        // whole number of AES blocks); a fixture doesn't need to be
        // recoverable plaintext to exercise determinism.
        let slot = Slot {
            name: "default".into(),
            public_key: alloc::vec![1, 2, 3, 4],
            wrapped_private_key: alloc::vec![0u8; 512],
        };
        let extent_key = BASE64.encode([0x11u8; 32]);
        let a = derive_master_key(extent_key.as_bytes(), &system, &slot).unwrap();
        let b = derive_master_key(extent_key.as_bytes(), &system, &slot).unwrap();
        assert_eq!(*a, *b);
    }
}
