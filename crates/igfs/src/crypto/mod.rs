//! KML (key management layer) extent encryption (spec §4.8): Argon2id
//! master-key derivation, BLAKE2b-256 per-extent key derivation,
//! AES-XTS key unwrap, and XChaCha20-Poly1305 decryption of the
//! LZF-compressed tar archive an encrypted extent carries.
//!
//! Gated behind the `crypto` feature; this whole module, and the CLI's
//! `decrypt` subcommand that calls into it, disappear when the feature
//! is off rather than returning a runtime error, matching the
//! "capability object" design note (spec §9).

pub mod extent;
pub mod kdf;
pub mod kmlconfig;
pub mod wrap;

pub use extent::decrypt_extent;
pub use kdf::{derive_unlock_password, extent_key, KdfLevel};
pub use kmlconfig::KmlConfig;
pub use wrap::{derive_master_key, unwrap_filesystem_key, unwrap_key};
