//! igfs: a reader/writer for the IGEL OS firmware thin-client filesystem
//! image format (IGFS): section-linked-list layout, directory
//! resolution, CRC32/BLAKE2b/RSA integrity verification, and (with the
//! `crypto` feature) KML-encrypted extent decryption.
//!
//! Split into raw on-disk structures ([`structures::raw`]), a typed
//! facade over a seekable backend ([`fs::Filesystem`]), and a dedicated
//! error enum ([`error::IgfsError`]).

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod fs;
pub mod payloads;
pub mod store;
pub mod structures;

#[cfg(feature = "integrity")]
pub mod integrity;

#[cfg(feature = "crypto")]
pub mod crypto;

pub use error::{IgfsError, Result};
pub use igfs_io::{Read, Seek, SeekFrom, Write};
