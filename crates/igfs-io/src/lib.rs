//! IGFS IO
//!
//! Provides the `Read`/`Write`/`Seek` traits the section store is generic
//! over, plus a bounds-checked little-endian byte codec for the fixed-width
//! integer fields used throughout the on-disk model.
//!
//! With the `std` feature (the default), the standard library's IO types
//! are re-exported directly rather than re-declared, so callers can mix
//! this crate's APIs with `std::io` without a wrapper getting in the way.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
pub use std::io::{Error, ErrorKind, Read, Result, Seek, SeekFrom, Write};

#[cfg(not(feature = "std"))]
mod error;
#[cfg(not(feature = "std"))]
pub use error::{Error, ErrorKind};

pub mod codec;
