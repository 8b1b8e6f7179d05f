//! IGFS common
//!
//! Shared primitives used by the `igfs` core crate: the declarative model
//! descriptor framework (spec component 2), fixed-width ASCII strings, and
//! the CRC32 checksum used by the integrity pipeline.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod model;
pub mod crc;
pub mod strutil;
