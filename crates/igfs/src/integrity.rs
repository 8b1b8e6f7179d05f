//! The integrity pipeline (spec §4.7): CRC32 per-section checksums,
//! BLAKE2b hash-chain verification, and RSA-4096/SHA-256 signature
//! verification over a partition's hash block.
//!
//! Three exclude byte ranges are mandatory for *every* hash and CRC
//! computation, because they change as a section is written and would
//! otherwise make a section fail to verify against its own stored
//! checksum: `crc` itself (0..4), `generation` (16..18), and
//! `next_section` (22..26). On top of those, a partition's first section
//! also has to exclude its own hash block's signature and digest table
//! from hashing, since a hash can't include the very bytes that record
//! it.
//!
//! This module computes that self-exclusion from the actual parsed
//! layout (field sizes and counts), rather than assuming the
//! illustrative absolute byte offsets sketched in the distilled version
//! of this format, see `crate::structures::raw::hash_block` and
//! `DESIGN.md`.

use alloc::vec::Vec;
use core::ops::Range;

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::Sha256;

use crate::error::{IgfsError, Result};
use crate::fs::Filesystem;
use crate::structures::hash::HashBlock;
use crate::structures::partition::Partition;
use crate::structures::raw::hash_block::{HashExclude, HashHeader, SIGNATURE_SIZE};
use crate::structures::raw::partition_header::{ExtentDescriptor, PartitionHeader};
use crate::structures::raw::section_header::{SectionHeader, CRC_OFFSET};
use igfs_common::model::Model;
use igfs_io::{Read, Seek, Write};

/// Byte ranges within a single section buffer that must be excluded from
/// every hash/signature computation over that section (spec §4.7).
const MANDATORY_EXCLUDES: [Range<usize>; 3] = [0..4, 16..18, 22..26];

/// How deeply [`verify_section`] checks a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyDepth {
    /// CRC32 only, cheap, appropriate for every section read.
    Checksum,
    /// CRC32 plus BLAKE2b hash-chain and RSA signature verification,
    /// expensive, appropriate for boot-time or on-demand deep checks.
    Deep,
}

/// A caller-supplied set of RSA public keys trusted to sign hash blocks
/// (spec §4.7: "verification against trusted embedded keys").
pub struct TrustedKeys<'a> {
    pub keys: &'a [RsaPublicKey],
}

impl<'a> TrustedKeys<'a> {
    pub fn new(keys: &'a [RsaPublicKey]) -> Self {
        Self { keys }
    }

    fn verify(&self, message: &[u8], signature_bytes: &[u8]) -> Result<()> {
        let signature =
            Signature::try_from(signature_bytes).map_err(|_| IgfsError::SignatureInvalid)?;
        for key in self.keys {
            let verifying_key = VerifyingKey::<Sha256>::new(key.clone());
            if verifying_key.verify(message, &signature).is_ok() {
                return Ok(());
            }
        }
        Err(IgfsError::UntrustedSigner)
    }
}

/// Recomputes a section's CRC32 (over every byte but the CRC field
/// itself, spec §4.7) and compares it to the value stored in the header.
/// `section_index` is carried only to identify the section in the
/// returned [`IgfsError::ChecksumFailed`], not used in the computation.
pub fn verify_checksum(section_bytes: &[u8], stored_crc: u32, section_index: u32) -> Result<()> {
    let computed = igfs_common::crc::SectionCrc32::checksum(&section_bytes[CRC_OFFSET..]);
    if computed != stored_crc {
        #[cfg(feature = "std")]
        tracing::warn!(section = section_index, stored_crc, computed, "checksum mismatch");
        return Err(IgfsError::ChecksumFailed(section_index));
    }
    Ok(())
}

/// Hashes `section_bytes` with BLAKE2b at `digest_size` bytes, zeroing
/// every mandatory exclude range and every caller-supplied
/// `extra_excludes` range first, matching the masking the original
/// firmware applies before chaining section hashes together.
fn masked_digest(section_bytes: &[u8], digest_size: usize, extra_excludes: &[Range<usize>]) -> Vec<u8> {
    let mut masked = section_bytes.to_vec();
    for range in MANDATORY_EXCLUDES.iter().chain(extra_excludes) {
        let end = range.end.min(masked.len());
        let start = range.start.min(end);
        masked[start..end].fill(0);
    }
    let mut hasher = Blake2bVar::new(digest_size).expect("digest size within BLAKE2b bounds");
    Update::update(&mut hasher, &masked);
    let mut out = alloc::vec![0u8; digest_size];
    hasher
        .finalize_variable(&mut out)
        .expect("output buffer sized to digest_size");
    out
}

/// The byte ranges, relative to a whole section buffer (header + rest),
/// occupied by a partition's first section's own hash block signature
/// and digest table. Computed from the partition's `n_extents` and the
/// hash block's `count_excludes`/digest size, so it tracks whatever the
/// actual on-disk layout turns out to be rather than a fixed offset.
fn first_section_self_excludes(partition: &Partition, hash: &HashBlock) -> Vec<Range<usize>> {
    let extents_offset = SectionHeader::SIZE + PartitionHeader::SIZE;
    let hash_header_offset = extents_offset + partition.extents.len() * ExtentDescriptor::SIZE;
    let signature_offset = hash_header_offset + (HashHeader::SIZE - SIGNATURE_SIZE);
    let excludes_offset = hash_header_offset + HashHeader::SIZE;
    let hash_values_offset = excludes_offset + hash.excludes.len() * HashExclude::SIZE;
    let hash_values_len = hash.header.hash_block_size() as usize;

    alloc::vec![
        signature_offset..signature_offset + SIGNATURE_SIZE,
        hash_values_offset..hash_values_offset + hash_values_len,
    ]
}

/// Verifies every section of a partition's hash-chained payload against
/// its [`HashBlock`] and, if `trusted` is given, the RSA signature over
/// the hash block itself.
pub fn verify_hash_chain<T: Read + Write + Seek>(
    fs: &mut Filesystem<'_, T>,
    minor: u32,
    partition: &Partition,
    hash: &HashBlock,
    trusted: Option<&TrustedKeys<'_>>,
) -> Result<()> {
    let sections = fs.walk_chain(minor, |_, _| true)?;
    let self_excludes = first_section_self_excludes(partition, hash);

    for (index, (_, section)) in sections.iter().enumerate() {
        let mut buf = alloc::vec![0u8; section.section_size()];
        igfs_common::model::Model::serialize(&section.header, &mut buf[..SectionHeader::SIZE])?;
        buf[SectionHeader::SIZE..].copy_from_slice(&section.rest);

        let extra: &[Range<usize>] = if index == 0 { &self_excludes } else { &[] };
        let digest = masked_digest(&buf, hash.header.hash_bytes as usize, extra);
        let expected = hash.digest_for_section(index as u32)?;
        if digest != expected {
            #[cfg(feature = "std")]
            tracing::warn!(minor, section = index as u32, "hash chain mismatch");
            return Err(IgfsError::HashMismatch(index as u32));
        }
    }

    if let Some(trusted) = trusted {
        if let Err(err) = trusted.verify(&signed_message(hash), &hash.header.signature) {
            #[cfg(feature = "std")]
            tracing::warn!(minor, "hash block signature is not trusted");
            return Err(err);
        }
    }

    Ok(())
}

/// The bytes the hash block's RSA signature is taken over: everything in
/// the hash block except the signature field itself, in on-disk order.
fn signed_message(hash: &HashBlock) -> Vec<u8> {
    let mut message = Vec::new();
    message.push(hash.header.hash_bytes);
    message.extend_from_slice(&hash.header.count_excludes.to_le_bytes());
    message.extend_from_slice(&hash.header.count_hash.to_le_bytes());
    for exclude in &hash.excludes {
        message.extend_from_slice(&exclude.start.to_le_bytes());
        message.extend_from_slice(&exclude.end.to_le_bytes());
        message.extend_from_slice(&exclude.size.to_le_bytes());
    }
    message.extend_from_slice(&hash.hash_values);
    message
}

/// Verifies a single section's CRC32 and, at [`VerifyDepth::Deep`], the
/// whole owning partition's hash chain and signature (spec §4.7's
/// per-read verification policy).
pub fn verify_section<T: Read + Write + Seek>(
    fs: &mut Filesystem<'_, T>,
    minor: u32,
    section_index: u32,
    depth: VerifyDepth,
    trusted: Option<&TrustedKeys<'_>>,
) -> Result<()> {
    let sections = fs.walk_chain(minor, |_, _| true)?;
    let (_, section) = sections
        .iter()
        .find(|(number, _)| *number == section_index)
        .ok_or(IgfsError::OutOfRange {
            index: section_index,
            max: fs.section_count(),
        })?;

    let mut buf = alloc::vec![0u8; section.section_size()];
    igfs_common::model::Model::serialize(&section.header, &mut buf[..SectionHeader::SIZE])?;
    buf[SectionHeader::SIZE..].copy_from_slice(&section.rest);
    verify_checksum(&buf, section.header.crc, section_index)?;

    if depth == VerifyDepth::Deep {
        let partition = fs.get_partition(minor)?;
        if !partition.header.has_hash_block() {
            return Err(IgfsError::InvalidImage(
                "deep verification requested on an unhashed partition",
            ));
        }
        let hash = fs.get_hash_block(minor)?;
        verify_hash_chain(fs, minor, &partition, &hash, trusted)?;
    }

    Ok(())
}
