//! The section model (spec §4.4, component 4): section header, optional
//! partition block, optional hash block, and payload.
//!
//! Parsing is staged in two steps, per design note §9: [`Section::parse`]
//! only decodes the fixed [`SectionHeader`] and keeps the remainder as
//! opaque bytes; [`Section::derive`] re-parses that remainder into the
//! partition/hash/payload groups. Keeping this explicit (rather than doing
//! it inside `parse`) means a corrupt partition header never prevents a
//! caller from at least reading a section's header, and makes round-trip
//! and error paths independently testable.

use alloc::vec;
use alloc::vec::Vec;

use igfs_common::model::Model;

use crate::error::{IgfsError, Result};
use crate::structures::hash::HashBlock;
use crate::structures::partition::Partition;
use crate::structures::raw::hash_block::{HashExclude, HashHeader};
use crate::structures::raw::partition_header::{ExtentDescriptor, PartitionHeader};
use crate::structures::raw::section_header::{SectionHeader, CRC_OFFSET, SECTION_MAGIC};

/// A section's header plus every byte that follows it, still in its raw
/// on-disk form. [`Self::derive`] parses the "rest" into its constituent
/// groups (spec §4.4 step 2-4).
#[derive(Debug, Clone)]
pub struct Section {
    pub header: SectionHeader,
    pub rest: Vec<u8>,
}

/// The optional groups derived from [`Section::rest`] (spec §4.4).
#[derive(Debug, Clone, Default)]
pub struct DerivedSection {
    pub partition: Option<Partition>,
    pub hash: Option<HashBlock>,
    /// Byte offset of the payload within [`Section::rest`].
    pub payload_offset: usize,
}

impl Section {
    /// Parses a section's header and keeps the remainder verbatim. Does
    /// not validate the magic; callers that require a valid section
    /// should call [`SectionHeader::check_magic`] explicitly (read-time
    /// verification policy differs by call site, spec §4.7).
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let header = SectionHeader::parse(bytes)?;
        let rest = bytes[SectionHeader::SIZE..].to_vec();
        Ok(Self { header, rest })
    }

    /// Re-parses [`Self::rest`] into the partition/hash/payload groups.
    ///
    /// Best-effort: a partition block is only attempted on
    /// `section_in_minor == 0`, and a hash block is only attempted when
    /// the partition header says one follows. Both are absent on
    /// non-first sections, matching spec §4.4.
    pub fn derive(&self) -> Result<DerivedSection> {
        let mut offset = 0usize;
        let mut partition = None;

        if self.header.section_in_minor == 0 && self.header.partition_minor != 0 {
            let header = PartitionHeader::parse(&self.rest[offset..])?;
            offset += PartitionHeader::SIZE;
            let mut extents = Vec::with_capacity(header.n_extents as usize);
            for _ in 0..header.n_extents {
                let extent = ExtentDescriptor::parse(&self.rest[offset..])?;
                offset += ExtentDescriptor::SIZE;
                extents.push(extent);
            }
            let has_hash_block = header.has_hash_block();
            partition = Some(Partition { header, extents });

            if has_hash_block {
                let hh = HashHeader::parse(&self.rest[offset..])?;
                offset += HashHeader::SIZE;
                let mut excludes = Vec::with_capacity(hh.count_excludes as usize);
                for _ in 0..hh.count_excludes {
                    excludes.push(HashExclude::parse(&self.rest[offset..])?);
                    offset += HashExclude::SIZE;
                }
                let hash_block_size = hh.hash_block_size() as usize;
                let hash_values = self.rest[offset..offset + hash_block_size].to_vec();
                offset += hash_block_size;
                return Ok(DerivedSection {
                    partition,
                    hash: Some(HashBlock {
                        header: hh,
                        excludes,
                        hash_values,
                    }),
                    payload_offset: offset,
                });
            }
        }

        Ok(DerivedSection {
            partition,
            hash: None,
            payload_offset: offset,
        })
    }

    pub fn section_size(&self) -> usize {
        SectionHeader::SIZE + self.rest.len()
    }
}

impl DerivedSection {
    pub fn payload<'a>(&self, section: &'a Section) -> &'a [u8] {
        &section.rest[self.payload_offset..]
    }
}

/// Serializes a section in parsing order (header, partition block, hash
/// block, payload), zero-padded to `section_size`, with the CRC computed
/// **last** over the fully-assembled buffer (spec §4.4, §4.7 write
/// ordering).
pub fn build_section(
    header: &SectionHeader,
    partition: Option<(&PartitionHeader, &[ExtentDescriptor])>,
    hash: Option<(&HashHeader, &[HashExclude], &[u8])>,
    payload: &[u8],
    section_size: usize,
) -> Result<Vec<u8>> {
    if !header.check_magic() {
        return Err(IgfsError::InvalidMagic {
            where_: "SectionHeader",
            expected: SECTION_MAGIC,
            got: header.magic,
        });
    }

    let mut buf = vec![0u8; section_size];
    header.serialize(&mut buf[..SectionHeader::SIZE])?;
    let mut offset = SectionHeader::SIZE;

    if let Some((partition_header, extents)) = partition {
        partition_header.serialize(&mut buf[offset..offset + PartitionHeader::SIZE])?;
        offset += PartitionHeader::SIZE;
        for extent in extents {
            extent.serialize(&mut buf[offset..offset + ExtentDescriptor::SIZE])?;
            offset += ExtentDescriptor::SIZE;
        }
    }

    if let Some((hash_header, excludes, hash_values)) = hash {
        hash_header.serialize(&mut buf[offset..offset + HashHeader::SIZE])?;
        offset += HashHeader::SIZE;
        for exclude in excludes {
            exclude.serialize(&mut buf[offset..offset + HashExclude::SIZE])?;
            offset += HashExclude::SIZE;
        }
        buf[offset..offset + hash_values.len()].copy_from_slice(hash_values);
        offset += hash_values.len();
    }

    let payload_len = payload.len().min(section_size.saturating_sub(offset));
    buf[offset..offset + payload_len].copy_from_slice(&payload[..payload_len]);

    let crc = igfs_common::crc::SectionCrc32::checksum(&buf[CRC_OFFSET..]);
    buf[0..4].copy_from_slice(&crc.to_le_bytes());

    Ok(buf)
}
