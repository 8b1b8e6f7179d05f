//! The filesystem facade (spec §4.6): opens an image, resolves the
//! section-zero directory, and walks a partition's section-linked list
//! to assemble extent payloads.
//!
//! A thin typed wrapper around a `&'a mut T: Read + Write + Seek` plus
//! whatever metadata has to be read once up front, so a caller keeps
//! ownership of the backing file or buffer across the facade's
//! lifetime.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use igfs_io::{Read, Seek, SeekFrom, Write};

use crate::error::{IgfsError, Result};
use crate::store::SectionStore;
use crate::structures::directory::Directory;
use crate::structures::partition::Partition;
use crate::structures::raw::partition_header::ExtentType;
use crate::structures::raw::section_header::{SectionHeader, CRC_OFFSET, DEFAULT_SECTION_SIZE};
use crate::structures::section::Section;

/// How many directory-entry counts precede the partition/fragment tables
/// in section zero's payload: `n_partitions: u32` then `n_fragments:
/// u32`, little-endian, immediately after the section header. This is
/// this implementation's resolution of how a reader is meant to know
/// the directory's size ahead of parsing it (see `DESIGN.md`).
const DIRECTORY_COUNTS_SIZE: usize = 8;

/// Called during [`Filesystem::walk_chain`]; returning `false` aborts
/// the walk with [`IgfsError::Cancelled`] (spec §4.6).
pub trait ChainProgress {
    fn on_section(&mut self, step: u32, section_number: u32) -> bool;
}

impl<F: FnMut(u32, u32) -> bool> ChainProgress for F {
    fn on_section(&mut self, step: u32, section_number: u32) -> bool {
        self(step, section_number)
    }
}

pub struct Filesystem<'a, T: Read + Write + Seek> {
    store: SectionStore<'a, T>,
    directory: Directory,
}

impl<'a, T: Read + Write + Seek> Filesystem<'a, T> {
    /// Opens an image whose sections are `DEFAULT_SECTION_SIZE` bytes.
    /// For images formatted at a non-default section size, use
    /// [`Self::open_with_section_size`].
    pub fn open(data: &'a mut T) -> Result<Self> {
        Self::open_with_section_size(data, DEFAULT_SECTION_SIZE as u64)
    }

    pub fn open_with_section_size(data: &'a mut T, section_size: u64) -> Result<Self> {
        let mut store = SectionStore::new(data, section_size)?;
        let section0 = store.read_section(0)?;
        if !section0.header.check_magic() {
            return Err(IgfsError::InvalidImage("section zero has no IGFS magic"));
        }
        let derived = section0.derive()?;
        let payload = derived.payload(&section0);
        if payload.len() < DIRECTORY_COUNTS_SIZE {
            return Err(IgfsError::CorruptDirectory(
                "section zero too small for directory counts",
            ));
        }
        let n_partitions = u32::from_le_bytes(payload[0..4].try_into().unwrap()) as usize;
        let n_fragments = u32::from_le_bytes(payload[4..8].try_into().unwrap()) as usize;
        let directory = Directory::parse(
            &payload[DIRECTORY_COUNTS_SIZE..],
            n_partitions,
            n_fragments,
        )?;

        #[cfg(feature = "std")]
        tracing::debug!(
            section_count = store.section_count(),
            n_partitions,
            n_fragments,
            "opened image"
        );

        Ok(Self { store, directory })
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn section_count(&self) -> u32 {
        self.store.section_count()
    }

    /// Reads `minor`'s first section and returns its header and extent
    /// table.
    pub fn get_partition(&mut self, minor: u32) -> Result<Partition> {
        let first_section = self.directory.first_section_of(minor)?;
        let section = self.store.read_section(first_section)?;
        let derived = section.derive()?;
        derived.partition.ok_or(IgfsError::CorruptDirectory(
            "partition's first section carries no partition header",
        ))
    }

    /// Reads `minor`'s first section and returns its hash block, if the
    /// partition carries one.
    pub fn get_hash_block(&mut self, minor: u32) -> Result<crate::structures::hash::HashBlock> {
        let first_section = self.directory.first_section_of(minor)?;
        let section = self.store.read_section(first_section)?;
        let derived = section.derive()?;
        derived.hash.ok_or(IgfsError::CorruptDirectory(
            "partition has no hash block despite HAS_HASH_BLOCK",
        ))
    }

    /// Walks `minor`'s section-linked list from its first section to the
    /// end-of-chain marker, calling `progress` for each section visited
    /// and returning every section paired with its physical section
    /// number. Detects cycles by bounding the walk at `section_count`
    /// steps, since no well-formed chain can be longer than the image
    /// itself (spec §4.6).
    ///
    /// Fails closed on two invariants as it walks (spec §4.6): every
    /// section's `partition_minor` must equal `minor`, and
    /// `section_in_minor` must never go backwards along the chain.
    pub fn walk_chain(
        &mut self,
        minor: u32,
        mut progress: impl ChainProgress,
    ) -> Result<Vec<(u32, Section)>> {
        let first_section = self.directory.first_section_of(minor)?;
        let mut sections = Vec::new();
        let mut current = first_section;
        let limit = self.store.section_count();
        let mut last_in_minor: Option<u32> = None;
        let mut visited = BTreeSet::new();

        for step in 0..=limit {
            if step == limit || !visited.insert(current) {
                #[cfg(feature = "std")]
                tracing::warn!(minor, section = current, "partition chain revisits a section");
                return Err(IgfsError::CycleDetected(minor));
            }
            let section = self.store.read_section(current)?;
            #[cfg(feature = "std")]
            tracing::trace!(
                minor,
                step,
                section = current,
                section_in_minor = section.header.section_in_minor,
                "walking chain"
            );

            if section.header.partition_minor != minor {
                #[cfg(feature = "std")]
                tracing::warn!(
                    minor,
                    section = current,
                    found_minor = section.header.partition_minor,
                    "chain walk hit a section belonging to a different partition"
                );
                return Err(IgfsError::CorruptDirectory(
                    "section's partition_minor does not match the owning partition",
                ));
            }
            if let Some(last) = last_in_minor {
                if section.header.section_in_minor < last {
                    #[cfg(feature = "std")]
                    tracing::warn!(
                        minor,
                        section = current,
                        "chain walk found a section_in_minor that went backwards"
                    );
                    return Err(IgfsError::CorruptDirectory(
                        "section_in_minor is not nondecreasing along the chain",
                    ));
                }
            }
            last_in_minor = Some(section.header.section_in_minor);

            if !progress.on_section(step, current) {
                return Err(IgfsError::Cancelled);
            }
            let next = section.header.next_section;
            let is_end = section.header.is_end_of_chain();
            let number = current;
            sections.push((number, section));
            if is_end {
                break;
            }
            current = next;
        }

        Ok(sections)
    }

    /// Reads an extent's bytes by walking the chain and slicing the
    /// concatenation of every section's payload at the extent's declared
    /// `offset`/`length` within the partition's payload.
    pub fn get_extent(&mut self, minor: u32, extent_type: ExtentType) -> Result<Vec<u8>> {
        let partition = self.get_partition(minor)?;
        let extent = partition
            .extent(extent_type)
            .ok_or(IgfsError::CorruptDirectory(
                "no extent of the requested type",
            ))?
            .clone();

        let sections = self.walk_chain(minor, |_, _| true)?;
        let mut payload = Vec::new();
        for (_, section) in &sections {
            let derived = section.derive()?;
            payload.extend_from_slice(derived.payload(section));
        }

        let start = extent.offset as usize;
        let end = start
            .checked_add(extent.length as usize)
            .ok_or(IgfsError::CorruptDirectory("extent length overflow"))?;
        payload
            .get(start..end)
            .map(|s| s.to_vec())
            .ok_or(IgfsError::CorruptDirectory(
                "extent range exceeds partition payload",
            ))
    }

    /// Overwrites `minor`'s partition payload, re-chunking `bytes` across
    /// the partition's existing sections (spec §4.6). The total byte
    /// count must not exceed the partition's current total payload
    /// capacity; growing a partition is out of scope (spec §1 Non-goals).
    pub fn write_bytes(&mut self, minor: u32, bytes: &[u8]) -> Result<()> {
        let sections = self.walk_chain(minor, |_, _| true)?;
        let mut cursor = 0usize;

        for (number, section) in sections {
            let derived = section.derive()?;
            let payload_capacity = section.rest.len() - derived.payload_offset;
            let chunk_len = payload_capacity.min(bytes.len().saturating_sub(cursor));

            let mut rest = section.rest.clone();
            rest[derived.payload_offset..derived.payload_offset + chunk_len]
                .copy_from_slice(&bytes[cursor..cursor + chunk_len]);
            cursor += chunk_len;

            let mut full = Vec::with_capacity(SectionHeader::SIZE + rest.len());
            full.resize(SectionHeader::SIZE, 0);
            igfs_common::model::Model::serialize(&section.header, &mut full[..SectionHeader::SIZE])?;
            full.extend_from_slice(&rest);

            let crc = igfs_common::crc::SectionCrc32::checksum(&full[CRC_OFFSET..]);
            full[0..4].copy_from_slice(&crc.to_le_bytes());

            self.store.write_section(number, &full)?;
        }

        if cursor < bytes.len() {
            return Err(IgfsError::InvalidImage(
                "data exceeds partition's existing payload capacity",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::raw::directory::{FragmentDescriptor, PartitionDescriptor};
    use crate::structures::raw::partition_header::{ExtentDescriptor, PartitionFlags, PartitionHeader};
    use crate::structures::raw::section_header::SECTION_MAGIC;
    use crate::structures::section::build_section;
    use igfs_common::model::Model;
    use igfs_common::strutil::FixedStr;
    use std::io::Cursor;

    const SECTION_SIZE: usize = 4096;

    fn header(section_in_minor: u32, partition_minor: u32, next: u32) -> SectionHeader {
        SectionHeader {
            crc: 0,
            magic: SECTION_MAGIC,
            section_type: 0,
            section_size_exponent: 12,
            partition_minor,
            generation: 1,
            section_in_minor,
            next_section: next,
        }
    }

    fn build_image() -> Vec<u8> {
        let mut directory_payload = Vec::new();
        directory_payload.extend_from_slice(&1u32.to_le_bytes()); // n_partitions
        directory_payload.extend_from_slice(&1u32.to_le_bytes()); // n_fragments

        let descriptor = PartitionDescriptor {
            minor: 1,
            first_fragment: 0,
            flags: 0,
        };
        let mut bytes = [0u8; PartitionDescriptor::SIZE];
        descriptor.serialize(&mut bytes).unwrap();
        directory_payload.extend_from_slice(&bytes);

        let fragment = FragmentDescriptor {
            first_section: 1,
            length: 1,
        };
        let mut bytes = [0u8; FragmentDescriptor::SIZE];
        fragment.serialize(&mut bytes).unwrap();
        directory_payload.extend_from_slice(&bytes);

        let section0 = build_section(
            &header(0, 0, 0xFFFF_FFFF),
            None,
            None,
            &directory_payload,
            SECTION_SIZE,
        )
        .unwrap();

        let partition_header = PartitionHeader {
            partition_type: 1,
            flags: PartitionFlags::empty(),
            partition_minor: 1,
            n_extents: 1,
            offset_blocktable: 0,
            partition_size: SECTION_SIZE as u64,
            name: FixedStr::new_truncate("root"),
        };
        let extents = alloc::vec![ExtentDescriptor {
            extent_type: ExtentType::Squashfs,
            offset: 0,
            length: 4,
            name: FixedStr::new_truncate("rootfs"),
        }];
        let section1 = build_section(
            &header(0, 1, 0xFFFF_FFFF),
            Some((&partition_header, &extents)),
            None,
            b"data",
            SECTION_SIZE,
        )
        .unwrap();

        let mut image = Vec::with_capacity(SECTION_SIZE * 2);
        image.extend_from_slice(&section0);
        image.extend_from_slice(&section1);
        image
    }

    #[test]
    fn opens_image_and_resolves_directory() {
        let mut image = build_image();
        let mut cursor = Cursor::new(&mut image[..]);
        let fs = Filesystem::open_with_section_size(&mut cursor, SECTION_SIZE as u64).unwrap();
        assert_eq!(fs.section_count(), 2);
        assert_eq!(fs.directory().minors().collect::<Vec<_>>(), alloc::vec![1]);
    }

    #[test]
    fn reads_partition_and_extent() {
        let mut image = build_image();
        let mut cursor = Cursor::new(&mut image[..]);
        let mut fs = Filesystem::open_with_section_size(&mut cursor, SECTION_SIZE as u64).unwrap();

        let partition = fs.get_partition(1).unwrap();
        assert_eq!(partition.extents.len(), 1);

        let bytes = fs.get_extent(1, ExtentType::Squashfs).unwrap();
        assert_eq!(bytes, b"data");
    }

    #[test]
    fn unknown_minor_errors() {
        let mut image = build_image();
        let mut cursor = Cursor::new(&mut image[..]);
        let mut fs = Filesystem::open_with_section_size(&mut cursor, SECTION_SIZE as u64).unwrap();
        assert!(matches!(
            fs.get_partition(99),
            Err(IgfsError::CorruptDirectory(_))
        ));
    }
}
