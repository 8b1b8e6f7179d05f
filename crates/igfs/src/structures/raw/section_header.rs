//! On-disk `SectionHeader` (spec §3.2).
//!
//! `#[repr(C, packed)]` + `bytemuck`: zero-copy parsing of a slice known
//! to be the right length, paired with a higher-level "info" type for
//! ergonomic field access.
//!
//! Field order here satisfies the three mandatory exclude ranges in
//! spec §4.7 (`crc` at 0..4, `generation` at 16..18, `next_section` at
//! 22..26); the distilled spec calls its own per-field offsets in §3.2
//! "illustrative" and defers to the exclude table as authoritative, so
//! the reserved gaps below exist to make both tables agree exactly.

use igfs_common::model::{FieldDescriptor, Model, ModelError};
use igfs_io::codec::{ByteReader, ByteWriter};

/// Section magic: the ASCII bytes `"IGEL"` read as a little-endian u32.
pub const SECTION_MAGIC: u32 = u32::from_le_bytes(*b"IGEL");

/// Byte offset of the CRC field; CRC32 covers `bytes[CRC_OFFSET..]`.
pub const CRC_OFFSET: usize = 4;

/// End-of-chain marker for `next_section`.
pub const END_OF_CHAIN: u32 = 0xFFFF_FFFF;

/// Default section size: 256 KiB.
pub const DEFAULT_SECTION_SIZE: usize = 262_144;

#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern, Debug)]
pub struct RawSectionHeader {
    pub crc: [u8; 4],
    pub magic: [u8; 4],
    pub section_type: u8,
    pub section_size_exponent: u8,
    pub reserved0: [u8; 2],
    pub partition_minor: [u8; 4],
    pub generation: [u8; 2],
    pub section_in_minor: [u8; 4],
    pub next_section: [u8; 4],
    pub reserved1: [u8; 6],
}

impl RawSectionHeader {
    pub fn from_bytes(bytes: &[u8]) -> &Self {
        bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> &mut Self {
        bytemuck::from_bytes_mut(&mut bytes[..Self::SIZE])
    }
}

/// The ergonomic, host-endian view of [`RawSectionHeader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub crc: u32,
    pub magic: u32,
    pub section_type: u8,
    pub section_size_exponent: u8,
    pub partition_minor: u32,
    pub generation: u16,
    pub section_in_minor: u32,
    pub next_section: u32,
}

impl SectionHeader {
    pub const SIZE: usize = 32;

    /// Section size implied by `section_size_exponent` (`1 << exponent`).
    pub fn section_size(&self) -> usize {
        1usize << self.section_size_exponent
    }

    pub fn is_end_of_chain(&self) -> bool {
        self.next_section == END_OF_CHAIN
    }

    pub fn check_magic(&self) -> bool {
        self.magic == SECTION_MAGIC
    }
}

impl Model for SectionHeader {
    const SIZE: usize = 32;
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("crc", 0, 4),
        FieldDescriptor::new("magic", 4, 4),
        FieldDescriptor::new("section_type", 8, 1),
        FieldDescriptor::new("section_size_exponent", 9, 1),
        FieldDescriptor::new("partition_minor", 12, 4),
        FieldDescriptor::new("generation", 16, 2),
        FieldDescriptor::new("section_in_minor", 18, 4),
        FieldDescriptor::new("next_section", 22, 4),
    ];

    fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        igfs_common::model::check_len(bytes, Self::SIZE)?;
        let mut r = ByteReader::new(bytes);
        let crc = r.read_u32_le().unwrap();
        let magic = r.read_u32_le().unwrap();
        let section_type = r.read_u8().unwrap();
        let section_size_exponent = r.read_u8().unwrap();
        r.skip(2).unwrap();
        let partition_minor = r.read_u32_le().unwrap();
        let generation = r.read_u16_le().unwrap();
        let section_in_minor = r.read_u32_le().unwrap();
        let next_section = r.read_u32_le().unwrap();
        Ok(Self {
            crc,
            magic,
            section_type,
            section_size_exponent,
            partition_minor,
            generation,
            section_in_minor,
            next_section,
        })
    }

    fn serialize(&self, out: &mut [u8]) -> Result<(), ModelError> {
        igfs_common::model::check_len(out, Self::SIZE)?;
        let mut w = ByteWriter::new(out);
        w.write_u32_le(self.crc).unwrap();
        w.write_u32_le(self.magic).unwrap();
        w.write_u8(self.section_type).unwrap();
        w.write_u8(self.section_size_exponent).unwrap();
        w.write_bytes(&[0, 0]).unwrap();
        w.write_u32_le(self.partition_minor).unwrap();
        w.write_u16_le(self.generation).unwrap();
        w.write_u32_le(self.section_in_minor).unwrap();
        w.write_u32_le(self.next_section).unwrap();
        w.write_bytes(&[0; 6]).unwrap();
        Ok(())
    }

    fn default_value() -> Self {
        Self {
            crc: 0,
            magic: SECTION_MAGIC,
            section_type: 0,
            section_size_exponent: 18, // 1 << 18 == 262144
            partition_minor: 0,
            generation: 0,
            section_in_minor: 0,
            next_section: END_OF_CHAIN,
        }
    }
}
