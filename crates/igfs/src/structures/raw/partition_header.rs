//! On-disk `PartitionHeader` and `ExtentDescriptor` (spec §3.3, §3.4).
//!
//! Both are present only on the first section of a partition
//! (`section_in_minor == 0`); `extent_descriptors` is `n_extents` trailing
//! [`RawExtentDescriptor`] records immediately following the fixed
//! [`RawPartitionHeader`] prefix.

use igfs_common::model::{FieldDescriptor, Model, ModelError};
use igfs_common::strutil::FixedStr;
use igfs_io::codec::{ByteReader, ByteWriter};

bitflags::bitflags! {
    /// Partition-level flags. Bit 0 marks a signed/hashed partition (a
    /// [`crate::structures::raw::hash_block::RawHashHeader`] follows the
    /// extent descriptor table on that partition's first section).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PartitionFlags: u8 {
        const HAS_HASH_BLOCK = 0b0000_0001;
        const READ_ONLY = 0b0000_0010;
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern, Debug)]
pub struct RawPartitionHeader {
    pub partition_type: u8,
    pub flags: u8,
    pub reserved0: [u8; 2],
    pub partition_minor: [u8; 4],
    pub n_extents: [u8; 4],
    pub offset_blocktable: [u8; 4],
    pub partition_size: [u8; 8],
    pub name: [u8; 32],
}

impl RawPartitionHeader {
    pub fn from_bytes(bytes: &[u8]) -> &Self {
        bytemuck::from_bytes(&bytes[..Self::SIZE])
    }
}

#[derive(Debug, Clone)]
pub struct PartitionHeader {
    pub partition_type: u8,
    pub flags: PartitionFlags,
    pub partition_minor: u32,
    pub n_extents: u32,
    pub offset_blocktable: u32,
    pub partition_size: u64,
    pub name: FixedStr<32>,
}

impl PartitionHeader {
    pub fn has_hash_block(&self) -> bool {
        self.flags.contains(PartitionFlags::HAS_HASH_BLOCK)
    }
}

impl Model for PartitionHeader {
    const SIZE: usize = 56;
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("partition_type", 0, 1),
        FieldDescriptor::new("flags", 1, 1),
        FieldDescriptor::new("partition_minor", 4, 4),
        FieldDescriptor::new("n_extents", 8, 4),
        FieldDescriptor::new("offset_blocktable", 12, 4),
        FieldDescriptor::new("partition_size", 16, 8),
        FieldDescriptor::new("name", 24, 32),
    ];

    fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        igfs_common::model::check_len(bytes, Self::SIZE)?;
        let mut r = ByteReader::new(bytes);
        let partition_type = r.read_u8().unwrap();
        let flags = PartitionFlags::from_bits_truncate(r.read_u8().unwrap());
        r.skip(2).unwrap();
        let partition_minor = r.read_u32_le().unwrap();
        let n_extents = r.read_u32_le().unwrap();
        let offset_blocktable = r.read_u32_le().unwrap();
        let partition_size = r.read_u64_le().unwrap();
        let name = FixedStr::from_bytes(r.read_array::<32>().unwrap());
        Ok(Self {
            partition_type,
            flags,
            partition_minor,
            n_extents,
            offset_blocktable,
            partition_size,
            name,
        })
    }

    fn serialize(&self, out: &mut [u8]) -> Result<(), ModelError> {
        igfs_common::model::check_len(out, Self::SIZE)?;
        let mut w = ByteWriter::new(out);
        w.write_u8(self.partition_type).unwrap();
        w.write_u8(self.flags.bits()).unwrap();
        w.write_bytes(&[0, 0]).unwrap();
        w.write_u32_le(self.partition_minor).unwrap();
        w.write_u32_le(self.n_extents).unwrap();
        w.write_u32_le(self.offset_blocktable).unwrap();
        w.write_u64_le(self.partition_size).unwrap();
        w.write_bytes(self.name.as_bytes()).unwrap();
        Ok(())
    }

    fn default_value() -> Self {
        Self {
            partition_type: 0,
            flags: PartitionFlags::empty(),
            partition_minor: 0,
            n_extents: 0,
            offset_blocktable: 0,
            partition_size: 0,
            name: FixedStr::default(),
        }
    }
}

/// Extent types (spec §3.4). Unrecognized on-disk values decode to
/// [`ExtentType::Unknown`] rather than failing, since an unrecognized extent
/// must never block reading a partition's other extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentType {
    Kernel,
    Ramdisk,
    Splash,
    Checksums,
    Squashfs,
    Writeable,
    Login,
    SecToken,
    Unknown(u8),
}

impl From<u8> for ExtentType {
    fn from(value: u8) -> Self {
        match value {
            1 => ExtentType::Kernel,
            2 => ExtentType::Ramdisk,
            3 => ExtentType::Splash,
            4 => ExtentType::Checksums,
            5 => ExtentType::Squashfs,
            6 => ExtentType::Writeable,
            7 => ExtentType::Login,
            8 => ExtentType::SecToken,
            other => ExtentType::Unknown(other),
        }
    }
}

impl From<ExtentType> for u8 {
    fn from(value: ExtentType) -> Self {
        match value {
            ExtentType::Kernel => 1,
            ExtentType::Ramdisk => 2,
            ExtentType::Splash => 3,
            ExtentType::Checksums => 4,
            ExtentType::Squashfs => 5,
            ExtentType::Writeable => 6,
            ExtentType::Login => 7,
            ExtentType::SecToken => 8,
            ExtentType::Unknown(other) => other,
        }
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern, Debug)]
pub struct RawExtentDescriptor {
    pub extent_type: u8,
    pub reserved: [u8; 3],
    pub offset: [u8; 8],
    pub length: [u8; 8],
    pub name: [u8; 32],
}

#[derive(Debug, Clone)]
pub struct ExtentDescriptor {
    pub extent_type: ExtentType,
    /// Byte offset within the partition's concatenated payload.
    pub offset: u64,
    pub length: u64,
    pub name: FixedStr<32>,
}

impl Model for ExtentDescriptor {
    const SIZE: usize = 52;
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("extent_type", 0, 1),
        FieldDescriptor::new("offset", 4, 8),
        FieldDescriptor::new("length", 12, 8),
        FieldDescriptor::new("name", 20, 32),
    ];

    fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        igfs_common::model::check_len(bytes, Self::SIZE)?;
        let mut r = ByteReader::new(bytes);
        let extent_type = ExtentType::from(r.read_u8().unwrap());
        r.skip(3).unwrap();
        let offset = r.read_u64_le().unwrap();
        let length = r.read_u64_le().unwrap();
        let name = FixedStr::from_bytes(r.read_array::<32>().unwrap());
        Ok(Self {
            extent_type,
            offset,
            length,
            name,
        })
    }

    fn serialize(&self, out: &mut [u8]) -> Result<(), ModelError> {
        igfs_common::model::check_len(out, Self::SIZE)?;
        let mut w = ByteWriter::new(out);
        w.write_u8(self.extent_type.into()).unwrap();
        w.write_bytes(&[0; 3]).unwrap();
        w.write_u64_le(self.offset).unwrap();
        w.write_u64_le(self.length).unwrap();
        w.write_bytes(self.name.as_bytes()).unwrap();
        Ok(())
    }

    fn default_value() -> Self {
        Self {
            extent_type: ExtentType::Unknown(0),
            offset: 0,
            length: 0,
            name: FixedStr::default(),
        }
    }
}
