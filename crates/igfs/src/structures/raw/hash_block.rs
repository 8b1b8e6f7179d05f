//! On-disk `HashHeader` and `HashExclude` (spec §3.5).
//!
//! Present only on the first section of a partition that carries
//! [`crate::structures::raw::partition_header::PartitionFlags::HAS_HASH_BLOCK`].
//! Layout, in order: [`RawHashHeader`] (fixed prefix, ending in the RSA
//! signature), then `count_excludes` [`RawHashExclude`] records, then
//! `count_hash * hash_bytes` bytes of BLAKE2b digests (one per section in
//! the partition).
//!
//! The distilled spec gives illustrative absolute byte offsets for the
//! signature and hash-value regions (164/675, 836) that assume a
//! particular preceding-extent-table size and says they "shift" with it;
//! rather than hard-coding those illustrative numbers, [`crate::integrity`]
//! computes the real offsets from the actual section layout (see
//! `DESIGN.md`).

use igfs_common::model::{FieldDescriptor, Model, ModelError};
use igfs_io::codec::{ByteReader, ByteWriter};

pub const SIGNATURE_SIZE: usize = 512;

#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern)]
pub struct RawHashHeader {
    pub hash_bytes: u8,
    pub reserved: [u8; 3],
    pub count_excludes: [u8; 4],
    pub count_hash: [u8; 4],
    pub signature: [u8; SIGNATURE_SIZE],
}

#[derive(Debug, Clone)]
pub struct HashHeader {
    /// BLAKE2b digest size in bytes.
    pub hash_bytes: u8,
    pub count_excludes: u32,
    pub count_hash: u32,
    pub signature: [u8; SIGNATURE_SIZE],
}

impl HashHeader {
    pub fn hash_block_size(&self) -> u64 {
        self.hash_bytes as u64 * self.count_hash as u64
    }
}

impl Model for HashHeader {
    const SIZE: usize = 12 + SIGNATURE_SIZE;
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("hash_bytes", 0, 1),
        FieldDescriptor::new("count_excludes", 4, 4),
        FieldDescriptor::new("count_hash", 8, 4),
        FieldDescriptor::new("signature", 12, SIGNATURE_SIZE),
    ];

    fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        igfs_common::model::check_len(bytes, Self::SIZE)?;
        let mut r = ByteReader::new(bytes);
        let hash_bytes = r.read_u8().unwrap();
        r.skip(3).unwrap();
        let count_excludes = r.read_u32_le().unwrap();
        let count_hash = r.read_u32_le().unwrap();
        let mut signature = [0u8; SIGNATURE_SIZE];
        signature.copy_from_slice(r.read_bytes(SIGNATURE_SIZE).unwrap());
        Ok(Self {
            hash_bytes,
            count_excludes,
            count_hash,
            signature,
        })
    }

    fn serialize(&self, out: &mut [u8]) -> Result<(), ModelError> {
        igfs_common::model::check_len(out, Self::SIZE)?;
        let mut w = ByteWriter::new(out);
        w.write_u8(self.hash_bytes).unwrap();
        w.write_bytes(&[0; 3]).unwrap();
        w.write_u32_le(self.count_excludes).unwrap();
        w.write_u32_le(self.count_hash).unwrap();
        w.write_bytes(&self.signature).unwrap();
        Ok(())
    }

    fn default_value() -> Self {
        Self {
            hash_bytes: 32,
            count_excludes: 0,
            count_hash: 0,
            signature: [0; SIGNATURE_SIZE],
        }
    }
}

/// One excluded byte range, stored as **absolute image byte addresses**
/// (spec §3.5); [`crate::integrity::ExcludeMask`] translates these into
/// per-section offsets.
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern, Debug)]
pub struct RawHashExclude {
    pub start: [u8; 8],
    pub end: [u8; 8],
    pub size: [u8; 8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashExclude {
    pub start: u64,
    pub end: u64,
    pub size: u64,
}

impl Model for HashExclude {
    const SIZE: usize = 24;
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("start", 0, 8),
        FieldDescriptor::new("end", 8, 8),
        FieldDescriptor::new("size", 16, 8),
    ];

    fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        igfs_common::model::check_len(bytes, Self::SIZE)?;
        let mut r = ByteReader::new(bytes);
        Ok(Self {
            start: r.read_u64_le().unwrap(),
            end: r.read_u64_le().unwrap(),
            size: r.read_u64_le().unwrap(),
        })
    }

    fn serialize(&self, out: &mut [u8]) -> Result<(), ModelError> {
        igfs_common::model::check_len(out, Self::SIZE)?;
        let mut w = ByteWriter::new(out);
        w.write_u64_le(self.start).unwrap();
        w.write_u64_le(self.end).unwrap();
        w.write_u64_le(self.size).unwrap();
        Ok(())
    }

    fn default_value() -> Self {
        Self {
            start: 0,
            end: 0,
            size: 0,
        }
    }
}
