//! Section-zero directory records (spec §3.7): the partition descriptor
//! table and the fragment table it indexes into.

use igfs_common::model::{FieldDescriptor, Model, ModelError};
use igfs_io::codec::{ByteReader, ByteWriter};

/// Sentinel `minor` marking an unused directory slot.
pub const UNUSED_MINOR: u32 = 0xFFFF_FFFF;

#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern, Debug)]
pub struct RawPartitionDescriptor {
    pub minor: [u8; 4],
    pub first_fragment: [u8; 4],
    pub flags: [u8; 4],
    pub reserved: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionDescriptor {
    pub minor: u32,
    pub first_fragment: u32,
    pub flags: u32,
}

impl PartitionDescriptor {
    pub fn is_unused(&self) -> bool {
        self.minor == UNUSED_MINOR
    }
}

impl Model for PartitionDescriptor {
    const SIZE: usize = 16;
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("minor", 0, 4),
        FieldDescriptor::new("first_fragment", 4, 4),
        FieldDescriptor::new("flags", 8, 4),
    ];

    fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        igfs_common::model::check_len(bytes, Self::SIZE)?;
        let mut r = ByteReader::new(bytes);
        Ok(Self {
            minor: r.read_u32_le().unwrap(),
            first_fragment: r.read_u32_le().unwrap(),
            flags: r.read_u32_le().unwrap(),
        })
    }

    fn serialize(&self, out: &mut [u8]) -> Result<(), ModelError> {
        igfs_common::model::check_len(out, Self::SIZE)?;
        let mut w = ByteWriter::new(out);
        w.write_u32_le(self.minor).unwrap();
        w.write_u32_le(self.first_fragment).unwrap();
        w.write_u32_le(self.flags).unwrap();
        w.write_bytes(&[0; 4]).unwrap();
        Ok(())
    }

    fn default_value() -> Self {
        Self {
            minor: UNUSED_MINOR,
            first_fragment: 0,
            flags: 0,
        }
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern, Debug)]
pub struct RawFragmentDescriptor {
    pub first_section: [u8; 4],
    pub length: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentDescriptor {
    pub first_section: u32,
    pub length: u32,
}

impl Model for FragmentDescriptor {
    const SIZE: usize = 8;
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("first_section", 0, 4),
        FieldDescriptor::new("length", 4, 4),
    ];

    fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        igfs_common::model::check_len(bytes, Self::SIZE)?;
        let mut r = ByteReader::new(bytes);
        Ok(Self {
            first_section: r.read_u32_le().unwrap(),
            length: r.read_u32_le().unwrap(),
        })
    }

    fn serialize(&self, out: &mut [u8]) -> Result<(), ModelError> {
        igfs_common::model::check_len(out, Self::SIZE)?;
        let mut w = ByteWriter::new(out);
        w.write_u32_le(self.first_section).unwrap();
        w.write_u32_le(self.length).unwrap();
        Ok(())
    }

    fn default_value() -> Self {
        Self {
            first_section: 0,
            length: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::size_of;
    use static_assertions::const_assert_eq;

    const_assert_eq!(size_of::<RawPartitionDescriptor>(), 16);
    const_assert_eq!(size_of::<RawFragmentDescriptor>(), 8);

    #[test]
    fn partition_descriptor_round_trip() {
        let desc = PartitionDescriptor {
            minor: 1,
            first_fragment: 2,
            flags: 0,
        };
        let mut bytes = [0u8; PartitionDescriptor::SIZE];
        desc.serialize(&mut bytes).unwrap();
        assert_eq!(PartitionDescriptor::parse(&bytes).unwrap(), desc);
    }

    #[test]
    fn unused_slot_detection() {
        assert!(PartitionDescriptor::default_value().is_unused());
    }
}
