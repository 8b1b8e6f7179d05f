//! Boot registry on-disk variants (spec §3.6).
//!
//! The variant is discriminated by a magic value at the registry offset:
//! [`LEGACY_MAGIC`] for the `\n`-separated `key=value` text format, or
//! [`STRUCTURED_MAGIC`] for fixed-width binary entries.
//!
//! The structured entry layout (flag byte encoding, continuation
//! mechanics) is an Open Question in spec §9 ("exact offsets ... open
//! question"); the layout below is this implementation's resolution,
//! recorded in `DESIGN.md`.

use igfs_common::model::{FieldDescriptor, Model, ModelError};
use igfs_io::codec::{ByteReader, ByteWriter};

pub const LEGACY_MAGIC: u32 = u32::from_le_bytes(*b"REGL");
pub const STRUCTURED_MAGIC: u32 = u32::from_le_bytes(*b"REGS");

pub const LEGACY_EOF_LINE: &str = "EOF";

pub const ENTRY_KEY_SIZE: usize = 16;
pub const ENTRY_VALUE_SIZE: usize = 46;

/// A single structured boot registry entry.
///
/// On-disk: 2-byte flag (`size_class` in bits 0..6, `continuation` in bit
/// 6, `deleted` in bit 7), a 16-byte NUL-padded key, and a 46-byte value
/// slot of which `size_class` bytes are significant. An entry with the
/// continuation bit set has its value appended to the *previous* entry's
/// value rather than starting a new key.
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern, Debug)]
pub struct RawStructuredEntry {
    pub flag: [u8; 2],
    pub key: [u8; ENTRY_KEY_SIZE],
    pub value: [u8; ENTRY_VALUE_SIZE],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuredEntryFlag {
    pub size_class: u8,
    pub continuation: bool,
    pub deleted: bool,
}

impl StructuredEntryFlag {
    const SIZE_CLASS_MASK: u16 = 0b0011_1111;
    const CONTINUATION_BIT: u16 = 1 << 6;
    const DELETED_BIT: u16 = 1 << 7;

    pub fn from_bits(bits: u16) -> Self {
        Self {
            size_class: (bits & Self::SIZE_CLASS_MASK) as u8,
            continuation: bits & Self::CONTINUATION_BIT != 0,
            deleted: bits & Self::DELETED_BIT != 0,
        }
    }

    pub fn to_bits(self) -> u16 {
        let mut bits = (self.size_class as u16) & Self::SIZE_CLASS_MASK;
        if self.continuation {
            bits |= Self::CONTINUATION_BIT;
        }
        if self.deleted {
            bits |= Self::DELETED_BIT;
        }
        bits
    }
}

#[derive(Debug, Clone)]
pub struct StructuredEntry {
    pub flag: StructuredEntryFlag,
    pub key: [u8; ENTRY_KEY_SIZE],
    pub value: [u8; ENTRY_VALUE_SIZE],
}

impl StructuredEntry {
    /// The significant prefix of [`Self::value`], per `flag.size_class`.
    pub fn value_bytes(&self) -> &[u8] {
        let len = (self.flag.size_class as usize).min(ENTRY_VALUE_SIZE);
        &self.value[..len]
    }
}

impl Model for StructuredEntry {
    const SIZE: usize = 2 + ENTRY_KEY_SIZE + ENTRY_VALUE_SIZE;
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("flag", 0, 2),
        FieldDescriptor::new("key", 2, ENTRY_KEY_SIZE),
        FieldDescriptor::new("value", 2 + ENTRY_KEY_SIZE, ENTRY_VALUE_SIZE),
    ];

    fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        igfs_common::model::check_len(bytes, Self::SIZE)?;
        let mut r = ByteReader::new(bytes);
        let flag = StructuredEntryFlag::from_bits(r.read_u16_le().unwrap());
        let key = r.read_array::<ENTRY_KEY_SIZE>().unwrap();
        let value = r.read_array::<ENTRY_VALUE_SIZE>().unwrap();
        Ok(Self { flag, key, value })
    }

    fn serialize(&self, out: &mut [u8]) -> Result<(), ModelError> {
        igfs_common::model::check_len(out, Self::SIZE)?;
        let mut w = ByteWriter::new(out);
        w.write_u16_le(self.flag.to_bits()).unwrap();
        w.write_bytes(&self.key).unwrap();
        w.write_bytes(&self.value).unwrap();
        Ok(())
    }

    fn default_value() -> Self {
        Self {
            flag: StructuredEntryFlag {
                size_class: 0,
                continuation: false,
                deleted: true,
            },
            key: [0; ENTRY_KEY_SIZE],
            value: [0; ENTRY_VALUE_SIZE],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::size_of;
    use static_assertions::const_assert_eq;

    const_assert_eq!(size_of::<RawStructuredEntry>(), 64);

    #[test]
    fn flag_bits_round_trip() {
        let flag = StructuredEntryFlag {
            size_class: 20,
            continuation: true,
            deleted: false,
        };
        assert_eq!(StructuredEntryFlag::from_bits(flag.to_bits()), flag);
    }

    #[test]
    fn entry_round_trip() {
        let mut key = [0u8; ENTRY_KEY_SIZE];
        key[..4].copy_from_slice(b"boot");
        let mut value = [0u8; ENTRY_VALUE_SIZE];
        value[..2].copy_from_slice(b"ok");
        let entry = StructuredEntry {
            flag: StructuredEntryFlag {
                size_class: 2,
                continuation: false,
                deleted: false,
            },
            key,
            value,
        };
        let mut bytes = [0u8; StructuredEntry::SIZE];
        entry.serialize(&mut bytes).unwrap();
        let parsed = StructuredEntry::parse(&bytes).unwrap();
        assert_eq!(parsed.value_bytes(), b"ok");
    }
}
