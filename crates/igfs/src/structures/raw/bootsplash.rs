//! `SPLASH` extent payload layout (spec §4.9): a header giving the record
//! count, followed by that many [`RawBootsplashInfo`] records, followed by
//! `n` raw image payloads. Image *decoding* is delegated to the caller
//! (spec §1 explicitly excludes it from this library's scope).

use igfs_common::model::{FieldDescriptor, Model, ModelError};
use igfs_io::codec::{ByteReader, ByteWriter};

#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern, Debug)]
pub struct RawBootsplashHeader {
    pub count: [u8; 4],
    pub reserved: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootsplashHeader {
    pub count: u32,
}

impl Model for BootsplashHeader {
    const SIZE: usize = 8;
    const FIELDS: &'static [FieldDescriptor] = &[FieldDescriptor::new("count", 0, 4)];

    fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        igfs_common::model::check_len(bytes, Self::SIZE)?;
        let mut r = ByteReader::new(bytes);
        let count = r.read_u32_le().unwrap();
        Ok(Self { count })
    }

    fn serialize(&self, out: &mut [u8]) -> Result<(), ModelError> {
        igfs_common::model::check_len(out, Self::SIZE)?;
        let mut w = ByteWriter::new(out);
        w.write_u32_le(self.count).unwrap();
        w.write_bytes(&[0; 4]).unwrap();
        Ok(())
    }

    fn default_value() -> Self {
        Self { count: 0 }
    }
}

/// Image pixel format carried by a `BootsplashInfo` record. Decoding the
/// raw bytes into pixels is out of scope (spec §1); this only labels them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootsplashFormat {
    Bmp,
    Png,
    Jpeg,
    Unknown(u32),
}

impl From<u32> for BootsplashFormat {
    fn from(value: u32) -> Self {
        match value {
            1 => BootsplashFormat::Bmp,
            2 => BootsplashFormat::Png,
            3 => BootsplashFormat::Jpeg,
            other => BootsplashFormat::Unknown(other),
        }
    }
}

impl From<BootsplashFormat> for u32 {
    fn from(value: BootsplashFormat) -> Self {
        match value {
            BootsplashFormat::Bmp => 1,
            BootsplashFormat::Png => 2,
            BootsplashFormat::Jpeg => 3,
            BootsplashFormat::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootsplashInfo {
    pub offset: u64,
    pub length: u64,
    pub format: BootsplashFormat,
    pub width: u32,
    pub height: u32,
}

impl Model for BootsplashInfo {
    const SIZE: usize = 32;
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("offset", 0, 8),
        FieldDescriptor::new("length", 8, 8),
        FieldDescriptor::new("format", 16, 4),
        FieldDescriptor::new("width", 20, 4),
        FieldDescriptor::new("height", 24, 4),
    ];

    fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        igfs_common::model::check_len(bytes, Self::SIZE)?;
        let mut r = ByteReader::new(bytes);
        let offset = r.read_u64_le().unwrap();
        let length = r.read_u64_le().unwrap();
        let format = BootsplashFormat::from(r.read_u32_le().unwrap());
        let width = r.read_u32_le().unwrap();
        let height = r.read_u32_le().unwrap();
        Ok(Self {
            offset,
            length,
            format,
            width,
            height,
        })
    }

    fn serialize(&self, out: &mut [u8]) -> Result<(), ModelError> {
        igfs_common::model::check_len(out, Self::SIZE)?;
        let mut w = ByteWriter::new(out);
        w.write_u64_le(self.offset).unwrap();
        w.write_u64_le(self.length).unwrap();
        w.write_u32_le(self.format.into()).unwrap();
        w.write_u32_le(self.width).unwrap();
        w.write_u32_le(self.height).unwrap();
        w.write_bytes(&[0; 4]).unwrap();
        Ok(())
    }

    fn default_value() -> Self {
        Self {
            offset: 0,
            length: 0,
            format: BootsplashFormat::Unknown(0),
            width: 0,
            height: 0,
        }
    }
}
