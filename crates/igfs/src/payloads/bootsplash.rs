//! Bootsplash extent payload (spec §4.9): the header/info records plus
//! the raw image bytes they describe. Image decoding is the caller's
//! responsibility (spec §1 Non-goals).

use alloc::vec::Vec;

use igfs_common::model::Model;

use crate::error::{IgfsError, Result};
use crate::structures::raw::bootsplash::{BootsplashHeader, BootsplashInfo};

#[derive(Debug, Clone)]
pub struct BootsplashImage {
    pub info: BootsplashInfo,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Bootsplash {
    pub images: Vec<BootsplashImage>,
}

impl Bootsplash {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let header = BootsplashHeader::parse(bytes)?;
        let mut offset = BootsplashHeader::SIZE;

        let mut infos = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            infos.push(BootsplashInfo::parse(&bytes[offset..])?);
            offset += BootsplashInfo::SIZE;
        }

        let mut images = Vec::with_capacity(infos.len());
        for info in infos {
            let start = info.offset as usize;
            let end = start
                .checked_add(info.length as usize)
                .ok_or(IgfsError::CorruptDirectory("bootsplash image length overflow"))?;
            let data = bytes
                .get(start..end)
                .ok_or(IgfsError::CorruptDirectory("bootsplash image out of range"))?
                .to_vec();
            images.push(BootsplashImage { info, data });
        }

        Ok(Self { images })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::raw::bootsplash::BootsplashFormat;

    #[test]
    fn parses_header_and_images() {
        let info = BootsplashInfo {
            offset: (BootsplashHeader::SIZE + BootsplashInfo::SIZE) as u64,
            length: 4,
            format: BootsplashFormat::Png,
            width: 2,
            height: 2,
        };
        let header = BootsplashHeader { count: 1 };

        let mut bytes = alloc::vec![0u8; BootsplashHeader::SIZE + BootsplashInfo::SIZE + 4];
        header.serialize(&mut bytes[..BootsplashHeader::SIZE]).unwrap();
        info.serialize(
            &mut bytes[BootsplashHeader::SIZE..BootsplashHeader::SIZE + BootsplashInfo::SIZE],
        )
        .unwrap();
        bytes[BootsplashHeader::SIZE + BootsplashInfo::SIZE..].copy_from_slice(b"\x89PNG");

        let splash = Bootsplash::parse(&bytes).unwrap();
        assert_eq!(splash.images.len(), 1);
        assert_eq!(splash.images[0].data, b"\x89PNG");
    }
}
