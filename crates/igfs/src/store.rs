//! Section store (spec §4.3): read and write whole, fixed-size sections
//! by index over any `Read + Write + Seek` backend, the same way a disk
//! image format addresses its contents by sector number rather than by
//! byte offset.

use igfs_io::{Read, Seek, SeekFrom, Write};

use crate::error::{IgfsError, Result};
use crate::structures::section::Section;
use crate::structures::raw::section_header::SectionHeader;

/// Indexes a backing store by fixed-size section number.
///
/// `section_size` is constant for the lifetime of a given image (spec
/// §3.1): every section, including section zero, occupies exactly this
/// many bytes, so section `n` always starts at byte `n * section_size`.
pub struct SectionStore<'a, T: Read + Write + Seek> {
    data: &'a mut T,
    section_size: u64,
    section_count: u32,
}

impl<'a, T: Read + Write + Seek> SectionStore<'a, T> {
    /// Wraps `data`, which must already contain a whole number of
    /// `section_size`-byte sections.
    pub fn new(data: &'a mut T, section_size: u64) -> Result<Self> {
        let len = data.seek(SeekFrom::End(0))?;
        if len % section_size != 0 {
            return Err(IgfsError::InvalidImage(
                "backing store length is not a whole number of sections",
            ));
        }
        let section_count = (len / section_size) as u32;
        Ok(Self {
            data,
            section_size,
            section_count,
        })
    }

    pub fn section_size(&self) -> u64 {
        self.section_size
    }

    pub fn section_count(&self) -> u32 {
        self.section_count
    }

    fn check_index(&self, index: u32) -> Result<()> {
        if index >= self.section_count {
            return Err(IgfsError::OutOfRange {
                index,
                max: self.section_count,
            });
        }
        Ok(())
    }

    /// Reads section `index` into a freshly allocated, `section_size`
    /// byte buffer and parses it into a [`Section`].
    pub fn read_section(&mut self, index: u32) -> Result<Section> {
        self.check_index(index)?;
        #[cfg(feature = "std")]
        tracing::trace!(section = index, "reading section");
        let mut buffer = alloc::vec![0u8; self.section_size as usize];
        self.data
            .seek(SeekFrom::Start(index as u64 * self.section_size))?;
        self.data.read_exact(&mut buffer)?;
        Section::parse(&buffer)
    }

    /// Reads just the header of section `index`, without the cost of
    /// reading the whole section. Used by chain-walking code that only
    /// needs `next_section`.
    pub fn read_header(&mut self, index: u32) -> Result<SectionHeader> {
        self.check_index(index)?;
        let mut buffer = [0u8; SectionHeader::SIZE];
        self.data
            .seek(SeekFrom::Start(index as u64 * self.section_size))?;
        self.data.read_exact(&mut buffer)?;
        Ok(igfs_common::model::Model::parse(&buffer)?)
    }

    /// Overwrites section `index` with `bytes`, which must be exactly
    /// `section_size` long.
    pub fn write_section(&mut self, index: u32, bytes: &[u8]) -> Result<()> {
        self.check_index(index)?;
        if bytes.len() as u64 != self.section_size {
            return Err(IgfsError::InvalidImage("section buffer has the wrong size"));
        }
        #[cfg(feature = "std")]
        tracing::debug!(section = index, "writing section");
        self.data
            .seek(SeekFrom::Start(index as u64 * self.section_size))?;
        self.data.write_all(bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::section::build_section;
    use crate::structures::raw::section_header::SECTION_MAGIC;
    use std::io::Cursor;

    fn blank_header(section_in_minor: u32, next: u32) -> SectionHeader {
        SectionHeader {
            crc: 0,
            magic: SECTION_MAGIC,
            section_type: 0,
            section_size_exponent: 12,
            partition_minor: 0,
            generation: 0,
            section_in_minor,
            next_section: next,
        }
    }

    #[test]
    fn reads_and_writes_sections_by_index() {
        let section_size = 4096u64;
        let mut backing = vec![0u8; section_size as usize * 2];
        {
            let mut cursor = Cursor::new(&mut backing[..]);
            let mut store = SectionStore::new(&mut cursor, section_size).unwrap();
            assert_eq!(store.section_count(), 2);
            let bytes =
                build_section(&blank_header(0, 1), None, None, b"hello", section_size as usize)
                    .unwrap();
            store.write_section(0, &bytes).unwrap();
        }

        let mut cursor = Cursor::new(&mut backing[..]);
        let mut store = SectionStore::new(&mut cursor, section_size).unwrap();
        let section = store.read_section(0).unwrap();
        assert_eq!(section.header.section_in_minor, 0);
        assert_eq!(section.header.next_section, 1);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut backing = vec![0u8; 4096];
        let mut cursor = Cursor::new(&mut backing[..]);
        let mut store = SectionStore::new(&mut cursor, 4096).unwrap();
        assert!(matches!(
            store.read_section(5),
            Err(IgfsError::OutOfRange { .. })
        ));
    }
}
