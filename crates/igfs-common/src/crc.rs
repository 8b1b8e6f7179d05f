//! CRC32 checksum used by the integrity pipeline (spec §4.7).
//!
//! Standard IEEE polynomial (reflected, 0xEDB88320), initial value
//! `0xFFFFFFFF`, final XOR `0xFFFFFFFF`, exactly `crc`'s
//! `CRC_32_ISO_HDLC` constant.

use crc::{Crc, CRC_32_ISO_HDLC};

const HASHER: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// The section CRC32, computed over `bytes[CRC_OFFSET..]`.
#[derive(Debug, Copy, Clone)]
pub struct SectionCrc32;

impl SectionCrc32 {
    pub fn checksum(data: &[u8]) -> u32 {
        HASHER.checksum(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_vector() {
        // "123456789" is the standard CRC check string; CRC-32/ISO-HDLC's
        // check value is 0xCBF43926.
        assert_eq!(SectionCrc32::checksum(b"123456789"), 0xCBF43926);
    }
}
