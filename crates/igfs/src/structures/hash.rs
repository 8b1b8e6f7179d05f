//! A partition's hash block (spec §3.5): the signed header, the exclude
//! table, and the per-section BLAKE2b digests, as consumed by
//! [`crate::integrity`].

use alloc::vec::Vec;

use crate::error::{IgfsError, Result};
use crate::structures::raw::hash_block::{HashExclude, HashHeader};

#[derive(Debug, Clone)]
pub struct HashBlock {
    pub header: HashHeader,
    pub excludes: Vec<HashExclude>,
    /// `count_hash` digests of `hash_bytes` bytes each, chain order.
    pub hash_values: Vec<u8>,
}

impl HashBlock {
    /// The BLAKE2b digest recorded for the `index`-th section in the
    /// partition's chain (`0` is the partition's first section).
    pub fn digest_for_section(&self, index: u32) -> Result<&[u8]> {
        let size = self.header.hash_bytes as usize;
        let start = index as usize * size;
        let end = start + size;
        self.hash_values
            .get(start..end)
            .ok_or(IgfsError::CorruptDirectory("hash index out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::raw::hash_block::SIGNATURE_SIZE;

    #[test]
    fn looks_up_digest_by_index() {
        let block = HashBlock {
            header: HashHeader {
                hash_bytes: 4,
                count_excludes: 0,
                count_hash: 2,
                signature: [0u8; SIGNATURE_SIZE],
            },
            excludes: Vec::new(),
            hash_values: alloc::vec![1, 2, 3, 4, 5, 6, 7, 8],
        };
        assert_eq!(block.digest_for_section(0).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(block.digest_for_section(1).unwrap(), &[5, 6, 7, 8]);
        assert!(block.digest_for_section(2).is_err());
    }
}
