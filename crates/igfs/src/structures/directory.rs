//! The section-zero directory (spec §4.5): a table of partition
//! descriptors, each pointing into a table of fragment descriptors that
//! gives the first section of each contiguous run making up a partition's
//! section-linked list.

use alloc::vec::Vec;

use igfs_common::model::Model;

use crate::error::{IgfsError, Result};
use crate::structures::raw::directory::{FragmentDescriptor, PartitionDescriptor};

#[derive(Debug, Clone)]
pub struct Directory {
    pub partitions: Vec<PartitionDescriptor>,
    pub fragments: Vec<FragmentDescriptor>,
}

impl Directory {
    /// Parses `n_partitions` contiguous [`PartitionDescriptor`] records
    /// followed by `n_fragments` contiguous [`FragmentDescriptor`]
    /// records out of `bytes` (section zero's payload).
    pub fn parse(bytes: &[u8], n_partitions: usize, n_fragments: usize) -> Result<Self> {
        let mut offset = 0usize;
        let mut partitions = Vec::with_capacity(n_partitions);
        for _ in 0..n_partitions {
            partitions.push(PartitionDescriptor::parse(&bytes[offset..])?);
            offset += PartitionDescriptor::SIZE;
        }
        let mut fragments = Vec::with_capacity(n_fragments);
        for _ in 0..n_fragments {
            fragments.push(FragmentDescriptor::parse(&bytes[offset..])?);
            offset += FragmentDescriptor::SIZE;
        }
        Ok(Self {
            partitions,
            fragments,
        })
    }

    /// Looks up the (in-use) partition descriptor for `minor`.
    pub fn find_partition_by_minor(&self, minor: u32) -> Option<&PartitionDescriptor> {
        self.partitions
            .iter()
            .find(|p| !p.is_unused() && p.minor == minor)
    }

    /// Resolves `minor` to the first section of its section-linked list,
    /// by following `first_fragment` into the fragment table.
    pub fn first_section_of(&self, minor: u32) -> Result<u32> {
        let descriptor = self
            .find_partition_by_minor(minor)
            .ok_or(IgfsError::CorruptDirectory("unknown partition minor"))?;
        let fragment = self
            .fragments
            .get(descriptor.first_fragment as usize)
            .ok_or(IgfsError::CorruptDirectory("first_fragment out of range"))?;
        Ok(fragment.first_section)
    }

    /// All in-use partition minors, in directory order.
    pub fn minors(&self) -> impl Iterator<Item = u32> + '_ {
        self.partitions
            .iter()
            .filter(|p| !p.is_unused())
            .map(|p| p.minor)
    }
}
