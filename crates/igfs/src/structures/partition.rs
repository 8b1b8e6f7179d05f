//! A partition's header plus its extent table (spec §3.3, §3.4), as
//! resolved by [`crate::fs::Filesystem::get_partition`].

use alloc::vec::Vec;

use crate::structures::raw::partition_header::{ExtentDescriptor, ExtentType, PartitionHeader};

#[derive(Debug, Clone)]
pub struct Partition {
    pub header: PartitionHeader,
    pub extents: Vec<ExtentDescriptor>,
}

impl Partition {
    /// The first extent of the given type, if the partition carries one.
    /// Multiple extents of the same type are legal on-disk (spec §3.4);
    /// callers that need all of them should filter [`Self::extents`]
    /// directly.
    pub fn extent(&self, extent_type: ExtentType) -> Option<&ExtentDescriptor> {
        self.extents.iter().find(|e| e.extent_type == extent_type)
    }

    pub fn minor(&self) -> u32 {
        self.header.partition_minor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use igfs_common::strutil::FixedStr;

    #[test]
    fn finds_extent_by_type() {
        let partition = Partition {
            header: PartitionHeader {
                partition_type: 1,
                flags: crate::structures::raw::partition_header::PartitionFlags::empty(),
                partition_minor: 1,
                n_extents: 1,
                offset_blocktable: 0,
                partition_size: 0,
                name: FixedStr::new_truncate("root"),
            },
            extents: alloc::vec![ExtentDescriptor {
                extent_type: ExtentType::Squashfs,
                offset: 0,
                length: 128,
                name: FixedStr::new_truncate("rootfs"),
            }],
        };
        assert!(partition.extent(ExtentType::Squashfs).is_some());
        assert!(partition.extent(ExtentType::Kernel).is_none());
    }
}
