//! Derived structures built on top of the raw on-disk layer (spec §4.4,
//! §4.5): [`section`] composes a whole section's groups, [`directory`]
//! resolves the section-zero directory into partition/fragment lookups,
//! [`partition`] walks a partition's extents, and [`hash`] gives the
//! integrity pipeline a typed view of a partition's hash block.

pub mod raw;

pub mod directory;
pub mod hash;
pub mod partition;
pub mod section;
