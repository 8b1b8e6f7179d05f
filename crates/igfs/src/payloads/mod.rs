//! Extent payload interpreters layered on top of the structural model
//! (spec §4.9): the boot registry key/value store and the bootsplash
//! image table. Neither decodes image pixels or executes scripts; both
//! are explicitly out of scope (spec §1).

pub mod boot_registry;
pub mod bootsplash;
