//! Declarative model descriptor framework (spec §4.2, design note §9).
//!
//! A model is a description of an ordered list of named, fixed-size fields.
//! [`FieldDescriptor`] records the `{name, offset, size}` triple for each
//! field so callers (chiefly the `igfs-cli info` command) can introspect a
//! structure's on-disk layout without re-deriving it from doc comments.
//!
//! Concrete models (`SectionHeader`, `PartitionHeader`, ...) implement
//! [`Model`] by hand, pairing a `#[repr(C, packed)] + bytemuck` type
//! with accessor methods: the descriptor table here is metadata
//! alongside that impl, not a runtime reflection layer driving it.

/// One field's position within a model's fixed-size byte layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub offset: usize,
    pub size: usize,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, offset: usize, size: usize) -> Self {
        Self { name, offset, size }
    }
}

/// Error returned when a buffer is shorter than a model's declared size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("truncated model: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
}

/// A fixed-size, byte-addressable on-disk structure.
///
/// `parse` and `serialize` must round-trip: `serialize(parse(b)) == b` for
/// any valid buffer `b` of length `SIZE` (spec §4.2, testable property 1).
/// `default_value` must produce a value equal to what `parse` would return
/// for an all-zero buffer, unless a field documents a non-zero default.
pub trait Model: Sized {
    /// Total size in bytes; parsing a shorter buffer fails with
    /// [`ModelError::Truncated`].
    const SIZE: usize;

    /// The field table backing this model's on-disk layout, for
    /// introspection and diagnostics.
    const FIELDS: &'static [FieldDescriptor];

    fn parse(bytes: &[u8]) -> Result<Self, ModelError>;

    fn serialize(&self, out: &mut [u8]) -> Result<(), ModelError>;

    fn default_value() -> Self;
}

/// Checks that `bytes` is at least `needed` bytes long, for use at the top
/// of a [`Model::parse`] implementation.
pub fn check_len(bytes: &[u8], needed: usize) -> Result<(), ModelError> {
    if bytes.len() < needed {
        return Err(ModelError::Truncated {
            needed,
            available: bytes.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        a: u32,
        b: u16,
    }

    impl Model for Pair {
        const SIZE: usize = 6;
        const FIELDS: &'static [FieldDescriptor] = &[
            FieldDescriptor::new("a", 0, 4),
            FieldDescriptor::new("b", 4, 2),
        ];

        fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
            check_len(bytes, Self::SIZE)?;
            let mut r = igfs_io::codec::ByteReader::new(bytes);
            Ok(Self {
                a: r.read_u32_le().unwrap(),
                b: r.read_u16_le().unwrap(),
            })
        }

        fn serialize(&self, out: &mut [u8]) -> Result<(), ModelError> {
            check_len(out, Self::SIZE)?;
            let mut w = igfs_io::codec::ByteWriter::new(out);
            w.write_u32_le(self.a).unwrap();
            w.write_u16_le(self.b).unwrap();
            Ok(())
        }

        fn default_value() -> Self {
            Self { a: 0, b: 0 }
        }
    }

    #[test]
    fn round_trips() {
        let bytes = [1, 2, 3, 4, 5, 6];
        let pair = Pair::parse(&bytes).unwrap();
        let mut out = [0u8; 6];
        pair.serialize(&mut out).unwrap();
        assert_eq!(bytes, out);
    }

    #[test]
    fn truncated_fails() {
        let bytes = [1, 2, 3];
        assert!(matches!(
            Pair::parse(&bytes),
            Err(ModelError::Truncated {
                needed: 6,
                available: 3
            })
        ));
    }

    #[test]
    fn default_is_zeroed() {
        let pair = Pair::default_value();
        assert_eq!(pair.a, 0);
        assert_eq!(pair.b, 0);
    }
}
