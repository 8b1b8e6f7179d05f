//! Fixed-width, NUL-padded ASCII strings used for partition and extent
//! names (spec §3.3, §3.4), matching IGFS's C-style fixed name fields.

#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedStr<const N: usize> {
    raw: [u8; N],
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        Self { raw: [0; N] }
    }
}

impl<const N: usize> core::fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("FixedStr").field(&self.as_str()).finish()
    }
}

impl<const N: usize> FixedStr<N> {
    pub const MAX_LEN: usize = N;

    pub fn from_bytes(raw: [u8; N]) -> Self {
        Self { raw }
    }

    /// Truncates to `N` bytes if necessary; does not validate UTF-8 beyond
    /// what [`Self::as_str`] lazily checks.
    pub fn new_truncate(s: &str) -> Self {
        let bytes = s.as_bytes();
        let mut raw = [0u8; N];
        let len = bytes.len().min(N);
        raw[..len].copy_from_slice(&bytes[..len]);
        Self { raw }
    }

    /// Length up to the first NUL byte, or `N` if there is none.
    pub fn len(&self) -> usize {
        self.raw.iter().position(|b| *b == 0).unwrap_or(N)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the string, lossily replacing invalid UTF-8. Partition and
    /// extent names are ASCII in practice but the on-disk bytes are not
    /// validated at parse time, so this must never panic on garbage input.
    pub fn as_str(&self) -> alloc::borrow::Cow<'_, str> {
        alloc::string::String::from_utf8_lossy(&self.raw[..self.len()])
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.raw
    }
}
