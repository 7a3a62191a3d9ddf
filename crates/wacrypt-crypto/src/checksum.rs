//! Whole-container MD5 checksum
//!
//! Fed in container order: length byte, feature marker (if present), header
//! record, ciphertext, then the 16-byte field just before the last 16 bytes.
//! For a single-file container the result equals those last 16 bytes.

use md5::{Digest, Md5};

use crate::CHECKSUM_SIZE;

#[derive(Clone, Default)]
pub struct IncrementalHash {
    hasher: Md5,
}

impl IncrementalHash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    pub fn finalize(self) -> [u8; CHECKSUM_SIZE] {
        self.hasher.finalize().into()
    }

    /// Checksum of a container laid out as `header || body || field`.
    pub fn over(header: &[u8], body: &[u8], field: &[u8]) -> [u8; CHECKSUM_SIZE] {
        let mut hash = Self::new();
        hash.update(header);
        hash.update(body);
        hash.update(field);
        hash.finalize()
    }
}

impl std::fmt::Debug for IncrementalHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalHash").finish_non_exhaustive()
    }
}
