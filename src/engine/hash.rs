//! Chunked SHA-1 accumulation over a byte stream.
//!
//! Thin wrapper around the `sha1` crate's `Sha1` digest, matching the
//! `sha1sum` convention: lowercase hex, no separators, no I/O.

use sha1::{Digest, Sha1};

/// A chunked SHA-1 accumulator. No I/O, no threading.
pub struct StreamHasher {
    inner: Sha1,
}

impl StreamHasher {
    pub fn new() -> Self {
        Self { inner: Sha1::new() }
    }

    /// Feed bytes into the running digest. Zero-length chunks are no-ops.
    pub fn update(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.inner.update(bytes);
    }

    /// Finalize and return the 40-char lowercase hex digest.
    pub fn finalize(self) -> String {
        hex_lower(&self.inner.finalize())
    }

    /// Reset the accumulator to its initial state, discarding any input fed
    /// so far.
    pub fn reset(&mut self) {
        self.inner = Sha1::new();
    }
}

impl Default for StreamHasher {
    fn default() -> Self {
        Self::new()
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(&mut out, "{:02x}", b).expect("writing to a String never fails");
    }
    out
}

/// Compute the SHA-1 hex digest of an in-memory byte slice. Convenience
/// wrapper over `StreamHasher` for tests and small inputs.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = StreamHasher::new();
    hasher.update(data);
    hasher.finalize()
}
