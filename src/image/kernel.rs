//! Fixed-size kernel region at the start of the image.

/// Kernel input that did not fit its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    pub original_len: usize,
    pub capacity: usize,
}

/// Kernel bytes normalized to exactly `capacity` bytes.
///
/// Shorter inputs are zero-padded, longer inputs keep their first
/// `capacity` bytes and record a [`Truncation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelRegion {
    bytes: Vec<u8>,
    input_len: usize,
    truncation: Option<Truncation>,
}

impl KernelRegion {
    pub fn new(mut bytes: Vec<u8>, capacity: usize) -> Self {
        let original_len = bytes.len();
        let truncation = (original_len > capacity).then_some(Truncation {
            original_len,
            capacity,
        });
        bytes.resize(capacity, 0);
        Self {
            bytes,
            input_len: original_len,
            truncation,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Region length; always the capacity it was built with.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Length of the kernel binary before padding or truncation.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Set when the kernel input lost its tail to fit the region.
    pub fn truncation(&self) -> Option<Truncation> {
        self.truncation
    }
}
