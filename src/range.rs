//! Byte ranges within an object.

/// An `(offset, length)` pair where the length may be left open.
///
/// Covers `[offset, offset + length)`. An unspecified length reads to the
/// end of the object. Ranges are clipped to the object length on read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: Option<u64>,
}

impl ByteRange {
    pub fn new(offset: u64, length: Option<u64>) -> Self {
        Self { offset, length }
    }

    /// The whole object
    pub fn full() -> Self {
        Self::default()
    }

    /// Everything from `offset` to the end
    pub fn from_offset(offset: u64) -> Self {
        Self { offset, length: None }
    }

    /// Resolve against an object of `object_len` bytes.
    ///
    /// Returns the clipped `(start, count)`; `count` is 0 when the offset
    /// lies at or past the end.
    pub fn clip(&self, object_len: u64) -> (u64, u64) {
        let start = self.offset.min(object_len);
        let available = object_len - start;
        let count = match self.length {
            Some(len) => len.min(available),
            None => available,
        };
        (start, count)
    }
}
