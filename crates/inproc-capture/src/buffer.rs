//! Append-only capture buffer with amortized-doubling growth
//!
//! The buffer stores its content followed by a single NUL byte, so the bytes
//! can be handed to consumers that expect a text-style end marker. Growth
//! failures never abort: the increment that did not fit is dropped and
//! counted, and everything written before it is kept.

use std::fmt;
use std::io;

use tracing::warn;

/// A growable byte sink for one captured stream
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    /// Content followed by exactly one NUL terminator.
    storage: Vec<u8>,
    /// Optional ceiling on content length.
    max_bytes: Option<usize>,
    /// Bytes rejected since the last reset.
    dropped_bytes: usize,
}

impl CaptureBuffer {
    /// Create a buffer with room for `initial_capacity` bytes before the first
    /// reallocation.
    #[must_use]
    pub fn new(initial_capacity: usize) -> Self {
        Self::from_seed(Vec::with_capacity(initial_capacity.saturating_add(1)))
    }

    /// Adopt an existing allocation as the buffer's storage.
    ///
    /// Any bytes already in `seed` are discarded; only its capacity is kept.
    #[must_use]
    pub fn from_seed(mut seed: Vec<u8>) -> Self {
        seed.clear();
        seed.push(0);
        Self {
            storage: seed,
            max_bytes: None,
            dropped_bytes: 0,
        }
    }

    /// Set a ceiling on content length. Appends that would grow the content
    /// past it are dropped.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: Option<usize>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Append `bytes` to the buffer.
    ///
    /// When the content plus terminator would not fit, the storage is grown to
    /// twice the required size. If that allocation fails, or the configured
    /// ceiling would be exceeded, the whole increment is dropped and `false`
    /// is returned; existing content is untouched.
    pub fn append(&mut self, bytes: &[u8]) -> bool {
        if bytes.is_empty() {
            return true;
        }

        let Some(required) = self
            .len()
            .checked_add(bytes.len())
            .and_then(|n| n.checked_add(1))
        else {
            return self.drop_increment(bytes.len());
        };

        if self.max_bytes.is_some_and(|max| required - 1 > max) {
            return self.drop_increment(bytes.len());
        }

        if required > self.storage.capacity() {
            let target = required.saturating_mul(2);
            if self
                .storage
                .try_reserve_exact(target - self.storage.len())
                .is_err()
            {
                return self.drop_increment(bytes.len());
            }
        }

        self.storage.pop();
        self.storage.extend_from_slice(bytes);
        self.storage.push(0);
        true
    }

    fn drop_increment(&mut self, len: usize) -> bool {
        if self.dropped_bytes == 0 {
            warn!(
                dropped_bytes = len,
                buffered_bytes = self.len(),
                "Capture buffer could not grow; dropping output"
            );
        }
        self.dropped_bytes = self.dropped_bytes.saturating_add(len);
        false
    }

    /// Empty the buffer while keeping its allocation for reuse.
    pub fn reset(&mut self) {
        self.storage.clear();
        self.storage.push(0);
        self.dropped_bytes = 0;
    }

    /// Number of content bytes (terminator excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len() - 1
    }

    /// Check if no content has been captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes the buffer can hold, terminator included, before it must grow.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Configured content ceiling, if any.
    #[must_use]
    pub const fn max_bytes(&self) -> Option<usize> {
        self.max_bytes
    }

    /// Captured content without the terminator.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage[..self.len()]
    }

    /// Captured content including the trailing NUL.
    ///
    /// The content itself may contain NUL bytes; only the last byte is
    /// guaranteed to be the terminator.
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.storage
    }

    /// Copy the captured content into an owned vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Bytes dropped since the last reset.
    #[must_use]
    pub const fn dropped_bytes(&self) -> usize {
        self.dropped_bytes
    }

    /// Check if any write was dropped since the last reset
    #[must_use]
    pub const fn was_truncated(&self) -> bool {
        self.dropped_bytes > 0
    }
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new(0)
    }
}

impl io::Write for CaptureBuffer {
    /// Dropped increments still report full success, matching a console that
    /// silently discards what it cannot show.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Display for CaptureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    fn assert_terminated(buffer: &CaptureBuffer) {
        let with_nul = buffer.as_bytes_with_nul();
        assert_eq!(with_nul.len(), buffer.len() + 1);
        assert_eq!(with_nul[buffer.len()], 0);
        assert!(buffer.capacity() > buffer.len());
    }

    #[test]
    fn test_capture_buffer_empty() {
        let buffer = CaptureBuffer::new(16);
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.as_bytes(), b"");
        assert_eq!(buffer.as_bytes_with_nul(), b"\0");
        assert!(!buffer.was_truncated());
        assert_terminated(&buffer);
    }

    #[test]
    fn test_capture_buffer_basic() {
        let mut buffer = CaptureBuffer::new(16);
        assert!(buffer.append(b"hello"));
        assert!(buffer.append(b" world"));
        assert_eq!(buffer.as_bytes(), b"hello world");
        assert_eq!(buffer.to_string(), "hello world");
        assert_terminated(&buffer);
    }

    #[test]
    fn test_capture_buffer_growth_doubles_required_size() {
        let mut buffer = CaptureBuffer::new(4);
        let initial = buffer.capacity();
        buffer.append(b"0123456789");

        // 10 bytes + terminator = 11 required, grown to at least 22.
        assert!(buffer.capacity() > initial);
        assert!(buffer.capacity() >= 22);
        assert_eq!(buffer.as_bytes(), b"0123456789");
        assert_terminated(&buffer);
    }

    #[test]
    fn test_capture_buffer_no_growth_when_it_fits() {
        let mut buffer = CaptureBuffer::new(64);
        let initial = buffer.capacity();
        for _ in 0..8 {
            buffer.append(b"abcd");
        }
        assert_eq!(buffer.capacity(), initial);
        assert_eq!(buffer.len(), 32);
    }

    #[test]
    fn test_capture_buffer_small_chunks_grow_geometrically() {
        let mut buffer = CaptureBuffer::new(1);
        let mut reallocations = 0;
        let mut last_capacity = buffer.capacity();
        for _ in 0..100_000 {
            buffer.append(b"x");
            if buffer.capacity() != last_capacity {
                reallocations += 1;
                last_capacity = buffer.capacity();
            }
        }
        assert_eq!(buffer.len(), 100_000);
        // Doubling keeps the reallocation count logarithmic.
        assert!(reallocations < 40, "reallocated {reallocations} times");
    }

    #[test]
    fn test_capture_buffer_from_seed_discards_content_keeps_capacity() {
        let mut seed = Vec::with_capacity(1024);
        seed.extend_from_slice(b"stale");
        let buffer = CaptureBuffer::from_seed(seed);
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= 1024);
        assert_terminated(&buffer);
    }

    #[test]
    fn test_capture_buffer_from_empty_seed() {
        let mut buffer = CaptureBuffer::from_seed(Vec::new());
        assert_terminated(&buffer);
        buffer.append(b"abc");
        assert_eq!(buffer.as_bytes(), b"abc");
        assert_terminated(&buffer);
    }

    #[test]
    fn test_capture_buffer_reset_keeps_capacity() {
        let mut buffer = CaptureBuffer::new(8);
        buffer.append(&[b'y'; 500]);
        let grown = buffer.capacity();

        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), grown);
        assert_terminated(&buffer);
    }

    #[test]
    fn test_capture_buffer_ceiling_drops_increment() {
        let mut buffer = CaptureBuffer::new(4).with_max_bytes(Some(8));
        assert!(buffer.append(b"12345"));
        assert!(!buffer.append(b"67890"));
        assert!(buffer.append(b"678"));

        assert_eq!(buffer.as_bytes(), b"12345678");
        assert_eq!(buffer.dropped_bytes(), 5);
        assert!(buffer.was_truncated());
        assert_terminated(&buffer);

        buffer.reset();
        assert_eq!(buffer.dropped_bytes(), 0);
        assert_eq!(buffer.max_bytes(), Some(8));
    }

    #[test]
    fn test_capture_buffer_keeps_interior_nul_and_invalid_utf8() {
        let mut buffer = CaptureBuffer::new(4);
        buffer.append(&[0xFF, 0x00, 0xFE]);
        assert_eq!(buffer.as_bytes(), &[0xFF, 0x00, 0xFE]);
        assert_eq!(buffer.len(), 3);
        assert!(!buffer.to_string().is_empty());
        assert_terminated(&buffer);
    }

    #[test]
    fn test_capture_buffer_empty_append_is_noop() {
        let mut buffer = CaptureBuffer::new(0);
        let capacity = buffer.capacity();
        assert!(buffer.append(b""));
        assert_eq!(buffer.capacity(), capacity);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_capture_buffer_io_write() {
        let mut buffer = CaptureBuffer::new(2);
        write!(buffer, "status={}", 200).unwrap();
        buffer.flush().unwrap();
        assert_eq!(buffer.as_bytes(), b"status=200");
    }

    #[test]
    fn test_capture_buffer_io_write_reports_success_when_dropping() {
        let mut buffer = CaptureBuffer::new(2).with_max_bytes(Some(2));
        let written = buffer.write(b"too long").unwrap();
        assert_eq!(written, 8);
        assert!(buffer.is_empty());
        assert_eq!(buffer.dropped_bytes(), 8);
    }

    proptest! {
        #[test]
        fn prop_content_is_exact_concatenation(
            seed in 0usize..64,
            chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..300), 0..40)
        ) {
            let mut buffer = CaptureBuffer::new(seed);
            let mut expected = Vec::new();
            for chunk in &chunks {
                prop_assert!(buffer.append(chunk));
                expected.extend_from_slice(chunk);

                prop_assert!(buffer.capacity() >= buffer.len());
                prop_assert_eq!(buffer.as_bytes_with_nul()[buffer.len()], 0);
            }
            prop_assert_eq!(buffer.as_bytes(), expected.as_slice());
            prop_assert_eq!(buffer.dropped_bytes(), 0);
        }
    }
}
