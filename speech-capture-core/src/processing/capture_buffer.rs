/// Append-only store for captured audio chunks.
///
/// Shared as `Arc<parking_lot::Mutex<CaptureBuffer>>` between the capture
/// callback (sole writer while the stream runs) and the session, which takes
/// the contents only after the stream has stopped.
///
/// Chunks are kept in arrival order and never dropped; that order is the
/// temporal order of the written file.
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    chunks: Vec<Vec<u8>>,
    byte_len: usize,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk as delivered by the driver.
    pub fn push(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        self.byte_len += chunk.len();
        self.chunks.push(chunk.to_vec());
    }

    /// Number of chunks appended since the last take.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total bytes held.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn is_empty(&self) -> bool {
        self.byte_len == 0
    }

    /// Concatenate every chunk into one contiguous byte sequence and clear.
    pub fn take_concatenated(&mut self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.byte_len);
        for chunk in self.chunks.drain(..) {
            data.extend_from_slice(&chunk);
        }
        self.byte_len = 0;
        data
    }

    /// Discard everything without concatenating.
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.byte_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_in_arrival_order() {
        let mut buf = CaptureBuffer::new();
        buf.push(&[1, 2]);
        buf.push(&[3]);
        buf.push(&[4, 5, 6]);

        assert_eq!(buf.chunk_count(), 3);
        assert_eq!(buf.byte_len(), 6);
        assert_eq!(buf.take_concatenated(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn take_clears_buffer() {
        let mut buf = CaptureBuffer::new();
        buf.push(&[9; 8]);
        let _ = buf.take_concatenated();

        assert!(buf.is_empty());
        assert_eq!(buf.chunk_count(), 0);
        assert!(buf.take_concatenated().is_empty());
    }

    #[test]
    fn empty_chunks_are_ignored() {
        let mut buf = CaptureBuffer::new();
        buf.push(&[]);
        assert!(buf.is_empty());
        assert_eq!(buf.chunk_count(), 0);
    }

    #[test]
    fn reset_discards_chunks() {
        let mut buf = CaptureBuffer::new();
        buf.push(&[1, 2, 3]);
        buf.reset();
        assert!(buf.is_empty());
    }
}
