//! Fixed-capacity ring buffer for packet parsing
//!
//! Consuming a packet advances the read index instead of shifting bytes.

use super::constants::MAX_PACKET_SIZE;

/// Fixed-capacity ring buffer with O(1) advance
///
/// Generic const parameter `N` sets buffer capacity.
pub struct RingBuffer<const N: usize = 4096> {
    data: [u8; N],
    head: usize, // Write position (next empty slot)
    tail: usize, // Read position (first valid byte)
    len: usize,
    staging: [u8; MAX_PACKET_SIZE], // For non-contiguous slice access
}

impl<const N: usize> RingBuffer<N> {
    /// Create a new empty ring buffer
    pub const fn new() -> Self {
        Self {
            data: [0u8; N],
            head: 0,
            tail: 0,
            len: 0,
            staging: [0u8; MAX_PACKET_SIZE],
        }
    }

    /// Append bytes to the buffer
    ///
    /// Returns how many bytes did not fit and were dropped.
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let accepted = bytes.len().min(N - self.len);
        for &b in &bytes[..accepted] {
            self.data[self.head] = b;
            self.head = (self.head + 1) % N;
        }
        self.len += accepted;
        bytes.len() - accepted
    }

    /// Consume n bytes from the front
    #[inline]
    pub fn advance(&mut self, n: usize) {
        let n = n.min(self.len);
        self.tail = (self.tail + n) % N;
        self.len -= n;
    }

    /// Number of bytes available to read
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Read byte at logical index (handles wraparound)
    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        if index < self.len {
            Some(self.data[(self.tail + index) % N])
        } else {
            None
        }
    }

    /// Find 2-byte sync pattern, returns offset from tail
    pub fn find_pattern_2(&self, b1: u8, b2: u8) -> Option<usize> {
        if self.len < 2 {
            return None;
        }
        (0..self.len - 1).find(|&i| {
            self.data[(self.tail + i) % N] == b1 && self.data[(self.tail + i + 1) % N] == b2
        })
    }

    /// Get contiguous slice (copies to staging if data wraps around)
    ///
    /// Slices longer than one maximum-size packet are not supported.
    pub fn get_slice(&mut self, start: usize, len: usize) -> Option<&[u8]> {
        if start + len > self.len || len > MAX_PACKET_SIZE {
            return None;
        }

        let real_start = (self.tail + start) % N;

        if real_start + len <= N {
            Some(&self.data[real_start..real_start + len])
        } else {
            for i in 0..len {
                self.staging[i] = self.data[(real_start + i) % N];
            }
            Some(&self.staging[..len])
        }
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut rb: RingBuffer<16> = RingBuffer::new();
        assert_eq!(rb.len(), 0);

        assert_eq!(rb.extend(&[1, 2, 3, 4, 5]), 0);
        assert_eq!(rb.len(), 5);
        assert_eq!(rb.get(0), Some(1));
        assert_eq!(rb.get(4), Some(5));
        assert_eq!(rb.get(5), None);
    }

    #[test]
    fn test_overflow_drops_excess() {
        let mut rb: RingBuffer<4> = RingBuffer::new();
        assert_eq!(rb.extend(&[1, 2, 3, 4, 5, 6]), 2);
        assert_eq!(rb.len(), 4);
        assert_eq!(rb.get(3), Some(4));
    }

    #[test]
    fn test_wraparound() {
        let mut rb: RingBuffer<8> = RingBuffer::new();
        rb.extend(&[1, 2, 3, 4, 5]);
        rb.advance(3);
        assert_eq!(rb.len(), 2);

        rb.extend(&[6, 7, 8, 9]);
        assert_eq!(rb.len(), 6);
        assert_eq!(rb.get(0), Some(4));
        assert_eq!(rb.get(5), Some(9));
    }

    #[test]
    fn test_find_sync_across_wrap() {
        let mut rb: RingBuffer<8> = RingBuffer::new();
        rb.extend(&[0, 0, 0, 0, 0, 0, 0]);
        rb.advance(7);
        rb.extend(&[0x75, 0x65, 0x01]); // 0x75 at index 7, 0x65 wraps to 0

        assert_eq!(rb.find_pattern_2(0x75, 0x65), Some(0));
        assert_eq!(rb.find_pattern_2(0x65, 0x75), None);
    }

    #[test]
    fn test_get_slice_wrapped() {
        let mut rb: RingBuffer<8> = RingBuffer::new();
        rb.extend(&[1, 2, 3, 4, 5, 6]);
        rb.advance(5);
        rb.extend(&[7, 8, 9]);

        assert_eq!(rb.get_slice(0, 4).unwrap(), &[6, 7, 8, 9]);
        assert!(rb.get_slice(2, 4).is_none());
    }
}
