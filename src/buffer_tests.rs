//! Unit tests for the buffer module

#[cfg(test)]
mod tests {
    use crate::buffer::LocalBuffer;
    use crate::sources::{AudioSource, Sample};

    /// Source producing 0.0, 1.0, 2.0, ... so positions are easy to check
    struct Counter(f32);

    impl AudioSource for Counter {
        fn fill(&mut self, buffer: &mut [Sample]) {
            for slot in buffer {
                *slot = self.0;
                self.0 += 1.0;
            }
        }
    }

    #[test]
    fn test_local_buffer_starts_exhausted() {
        let buffer = LocalBuffer::new(8);

        assert!(buffer.is_exhausted());
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.remaining(), 0);
        assert!(buffer.pending().is_empty());
    }

    #[test]
    fn test_local_buffer_refill() {
        let mut buffer = LocalBuffer::new(4);
        let mut source = Counter(0.0);

        buffer.refill(&mut source);

        assert!(!buffer.is_exhausted());
        assert_eq!(buffer.remaining(), 4);
        assert_eq!(buffer.cursor(), 0);
        assert_eq!(buffer.pending(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_local_buffer_advance_moves_cursor() {
        let mut buffer = LocalBuffer::new(6);
        buffer.refill(&mut Counter(0.0));

        assert_eq!(buffer.advance(2), 2);
        assert_eq!(buffer.cursor(), 2);
        assert_eq!(buffer.remaining(), 4);
        assert_eq!(buffer.pending(), &[2.0, 3.0, 4.0, 5.0]);

        assert_eq!(buffer.advance(3), 3);
        assert_eq!(buffer.pending(), &[5.0]);
    }

    #[test]
    fn test_local_buffer_advance_sums_writes() {
        let mut buffer = LocalBuffer::new(100);
        buffer.refill(&mut Counter(0.0));

        let writes = [7, 0, 13, 1, 29];
        for w in writes {
            buffer.advance(w);
        }

        let total: usize = writes.iter().sum();
        assert_eq!(buffer.cursor(), total);
        assert_eq!(buffer.remaining(), 100 - total);
        assert_eq!(buffer.total_advanced(), total as u64);
    }

    #[test]
    fn test_local_buffer_advance_is_clamped() {
        let mut buffer = LocalBuffer::new(8);
        buffer.refill(&mut Counter(0.0));
        buffer.advance(5);

        // Only 3 frames left, never run past the block
        assert_eq!(buffer.advance(10), 3);
        assert_eq!(buffer.remaining(), 0);
        assert_eq!(buffer.cursor(), 8);
        assert!(buffer.is_exhausted());
    }

    #[test]
    fn test_local_buffer_refill_after_exhaustion_continues_source() {
        let mut buffer = LocalBuffer::new(3);
        let mut source = Counter(0.0);

        buffer.refill(&mut source);
        buffer.advance(3);
        assert!(buffer.is_exhausted());

        buffer.refill(&mut source);
        assert_eq!(buffer.cursor(), 0);
        assert_eq!(buffer.remaining(), 3);
        assert_eq!(buffer.pending(), &[3.0, 4.0, 5.0]);
        assert_eq!(buffer.total_advanced(), 3);
    }

    #[test]
    fn test_local_buffer_never_resized() {
        let mut buffer = LocalBuffer::new(16);
        let mut source = Counter(0.0);

        for _ in 0..5 {
            buffer.refill(&mut source);
            buffer.advance(16);
            assert_eq!(buffer.capacity(), 16);
        }
    }
}
