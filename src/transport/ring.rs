//! # Transport Ring Buffer
//!
//! Fixed-capacity byte ring buffer between raw serial reads and the frame
//! parser. Mirrors the semantics of a microcontroller's serial reception
//! buffer: when the buffer is full, excess incoming bytes are dropped
//! rather than overwriting unread data.

/// Fixed-capacity byte ring buffer
#[derive(Debug)]
pub struct RingBuffer {
    storage: Box<[u8]>,
    head: usize,
    tail: usize,
    len: usize,
}

impl RingBuffer {
    /// Create a ring buffer with the given capacity in bytes
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Total capacity in bytes
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of unread bytes currently buffered
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no unread bytes
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes that can be pushed before the buffer is full
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    /// Push a single byte, returning `false` if the buffer is full
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len == self.capacity() {
            return false;
        }
        self.storage[self.tail] = byte;
        self.tail = (self.tail + 1) % self.capacity();
        self.len += 1;
        true
    }

    /// Push as many bytes as fit, returning the number accepted
    ///
    /// Bytes beyond the remaining capacity are dropped, matching how a
    /// serial reception buffer clips data the main loop failed to drain
    /// in time.
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let accepted = bytes.len().min(self.remaining());
        for &byte in &bytes[..accepted] {
            self.push(byte);
        }
        accepted
    }

    /// Pop the oldest unread byte
    pub fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.storage[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Some(byte)
    }

    /// Peek at the oldest unread byte without consuming it
    pub fn peek(&self) -> Option<u8> {
        if self.len == 0 {
            None
        } else {
            Some(self.storage[self.head])
        }
    }

    /// Discard all unread bytes
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}
