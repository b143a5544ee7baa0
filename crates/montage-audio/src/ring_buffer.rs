//! Lock-free single-producer single-consumer ring buffer for audio samples.
//!
//! The producer is whoever mixes (session thread), the consumer is the
//! audio callback. No mutexes; positions are atomics and the regions the
//! two sides touch never overlap.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A SPSC ring buffer for f32 audio samples.
pub struct RingBuffer {
    storage: UnsafeCell<Box<[f32]>>,
    capacity: usize,
    read_pos: AtomicUsize,
    write_pos: AtomicUsize,
}

// SAFETY: SPSC discipline. Positions are published through acquire/release
// atomics and the sample ranges the reader and writer touch are disjoint:
// the writer only fills [write_pos, read_pos) and the reader only drains
// [read_pos, write_pos).
#[allow(unsafe_code)]
unsafe impl Sync for RingBuffer {}
#[allow(unsafe_code)]
unsafe impl Send for RingBuffer {}

impl RingBuffer {
    /// Create a ring buffer holding `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        // One extra slot distinguishes full from empty.
        let actual = capacity + 1;
        Self {
            storage: UnsafeCell::new(vec![0.0f32; actual].into_boxed_slice()),
            capacity: actual,
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
        }
    }

    /// Samples available for reading.
    pub fn available_read(&self) -> usize {
        let w = self.write_pos.load(Ordering::Acquire);
        let r = self.read_pos.load(Ordering::Acquire);
        if w >= r {
            w - r
        } else {
            self.capacity - r + w
        }
    }

    /// Samples that can be written without overwriting unread data.
    pub fn available_write(&self) -> usize {
        self.capacity - 1 - self.available_read()
    }

    /// Write samples; returns how many were actually written. Never blocks;
    /// a full buffer drops the excess.
    #[allow(unsafe_code)]
    pub fn write(&self, data: &[f32]) -> usize {
        let count = data.len().min(self.available_write());
        if count == 0 {
            return 0;
        }
        let w = self.write_pos.load(Ordering::Relaxed);
        let first = (self.capacity - w).min(count);

        // SAFETY: only the single producer writes, and only inside the free
        // region; the consumer cannot observe it until the store below.
        unsafe {
            let buf = &mut *self.storage.get();
            buf[w..w + first].copy_from_slice(&data[..first]);
            if first < count {
                buf[..count - first].copy_from_slice(&data[first..count]);
            }
        }
        self.write_pos
            .store((w + count) % self.capacity, Ordering::Release);
        count
    }

    /// Read samples; returns how many were actually read. An underrun reads
    /// short rather than erroring.
    #[allow(unsafe_code)]
    pub fn read(&self, output: &mut [f32]) -> usize {
        let count = output.len().min(self.available_read());
        if count == 0 {
            return 0;
        }
        let r = self.read_pos.load(Ordering::Relaxed);
        let first = (self.capacity - r).min(count);

        // SAFETY: only the single consumer reads, and only the published
        // region; the producer will not reuse it until read_pos advances.
        unsafe {
            let buf = &*self.storage.get();
            output[..first].copy_from_slice(&buf[r..r + first]);
            if first < count {
                output[first..count].copy_from_slice(&buf[..count - first]);
            }
        }
        self.read_pos
            .store((r + count) % self.capacity, Ordering::Release);
        count
    }

    /// Discard everything buffered.
    pub fn clear(&self) {
        self.read_pos
            .store(self.write_pos.load(Ordering::Acquire), Ordering::Release);
    }
}
