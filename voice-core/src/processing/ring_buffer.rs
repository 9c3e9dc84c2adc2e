use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Fixed-capacity single-producer/single-consumer sample buffer.
///
/// Lock-free: correctness relies on exactly one writer and one reader. Use
/// the buffer directly when one thread does both (capture framing), or
/// `split` it into a `RingProducer` / `RingConsumer` pair handed to two
/// threads (stream push vs. device pull).
///
/// Overflow behavior: drops newest. `write` stores as many leading samples
/// as fit and discards the rest; buffered samples are never overwritten.
pub struct RingBuffer<T> {
    inner: HeapRb<T>,
}

impl<T: Copy> RingBuffer<T> {
    /// Create a buffer holding up to `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: HeapRb::new(capacity.max(1)),
        }
    }

    /// Copy as many samples as fit. Returns the number accepted.
    pub fn write(&mut self, samples: &[T]) -> usize {
        self.inner.push_slice(samples)
    }

    /// Move up to `out.len()` samples into `out`. Returns the number read.
    pub fn read(&mut self, out: &mut [T]) -> usize {
        self.inner.pop_slice(out)
    }

    /// Samples currently retrievable.
    pub fn read_available(&self) -> usize {
        self.inner.occupied_len()
    }

    /// Free slots currently writable.
    pub fn write_available(&self) -> usize {
        self.inner.vacant_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }

    /// Discard all buffered samples.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Split into halves that can live on different threads.
    pub fn split(self) -> (RingProducer<T>, RingConsumer<T>) {
        let (producer, consumer) = self.inner.split();
        (RingProducer { inner: producer }, RingConsumer { inner: consumer })
    }
}

/// Writing half of a split `RingBuffer`.
pub struct RingProducer<T> {
    inner: HeapProd<T>,
}

impl<T: Copy> RingProducer<T> {
    /// Copy as many samples as fit. Returns the number accepted.
    pub fn write(&mut self, samples: &[T]) -> usize {
        self.inner.push_slice(samples)
    }

    pub fn write_available(&self) -> usize {
        self.inner.vacant_len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }
}

/// Reading half of a split `RingBuffer`.
pub struct RingConsumer<T> {
    inner: HeapCons<T>,
}

impl<T: Copy> RingConsumer<T> {
    /// Move up to `out.len()` samples into `out`. Returns the number read.
    pub fn read(&mut self, out: &mut [T]) -> usize {
        self.inner.pop_slice(out)
    }

    pub fn read_available(&self) -> usize {
        self.inner.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
