//! Bounded single-producer/single-consumer queue for control-to-audio messages.
//!
//! Cursors run freely and are masked into the slot array, so every slot is
//! usable: the queue is full when `write - read == capacity`. The producer
//! publishes a slot by storing the write cursor with `Release`; the consumer
//! loads it with `Acquire` before reading the slot, and hands the slot back
//! the same way through the read cursor.
//!
//! One producer and one consumer are enforced by ownership: neither half is
//! `Clone`, and both operations take `&mut self`.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;

use crate::error::QueueError;

struct Ring<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    read: CachePadded<AtomicUsize>,
    write: CachePadded<AtomicUsize>,
}

// Slot access is serialized by the cursor protocol above.
unsafe impl<T: Send> Sync for Ring<T> {}
unsafe impl<T: Send> Send for Ring<T> {}

impl<T> Ring<T> {
    fn capacity(&self) -> usize {
        self.mask + 1
    }

    fn len(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }
}

/// Creates a queue with `capacity` slots. `capacity` must be a power of two.
pub fn channel<T: Copy + Send>(capacity: usize) -> Result<(Producer<T>, Consumer<T>), QueueError> {
    if capacity < 2 || !capacity.is_power_of_two() {
        return Err(QueueError::CapacityNotPowerOfTwo(capacity));
    }
    let slots = (0..capacity)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect();
    let ring = Arc::new(Ring {
        slots,
        mask: capacity - 1,
        read: CachePadded::new(AtomicUsize::new(0)),
        write: CachePadded::new(AtomicUsize::new(0)),
    });
    Ok((
        Producer {
            ring: Arc::clone(&ring),
        },
        Consumer { ring },
    ))
}

/// Writing half, owned by the control thread.
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
}

impl<T: Copy + Send> Producer<T> {
    /// Enqueues `item`, or hands it back when the queue is full.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        let write = self.ring.write.load(Ordering::Relaxed);
        let read = self.ring.read.load(Ordering::Acquire);
        if write.wrapping_sub(read) == self.ring.capacity() {
            return Err(item);
        }
        let slot = &self.ring.slots[write & self.ring.mask];
        unsafe { (*slot.get()).write(item) };
        self.ring.write.store(write.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }
}

/// Reading half, owned by the audio thread. Never blocks.
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
}

impl<T: Copy + Send> Consumer<T> {
    pub fn pop(&mut self) -> Option<T> {
        let read = self.ring.read.load(Ordering::Relaxed);
        let write = self.ring.write.load(Ordering::Acquire);
        if read == write {
            return None;
        }
        let slot = &self.ring.slots[read & self.ring.mask];
        let item = unsafe { (*slot.get()).assume_init_read() };
        self.ring.read.store(read.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    /// Pops until the queue is empty, in FIFO order.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.pop())
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
