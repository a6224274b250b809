//! Bounded FIFO queue for passing fixed-size messages between tasks
//!
//! Sends never block. A full queue rejects the message and stays untouched,
//! so a sampling loop loses its newest value instead of stalling.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue depth must be non-zero")]
    ZeroCapacity,
    #[error("queue was already created")]
    AlreadyCreated,
    #[error("queue has not been created")]
    NotCreated,
    #[error("failed to allocate {0} queue slots")]
    AllocationFailed(usize),
}

struct Slots<T> {
    // None until created
    buffer: Option<VecDeque<T>>,
    capacity: usize,
}

pub struct BoundedQueue<T> {
    slots: Mutex<Slots<T>>,
    available: Condvar,
    producer_taken: AtomicBool,
    consumer_taken: AtomicBool,
}

impl<T> BoundedQueue<T> {
    /// An uncreated queue. Every operation fails until `create` succeeds.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                buffer: None,
                capacity: 0,
            }),
            available: Condvar::new(),
            producer_taken: AtomicBool::new(false),
            consumer_taken: AtomicBool::new(false),
        }
    }

    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        let queue = Self::new();
        queue.create(capacity)?;
        Ok(queue)
    }

    /// Allocate `capacity` slots. The depth is fixed from here on.
    pub fn create(&self, capacity: usize) -> Result<(), QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        let mut slots = self.lock();
        if slots.buffer.is_some() {
            return Err(QueueError::AlreadyCreated);
        }

        let mut buffer = VecDeque::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|_| QueueError::AllocationFailed(capacity))?;

        slots.buffer = Some(buffer);
        slots.capacity = capacity;
        Ok(())
    }

    /// Release the slots. Blocked receivers wake up with `NotCreated`.
    pub fn delete(&self) {
        let mut slots = self.lock();
        slots.buffer = None;
        slots.capacity = 0;
        self.available.notify_all();
    }

    pub fn is_created(&self) -> bool {
        self.lock().buffer.is_some()
    }

    /// Discard every queued message
    pub fn reset(&self) {
        if let Some(buffer) = self.lock().buffer.as_mut() {
            buffer.clear();
        }
    }

    /// Enqueue without waiting. `WouldBlock` means the queue is full.
    pub fn try_send(&self, msg: T) -> nb::Result<(), QueueError> {
        let mut slots = self.lock();
        let capacity = slots.capacity;
        let buffer = slots
            .buffer
            .as_mut()
            .ok_or(nb::Error::Other(QueueError::NotCreated))?;

        if buffer.len() >= capacity {
            return Err(nb::Error::WouldBlock);
        }

        buffer.push_back(msg);
        self.available.notify_one();
        Ok(())
    }

    /// Dequeue without waiting. `WouldBlock` means the queue is empty.
    pub fn try_receive(&self) -> nb::Result<T, QueueError> {
        let mut slots = self.lock();
        let buffer = slots
            .buffer
            .as_mut()
            .ok_or(nb::Error::Other(QueueError::NotCreated))?;
        buffer.pop_front().ok_or(nb::Error::WouldBlock)
    }

    /// Dequeue, suspending the caller until a message is available.
    pub fn receive(&self) -> Result<T, QueueError> {
        let mut slots = self.lock();
        loop {
            match slots.buffer.as_mut() {
                None => return Err(QueueError::NotCreated),
                Some(buffer) => {
                    if let Some(msg) = buffer.pop_front() {
                        return Ok(msg);
                    }
                }
            }
            slots = self
                .available
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Number of queued messages, 0 when uncreated
    pub fn occupied(&self) -> usize {
        self.lock().buffer.as_ref().map_or(0, VecDeque::len)
    }

    /// Number of empty slots, 0 when uncreated
    pub fn free(&self) -> usize {
        let slots = self.lock();
        slots
            .buffer
            .as_ref()
            .map_or(0, |buffer| slots.capacity - buffer.len())
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// The sending side. Handed out once, so every queue has a single producer.
    pub fn producer(self: &Arc<Self>) -> Option<Producer<T>> {
        if self.producer_taken.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(Producer {
            queue: Arc::clone(self),
        })
    }

    /// The receiving side. Handed out once.
    pub fn consumer(self: &Arc<Self>) -> Option<Consumer<T>> {
        if self.consumer_taken.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(Consumer {
            queue: Arc::clone(self),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Slots<T>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive sending handle.
///
/// Only the consumer can change occupancy besides this handle, and it only
/// ever frees slots, so `free() > 0` stays true until the next `send`.
pub struct Producer<T> {
    queue: Arc<BoundedQueue<T>>,
}

impl<T> Producer<T> {
    pub fn send(&self, msg: T) -> nb::Result<(), QueueError> {
        self.queue.try_send(msg)
    }

    /// Free-check and send under one lock. `false` means the message was
    /// dropped.
    pub fn send_if_free(&self, msg: T) -> bool {
        self.queue.try_send(msg).is_ok()
    }

    pub fn free(&self) -> usize {
        self.queue.free()
    }

    pub fn occupied(&self) -> usize {
        self.queue.occupied()
    }
}

/// Exclusive receiving handle
pub struct Consumer<T> {
    queue: Arc<BoundedQueue<T>>,
}

impl<T> Consumer<T> {
    pub fn try_receive(&self) -> nb::Result<T, QueueError> {
        self.queue.try_receive()
    }

    pub fn receive(&self) -> Result<T, QueueError> {
        self.queue.receive()
    }

    pub fn occupied(&self) -> usize {
        self.queue.occupied()
    }

    pub fn reset(&self) {
        self.queue.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn create_rejects_zero_and_second_call() {
        let queue = BoundedQueue::<u32>::new();
        assert_eq!(queue.create(0), Err(QueueError::ZeroCapacity));
        assert!(!queue.is_created());
        assert_eq!(queue.create(3), Ok(()));
        assert_eq!(queue.create(5), Err(QueueError::AlreadyCreated));
        assert_eq!(queue.capacity(), 3);
    }

    #[test]
    fn uncreated_queue_refuses_everything() {
        let queue = BoundedQueue::<u32>::new();
        assert_eq!(
            queue.try_send(1),
            Err(nb::Error::Other(QueueError::NotCreated))
        );
        assert_eq!(
            queue.try_receive(),
            Err(nb::Error::Other(QueueError::NotCreated))
        );
        assert_eq!(queue.receive(), Err(QueueError::NotCreated));
        assert_eq!(queue.free(), 0);
        assert_eq!(queue.occupied(), 0);
    }

    #[test]
    fn fifo_order() {
        let queue = BoundedQueue::with_capacity(8).unwrap();
        for i in 0..5u32 {
            queue.try_send(i).unwrap();
        }
        for i in 0..5u32 {
            assert_eq!(queue.try_receive(), Ok(i));
        }
        assert_eq!(queue.try_receive(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn full_queue_is_left_unchanged() {
        let queue = BoundedQueue::with_capacity(2).unwrap();
        queue.try_send(10u32).unwrap();
        queue.try_send(11).unwrap();
        assert_eq!(queue.try_send(12), Err(nb::Error::WouldBlock));
        assert_eq!(queue.occupied(), 2);
        assert_eq!(queue.free(), 0);
        assert_eq!(queue.try_receive(), Ok(10));
        assert_eq!(queue.try_receive(), Ok(11));
        assert_eq!(queue.try_receive(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn occupancy_never_exceeds_capacity() {
        let queue = BoundedQueue::with_capacity(3).unwrap();
        let mut expected = VecDeque::new();
        let mut seed = 0x2545_f491u32;
        for n in 0..500u32 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            if seed % 3 == 0 {
                assert_eq!(queue.try_receive().ok(), expected.pop_front());
            } else {
                let accepted = queue.try_send(n).is_ok();
                assert_eq!(accepted, expected.len() < 3);
                if accepted {
                    expected.push_back(n);
                }
            }
            assert!(queue.occupied() <= queue.capacity());
            assert_eq!(queue.occupied() + queue.free(), 3);
        }
    }

    #[test]
    fn reset_discards_messages() {
        let queue = BoundedQueue::with_capacity(4).unwrap();
        queue.try_send(1u8).unwrap();
        queue.try_send(2).unwrap();
        queue.reset();
        assert_eq!(queue.occupied(), 0);
        assert_eq!(queue.free(), 4);
    }

    #[test]
    fn blocking_receive_waits_for_sender() {
        let queue = Arc::new(BoundedQueue::with_capacity(1).unwrap());
        let consumer = queue.consumer().unwrap();
        let producer = queue.producer().unwrap();

        let waiter = thread::spawn(move || consumer.receive());
        thread::sleep(Duration::from_millis(20));
        producer.send(42u32).unwrap();

        assert_eq!(waiter.join().unwrap(), Ok(42));
    }

    #[test]
    fn delete_wakes_blocked_receiver() {
        let queue = Arc::new(BoundedQueue::<u32>::with_capacity(1).unwrap());
        let consumer = queue.consumer().unwrap();

        let waiter = thread::spawn(move || consumer.receive());
        thread::sleep(Duration::from_millis(20));
        queue.delete();

        assert_eq!(waiter.join().unwrap(), Err(QueueError::NotCreated));
    }

    #[test]
    fn handles_are_handed_out_once() {
        let queue = Arc::new(BoundedQueue::<u32>::with_capacity(1).unwrap());
        assert!(queue.producer().is_some());
        assert!(queue.producer().is_none());
        assert!(queue.consumer().is_some());
        assert!(queue.consumer().is_none());
    }

    #[test]
    fn send_if_free_drops_when_full() {
        let queue = Arc::new(BoundedQueue::with_capacity(1).unwrap());
        let producer = queue.producer().unwrap();
        assert!(producer.send_if_free(1u8));
        assert!(!producer.send_if_free(2u8));
        assert_eq!(queue.try_receive(), Ok(1));
        assert_eq!(queue.occupied(), 0);
    }
}
