//! Bounded FIFO between the reader and the worker pool.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::{Condvar, Mutex};

/// Returned by [`BoundedQueue::push`] when the queue was closed; hands the
/// rejected item back to the caller.
pub struct Closed<T>(pub T);

impl<T> fmt::Debug for Closed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Closed(..)")
    }
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    high_water: usize,
}

/// Capacity-limited blocking queue with a terminal closed state.
///
/// `push` blocks while the queue is full, `pop` blocks while it is empty.
/// After `close`, pushes fail immediately and pops drain what is left, then
/// return `None`.
pub struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates an open, empty queue. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
                high_water: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Appends an item, waiting for space. Fails if the queue is or becomes
    /// closed before space is available.
    pub fn push(&self, item: T) -> Result<(), Closed<T>> {
        let mut state = self.state.lock();
        while state.items.len() >= self.capacity && !state.closed {
            self.not_full.wait(&mut state);
        }
        if state.closed {
            return Err(Closed(item));
        }

        state.items.push_back(item);
        state.high_water = state.high_water.max(state.items.len());
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes the oldest item, waiting while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Marks the queue closed and wakes every waiter. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of items held before `push` blocks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest number of items ever held at once.
    pub fn high_water_mark(&self) -> usize {
        self.state.lock().high_water
    }
}
