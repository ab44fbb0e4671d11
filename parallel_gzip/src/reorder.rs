//! Re-sequencing point between the worker pool and the writer.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::block::Sequenced;

/// Returned by [`ReorderBuffer::insert`] when the run was cancelled while the
/// caller was waiting for its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

struct ReorderState<T> {
    next_expected: u64,
    ready: VecDeque<T>,
    finished: bool,
    cancelled: bool,
}

/// Accepts items only in sequence order and releases them in that order.
///
/// A worker holding sequence `n` waits in [`insert`](Self::insert) until
/// `0..n` have all been inserted and there is room in the ready list. The
/// writer drains the ready list with [`take`](Self::take). Because items enter
/// in order, `take` yields `0, 1, 2, ...` regardless of completion order.
pub struct ReorderBuffer<T> {
    state: Mutex<ReorderState<T>>,
    turn: Condvar,
    available: Condvar,
    capacity: usize,
}

impl<T: Sequenced> ReorderBuffer<T> {
    /// Creates a buffer expecting sequence 0 first, holding at most
    /// `capacity` ready items.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(ReorderState {
                next_expected: 0,
                ready: VecDeque::new(),
                finished: false,
                cancelled: false,
            }),
            turn: Condvar::new(),
            available: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Waits until `item` is next in sequence, then appends it.
    pub fn insert(&self, item: T) -> Result<(), Cancelled> {
        let sequence = item.sequence();
        let mut state = self.state.lock();
        debug_assert!(
            sequence >= state.next_expected,
            "sequence {sequence} inserted twice"
        );

        loop {
            if state.cancelled {
                return Err(Cancelled);
            }
            if sequence == state.next_expected && state.ready.len() < self.capacity {
                break;
            }
            self.turn.wait(&mut state);
        }

        state.ready.push_back(item);
        state.next_expected += 1;
        drop(state);
        // Several inserters may be parked; only the new next-in-line can
        // proceed, so they all have to re-check.
        self.turn.notify_all();
        self.available.notify_one();
        Ok(())
    }

    /// Removes the oldest in-order item, waiting while none is ready.
    ///
    /// Returns `None` once [`finish`](Self::finish) was called and the buffer
    /// is drained, or immediately after [`cancel`](Self::cancel).
    pub fn take(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if state.cancelled {
                return None;
            }
            let was_full = state.ready.len() >= self.capacity;
            if let Some(item) = state.ready.pop_front() {
                drop(state);
                if was_full {
                    self.turn.notify_all();
                }
                return Some(item);
            }
            if state.finished {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Signals that no more items will be inserted.
    pub fn finish(&self) {
        let mut state = self.state.lock();
        state.finished = true;
        drop(state);
        self.available.notify_all();
    }

    /// Aborts every current and future wait.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        drop(state);
        self.turn.notify_all();
        self.available.notify_all();
    }

    /// Sequence number the next `insert` must carry.
    pub fn next_expected(&self) -> u64 {
        self.state.lock().next_expected
    }

    pub fn ready_len(&self) -> usize {
        self.state.lock().ready.len()
    }
}
