//! Lock-protected buffer state and position arithmetic.
//!
//! # Invariants
//! - `read_pos < capacity` and `write_pos < capacity`.
//! - `full` is set iff the buffer holds exactly `capacity` items.
//! - `!full && read_pos == write_pos` means the buffer is empty.
//!
//! Nothing here locks or waits; callers hold the buffer mutex.

use std::ops::Range;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::hooks::{self, Hooks};

pub(crate) struct State<T> {
    pub(crate) storage: Vec<T>,
    pub(crate) read_pos: usize,
    pub(crate) write_pos: usize,
    pub(crate) full: bool,
    pub(crate) blocking: bool,
    pub(crate) overwrite: bool,
    pub(crate) verbose: bool,
    pub(crate) read_timeout: Option<Duration>,
    pub(crate) write_timeout: Option<Duration>,
    pub(crate) paused: bool,
    pub(crate) closed: bool,
    pub(crate) blocked_readers: usize,
    pub(crate) blocked_writers: usize,
    pub(crate) hooks: Hooks<T>,
}

impl<T: Default> State<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        let mut storage = Vec::with_capacity(capacity);
        storage.resize_with(capacity, T::default);

        State {
            storage,
            read_pos: 0,
            write_pos: 0,
            full: false,
            blocking: false,
            overwrite: false,
            verbose: false,
            read_timeout: None,
            write_timeout: None,
            paused: false,
            closed: false,
            blocked_readers: 0,
            blocked_writers: 0,
            hooks: Hooks::default(),
        }
    }

    /// Stores `item` at the write position and returns its slot index.
    ///
    /// The caller must have made room first.
    pub(crate) fn push(&mut self, item: T) -> usize {
        debug_assert!(!self.full);
        let idx = self.write_pos;
        self.storage[idx] = item;
        self.write_pos = (idx + 1) % self.capacity();
        self.full = self.write_pos == self.read_pos;
        idx
    }

    /// Moves the oldest item out, leaving `T::default()` in its slot.
    pub(crate) fn pop(&mut self) -> T {
        debug_assert!(!self.is_empty());
        let item = std::mem::take(&mut self.storage[self.read_pos]);
        self.read_pos = (self.read_pos + 1) % self.capacity();
        self.full = false;
        item
    }

    /// Drops the oldest unread item to make room for a write.
    pub(crate) fn evict_oldest(&mut self) {
        self.storage[self.read_pos] = T::default();
        self.read_pos = (self.read_pos + 1) % self.capacity();
        self.full = false;
    }

    /// Drops all items and rewinds both positions to zero.
    pub(crate) fn clear(&mut self) {
        for slot in &mut self.storage {
            *slot = T::default();
        }
        self.read_pos = 0;
        self.write_pos = 0;
        self.full = false;
    }
}

impl<T> State<T> {
    pub(crate) fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub(crate) fn len(&self) -> usize {
        if self.full {
            return self.capacity();
        }
        let capacity = self.capacity();
        (self.write_pos + capacity - self.read_pos) % capacity
    }

    pub(crate) fn free(&self) -> usize {
        self.capacity() - self.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        !self.full && self.read_pos == self.write_pos
    }

    /// Marks the next `n` items as consumed without touching their slots.
    pub(crate) fn advance_read(&mut self, n: usize) {
        debug_assert!(n <= self.len());
        if n == 0 {
            return;
        }
        self.read_pos = (self.read_pos + n) % self.capacity();
        self.full = false;
    }

    /// Splits the next `n` unread items into at most two storage ranges:
    /// the run up to the physical end, then the wrapped run from index 0.
    pub(crate) fn segments(&self, n: usize) -> (Range<usize>, Range<usize>) {
        debug_assert!(n <= self.len());
        let start = self.read_pos;
        let until_end = self.capacity() - start;
        if n <= until_end {
            (start..start + n, 0..0)
        } else {
            (start..self.capacity(), 0..n - until_end)
        }
    }

    /// Fails with the terminal error, then with `Paused`.
    pub(crate) fn check_open(&self) -> Result<()> {
        self.check_closed()?;
        if self.paused {
            return Err(Error::Paused);
        }
        Ok(())
    }

    pub(crate) fn check_closed(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }

    pub(crate) fn read_deadline(&self) -> Option<Instant> {
        self.read_timeout.map(|timeout| Instant::now() + timeout)
    }

    pub(crate) fn write_deadline(&self) -> Option<Instant> {
        self.write_timeout.map(|timeout| Instant::now() + timeout)
    }

    pub(crate) fn notify_written(&self, idx: usize) {
        if let Some(hook) = &self.hooks.on_write {
            hook(&self.storage[idx], true);
        }
        if self.full {
            hooks::fire(&self.hooks.on_full);
        }
        self.notify_state_change();
    }

    pub(crate) fn notify_write_failed(&self, item: &T) {
        if let Some(hook) = &self.hooks.on_write {
            hook(item, false);
        }
    }

    pub(crate) fn notify_read(&self, item: &T) {
        if let Some(hook) = &self.hooks.on_read {
            hook(item, true);
        }
    }

    /// Fires the hooks that follow a batch of reads.
    pub(crate) fn notify_drained(&self) {
        if self.is_empty() {
            hooks::fire(&self.hooks.on_empty);
        }
        self.notify_state_change();
    }

    pub(crate) fn notify_state_change(&self) {
        if let Some(hook) = &self.hooks.on_state_change {
            hook(self.full, self.len());
        }
    }

    pub(crate) fn report_error(&self, err: &Error) {
        verbose!(self, error = %err, "operation failed");
        if let Some(hook) = &self.hooks.on_error {
            hook(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(capacity: usize, items: &[i32]) -> State<i32> {
        let mut state = State::new(capacity);
        for &item in items {
            state.push(item);
        }
        state
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = State::<i32>::new(4);
        assert_eq!(state.capacity(), 4);
        assert_eq!(state.len(), 0);
        assert_eq!(state.free(), 4);
        assert!(state.is_empty());
        assert!(!state.full);
    }

    #[test]
    fn test_push_until_full() {
        let mut state = state_with(3, &[1, 2]);
        assert!(!state.full);
        assert_eq!(state.push(3), 2);
        assert!(state.full);
        assert_eq!(state.len(), 3);
        assert_eq!(state.free(), 0);
        assert_eq!(state.read_pos, state.write_pos);
    }

    #[test]
    fn test_pop_is_fifo_and_clears_slot() {
        let mut state = state_with(3, &[1, 2, 3]);
        assert_eq!(state.pop(), 1);
        assert!(!state.full);
        assert_eq!(state.storage[0], 0);
        assert_eq!(state.pop(), 2);
        assert_eq!(state.pop(), 3);
        assert!(state.is_empty());
    }

    #[test]
    fn test_len_after_wrap() {
        let mut state = state_with(4, &[1, 2, 3]);
        state.pop();
        state.pop();
        state.push(4);
        state.push(5);
        // write_pos wrapped behind read_pos.
        assert!(state.write_pos < state.read_pos);
        assert_eq!(state.len(), 3);
        assert_eq!(state.len() + state.free(), state.capacity());
    }

    #[test]
    fn test_evict_oldest() {
        let mut state = state_with(2, &[1, 2]);
        state.evict_oldest();
        assert_eq!(state.len(), 1);
        state.push(3);
        assert!(state.full);
        assert_eq!(state.pop(), 2);
        assert_eq!(state.pop(), 3);
    }

    #[test]
    fn test_segments_contiguous() {
        let state = state_with(5, &[1, 2, 3]);
        let (first, second) = state.segments(3);
        assert_eq!(first, 0..3);
        assert!(second.is_empty());
    }

    #[test]
    fn test_segments_wrapped() {
        let mut state = state_with(4, &[1, 2, 3, 4]);
        state.pop();
        state.pop();
        state.pop();
        state.push(5);
        state.push(6);
        // Unread: 4 at index 3, then 5 and 6 at indexes 0 and 1.
        let (first, second) = state.segments(3);
        assert_eq!(first, 3..4);
        assert_eq!(second, 0..2);

        let (first, second) = state.segments(1);
        assert_eq!(first, 3..4);
        assert!(second.is_empty());
    }

    #[test]
    fn test_advance_read() {
        let mut state = state_with(3, &[1, 2, 3]);
        state.advance_read(2);
        assert!(!state.full);
        assert_eq!(state.len(), 1);
        state.advance_read(0);
        assert_eq!(state.len(), 1);
        assert_eq!(state.pop(), 3);
    }

    #[test]
    fn test_clear() {
        let mut state = state_with(3, &[1, 2, 3]);
        state.clear();
        assert!(state.is_empty());
        assert_eq!(state.read_pos, 0);
        assert_eq!(state.write_pos, 0);
        assert_eq!(state.storage, vec![0, 0, 0]);
    }

    #[test]
    fn test_check_open_order() {
        let mut state = State::<i32>::new(1);
        assert_eq!(state.check_open(), Ok(()));
        state.paused = true;
        assert_eq!(state.check_open(), Err(Error::Paused));
        state.closed = true;
        assert_eq!(state.check_open(), Err(Error::Closed));
    }

    #[test]
    fn test_deadlines() {
        let mut state = State::<i32>::new(1);
        assert!(state.read_deadline().is_none());
        state.write_timeout = Some(Duration::from_millis(10));
        let deadline = state.write_deadline().unwrap();
        assert!(deadline > Instant::now());
    }
}
