//! Read and peek operations.

use parking_lot::MutexGuard;

use crate::error::{Error, Result};
use crate::hooks::PreRead;
use crate::ring_buffer::RingBuffer;
use crate::state::State;

impl<T: Default> RingBuffer<T> {
    /// Removes and returns the oldest item.
    ///
    /// On an empty buffer the read consults the pre-read-block hook and then
    /// blocks (until a write arrives or the read timeout elapses) or fails
    /// with [`Error::Empty`].
    pub fn get_one(&self) -> Result<T> {
        let mut state = self.inner.state.lock();
        self.get_one_locked(&mut state).inspect_err(|err| state.report_error(err))
    }

    /// Removes and returns exactly `n` items in FIFO order.
    ///
    /// All-or-nothing: a blocking buffer waits until `n` items are
    /// available, a non-blocking one fails with [`Error::Empty`] if fewer
    /// are held. `n` must be between 1 and the capacity, otherwise the call
    /// fails with [`Error::InvalidLength`].
    pub fn get_n(&self, n: usize) -> Result<Vec<T>> {
        let mut state = self.inner.state.lock();
        if let Err(err) = self.await_items(&mut state, n) {
            state.report_error(&err);
            return Err(err);
        }

        let mut items = Vec::with_capacity(n);
        for _ in 0..n {
            let item = state.pop();
            state.notify_read(&item);
            items.push(item);
        }
        verbose!(state, n, read_pos = state.read_pos, "items read");
        state.notify_drained();
        self.wake_writers(&state, n);
        Ok(items)
    }

    /// Moves up to `buf.len()` items into `buf`, returning how many were
    /// moved.
    ///
    /// Waits like [`get_one`](Self::get_one) for the first item, without
    /// consulting the pre-read-block hook. An empty `buf` returns `Ok(0)`.
    pub fn read(&self, buf: &mut [T]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut state = self.inner.state.lock();
        if let Err(err) = self.await_items(&mut state, 1) {
            state.report_error(&err);
            return Err(err);
        }

        let n = buf.len().min(state.len());
        for slot in &mut buf[..n] {
            *slot = state.pop();
            state.notify_read(slot);
        }
        state.notify_drained();
        self.wake_writers(&state, n);
        Ok(n)
    }

    /// Removes the oldest item without waiting.
    ///
    /// Returns `None` if the buffer is closed, paused or empty. Pre-block
    /// hooks and timeouts are not consulted.
    pub fn try_read(&self) -> Option<T> {
        let mut state = self.inner.state.lock();
        if state.check_open().is_err() || state.is_empty() {
            return None;
        }
        Some(self.take_one(&mut state))
    }

    fn get_one_locked(&self, state: &mut MutexGuard<'_, State<T>>) -> Result<T> {
        state.check_open()?;

        let mut retry = true;
        let mut deadline = None;
        while state.is_empty() {
            if retry {
                if let Some(hook) = state.hooks.pre_read_block.clone() {
                    let outcome = MutexGuard::unlocked(state, || hook());
                    state.check_open()?;
                    match outcome {
                        PreRead::Deliver(item) => {
                            state.notify_read(&item);
                            return Ok(item);
                        }
                        PreRead::Retry => {
                            retry = false;
                            continue;
                        }
                        PreRead::Block if !state.is_empty() => continue,
                        PreRead::Block => {}
                    }
                }
            }

            if !state.blocking {
                return Err(Error::Empty);
            }

            let deadline = *deadline.get_or_insert_with(|| state.read_deadline());
            self.wait_for_data(state, deadline)?;
        }

        Ok(self.take_one(state))
    }

    /// Waits until `n` items are available.
    pub(crate) fn await_items(&self, state: &mut MutexGuard<'_, State<T>>, n: usize) -> Result<()> {
        state.check_open()?;
        if n == 0 || n > state.capacity() {
            return Err(Error::InvalidLength);
        }

        let mut deadline = None;
        while state.len() < n {
            if !state.blocking {
                return Err(Error::Empty);
            }
            let deadline = *deadline.get_or_insert_with(|| state.read_deadline());
            self.wait_for_data(state, deadline)?;
        }
        Ok(())
    }

    fn take_one(&self, state: &mut MutexGuard<'_, State<T>>) -> T {
        let item = state.pop();
        verbose!(state, read_pos = state.read_pos, "item read");
        state.notify_read(&item);
        state.notify_drained();
        self.wake_writers(state, 1);
        item
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Returns a copy of the oldest item without removing it.
    pub fn peek_one(&self) -> Result<T> {
        let state = self.inner.state.lock();
        let result = state.check_closed().and_then(|()| {
            if state.is_empty() {
                return Err(Error::Empty);
            }
            Ok(state.storage[state.read_pos].clone())
        });
        result.inspect_err(|err| state.report_error(err))
    }

    /// Returns copies of the next `n` items without removing them.
    ///
    /// Fails with [`Error::InvalidLength`] for `n == 0`, [`Error::Empty`] on
    /// an empty buffer and [`Error::TooMuchToPeek`] if fewer than `n` items
    /// are held. Never blocks.
    pub fn peek_n(&self, n: usize) -> Result<Vec<T>> {
        let state = self.inner.state.lock();
        let result = check_peek(&state, n).map(|()| {
            let (first, second) = state.segments(n);
            let mut items = Vec::with_capacity(n);
            items.extend_from_slice(&state.storage[first]);
            items.extend_from_slice(&state.storage[second]);
            items
        });
        result.inspect_err(|err| state.report_error(err))
    }

    /// Returns a snapshot of all unread items in FIFO order.
    pub fn to_vec(&self) -> Vec<T> {
        let state = self.inner.state.lock();
        let (first, second) = state.segments(state.len());
        let mut items = Vec::with_capacity(state.len());
        items.extend_from_slice(&state.storage[first]);
        items.extend_from_slice(&state.storage[second]);
        items
    }
}

/// Validates a peek of `n` items.
pub(crate) fn check_peek<T>(state: &State<T>, n: usize) -> Result<()> {
    state.check_closed()?;
    if n == 0 {
        return Err(Error::InvalidLength);
    }
    if state.is_empty() {
        return Err(Error::Empty);
    }
    if n > state.len() {
        return Err(Error::TooMuchToPeek);
    }
    Ok(())
}
