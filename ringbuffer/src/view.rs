//! Zero-copy views over buffer storage.

use std::ops::Range;

use parking_lot::MutexGuard;

use crate::error::{Error, Result};
use crate::read::check_peek;
use crate::ring_buffer::RingBuffer;
use crate::state::State;

/// A borrowed view of up to two contiguous runs of buffer storage.
///
/// The view holds the buffer lock: every other operation on the buffer
/// waits until the view is dropped. Keep views short-lived and never call
/// back into the same buffer while one is alive.
///
/// For views returned by the `get_*_view` methods the items are already
/// consumed. Their slots stay intact while the view is alive, since no
/// writer can run before then, and are released when it is dropped.
pub struct View<'a, T> {
    state: MutexGuard<'a, State<T>>,
    first: Range<usize>,
    second: Range<usize>,
    /// Set for consumed views; resets the viewed slots on drop.
    release: Option<fn(&mut [T])>,
}

impl<'a, T> View<'a, T> {
    fn new(state: MutexGuard<'a, State<T>>, first: Range<usize>, second: Range<usize>) -> Self {
        View {
            state,
            first,
            second,
            release: None,
        }
    }

    /// The run starting at the oldest viewed item.
    pub fn first(&self) -> &[T] {
        &self.state.storage[self.first.clone()]
    }

    /// The wrapped run from the start of storage. Empty unless the viewed
    /// items cross the physical end of the buffer.
    pub fn second(&self) -> &[T] {
        &self.state.storage[self.second.clone()]
    }

    /// Total number of viewed items.
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    /// Returns true if the view covers no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the viewed items in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.first().iter().chain(self.second())
    }
}

impl<T> Drop for View<'_, T> {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            release(&mut self.state.storage[self.first.clone()]);
            release(&mut self.state.storage[self.second.clone()]);
        }
    }
}

fn reset_slots<T: Default>(slots: &mut [T]) {
    for slot in slots {
        *slot = T::default();
    }
}

impl<T: Clone> View<'_, T> {
    /// Copies the viewed items into a `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.len());
        items.extend_from_slice(self.first());
        items.extend_from_slice(self.second());
        items
    }
}

impl<T: Default> RingBuffer<T> {
    /// Consumes every unread item and returns a view of them.
    ///
    /// Never blocks: an empty buffer fails with [`Error::Empty`].
    ///
    /// ```
    /// use giztoy_ringbuffer::RingBuffer;
    ///
    /// let buf = RingBuffer::<u8>::new(4).unwrap();
    /// buf.write_many(*b"abc").unwrap();
    /// {
    ///     let view = buf.get_all_view().unwrap();
    ///     assert_eq!(view.first(), b"abc");
    ///     assert!(view.second().is_empty());
    /// }
    /// assert!(buf.is_empty());
    /// ```
    pub fn get_all_view(&self) -> Result<View<'_, T>> {
        let state = self.inner.state.lock();
        let checked = state.check_open().and_then(|()| {
            if state.is_empty() {
                return Err(Error::Empty);
            }
            Ok(state.len())
        });
        match checked {
            Ok(n) => Ok(self.consume_view(state, n)),
            Err(err) => {
                state.report_error(&err);
                Err(err)
            }
        }
    }

    /// Consumes exactly `n` items and returns a view of them.
    ///
    /// Waits like [`get_n`](Self::get_n) and fails the same way.
    pub fn get_n_view(&self, n: usize) -> Result<View<'_, T>> {
        let mut state = self.inner.state.lock();
        if let Err(err) = self.await_items(&mut state, n) {
            state.report_error(&err);
            return Err(err);
        }
        Ok(self.consume_view(state, n))
    }

    fn consume_view<'a>(&self, mut state: MutexGuard<'a, State<T>>, n: usize) -> View<'a, T> {
        let (first, second) = state.segments(n);
        for idx in first.clone().chain(second.clone()) {
            state.notify_read(&state.storage[idx]);
        }
        state.advance_read(n);
        verbose!(state, n, read_pos = state.read_pos, "items read into view");
        state.notify_drained();
        self.wake_writers(&state, n);
        let mut view = View::new(state, first, second);
        view.release = Some(reset_slots::<T>);
        view
    }
}

impl<T> RingBuffer<T> {
    /// Returns a view of the next `n` items without consuming them.
    ///
    /// Fails like [`peek_n`](Self::peek_n). Never blocks.
    pub fn peek_n_view(&self, n: usize) -> Result<View<'_, T>> {
        let state = self.inner.state.lock();
        if let Err(err) = check_peek(&state, n) {
            state.report_error(&err);
            return Err(err);
        }
        let (first, second) = state.segments(n);
        Ok(View::new(state, first, second))
    }
}
