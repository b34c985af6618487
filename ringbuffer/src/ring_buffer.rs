//! Ring buffer handle, configuration setters and control operations.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::debug;

use crate::config::{non_zero, Config};
use crate::error::{Error, Result};
use crate::hooks::{self, PreRead};
use crate::state::State;
use crate::weak::WeakRingBuffer;

/// Poll interval for [`RingBuffer::wait_until_full`] and
/// [`RingBuffer::wait_until_empty`].
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A thread-safe fixed-capacity circular buffer.
///
/// `RingBuffer<T>` coordinates any number of producer and consumer threads
/// through one mutex and two condition variables. Its behaviour on a full or
/// empty buffer is configurable:
///
/// - **Non-blocking** (default): operations fail with [`Error::Full`] or
///   [`Error::Empty`].
/// - **Blocking**: operations wait for the counterpart operation, optionally
///   bounded by a timeout that yields [`Error::DeadlineExceeded`].
/// - **Overwrite**: writes to a full buffer evict the oldest unread item.
///
/// Cloning a `RingBuffer` shares the same underlying buffer.
///
/// # Example
///
/// ```
/// use giztoy_ringbuffer::RingBuffer;
/// use std::thread;
///
/// let buf = RingBuffer::<i32>::new(4).unwrap();
/// buf.set_blocking(true);
///
/// let producer_buf = buf.clone();
/// let producer = thread::spawn(move || {
///     for i in 0..10 {
///         producer_buf.write(i).unwrap();
///     }
/// });
///
/// let items: Vec<i32> = (0..10).map(|_| buf.get_one().unwrap()).collect();
/// producer.join().unwrap();
/// assert_eq!(items, (0..10).collect::<Vec<_>>());
/// ```
pub struct RingBuffer<T> {
    pub(crate) inner: Arc<RingBufferInner<T>>,
}

pub(crate) struct RingBufferInner<T> {
    pub(crate) state: Mutex<State<T>>,
    /// Signalled when items are consumed; writers wait on it.
    pub(crate) read_ready: Condvar,
    /// Signalled when items are produced; readers wait on it.
    pub(crate) write_ready: Condvar,
    pub(crate) capacity: usize,
}

impl<T> Clone for RingBuffer<T> {
    fn clone(&self) -> Self {
        RingBuffer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> RingBuffer<T> {
    /// Creates a non-blocking buffer holding at most `capacity` items.
    ///
    /// Returns `None` if `capacity` is zero.
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }

        Some(RingBuffer {
            inner: Arc::new(RingBufferInner {
                state: Mutex::new(State::new(capacity)),
                read_ready: Condvar::new(),
                write_ready: Condvar::new(),
                capacity,
            }),
        })
    }

    /// Creates a buffer and applies `config`.
    ///
    /// Fails with [`Error::InvalidLength`] if `capacity` is zero. A
    /// configured timeout turns blocking on.
    pub fn with_config(capacity: usize, config: Config<T>) -> Result<Self> {
        let buf = Self::new(capacity).ok_or(Error::InvalidLength)?;
        {
            let mut state = buf.inner.state.lock();
            state.blocking = config.effective_blocking();
            state.read_timeout = config.read_timeout;
            state.write_timeout = config.write_timeout;
            state.overwrite = config.overwrite;
            state.verbose = config.verbose;
            state.hooks.pre_read_block = config.pre_read_block_hook;
            state.hooks.pre_write_block = config.pre_write_block_hook;
            verbose!(
                state,
                capacity,
                blocking = state.blocking,
                overwrite = state.overwrite,
                read_timeout = ?state.read_timeout,
                write_timeout = ?state.write_timeout,
                "ring buffer created"
            );
        }
        Ok(buf)
    }

    /// Discards all items and resets both positions, waking blocked writers.
    ///
    /// Unlike [`flush`](Self::flush) this fires no hooks.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.clear();
        self.inner.read_ready.notify_all();
    }

    /// Discards all items, fires the flush hook and wakes every waiter.
    ///
    /// The closed and paused flags are left untouched.
    pub fn flush(&self) {
        let mut state = self.inner.state.lock();
        verbose!(state, "flush started");
        state.clear();
        hooks::fire(&state.hooks.on_flush);
        state.notify_state_change();
        self.wake_all();
    }

    /// Returns the buffer to its initial state.
    ///
    /// Like [`flush`](Self::flush), but also clears the closed and paused
    /// flags, so a closed buffer becomes usable again.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        verbose!(state, "reset started");
        state.clear();
        state.closed = false;
        state.paused = false;
        hooks::fire(&state.hooks.on_reset);
        state.notify_state_change();
        self.wake_all();
    }

    /// Closes the buffer.
    ///
    /// Contents are dropped and every blocked reader and writer wakes up with
    /// [`Error::Closed`], as does every later operation. Closing an already
    /// closed buffer does nothing.
    pub fn close(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Ok(());
        }
        hooks::fire(&state.hooks.on_close);
        state.closed = true;
        state.clear();
        debug!(
            blocked_readers = state.blocked_readers,
            blocked_writers = state.blocked_writers,
            "ring buffer closed"
        );
        self.wake_all();
        Ok(())
    }
}

impl<T> RingBuffer<T> {
    /// Returns the number of unread items.
    pub fn len(&self) -> usize {
        self.inner.state.lock().len()
    }

    /// Returns the number of items that can be written without blocking.
    pub fn free(&self) -> usize {
        self.inner.state.lock().free()
    }

    /// Returns the buffer capacity.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns true if the buffer holds no items.
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().is_empty()
    }

    /// Returns true if the buffer holds `capacity` items.
    pub fn is_full(&self) -> bool {
        self.inner.state.lock().full
    }

    /// Returns true if the buffer is paused.
    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().paused
    }

    /// Returns true if the buffer has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Returns true if operations wait instead of failing.
    pub fn is_blocking(&self) -> bool {
        self.inner.state.lock().blocking
    }

    /// Returns the number of readers currently waiting for data.
    pub fn blocked_readers(&self) -> usize {
        self.inner.state.lock().blocked_readers
    }

    /// Returns the number of writers currently waiting for space.
    pub fn blocked_writers(&self) -> usize {
        self.inner.state.lock().blocked_writers
    }

    /// Creates a handle that does not keep the buffer alive.
    ///
    /// Hooks that call back into the buffer should capture a weak handle.
    pub fn downgrade(&self) -> WeakRingBuffer<T> {
        WeakRingBuffer::new(Arc::downgrade(&self.inner))
    }

    /// Sets blocking mode.
    ///
    /// Turning blocking off wakes every waiting reader and writer, which
    /// then fail with [`Error::Empty`] or [`Error::Full`] as a non-blocking
    /// call would.
    pub fn set_blocking(&self, blocking: bool) -> &Self {
        let mut state = self.inner.state.lock();
        let was_blocking = state.blocking;
        state.blocking = blocking;
        if was_blocking && !blocking {
            self.wake_all();
        }
        self
    }

    /// Sets both the read and write timeout.
    ///
    /// A zero duration waits forever. A positive duration enables blocking.
    pub fn set_timeout(&self, timeout: Duration) -> &Self {
        self.set_read_timeout(timeout).set_write_timeout(timeout)
    }

    /// Bounds how long readers wait for data.
    ///
    /// A zero duration waits forever. A positive duration enables blocking.
    pub fn set_read_timeout(&self, timeout: Duration) -> &Self {
        let mut state = self.inner.state.lock();
        state.read_timeout = non_zero(timeout);
        if state.read_timeout.is_some() {
            state.blocking = true;
        }
        self
    }

    /// Bounds how long writers wait for space.
    ///
    /// A zero duration waits forever. A positive duration enables blocking.
    pub fn set_write_timeout(&self, timeout: Duration) -> &Self {
        let mut state = self.inner.state.lock();
        state.write_timeout = non_zero(timeout);
        if state.write_timeout.is_some() {
            state.blocking = true;
        }
        self
    }

    /// Sets overwrite mode.
    pub fn set_overwrite(&self, overwrite: bool) -> &Self {
        self.inner.state.lock().overwrite = overwrite;
        self
    }

    /// Enables or disables per-operation `tracing` diagnostics.
    pub fn set_verbose(&self, verbose: bool) -> &Self {
        self.inner.state.lock().verbose = verbose;
        self
    }

    /// Copies blocking mode, timeouts, overwrite and verbose settings from
    /// `source`. Hooks are not copied.
    pub fn copy_config(&self, source: &RingBuffer<T>) -> &Self {
        let (blocking, read_timeout, write_timeout, overwrite, verbose) = {
            let src = source.inner.state.lock();
            (
                src.blocking,
                src.read_timeout,
                src.write_timeout,
                src.overwrite,
                src.verbose,
            )
        };

        let mut state = self.inner.state.lock();
        state.blocking = blocking;
        state.read_timeout = read_timeout;
        state.write_timeout = write_timeout;
        state.overwrite = overwrite;
        state.verbose = verbose;
        self
    }

    /// Sets the hook called before a reader blocks on an empty buffer.
    ///
    /// Returning `true` makes the reader recheck the buffer once.
    pub fn pre_read_block<F>(&self, hook: F) -> &Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.pre_read_block_with(move || PreRead::from(hook()))
    }

    /// Sets the hook called before a reader blocks on an empty buffer, with
    /// full control over the outcome.
    ///
    /// ```
    /// use giztoy_ringbuffer::{PreRead, RingBuffer};
    ///
    /// let buf = RingBuffer::<i32>::new(2).unwrap();
    /// buf.pre_read_block_with(|| PreRead::Deliver(42));
    /// assert_eq!(buf.get_one(), Ok(42));
    /// ```
    pub fn pre_read_block_with<F>(&self, hook: F) -> &Self
    where
        F: Fn() -> PreRead<T> + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.pre_read_block = Some(Arc::new(hook));
        self
    }

    /// Sets the hook called before a writer blocks on a full buffer.
    ///
    /// Returning `true` makes the writer recheck the buffer once.
    pub fn pre_write_block<F>(&self, hook: F) -> &Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.pre_write_block = Some(Arc::new(hook));
        self
    }

    /// Sets the hook called when a write fills the buffer.
    pub fn on_full<F>(&self, hook: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.on_full = Some(Arc::new(hook));
        self
    }

    /// Sets the hook called when a read drains the buffer.
    pub fn on_empty<F>(&self, hook: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.on_empty = Some(Arc::new(hook));
        self
    }

    /// Sets the hook called after each write attempt.
    pub fn on_write<F>(&self, hook: F) -> &Self
    where
        F: Fn(&T, bool) + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.on_write = Some(Arc::new(hook));
        self
    }

    /// Sets the hook called for each item read.
    pub fn on_read<F>(&self, hook: F) -> &Self
    where
        F: Fn(&T, bool) + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.on_read = Some(Arc::new(hook));
        self
    }

    /// Sets the hook called by [`reset`](Self::reset).
    pub fn on_reset<F>(&self, hook: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.on_reset = Some(Arc::new(hook));
        self
    }

    /// Sets the hook called by [`flush`](Self::flush).
    pub fn on_flush<F>(&self, hook: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.on_flush = Some(Arc::new(hook));
        self
    }

    /// Sets the hook called once, just before the buffer closes.
    pub fn on_close<F>(&self, hook: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.on_close = Some(Arc::new(hook));
        self
    }

    /// Sets the hook called with every error a data operation returns.
    pub fn on_error<F>(&self, hook: F) -> &Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.on_error = Some(Arc::new(hook));
        self
    }

    /// Sets the hook called with `(is_full, len)` after the contents change.
    pub fn on_state_change<F>(&self, hook: F) -> &Self
    where
        F: Fn(bool, usize) + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.on_state_change = Some(Arc::new(hook));
        self
    }

    /// Sets the hook called by [`pause`](Self::pause).
    pub fn on_pause<F>(&self, hook: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.on_pause = Some(Arc::new(hook));
        self
    }

    /// Sets the hook called by [`resume`](Self::resume).
    pub fn on_resume<F>(&self, hook: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.on_resume = Some(Arc::new(hook));
        self
    }

    /// Pauses the buffer.
    ///
    /// While paused, operations that move data fail with [`Error::Paused`];
    /// peeks and queries keep working.
    pub fn pause(&self) {
        let mut state = self.inner.state.lock();
        state.paused = true;
        hooks::fire(&state.hooks.on_pause);
        verbose!(state, "buffer paused");
    }

    /// Resumes a paused buffer.
    pub fn resume(&self) {
        let mut state = self.inner.state.lock();
        state.paused = false;
        hooks::fire(&state.hooks.on_resume);
        verbose!(state, "buffer resumed");
    }

    /// Polls until the buffer is full or `timeout` elapses.
    ///
    /// Returns false immediately for a zero timeout.
    pub fn wait_until_full(&self, timeout: Duration) -> bool {
        self.poll_until(timeout, |state| state.full)
    }

    /// Polls until the buffer is empty or `timeout` elapses.
    ///
    /// Returns false immediately for a zero timeout.
    pub fn wait_until_empty(&self, timeout: Duration) -> bool {
        self.poll_until(timeout, |state| state.is_empty())
    }

    fn poll_until(&self, timeout: Duration, ready: impl Fn(&State<T>) -> bool) -> bool {
        if timeout.is_zero() {
            return false;
        }
        let deadline = Instant::now() + timeout;
        loop {
            {
                let state = self.inner.state.lock();
                if ready(&*state) {
                    return true;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Wakes one reader waiting for data, if any.
    pub fn wake_one_reader(&self) {
        let state = self.inner.state.lock();
        if state.blocking && state.blocked_readers > 0 {
            self.inner.write_ready.notify_one();
        }
    }

    /// Wakes one writer waiting for space, if any.
    pub fn wake_one_writer(&self) {
        let state = self.inner.state.lock();
        if state.blocking && state.blocked_writers > 0 {
            self.inner.read_ready.notify_one();
        }
    }

    /// Waits on `read_ready` for a writer.
    ///
    /// Returns with the lock held. A timed-out wait is reported without
    /// rechecking the buffer; the terminal error masks it.
    pub(crate) fn wait_for_space(
        &self,
        state: &mut MutexGuard<'_, State<T>>,
        deadline: Option<Instant>,
    ) -> Result<()> {
        state.blocked_writers += 1;
        verbose!(state, ?deadline, "writer blocked on full buffer");
        let timed_out = wait(&self.inner.read_ready, state, deadline);
        state.blocked_writers -= 1;
        state.check_open()?;
        if timed_out {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Waits on `write_ready` for a reader. Mirrors [`Self::wait_for_space`].
    pub(crate) fn wait_for_data(
        &self,
        state: &mut MutexGuard<'_, State<T>>,
        deadline: Option<Instant>,
    ) -> Result<()> {
        state.blocked_readers += 1;
        verbose!(state, ?deadline, "reader blocked on empty buffer");
        let timed_out = wait(&self.inner.write_ready, state, deadline);
        state.blocked_readers -= 1;
        state.check_open()?;
        if timed_out {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Wakes readers after items were produced.
    ///
    /// Readers wait for different amounts, so all of them are woken and
    /// each rechecks its own predicate.
    pub(crate) fn wake_readers(&self, state: &State<T>) {
        if state.blocked_readers > 0 {
            verbose!(state, blocked = state.blocked_readers, "waking readers");
            self.inner.write_ready.notify_all();
        }
    }

    /// Wakes writers after `freed` slots became available.
    ///
    /// Batch writers wait for different amounts of space, so like readers
    /// all of them are woken.
    pub(crate) fn wake_writers(&self, state: &State<T>, freed: usize) {
        if state.blocked_writers == 0 || freed == 0 {
            return;
        }
        verbose!(state, blocked = state.blocked_writers, freed, "waking writers");
        self.inner.read_ready.notify_all();
    }

    fn wake_all(&self) {
        self.inner.read_ready.notify_all();
        self.inner.write_ready.notify_all();
    }
}

/// Waits on `cond` until notified or `deadline` passes. Returns true on timeout.
fn wait<T>(cond: &Condvar, state: &mut MutexGuard<'_, State<T>>, deadline: Option<Instant>) -> bool {
    match deadline {
        Some(deadline) => cond.wait_until(state, deadline).timed_out(),
        None => {
            cond.wait(state);
            false
        }
    }
}
