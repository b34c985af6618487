//! Write operations.

use parking_lot::MutexGuard;

use crate::error::{Error, Result};
use crate::ring_buffer::RingBuffer;
use crate::state::State;

impl<T: Default> RingBuffer<T> {
    /// Writes a single item.
    ///
    /// On a full buffer the write evicts the oldest item in overwrite mode,
    /// otherwise it consults the pre-write-block hook and then blocks (until
    /// space frees up or the write timeout elapses) or fails with
    /// [`Error::Full`].
    pub fn write(&self, item: T) -> Result<()> {
        let mut state = self.inner.state.lock();
        if let Err(err) = self.reserve(&mut state, 1) {
            state.notify_write_failed(&item);
            state.report_error(&err);
            return Err(err);
        }
        self.put(&mut state, item);
        self.wake_readers(&state);
        Ok(())
    }

    /// Writes a batch of items in order, all or nothing.
    ///
    /// The batch waits until there is room for every item, with the same
    /// overwrite, hook, blocking and timeout rules as [`write`](Self::write),
    /// and is then stored under one lock. Any failure leaves the buffer
    /// untouched. A batch larger than the capacity fails with
    /// [`Error::TooMuchToWrite`].
    ///
    /// ```
    /// use giztoy_ringbuffer::{Error, RingBuffer};
    ///
    /// let buf = RingBuffer::<i32>::new(3).unwrap();
    /// assert_eq!(buf.write_many([1, 2]), Ok(2));
    /// assert_eq!(buf.write_many([3, 4]), Err(Error::Full));
    /// assert_eq!(buf.write_many([1, 2, 3, 4]), Err(Error::TooMuchToWrite));
    /// assert_eq!(buf.to_vec(), vec![1, 2]);
    /// ```
    pub fn write_many<I>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let items = items.into_iter();
        let n = items.len();
        if n == 0 {
            return Ok(0);
        }

        let mut state = self.inner.state.lock();
        if let Err(err) = self.reserve(&mut state, n) {
            for item in items {
                state.notify_write_failed(&item);
            }
            state.report_error(&err);
            return Err(err);
        }

        let mut written = 0;
        for item in items.take(n) {
            self.put(&mut state, item);
            written += 1;
        }
        verbose!(state, written, "batch written");
        self.wake_readers(&state);
        Ok(written)
    }

    /// Writes an item without waiting.
    ///
    /// Returns false if the buffer is closed, paused, or full without
    /// overwrite. Pre-block hooks and timeouts are not consulted.
    pub fn try_write(&self, item: T) -> bool {
        let mut state = self.inner.state.lock();
        if state.check_open().is_err() {
            return false;
        }
        if state.full {
            if !state.overwrite {
                state.notify_write_failed(&item);
                return false;
            }
            state.evict_oldest();
        }
        self.put(&mut state, item);
        self.wake_readers(&state);
        true
    }

    /// Makes room for `n` items, waiting if configured to.
    fn reserve(&self, state: &mut MutexGuard<'_, State<T>>, n: usize) -> Result<()> {
        state.check_open()?;
        if n > state.capacity() {
            return Err(Error::TooMuchToWrite);
        }

        let mut retry = true;
        let mut deadline = None;
        while state.free() < n {
            if state.overwrite {
                let evicted = n - state.free();
                verbose!(state, evicted, read_pos = state.read_pos, "overwriting oldest items");
                for _ in 0..evicted {
                    state.evict_oldest();
                }
                break;
            }

            if retry {
                if let Some(hook) = state.hooks.pre_write_block.clone() {
                    let resolved = MutexGuard::unlocked(state, || hook());
                    state.check_open()?;
                    if resolved {
                        retry = false;
                    }
                    if resolved || state.free() >= n {
                        continue;
                    }
                }
            }

            if !state.blocking {
                return Err(Error::Full);
            }

            let deadline = *deadline.get_or_insert_with(|| state.write_deadline());
            self.wait_for_space(state, deadline)?;
        }
        Ok(())
    }

    fn put(&self, state: &mut MutexGuard<'_, State<T>>, item: T) {
        let idx = state.push(item);
        verbose!(
            state,
            write_pos = state.write_pos,
            full = state.full,
            "item written"
        );
        state.notify_written(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_write_full_non_blocking() {
        let buf = RingBuffer::<i32>::new(2).unwrap();
        buf.write(1).unwrap();
        buf.write(2).unwrap();

        assert_eq!(buf.write(3), Err(Error::Full));
        // State unchanged.
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_write_overwrite() {
        let buf = RingBuffer::<i32>::new(3).unwrap();
        buf.set_overwrite(true);
        for i in 1..=5 {
            buf.write(i).unwrap();
        }
        assert!(buf.is_full());
        assert_eq!(buf.to_vec(), vec![3, 4, 5]);
        assert_eq!(buf.get_one(), Ok(3));
    }

    #[test]
    fn test_overwrite_never_blocks() {
        let buf = RingBuffer::<i32>::new(2).unwrap();
        buf.set_blocking(true).set_overwrite(true);

        let start = Instant::now();
        for i in 0..100 {
            buf.write(i).unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(buf.to_vec(), vec![98, 99]);
    }

    #[test]
    fn test_write_many_empty() {
        let buf = RingBuffer::<i32>::new(2).unwrap();
        buf.close().unwrap();
        assert_eq!(buf.write_many(Vec::new()), Ok(0));
    }

    #[test]
    fn test_write_many_too_large() {
        let buf = RingBuffer::<i32>::new(2).unwrap();
        assert_eq!(buf.write_many(vec![1, 2, 3]), Err(Error::TooMuchToWrite));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_write_many_full() {
        let buf = RingBuffer::<i32>::new(3).unwrap();
        buf.write_many(vec![1, 2, 3]).unwrap();
        assert_eq!(buf.write_many(vec![4, 5]), Err(Error::Full));
        assert_eq!(buf.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_write_many_is_all_or_nothing() {
        let buf = RingBuffer::<i32>::new(4).unwrap();
        buf.write_many(vec![1, 2, 3]).unwrap();
        // One slot free, three requested: nothing is written.
        assert_eq!(buf.write_many(vec![4, 5, 6]), Err(Error::Full));
        assert_eq!(buf.to_vec(), vec![1, 2, 3]);
        assert_eq!(buf.write_many(vec![4]), Ok(1));
        assert_eq!(buf.to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_write_many_overwrite_evicts_for_batch() {
        let buf = RingBuffer::<i32>::new(4).unwrap();
        buf.set_overwrite(true);
        buf.write_many(vec![1, 2, 3]).unwrap();
        assert_eq!(buf.write_many(vec![4, 5, 6]), Ok(3));
        assert_eq!(buf.to_vec(), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_write_many_timeout_writes_nothing() {
        let buf = RingBuffer::<i32>::new(2).unwrap();
        buf.set_write_timeout(Duration::from_millis(50));
        buf.write(0).unwrap();

        let start = Instant::now();
        assert_eq!(buf.write_many(vec![1, 2]), Err(Error::DeadlineExceeded));
        assert!(start.elapsed() >= Duration::from_millis(45));
        assert_eq!(buf.to_vec(), vec![0]);
        assert_eq!(buf.blocked_writers(), 0);
    }

    #[test]
    fn test_write_many_failure_reports_every_item() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let on_write = Arc::clone(&events);

        let buf = RingBuffer::<i32>::new(2).unwrap();
        buf.write(0).unwrap();
        buf.on_write(move |item, ok| on_write.lock().unwrap().push((*item, ok)));

        assert_eq!(buf.write_many(vec![1, 2]), Err(Error::Full));
        assert_eq!(*events.lock().unwrap(), vec![(1, false), (2, false)]);
    }

    #[test]
    fn test_write_many_wraps() {
        let buf = RingBuffer::<i32>::new(4).unwrap();
        buf.write_many(vec![1, 2, 3]).unwrap();
        buf.get_n(2).unwrap();
        assert_eq!(buf.write_many(vec![4, 5, 6]), Ok(3));
        assert_eq!(buf.get_n(4), Ok(vec![3, 4, 5, 6]));
    }

    #[test]
    fn test_write_many_from_slice_iter() {
        let buf = RingBuffer::<String>::new(4).unwrap();
        let items = ["a".to_string(), "b".to_string()];
        assert_eq!(buf.write_many(items.iter().cloned()), Ok(2));
        assert_eq!(buf.get_one(), Ok("a".to_string()));
    }

    #[test]
    fn test_write_many_waits_for_whole_batch() {
        let buf = RingBuffer::<i32>::new(2).unwrap();
        buf.set_blocking(true);
        buf.write(0).unwrap();

        let writer_buf = buf.clone();
        let writer = thread::spawn(move || writer_buf.write_many(vec![1, 2]));

        while buf.blocked_writers() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        // Nothing of the batch lands while only one slot is free.
        assert_eq!(buf.to_vec(), vec![0]);

        assert_eq!(buf.get_one(), Ok(0));
        assert_eq!(writer.join().unwrap(), Ok(2));
        assert_eq!(buf.to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_write_many_unblocked_by_single_read_with_mixed_writers() {
        let buf = RingBuffer::<i32>::new(3).unwrap();
        buf.set_blocking(true);
        buf.write_many(vec![0, 0, 0]).unwrap();

        let batch_buf = buf.clone();
        let batch = thread::spawn(move || batch_buf.write_many(vec![1, 2]));
        while buf.blocked_writers() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        let single_buf = buf.clone();
        let single = thread::spawn(move || single_buf.write(3));
        while buf.blocked_writers() < 2 {
            thread::sleep(Duration::from_millis(1));
        }

        // One freed slot must reach the single writer even though the
        // batch writer cannot use it.
        buf.get_one().unwrap();
        assert_eq!(single.join().unwrap(), Ok(()));

        buf.get_n(2).unwrap();
        assert_eq!(batch.join().unwrap(), Ok(2));
        assert_eq!(buf.to_vec(), vec![3, 1, 2]);
    }

    #[test]
    fn test_try_write() {
        let buf = RingBuffer::<i32>::new(2).unwrap();
        buf.set_blocking(true);
        assert!(buf.try_write(1));
        assert!(buf.try_write(2));
        // Full and blocking: still returns immediately.
        assert!(!buf.try_write(3));
        assert_eq!(buf.to_vec(), vec![1, 2]);

        buf.set_overwrite(true);
        assert!(buf.try_write(3));
        assert_eq!(buf.to_vec(), vec![2, 3]);
    }

    #[test]
    fn test_try_write_skips_pre_block_hook() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let buf = RingBuffer::<i32>::new(1).unwrap();
        buf.pre_write_block(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        buf.write(1).unwrap();
        assert!(!buf.try_write(2));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_write_paused() {
        let buf = RingBuffer::<i32>::new(2).unwrap();
        buf.pause();
        assert_eq!(buf.write(1), Err(Error::Paused));
        assert_eq!(buf.write_many(vec![1, 2]), Err(Error::Paused));
        assert!(!buf.try_write(1));
        assert!(buf.is_empty());

        buf.resume();
        buf.write(1).unwrap();
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_pre_write_block_hook_frees_space() {
        let buf = RingBuffer::<i32>::new(2).unwrap();
        let weak = buf.downgrade();
        buf.pre_write_block(move || weak.get_one().is_ok());

        buf.write(1).unwrap();
        buf.write(2).unwrap();
        buf.write(3).unwrap();
        assert_eq!(buf.to_vec(), vec![2, 3]);
    }

    #[test]
    fn test_pre_write_block_hook_retries_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let buf = RingBuffer::<i32>::new(1).unwrap();
        buf.pre_write_block(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        buf.write(1).unwrap();

        // The hook claims success but frees nothing: one recheck, then Full.
        assert_eq!(buf.write(2), Err(Error::Full));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pre_write_block_hook_declines() {
        let buf = RingBuffer::<i32>::new(1).unwrap();
        buf.pre_write_block(|| false);
        buf.write(1).unwrap();
        assert_eq!(buf.write(2), Err(Error::Full));
    }

    #[test]
    fn test_write_hooks() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let on_write = Arc::clone(&events);
        let on_full = Arc::clone(&events);
        let on_state = Arc::clone(&events);

        let buf = RingBuffer::<i32>::new(2).unwrap();
        buf.on_write(move |item, ok| on_write.lock().unwrap().push(format!("write {item} {ok}")))
            .on_full(move || on_full.lock().unwrap().push("full".to_string()))
            .on_state_change(move |full, len| {
                on_state.lock().unwrap().push(format!("state {full} {len}"))
            });

        buf.write(1).unwrap();
        buf.write(2).unwrap();
        assert_eq!(buf.write(3), Err(Error::Full));

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "write 1 true",
                "state false 1",
                "write 2 true",
                "full",
                "state true 2",
                "write 3 false",
            ]
        );
    }

    #[test]
    fn test_on_error_hook() {
        let errors = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&errors);

        let buf = RingBuffer::<i32>::new(1).unwrap();
        buf.on_error(move |err| sink.lock().unwrap().push(*err));

        buf.write(1).unwrap();
        let _ = buf.write(2);
        let _ = buf.write_many(vec![1, 2]);
        buf.pause();
        let _ = buf.write(3);

        assert_eq!(
            *errors.lock().unwrap(),
            vec![Error::Full, Error::TooMuchToWrite, Error::Paused]
        );
    }
}
