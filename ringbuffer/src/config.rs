//! Construction-time configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::hooks::{PreRead, PreReadBlockHook, PreWriteBlockHook};

/// Ring buffer configuration.
///
/// Used with [`RingBuffer::with_config`](crate::RingBuffer::with_config).
/// Every field can also be changed later through the buffer's `set_*`
/// methods.
///
/// ```
/// use std::time::Duration;
/// use giztoy_ringbuffer::{Config, RingBuffer};
///
/// let config = Config::new()
///     .with_blocking(true)
///     .with_write_timeout(Duration::from_millis(50));
/// let buf = RingBuffer::<u32>::with_config(8, config).unwrap();
/// assert!(buf.is_blocking());
/// ```
pub struct Config<T> {
    /// Block instead of failing on a full or empty buffer.
    pub blocking: bool,
    /// Bound on how long a reader waits for data. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Bound on how long a writer waits for space. `None` waits forever.
    pub write_timeout: Option<Duration>,
    /// Evict the oldest item when writing to a full buffer.
    pub overwrite: bool,
    /// Emit per-operation `tracing` diagnostics.
    pub verbose: bool,
    /// Called before a reader blocks.
    pub pre_read_block_hook: Option<PreReadBlockHook<T>>,
    /// Called before a writer blocks.
    pub pre_write_block_hook: Option<PreWriteBlockHook>,
}

impl<T> Default for Config<T> {
    fn default() -> Self {
        Config {
            blocking: false,
            read_timeout: None,
            write_timeout: None,
            overwrite: false,
            verbose: false,
            pre_read_block_hook: None,
            pre_write_block_hook: None,
        }
    }
}

impl<T> Clone for Config<T> {
    fn clone(&self) -> Self {
        Config {
            blocking: self.blocking,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
            overwrite: self.overwrite,
            verbose: self.verbose,
            pre_read_block_hook: self.pre_read_block_hook.clone(),
            pre_write_block_hook: self.pre_write_block_hook.clone(),
        }
    }
}

impl<T> Config<T> {
    /// Create a non-blocking configuration without timeouts or hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set blocking mode.
    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// Set the read timeout. A zero duration waits forever.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = non_zero(timeout);
        self
    }

    /// Set the write timeout. A zero duration waits forever.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = non_zero(timeout);
        self
    }

    /// Set both timeouts.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_read_timeout(timeout).with_write_timeout(timeout)
    }

    /// Set overwrite mode.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Enable or disable verbose diagnostics.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the pre-read-block hook.
    pub fn with_pre_read_block_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> PreRead<T> + Send + Sync + 'static,
    {
        self.pre_read_block_hook = Some(Arc::new(hook));
        self
    }

    /// Set the pre-write-block hook.
    pub fn with_pre_write_block_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.pre_write_block_hook = Some(Arc::new(hook));
        self
    }

    /// Returns true if a timeout is configured, which implies blocking.
    pub(crate) fn effective_blocking(&self) -> bool {
        self.blocking || self.read_timeout.is_some() || self.write_timeout.is_some()
    }
}

pub(crate) fn non_zero(timeout: Duration) -> Option<Duration> {
    if timeout.is_zero() { None } else { Some(timeout) }
}
