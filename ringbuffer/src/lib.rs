//! Thread-safe fixed-capacity ring buffer.
//!
//! [`RingBuffer<T>`] is a FIFO queue of at most `capacity` items shared
//! between any number of producer and consumer threads. Cloning a handle
//! shares the same buffer.
//!
//! # Modes
//!
//! What happens when a write meets a full buffer, or a read an empty one,
//! depends on the configuration:
//!
//! - **Non-blocking** (default): the operation fails with [`Error::Full`] or
//!   [`Error::Empty`].
//! - **Blocking**: the operation waits for a counterpart. A read or write
//!   timeout bounds the wait and yields [`Error::DeadlineExceeded`].
//! - **Overwrite**: writes never wait; the oldest unread item is evicted.
//!
//! ```
//! use std::time::Duration;
//! use giztoy_ringbuffer::{Error, RingBuffer};
//!
//! let buf = RingBuffer::<i32>::new(2).unwrap();
//! buf.write(1).unwrap();
//! buf.write(2).unwrap();
//! assert_eq!(buf.write(3), Err(Error::Full));
//!
//! buf.set_write_timeout(Duration::from_millis(10));
//! assert_eq!(buf.write(3), Err(Error::DeadlineExceeded));
//!
//! buf.set_overwrite(true);
//! buf.write(3).unwrap();
//! assert_eq!(buf.to_vec(), vec![2, 3]);
//! ```
//!
//! # Closing, pausing and resetting
//!
//! [`RingBuffer::close`] drops the contents and wakes every blocked thread
//! with [`Error::Closed`]; every later operation fails the same way.
//! [`RingBuffer::pause`] makes data transfers fail with [`Error::Paused`]
//! until [`RingBuffer::resume`]. [`RingBuffer::reset`] returns a buffer,
//! closed or not, to its initial empty state.
//!
//! # Zero-copy views
//!
//! [`RingBuffer::get_all_view`], [`RingBuffer::get_n_view`] and
//! [`RingBuffer::peek_n_view`] return a [`View`] exposing the items as at
//! most two slices of the underlying storage. A view holds the buffer lock
//! until it is dropped.
//!
//! ```
//! use giztoy_ringbuffer::RingBuffer;
//!
//! let buf = RingBuffer::<u8>::new(4).unwrap();
//! buf.write_many(*b"wxyz").unwrap();
//! buf.get_n(3).unwrap();
//! buf.write_many(*b"ab").unwrap();
//!
//! let view = buf.peek_n_view(3).unwrap();
//! assert_eq!(view.first(), b"z");
//! assert_eq!(view.second(), b"ab");
//! ```
//!
//! # Hooks
//!
//! Callbacks can observe writes, reads, fullness and lifecycle events, or
//! intervene right before a reader or writer would block. Event hooks run
//! under the buffer lock and must not call back into the buffer; pre-block
//! hooks run unlocked. Capture a [`WeakRingBuffer`] in hooks that need the
//! buffer.
//!
//! # Logging
//!
//! Close is always logged at `debug` level through `tracing`. Every other
//! operation is logged only when verbose mode is on
//! ([`Config::with_verbose`] or [`RingBuffer::set_verbose`]).

/// Emits a `tracing::debug!` event if the buffer state has verbose logging on.
macro_rules! verbose {
    ($state:expr, $($arg:tt)+) => {
        if $state.verbose {
            tracing::debug!($($arg)+);
        }
    };
}

mod config;
mod error;
mod hooks;
mod read;
mod ring_buffer;
mod state;
mod view;
mod weak;
mod write;

pub use config::Config;
pub use error::{Error, Result};
pub use hooks::{
    Callback, ErrorCallback, ItemCallback, PreRead, PreReadBlockHook, PreWriteBlockHook,
    StateChangeCallback,
};
pub use ring_buffer::RingBuffer;
pub use view::View;
pub use weak::WeakRingBuffer;
