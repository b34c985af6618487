//! Error types for ring buffer operations.

/// Result type alias for ring buffer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Ring buffer operation error.
///
/// Every failing operation reports exactly one of these kinds. Callers
/// classify errors by equality, never by message:
///
/// ```
/// use giztoy_ringbuffer::{Error, RingBuffer};
///
/// let buf = RingBuffer::<i32>::new(1).unwrap();
/// buf.write(1).unwrap();
/// assert_eq!(buf.write(2), Err(Error::Full));
/// ```
///
/// [`Error::Closed`] is terminal: once a buffer is closed it masks every
/// other kind until the buffer is [`reset`](crate::RingBuffer::reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The buffer is full and neither blocking nor overwriting.
    #[error("ringbuffer: full")]
    Full,

    /// The buffer holds no data and is not blocking.
    #[error("ringbuffer: empty")]
    Empty,

    /// A requested length is zero or can never be satisfied.
    #[error("ringbuffer: invalid length")]
    InvalidLength,

    /// A peek asked for more items than the buffer holds.
    #[error("ringbuffer: too much data to peek")]
    TooMuchToPeek,

    /// A bulk write is larger than the buffer capacity.
    #[error("ringbuffer: too much data to write")]
    TooMuchToWrite,

    /// The operation went through a handle whose buffer no longer exists.
    #[error("ringbuffer: nil buffer")]
    NilBuffer,

    /// A blocking operation waited longer than its configured timeout.
    #[error("ringbuffer: deadline exceeded")]
    DeadlineExceeded,

    /// The buffer has been closed.
    #[error("ringbuffer: closed")]
    Closed,

    /// The buffer is paused and does not transfer data.
    #[error("ringbuffer: paused")]
    Paused,
}

impl Error {
    /// Returns true if the error is sticky and will be returned by every
    /// subsequent operation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Error::Closed)
    }
}
