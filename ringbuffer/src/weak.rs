//! Non-owning buffer handle.

use std::sync::Weak;

use crate::error::{Error, Result};
use crate::ring_buffer::{RingBuffer, RingBufferInner};

/// A handle that does not keep its [`RingBuffer`] alive.
///
/// Obtained from [`RingBuffer::downgrade`]. Hooks registered on a buffer
/// should capture a weak handle rather than a clone, otherwise the buffer
/// owns itself and is never dropped. Once every strong handle is gone,
/// operations fail with [`Error::NilBuffer`].
pub struct WeakRingBuffer<T> {
    inner: Weak<RingBufferInner<T>>,
}

impl<T> Clone for WeakRingBuffer<T> {
    fn clone(&self) -> Self {
        WeakRingBuffer {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakRingBuffer<T> {
    pub(crate) fn new(inner: Weak<RingBufferInner<T>>) -> Self {
        WeakRingBuffer { inner }
    }

    /// Returns a strong handle, or [`Error::NilBuffer`] if the buffer has
    /// been dropped.
    pub fn upgrade(&self) -> Result<RingBuffer<T>> {
        self.inner
            .upgrade()
            .map(|inner| RingBuffer { inner })
            .ok_or(Error::NilBuffer)
    }

    /// Returns the number of unread items. See [`RingBuffer::len`].
    pub fn len(&self) -> Result<usize> {
        Ok(self.upgrade()?.len())
    }

    /// Returns true if the buffer holds no items.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.upgrade()?.is_empty())
    }
}

impl<T: Default> WeakRingBuffer<T> {
    /// Writes one item. See [`RingBuffer::write`].
    pub fn write(&self, item: T) -> Result<()> {
        self.upgrade()?.write(item)
    }

    /// Writes a batch, all or nothing. See [`RingBuffer::write_many`].
    pub fn write_many<I>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        self.upgrade()?.write_many(items)
    }

    /// Writes without waiting; `Ok(false)` if the item was not stored.
    pub fn try_write(&self, item: T) -> Result<bool> {
        Ok(self.upgrade()?.try_write(item))
    }

    /// Removes the oldest item. See [`RingBuffer::get_one`].
    pub fn get_one(&self) -> Result<T> {
        self.upgrade()?.get_one()
    }

    /// Removes exactly `n` items. See [`RingBuffer::get_n`].
    pub fn get_n(&self, n: usize) -> Result<Vec<T>> {
        self.upgrade()?.get_n(n)
    }

    /// Removes the oldest item without waiting.
    pub fn try_read(&self) -> Result<Option<T>> {
        Ok(self.upgrade()?.try_read())
    }

    /// Discards all items. See [`RingBuffer::flush`].
    pub fn flush(&self) -> Result<()> {
        self.upgrade()?.flush();
        Ok(())
    }

    /// Returns the buffer to its initial state. See [`RingBuffer::reset`].
    pub fn reset(&self) -> Result<()> {
        self.upgrade()?.reset();
        Ok(())
    }

    /// Closes the buffer. See [`RingBuffer::close`].
    pub fn close(&self) -> Result<()> {
        self.upgrade()?.close()
    }
}

impl<T: Clone> WeakRingBuffer<T> {
    /// Returns a copy of the oldest item.
    pub fn peek_one(&self) -> Result<T> {
        self.upgrade()?.peek_one()
    }
}
