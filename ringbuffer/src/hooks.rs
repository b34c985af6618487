//! Hook callbacks invoked at buffer lifecycle points.
//!
//! Each hook kind has one slot; registering a hook replaces the previous
//! one. Event hooks (`on_*`) run synchronously while the buffer lock is
//! held and must not call back into the same buffer. The pre-block hooks
//! run with the lock released and may call back freely.

use std::sync::Arc;

use crate::error::Error;

/// Notification with no arguments (full, empty, reset, flush, close, pause, resume).
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Called with an item and whether the transfer succeeded.
pub type ItemCallback<T> = Arc<dyn Fn(&T, bool) + Send + Sync>;

/// Called with the error a data operation is about to return.
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Called with `(is_full, len)` after the buffer contents change.
pub type StateChangeCallback = Arc<dyn Fn(bool, usize) + Send + Sync>;

/// Called before a writer blocks on a full buffer. Returns true if it
/// freed space, in which case fullness is rechecked once.
pub type PreWriteBlockHook = Arc<dyn Fn() -> bool + Send + Sync>;

/// Called before a reader blocks on an empty buffer.
pub type PreReadBlockHook<T> = Arc<dyn Fn() -> PreRead<T> + Send + Sync>;

/// Outcome of a pre-read-block hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreRead<T> {
    /// The hook made data available; recheck emptiness once.
    Retry,
    /// Hand this item to the reader directly, bypassing storage.
    Deliver(T),
    /// Nothing changed; block or fail as configured.
    Block,
}

impl<T> From<bool> for PreRead<T> {
    fn from(retry: bool) -> Self {
        if retry { PreRead::Retry } else { PreRead::Block }
    }
}

pub(crate) struct Hooks<T> {
    pub(crate) pre_read_block: Option<PreReadBlockHook<T>>,
    pub(crate) pre_write_block: Option<PreWriteBlockHook>,
    pub(crate) on_full: Option<Callback>,
    pub(crate) on_empty: Option<Callback>,
    pub(crate) on_write: Option<ItemCallback<T>>,
    pub(crate) on_read: Option<ItemCallback<T>>,
    pub(crate) on_reset: Option<Callback>,
    pub(crate) on_flush: Option<Callback>,
    pub(crate) on_close: Option<Callback>,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) on_state_change: Option<StateChangeCallback>,
    pub(crate) on_pause: Option<Callback>,
    pub(crate) on_resume: Option<Callback>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Hooks {
            pre_read_block: None,
            pre_write_block: None,
            on_full: None,
            on_empty: None,
            on_write: None,
            on_read: None,
            on_reset: None,
            on_flush: None,
            on_close: None,
            on_error: None,
            on_state_change: None,
            on_pause: None,
            on_resume: None,
        }
    }
}

pub(crate) fn fire(hook: &Option<Callback>) {
    if let Some(hook) = hook {
        hook();
    }
}
