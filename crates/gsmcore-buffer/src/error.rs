use crate::msgb::{Layer, MsgBuf};

/// Errors that can occur while manipulating a message buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// The backing store could not be allocated.
    #[error("failed to allocate {capacity} byte buffer \"{name}\"")]
    AllocFailed { name: &'static str, capacity: usize },

    /// Requested headroom exceeds the buffer capacity.
    #[error("headroom {headroom} exceeds capacity {capacity}")]
    HeadroomTooLarge { headroom: usize, capacity: usize },

    /// Not enough space after the payload.
    #[error("no tailroom ({requested} bytes requested, {available} available)")]
    NoTailroom { requested: usize, available: usize },

    /// Not enough space before the payload.
    #[error("no headroom ({requested} bytes requested, {available} available)")]
    NoHeadroom { requested: usize, available: usize },

    /// Attempt to consume more bytes than the payload holds.
    #[error("payload underflow ({requested} bytes requested, {available} available)")]
    Underflow { requested: usize, available: usize },

    /// A layer mark must point inside the current payload window.
    #[error("{layer:?} mark at {offset} outside window {start}..={end}")]
    MarkOutOfWindow {
        layer: Layer,
        offset: usize,
        start: usize,
        end: usize,
    },

    /// Headroom can only be reserved while the payload is empty.
    #[error("cannot reserve headroom in a non-empty buffer ({len} bytes)")]
    NotEmpty { len: usize },
}

pub type Result<T> = std::result::Result<T, BufferError>;

/// A bounded queue rejected a buffer. The buffer is handed back untouched.
#[derive(Debug, thiserror::Error)]
#[error("queue full ({limit} entries)")]
pub struct QueueFull {
    pub limit: usize,
    pub msg: MsgBuf,
}

impl QueueFull {
    /// Recover the rejected buffer.
    pub fn into_inner(self) -> MsgBuf {
        self.msg
    }
}
