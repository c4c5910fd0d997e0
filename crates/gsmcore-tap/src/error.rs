use gsmcore_buffer::{BufferError, MsgBuf, QueueFull};
use gsmcore_transport::TransportError;

/// Errors that can occur while encapsulating or delivering tap messages.
#[derive(Debug, thiserror::Error)]
pub enum TapError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Message buffer error.
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    /// The write failed or consumed nothing. The message was released.
    #[error("send failed: {0}")]
    SendFailed(std::io::Error),

    /// The write consumed only part of the message. No retry was made.
    ///
    /// Direct delivery hands the message back to the caller; queued
    /// delivery has already dropped it.
    #[error("short write ({written} of {len} bytes)")]
    ShortWrite {
        written: usize,
        len: usize,
        msg: Option<MsgBuf>,
    },

    /// The write queue is full. The rejected message is handed back.
    #[error("write queue full: {0}")]
    QueueFull(#[from] QueueFull),

    /// A received datagram does not start with a valid GSMTAP header.
    #[error("invalid GSMTAP header: {0}")]
    InvalidHeader(String),

    /// A received datagram is shorter than its header claims.
    #[error("truncated GSMTAP datagram ({len} bytes, need {needed})")]
    Truncated { len: usize, needed: usize },
}

pub type Result<T> = std::result::Result<T, TapError>;
