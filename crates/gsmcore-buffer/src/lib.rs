//! Message buffers shared by every layer of the mobile-station stack.
//!
//! A [`MsgBuf`] is a fixed-capacity byte region with a movable payload
//! window and optional marks recording where each protocol layer's header
//! starts. Layers prepend or strip headers by moving the window inside the
//! pre-allocated headroom; the bytes never move.
//!
//! A buffer has exactly one owner. [`MsgQueue`] takes buffers by value on
//! enqueue and hands them back by value on dequeue.

pub mod error;
pub mod msgb;
pub mod queue;

pub use error::{BufferError, QueueFull, Result};
pub use msgb::{ChannelAssoc, Layer, MsgBuf, CB_SIZE};
pub use queue::MsgQueue;
