//! Buffer management and wire encapsulation for a GSM mobile-station stack.
//!
//! # Crate Structure
//!
//! - [`bits`]: conversion between soft, unpacked and packed bits
//! - [`buffer`]: message buffers with layer marks, and their FIFO queue
//! - [`transport`]: tap socket, discard sink and readiness reactor (UDP)
//! - [`tap`]: GSMTAP header encapsulation and direct or queued mirroring

/// Re-export bit-packing types.
pub mod bits {
    pub use gsmcore_bits::*;
}

/// Re-export message buffer types.
pub mod buffer {
    pub use gsmcore_buffer::*;
}

/// Re-export transport types.
pub mod transport {
    pub use gsmcore_transport::*;
}

/// Re-export tap types.
pub mod tap {
    pub use gsmcore_tap::*;
}
