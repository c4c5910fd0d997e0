//! GSMTAP encapsulation for the diagnostic tap.
//!
//! Any protocol message can be mirrored onto a monitoring socket. Every
//! datagram carries a fixed 16-byte header describing the radio context
//! the message was seen in, followed by the message itself:
//!
//! - version, header length in 32-bit words, payload type
//! - timeslot, sub-slot, ARFCN, SNR, signal level, frame number
//! - channel subtype, antenna index
//!
//! Delivery is either a direct (blocking) write per message, or a bounded
//! queue drained one message per write-readiness event of a reactor.

pub mod chantype;
pub mod config;
pub mod error;
pub mod header;

#[cfg(unix)]
pub mod inst;

pub use config::{Delivery, TapConfig, DEFAULT_HOST, DEFAULT_QUEUE_LIMIT, GSMTAP_UDP_PORT};
pub use error::{Result, TapError};
pub use header::{make_msg, GsmtapHeader, RadioContext, GSMTAP_TYPE_UM, GSMTAP_VERSION, HEADER_SIZE};

#[cfg(unix)]
pub use inst::{GsmtapInst, TapStats, TapTokens};
