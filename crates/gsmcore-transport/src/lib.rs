//! Datagram transport for the diagnostic tap.
//!
//! - [`TapSocket`]: a UDP socket connected to the monitoring endpoint, so
//!   every write is one datagram with no per-call address
//! - [`DiscardSink`]: a local receiver bound to the monitoring endpoint
//!   that swallows response traffic, keeping ICMP port-unreachable errors
//!   away from the sending socket
//! - [`Reactor`]: single-threaded readiness notification over `mio`,
//!   dispatching to a [`ReadyHandler`]
//!
//! This is the lowest layer of gsmcore networking. The tap crate builds
//! on top of the types provided here.

pub mod error;
pub mod socket;

#[cfg(unix)]
pub mod reactor;
#[cfg(unix)]
pub mod sink;

pub use error::{Result, TransportError};
pub use socket::{is_unreachable, TapSocket};

#[cfg(unix)]
pub use reactor::{Interest, Reactor, ReadyHandler, Readiness, Registry, Token};
#[cfg(unix)]
pub use sink::{is_local_addr, DiscardSink};
