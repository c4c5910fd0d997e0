//! Single-threaded readiness reactor.
//!
//! File descriptors are registered with an interest mask and a token.
//! [`Reactor::poll_once`] waits for readiness and invokes the
//! [`ReadyHandler`] once per ready descriptor, on the calling thread.
//!
//! mio reports readiness edge-triggered. Handlers that consume only part
//! of what is ready re-arm their descriptor with
//! [`reregister_fd`] to be called again.

use std::io::ErrorKind;
use std::os::fd::RawFd;
use std::time::Duration;

use mio::unix::SourceFd;
use mio::{Events, Poll};
use tracing::trace;

use crate::error::{Result, TransportError};

pub use mio::{Interest, Registry, Token};

const EVENTS_CAPACITY: usize = 256;

/// Readiness of one registered descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub token: Token,
    pub readable: bool,
    pub writable: bool,
    pub error: bool,
    pub hup: bool,
}

impl Readiness {
    fn from_event(event: &mio::event::Event) -> Self {
        Self {
            token: event.token(),
            readable: event.is_readable(),
            writable: event.is_writable(),
            error: event.is_error(),
            hup: event.is_read_closed() || event.is_write_closed(),
        }
    }
}

/// Callback invoked by the reactor for every ready descriptor.
pub trait ReadyHandler {
    type Error: From<TransportError>;

    fn on_ready(&mut self, ready: Readiness) -> std::result::Result<(), Self::Error>;
}

/// Readiness reactor over `mio::Poll`.
pub struct Reactor {
    poll: Poll,
    events: Events,
}

impl Reactor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            poll: Poll::new().map_err(TransportError::Poll)?,
            events: Events::with_capacity(EVENTS_CAPACITY),
        })
    }

    /// Registry used to (re)register descriptors.
    pub fn registry(&self) -> &Registry {
        self.poll.registry()
    }

    pub fn register_fd(&self, fd: RawFd, token: Token, interest: Interest) -> Result<()> {
        register_fd(self.registry(), fd, token, interest)
    }

    /// Wait up to `timeout` for readiness and dispatch every event to
    /// `handler`. Returns the number of events dispatched.
    ///
    /// An interrupted wait dispatches nothing and returns 0.
    pub fn poll_once<H: ReadyHandler>(
        &mut self,
        timeout: Option<Duration>,
        handler: &mut H,
    ) -> std::result::Result<usize, H::Error> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::Interrupted => return Ok(0),
            Err(err) => return Err(TransportError::Poll(err).into()),
        }

        let mut dispatched = 0usize;
        for event in self.events.iter() {
            let ready = Readiness::from_event(event);
            trace!(target: "gsmcore::transport", ?ready, "dispatching readiness");
            handler.on_ready(ready)?;
            dispatched += 1;
        }
        Ok(dispatched)
    }
}

impl std::fmt::Debug for Reactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor").finish_non_exhaustive()
    }
}

/// Register a raw descriptor with `registry`.
pub fn register_fd(registry: &Registry, fd: RawFd, token: Token, interest: Interest) -> Result<()> {
    registry
        .register(&mut SourceFd(&fd), token, interest)
        .map_err(TransportError::Poll)
}

/// Change the interest of a registered descriptor. Re-arms edge-triggered
/// readiness.
pub fn reregister_fd(
    registry: &Registry,
    fd: RawFd,
    token: Token,
    interest: Interest,
) -> Result<()> {
    registry
        .reregister(&mut SourceFd(&fd), token, interest)
        .map_err(TransportError::Poll)
}

pub fn deregister_fd(registry: &Registry, fd: RawFd) -> Result<()> {
    registry
        .deregister(&mut SourceFd(&fd))
        .map_err(TransportError::Poll)
}
