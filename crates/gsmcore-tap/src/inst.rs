use std::io::{ErrorKind, Write};
use std::os::fd::{AsRawFd, RawFd};

use gsmcore_buffer::{MsgBuf, MsgQueue};
use gsmcore_transport::reactor::{deregister_fd, register_fd, reregister_fd};
use gsmcore_transport::{
    DiscardSink, Interest, ReadyHandler, Readiness, Registry, TapSocket, Token, TransportError,
};
use tracing::{debug, info, trace, warn};

use crate::config::{Delivery, TapConfig};
use crate::error::{Result, TapError};
use crate::header::{make_msg, RadioContext};

/// Reactor tokens of a tap instance's descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapTokens {
    pub source: Token,
    pub sink: Token,
}

/// Delivery counters of a tap instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TapStats {
    /// Messages written completely.
    pub sent: u64,
    /// Messages accepted into the write queue.
    pub queued: u64,
    /// Messages rejected because the queue was full.
    pub dropped_full: u64,
    /// Writes that consumed only part of a message.
    pub short_writes: u64,
    /// Writes that failed or consumed nothing.
    pub send_errors: u64,
    /// Datagrams and socket errors swallowed by the source or the sink.
    pub sink_discarded: u64,
    /// Queued messages released undelivered at teardown.
    pub dropped_shutdown: u64,
}

struct Registration {
    registry: Registry,
    tokens: TapTokens,
    source_fd: Option<RawFd>,
    sink_fd: Option<RawFd>,
    write_armed: bool,
}

/// Tap instance mirroring messages onto a monitoring endpoint.
///
/// With [`Delivery::Direct`] every [`send_msg`](Self::send_msg) performs one
/// blocking write. With [`Delivery::Queued`] messages go into a bounded
/// queue and one message is written per write-readiness event, see
/// [`on_writable`](Self::on_writable).
pub struct GsmtapInst<T> {
    writer: T,
    delivery: Delivery,
    queue: MsgQueue,
    sink: Option<DiscardSink>,
    registration: Option<Registration>,
    stats: TapStats,
}

impl GsmtapInst<TapSocket> {
    /// Connect a tap socket to the configured destination.
    ///
    /// Queued delivery puts the socket in non-blocking mode. A requested
    /// sink is skipped with a log line when the destination is remote or
    /// its port cannot be bound.
    pub fn open(config: &TapConfig) -> Result<Self> {
        let socket = TapSocket::connect(config.host(), config.port())?;
        if config.delivery.is_queued() {
            socket.set_nonblocking(true)?;
        }

        info!(
            target: "gsmcore::tap",
            host = config.host(),
            port = config.port(),
            delivery = ?config.delivery,
            "tap opened"
        );

        let mut inst = Self::with_writer(socket, config.delivery);
        if config.add_sink {
            inst.add_sink()?;
        }
        Ok(inst)
    }

    /// Bind a discard sink to the destination.
    ///
    /// Returns `Ok(false)` without error when the destination is not local
    /// or binding it fails, e.g. because a monitor already holds the port
    /// exclusively. When the instance is already registered, the sink is registered for
    /// read readiness as well.
    pub fn add_sink(&mut self) -> Result<bool> {
        if self.sink.is_some() {
            return Ok(true);
        }

        let sink = match DiscardSink::for_source(&self.writer) {
            Ok(sink) => sink,
            Err(TransportError::NotLocal { addr }) => {
                debug!(target: "gsmcore::tap", %addr, "destination not local; no sink added");
                return Ok(false);
            }
            Err(TransportError::Bind { addr, source }) => {
                debug!(target: "gsmcore::tap", %addr, error = %source, "cannot bind sink; no sink added");
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(reg) = self.registration.as_mut() {
            let fd = sink.as_raw_fd();
            register_fd(&reg.registry, fd, reg.tokens.sink, Interest::READABLE)?;
            reg.sink_fd = Some(fd);
        }

        self.sink = Some(sink);
        Ok(true)
    }

    /// Register the instance's descriptors with a reactor.
    ///
    /// Queued delivery registers the source socket for read readiness, and
    /// for write readiness while messages are waiting. A sink, if present,
    /// is registered for read readiness.
    pub fn register(&mut self, registry: &Registry, tokens: TapTokens) -> Result<()> {
        if self.registration.is_some() {
            self.deregister();
        }

        let registry = registry.try_clone().map_err(TransportError::Poll)?;
        let mut reg = Registration {
            registry,
            tokens,
            source_fd: None,
            sink_fd: None,
            write_armed: false,
        };

        if self.delivery.is_queued() {
            let fd = self.writer.as_raw_fd();
            let write_armed = !self.queue.is_empty();
            register_fd(&reg.registry, fd, tokens.source, source_interest(write_armed))?;
            reg.source_fd = Some(fd);
            reg.write_armed = write_armed;
        }

        if let Some(sink) = &self.sink {
            let fd = sink.as_raw_fd();
            if let Err(err) = register_fd(&reg.registry, fd, tokens.sink, Interest::READABLE) {
                if let Some(source_fd) = reg.source_fd {
                    let _ = deregister_fd(&reg.registry, source_fd);
                }
                return Err(err.into());
            }
            reg.sink_fd = Some(fd);
        }

        debug!(target: "gsmcore::tap", ?tokens, "tap registered with reactor");
        self.registration = Some(reg);
        Ok(())
    }

    pub fn sink(&self) -> Option<&DiscardSink> {
        self.sink.as_ref()
    }
}

impl<T: Write> GsmtapInst<T> {
    /// Create an instance over any writer; each `write` call is one datagram.
    pub fn with_writer(writer: T, delivery: Delivery) -> Self {
        let queue = match delivery {
            Delivery::Direct => MsgQueue::new(),
            Delivery::Queued { limit } => MsgQueue::with_limit(limit),
        };
        Self {
            writer,
            delivery,
            queue,
            sink: None,
            registration: None,
            stats: TapStats::default(),
        }
    }

    /// Encapsulate `payload` in a GSMTAP header for `ctx` and deliver it.
    pub fn send(&mut self, ctx: &RadioContext, payload: &[u8]) -> Result<()> {
        let msg = make_msg(ctx, payload)?;
        self.send_msg(msg)
    }

    /// Deliver an already encapsulated message.
    ///
    /// Direct delivery makes one write attempt:
    /// - complete write: the message is released, `Ok(())`
    /// - nothing written or an I/O error: the message is released,
    ///   [`TapError::SendFailed`]
    /// - partial write: [`TapError::ShortWrite`] hands the message back,
    ///   no retry
    ///
    /// Queued delivery never blocks: a full queue returns
    /// [`TapError::QueueFull`] carrying the message.
    pub fn send_msg(&mut self, msg: MsgBuf) -> Result<()> {
        match self.delivery {
            Delivery::Direct => self.write_direct(msg),
            Delivery::Queued { .. } => self.enqueue(msg),
        }
    }

    /// Write-readiness callback: dequeue one message and write it once.
    ///
    /// A short write drops the message and reports
    /// [`TapError::ShortWrite`]; the remainder is never resumed. A write
    /// that would block puts the message back at the head of the queue.
    pub fn on_writable(&mut self) -> Result<()> {
        let Some(msg) = self.queue.dequeue() else {
            self.set_write_interest(false)?;
            return Ok(());
        };

        let result = self.write_queued(msg);
        self.set_write_interest(!self.queue.is_empty())?;
        result
    }

    fn enqueue(&mut self, msg: MsgBuf) -> Result<()> {
        match self.queue.enqueue(msg) {
            Ok(()) => {
                self.stats.queued += 1;
                trace!(target: "gsmcore::tap", depth = self.queue.len(), "tap message queued");
                self.set_write_interest(true)
            }
            Err(full) => {
                self.stats.dropped_full += 1;
                warn!(target: "gsmcore::tap", limit = full.limit, "tap write queue full");
                Err(TapError::QueueFull(full))
            }
        }
    }

    fn write_direct(&mut self, msg: MsgBuf) -> Result<()> {
        let len = msg.len();
        loop {
            match self.writer.write(msg.data()) {
                Ok(0) => {
                    self.stats.send_errors += 1;
                    return Err(TapError::SendFailed(std::io::Error::from(
                        ErrorKind::WriteZero,
                    )));
                }
                Ok(n) if n >= len => {
                    self.stats.sent += 1;
                    msg.release();
                    return Ok(());
                }
                Ok(written) => {
                    self.stats.short_writes += 1;
                    warn!(target: "gsmcore::tap", written, len, "short write to tap socket");
                    return Err(TapError::ShortWrite {
                        written,
                        len,
                        msg: Some(msg),
                    });
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.stats.send_errors += 1;
                    debug!(target: "gsmcore::tap", error = %err, "tap write failed");
                    return Err(TapError::SendFailed(err));
                }
            }
        }
    }

    fn write_queued(&mut self, msg: MsgBuf) -> Result<()> {
        let len = msg.len();
        match self.writer.write(msg.data()) {
            Ok(0) => {
                self.stats.send_errors += 1;
                Err(TapError::SendFailed(std::io::Error::from(
                    ErrorKind::WriteZero,
                )))
            }
            Ok(n) if n >= len => {
                self.stats.sent += 1;
                msg.release();
                Ok(())
            }
            Ok(written) => {
                self.stats.short_writes += 1;
                warn!(target: "gsmcore::tap", written, len, "short write to tap socket");
                Err(TapError::ShortWrite {
                    written,
                    len,
                    msg: None,
                })
            }
            Err(err)
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::Interrupted =>
            {
                // Nothing was written; keep the message for the next event.
                if let Err(full) = self.queue.requeue(msg) {
                    self.stats.dropped_full += 1;
                    return Err(TapError::QueueFull(full));
                }
                Ok(())
            }
            Err(err) => {
                self.stats.send_errors += 1;
                debug!(target: "gsmcore::tap", error = %err, "writing queued message to tap failed");
                Err(TapError::SendFailed(err))
            }
        }
    }

    fn set_write_interest(&mut self, armed: bool) -> Result<()> {
        let Some(reg) = self.registration.as_mut() else {
            return Ok(());
        };
        let Some(fd) = reg.source_fd else {
            return Ok(());
        };
        // Edge-triggered: reregistering yields a fresh event for a socket
        // that is still writable.
        if armed || reg.write_armed {
            reregister_fd(&reg.registry, fd, reg.tokens.source, source_interest(armed))?;
            reg.write_armed = armed;
        }
        Ok(())
    }
}

impl<T> GsmtapInst<T> {
    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    /// Number of messages waiting in the write queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> TapStats {
        self.stats
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &T {
        &self.writer
    }

    /// Mutably borrow the underlying writer.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.writer
    }

    /// Tear the instance down: deregister, release queued messages
    /// undelivered, close the sockets. Returns the final counters.
    pub fn close(mut self) -> TapStats {
        self.teardown();
        info!(target: "gsmcore::tap", stats = ?self.stats, "tap closed");
        self.stats
    }

    fn deregister(&mut self) {
        if let Some(reg) = self.registration.take() {
            for fd in [reg.source_fd, reg.sink_fd].into_iter().flatten() {
                if let Err(err) = deregister_fd(&reg.registry, fd) {
                    debug!(target: "gsmcore::tap", error = %err, "deregistering tap descriptor failed");
                }
            }
        }
    }

    fn teardown(&mut self) {
        self.deregister();
        let dropped = self.queue.clear();
        if dropped > 0 {
            self.stats.dropped_shutdown += dropped as u64;
            info!(target: "gsmcore::tap", dropped, "dropping undelivered tap messages");
        }
    }
}

impl<T> Drop for GsmtapInst<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl ReadyHandler for GsmtapInst<TapSocket> {
    type Error = TapError;

    fn on_ready(&mut self, ready: Readiness) -> Result<()> {
        let Some(tokens) = self.registration.as_ref().map(|reg| reg.tokens) else {
            return Ok(());
        };

        if ready.token == tokens.source {
            if ready.readable || ready.error {
                match self.writer.discard_pending() {
                    Ok(absorbed) => self.stats.sink_discarded += absorbed as u64,
                    Err(err) => {
                        warn!(target: "gsmcore::tap", error = %err, "draining tap socket failed");
                    }
                }
            }
            // Edge-triggered: serve the write edge even if draining failed.
            if ready.writable {
                self.on_writable()?;
            }
        } else if ready.token == tokens.sink {
            if let Some(sink) = &self.sink {
                match sink.drain() {
                    Ok(absorbed) => self.stats.sink_discarded += absorbed as u64,
                    Err(err) => {
                        warn!(target: "gsmcore::tap", error = %err, "draining tap sink failed");
                    }
                }
            }
        }
        Ok(())
    }
}

impl<T> std::fmt::Debug for GsmtapInst<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GsmtapInst")
            .field("delivery", &self.delivery)
            .field("queued", &self.queue.len())
            .field("sink", &self.sink)
            .field("registered", &self.registration.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

fn source_interest(write_armed: bool) -> Interest {
    if write_armed {
        Interest::READABLE | Interest::WRITABLE
    } else {
        Interest::READABLE
    }
}
