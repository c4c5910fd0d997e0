use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use tracing::{debug, trace};

use crate::error::{Result, TransportError};

const DISCARD_CHUNK_SIZE: usize = 4096;

/// UDP socket connected to a monitoring endpoint.
///
/// `write` sends exactly one datagram and `read` receives one. The socket
/// is blocking unless [`set_nonblocking`](Self::set_nonblocking) is used.
pub struct TapSocket {
    socket: UdpSocket,
}

impl TapSocket {
    /// Resolve `host:port` and connect an ephemeral UDP socket to the first
    /// address that accepts it.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                host: host.to_string(),
                port,
                source,
            })?;

        let mut last_err = None;
        for addr in addrs {
            match connect_addr(addr) {
                Ok(socket) => {
                    debug!(
                        target: "gsmcore::transport",
                        %addr,
                        local = ?socket.local_addr().ok(),
                        "connected tap socket"
                    );
                    return Ok(Self { socket });
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(last_err.unwrap_or_else(|| TransportError::Resolve {
            host: host.to_string(),
            port,
            source: std::io::Error::new(ErrorKind::NotFound, "no addresses resolved"),
        }))
    }

    /// Wrap an already connected socket.
    pub fn from_connected(socket: UdpSocket) -> Self {
        Self { socket }
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.socket
            .set_nonblocking(nonblocking)
            .map_err(Into::into)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Into::into)
    }

    /// Address of the monitoring endpoint.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.socket.peer_addr().map_err(Into::into)
    }

    /// Take the pending socket error, e.g. one raised by an ICMP
    /// port-unreachable reply.
    pub fn take_error(&self) -> Result<Option<std::io::Error>> {
        self.socket.take_error().map_err(Into::into)
    }

    /// Try to clone this socket (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            socket: self.socket.try_clone()?,
        })
    }

    /// Read and drop every datagram waiting on a non-blocking socket.
    ///
    /// Port, host and network unreachable errors left by ICMP replies are
    /// consumed as well.
    /// Returns the number of datagrams and errors absorbed.
    pub fn discard_pending(&self) -> Result<usize> {
        discard_pending(&self.socket)
    }

    /// Borrow the underlying socket.
    pub fn get_ref(&self) -> &UdpSocket {
        &self.socket
    }

    /// Consume the tap socket and return the underlying socket.
    pub fn into_inner(self) -> UdpSocket {
        self.socket
    }
}

impl Read for TapSocket {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.socket.recv(buf)
    }
}

impl Write for TapSocket {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.socket.send(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(unix)]
impl std::os::fd::AsRawFd for TapSocket {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        std::os::fd::AsRawFd::as_raw_fd(&self.socket)
    }
}

impl std::fmt::Debug for TapSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapSocket")
            .field("local", &self.socket.local_addr().ok())
            .field("peer", &self.socket.peer_addr().ok())
            .finish()
    }
}

fn connect_addr(addr: SocketAddr) -> Result<UdpSocket> {
    let any: SocketAddr = match addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket =
        UdpSocket::bind(any).map_err(|source| TransportError::Bind { addr: any, source })?;
    socket
        .connect(addr)
        .map_err(|source| TransportError::Connect { addr, source })?;
    Ok(socket)
}

/// Whether `err` is a destination-unreachable notification left on the
/// socket by an ICMP reply.
pub fn is_unreachable(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionRefused
            | ErrorKind::HostUnreachable
            | ErrorKind::NetworkUnreachable
            | ErrorKind::NetworkDown
    )
}

pub(crate) fn discard_pending(socket: &UdpSocket) -> Result<usize> {
    let mut chunk = [0u8; DISCARD_CHUNK_SIZE];
    let mut absorbed = 0usize;
    loop {
        match socket.recv(&mut chunk) {
            Ok(n) => {
                trace!(target: "gsmcore::transport", bytes = n, "discarding datagram");
                absorbed += 1;
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(absorbed),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_unreachable(&err) => {
                trace!(target: "gsmcore::transport", error = %err, "absorbed unreachable notification");
                absorbed += 1;
            }
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
}
