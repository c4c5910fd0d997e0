use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::socket::{discard_pending, TapSocket};

/// Local receiver bound to a tap socket's destination.
///
/// A connected UDP socket whose destination has no listener receives ICMP
/// port-unreachable replies, which surface as errors on later sends. The
/// sink occupies the destination port so nothing bounces; whatever arrives
/// is read and dropped.
pub struct DiscardSink {
    socket: UdpSocket,
    addr: SocketAddr,
}

impl DiscardSink {
    /// Bind a sink to the destination of `source`.
    ///
    /// Fails with [`TransportError::NotLocal`] when the destination is on
    /// another host; callers treat that as non-fatal.
    pub fn for_source(source: &TapSocket) -> Result<Self> {
        let addr = source.peer_addr()?;
        Self::bind(addr)
    }

    /// Bind a non-blocking sink to `addr`, which must be local.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        if !is_local_addr(&addr) {
            debug!(target: "gsmcore::transport", %addr, "not adding sink for remote destination");
            return Err(TransportError::NotLocal { addr });
        }

        let socket = bind_reuse(&addr).map_err(|source| TransportError::Bind { addr, source })?;
        socket.set_nonblocking(true)?;

        info!(target: "gsmcore::transport", %addr, "tap sink bound");
        Ok(Self { socket, addr })
    }

    /// Read and drop every pending datagram. Returns how many were dropped.
    pub fn drain(&self) -> Result<usize> {
        discard_pending(&self.socket)
    }

    /// Address the sink is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl AsRawFd for DiscardSink {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl std::fmt::Debug for DiscardSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscardSink")
            .field("addr", &self.addr)
            .finish()
    }
}

/// Whether `addr` designates this host: loopback, or an address assigned
/// to one of the local interfaces.
pub fn is_local_addr(addr: &SocketAddr) -> bool {
    let ip = addr.ip();
    if ip.is_loopback() {
        return true;
    }
    match interface_addrs() {
        Ok(addrs) => addrs.contains(&ip),
        Err(err) => {
            debug!(target: "gsmcore::transport", error = %err, "getifaddrs failed");
            false
        }
    }
}

fn interface_addrs() -> io::Result<Vec<IpAddr>> {
    let mut ifap: *mut libc::ifaddrs = std::ptr::null_mut();

    // SAFETY: `ifap` is a valid out-pointer; on success the list is released
    // with `freeifaddrs` below and not used afterwards.
    if unsafe { libc::getifaddrs(&mut ifap) } != 0 {
        return Err(io::Error::last_os_error());
    }

    let mut addrs = Vec::new();
    let mut cur = ifap;
    while !cur.is_null() {
        // SAFETY: `cur` is a non-null node of the list returned by getifaddrs.
        let ifa = unsafe { &*cur };
        if !ifa.ifa_addr.is_null() {
            // SAFETY: `ifa_addr` is non-null and points to a sockaddr whose
            // concrete type is given by `sa_family`.
            unsafe {
                match i32::from((*ifa.ifa_addr).sa_family) {
                    libc::AF_INET => {
                        let sin = &*(ifa.ifa_addr as *const libc::sockaddr_in);
                        addrs.push(IpAddr::V4(Ipv4Addr::from(u32::from_be(
                            sin.sin_addr.s_addr,
                        ))));
                    }
                    libc::AF_INET6 => {
                        let sin6 = &*(ifa.ifa_addr as *const libc::sockaddr_in6);
                        addrs.push(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)));
                    }
                    _ => {}
                }
            }
        }
        cur = ifa.ifa_next;
    }

    // SAFETY: `ifap` came from a successful getifaddrs call.
    unsafe { libc::freeifaddrs(ifap) };

    Ok(addrs)
}

/// Bind a UDP socket with `SO_REUSEADDR` set.
fn bind_reuse(addr: &SocketAddr) -> io::Result<UdpSocket> {
    let domain = match addr {
        SocketAddr::V4(_) => libc::AF_INET,
        SocketAddr::V6(_) => libc::AF_INET6,
    };

    // SAFETY: plain socket(2) call; the result is checked before use.
    let fd = unsafe { libc::socket(domain, libc::SOCK_DGRAM, libc::IPPROTO_UDP) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `fd` is a freshly created descriptor owned by nobody else.
    let owned = unsafe { OwnedFd::from_raw_fd(fd) };

    let one: libc::c_int = 1;
    // SAFETY: `one` outlives the call and its size is passed explicitly.
    let rc = unsafe {
        libc::setsockopt(
            owned.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            (&one as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    let (storage, len) = sockaddr_from(addr);
    // SAFETY: `storage` holds a sockaddr of `len` bytes matching `domain`.
    let rc = unsafe {
        libc::bind(
            owned.as_raw_fd(),
            (&storage as *const libc::sockaddr_storage).cast::<libc::sockaddr>(),
            len,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(UdpSocket::from(owned))
}

fn sockaddr_from(addr: &SocketAddr) -> (libc::sockaddr_storage, libc::socklen_t) {
    // SAFETY: sockaddr_storage is plain old data; all-zero is a valid value.
    let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };

    let len = match addr {
        SocketAddr::V4(v4) => {
            // SAFETY: sockaddr_storage is large and aligned enough for sockaddr_in.
            let sin = unsafe {
                &mut *(&mut storage as *mut libc::sockaddr_storage).cast::<libc::sockaddr_in>()
            };
            sin.sin_family = libc::AF_INET as libc::sa_family_t;
            sin.sin_port = v4.port().to_be();
            sin.sin_addr.s_addr = u32::from(*v4.ip()).to_be();
            std::mem::size_of::<libc::sockaddr_in>()
        }
        SocketAddr::V6(v6) => {
            // SAFETY: sockaddr_storage is large and aligned enough for sockaddr_in6.
            let sin6 = unsafe {
                &mut *(&mut storage as *mut libc::sockaddr_storage).cast::<libc::sockaddr_in6>()
            };
            sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sin6.sin6_port = v6.port().to_be();
            sin6.sin6_flowinfo = v6.flowinfo();
            sin6.sin6_addr.s6_addr = v6.ip().octets();
            sin6.sin6_scope_id = v6.scope_id();
            std::mem::size_of::<libc::sockaddr_in6>()
        }
    };

    (storage, len as libc::socklen_t)
}
