use std::net::SocketAddr;

/// Errors that can occur in tap transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The destination host could not be resolved.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// A discard sink only makes sense for a destination on this host.
    #[error("destination {addr} is not local")]
    NotLocal { addr: SocketAddr },

    /// Registering with or polling the reactor failed.
    #[error("reactor error: {0}")]
    Poll(std::io::Error),

    /// An I/O error occurred on the socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
