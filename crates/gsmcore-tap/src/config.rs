/// Registered UDP port for GSMTAP.
pub const GSMTAP_UDP_PORT: u16 = 4729;

/// Destination host when none is configured.
pub const DEFAULT_HOST: &str = "localhost";

/// Default bound of the write queue.
pub const DEFAULT_QUEUE_LIMIT: usize = 64;

/// How tap messages reach the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// One blocking write per message, on the caller's thread.
    #[default]
    Direct,
    /// Non-blocking enqueue; a reactor drains the queue on write readiness.
    Queued { limit: usize },
}

impl Delivery {
    /// Queued delivery with the default bound.
    pub fn queued() -> Self {
        Delivery::Queued {
            limit: DEFAULT_QUEUE_LIMIT,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Delivery::Queued { .. })
    }
}

/// Configuration for a tap instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapConfig {
    /// Destination host. Default: `localhost`.
    pub host: Option<String>,
    /// Destination port; `0` selects the default. Default: 4729.
    pub port: u16,
    /// Delivery mode. Default: direct.
    pub delivery: Delivery,
    /// Bind a local discard sink to the destination. Default: off.
    pub add_sink: bool,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: GSMTAP_UDP_PORT,
            delivery: Delivery::Direct,
            add_sink: false,
        }
    }
}

impl TapConfig {
    /// Effective destination host.
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// Effective destination port.
    pub fn port(&self) -> u16 {
        if self.port == 0 {
            GSMTAP_UDP_PORT
        } else {
            self.port
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_sink(mut self, add_sink: bool) -> Self {
        self.add_sink = add_sink;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_localhost_and_registered_port() {
        let config = TapConfig::default();
        assert_eq!(config.host(), "localhost");
        assert_eq!(config.port(), 4729);
        assert_eq!(config.delivery, Delivery::Direct);
        assert!(!config.add_sink);
    }

    #[test]
    fn zero_port_selects_default() {
        let config = TapConfig::default().with_port(0);
        assert_eq!(config.port(), GSMTAP_UDP_PORT);
    }

    #[test]
    fn builder_helpers() {
        let config = TapConfig::default()
            .with_host("192.0.2.7")
            .with_port(5000)
            .with_delivery(Delivery::queued())
            .with_sink(true);
        assert_eq!(config.host(), "192.0.2.7");
        assert_eq!(config.port(), 5000);
        assert_eq!(config.delivery, Delivery::Queued { limit: 64 });
        assert!(config.delivery.is_queued());
        assert!(config.add_sink);
    }
}
