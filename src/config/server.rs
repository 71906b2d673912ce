//! HTTP listener configuration.
//!
//! Values come from the environment (optionally via `.env`) and fall back to
//! defaults with a log line instead of failing startup.

use std::net::SocketAddr;
use tracing::{info, warn};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Settings for the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, falling back to `0.0.0.0:8000`.
    #[must_use]
    pub fn load() -> Self {
        let raw = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
            info!("BIND_ADDR not set, using default: {DEFAULT_BIND_ADDR}");
            DEFAULT_BIND_ADDR.to_string()
        });
        Self {
            bind_addr: parse_bind_addr(&raw),
        }
    }
}

fn parse_bind_addr(raw: &str) -> SocketAddr {
    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid BIND_ADDR value {raw:?}: {e}, using default");
        SocketAddr::from(([0, 0, 0, 0], 8000))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_addr() {
        assert_eq!(parse_bind_addr("127.0.0.1:3000").port(), 3000);
        assert_eq!(parse_bind_addr("not an address").port(), 8000);
    }
}
