//! Listener configuration

use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;

use crate::{ConfigError, Result};

/// Default NetFlow export port
const DEFAULT_PORT: u16 = 2055;

/// One UDP listener
///
/// # Example
///
/// ```toml
/// [[listen]]
/// address = "0.0.0.0"
/// port = 2055
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListenConfig {
    /// Bind address, IPv4 or IPv6
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 2055
    pub port: u16,

    /// SO_RCVBUF hint in bytes
    /// Default: none (kernel default)
    pub buffer_size: Option<usize>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            buffer_size: None,
        }
    }
}

impl ListenConfig {
    /// Resolve to a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .address
            .parse()
            .map_err(|_| ConfigError::InvalidListener {
                address: self.address.clone(),
                reason: "not an IP address".into(),
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
