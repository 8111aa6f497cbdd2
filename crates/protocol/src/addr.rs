//! Flow addresses
//!
//! Exporters and flow endpoints are identified by a bare host address that is
//! either IPv4 or IPv6. [`FlowAddr`] is a small value type over the std IP
//! types with a total order (family first, then address bytes) so it can key
//! the peer registry, and prefix matching for the filter engine's CIDR rules.

use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

/// Address family tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrFamily {
    V4,
    V6,
}

impl AddrFamily {
    /// Width of an address of this family, in bits
    pub const fn bits(self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }
}

/// An IPv4 or IPv6 host address
///
/// Cheap to copy; equality requires matching family and bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowAddr {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

impl FlowAddr {
    /// The unspecified IPv4 address, used as the zero value in records
    pub const UNSPECIFIED: Self = Self::V4(Ipv4Addr::UNSPECIFIED);

    /// Address family of this address
    pub fn family(&self) -> AddrFamily {
        match self {
            Self::V4(_) => AddrFamily::V4,
            Self::V6(_) => AddrFamily::V6,
        }
    }

    /// True when `other` shares this address's family
    pub fn same_family(&self, other: &FlowAddr) -> bool {
        self.family() == other.family()
    }

    /// Address bytes in network order (4 or 16 of them)
    pub fn octets(&self) -> Vec<u8> {
        match self {
            Self::V4(a) => a.octets().to_vec(),
            Self::V6(a) => a.octets().to_vec(),
        }
    }

    /// Compare the first `masklen` bits of `self` against the network
    /// address `net`
    ///
    /// Returns false when the families differ. `masklen` is clamped to the
    /// family's width; a zero mask length matches any same-family address.
    pub fn prefix_matches(&self, net: &FlowAddr, masklen: u8) -> bool {
        if !self.same_family(net) {
            return false;
        }
        let a = self.octets();
        let b = net.octets();
        let masklen = masklen.min(self.family().bits()) as usize;

        let full = masklen / 8;
        if a[..full] != b[..full] {
            return false;
        }
        let rem = masklen % 8;
        if rem == 0 {
            return true;
        }
        let mask = 0xffu8 << (8 - rem);
        (a[full] & mask) == (b[full] & mask)
    }
}

impl Default for FlowAddr {
    fn default() -> Self {
        Self::UNSPECIFIED
    }
}

impl Ord for FlowAddr {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::V4(a), Self::V4(b)) => a.octets().cmp(&b.octets()),
            (Self::V6(a), Self::V6(b)) => a.octets().cmp(&b.octets()),
            (Self::V4(_), Self::V6(_)) => Ordering::Less,
            (Self::V6(_), Self::V4(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for FlowAddr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FlowAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(a) => a.fmt(f),
            Self::V6(a) => a.fmt(f),
        }
    }
}

impl From<IpAddr> for FlowAddr {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(a) => Self::V4(a),
            IpAddr::V6(a) => Self::V6(a),
        }
    }
}

impl From<Ipv4Addr> for FlowAddr {
    fn from(a: Ipv4Addr) -> Self {
        Self::V4(a)
    }
}

impl From<Ipv6Addr> for FlowAddr {
    fn from(a: Ipv6Addr) -> Self {
        Self::V6(a)
    }
}

impl From<&SocketAddr> for FlowAddr {
    fn from(sa: &SocketAddr) -> Self {
        sa.ip().into()
    }
}

/// Failed to parse an address or `addr/len` prefix
#[derive(Debug, thiserror::Error)]
pub enum AddrParseError {
    #[error("invalid address '{0}'")]
    Address(String),

    #[error("invalid prefix length '{0}'")]
    PrefixLen(String),

    #[error("prefix length {len} too long for {family:?} address")]
    PrefixTooLong { family: AddrFamily, len: u8 },
}

impl FromStr for FlowAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<IpAddr>()
            .map(Into::into)
            .map_err(|_| AddrParseError::Address(s.into()))
    }
}

impl FlowAddr {
    /// Parse `addr` or `addr/len` into an address and prefix length
    ///
    /// A bare address gets the family's full width (an exact-host match).
    pub fn parse_prefix(s: &str) -> Result<(FlowAddr, u8), AddrParseError> {
        let (addr_part, len_part) = match s.split_once('/') {
            Some((a, l)) => (a, Some(l)),
            None => (s, None),
        };
        let addr: FlowAddr = addr_part.parse()?;
        let len = match len_part {
            Some(l) => l
                .parse::<u8>()
                .map_err(|_| AddrParseError::PrefixLen(l.into()))?,
            None => addr.family().bits(),
        };
        if len > addr.family().bits() {
            return Err(AddrParseError::PrefixTooLong {
                family: addr.family(),
                len,
            });
        }
        Ok((addr, len))
    }
}
