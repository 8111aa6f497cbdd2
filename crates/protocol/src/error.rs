//! Decode error types

use thiserror::Error;

/// Why a datagram was rejected by the NetFlow decoders
///
/// Every variant except [`DecodeError::UnsupportedVersion`] counts against
/// the sending peer's invalid-packet counter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Datagram shorter than the 4-byte common header
    #[error("short packet: {len} bytes")]
    TruncatedHeader { len: usize },

    /// Datagram shorter than the version's full header
    #[error("short netflow v.{version} packet: {len} bytes")]
    ShortPacket { version: u16, len: usize },

    /// Flow count of zero or above the version's maximum
    #[error("invalid number of flows ({count}) in netflow v.{version} packet")]
    BadFlowCount { version: u16, count: u16 },

    /// Datagram length disagrees with header + count * record
    #[error("inconsistent netflow v.{version} packet: len {len} expected {expected}")]
    LengthMismatch {
        version: u16,
        len: usize,
        expected: usize,
    },

    /// Version this collector does not decode (v9/IPFIX and friends)
    #[error("unsupported netflow version {version}")]
    UnsupportedVersion { version: u16 },
}

impl DecodeError {
    /// True for malformations that count against the peer's `ninvalid`
    ///
    /// Unsupported versions are logged but deliberately not counted.
    pub fn counts_as_invalid(&self) -> bool {
        !matches!(self, Self::UnsupportedVersion { .. })
    }
}
