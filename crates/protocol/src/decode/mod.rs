//! NetFlow packet decoders
//!
//! One module per supported NetFlow version (1, 5, 7) plus the common-header
//! dispatch. Inbound datagrams are parsed as byte slices by explicit offset;
//! no wire struct is ever overlaid on the buffer.
//!
//! A decoder either rejects the whole datagram or yields one [`FlowRecord`]
//! per exported flow, in packet order. Rejection reasons are structural and
//! checked before any flow is produced:
//!
//! 1. datagram at least as long as the version header;
//! 2. flow count nonzero and within the version maximum;
//! 3. datagram length exactly `header + count * record`.
//!
//! Decoders are pure over `(buffer, exporter address, receive time)`; peer
//! bookkeeping belongs to the caller.

mod v1;
mod v5;
mod v7;

pub use v1::{NF1_HEADER_SIZE, NF1_MAX_FLOWS, NF1_RECORD_SIZE};
pub use v5::{NF5_HEADER_SIZE, NF5_MAX_FLOWS, NF5_RECORD_SIZE};
pub use v7::{NF7_HEADER_SIZE, NF7_MAX_FLOWS, NF7_RECORD_SIZE};

use crate::{DecodeError, FlowAddr, FlowRecord};

/// Common header shared by all NetFlow versions: version + flow count
pub const NF_COMMON_HEADER_SIZE: usize = 4;

/// A fully decoded datagram
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedPacket {
    /// NetFlow version from the common header
    pub version: u16,
    /// Flows in packet order
    pub flows: Vec<FlowRecord>,
}

/// Read a network-order u16 at `offset`
///
/// Callers guarantee bounds via the length checks in [`check_geometry`].
#[inline]
pub(crate) fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

/// Read a network-order u32 at `offset`
#[inline]
pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Read an IPv4 address at `offset`
#[inline]
pub(crate) fn read_addr4(data: &[u8], offset: usize) -> FlowAddr {
    FlowAddr::V4(
        [
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]
        .into(),
    )
}

/// Shared structural prologue: header length, flow count bounds, exact
/// datagram length
///
/// Returns the validated flow count.
pub(crate) fn check_geometry(
    version: u16,
    pkt: &[u8],
    header_size: usize,
    record_size: usize,
    max_flows: u16,
) -> Result<u16, DecodeError> {
    if pkt.len() < header_size {
        return Err(DecodeError::ShortPacket {
            version,
            len: pkt.len(),
        });
    }
    let count = read_u16(pkt, 2);
    if count == 0 || count > max_flows {
        return Err(DecodeError::BadFlowCount { version, count });
    }
    let expected = header_size + count as usize * record_size;
    if pkt.len() != expected {
        return Err(DecodeError::LengthMismatch {
            version,
            len: pkt.len(),
            expected,
        });
    }
    Ok(count)
}

/// Decode one datagram into its flows
///
/// `agent_addr` is the datagram's source address; `recv_secs` is the
/// wall-clock receive timestamp recorded into every flow.
pub fn decode(
    pkt: &[u8],
    agent_addr: FlowAddr,
    recv_secs: u32,
) -> Result<DecodedPacket, DecodeError> {
    if pkt.len() < NF_COMMON_HEADER_SIZE {
        return Err(DecodeError::TruncatedHeader { len: pkt.len() });
    }
    let version = read_u16(pkt, 0);
    let flows = match version {
        1 => v1::decode(pkt, agent_addr, recv_secs)?,
        5 => v5::decode(pkt, agent_addr, recv_secs)?,
        7 => v7::decode(pkt, agent_addr, recv_secs)?,
        _ => return Err(DecodeError::UnsupportedVersion { version }),
    };
    Ok(DecodedPacket { version, flows })
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod decode_test;
