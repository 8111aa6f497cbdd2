//! Flow record framing
//!
//! A record is its 32-bit field mask followed by the selected sub-records in
//! ascending bit order. There is no separate length field: the mask alone
//! frames the record. All integers are network order; the two 64-bit
//! counters are laid out high word then low word.
//!
//! Sub-record encodings, in order:
//!
//! | Flag | Bytes |
//! |---|---|
//! | TAG | tag u32 |
//! | RECV_TIME | recv_secs u32 |
//! | PROTO_FLAGS_TOS | tcp_flags, protocol, tos, pad |
//! | *_ADDR4 / *_ADDR6 | 4 / 16 address octets (agent, src, dst, gateway) |
//! | SRCDST_PORT | src u16, dst u16 |
//! | PACKETS | u64 |
//! | OCTETS | u64 |
//! | IF_INDICES | in u16, out u16 |
//! | AGENT_INFO | sys_uptime_ms u32, time_sec u32, time_nanosec u32, netflow_version u16, pad u16 |
//! | FLOW_TIMES | flow_start u32, flow_finish u32 |
//! | AS_INFO | src_as u16, dst_as u16, src_mask u8, dst_mask u8, pad u16 |
//! | FLOW_ENGINE_INFO | engine_type u8, engine_id u8, pad u16, flow_sequence u32 |

use std::io::Read;

use bytes::{BufMut, BytesMut};

use flowcask_protocol::{FieldMask, FlowAddr, FlowRecord};

use crate::StoreError;

/// Address field groups in serialization order, with their family bits
const ADDR_GROUPS: [(FieldMask, FieldMask); 4] = [
    (FieldMask::AGENT_ADDR4, FieldMask::AGENT_ADDR6),
    (FieldMask::SRC_ADDR4, FieldMask::SRC_ADDR6),
    (FieldMask::DST_ADDR4, FieldMask::DST_ADDR6),
    (FieldMask::GATEWAY_ADDR4, FieldMask::GATEWAY_ADDR6),
];

fn addr_of(flow: &FlowRecord, group: usize) -> FlowAddr {
    match group {
        0 => flow.agent_addr,
        1 => flow.src_addr,
        2 => flow.dst_addr,
        _ => flow.gateway_addr,
    }
}

/// Intersect the flow's mask with the store mask and narrow each address
/// group to the family actually held
fn persisted_mask(flow: &FlowRecord, store_mask: FieldMask) -> FieldMask {
    let mut fields = flow.fields & store_mask;
    for (group, (bit4, bit6)) in ADDR_GROUPS.iter().enumerate() {
        let clear = match addr_of(flow, group) {
            FlowAddr::V4(_) => *bit6,
            FlowAddr::V6(_) => *bit4,
        };
        fields -= clear;
    }
    fields
}

/// Serialize one flow under the given store mask
///
/// The persisted mask is the intersection of what the decoder produced with
/// what the operator keeps. A flow whose selected src/dst addresses disagree
/// in family is refused; the caller is expected to have dropped it already.
pub fn serialize_flow(flow: &FlowRecord, store_mask: FieldMask) -> Result<BytesMut, StoreError> {
    if flow.fields.intersects(FieldMask::SRC_ADDR)
        && flow.fields.intersects(FieldMask::DST_ADDR)
        && !flow.src_addr.same_family(&flow.dst_addr)
    {
        return Err(StoreError::FamilyMismatch);
    }

    let fields = persisted_mask(flow, store_mask);
    let mut buf = BytesMut::with_capacity(128);

    buf.put_u32(fields.bits());
    if fields.contains(FieldMask::TAG) {
        buf.put_u32(flow.tag);
    }
    if fields.contains(FieldMask::RECV_TIME) {
        buf.put_u32(flow.recv_secs);
    }
    if fields.contains(FieldMask::PROTO_FLAGS_TOS) {
        buf.put_u8(flow.tcp_flags);
        buf.put_u8(flow.protocol);
        buf.put_u8(flow.tos);
        buf.put_u8(0);
    }
    for (group, (bit4, bit6)) in ADDR_GROUPS.iter().enumerate() {
        if fields.intersects(*bit4 | *bit6) {
            buf.put_slice(&addr_of(flow, group).octets());
        }
    }
    if fields.contains(FieldMask::SRCDST_PORT) {
        buf.put_u16(flow.src_port);
        buf.put_u16(flow.dst_port);
    }
    if fields.contains(FieldMask::PACKETS) {
        buf.put_u64(flow.flow_packets);
    }
    if fields.contains(FieldMask::OCTETS) {
        buf.put_u64(flow.flow_octets);
    }
    if fields.contains(FieldMask::IF_INDICES) {
        buf.put_u16(flow.if_index_in);
        buf.put_u16(flow.if_index_out);
    }
    if fields.contains(FieldMask::AGENT_INFO) {
        buf.put_u32(flow.sys_uptime_ms);
        buf.put_u32(flow.time_sec);
        buf.put_u32(flow.time_nanosec);
        buf.put_u16(flow.netflow_version);
        buf.put_u16(0);
    }
    if fields.contains(FieldMask::FLOW_TIMES) {
        buf.put_u32(flow.flow_start);
        buf.put_u32(flow.flow_finish);
    }
    if fields.contains(FieldMask::AS_INFO) {
        buf.put_u16(flow.src_as);
        buf.put_u16(flow.dst_as);
        buf.put_u8(flow.src_mask);
        buf.put_u8(flow.dst_mask);
        buf.put_u16(0);
    }
    if fields.contains(FieldMask::FLOW_ENGINE_INFO) {
        buf.put_u8(flow.engine_type);
        buf.put_u8(flow.engine_id);
        buf.put_u16(0);
        buf.put_u32(flow.flow_sequence);
    }

    Ok(buf)
}

/// Read the next flow record, or `None` at a clean end of log
///
/// End-of-file before any mask byte is the end of the log; end-of-file
/// anywhere inside a record is corruption.
pub fn read_flow(r: &mut impl Read) -> Result<Option<FlowRecord>, StoreError> {
    let mut mask_bytes = [0u8; 4];
    match read_or_eof(r, &mut mask_bytes)? {
        ReadOutcome::Eof => return Ok(None),
        ReadOutcome::Full => {}
    }

    let bits = u32::from_be_bytes(mask_bytes);
    let fields = FieldMask::from_bits(bits).ok_or(StoreError::UnknownFields { bits })?;

    let mut flow = FlowRecord {
        fields,
        ..Default::default()
    };

    if fields.contains(FieldMask::TAG) {
        flow.tag = get_u32(r)?;
    }
    if fields.contains(FieldMask::RECV_TIME) {
        flow.recv_secs = get_u32(r)?;
    }
    if fields.contains(FieldMask::PROTO_FLAGS_TOS) {
        let b = get_bytes::<4>(r)?;
        flow.tcp_flags = b[0];
        flow.protocol = b[1];
        flow.tos = b[2];
    }
    for (group, (bit4, bit6)) in ADDR_GROUPS.iter().enumerate() {
        let addr = if fields.contains(*bit4) {
            Some(FlowAddr::V4(get_bytes::<4>(r)?.into()))
        } else if fields.contains(*bit6) {
            Some(FlowAddr::V6(get_bytes::<16>(r)?.into()))
        } else {
            None
        };
        if let Some(addr) = addr {
            match group {
                0 => flow.agent_addr = addr,
                1 => flow.src_addr = addr,
                2 => flow.dst_addr = addr,
                _ => flow.gateway_addr = addr,
            }
        }
    }
    if fields.contains(FieldMask::SRCDST_PORT) {
        flow.src_port = get_u16(r)?;
        flow.dst_port = get_u16(r)?;
    }
    if fields.contains(FieldMask::PACKETS) {
        flow.flow_packets = get_u64(r)?;
    }
    if fields.contains(FieldMask::OCTETS) {
        flow.flow_octets = get_u64(r)?;
    }
    if fields.contains(FieldMask::IF_INDICES) {
        flow.if_index_in = get_u16(r)?;
        flow.if_index_out = get_u16(r)?;
    }
    if fields.contains(FieldMask::AGENT_INFO) {
        flow.sys_uptime_ms = get_u32(r)?;
        flow.time_sec = get_u32(r)?;
        flow.time_nanosec = get_u32(r)?;
        flow.netflow_version = get_u16(r)?;
        get_u16(r)?; // pad
    }
    if fields.contains(FieldMask::FLOW_TIMES) {
        flow.flow_start = get_u32(r)?;
        flow.flow_finish = get_u32(r)?;
    }
    if fields.contains(FieldMask::AS_INFO) {
        flow.src_as = get_u16(r)?;
        flow.dst_as = get_u16(r)?;
        let b = get_bytes::<2>(r)?;
        flow.src_mask = b[0];
        flow.dst_mask = b[1];
        get_u16(r)?; // pad
    }
    if fields.contains(FieldMask::FLOW_ENGINE_INFO) {
        let b = get_bytes::<4>(r)?;
        flow.engine_type = b[0];
        flow.engine_id = b[1];
        flow.flow_sequence = get_u32(r)?;
    }

    Ok(Some(flow))
}

enum ReadOutcome {
    Full,
    Eof,
}

/// Fill `buf` completely, or report a clean EOF if not even one byte arrived
fn read_or_eof(r: &mut impl Read, buf: &mut [u8]) -> Result<ReadOutcome, StoreError> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(ReadOutcome::Eof),
            Ok(0) => {
                return Err(StoreError::Truncated {
                    context: "record field mask",
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StoreError::Io(e)),
        }
    }
    Ok(ReadOutcome::Full)
}

fn get_bytes<const N: usize>(r: &mut impl Read) -> Result<[u8; N], StoreError> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            StoreError::Truncated {
                context: "record body",
            }
        } else {
            StoreError::Io(e)
        }
    })?;
    Ok(buf)
}

fn get_u16(r: &mut impl Read) -> Result<u16, StoreError> {
    Ok(u16::from_be_bytes(get_bytes::<2>(r)?))
}

fn get_u32(r: &mut impl Read) -> Result<u32, StoreError> {
    Ok(u32::from_be_bytes(get_bytes::<4>(r)?))
}

fn get_u64(r: &mut impl Read) -> Result<u64, StoreError> {
    Ok(u64::from_be_bytes(get_bytes::<8>(r)?))
}

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;
