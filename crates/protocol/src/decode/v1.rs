//! NetFlow version 1
//!
//! The oldest export format: a 16-byte header and 48-byte records with no
//! AS or engine information. Several record bytes are reserved padding.

use crate::{FieldMask, FlowAddr, FlowRecord};

use super::{check_geometry, read_addr4, read_u16, read_u32, DecodeError};

pub const NF1_HEADER_SIZE: usize = 16;
pub const NF1_RECORD_SIZE: usize = 48;
pub const NF1_MAX_FLOWS: u16 = 24;

/// Fields a v1 record can carry
///
/// No tag yet (the filter assigns that), no IPv6 flow addresses on this wire
/// format, and v1 predates AS and engine reporting.
fn v1_fields() -> FieldMask {
    FieldMask::ALL
        - FieldMask::TAG
        - FieldMask::SRC_ADDR6
        - FieldMask::DST_ADDR6
        - FieldMask::GATEWAY_ADDR6
        - FieldMask::AS_INFO
        - FieldMask::FLOW_ENGINE_INFO
}

pub(super) fn decode(
    pkt: &[u8],
    agent_addr: FlowAddr,
    recv_secs: u32,
) -> Result<Vec<FlowRecord>, DecodeError> {
    let nflows = check_geometry(1, pkt, NF1_HEADER_SIZE, NF1_RECORD_SIZE, NF1_MAX_FLOWS)?;

    let sys_uptime_ms = read_u32(pkt, 4);
    let time_sec = read_u32(pkt, 8);
    let time_nanosec = read_u32(pkt, 12);

    let mut flows = Vec::with_capacity(nflows as usize);
    for i in 0..nflows as usize {
        let r = &pkt[NF1_HEADER_SIZE + i * NF1_RECORD_SIZE..][..NF1_RECORD_SIZE];

        flows.push(FlowRecord {
            fields: v1_fields(),
            recv_secs,

            src_addr: read_addr4(r, 0),
            dst_addr: read_addr4(r, 4),
            gateway_addr: read_addr4(r, 8),
            agent_addr,

            if_index_in: read_u16(r, 12),
            if_index_out: read_u16(r, 14),

            flow_packets: read_u32(r, 16) as u64,
            flow_octets: read_u32(r, 20) as u64,

            flow_start: read_u32(r, 24),
            flow_finish: read_u32(r, 28),

            src_port: read_u16(r, 32),
            dst_port: read_u16(r, 34),

            protocol: r[38],
            tos: r[39],
            tcp_flags: r[40],

            sys_uptime_ms,
            time_sec,
            time_nanosec,
            netflow_version: 1,

            ..Default::default()
        });
    }

    Ok(flows)
}
