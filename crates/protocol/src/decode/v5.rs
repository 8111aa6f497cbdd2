//! NetFlow version 5
//!
//! The workhorse format: a 24-byte header carrying engine identity and a
//! running flow sequence, and 48-byte records that add AS numbers and prefix
//! mask lengths over v1.

use crate::{FieldMask, FlowAddr, FlowRecord};

use super::{check_geometry, read_addr4, read_u16, read_u32, DecodeError};

pub const NF5_HEADER_SIZE: usize = 24;
pub const NF5_RECORD_SIZE: usize = 48;
pub const NF5_MAX_FLOWS: u16 = 30;

fn v5_fields() -> FieldMask {
    FieldMask::ALL
        - FieldMask::TAG
        - FieldMask::SRC_ADDR6
        - FieldMask::DST_ADDR6
        - FieldMask::GATEWAY_ADDR6
}

pub(super) fn decode(
    pkt: &[u8],
    agent_addr: FlowAddr,
    recv_secs: u32,
) -> Result<Vec<FlowRecord>, DecodeError> {
    let nflows = check_geometry(5, pkt, NF5_HEADER_SIZE, NF5_RECORD_SIZE, NF5_MAX_FLOWS)?;

    let sys_uptime_ms = read_u32(pkt, 4);
    let time_sec = read_u32(pkt, 8);
    let time_nanosec = read_u32(pkt, 12);
    let flow_sequence = read_u32(pkt, 16);
    let engine_type = pkt[20];
    let engine_id = pkt[21];
    // offset 22: sampling interval, not stored

    let mut flows = Vec::with_capacity(nflows as usize);
    for i in 0..nflows as usize {
        let r = &pkt[NF5_HEADER_SIZE + i * NF5_RECORD_SIZE..][..NF5_RECORD_SIZE];

        flows.push(FlowRecord {
            fields: v5_fields(),
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

            tcp_flags: r[37],
            protocol: r[38],
            tos: r[39],

            src_as: read_u16(r, 40),
            dst_as: read_u16(r, 42),
            src_mask: r[44],
            dst_mask: r[45],

            sys_uptime_ms,
            time_sec,
            time_nanosec,
            netflow_version: 5,

            engine_type,
            engine_id,
            flow_sequence,

            ..Default::default()
        });
    }

    Ok(flows)
}
