//! NetFlow version 7
//!
//! Catalyst switch export: the v5 shape with 52-byte records that append
//! per-flow validity flags and a shortcut-router address, neither of which is
//! stored. The header carries a flow sequence but no engine identity, so
//! engine type and id stay zero in the engine-info block.

use crate::{FieldMask, FlowAddr, FlowRecord};

use super::{check_geometry, read_addr4, read_u16, read_u32, DecodeError};

pub const NF7_HEADER_SIZE: usize = 24;
pub const NF7_RECORD_SIZE: usize = 52;
pub const NF7_MAX_FLOWS: u16 = 28;

fn v7_fields() -> FieldMask {
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
    let nflows = check_geometry(7, pkt, NF7_HEADER_SIZE, NF7_RECORD_SIZE, NF7_MAX_FLOWS)?;

    let sys_uptime_ms = read_u32(pkt, 4);
    let time_sec = read_u32(pkt, 8);
    let time_nanosec = read_u32(pkt, 12);
    let flow_sequence = read_u32(pkt, 16);
    // offset 20: reserved

    let mut flows = Vec::with_capacity(nflows as usize);
    for i in 0..nflows as usize {
        let r = &pkt[NF7_HEADER_SIZE + i * NF7_RECORD_SIZE..][..NF7_RECORD_SIZE];

        // TODO: the flags1/flags2 bytes (offsets 36 and 46) mark fields the
        // switch did not fill in destination-only NDE mode; masking those
        // fields out of `fields` would avoid storing zeros as data.
        flows.push(FlowRecord {
            fields: v7_fields(),
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
            netflow_version: 7,

            flow_sequence,

            ..Default::default()
        });
    }

    Ok(flows)
}
