//! Decoder tests
//!
//! Packets are built field-by-field with the same offsets the decoders read,
//! so a failure here points at a disagreement between builder and decoder,
//! not at a shared constant.

use super::*;
use crate::{FieldMask, FlowAddr, FlowRecord};

const RECV_SECS: u32 = 1_700_000_000;

fn agent() -> FlowAddr {
    "192.0.2.1".parse().unwrap()
}

fn put_u16(buf: &mut [u8], offset: usize, v: u16) {
    buf[offset..offset + 2].copy_from_slice(&v.to_be_bytes());
}

fn put_u32(buf: &mut [u8], offset: usize, v: u32) {
    buf[offset..offset + 4].copy_from_slice(&v.to_be_bytes());
}

/// Header common to all versions; version-specific fields filled by callers
fn packet(version: u16, count: u16, header_size: usize, record_size: usize) -> Vec<u8> {
    let mut pkt = vec![0u8; header_size + count as usize * record_size];
    put_u16(&mut pkt, 0, version);
    put_u16(&mut pkt, 2, count);
    put_u32(&mut pkt, 4, 86_400_000); // sys_uptime_ms
    put_u32(&mut pkt, 8, 1_600_000_000); // time_sec
    put_u32(&mut pkt, 12, 500); // time_nanosec
    pkt
}

/// Fill the shared leading 36 bytes of a v1/v5/v7 record
fn fill_record_common(r: &mut [u8], seq: u8) {
    r[0..4].copy_from_slice(&[10, 0, 0, seq]); // src
    r[4..8].copy_from_slice(&[10, 1, 0, seq]); // dst
    r[8..12].copy_from_slice(&[10, 2, 0, 1]); // nexthop
    put_u16(r, 12, 3); // if in
    put_u16(r, 14, 4); // if out
    put_u32(r, 16, 100 + seq as u32); // packets
    put_u32(r, 20, 9_000 + seq as u32); // octets
    put_u32(r, 24, 1_000); // start
    put_u32(r, 28, 2_000); // finish
    put_u16(r, 32, 40_000); // src port
    put_u16(r, 34, 53); // dst port
}

fn v1_packet(count: u16) -> Vec<u8> {
    let mut pkt = packet(1, count, NF1_HEADER_SIZE, NF1_RECORD_SIZE);
    for i in 0..count as usize {
        let r = &mut pkt[NF1_HEADER_SIZE + i * NF1_RECORD_SIZE..][..NF1_RECORD_SIZE];
        fill_record_common(r, i as u8);
        r[38] = 17; // protocol
        r[39] = 0x10; // tos
        r[40] = 0x02; // tcp flags
    }
    pkt
}

fn v5_packet(count: u16) -> Vec<u8> {
    let mut pkt = packet(5, count, NF5_HEADER_SIZE, NF5_RECORD_SIZE);
    put_u32(&mut pkt, 16, 777); // flow_sequence
    pkt[20] = 1; // engine_type
    pkt[21] = 9; // engine_id
    for i in 0..count as usize {
        let r = &mut pkt[NF5_HEADER_SIZE + i * NF5_RECORD_SIZE..][..NF5_RECORD_SIZE];
        fill_record_common(r, i as u8);
        r[37] = 0x12; // tcp flags
        r[38] = 6; // protocol
        r[39] = 0x08; // tos
        put_u16(r, 40, 64500); // src as
        put_u16(r, 42, 64501); // dst as
        r[44] = 24; // src mask
        r[45] = 16; // dst mask
    }
    pkt
}

fn v7_packet(count: u16) -> Vec<u8> {
    let mut pkt = packet(7, count, NF7_HEADER_SIZE, NF7_RECORD_SIZE);
    put_u32(&mut pkt, 16, 4242); // flow_sequence
    for i in 0..count as usize {
        let r = &mut pkt[NF7_HEADER_SIZE + i * NF7_RECORD_SIZE..][..NF7_RECORD_SIZE];
        fill_record_common(r, i as u8);
        r[37] = 0x10;
        r[38] = 6;
        r[39] = 0;
        put_u16(r, 40, 100);
        put_u16(r, 42, 200);
        r[44] = 8;
        r[45] = 8;
        put_u32(r, 48, 0xdead_beef); // router_sc, ignored
    }
    pkt
}

// =============================================================================
// Valid packets
// =============================================================================

#[test]
fn test_v1_decode() {
    let decoded = decode(&v1_packet(2), agent(), RECV_SECS).unwrap();
    assert_eq!(decoded.version, 1);
    assert_eq!(decoded.flows.len(), 2);

    let f = &decoded.flows[0];
    assert_eq!(f.src_addr, "10.0.0.0".parse::<FlowAddr>().unwrap());
    assert_eq!(f.dst_addr, "10.1.0.0".parse::<FlowAddr>().unwrap());
    assert_eq!(f.gateway_addr, "10.2.0.1".parse::<FlowAddr>().unwrap());
    assert_eq!(f.agent_addr, agent());
    assert_eq!(f.protocol, 17);
    assert_eq!(f.tos, 0x10);
    assert_eq!(f.tcp_flags, 0x02);
    assert_eq!(f.src_port, 40_000);
    assert_eq!(f.dst_port, 53);
    assert_eq!(f.flow_packets, 100);
    assert_eq!(f.flow_octets, 9_000);
    assert_eq!(f.if_index_in, 3);
    assert_eq!(f.if_index_out, 4);
    assert_eq!(f.sys_uptime_ms, 86_400_000);
    assert_eq!(f.time_sec, 1_600_000_000);
    assert_eq!(f.time_nanosec, 500);
    assert_eq!(f.netflow_version, 1);
    assert_eq!(f.flow_start, 1_000);
    assert_eq!(f.flow_finish, 2_000);
    assert_eq!(f.recv_secs, RECV_SECS);

    // v1 carries neither AS nor engine info
    assert!(!f.fields.contains(FieldMask::AS_INFO));
    assert!(!f.fields.contains(FieldMask::FLOW_ENGINE_INFO));
    assert!(!f.fields.contains(FieldMask::TAG));
    assert!(f.fields.contains(FieldMask::SRC_ADDR4));
    assert!(!f.fields.contains(FieldMask::SRC_ADDR6));

    // Records decode in packet order
    assert_eq!(decoded.flows[1].flow_packets, 101);
}

#[test]
fn test_v5_decode() {
    let decoded = decode(&v5_packet(3), agent(), RECV_SECS).unwrap();
    assert_eq!(decoded.version, 5);
    assert_eq!(decoded.flows.len(), 3);

    let f = &decoded.flows[0];
    assert_eq!(f.tcp_flags, 0x12);
    assert_eq!(f.protocol, 6);
    assert_eq!(f.src_as, 64500);
    assert_eq!(f.dst_as, 64501);
    assert_eq!(f.src_mask, 24);
    assert_eq!(f.dst_mask, 16);
    assert_eq!(f.engine_type, 1);
    assert_eq!(f.engine_id, 9);
    assert_eq!(f.flow_sequence, 777);
    assert_eq!(f.netflow_version, 5);

    assert!(f.fields.contains(FieldMask::AS_INFO));
    assert!(f.fields.contains(FieldMask::FLOW_ENGINE_INFO));
    assert!(!f.fields.contains(FieldMask::TAG));
}

#[test]
fn test_v7_decode() {
    let decoded = decode(&v7_packet(1), agent(), RECV_SECS).unwrap();
    assert_eq!(decoded.version, 7);

    let f = &decoded.flows[0];
    assert_eq!(f.flow_sequence, 4242);
    assert_eq!(f.netflow_version, 7);
    // v7 has no engine identity in its header
    assert_eq!(f.engine_type, 0);
    assert_eq!(f.engine_id, 0);
    assert!(f.fields.contains(FieldMask::FLOW_ENGINE_INFO));
    assert!(f.fields.contains(FieldMask::AS_INFO));
}

#[test]
fn test_counters_widen_to_u64() {
    let mut pkt = v5_packet(1);
    put_u32(&mut pkt[NF5_HEADER_SIZE..], 16, u32::MAX);
    put_u32(&mut pkt[NF5_HEADER_SIZE..], 20, u32::MAX);
    let decoded = decode(&pkt, agent(), RECV_SECS).unwrap();
    assert_eq!(decoded.flows[0].flow_packets, u32::MAX as u64);
    assert_eq!(decoded.flows[0].flow_octets, u32::MAX as u64);
}

#[test]
fn test_ipv6_agent_is_preserved() {
    let agent6: FlowAddr = "2001:db8::1".parse().unwrap();
    let decoded = decode(&v5_packet(1), agent6, RECV_SECS).unwrap();
    assert_eq!(decoded.flows[0].agent_addr, agent6);
}

// =============================================================================
// Boundary matrix
// =============================================================================

#[test]
fn test_flow_count_bounds() {
    for (max, build) in [
        (NF1_MAX_FLOWS, v1_packet as fn(u16) -> Vec<u8>),
        (NF5_MAX_FLOWS, v5_packet as fn(u16) -> Vec<u8>),
        (NF7_MAX_FLOWS, v7_packet as fn(u16) -> Vec<u8>),
    ] {
        // Zero flows is invalid even with a plausible length
        let mut pkt = build(1);
        put_u16(&mut pkt, 2, 0);
        assert!(matches!(
            decode(&pkt, agent(), RECV_SECS),
            Err(DecodeError::BadFlowCount { count: 0, .. })
        ));

        // Max is valid
        let decoded = decode(&build(max), agent(), RECV_SECS).unwrap();
        assert_eq!(decoded.flows.len(), max as usize);

        // Max + 1 is invalid
        let pkt = build(max + 1);
        assert!(matches!(
            decode(&pkt, agent(), RECV_SECS),
            Err(DecodeError::BadFlowCount { .. })
        ));
    }
}

#[test]
fn test_length_off_by_one() {
    for build in [
        v1_packet as fn(u16) -> Vec<u8>,
        v5_packet as fn(u16) -> Vec<u8>,
        v7_packet as fn(u16) -> Vec<u8>,
    ] {
        let good = build(2);

        let mut long = good.clone();
        long.push(0);
        assert!(matches!(
            decode(&long, agent(), RECV_SECS),
            Err(DecodeError::LengthMismatch { .. })
        ));

        let short = &good[..good.len() - 1];
        assert!(matches!(
            decode(short, agent(), RECV_SECS),
            Err(DecodeError::LengthMismatch { .. })
        ));
    }
}

#[test]
fn test_short_version_header() {
    // Long enough for the common header, too short for the v5 header
    let mut pkt = vec![0u8; 10];
    put_u16(&mut pkt, 0, 5);
    put_u16(&mut pkt, 2, 1);
    assert_eq!(
        decode(&pkt, agent(), RECV_SECS),
        Err(DecodeError::ShortPacket { version: 5, len: 10 })
    );
}

#[test]
fn test_truncated_common_header() {
    assert_eq!(
        decode(&[0x00], agent(), RECV_SECS),
        Err(DecodeError::TruncatedHeader { len: 1 })
    );
    assert_eq!(
        decode(&[], agent(), RECV_SECS),
        Err(DecodeError::TruncatedHeader { len: 0 })
    );
}

#[test]
fn test_unsupported_version() {
    let mut pkt = vec![0u8; 64];
    put_u16(&mut pkt, 0, 9);
    put_u16(&mut pkt, 2, 1);
    let err = decode(&pkt, agent(), RECV_SECS).unwrap_err();
    assert_eq!(err, DecodeError::UnsupportedVersion { version: 9 });
    // Version mismatches are reported, not counted against the peer
    assert!(!err.counts_as_invalid());
    assert!(DecodeError::TruncatedHeader { len: 1 }.counts_as_invalid());
}

#[test]
fn test_flow_masks_never_include_tag() {
    for build in [
        v1_packet as fn(u16) -> Vec<u8>,
        v5_packet as fn(u16) -> Vec<u8>,
        v7_packet as fn(u16) -> Vec<u8>,
    ] {
        let decoded = decode(&build(1), agent(), RECV_SECS).unwrap();
        for FlowRecord { fields, .. } in &decoded.flows {
            assert!(!fields.contains(FieldMask::TAG));
            assert!(!fields.intersects(
                FieldMask::SRC_ADDR6 | FieldMask::DST_ADDR6 | FieldMask::GATEWAY_ADDR6
            ));
        }
    }
}
