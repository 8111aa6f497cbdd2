//! Record framing tests

use super::*;
use std::io::Cursor;

use flowcask_protocol::{FieldMask, FlowRecord};

/// A v5-shaped flow with every field populated
fn sample_flow() -> FlowRecord {
    FlowRecord {
        fields: FieldMask::ALL
            - FieldMask::TAG
            - FieldMask::SRC_ADDR6
            - FieldMask::DST_ADDR6
            - FieldMask::GATEWAY_ADDR6,
        recv_secs: 1_700_000_123,
        tcp_flags: 0x12,
        protocol: 6,
        tos: 0x08,
        agent_addr: "192.0.2.1".parse().unwrap(),
        src_addr: "10.0.0.1".parse().unwrap(),
        dst_addr: "10.0.0.2".parse().unwrap(),
        gateway_addr: "10.0.0.254".parse().unwrap(),
        src_port: 49152,
        dst_port: 443,
        flow_packets: 42,
        flow_octets: 0x1_0000_0001, // exercises both 32-bit halves
        if_index_in: 1,
        if_index_out: 2,
        sys_uptime_ms: 1000,
        time_sec: 1_700_000_000,
        time_nanosec: 999,
        netflow_version: 5,
        flow_start: 10,
        flow_finish: 20,
        src_as: 64500,
        dst_as: 64501,
        src_mask: 24,
        dst_mask: 16,
        engine_type: 1,
        engine_id: 2,
        flow_sequence: 7,
        ..Default::default()
    }
}

#[test]
fn test_round_trip_full_mask() {
    let flow = sample_flow();
    let bytes = serialize_flow(&flow, FieldMask::ALL).unwrap();

    let decoded = read_flow(&mut Cursor::new(&bytes[..])).unwrap().unwrap();
    assert_eq!(decoded.src_addr, flow.src_addr);
    assert_eq!(decoded.flow_octets, flow.flow_octets);
    assert_eq!(decoded.netflow_version, 5);

    // Re-serializing under the same mask is byte-identical
    let again = serialize_flow(&decoded, FieldMask::ALL).unwrap();
    assert_eq!(&bytes[..], &again[..]);
}

#[test]
fn test_round_trip_partial_mask() {
    let flow = sample_flow();
    let mask = FieldMask::RECV_TIME | FieldMask::SRC_ADDR | FieldMask::OCTETS;
    let bytes = serialize_flow(&flow, mask).unwrap();

    let decoded = read_flow(&mut Cursor::new(&bytes[..])).unwrap().unwrap();
    assert_eq!(decoded.recv_secs, flow.recv_secs);
    assert_eq!(decoded.src_addr, flow.src_addr);
    assert_eq!(decoded.flow_octets, flow.flow_octets);
    // Unselected fields come back zeroed
    assert_eq!(decoded.flow_packets, 0);
    assert_eq!(decoded.src_port, 0);

    let again = serialize_flow(&decoded, mask).unwrap();
    assert_eq!(&bytes[..], &again[..]);
}

#[test]
fn test_persisted_mask_is_intersection() {
    let flow = sample_flow();
    let mask = FieldMask::RECV_TIME | FieldMask::AS_INFO | FieldMask::TAG;
    let bytes = serialize_flow(&flow, mask).unwrap();

    let stored = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
    let stored = FieldMask::from_bits(stored).unwrap();

    // TAG was not produced by the decoder, so the intersection drops it
    assert_eq!(stored, FieldMask::RECV_TIME | FieldMask::AS_INFO);
    assert!((flow.fields & mask).contains(stored));
}

#[test]
fn test_family_bits_narrowed() {
    let mut flow = sample_flow();
    flow.src_addr = "2001:db8::1".parse().unwrap();
    flow.dst_addr = "2001:db8::2".parse().unwrap();
    // Decoder-style mask with both family bits up for src/dst
    flow.fields |= FieldMask::SRC_ADDR | FieldMask::DST_ADDR;

    let bytes = serialize_flow(&flow, FieldMask::ALL).unwrap();
    let decoded = read_flow(&mut Cursor::new(&bytes[..])).unwrap().unwrap();

    assert!(decoded.fields.contains(FieldMask::SRC_ADDR6));
    assert!(!decoded.fields.contains(FieldMask::SRC_ADDR4));
    assert_eq!(decoded.src_addr, flow.src_addr);
    assert_eq!(decoded.dst_addr, flow.dst_addr);
    // Agent stayed IPv4
    assert!(decoded.fields.contains(FieldMask::AGENT_ADDR4));
}

#[test]
fn test_family_mismatch_rejected() {
    let mut flow = sample_flow();
    flow.dst_addr = "2001:db8::2".parse().unwrap();
    assert!(matches!(
        serialize_flow(&flow, FieldMask::ALL),
        Err(StoreError::FamilyMismatch)
    ));
}

#[test]
fn test_counters_high_word_first() {
    let mut flow = sample_flow();
    flow.flow_octets = 0x0102_0304_0506_0708;
    let bytes = serialize_flow(&flow, FieldMask::OCTETS).unwrap();
    // mask u32 then the counter
    assert_eq!(
        &bytes[4..12],
        &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
    );
}

#[test]
fn test_tag_follows_mask() {
    let mut flow = sample_flow();
    flow.fields |= FieldMask::TAG;
    flow.tag = 0xfeed;
    let bytes = serialize_flow(&flow, FieldMask::TAG | FieldMask::RECV_TIME).unwrap();
    assert_eq!(u32::from_be_bytes(bytes[4..8].try_into().unwrap()), 0xfeed);
}

#[test]
fn test_empty_stream_is_clean_eof() {
    assert!(read_flow(&mut Cursor::new(&[][..])).unwrap().is_none());
}

#[test]
fn test_truncated_mask_is_error() {
    let bytes = [0u8, 0];
    assert!(matches!(
        read_flow(&mut Cursor::new(&bytes[..])),
        Err(StoreError::Truncated { .. })
    ));
}

#[test]
fn test_truncated_body_is_error() {
    let flow = sample_flow();
    let bytes = serialize_flow(&flow, FieldMask::ALL).unwrap();
    let cut = &bytes[..bytes.len() - 3];
    assert!(matches!(
        read_flow(&mut Cursor::new(cut)),
        Err(StoreError::Truncated { .. })
    ));
}

#[test]
fn test_unknown_mask_bits_rejected() {
    let bytes = 0x8000_0000u32.to_be_bytes();
    assert!(matches!(
        read_flow(&mut Cursor::new(&bytes[..])),
        Err(StoreError::UnknownFields { .. })
    ));
}

#[test]
fn test_multiple_records_sequential() {
    let flow = sample_flow();
    let mut stream = Vec::new();
    for _ in 0..3 {
        stream.extend_from_slice(&serialize_flow(&flow, FieldMask::ALL).unwrap());
    }

    let mut cursor = Cursor::new(&stream[..]);
    let mut n = 0;
    while let Some(f) = read_flow(&mut cursor).unwrap() {
        assert_eq!(f.dst_port, 443);
        n += 1;
    }
    assert_eq!(n, 3);
}
