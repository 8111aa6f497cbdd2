//! Canonical flow record
//!
//! The decoders fill one of these per exported flow; the filter engine reads
//! it and the flow-log writer serializes it. Every integer is host order -
//! the wire and the log are the only places network order exists.

use std::fmt;

use crate::{FieldMask, FlowAddr};

/// One decoded flow
///
/// `fields` names which members are meaningful; members whose bit is unset
/// hold their zero value. Sub-groups follow the log record layout: receive
/// time, protocol triple, addresses, ports, counters, interface indices,
/// agent info, flow times, AS info, flow engine info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecord {
    /// Which of the optional members below are present
    pub fields: FieldMask,
    /// Tag assigned by the filter engine
    pub tag: u32,

    /// Wall-clock seconds when the datagram was received
    pub recv_secs: u32,

    // Protocol / flags / type-of-service triple
    pub tcp_flags: u8,
    pub protocol: u8,
    pub tos: u8,

    /// Exporter that sent the enclosing datagram
    pub agent_addr: FlowAddr,
    pub src_addr: FlowAddr,
    pub dst_addr: FlowAddr,
    /// Next-hop router
    pub gateway_addr: FlowAddr,

    pub src_port: u16,
    pub dst_port: u16,

    // Counters arrive as 32 bits on the wire; stored widened
    pub flow_packets: u64,
    pub flow_octets: u64,

    pub if_index_in: u16,
    pub if_index_out: u16,

    // Agent info from the packet header
    pub sys_uptime_ms: u32,
    pub time_sec: u32,
    pub time_nanosec: u32,
    pub netflow_version: u16,

    // Flow start/finish in exporter uptime milliseconds
    pub flow_start: u32,
    pub flow_finish: u32,

    pub src_as: u16,
    pub dst_as: u16,
    pub src_mask: u8,
    pub dst_mask: u8,

    pub engine_type: u8,
    pub engine_id: u8,
    pub flow_sequence: u32,
}

impl Default for FlowRecord {
    fn default() -> Self {
        Self {
            fields: FieldMask::empty(),
            tag: 0,
            recv_secs: 0,
            tcp_flags: 0,
            protocol: 0,
            tos: 0,
            agent_addr: FlowAddr::UNSPECIFIED,
            src_addr: FlowAddr::UNSPECIFIED,
            dst_addr: FlowAddr::UNSPECIFIED,
            gateway_addr: FlowAddr::UNSPECIFIED,
            src_port: 0,
            dst_port: 0,
            flow_packets: 0,
            flow_octets: 0,
            if_index_in: 0,
            if_index_out: 0,
            sys_uptime_ms: 0,
            time_sec: 0,
            time_nanosec: 0,
            netflow_version: 0,
            flow_start: 0,
            flow_finish: 0,
            src_as: 0,
            dst_as: 0,
            src_mask: 0,
            dst_mask: 0,
            engine_type: 0,
            engine_id: 0,
            flow_sequence: 0,
        }
    }
}

impl fmt::Display for FlowRecord {
    /// Brief one-line summary for verbose logging and dumps
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "proto {} {}:{} -> {}:{} {} octets {} packets agent {}",
            self.protocol,
            self.src_addr,
            self.src_port,
            self.dst_addr,
            self.dst_port,
            self.flow_octets,
            self.flow_packets,
            self.agent_addr,
        )?;
        if self.fields.contains(FieldMask::TAG) {
            write!(f, " tag {}", self.tag)?;
        }
        Ok(())
    }
}
