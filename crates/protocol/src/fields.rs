//! Flow record field mask
//!
//! Every flow record names the optional sub-records it carries in a 32-bit
//! mask. The same mask appears at the front of every on-disk log record, so
//! the bit assignment here is a stable external contract - changing it breaks
//! every existing flow log.

use bitflags::bitflags;

bitflags! {
    /// Which optional sub-records a flow record carries
    ///
    /// Sub-records are serialized in ascending bit order. Addresses have one
    /// bit per family; a record never sets both bits of a pair.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldMask: u32 {
        const TAG              = 1;
        const RECV_TIME        = 1 << 1;
        const PROTO_FLAGS_TOS  = 1 << 2;
        const AGENT_ADDR4      = 1 << 3;
        const AGENT_ADDR6      = 1 << 4;
        const SRC_ADDR4        = 1 << 5;
        const SRC_ADDR6        = 1 << 6;
        const DST_ADDR4        = 1 << 7;
        const DST_ADDR6        = 1 << 8;
        const GATEWAY_ADDR4    = 1 << 9;
        const GATEWAY_ADDR6    = 1 << 10;
        const SRCDST_PORT      = 1 << 11;
        const PACKETS          = 1 << 12;
        const OCTETS           = 1 << 13;
        const IF_INDICES       = 1 << 14;
        const AGENT_INFO       = 1 << 15;
        const FLOW_TIMES       = 1 << 16;
        const AS_INFO          = 1 << 17;
        const FLOW_ENGINE_INFO = 1 << 18;

        /// Both-family convenience groups
        const AGENT_ADDR   = Self::AGENT_ADDR4.bits() | Self::AGENT_ADDR6.bits();
        const SRC_ADDR     = Self::SRC_ADDR4.bits() | Self::SRC_ADDR6.bits();
        const DST_ADDR     = Self::DST_ADDR4.bits() | Self::DST_ADDR6.bits();
        const GATEWAY_ADDR = Self::GATEWAY_ADDR4.bits() | Self::GATEWAY_ADDR6.bits();

        /// Every defined field
        const ALL = (1 << 19) - 1;
    }
}

/// Field names accepted in configuration, family-agnostic
///
/// Order matches serialization order.
const FIELD_NAMES: &[(&str, FieldMask)] = &[
    ("tag", FieldMask::TAG),
    ("recv_time", FieldMask::RECV_TIME),
    ("proto_flags_tos", FieldMask::PROTO_FLAGS_TOS),
    ("agent_addr", FieldMask::AGENT_ADDR),
    ("src_addr", FieldMask::SRC_ADDR),
    ("dst_addr", FieldMask::DST_ADDR),
    ("gateway_addr", FieldMask::GATEWAY_ADDR),
    ("ports", FieldMask::SRCDST_PORT),
    ("packets", FieldMask::PACKETS),
    ("octets", FieldMask::OCTETS),
    ("if_indices", FieldMask::IF_INDICES),
    ("agent_info", FieldMask::AGENT_INFO),
    ("flow_times", FieldMask::FLOW_TIMES),
    ("as_info", FieldMask::AS_INFO),
    ("flow_engine_info", FieldMask::FLOW_ENGINE_INFO),
    ("all", FieldMask::ALL),
];

impl FieldMask {
    /// Look up a configuration field name
    ///
    /// Address names select both family bits; the writer narrows to the
    /// family actually present.
    pub fn from_config_name(name: &str) -> Option<FieldMask> {
        FIELD_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, m)| *m)
    }

    /// Names of the fields set in this mask, for display
    pub fn names(&self) -> Vec<&'static str> {
        FIELD_NAMES
            .iter()
            .take(FIELD_NAMES.len() - 1) // skip "all"
            .filter(|(_, m)| self.intersects(*m))
            .map(|(n, _)| *n)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_covers_every_flag() {
        assert_eq!(FieldMask::ALL.bits(), 0x7ffff);
        assert!(FieldMask::ALL.contains(FieldMask::TAG));
        assert!(FieldMask::ALL.contains(FieldMask::FLOW_ENGINE_INFO));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(FieldMask::from_config_name("octets"), Some(FieldMask::OCTETS));
        assert_eq!(FieldMask::from_config_name("src_addr"), Some(FieldMask::SRC_ADDR));
        assert_eq!(FieldMask::from_config_name("all"), Some(FieldMask::ALL));
        assert_eq!(FieldMask::from_config_name("bogus"), None);
    }

    #[test]
    fn test_group_names_select_both_families() {
        let m = FieldMask::from_config_name("gateway_addr").unwrap();
        assert!(m.contains(FieldMask::GATEWAY_ADDR4));
        assert!(m.contains(FieldMask::GATEWAY_ADDR6));
    }

    #[test]
    fn test_names_round_trip() {
        let m = FieldMask::RECV_TIME | FieldMask::OCTETS | FieldMask::SRC_ADDR4;
        let names = m.names();
        assert!(names.contains(&"recv_time"));
        assert!(names.contains(&"octets"));
        assert!(names.contains(&"src_addr"));
        assert!(!names.contains(&"packets"));
    }

    #[test]
    fn test_intersection_is_subset() {
        let store = FieldMask::RECV_TIME | FieldMask::SRC_ADDR | FieldMask::DST_ADDR;
        let produced = FieldMask::ALL - FieldMask::TAG;
        let persisted = produced & store;
        assert!(store.contains(persisted));
        assert!(produced.contains(persisted));
    }
}
