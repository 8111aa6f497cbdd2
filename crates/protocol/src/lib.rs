//! NetFlow wire protocol support for flowcask
//!
//! This crate owns everything that touches NetFlow bytes on the receive path:
//!
//! - [`FlowAddr`] - exporter/flow addresses (IPv4 or IPv6) with a total order
//! - [`FieldMask`] - the typed bitset naming which optional sub-records a
//!   flow carries, shared with the on-disk log format
//! - [`FlowRecord`] - the canonical in-memory flow record produced by the
//!   decoders and consumed by the filter and the flow-log writer
//! - [`decode`] - NetFlow v1/v5/v7 packet decoders
//!
//! All multi-byte integers in a [`FlowRecord`] are host order; conversion to
//! and from network order happens only at the wire and log boundaries.

mod addr;
mod error;
mod fields;
mod flow;

pub mod decode;

pub use addr::{AddrFamily, AddrParseError, FlowAddr};
pub use error::DecodeError;
pub use fields::FieldMask;
pub use flow::FlowRecord;
