//! Datagram ingest pipeline
//!
//! The single place where packets become stored flows: look up (or create)
//! the sending peer, decode, then run every extracted flow through the
//! family check, the filter, and the log append, in packet order. All
//! mutable collector state except the log handle lives here; the serve loop
//! owns the log because reopen/reconfigure manage its lifetime.

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use flowcask_filter::{filter_flow, FilterRule};
use flowcask_protocol::{decode, DecodeError, FieldMask, FlowAddr, FlowRecord};
use flowcask_store::{FlowLog, StoreError};

use crate::peers::PeerTable;

/// Decode-and-store state owned by the ingest loop
pub struct Ingest {
    peers: PeerTable,
    rules: Vec<FilterRule>,
    store_mask: FieldMask,
    /// Log each stored flow at DEBUG
    verbose: bool,
}

impl Ingest {
    pub fn new(
        max_peers: usize,
        rules: Vec<FilterRule>,
        store_mask: FieldMask,
        verbose: bool,
    ) -> Self {
        Self {
            peers: PeerTable::new(max_peers),
            rules,
            store_mask,
            verbose,
        }
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    pub fn store_mask(&self) -> FieldMask {
        self.store_mask
    }

    /// Adopt a reloaded configuration; peer state survives reconfiguration
    pub fn apply_config(
        &mut self,
        max_peers: usize,
        rules: Vec<FilterRule>,
        store_mask: FieldMask,
        verbose: bool,
    ) {
        self.peers.set_max_peers(max_peers);
        self.rules = rules;
        self.store_mask = store_mask;
        self.verbose = verbose;
    }

    /// Process one datagram; errors are fatal log-write failures only
    pub fn handle_datagram(
        &mut self,
        payload: &[u8],
        from: SocketAddr,
        log: &mut FlowLog,
    ) -> Result<(), StoreError> {
        let source = FlowAddr::from(&from);

        if !self.peers.contains(&source) {
            self.peers.insert(source);
        }

        let decoded = match decode::decode(payload, source, now_secs()) {
            Ok(decoded) => decoded,
            Err(DecodeError::UnsupportedVersion { version }) => {
                // Deliberately not counted as invalid
                info!(peer = %source, version, "unsupported netflow version");
                return Ok(());
            }
            Err(e) => {
                self.peers.record_invalid(&source);
                warn!(peer = %source, error = %e, "rejected packet");
                return Ok(());
            }
        };

        debug!(
            peer = %source,
            version = decoded.version,
            flows = decoded.flows.len(),
            "valid netflow packet"
        );
        self.peers
            .touch(&source, decoded.flows.len() as u64, decoded.version);

        for mut flow in decoded.flows {
            self.submit_flow(&mut flow, log)?;
        }
        Ok(())
    }

    /// Filter one flow and append it to the log if accepted
    pub fn submit_flow(
        &mut self,
        flow: &mut FlowRecord,
        log: &mut FlowLog,
    ) -> Result<(), StoreError> {
        if !flow.src_addr.same_family(&flow.dst_addr) {
            warn!(
                src = %flow.src_addr,
                dst = %flow.dst_addr,
                "flow src/dst address family mismatch"
            );
            return Ok(());
        }

        if self.verbose {
            debug!(flow = %flow, "flow");
        }

        let verdict = filter_flow(flow, &self.rules);
        if !verdict.accept {
            return Ok(());
        }
        if let Some(tag) = verdict.tag {
            flow.tag = tag;
            flow.fields |= FieldMask::TAG;
        }

        // TODO: reopen the log on a single append failure and only exit
        // after repeated ones; for now every failure is fatal
        log.append(flow, self.store_mask)?;
        Ok(())
    }

    /// Dump the filter rules and the peer registry to the log sink
    pub fn dump_state(&self) {
        info!(rules = self.rules.len(), "filter rules");
        for rule in &self.rules {
            info!(rule = %rule, "filter rule");
        }
        self.peers.dump();
    }
}

/// Wall-clock seconds, saturating at the epoch on a badly set clock
fn now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
