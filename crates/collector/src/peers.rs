//! Per-exporter state
//!
//! Every address that ever sends a datagram gets a [`Peer`] carrying its
//! packet/flow/invalid counters. The table is bounded: when a new exporter
//! would exceed the bound, the least-recently-updated peer is forcibly
//! dropped. This keeps memory finite under address-spoofed floods, and the
//! per-peer slot is where NetFlow v9/IPFIX template state would live if
//! those versions are ever decoded.
//!
//! The table is an owning ordered map keyed by exporter address plus an LRU
//! side index over a monotone use-sequence; peers hold their current
//! sequence, so neither structure owns the other's entries.

use std::collections::BTreeMap;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use flowcask_protocol::FlowAddr;

/// State for one exporter
#[derive(Debug, Clone)]
pub struct Peer {
    /// Exporter address, the table key
    pub from: FlowAddr,
    /// Valid packets received
    pub npackets: u64,
    /// Flows extracted from valid packets
    pub nflows: u64,
    /// Malformed packets rejected
    pub ninvalid: u64,
    /// When this exporter was first observed
    pub firstseen: SystemTime,
    /// When the most recent valid packet arrived
    pub lastvalid: Option<SystemTime>,
    /// NetFlow version of the most recent valid packet
    pub last_version: u16,
    /// Position in the LRU index
    lru_seq: u64,
}

/// Bounded registry of exporters with LRU eviction
#[derive(Debug)]
pub struct PeerTable {
    peers: BTreeMap<FlowAddr, Peer>,
    /// use-sequence -> address; the smallest sequence is the LRU peer
    lru: BTreeMap<u64, FlowAddr>,
    next_seq: u64,
    max_peers: usize,
    num_forced: u64,
}

impl PeerTable {
    /// Create a table bounded at `max_peers` exporters
    pub fn new(max_peers: usize) -> Self {
        Self {
            peers: BTreeMap::new(),
            lru: BTreeMap::new(),
            next_seq: 0,
            max_peers,
            num_forced: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn max_peers(&self) -> usize {
        self.max_peers
    }

    /// How many peers were evicted to stay within the bound
    pub fn num_forced(&self) -> u64 {
        self.num_forced
    }

    pub fn contains(&self, addr: &FlowAddr) -> bool {
        self.peers.contains_key(addr)
    }

    /// Look up a peer without disturbing LRU order
    pub fn find(&self, addr: &FlowAddr) -> Option<&Peer> {
        self.peers.get(addr)
    }

    /// Peers in key order
    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn evict_lru(&mut self) {
        if let Some((_, addr)) = self.lru.pop_first() {
            self.peers.remove(&addr);
            self.num_forced += 1;
            warn!(peer = %addr, "forced deletion of peer");
        }
    }

    /// Create state for a new exporter
    ///
    /// The address must not already be present. Evicts the LRU peer first
    /// when the table is full.
    pub fn insert(&mut self, addr: FlowAddr) -> &mut Peer {
        debug_assert!(!self.peers.contains_key(&addr));

        if self.peers.len() + 1 > self.max_peers {
            self.evict_lru();
        }

        debug!(peer = %addr, "new peer");

        let seq = self.next_seq();
        self.lru.insert(seq, addr);
        self.peers.entry(addr).or_insert(Peer {
            from: addr,
            npackets: 0,
            nflows: 0,
            ninvalid: 0,
            firstseen: SystemTime::now(),
            lastvalid: None,
            last_version: 0,
            lru_seq: seq,
        })
    }

    /// Account one valid packet and move the peer to the LRU head
    pub fn touch(&mut self, addr: &FlowAddr, nflows: u64, version: u16) {
        let seq = self.next_seq();
        if let Some(peer) = self.peers.get_mut(addr) {
            self.lru.remove(&peer.lru_seq);
            self.lru.insert(seq, *addr);
            peer.lru_seq = seq;
            peer.lastvalid = Some(SystemTime::now());
            peer.npackets += 1;
            peer.nflows += nflows;
            peer.last_version = version;
            debug!(peer = %addr, "update peer");
        }
    }

    /// Account one malformed packet; does not change LRU order
    pub fn record_invalid(&mut self, addr: &FlowAddr) {
        if let Some(peer) = self.peers.get_mut(addr) {
            peer.ninvalid += 1;
        }
    }

    /// Lower (or raise) the bound, evicting down to it if necessary
    pub fn set_max_peers(&mut self, max_peers: usize) {
        self.max_peers = max_peers;
        while self.peers.len() > self.max_peers {
            self.evict_lru();
        }
    }

    /// Emit a textual summary of every peer, in key order
    pub fn dump(&self) {
        info!(
            num_peers = self.peers.len(),
            max_peers = self.max_peers,
            num_forced = self.num_forced,
            "peer state"
        );
        for (i, peer) in self.iter().enumerate() {
            info!(
                index = i,
                peer = %peer.from,
                packets = peer.npackets,
                flows = peer.nflows,
                invalid = peer.ninvalid,
                first_seen = ?peer.firstseen,
                last_valid = ?peer.lastvalid,
                version = peer.last_version,
                "peer"
            );
        }
    }
}

#[cfg(test)]
#[path = "peers_test.rs"]
mod peers_test;
