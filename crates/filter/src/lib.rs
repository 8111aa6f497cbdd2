//! Flow filtering
//!
//! A filter is an ordered list of rules. Each rule pairs an action (accept,
//! discard, or tag) with a set of optional match criteria; a criterion left
//! unset matches every flow. Evaluation scans the whole list: every matching
//! rule overwrites the running verdict, so the last match wins, unless a
//! matching rule is marked `quick`, which ends the scan immediately. A flow
//! matching no rule is accepted.
//!
//! The rule syntax lives in the configuration layer; this crate only defines
//! the compiled representation and the evaluator. Evaluation is a pure
//! function over the rule slice - it never mutates the rules.

use std::fmt;

use flowcask_protocol::{FlowAddr, FlowRecord};

/// What a matching rule does with the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Accept,
    Discard,
    /// Accept and label the flow with this tag
    Tag(u32),
}

/// An address criterion: network plus prefix length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrMatch {
    pub net: FlowAddr,
    pub masklen: u8,
}

impl AddrMatch {
    pub fn matches(&self, addr: &FlowAddr) -> bool {
        addr.prefix_matches(&self.net, self.masklen)
    }
}

impl fmt::Display for AddrMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.masklen == self.net.family().bits() {
            write!(f, "{}", self.net)
        } else {
            write!(f, "{}/{}", self.net, self.masklen)
        }
    }
}

/// One compiled filter rule
///
/// All criteria are optional; a rule with none matches every flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub action: RuleAction,
    /// Stop evaluating further rules when this one matches
    pub quick: bool,

    pub agent: Option<AddrMatch>,
    pub src: Option<AddrMatch>,
    pub dst: Option<AddrMatch>,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub proto: Option<u8>,
    pub tos: Option<u8>,
}

impl FilterRule {
    /// A match-everything rule with the given action
    pub fn any(action: RuleAction) -> Self {
        Self {
            action,
            quick: false,
            agent: None,
            src: None,
            dst: None,
            src_port: None,
            dst_port: None,
            proto: None,
            tos: None,
        }
    }

    /// Does this rule match the flow?
    pub fn matches(&self, flow: &FlowRecord) -> bool {
        if let Some(m) = &self.agent {
            if !m.matches(&flow.agent_addr) {
                return false;
            }
        }
        if let Some(m) = &self.src {
            if !m.matches(&flow.src_addr) {
                return false;
            }
        }
        if let Some(m) = &self.dst {
            if !m.matches(&flow.dst_addr) {
                return false;
            }
        }
        if let Some(p) = self.src_port {
            if flow.src_port != p {
                return false;
            }
        }
        if let Some(p) = self.dst_port {
            if flow.dst_port != p {
                return false;
            }
        }
        if let Some(p) = self.proto {
            if flow.protocol != p {
                return false;
            }
        }
        if let Some(t) = self.tos {
            if flow.tos != t {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            RuleAction::Accept => write!(f, "accept")?,
            RuleAction::Discard => write!(f, "discard")?,
            RuleAction::Tag(tag) => write!(f, "tag {}", tag)?,
        }
        if self.quick {
            write!(f, " quick")?;
        }
        if let Some(m) = &self.agent {
            write!(f, " agent {}", m)?;
        }
        if let Some(m) = &self.src {
            write!(f, " src {}", m)?;
        }
        if let Some(m) = &self.dst {
            write!(f, " dst {}", m)?;
        }
        if let Some(p) = self.src_port {
            write!(f, " src-port {}", p)?;
        }
        if let Some(p) = self.dst_port {
            write!(f, " dst-port {}", p)?;
        }
        if let Some(p) = self.proto {
            write!(f, " proto {}", p)?;
        }
        if let Some(t) = self.tos {
            write!(f, " tos 0x{:02x}", t)?;
        }
        Ok(())
    }
}

/// Final disposition of one flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub accept: bool,
    /// Tag to persist with the flow, when a tag rule matched
    pub tag: Option<u32>,
}

impl Verdict {
    const ACCEPT: Self = Self {
        accept: true,
        tag: None,
    };
}

/// Evaluate a flow against the rule list
///
/// The default verdict is accept. Each matching rule replaces the verdict;
/// a matching quick rule ends the scan.
pub fn filter_flow(flow: &FlowRecord, rules: &[FilterRule]) -> Verdict {
    let mut verdict = Verdict::ACCEPT;

    for rule in rules {
        if !rule.matches(flow) {
            continue;
        }
        verdict = match rule.action {
            RuleAction::Accept => Verdict::ACCEPT,
            RuleAction::Discard => Verdict {
                accept: false,
                tag: None,
            },
            RuleAction::Tag(tag) => Verdict {
                accept: true,
                tag: Some(tag),
            },
        };
        if rule.quick {
            break;
        }
    }

    verdict
}
