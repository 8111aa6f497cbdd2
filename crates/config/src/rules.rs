//! Filter rule configuration
//!
//! The TOML shape of one filter rule, converted into the compiled
//! [`FilterRule`] used by the evaluator.
//!
//! # Example
//!
//! ```toml
//! [[filter]]
//! action = "discard"
//! src = "192.168.0.0/16"
//! proto = 17
//!
//! [[filter]]
//! action = "tag"
//! tag = 42
//! quick = true
//! dst_port = 443
//! ```

use serde::Deserialize;

use flowcask_filter::{AddrMatch, FilterRule, RuleAction};
use flowcask_protocol::FlowAddr;

/// One rule as written in the configuration file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilterRuleConfig {
    /// "accept", "discard" or "tag"
    pub action: String,

    /// Tag value, required iff action = "tag"
    pub tag: Option<u32>,

    /// Stop evaluating on match
    pub quick: bool,

    /// Exporter address, exact or "addr/len"
    pub agent: Option<String>,

    /// Flow source, exact or "addr/len"
    pub src: Option<String>,

    /// Flow destination, exact or "addr/len"
    pub dst: Option<String>,

    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,

    /// IP protocol number
    pub proto: Option<u8>,

    /// Type-of-service byte
    pub tos: Option<u8>,
}

fn parse_addr_match(s: &str) -> Result<AddrMatch, String> {
    let (net, masklen) = FlowAddr::parse_prefix(s).map_err(|e| e.to_string())?;
    Ok(AddrMatch { net, masklen })
}

impl TryFrom<&FilterRuleConfig> for FilterRule {
    type Error = String;

    fn try_from(config: &FilterRuleConfig) -> Result<Self, Self::Error> {
        let action = match config.action.as_str() {
            "accept" => {
                if config.tag.is_some() {
                    return Err("tag value requires action = \"tag\"".into());
                }
                RuleAction::Accept
            }
            "discard" => {
                if config.tag.is_some() {
                    return Err("tag value requires action = \"tag\"".into());
                }
                RuleAction::Discard
            }
            "tag" => {
                let tag = config.tag.ok_or("action = \"tag\" requires a tag value")?;
                RuleAction::Tag(tag)
            }
            other => return Err(format!("unknown action '{}'", other)),
        };

        Ok(FilterRule {
            action,
            quick: config.quick,
            agent: config
                .agent
                .as_deref()
                .map(parse_addr_match)
                .transpose()
                .map_err(|e| format!("agent: {}", e))?,
            src: config
                .src
                .as_deref()
                .map(parse_addr_match)
                .transpose()
                .map_err(|e| format!("src: {}", e))?,
            dst: config
                .dst
                .as_deref()
                .map(parse_addr_match)
                .transpose()
                .map_err(|e| format!("dst: {}", e))?,
            src_port: config.src_port,
            dst_port: config.dst_port,
            proto: config.proto,
            tos: config.tos,
        })
    }
}
