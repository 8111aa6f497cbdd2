//! flowcask configuration
//!
//! TOML-based configuration with defaults that just work: with no file at
//! all the collector listens on 0.0.0.0:2055, keeps every field, and accepts
//! every flow.
//!
//! # Example
//!
//! ```toml
//! logfile = "/var/log/flowcask/flows.bin"
//! max_peers = 256
//! store = ["recv_time", "src_addr", "dst_addr", "ports", "octets", "packets"]
//!
//! [log]
//! level = "info"
//!
//! [[listen]]
//! port = 2055
//!
//! [[filter]]
//! action = "discard"
//! proto = 17
//! ```
//!
//! Macro definitions from the command line (`-D name=value`) substitute
//! `${name}` occurrences in the file before parsing.

mod error;
mod listen;
mod logging;
mod rules;

pub use error::{ConfigError, Result};
pub use listen::ListenConfig;
pub use logging::LogConfig;
pub use rules::FilterRuleConfig;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use flowcask_filter::FilterRule;
use flowcask_protocol::FieldMask;

/// Default bound on tracked exporters
const DEFAULT_MAX_PEERS: usize = 128;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Flow log path
    /// Default: "flows.bin"
    pub logfile: PathBuf,

    /// Maximum number of exporters tracked before LRU eviction
    /// Default: 128
    pub max_peers: usize,

    /// Field names to persist per flow
    /// Default: ["all"]
    pub store: Vec<String>,

    /// Log each stored flow at DEBUG (also enabled by -d)
    pub verbose: bool,

    /// Logging settings
    pub log: LogConfig,

    /// UDP listeners; one on the default port when none are given
    pub listen: Vec<ListenConfig>,

    /// Filter rules, evaluated in order
    pub filter: Vec<FilterRuleConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logfile: PathBuf::from("flows.bin"),
            max_peers: DEFAULT_MAX_PEERS,
            store: vec!["all".into()],
            verbose: false,
            log: LogConfig::default(),
            listen: Vec::new(),
            filter: Vec::new(),
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(s)?;
        if config.listen.is_empty() {
            config.listen.push(ListenConfig::default());
        }
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Load from a file, applying `-D` macro definitions first
    pub fn from_file(path: impl AsRef<Path>, defines: &[(String, String)]) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        apply_defines(&text, defines).parse()
    }

    /// Check everything that can fail beyond TOML syntax
    pub fn validate(&self) -> Result<()> {
        if self.max_peers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_peers",
                message: "must be at least 1".into(),
            });
        }
        for listener in &self.listen {
            listener.socket_addr()?;
        }
        self.store_mask()?;
        self.rules()?;
        Ok(())
    }

    /// Resolve the store list into a field mask
    pub fn store_mask(&self) -> Result<FieldMask> {
        let mut mask = FieldMask::empty();
        for name in &self.store {
            mask |= FieldMask::from_config_name(name).ok_or_else(|| ConfigError::UnknownStoreField {
                name: name.clone(),
            })?;
        }
        Ok(mask)
    }

    /// Compile the filter rules
    pub fn rules(&self) -> Result<Vec<FilterRule>> {
        self.filter
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                FilterRule::try_from(rule).map_err(|reason| ConfigError::InvalidRule {
                    index,
                    reason,
                })
            })
            .collect()
    }
}

/// Parse `name=value` command-line macro definitions
pub fn parse_defines(defs: &[String]) -> Result<Vec<(String, String)>> {
    defs.iter()
        .map(|def| {
            def.split_once('=')
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .ok_or_else(|| ConfigError::BadDefine(def.clone()))
        })
        .collect()
}

/// Substitute `${name}` occurrences in the config text
fn apply_defines(text: &str, defines: &[(String, String)]) -> String {
    let mut out = text.to_string();
    for (name, value) in defines {
        out = out.replace(&format!("${{{}}}", name), value);
    }
    out
}
