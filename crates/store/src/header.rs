//! Log file header
//!
//! Written once at offset zero of a fresh log; every later open verifies it
//! before appending. Only magic and version participate in verification -
//! start_time and flags are informational.

use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::StoreError;

/// Log magic number
pub const LOG_MAGIC: u32 = 0x012c_f047;

/// Log format version
pub const LOG_VERSION: u32 = 0x0000_0002;

/// Serialized header size in bytes
pub const LOG_HEADER_SIZE: usize = 16;

/// The fixed header at the start of every flow log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    pub magic: u32,
    pub version: u32,
    /// Epoch seconds when the log was created
    pub start_time: u32,
    /// Reserved, currently always zero
    pub flags: u32,
}

impl LogHeader {
    /// Header for a log created now
    pub fn new() -> Self {
        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        Self {
            magic: LOG_MAGIC,
            version: LOG_VERSION,
            start_time,
            flags: 0,
        }
    }

    /// Serialize to network order
    pub fn to_bytes(&self) -> [u8; LOG_HEADER_SIZE] {
        let mut bytes = [0u8; LOG_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.version.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.start_time.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.flags.to_be_bytes());
        bytes
    }

    /// Deserialize from network order
    pub fn from_bytes(bytes: &[u8; LOG_HEADER_SIZE]) -> Self {
        Self {
            magic: u32::from_be_bytes(bytes[0..4].try_into().unwrap()),
            version: u32::from_be_bytes(bytes[4..8].try_into().unwrap()),
            start_time: u32::from_be_bytes(bytes[8..12].try_into().unwrap()),
            flags: u32::from_be_bytes(bytes[12..16].try_into().unwrap()),
        }
    }
}

impl Default for LogHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a fresh header at the current position
pub fn put_header(w: &mut impl Write) -> Result<(), StoreError> {
    w.write_all(&LogHeader::new().to_bytes())?;
    Ok(())
}

/// Read and verify the header at the current position
pub fn check_header(r: &mut impl Read) -> Result<LogHeader, StoreError> {
    let mut bytes = [0u8; LOG_HEADER_SIZE];
    r.read_exact(&mut bytes).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            StoreError::Truncated {
                context: "file header",
            }
        } else {
            StoreError::Io(e)
        }
    })?;
    let header = LogHeader::from_bytes(&bytes);
    if header.magic != LOG_MAGIC {
        return Err(StoreError::BadMagic {
            found: header.magic,
            expected: LOG_MAGIC,
        });
    }
    if header.version != LOG_VERSION {
        return Err(StoreError::BadVersion {
            found: header.version,
            expected: LOG_VERSION,
        });
    }
    Ok(header)
}
