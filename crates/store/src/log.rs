//! Flow log handles
//!
//! [`FlowLog`] owns the write side of one log file for as long as the file
//! stays open: it runs the open-time header protocol once and then appends
//! records. [`FlowLogReader`] is the matching sequential read side, used by
//! offline tooling and the tests.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use flowcask_protocol::{FieldMask, FlowRecord};

use crate::{check_header, put_header, record, StoreError};

/// Append handle over an open flow-log file
///
/// Created from an already-opened descriptor (normally handed over by the
/// privileged helper). On a fresh, empty file the log header is written; on
/// an existing file the header is verified and the position moves to the
/// end. A header mismatch is an error - the caller treats it as fatal.
#[derive(Debug)]
pub struct FlowLog {
    file: File,
}

impl FlowLog {
    /// Run the open protocol on `file` and return the append handle
    pub fn open(mut file: File) -> Result<Self, StoreError> {
        let pos = file.seek(SeekFrom::End(0))?;
        if pos == 0 {
            tracing::debug!("writing new flow log header");
            put_header(&mut file)?;
        } else {
            file.seek(SeekFrom::Start(0))?;
            check_header(&mut file)?;
            file.seek(SeekFrom::End(0))?;
            tracing::debug!(len = pos, "continuing existing flow log");
        }
        Ok(Self { file })
    }

    /// Append one flow under the configured store mask
    ///
    /// Returns the number of bytes written.
    pub fn append(&mut self, flow: &FlowRecord, store_mask: FieldMask) -> Result<usize, StoreError> {
        let buf = record::serialize_flow(flow, store_mask)?;
        self.file.write_all(&buf)?;
        Ok(buf.len())
    }

    /// Current length of the log in bytes
    pub fn len(&mut self) -> Result<u64, StoreError> {
        Ok(self.file.seek(SeekFrom::End(0))?)
    }
}

/// Sequential reader over a flow log
pub struct FlowLogReader {
    reader: BufReader<File>,
}

impl FlowLogReader {
    /// Open a log file and verify its header
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(32 * 1024, file);
        check_header(&mut reader)?;
        Ok(Self { reader })
    }

    /// Read the next record, or `None` at the end of the log
    pub fn read_flow(&mut self) -> Result<Option<FlowRecord>, StoreError> {
        record::read_flow(&mut self.reader)
    }

    /// Read every remaining record
    pub fn read_all(&mut self) -> Result<Vec<FlowRecord>, StoreError> {
        let mut flows = Vec::new();
        while let Some(flow) = self.read_flow()? {
            flows.push(flow);
        }
        Ok(flows)
    }
}

impl Iterator for FlowLogReader {
    type Item = Result<FlowRecord, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_flow().transpose()
    }
}

#[cfg(test)]
#[path = "log_test.rs"]
mod log_test;
