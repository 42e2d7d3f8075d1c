//! Node list parser
//!
//! Wire format, one record per `\r\n`-terminated line:
//!
//! ```text
//! expireAge,cname,cpuLoad,netLoad        remote node
//! expireAge,cname,cpuLoad,netLoad,*      local node (5th field content is ignored)
//! ```

use crate::protocol::record::{NodeRecord, NodeStats};
use crate::resilience::FaultLatch;
use crate::{Error, Result};
use std::sync::Arc;

/// Line terminator used by the daemon.
pub const LINE_TERMINATOR: &str = "\r\n";
/// Field separator within a line.
pub const FIELD_SEPARATOR: char = ',';

const FIELD_EXPIRE: usize = 0;
const FIELD_CNAME: usize = 1;
const FIELD_CPU_LOAD: usize = 2;
const FIELD_NET_LOAD: usize = 3;
const FIELD_LOCAL_MARKER: usize = 4;

const REMOTE_FIELD_COUNT: usize = 4;
const LOCAL_FIELD_COUNT: usize = 5;

/// Turns a raw node list into records, tripping the fault latch on an empty payload.
#[derive(Debug, Clone)]
pub struct RecordParser {
    latch: Arc<FaultLatch>,
}

impl RecordParser {
    pub fn new(latch: Arc<FaultLatch>) -> Self {
        Self { latch }
    }

    /// Parse a payload received from the daemon.
    ///
    /// An empty payload is a protocol failure: it trips the latch and fails with
    /// [`Error::EmptyPayload`]. A malformed line fails the whole batch with
    /// [`Error::MalformedRecord`] and leaves the latch alone.
    pub fn parse(&self, raw: &[u8]) -> Result<Vec<NodeRecord>> {
        self.parse_optional(Some(raw))
    }

    /// Like [`RecordParser::parse`], treating an absent payload the same as an empty one.
    pub fn parse_optional(&self, raw: Option<&[u8]>) -> Result<Vec<NodeRecord>> {
        match raw {
            Some(bytes) if !bytes.is_empty() => parse_records(bytes),
            _ => {
                tracing::debug!("node list was empty or absent");
                self.latch.trip(Error::EmptyPayload.to_string());
                Err(Error::EmptyPayload)
            }
        }
    }
}

/// Parse a non-empty payload without touching any latch.
///
/// Records keep their input order. Blank lines, including the one left by a final
/// terminator, are skipped. Line numbers in errors are 0-based.
pub fn parse_records(raw: &[u8]) -> Result<Vec<NodeRecord>> {
    if raw.is_empty() {
        return Err(Error::EmptyPayload);
    }

    let text = std::str::from_utf8(raw).map_err(|e| {
        let valid = &raw[..e.valid_up_to()];
        let line = valid.windows(2).filter(|w| *w == b"\r\n").count();
        Error::malformed(line, "invalid UTF-8")
    })?;

    let mut records = Vec::new();
    let mut seen_local = false;

    for (index, line) in text.split(LINE_TERMINATOR).enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_line(index, line)?;
        if record.is_local() {
            if seen_local {
                return Err(Error::malformed(index, "more than one local record"));
            }
            seen_local = true;
        }
        records.push(record);
    }

    tracing::debug!(records = records.len(), local = seen_local, "parsed node list");
    Ok(records)
}

fn parse_line(index: usize, line: &str) -> Result<NodeRecord> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();

    if fields.len() != REMOTE_FIELD_COUNT && fields.len() != LOCAL_FIELD_COUNT {
        return Err(Error::malformed(
            index,
            format!(
                "expected {} or {} fields, found {}",
                REMOTE_FIELD_COUNT,
                LOCAL_FIELD_COUNT,
                fields.len()
            ),
        ));
    }

    let expire_age = parse_number(index, "expireAge", fields[FIELD_EXPIRE])?;
    if expire_age < 0.0 {
        return Err(Error::malformed(index, "expireAge is negative"));
    }

    let cname = fields[FIELD_CNAME];
    if cname.is_empty() {
        return Err(Error::malformed(index, "cname is empty"));
    }

    let cpu_load = parse_number(index, "cpuLoad", fields[FIELD_CPU_LOAD])?;
    let net_load = parse_number(index, "netLoad", fields[FIELD_NET_LOAD])?;
    let stats = NodeStats::new(expire_age, cname, cpu_load, net_load);

    match fields.get(FIELD_LOCAL_MARKER) {
        None => Ok(NodeRecord::Remote(stats)),
        Some(marker) if !marker.is_empty() => Ok(NodeRecord::Local(stats)),
        Some(_) => Err(Error::malformed(index, "local marker field is empty")),
    }
}

fn parse_number(index: usize, name: &str, field: &str) -> Result<f64> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Error::malformed(
            index,
            format!("{} '{}' is not a number", name, field),
        )),
    }
}
