//! # Node List Protocol
//!
//! Text format spoken by the statistics daemon in reply to the list command.
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`record`] | Parsed node records, tagged local or remote |
//! | [`parser`] | Payload to record conversion |
//!
//! ## Example
//!
//! ```rust
//! use cfbalance::protocol::{parse_records, NodeRecord};
//!
//! let raw = b"0,17.download.example.org,1.01,8.72,*\r\n0,21.download.example.org,0.91,4.78\r\n";
//! let records = parse_records(raw).unwrap();
//!
//! assert!(records[0].is_local());
//! assert_eq!(records[1], NodeRecord::remote(0.0, "21.download.example.org", 0.91, 4.78));
//! ```

pub mod parser;
pub mod record;

pub use parser::{parse_records, RecordParser, FIELD_SEPARATOR, LINE_TERMINATOR};
pub use record::{NodeRecord, NodeStats};

/// Single-byte command asking the daemon for its node list.
pub const LIST_COMMAND: &[u8] = b"L";
