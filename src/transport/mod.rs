//! Transport to the statistics daemon.
//!
//! [`StatsSource`] is the seam the selector fetches through; [`TcpStatsLink`] is
//! the production implementation. Tests and embedders may supply their own.

pub mod tcp;

pub use tcp::TcpStatsLink;

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Anything that can produce one raw node-list payload.
///
/// Implementations do not retry. A call either returns the bytes received
/// (possibly empty) or a transport failure.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch_raw(&self) -> Result<Bytes>;
}
