//! # Target Selection
//!
//! Orchestrates one selection cycle:
//!
//! ```text
//! latch check -> fetch -> parse -> score -> decide
//! ```
//!
//! Every call re-queries the daemon over its own connection. There is no retry
//! loop and no caching here; callers that want either wrap the [`Selector`].
//!
//! ```rust,no_run
//! use cfbalance::config::BalancerConfig;
//! use cfbalance::selector::{Selector, Target};
//!
//! #[tokio::main]
//! async fn main() -> cfbalance::Result<()> {
//!     let selector = Selector::new(&BalancerConfig::default())?;
//!     match selector.select_target().await? {
//!         Target::Local => println!("serve here"),
//!         Target::Remote(cname) => println!("redirect to {}", cname),
//!     }
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod snapshot;

pub use builder::SelectorBuilder;
pub use snapshot::{PoolSnapshot, Target};

use crate::config::BalancerConfig;
use crate::protocol::{NodeRecord, RecordParser};
use crate::resilience::FaultLatch;
use crate::scoring::ScoringPolicy;
use crate::telemetry::Tracer;
use crate::transport::StatsSource;
use crate::Result;
use std::sync::Arc;

/// Picks the node that should receive the next client request.
///
/// Safe to share across tasks; concurrent calls never share a connection and
/// only meet at the fault latch.
pub struct Selector {
    pub(crate) source: Arc<dyn StatsSource>,
    pub(crate) parser: RecordParser,
    pub(crate) policy: ScoringPolicy,
    pub(crate) latch: Arc<FaultLatch>,
    pub(crate) tracer: Tracer,
}

impl Selector {
    /// Selector talking TCP to the configured daemon, using the global latch and trace sink.
    pub fn new(config: &BalancerConfig) -> Result<Self> {
        SelectorBuilder::new().config(config.clone()).build()
    }

    pub fn builder() -> SelectorBuilder {
        SelectorBuilder::new()
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn fault_latch(&self) -> &Arc<FaultLatch> {
        &self.latch
    }

    /// Fetch and parse one node list, local and remote records in wire order.
    pub async fn node_list(&self) -> Result<Vec<NodeRecord>> {
        if let Err(e) = self.latch.check() {
            self.tracer.emit("node_list").await;
            return Err(e);
        }

        let raw = match self.source.fetch_raw().await {
            Ok(raw) => raw,
            Err(e) => {
                if e.latches() {
                    self.latch.trip(e.to_string());
                }
                self.tracer.emit(format!("node_list - fetch failed: {}", e)).await;
                return Err(e);
            }
        };
        self.tracer
            .emit(format!("node_list - got {} bytes in raw form", raw.len()))
            .await;

        match self.parser.parse(&raw) {
            Ok(records) => {
                self.tracer
                    .emit(format!("node_list - parsed {} records", records.len()))
                    .await;
                Ok(records)
            }
            Err(e) => {
                self.tracer.emit(format!("node_list - parse failed: {}", e)).await;
                Err(e)
            }
        }
    }

    /// One full cycle up to scoring, without deciding.
    pub async fn snapshot(&self) -> Result<PoolSnapshot> {
        let records = self.node_list().await?;
        let snapshot = PoolSnapshot::from_records(records, &self.policy);
        self.tracer
            .emit(format!(
                "snapshot - scored {} remotes, local {}",
                snapshot.remotes.len(),
                if snapshot.local.is_some() { "present" } else { "absent" }
            ))
            .await;
        Ok(snapshot)
    }

    /// Returns [`Target::Local`] or the cname of the most available remote node.
    ///
    /// Fails fast with [`crate::Error::LatchedFailure`] once the latch is tripped,
    /// without touching the network.
    pub async fn select_target(&self) -> Result<Target> {
        if let Err(e) = self.latch.check() {
            self.tracer.emit("select_target").await;
            return Err(e);
        }

        let snapshot = self.snapshot().await?;
        match snapshot.decide(&self.policy) {
            Ok(target) => {
                tracing::info!(target = %target, "selected target");
                self.tracer
                    .emit(format!("select_target - decided {}", target))
                    .await;
                Ok(target)
            }
            Err(e) => {
                self.tracer
                    .emit(format!("select_target - no decision: {}", e))
                    .await;
                Err(e)
            }
        }
    }
}
