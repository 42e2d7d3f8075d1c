//! # cfbalance
//!
//! Client-side load steering for a CFBalance server pool.
//!
//! ## Overview
//!
//! Every node in the pool runs a statistics daemon that tracks CPU and outgoing
//! bandwidth utilization for all members. This crate asks the local daemon for
//! that list, scores each node's availability, and names the node that should
//! serve the next client request: either this node or the cname of a remote one.
//! Issuing the actual HTTP redirect is left to the caller.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cfbalance::{BalancerConfig, Selector, Target};
//!
//! #[tokio::main]
//! async fn main() -> cfbalance::Result<()> {
//!     let selector = Selector::new(&BalancerConfig::from_env()?)?;
//!
//!     match selector.select_target().await {
//!         Ok(Target::Local) => println!("serve locally"),
//!         Ok(target) => println!("Location: {}", target.location("/file.iso").unwrap_or_default()),
//!         // Never guess a target on failure
//!         Err(e) => eprintln!("serving locally, balancer unavailable: {}", e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`transport`] | Timeout-bounded exchange with the statistics daemon |
//! | [`protocol`] | Node list records and parser |
//! | [`scoring`] | Weighted availability cost |
//! | [`selector`] | Pipeline orchestration and the local-preference rule |
//! | [`resilience`] | Process-wide sticky fault latch |
//! | [`telemetry`] | Timestamped trace sinks |
//! | [`config`] | Daemon address, timeout, and scoring constants |

pub mod config;
pub mod protocol;
pub mod resilience;
pub mod scoring;
pub mod selector;
pub mod telemetry;
pub mod transport;

pub use config::BalancerConfig;
pub use protocol::{NodeRecord, NodeStats};
pub use resilience::FaultLatch;
pub use scoring::{ScoredNode, ScoringPolicy};
pub use selector::{PoolSnapshot, Selector, SelectorBuilder, Target};
pub use telemetry::{TraceEvent, TraceSink};
pub use transport::{StatsSource, TcpStatsLink};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};
