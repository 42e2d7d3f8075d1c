//! # Resilience Primitives Module
//!
//! Fail-fast support for the selection pipeline.
//!
//! ## Fault Latch
//!
//! Once the statistics daemon is found unreachable, silent, or returns nothing,
//! the [`fault_latch::FaultLatch`] trips and every later selection fails fast
//! with the original reason instead of paying the network cost again:
//!
//! ```rust
//! use cfbalance::resilience::fault_latch::FaultLatch;
//!
//! let latch = FaultLatch::new();
//! assert!(latch.check().is_ok());
//!
//! latch.trip("connection refused");
//! assert!(latch.check().is_err());
//! assert_eq!(latch.reason().as_deref(), Some("connection refused"));
//! ```
//!
//! The latch only moves from untripped to tripped. Nothing in the pipeline
//! clears it; [`fault_latch::FaultLatch::reset`] exists for operators.

pub mod fault_latch;

pub use fault_latch::{FaultLatch, FaultLatchSnapshot};
