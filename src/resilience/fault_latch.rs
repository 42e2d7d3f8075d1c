use crate::{Error, Result};
use arc_swap::ArcSwapOption;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct FaultLatchSnapshot {
    pub dead: bool,
    /// First failure reason, if tripped.
    pub reason: Option<String>,
    /// Time since the latch tripped in ms, if tripped.
    pub tripped_ago_ms: Option<u64>,
}

#[derive(Debug)]
struct Tripped {
    reason: String,
    at: Instant,
}

/// Sticky, process-wide failure flag.
///
/// - Starts untripped
/// - Trips exactly once; the first reason wins and is never overwritten
/// - Stays tripped until [`FaultLatch::reset`] is called explicitly
pub struct FaultLatch {
    state: ArcSwapOption<Tripped>,
}

static GLOBAL_LATCH: Lazy<Arc<FaultLatch>> = Lazy::new(|| Arc::new(FaultLatch::new()));

impl FaultLatch {
    pub fn new() -> Self {
        Self {
            state: ArcSwapOption::empty(),
        }
    }

    /// The latch shared by every selector that was not given its own.
    pub fn global() -> Arc<FaultLatch> {
        Arc::clone(&GLOBAL_LATCH)
    }

    pub fn is_dead(&self) -> bool {
        self.state.load().is_some()
    }

    pub fn reason(&self) -> Option<String> {
        (*self.state.load()).as_ref().map(|t| t.reason.clone())
    }

    /// Fails with [`Error::LatchedFailure`] carrying the original reason once tripped.
    pub fn check(&self) -> Result<()> {
        let current = self.state.load();
        match &*current {
            Some(t) => Err(Error::LatchedFailure {
                reason: t.reason.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Trip the latch. Returns `true` only for the call that performed the transition.
    pub fn trip(&self, reason: impl Into<String>) -> bool {
        let next = Arc::new(Tripped {
            reason: reason.into(),
            at: Instant::now(),
        });
        let prev = self
            .state
            .compare_and_swap(&None::<Arc<Tripped>>, Some(Arc::clone(&next)));
        if prev.is_none() {
            tracing::warn!(reason = %next.reason, "fault latch tripped");
            true
        } else {
            false
        }
    }

    /// Clear the latch. Only operators and test harnesses call this.
    pub fn reset(&self) {
        self.state.store(None);
    }

    pub fn snapshot(&self) -> FaultLatchSnapshot {
        let now = Instant::now();
        let current = self.state.load();
        match &*current {
            Some(t) => {
                let ago = now.saturating_duration_since(t.at).as_millis();
                FaultLatchSnapshot {
                    dead: true,
                    reason: Some(t.reason.clone()),
                    tripped_ago_ms: Some(u64::try_from(ago).unwrap_or(u64::MAX)),
                }
            }
            None => FaultLatchSnapshot {
                dead: false,
                reason: None,
                tripped_ago_ms: None,
            },
        }
    }
}

impl Default for FaultLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FaultLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultLatch")
            .field("dead", &self.is_dead())
            .field("reason", &self.reason())
            .finish()
    }
}
