//! # Trace Sinks
//!
//! The selector emits one timestamped line per pipeline step. Where those lines
//! go is up to the application; the default is nowhere.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TraceEvent`] | Elapsed seconds, message, and whether the balancer was dead |
//! | [`TraceSink`] | Trait for trace destinations |
//! | [`NoopTraceSink`] | Default sink (drops everything) |
//! | [`InMemoryTraceSink`] | Bounded in-memory sink for testing |
//! | [`DebugLog`] | Rolling text buffer rendered on demand |
//! | [`LogTraceSink`] | Forwards to `tracing` |
//! | [`CompositeTraceSink`] | Multi-destination composite sink |
//! | [`Tracer`] | Stamps messages with monotonic elapsed time |

use crate::resilience::FaultLatch;
use crate::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

/// One trace line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    /// Seconds since the emitting tracer was created. Never decreases.
    pub elapsed_secs: f64,
    pub message: String,
    /// Whether the fault latch was tripped when the line was emitted.
    pub dead: bool,
}

#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn report(&self, event: TraceEvent) -> Result<()>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTraceSink;

#[async_trait]
impl TraceSink for NoopTraceSink {
    async fn report(&self, _event: TraceEvent) -> Result<()> {
        Ok(())
    }
}

pub fn noop_sink() -> Arc<dyn TraceSink> {
    Arc::new(NoopTraceSink)
}

/// In-memory sink for testing.
pub struct InMemoryTraceSink {
    events: RwLock<Vec<TraceEvent>>,
    max_events: usize,
}
impl InMemoryTraceSink {
    pub fn new(max: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events: max,
        }
    }
    pub fn get_events(&self) -> Vec<TraceEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
    pub fn messages(&self) -> Vec<String> {
        self.get_events().into_iter().map(|e| e.message).collect()
    }
    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
#[async_trait]
impl TraceSink for InMemoryTraceSink {
    async fn report(&self, event: TraceEvent) -> Result<()> {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        events.push(event);
        if events.len() > self.max_events {
            events.remove(0);
        }
        Ok(())
    }
}

/// Rolling debug buffer.
///
/// Lines read `[ <elapsed> s ] <message>`, or `[ <elapsed> s ] DEAD! - <message>`
/// once the balancer is dead. The buffer is shown when debugging is enabled, and
/// always once dead.
pub struct DebugLog {
    lines: Mutex<VecDeque<String>>,
    max_lines: usize,
    dead: AtomicBool,
}

impl DebugLog {
    pub const DISABLED_NOTICE: &'static str = "cfbalance: debugging disabled. Nothing to display.";

    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::new()),
            max_lines: max_lines.max(1),
            dead: AtomicBool::new(false),
        }
    }

    pub fn format_line(event: &TraceEvent) -> String {
        if event.dead {
            format!("[ {:.6} s ] DEAD! - {}", event.elapsed_secs, event.message)
        } else {
            format!("[ {:.6} s ] {}", event.elapsed_secs, event.message)
        }
    }

    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::Acquire)
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn render(&self, debug_enabled: bool) -> String {
        if debug_enabled || self.is_dead() {
            self.lines().join("\r\n")
        } else {
            Self::DISABLED_NOTICE.to_string()
        }
    }
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl TraceSink for DebugLog {
    async fn report(&self, event: TraceEvent) -> Result<()> {
        if event.dead {
            self.dead.store(true, Ordering::Release);
        }
        let line = Self::format_line(&event);
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.push_back(line);
        while lines.len() > self.max_lines {
            lines.pop_front();
        }
        Ok(())
    }
}

/// Forwards trace lines to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTraceSink;

#[async_trait]
impl TraceSink for LogTraceSink {
    async fn report(&self, event: TraceEvent) -> Result<()> {
        tracing::debug!(
            elapsed_secs = event.elapsed_secs,
            dead = event.dead,
            "{}",
            event.message
        );
        Ok(())
    }
}

/// Composite sink for multiple destinations.
pub struct CompositeTraceSink {
    sinks: Vec<Arc<dyn TraceSink>>,
}
impl CompositeTraceSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }
    pub fn add_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}
impl Default for CompositeTraceSink {
    fn default() -> Self {
        Self::new()
    }
}
#[async_trait]
impl TraceSink for CompositeTraceSink {
    async fn report(&self, event: TraceEvent) -> Result<()> {
        for s in &self.sinks {
            let _ = s.report(event.clone()).await;
        }
        Ok(())
    }
    async fn close(&self) -> Result<()> {
        for s in &self.sinks {
            let _ = s.close().await;
        }
        Ok(())
    }
}

/// Stamps messages with the time elapsed since the tracer was created.
#[derive(Clone)]
pub struct Tracer {
    started: Instant,
    sink: Arc<dyn TraceSink>,
    latch: Arc<FaultLatch>,
}

impl Tracer {
    pub fn new(sink: Arc<dyn TraceSink>, latch: Arc<FaultLatch>) -> Self {
        Self {
            started: Instant::now(),
            sink,
            latch,
        }
    }

    /// Sink failures are swallowed; tracing never changes a selection outcome.
    pub async fn emit(&self, message: impl Into<String>) {
        let event = TraceEvent {
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            message: message.into(),
            dead: self.latch.is_dead(),
        };
        let _ = self.sink.report(event).await;
    }
}

static GLOBAL_SINK: Lazy<RwLock<Arc<dyn TraceSink>>> =
    Lazy::new(|| RwLock::new(Arc::new(NoopTraceSink)));

/// Returns the globally configured trace sink.
pub fn get_trace_sink() -> Arc<dyn TraceSink> {
    GLOBAL_SINK
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Sets the global trace sink used by selectors built without an explicit one.
pub fn set_trace_sink(sink: Arc<dyn TraceSink>) {
    *GLOBAL_SINK.write().unwrap_or_else(PoisonError::into_inner) = sink;
}
