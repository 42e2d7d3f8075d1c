use crate::config::BalancerConfig;
use crate::protocol::RecordParser;
use crate::resilience::FaultLatch;
use crate::selector::Selector;
use crate::telemetry::{self, TraceSink, Tracer};
use crate::transport::{StatsSource, TcpStatsLink};
use crate::Result;
use std::sync::Arc;

/// Builder for creating selectors with custom collaborators.
///
/// Unset pieces fall back to the process-wide defaults: the global fault latch,
/// the global trace sink, and a TCP link to the configured daemon.
pub struct SelectorBuilder {
    config: BalancerConfig,
    source: Option<Arc<dyn StatsSource>>,
    latch: Option<Arc<FaultLatch>>,
    trace_sink: Option<Arc<dyn TraceSink>>,
}

impl SelectorBuilder {
    pub fn new() -> Self {
        Self {
            config: BalancerConfig::default(),
            source: None,
            latch: None,
            trace_sink: None,
        }
    }

    pub fn config(mut self, config: BalancerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the TCP link, e.g. with a scripted source in tests.
    pub fn stats_source(mut self, source: Arc<dyn StatsSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use a private latch instead of the process-wide one.
    pub fn fault_latch(mut self, latch: Arc<FaultLatch>) -> Self {
        self.latch = Some(latch);
        self
    }

    pub fn trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<Selector> {
        self.config.validate()?;

        let latch = self.latch.unwrap_or_else(FaultLatch::global);
        let source = match self.source {
            Some(source) => source,
            None => Arc::new(TcpStatsLink::new(&self.config, Arc::clone(&latch))),
        };
        let sink = self.trace_sink.unwrap_or_else(telemetry::get_trace_sink);

        Ok(Selector {
            source,
            parser: RecordParser::new(Arc::clone(&latch)),
            policy: self.config.policy,
            tracer: Tracer::new(sink, Arc::clone(&latch)),
            latch,
        })
    }
}

impl Default for SelectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
