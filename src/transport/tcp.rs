use crate::config::BalancerConfig;
use crate::protocol::LIST_COMMAND;
use crate::resilience::FaultLatch;
use crate::transport::StatsSource;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const READ_CHUNK: usize = 128;

/// Request/response link to the statistics daemon over TCP.
///
/// Each fetch opens its own connection, sends the list command, and reads until
/// the daemon closes the stream. The connection is dropped on every exit path.
/// Connection and timeout failures trip the fault latch.
///
/// # Example
///
/// ```no_run
/// use cfbalance::config::BalancerConfig;
/// use cfbalance::resilience::FaultLatch;
/// use cfbalance::transport::{StatsSource, TcpStatsLink};
///
/// # async fn run() -> cfbalance::Result<()> {
/// let link = TcpStatsLink::new(&BalancerConfig::default(), FaultLatch::global());
/// let raw = link.fetch_raw().await?;
/// println!("{} bytes", raw.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TcpStatsLink {
    addr: String,
    timeout: Duration,
    latch: Arc<FaultLatch>,
}

impl TcpStatsLink {
    pub fn new(config: &BalancerConfig, latch: Arc<FaultLatch>) -> Self {
        Self {
            addr: config.addr(),
            timeout: config.timeout,
            latch,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the node list, giving up at `deadline`.
    ///
    /// Connecting, sending, and reading all count against the same deadline.
    pub async fn fetch_raw_until(&self, deadline: Instant) -> Result<Bytes> {
        let budget = deadline.saturating_duration_since(Instant::now());
        self.fetch_with_budget(deadline, budget).await
    }

    async fn fetch_with_budget(&self, deadline: Instant, budget: Duration) -> Result<Bytes> {
        let result = self.exchange(deadline, budget).await;
        if let Err(ref e) = result {
            if e.latches() {
                self.latch.trip(e.to_string());
            }
        }
        result
    }

    /// `budget` is only reported in [`Error::Timeout`]; `deadline` bounds the exchange.
    async fn exchange(&self, deadline: Instant, budget: Duration) -> Result<Bytes> {
        let deadline = tokio::time::Instant::from_std(deadline);

        let connect = TcpStream::connect(self.addr.as_str());
        let mut stream = match tokio::time::timeout_at(deadline, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(self.connection_error(e.to_string())),
            Err(_) => return Err(self.connection_error("connect timed out")),
        };
        tracing::debug!(addr = %self.addr, "connected to statistics daemon");

        let io = async {
            stream.write_all(LIST_COMMAND).await?;
            stream.flush().await?;

            let mut buf = BytesMut::with_capacity(READ_CHUNK);
            loop {
                buf.reserve(READ_CHUNK);
                if stream.read_buf(&mut buf).await? == 0 {
                    break;
                }
            }
            Ok::<_, std::io::Error>(buf.freeze())
        };

        match tokio::time::timeout_at(deadline, io).await {
            Ok(Ok(raw)) => {
                tracing::debug!(addr = %self.addr, bytes = raw.len(), "received node list");
                Ok(raw)
            }
            Ok(Err(e)) => Err(self.connection_error(e.to_string())),
            Err(_) => Err(Error::Timeout {
                addr: self.addr.clone(),
                timeout_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    fn connection_error(&self, message: impl Into<String>) -> Error {
        Error::Connection {
            addr: self.addr.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl StatsSource for TcpStatsLink {
    async fn fetch_raw(&self) -> Result<Bytes> {
        self.fetch_with_budget(Instant::now() + self.timeout, self.timeout).await
    }
}
