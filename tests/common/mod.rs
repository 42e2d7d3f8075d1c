//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use cfbalance::transport::StatsSource;
use cfbalance::{Error, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One scripted daemon response.
#[derive(Debug, Clone)]
pub enum Step {
    Payload(&'static str),
    Timeout,
    Refused,
}

/// Stats source that replays steps in order and counts fetches.
///
/// The last step repeats once the script runs out.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsSource for ScriptedSource {
    async fn fetch_raw(&self) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front().unwrap()
            } else {
                steps.front().cloned().expect("script must not be empty")
            }
        };
        match step {
            Step::Payload(raw) => Ok(Bytes::from_static(raw.as_bytes())),
            Step::Timeout => Err(Error::Timeout {
                addr: "scripted:44444".into(),
                timeout_ms: 1000,
            }),
            Step::Refused => Err(Error::Connection {
                addr: "scripted:44444".into(),
                message: "connection refused".into(),
            }),
        }
    }
}

pub const TWO_REMOTES: &str = "0,a,10,5\r\n0,b,90,90\r\n";
pub const TWO_REMOTES_AND_CLOSE_LOCAL: &str = "0,me,12,6,*\r\n0,a,10,5\r\n0,b,90,90\r\n";
