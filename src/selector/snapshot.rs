use crate::protocol::NodeRecord;
use crate::scoring::{ScoredNode, ScoringPolicy};
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Where the next client request should be served.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "cname", rename_all = "snake_case")]
pub enum Target {
    /// Serve from this node; no redirect.
    Local,
    /// Redirect to the node with this cname.
    Remote(String),
}

impl Target {
    /// Sentinel returned to the redirect layer for [`Target::Local`].
    pub const LOCAL_SENTINEL: &'static str = "local";

    pub fn as_str(&self) -> &str {
        match self {
            Target::Local => Self::LOCAL_SENTINEL,
            Target::Remote(cname) => cname,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Target::Local)
    }

    /// Scheme-relative redirect location for `postfix`, or `None` when serving locally.
    pub fn location(&self, postfix: &str) -> Option<String> {
        match self {
            Target::Local => None,
            Target::Remote(cname) => Some(format!(
                "//{}/{}",
                cname,
                postfix.trim_start_matches('/')
            )),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All scored nodes from one request cycle. Built fresh per call, never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSnapshot {
    /// Remote candidates, freshest first.
    pub remotes: Vec<ScoredNode>,
    pub local: Option<ScoredNode>,
}

impl PoolSnapshot {
    /// Partition, order by freshness, and score.
    ///
    /// The freshness sort is stable, so equally fresh records keep wire order.
    /// Duplicate cnames are kept as independent candidates.
    pub fn from_records(records: Vec<NodeRecord>, policy: &ScoringPolicy) -> Self {
        let mut remotes = Vec::with_capacity(records.len());
        let mut local = None;

        for record in records {
            if record.is_local() {
                local = Some(policy.score(record));
            } else {
                remotes.push(policy.score(record));
            }
        }

        remotes.sort_by(|a, b| a.stats().expire_age.total_cmp(&b.stats().expire_age));

        Self { remotes, local }
    }

    /// Minimum-cost remote. Ties go to the fresher (earlier) entry.
    pub fn best_remote(&self) -> Option<&ScoredNode> {
        let mut best: Option<&ScoredNode> = None;
        for node in &self.remotes {
            match best {
                Some(b) if node.cost >= b.cost => {}
                _ => best = Some(node),
            }
        }
        best
    }

    /// Pick the winner.
    ///
    /// The local node is preferred over the best remote when its cost exceeds the
    /// best remote's by no more than the policy's margin adjustment, or when its
    /// CPU and net loads are both within the policy margins of the best remote's.
    pub fn decide(&self, policy: &ScoringPolicy) -> Result<Target> {
        let best = self.best_remote().ok_or(Error::NoCandidates)?;

        if let Some(local) = &self.local {
            if policy.prefers_local(local, best) {
                return Ok(Target::Local);
            }
        }

        Ok(Target::Remote(best.cname().to_string()))
    }
}
