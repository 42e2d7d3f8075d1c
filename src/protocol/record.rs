//! Node records as reported by the statistics daemon

use serde::{Deserialize, Serialize};

/// Utilization figures one pool member reported at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    /// Seconds since the daemon last heard from this node. Lower is fresher.
    pub expire_age: f64,
    /// Publicly addressable hostname of the node.
    pub cname: String,
    /// CPU utilization, percent.
    pub cpu_load: f64,
    /// Outgoing bandwidth utilization, percent.
    pub net_load: f64,
}

impl NodeStats {
    pub fn new(expire_age: f64, cname: impl Into<String>, cpu_load: f64, net_load: f64) -> Self {
        Self {
            expire_age,
            cname: cname.into(),
            cpu_load,
            net_load,
        }
    }
}

/// One parsed line of the node list, tagged by where the node runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeRecord {
    /// Another member of the pool; a redirect candidate.
    Remote(NodeStats),
    /// The node running this client.
    Local(NodeStats),
}

impl NodeRecord {
    pub fn remote(expire_age: f64, cname: impl Into<String>, cpu_load: f64, net_load: f64) -> Self {
        NodeRecord::Remote(NodeStats::new(expire_age, cname, cpu_load, net_load))
    }

    pub fn local(expire_age: f64, cname: impl Into<String>, cpu_load: f64, net_load: f64) -> Self {
        NodeRecord::Local(NodeStats::new(expire_age, cname, cpu_load, net_load))
    }

    pub fn stats(&self) -> &NodeStats {
        match self {
            NodeRecord::Remote(s) | NodeRecord::Local(s) => s,
        }
    }

    pub fn into_stats(self) -> NodeStats {
        match self {
            NodeRecord::Remote(s) | NodeRecord::Local(s) => s,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, NodeRecord::Local(_))
    }

    pub fn cname(&self) -> &str {
        &self.stats().cname
    }
}
