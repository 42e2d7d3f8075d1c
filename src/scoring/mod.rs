//! # Availability Scoring
//!
//! Converts a node's CPU and network utilization into a single comparable cost.
//! Lower cost means a more available, more attractive redirect target.
//!
//! ```rust
//! use cfbalance::protocol::NodeStats;
//! use cfbalance::scoring::ScoringPolicy;
//!
//! let policy = ScoringPolicy::default();
//! let idle = NodeStats::new(0.0, "a.example.org", 10.0, 5.0);
//! let busy = NodeStats::new(0.0, "b.example.org", 90.0, 90.0);
//! assert!(policy.cost(&idle) < policy.cost(&busy));
//! ```
//!
//! Costs may be negative for lightly loaded nodes. Only relative order matters.

use crate::error::ErrorContext;
use crate::protocol::{NodeRecord, NodeStats};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Weights and thresholds of the scoring algorithm. Fixed for the lifetime of a selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// CPU percent at or above which the heavy CPU weight applies.
    pub high_cpu_threshold: f64,
    /// Net percent above which the low-net discount is withheld.
    pub high_net_threshold: f64,
    pub cpu_weight: f64,
    pub cpu_weight_high: f64,
    pub net_weight: f64,
    pub low_net_discount: f64,
    pub net_below_cpu_discount: f64,
    /// Tolerance when comparing local and remote CPU load.
    pub cpu_margin: f64,
    /// Tolerance when comparing local and remote net load.
    pub net_margin: f64,
    /// Extra cost the local node may carry over the best remote and still win.
    pub margin_adjustment: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            high_cpu_threshold: 75.0,
            high_net_threshold: 65.0,
            cpu_weight: 2.0,
            cpu_weight_high: 4.0,
            net_weight: 4.0,
            low_net_discount: 10.0,
            net_below_cpu_discount: 10.0,
            cpu_margin: 2.0,
            net_margin: 10.0,
            margin_adjustment: 0.0,
        }
    }
}

impl ScoringPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(mut self, high_cpu: f64, high_net: f64) -> Self {
        self.high_cpu_threshold = high_cpu;
        self.high_net_threshold = high_net;
        self
    }

    pub fn with_weights(mut self, cpu: f64, cpu_high: f64, net: f64) -> Self {
        self.cpu_weight = cpu;
        self.cpu_weight_high = cpu_high;
        self.net_weight = net;
        self
    }

    pub fn with_discounts(mut self, low_net: f64, net_below_cpu: f64) -> Self {
        self.low_net_discount = low_net;
        self.net_below_cpu_discount = net_below_cpu;
        self
    }

    pub fn with_margins(mut self, cpu: f64, net: f64) -> Self {
        self.cpu_margin = cpu;
        self.net_margin = net;
        self
    }

    pub fn with_margin_adjustment(mut self, adjustment: f64) -> Self {
        self.margin_adjustment = adjustment;
        self
    }

    /// Rejects negative or non-finite constants.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("high_cpu_threshold", self.high_cpu_threshold),
            ("high_net_threshold", self.high_net_threshold),
            ("cpu_weight", self.cpu_weight),
            ("cpu_weight_high", self.cpu_weight_high),
            ("net_weight", self.net_weight),
            ("low_net_discount", self.low_net_discount),
            ("net_below_cpu_discount", self.net_below_cpu_discount),
            ("cpu_margin", self.cpu_margin),
            ("net_margin", self.net_margin),
            ("margin_adjustment", self.margin_adjustment),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::configuration_with_context(
                    "scoring constants must be finite and non-negative",
                    ErrorContext::new()
                        .with_field_path(format!("policy.{}", name))
                        .with_details(value.to_string())
                        .with_source("scoring_policy"),
                ));
            }
        }
        Ok(())
    }

    /// Availability cost of one node. Pure and total over finite input.
    pub fn cost(&self, stats: &NodeStats) -> f64 {
        let cpu_multiplier = if stats.cpu_load >= self.high_cpu_threshold {
            self.cpu_weight_high
        } else {
            self.cpu_weight
        };

        let mut discount = 0.0;
        if stats.net_load <= self.high_net_threshold {
            discount += self.low_net_discount;
        }
        if stats.net_load <= stats.cpu_load {
            discount += self.net_below_cpu_discount;
        }

        stats.cpu_load * cpu_multiplier + stats.net_load * self.net_weight - discount
    }

    pub fn score(&self, record: NodeRecord) -> ScoredNode {
        let cost = self.cost(record.stats());
        ScoredNode { record, cost }
    }

    /// Whether the local node is cheap enough to keep the request against `best`.
    ///
    /// True when its cost is within `margin_adjustment` of the best remote's, or
    /// when both loads are within the margins.
    pub fn prefers_local(&self, local: &ScoredNode, best: &ScoredNode) -> bool {
        local.cost <= best.cost + self.margin_adjustment
            || self.is_close(local.stats(), best.stats())
    }

    /// Whether two nodes' loads are within both margins of each other.
    pub fn is_close(&self, a: &NodeStats, b: &NodeStats) -> bool {
        (a.cpu_load - b.cpu_load).abs() <= self.cpu_margin
            && (a.net_load - b.net_load).abs() <= self.net_margin
    }
}

/// A record paired with its cost. Recomputed on every selection, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredNode {
    pub record: NodeRecord,
    pub cost: f64,
}

impl ScoredNode {
    pub fn stats(&self) -> &NodeStats {
        self.record.stats()
    }

    pub fn cname(&self) -> &str {
        self.record.cname()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(cpu: f64, net: f64) -> NodeStats {
        NodeStats::new(0.0, "n.example.org", cpu, net)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_policy_defaults() {
        let p = ScoringPolicy::default();
        assert_eq!(p.high_cpu_threshold, 75.0);
        assert_eq!(p.high_net_threshold, 65.0);
        assert_eq!(p.cpu_weight, 2.0);
        assert_eq!(p.cpu_weight_high, 4.0);
        assert_eq!(p.net_weight, 4.0);
        assert_eq!(p.low_net_discount, 10.0);
        assert_eq!(p.net_below_cpu_discount, 10.0);
        assert_eq!(p.cpu_margin, 2.0);
        assert_eq!(p.net_margin, 10.0);
        assert_eq!(p.margin_adjustment, 0.0);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_cpu_threshold_is_inclusive_on_high_side() {
        let p = ScoringPolicy::default();
        // both discounts apply when net is 0
        assert_close(p.cost(&node(74.9, 0.0)), 74.9 * 2.0 - 20.0);
        assert_close(p.cost(&node(75.0, 0.0)), 75.0 * 4.0 - 20.0);
    }

    #[test]
    fn test_low_net_discount_boundary() {
        let p = ScoringPolicy::default();
        // net above cpu, so only the low-net discount is in play
        assert_close(p.cost(&node(10.0, 65.0)), 20.0 + 260.0 - 10.0);
        assert_close(p.cost(&node(10.0, 65.5)), 20.0 + 262.0);
    }

    #[test]
    fn test_cost_can_be_negative() {
        let p = ScoringPolicy::default();
        assert!(p.cost(&node(1.0, 0.5)) < 0.0);
    }

    #[test]
    fn test_cost_monotonic_in_net_load() {
        let p = ScoringPolicy::default();
        for cpu in [0.0, 10.0, 50.0, 74.9, 75.0, 100.0] {
            let mut prev = f64::NEG_INFINITY;
            for step in 0..=1000 {
                let net = step as f64 * 0.1;
                let c = p.cost(&node(cpu, net));
                assert!(c >= prev, "cpu={} net={} cost {} < {}", cpu, net, c, prev);
                prev = c;
            }
        }
    }

    #[test]
    fn test_cost_monotonic_in_cpu_load_on_each_side_of_net() {
        let p = ScoringPolicy::default();
        for net in [0.0, 20.0, 64.0, 80.0] {
            let mut below = f64::NEG_INFINITY;
            let mut above = f64::NEG_INFINITY;
            for step in 0..=1000 {
                let cpu = step as f64 * 0.1;
                let c = p.cost(&node(cpu, net));
                if cpu < net {
                    assert!(c >= below, "cpu={} net={}", cpu, net);
                    below = c;
                } else {
                    assert!(c >= above, "cpu={} net={}", cpu, net);
                    above = c;
                }
            }
        }
    }

    #[test]
    fn test_is_close_requires_both_margins() {
        let p = ScoringPolicy::default();
        let best = node(10.0, 5.0);
        assert!(p.is_close(&node(12.0, 6.0), &best));
        assert!(p.is_close(&node(8.0, 15.0), &best));
        assert!(!p.is_close(&node(12.1, 6.0), &best));
        assert!(!p.is_close(&node(12.0, 15.1), &best));
    }

    #[test]
    fn test_margin_adjustment_lets_pricier_local_win() {
        let best = ScoringPolicy::default().score(NodeRecord::remote(0.0, "a", 10.0, 5.0));
        // cpu outside the 2.0 margin, cost 8 above the remote
        let local = ScoringPolicy::default().score(NodeRecord::local(0.0, "me", 14.0, 5.0));
        assert_close(local.cost - best.cost, 8.0);

        assert!(!ScoringPolicy::default().prefers_local(&local, &best));
        assert!(ScoringPolicy::new()
            .with_margin_adjustment(8.0)
            .prefers_local(&local, &best));
        assert!(!ScoringPolicy::new()
            .with_margin_adjustment(7.9)
            .prefers_local(&local, &best));
    }

    #[test]
    fn test_validate_rejects_bad_constants() {
        let p = ScoringPolicy::new().with_margins(-1.0, 10.0);
        let err = p.validate().unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("policy.cpu_margin")
        );
        assert!(ScoringPolicy::new()
            .with_weights(f64::NAN, 4.0, 4.0)
            .validate()
            .is_err());
        let err = ScoringPolicy::new()
            .with_margin_adjustment(f64::INFINITY)
            .validate()
            .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("policy.margin_adjustment")
        );
    }

    #[test]
    fn test_score_keeps_record() {
        let p = ScoringPolicy::default();
        let scored = p.score(NodeRecord::remote(1.0, "a", 10.0, 5.0));
        assert_eq!(scored.cname(), "a");
        assert_close(scored.cost, 20.0 + 20.0 - 20.0);
    }
}
