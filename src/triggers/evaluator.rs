//! Alert evaluation
//!
//! Compares one metric sample against the configured rules and produces the
//! alerts to report, highest threshold first.

use crate::events::{AlertRule, MetricSample, TriggeredAlert};
use std::cmp::Reverse;

/// Whether `rule` fires for `sample`
///
/// A rule fires when the sampled value for its kind is strictly greater
/// than its threshold. Unrecognized kinds never fire.
pub fn is_triggered(rule: &AlertRule, sample: &MetricSample) -> bool {
    sample
        .value_for(rule.kind())
        .is_some_and(|value| value > f64::from(rule.threshold()))
}

/// Evaluate `rules` against `sample`
///
/// Triggered alerts are ordered by descending threshold. Rules with equal
/// thresholds keep their order from `rules`.
pub fn evaluate(sample: &MetricSample, rules: &[AlertRule]) -> Vec<TriggeredAlert> {
    let mut triggered: Vec<&AlertRule> = rules
        .iter()
        .filter(|rule| is_triggered(rule, sample))
        .collect();
    triggered.sort_by_key(|rule| Reverse(rule.threshold()));

    triggered
        .into_iter()
        .map(|rule| TriggeredAlert::new(rule.kind().clone(), rule.threshold()))
        .collect()
}
