//! Core data types for the resource monitor
//!
//! This module defines the alert rules persisted between runs, the metric
//! samples they are evaluated against, and the alerts produced when a rule
//! fires.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest accepted alert threshold, in percent
pub const MIN_THRESHOLD: u8 = 1;
/// Highest accepted alert threshold, in percent
pub const MAX_THRESHOLD: u8 = 100;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Which resource an alert rule watches
///
/// Kinds are stored as plain strings. Text that does not name a known
/// resource is kept as `Unrecognized` so it survives a load/save cycle,
/// but such a rule never fires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertKind {
    /// Overall CPU utilization
    Cpu,
    /// Physical memory utilization
    Memory,
    /// Utilization of the monitored mount point
    Disk,
    /// Any other name given at creation time
    Unrecognized(String),
}

impl AlertKind {
    /// Canonical display name, also used for ordering alert listings
    pub fn name(&self) -> &str {
        match self {
            AlertKind::Cpu => "CPU",
            AlertKind::Memory => "Memory",
            AlertKind::Disk => "Disk",
            AlertKind::Unrecognized(name) => name,
        }
    }

    /// Whether this kind maps to a sampled metric
    pub fn is_recognized(&self) -> bool {
        !matches!(self, AlertKind::Unrecognized(_))
    }
}

impl From<&str> for AlertKind {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "cpu" => AlertKind::Cpu,
            // "Minnes" is the memory kind name written by older rule files
            "memory" | "minnes" => AlertKind::Memory,
            "disk" => AlertKind::Disk,
            _ => AlertKind::Unrecognized(trimmed.to_string()),
        }
    }
}

impl From<String> for AlertKind {
    fn from(value: String) -> Self {
        AlertKind::from(value.as_str())
    }
}

impl From<AlertKind> for String {
    fn from(kind: AlertKind) -> Self {
        match kind {
            AlertKind::Unrecognized(name) => name,
            known => known.name().to_string(),
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A persisted threshold rule
///
/// Rules have no identity of their own; they are addressed by position in
/// the controller's rule list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAlertRule")]
pub struct AlertRule {
    #[serde(rename = "alert_type")]
    kind: AlertKind,
    threshold: u8,
}

/// Unvalidated on-disk shape of an alert rule
#[derive(Deserialize)]
struct RawAlertRule {
    alert_type: AlertKind,
    threshold: i64,
}

impl TryFrom<RawAlertRule> for AlertRule {
    type Error = ValidationError;

    fn try_from(raw: RawAlertRule) -> Result<Self, Self::Error> {
        let threshold = u32::try_from(raw.threshold)
            .map_err(|_| ValidationError::InvalidThreshold(raw.threshold.to_string()))?;
        AlertRule::new(raw.alert_type, threshold)
    }
}

impl AlertRule {
    /// Create a rule, rejecting thresholds outside 1..=100
    ///
    /// The kind is reduced to the form it takes after a save and reload, so
    /// `Unrecognized("cpu")` becomes `Cpu` and surrounding whitespace is
    /// dropped from unknown names.
    pub fn new(kind: AlertKind, threshold: u32) -> Result<Self, ValidationError> {
        if !(MIN_THRESHOLD as u32..=MAX_THRESHOLD as u32).contains(&threshold) {
            return Err(ValidationError::InvalidThreshold(threshold.to_string()));
        }
        Ok(Self {
            kind: AlertKind::from(kind.name()),
            threshold: threshold as u8,
        })
    }

    pub fn kind(&self) -> &AlertKind {
        &self.kind
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }
}

impl fmt::Display for AlertRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} alarm {}%", self.kind, self.threshold)
    }
}

/// Parse a threshold typed by the user
///
/// Only plain digits are accepted (no sign, no decimals), and the value must
/// lie within 1..=100.
pub fn parse_threshold(input: &str) -> Result<u32, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidThreshold(trimmed.to_string()));
    }
    let value: u32 = trimmed
        .parse()
        .map_err(|_| ValidationError::InvalidThreshold(trimmed.to_string()))?;
    if !(MIN_THRESHOLD as u32..=MAX_THRESHOLD as u32).contains(&value) {
        return Err(ValidationError::InvalidThreshold(trimmed.to_string()));
    }
    Ok(value)
}

/// Point-in-time utilization reading, in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

impl MetricSample {
    /// The sampled value a rule of this kind is compared against
    pub fn value_for(&self, kind: &AlertKind) -> Option<f64> {
        match kind {
            AlertKind::Cpu => Some(self.cpu_percent),
            AlertKind::Memory => Some(self.memory_percent),
            AlertKind::Disk => Some(self.disk_percent),
            AlertKind::Unrecognized(_) => None,
        }
    }
}

/// Usage of a sized resource (memory or a filesystem)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceUsage {
    pub percent: f64,
    pub used_bytes: u64,
    pub total_bytes: u64,
}

impl ResourceUsage {
    /// Build a usage record, deriving the percentage from the byte counts
    pub fn from_bytes(used_bytes: u64, total_bytes: u64) -> Self {
        let percent = if total_bytes > 0 {
            used_bytes as f64 / total_bytes as f64 * 100.0
        } else {
            0.0
        };
        Self {
            percent,
            used_bytes,
            total_bytes,
        }
    }

    pub fn used_gib(&self) -> f64 {
        self.used_bytes as f64 / BYTES_PER_GIB
    }

    pub fn total_gib(&self) -> f64 {
        self.total_bytes as f64 / BYTES_PER_GIB
    }
}

/// Full live-usage view shown while monitoring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageReport {
    pub cpu_percent: f64,
    pub memory: ResourceUsage,
    pub disk: ResourceUsage,
}

/// An alert produced by one evaluation cycle
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredAlert {
    pub kind: AlertKind,
    pub threshold: u8,
    /// Console text, including its decoration
    pub message: String,
}

impl TriggeredAlert {
    const DECORATION: char = '*';

    pub fn new(kind: AlertKind, threshold: u8) -> Self {
        let message = format!(
            "***WARNING, ALERT TRIGGERED, {} USAGE EXCEEDS {}%***",
            kind.name().to_uppercase(),
            threshold
        );
        Self {
            kind,
            threshold,
            message,
        }
    }

    /// The message with its decoration stripped, as written to the event log
    pub fn log_text(&self) -> &str {
        self.message.trim_matches(Self::DECORATION).trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_kind_parsing() {
        assert_eq!(AlertKind::from("CPU"), AlertKind::Cpu);
        assert_eq!(AlertKind::from("cpu"), AlertKind::Cpu);
        assert_eq!(AlertKind::from(" Memory "), AlertKind::Memory);
        assert_eq!(AlertKind::from("Minnes"), AlertKind::Memory);
        assert_eq!(AlertKind::from("DISK"), AlertKind::Disk);
        assert_eq!(
            AlertKind::from("Swap"),
            AlertKind::Unrecognized("Swap".to_string())
        );
    }

    #[test]
    fn test_alert_kind_serialization() {
        assert_eq!(serde_json::to_string(&AlertKind::Cpu).unwrap(), "\"CPU\"");
        assert_eq!(
            serde_json::to_string(&AlertKind::Memory).unwrap(),
            "\"Memory\""
        );
        assert_eq!(
            serde_json::to_string(&AlertKind::Unrecognized("GPU".to_string())).unwrap(),
            "\"GPU\""
        );
    }

    #[test]
    fn test_alert_rule_threshold_bounds() {
        assert!(AlertRule::new(AlertKind::Cpu, 0).is_err());
        assert!(AlertRule::new(AlertKind::Cpu, 1).is_ok());
        assert!(AlertRule::new(AlertKind::Cpu, 100).is_ok());
        assert_eq!(
            AlertRule::new(AlertKind::Cpu, 101),
            Err(ValidationError::InvalidThreshold("101".to_string()))
        );
    }

    #[test]
    fn test_alert_rule_json_shape() {
        let rule = AlertRule::new(AlertKind::Disk, 50).unwrap();
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(json, r#"{"alert_type":"Disk","threshold":50}"#);
    }

    #[test]
    fn test_alert_rule_rejects_out_of_range_on_deserialize() {
        let result: Result<AlertRule, _> =
            serde_json::from_str(r#"{"alert_type":"CPU","threshold":150}"#);
        assert!(result.is_err());

        let result: Result<AlertRule, _> =
            serde_json::from_str(r#"{"alert_type":"CPU","threshold":-5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_alert_rule_normalizes_kind() {
        let kind = AlertKind::Unrecognized("cpu".to_string());
        let rule = AlertRule::new(kind, 50).unwrap();
        assert_eq!(rule.kind(), &AlertKind::Cpu);

        let kind = AlertKind::Unrecognized(" GPU ".to_string());
        let rule = AlertRule::new(kind, 10).unwrap();
        assert_eq!(rule.kind(), &AlertKind::Unrecognized("GPU".to_string()));

        let json = serde_json::to_string(&rule).unwrap();
        let reloaded: AlertRule = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, rule);
    }

    #[test]
    fn test_alert_rule_display() {
        let rule = AlertRule::new(AlertKind::Memory, 90).unwrap();
        assert_eq!(rule.to_string(), "Memory alarm 90%");
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("80"), Ok(80));
        assert_eq!(parse_threshold(" 100\n"), Ok(100));
        assert!(parse_threshold("0").is_err());
        assert!(parse_threshold("101").is_err());
        assert!(parse_threshold("+5").is_err());
        assert!(parse_threshold("-5").is_err());
        assert!(parse_threshold("4.5").is_err());
        assert!(parse_threshold("").is_err());
        assert!(parse_threshold("abc").is_err());
        assert!(parse_threshold("99999999999999999999").is_err());
    }

    #[test]
    fn test_sample_value_for_kind() {
        let sample = MetricSample {
            cpu_percent: 1.0,
            memory_percent: 2.0,
            disk_percent: 3.0,
        };
        assert_eq!(sample.value_for(&AlertKind::Cpu), Some(1.0));
        assert_eq!(sample.value_for(&AlertKind::Memory), Some(2.0));
        assert_eq!(sample.value_for(&AlertKind::Disk), Some(3.0));
        assert_eq!(
            sample.value_for(&AlertKind::Unrecognized("x".to_string())),
            None
        );
    }

    #[test]
    fn test_resource_usage_from_bytes() {
        let usage = ResourceUsage::from_bytes(512, 2048);
        assert_eq!(usage.percent, 25.0);

        let empty = ResourceUsage::from_bytes(0, 0);
        assert_eq!(empty.percent, 0.0);

        let gib = ResourceUsage::from_bytes(1 << 30, 4 << 30);
        assert_eq!(gib.used_gib(), 1.0);
        assert_eq!(gib.total_gib(), 4.0);
    }

    #[test]
    fn test_triggered_alert_log_text_strips_decoration() {
        let alert = TriggeredAlert::new(AlertKind::Cpu, 80);
        assert_eq!(
            alert.message,
            "***WARNING, ALERT TRIGGERED, CPU USAGE EXCEEDS 80%***"
        );
        assert_eq!(
            alert.log_text(),
            "WARNING, ALERT TRIGGERED, CPU USAGE EXCEEDS 80%"
        );
        assert!(!alert.log_text().contains('*'));
    }
}
