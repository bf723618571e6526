/// Error types for the resource monitor
pub mod error;

/// Alert rules, metric samples and triggered alerts
pub mod events;

/// Metric providers for CPU, memory and disk usage
pub mod collectors;

/// Rule evaluation against metric samples
pub mod triggers;

/// Alert persistence and the session event log
pub mod alerts;

/// Configuration management
pub mod config;

/// Monitor controller and its state machine
pub mod monitoring;

// Re-export commonly used types
pub use error::{
    CollectorError, ConfigError, EventLogError, MonitorError, StoreError, ValidationError,
};
pub use monitoring::{CycleControl, CycleDriver, MonitorController, MonitorState};
