use thiserror::Error;

/// User input that was rejected before any state changed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid threshold: {0} (expected a whole number between 1 and 100)")]
    InvalidThreshold(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
}

/// Errors that can occur in metric collectors
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Mount point not found: {0}")]
    MountPointNotFound(String),

    #[error("Metric unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur while loading or saving alert rules
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to parse alert file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when writing to the session event log
#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("Failed to write event log {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Errors surfaced by the monitor controller
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Alert store error: {0}")]
    Store(#[from] StoreError),

    #[error("Event log error: {0}")]
    EventLog(#[from] EventLogError),

    #[error("Collector error: {0}")]
    Collector(#[from] CollectorError),
}

impl MonitorError {
    /// Whether this error is a rejected user input rather than an I/O failure
    pub fn is_validation(&self) -> bool {
        matches!(self, MonitorError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_flagged() {
        let err: MonitorError = ValidationError::InvalidSelection("7".to_string()).into();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Invalid selection: 7");
    }

    #[test]
    fn test_io_errors_are_not_validation() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MonitorError = StoreError::from(io).into();
        assert!(!err.is_validation());
        assert!(err.to_string().contains("denied"));
    }
}
