/// Alert rule persistence and the session event log
pub mod alert_store;
pub mod event_log;

pub use alert_store::AlertStore;
pub use event_log::EventLog;
