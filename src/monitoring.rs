//! Monitor controller
//!
//! Owns the alert rules and the monitoring state, and runs evaluation cycles
//! on request. There is no timer: each cycle runs once per call to
//! [`MonitorController::tick`], and [`MonitorController::run`] leaves pacing
//! and cancellation to a [`CycleDriver`] supplied by the caller.

use crate::alerts::{AlertStore, EventLog};
use crate::collectors::MetricProvider;
use crate::error::{MonitorError, ValidationError};
use crate::events::{AlertKind, AlertRule, TriggeredAlert, UsageReport};
use crate::triggers::evaluate;
use log::{error, info, warn};

const MONITORING_STARTED_EVENT: &str = "monitoring_mode_started";
const MONITORING_STOPPED_EVENT: &str = "monitoring_mode_stopped";

/// Whether evaluation cycles are currently active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorState {
    #[default]
    Idle,
    Monitoring,
}

/// What the driver wants after a cycle has been reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleControl {
    /// Run another evaluation cycle
    Continue,
    /// Leave the loop but stay in monitoring mode
    Detach,
    /// End monitoring mode
    Cancel,
}

/// Paces a monitoring session and receives its alerts
pub trait CycleDriver {
    /// Called for every triggered alert, in evaluation order
    fn report(&mut self, alert: &TriggeredAlert);

    /// Block until the next cycle is wanted (or the session should end)
    fn next_cycle(&mut self) -> CycleControl;
}

/// Coordinates rule management, persistence, logging and evaluation
pub struct MonitorController<P: MetricProvider> {
    rules: Vec<AlertRule>,
    store: AlertStore,
    event_log: EventLog,
    provider: P,
    state: MonitorState,
}

impl<P: MetricProvider> MonitorController<P> {
    /// Create a controller, loading the persisted rules from `store`
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Store` if the rule file exists but cannot be
    /// read or parsed.
    pub fn new(store: AlertStore, event_log: EventLog, provider: P) -> Result<Self, MonitorError> {
        let rules = store.load()?;
        info!(
            "Monitor initialized with {} alert(s), logging to {}",
            rules.len(),
            event_log.path().display()
        );
        Ok(Self {
            rules,
            store,
            event_log,
            provider,
            state: MonitorState::Idle,
        })
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_monitoring(&self) -> bool {
        self.state == MonitorState::Monitoring
    }

    /// Rules in creation order
    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Add a rule, persist the list and log the addition
    ///
    /// Duplicates of existing rules are accepted.
    pub fn add_alert(
        &mut self,
        kind: AlertKind,
        threshold: u32,
    ) -> Result<AlertRule, MonitorError> {
        let rule = AlertRule::new(kind, threshold)?;
        if !rule.kind().is_recognized() {
            warn!(
                "Alert kind '{}' does not match any metric and will never trigger",
                rule.kind()
            );
        }

        let mut updated = self.rules.clone();
        updated.push(rule.clone());
        self.store.save(&updated)?;
        self.rules = updated;
        self.event_log.append(&format!(
            "{}_alarm_configured_{}_percent",
            rule.kind(),
            rule.threshold()
        ))?;

        info!("Added alert: {}", rule);
        Ok(rule)
    }

    /// Rules ordered by kind name
    ///
    /// The sort is stable, so rules of the same kind stay in creation order.
    pub fn list_alerts(&self) -> Vec<AlertRule> {
        self.sorted_indices()
            .into_iter()
            .map(|i| self.rules[i].clone())
            .collect()
    }

    /// Remove the rule at 1-based `position` of [`list_alerts`](Self::list_alerts)
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidSelection` without touching the rules
    /// if `position` is outside `1..=len`.
    pub fn remove_alert(&mut self, position: usize) -> Result<AlertRule, MonitorError> {
        let index = position
            .checked_sub(1)
            .and_then(|offset| self.sorted_indices().get(offset).copied())
            .ok_or_else(|| ValidationError::InvalidSelection(position.to_string()))?;

        let mut updated = self.rules.clone();
        let removed = updated.remove(index);
        self.store.save(&updated)?;
        self.rules = updated;
        self.event_log.append(&format!(
            "{}_alarm_removed_{}_percent",
            removed.kind(),
            removed.threshold()
        ))?;

        info!("Removed alert: {}", removed);
        Ok(removed)
    }

    /// Remove the rule picked by a user-typed position
    pub fn remove_alert_by_selection(&mut self, input: &str) -> Result<AlertRule, MonitorError> {
        let trimmed = input.trim();
        let position = if trimmed.chars().all(|c| c.is_ascii_digit()) {
            trimmed.parse::<usize>().ok()
        } else {
            None
        };

        match position {
            Some(position) => self.remove_alert(position),
            None => Err(ValidationError::InvalidSelection(trimmed.to_string()).into()),
        }
    }

    /// Enter monitoring mode
    ///
    /// Returns `false` without logging anything if already monitoring. The
    /// state only changes once the start event has been logged.
    pub fn start_monitoring(&mut self) -> Result<bool, MonitorError> {
        if self.is_monitoring() {
            return Ok(false);
        }
        self.event_log.append(MONITORING_STARTED_EVENT)?;
        self.state = MonitorState::Monitoring;
        info!("Monitoring started");
        Ok(true)
    }

    /// Leave monitoring mode
    ///
    /// Returns `false` without logging anything if not monitoring.
    pub fn stop_monitoring(&mut self) -> Result<bool, MonitorError> {
        if !self.is_monitoring() {
            return Ok(false);
        }
        self.event_log.append(MONITORING_STOPPED_EVENT)?;
        self.state = MonitorState::Idle;
        info!("Monitoring stopped");
        Ok(true)
    }

    /// Run one evaluation cycle
    ///
    /// While monitoring, samples the provider, evaluates every rule and logs
    /// each triggered alert without its decoration. The alerts are returned
    /// for display. While idle nothing is sampled and the result is empty.
    pub fn tick(&mut self) -> Result<Vec<TriggeredAlert>, MonitorError> {
        if !self.is_monitoring() {
            return Ok(Vec::new());
        }

        let sample = self.provider.sample()?;
        let alerts = evaluate(&sample, &self.rules);
        for alert in &alerts {
            warn!("{}", alert.log_text());
            self.event_log.append(alert.log_text())?;
        }
        Ok(alerts)
    }

    /// Run a monitoring session until the driver detaches or cancels
    ///
    /// Starts monitoring if needed, then alternates evaluation cycles with
    /// `driver.next_cycle()`. On cancellation the controller returns to idle.
    /// A failing cycle also returns the controller to idle before the error
    /// is propagated.
    pub fn run(&mut self, driver: &mut impl CycleDriver) -> Result<(), MonitorError> {
        self.start_monitoring()?;

        loop {
            let alerts = match self.tick() {
                Ok(alerts) => alerts,
                Err(e) => {
                    error!("Evaluation cycle failed: {}", e);
                    self.state = MonitorState::Idle;
                    // Best effort: the cycle error is the one worth reporting
                    if let Err(log_err) = self.event_log.append(MONITORING_STOPPED_EVENT) {
                        error!("Failed to log monitoring stop: {}", log_err);
                    }
                    return Err(e);
                }
            };

            for alert in &alerts {
                driver.report(alert);
            }

            match driver.next_cycle() {
                CycleControl::Continue => continue,
                CycleControl::Detach => {
                    info!("Left monitoring loop, monitoring remains active");
                    return Ok(());
                }
                CycleControl::Cancel => {
                    self.stop_monitoring()?;
                    return Ok(());
                }
            }
        }
    }

    /// Current resource usage, or `None` when not monitoring
    pub fn current_usage(&mut self) -> Result<Option<UsageReport>, MonitorError> {
        if !self.is_monitoring() {
            return Ok(None);
        }
        Ok(Some(UsageReport {
            cpu_percent: self.provider.cpu_percent()?,
            memory: self.provider.memory_usage()?,
            disk: self.provider.disk_usage()?,
        }))
    }

    fn sorted_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.rules.len()).collect();
        indices.sort_by(|&a, &b| {
            self.rules[a]
                .kind()
                .name()
                .cmp(self.rules[b].kind().name())
        });
        indices
    }
}
