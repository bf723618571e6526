use anyhow::Context;
use chrono::Local;
use clap::Parser;
use log::{error, info, warn};
use resmon::alerts::{AlertStore, EventLog};
use resmon::collectors::{MetricProvider, SystemMetricsProvider};
use resmon::config::Config;
use resmon::error::ConfigError;
use resmon::events::{parse_threshold, AlertKind, TriggeredAlert};
use resmon::{CycleControl, CycleDriver, MonitorController, MonitorError};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Command-line arguments for the resource monitor
#[derive(Parser)]
#[command(
    name = "resmon",
    about = "Resource monitor - threshold alerts for CPU, memory and disk usage",
    long_about = "Samples CPU, memory and disk utilization on this host, compares the readings \
                  against persisted alert thresholds and reports every exceeded threshold on \
                  the console and in a session log."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Override the alert rule file
    #[arg(long, value_name = "FILE")]
    alerts_file: Option<PathBuf>,

    /// Override the session log directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        if let Some(ref alerts_file) = self.alerts_file {
            if alerts_file.is_dir() {
                return Err(format!(
                    "Alert file path is a directory: {}",
                    alerts_file.display()
                ));
            }
        }

        Ok(())
    }

    /// Apply command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(ref alerts_file) = self.alerts_file {
            config.alerts_file = alerts_file.clone();
        }
        if let Some(ref log_dir) = self.log_dir {
            config.log_dir = log_dir.clone();
        }
        config
    }
}

/// Load configuration from file or use defaults
fn load_config(config_path: Option<&Path>) -> Config {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            match Config::from_file(path) {
                Ok(config) => config,
                Err(ConfigError::ReadError(_)) => {
                    warn!(
                        "Configuration file '{}' not found or unreadable, using defaults",
                        path.display()
                    );
                    Config::default()
                }
                Err(e) => {
                    error!("Configuration error in '{}': {}", path.display(), e);
                    warn!("Using default configuration due to invalid config file");
                    Config::default()
                }
            }
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    }
}

/// Ctrl+C state shared with the signal handler
///
/// Inside a monitoring session an interrupt only requests cancellation,
/// which the session observes before its next cycle. Anywhere else it ends
/// the process.
#[derive(Default)]
struct InterruptState {
    in_session: AtomicBool,
    cancel_requested: AtomicBool,
}

impl InterruptState {
    fn handle_interrupt(&self) -> bool {
        if self.in_session.load(Ordering::SeqCst) {
            self.cancel_requested.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    fn take_cancel(&self) -> bool {
        self.cancel_requested.swap(false, Ordering::SeqCst)
    }
}

/// Shown before every wait inside a monitoring session
const SESSION_PROMPT: &str = "Monitoring is active. Press Enter to check again, 'm' to return \
                              to the menu, 'q' to stop monitoring (Ctrl+C stops it after the \
                              next Enter).";

/// Printed by the signal handler when Ctrl+C lands inside a session
const INTERRUPT_NOTICE: &str = "Interrupt received, press Enter to stop monitoring.";

/// Read one line; `None` at end of input
fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Console side of a monitoring session
struct ConsoleDriver<'a, R: BufRead, W: Write> {
    input: &'a mut R,
    output: &'a mut W,
    interrupts: &'a InterruptState,
}

impl<R: BufRead, W: Write> CycleDriver for ConsoleDriver<'_, R, W> {
    fn report(&mut self, alert: &TriggeredAlert) {
        if let Err(e) = writeln!(self.output, "{}", alert.message) {
            error!("Failed to print alert: {}", e);
        }
    }

    fn next_cycle(&mut self) -> CycleControl {
        let prompt = writeln!(self.output, "{}", SESSION_PROMPT)
            .and_then(|_| self.output.flush());
        if let Err(e) = prompt {
            error!("Failed to print prompt: {}", e);
            return CycleControl::Cancel;
        }

        let line = read_line(&mut *self.input);
        if self.interrupts.take_cancel() {
            return CycleControl::Cancel;
        }
        match line {
            Ok(Some(answer)) if answer.eq_ignore_ascii_case("m") => CycleControl::Detach,
            Ok(Some(answer)) if answer.eq_ignore_ascii_case("q") => CycleControl::Cancel,
            Ok(Some(_)) => CycleControl::Continue,
            Ok(None) => CycleControl::Cancel,
            Err(e) => {
                error!("Failed to read input: {}", e);
                CycleControl::Cancel
            }
        }
    }
}

/// Interactive text menu driving the monitor controller
struct Shell<P: MetricProvider, R: BufRead, W: Write> {
    controller: MonitorController<P>,
    input: R,
    output: W,
    interrupts: Arc<InterruptState>,
}

impl<P: MetricProvider, R: BufRead, W: Write> Shell<P, R, W> {
    fn new(
        controller: MonitorController<P>,
        input: R,
        output: W,
        interrupts: Arc<InterruptState>,
    ) -> Self {
        Self {
            controller,
            input,
            output,
            interrupts,
        }
    }

    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;
        read_line(&mut self.input)
    }

    /// Show the menu until the user exits or input ends
    fn run(&mut self) -> anyhow::Result<()> {
        loop {
            writeln!(self.output)?;
            writeln!(self.output, "1. Start monitoring")?;
            writeln!(self.output, "2. View live usage")?;
            writeln!(self.output, "3. Create alert")?;
            writeln!(self.output, "4. List alerts")?;
            writeln!(self.output, "5. Monitoring mode")?;
            writeln!(self.output, "6. Remove alert")?;
            writeln!(self.output, "0. Exit")?;

            let Some(choice) = self.prompt("Choose an option: ")? else {
                break;
            };

            let result = match choice.as_str() {
                "1" => self.monitoring_session(),
                "2" => self.show_usage(),
                "3" => self.create_alert(),
                "4" => self.list_alerts(),
                "5" => {
                    if self.controller.is_monitoring() {
                        writeln!(self.output, "Monitoring is already active.")?;
                        Ok(())
                    } else {
                        self.monitoring_session()
                    }
                }
                "6" => self.remove_alert(),
                "0" => break,
                _ => {
                    writeln!(self.output, "Invalid option.")?;
                    Ok(())
                }
            };

            if let Err(e) = result {
                match e.downcast_ref::<MonitorError>() {
                    Some(monitor_error) if monitor_error.is_validation() => {
                        writeln!(self.output, "{}", monitor_error)?;
                    }
                    _ => {
                        error!("Operation failed: {:#}", e);
                        writeln!(self.output, "Error: {:#}", e)?;
                    }
                }
            }
        }

        self.controller.stop_monitoring()?;
        info!("Exiting");
        Ok(())
    }

    fn monitoring_session(&mut self) -> anyhow::Result<()> {
        writeln!(self.output, "Monitoring started.")?;
        self.interrupts.cancel_requested.store(false, Ordering::SeqCst);
        self.interrupts.in_session.store(true, Ordering::SeqCst);

        let mut driver = ConsoleDriver {
            input: &mut self.input,
            output: &mut self.output,
            interrupts: &self.interrupts,
        };
        let result = self.controller.run(&mut driver);
        self.interrupts.in_session.store(false, Ordering::SeqCst);
        result?;

        if self.controller.is_monitoring() {
            writeln!(self.output, "Returned to menu, monitoring is still active.")?;
        } else {
            writeln!(self.output, "Monitoring has ended.")?;
        }
        Ok(())
    }

    fn show_usage(&mut self) -> anyhow::Result<()> {
        let Some(report) = self.controller.current_usage()? else {
            writeln!(self.output, "No monitoring is active.")?;
            return Ok(());
        };

        writeln!(self.output, "CPU usage: {:.1}%", report.cpu_percent)?;
        writeln!(
            self.output,
            "Memory usage: {:.1}% ({:.2} GB out of {:.2} GB used)",
            report.memory.percent,
            report.memory.used_gib(),
            report.memory.total_gib()
        )?;
        writeln!(
            self.output,
            "Disk usage: {:.1}% ({:.2} GB out of {:.2} GB used)",
            report.disk.percent,
            report.disk.used_gib(),
            report.disk.total_gib()
        )?;
        self.prompt("Press Enter to return to the main menu.")?;
        Ok(())
    }

    fn create_alert(&mut self) -> anyhow::Result<()> {
        let Some(kind) = self.prompt("Enter alert type (CPU, Memory, Disk): ")? else {
            return Ok(());
        };
        let Some(threshold) = self.prompt("Set alert level between 1-100: ")? else {
            return Ok(());
        };

        let threshold = parse_threshold(&threshold).map_err(MonitorError::from)?;
        let rule = self.controller.add_alert(AlertKind::from(kind.as_str()), threshold)?;
        writeln!(
            self.output,
            "Alert for {} set to {}%.",
            rule.kind(),
            rule.threshold()
        )?;
        Ok(())
    }

    fn list_alerts(&mut self) -> anyhow::Result<()> {
        let rules = self.controller.list_alerts();
        if rules.is_empty() {
            writeln!(self.output, "No alerts configured.")?;
        } else {
            for rule in &rules {
                writeln!(self.output, "{}", rule)?;
            }
        }
        self.prompt("Press Enter to return to the main menu.")?;
        Ok(())
    }

    fn remove_alert(&mut self) -> anyhow::Result<()> {
        let rules = self.controller.list_alerts();
        if rules.is_empty() {
            writeln!(self.output, "No alerts configured to remove.")?;
            return Ok(());
        }

        writeln!(self.output, "Choose an alert to remove:")?;
        for (position, rule) in rules.iter().enumerate() {
            writeln!(self.output, "{}. {}", position + 1, rule)?;
        }
        let Some(selection) = self.prompt("Enter the number of the alert to remove: ")? else {
            return Ok(());
        };

        let removed = self.controller.remove_alert_by_selection(&selection)?;
        writeln!(self.output, "Alert for {} removed.", removed.kind())?;
        Ok(())
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    let event_log = EventLog::create(&config.log_dir, Local::now())
        .context("Failed to prepare the session log")?;
    let store = AlertStore::new(&config.alerts_file);
    let provider = SystemMetricsProvider::new(&config.disk_mount_point);
    let controller = MonitorController::new(store, event_log, provider)
        .context("Failed to load alerts")?;

    let interrupts = Arc::new(InterruptState::default());
    let handler_state = Arc::clone(&interrupts);
    ctrlc::set_handler(move || {
        if handler_state.handle_interrupt() {
            // The session is blocked on stdin until the next line arrives
            eprintln!("\n{}", INTERRUPT_NOTICE);
        } else {
            info!("Received interrupt signal (SIGINT), exiting");
            std::process::exit(130);
        }
    })
    .context("Error setting SIGINT handler")?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    Shell::new(controller, stdin.lock(), stdout.lock(), interrupts).run()
}

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting resource monitor");

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        eprintln!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config = cli.apply_overrides(load_config(cli.config.as_deref()));

    if let Err(e) = run(config) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resmon::error::CollectorError;
    use resmon::events::ResourceUsage;
    use std::io::Cursor;
    use tempfile::TempDir;

    struct FixedProvider;

    impl MetricProvider for FixedProvider {
        fn cpu_percent(&mut self) -> Result<f64, CollectorError> {
            Ok(85.0)
        }

        fn memory_usage(&mut self) -> Result<ResourceUsage, CollectorError> {
            Ok(ResourceUsage::from_bytes(7, 10))
        }

        fn disk_usage(&mut self) -> Result<ResourceUsage, CollectorError> {
            Ok(ResourceUsage::from_bytes(1, 10))
        }
    }

    fn run_shell(dir: &TempDir, script: &str) -> String {
        let store = AlertStore::new(dir.path().join("alerts.json"));
        let log = EventLog::at_path(dir.path().join("session.log"));
        let controller = MonitorController::new(store, log, FixedProvider).unwrap();

        let mut output = Vec::new();
        Shell::new(
            controller,
            Cursor::new(script.to_string()),
            &mut output,
            Arc::new(InterruptState::default()),
        )
        .run()
        .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_cli_validation_with_existing_file() {
        let dir = TempDir::new().unwrap();
        let config_file = dir.path().join("resmon.toml");
        std::fs::write(&config_file, "log_dir = \"logs\"").unwrap();

        let cli = Cli {
            config: Some(config_file),
            alerts_file: None,
            log_dir: None,
            verbose: false,
        };

        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_validation_with_missing_file() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/config.toml")),
            alerts_file: None,
            log_dir: None,
            verbose: false,
        };

        // Missing files are handled by falling back to defaults
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_validation_with_directory() {
        let dir = TempDir::new().unwrap();
        let cli = Cli {
            config: Some(dir.path().to_path_buf()),
            alerts_file: None,
            log_dir: None,
            verbose: false,
        };

        assert!(cli.validate().is_err());

        let cli = Cli {
            config: None,
            alerts_file: Some(dir.path().to_path_buf()),
            log_dir: None,
            verbose: false,
        };

        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli {
            config: None,
            alerts_file: Some(PathBuf::from("rules.json")),
            log_dir: Some(PathBuf::from("/var/log/resmon")),
            verbose: false,
        };

        let config = cli.apply_overrides(Config::default());
        assert_eq!(config.alerts_file, PathBuf::from("rules.json"));
        assert_eq!(config.log_dir, PathBuf::from("/var/log/resmon"));
        assert_eq!(config.disk_mount_point, PathBuf::from("/"));
    }

    #[test]
    fn test_load_config_falls_back_to_defaults() {
        assert_eq!(load_config(None), Config::default());
        assert_eq!(
            load_config(Some(Path::new("/nonexistent/resmon.toml"))),
            Config::default()
        );

        let dir = TempDir::new().unwrap();
        let invalid = dir.path().join("invalid.toml");
        std::fs::write(&invalid, "disk_mount_point = \"relative\"").unwrap();
        assert_eq!(load_config(Some(&invalid)), Config::default());
    }

    #[test]
    fn test_interrupt_only_cancels_inside_session() {
        let state = InterruptState::default();
        assert!(!state.handle_interrupt());
        assert!(!state.take_cancel());

        state.in_session.store(true, Ordering::SeqCst);
        assert!(state.handle_interrupt());
        assert!(state.take_cancel());
        assert!(!state.take_cancel());
    }

    #[test]
    fn test_console_driver_honors_pending_interrupt() {
        let interrupts = InterruptState::default();
        interrupts.in_session.store(true, Ordering::SeqCst);
        assert!(interrupts.handle_interrupt());

        let mut input = Cursor::new(b"\n\n".to_vec());
        let mut output = Vec::new();
        let mut driver = ConsoleDriver {
            input: &mut input,
            output: &mut output,
            interrupts: &interrupts,
        };

        // The Enter that unblocks the read stops the session
        assert_eq!(driver.next_cycle(), CycleControl::Cancel);
        // The request is consumed, so the next Enter just continues
        assert_eq!(driver.next_cycle(), CycleControl::Continue);

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("Ctrl+C stops it after the next Enter"));
    }

    #[test]
    fn test_shell_create_list_and_remove() {
        let dir = TempDir::new().unwrap();
        let output = run_shell(&dir, "3\nDisk\n50\n4\n\n6\n1\n4\n\n0\n");

        assert!(output.contains("Alert for Disk set to 50%."));
        assert!(output.contains("Disk alarm 50%"));
        assert!(output.contains("Alert for Disk removed."));
        assert!(output.contains("No alerts configured."));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("alerts.json")).unwrap(),
            "[]"
        );
    }

    #[test]
    fn test_shell_reports_invalid_input() {
        let dir = TempDir::new().unwrap();
        let output = run_shell(&dir, "9\n3\nCPU\n150\n6\n3\nCPU\n20\n6\n5\n0\n");

        assert!(output.contains("Invalid option."));
        assert!(output.contains("Invalid threshold: 150"));
        assert!(output.contains("No alerts configured to remove."));
        assert!(output.contains("Invalid selection: 5"));
    }

    #[test]
    fn test_shell_monitoring_session() {
        let dir = TempDir::new().unwrap();
        let output = run_shell(&dir, "3\nCPU\n80\n2\n1\n\nm\n2\n\n5\n1\nq\n2\n0\n");

        assert_eq!(output.matches("No monitoring is active.").count(), 2);
        assert_eq!(
            output
                .matches("***WARNING, ALERT TRIGGERED, CPU USAGE EXCEEDS 80%***")
                .count(),
            3
        );
        assert!(output.contains("Returned to menu, monitoring is still active."));
        assert!(output.contains("CPU usage: 85.0%"));
        assert!(output.contains("Monitoring is already active."));
        assert!(output.contains("Monitoring has ended."));

        let log = std::fs::read_to_string(dir.path().join("session.log")).unwrap();
        assert_eq!(log.matches("monitoring_mode_started").count(), 1);
        assert_eq!(log.matches("monitoring_mode_stopped").count(), 1);
    }
}
