use crate::error::CollectorError;
use crate::events::{MetricSample, ResourceUsage};
use log::debug;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use sysinfo::{Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};

/// Source of current resource utilization
///
/// The controller only ever asks for a fresh reading; implementations decide
/// how the numbers are obtained.
#[cfg_attr(test, mockall::automock)]
pub trait MetricProvider {
    /// Current overall CPU usage as a percentage (0-100)
    fn cpu_percent(&mut self) -> Result<f64, CollectorError>;

    /// Current physical memory usage
    fn memory_usage(&mut self) -> Result<ResourceUsage, CollectorError>;

    /// Current usage of the monitored filesystem
    fn disk_usage(&mut self) -> Result<ResourceUsage, CollectorError>;

    /// Take one sample of all three percentages
    fn sample(&mut self) -> Result<MetricSample, CollectorError> {
        Ok(MetricSample {
            cpu_percent: self.cpu_percent()?,
            memory_percent: self.memory_usage()?.percent,
            disk_percent: self.disk_usage()?.percent,
        })
    }
}

/// Metric provider backed by the host operating system
///
/// CPU usage is measured between consecutive refreshes, so the first reading
/// waits out sysinfo's minimum update interval after construction.
pub struct SystemMetricsProvider {
    system: System,
    /// Filesystem reported by `disk_usage`
    mount_point: PathBuf,
    last_cpu_refresh: Instant,
}

impl SystemMetricsProvider {
    /// Create a provider watching the filesystem mounted at `mount_point`
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use resmon::collectors::{MetricProvider, SystemMetricsProvider};
    ///
    /// let mut provider = SystemMetricsProvider::new("/");
    /// let sample = provider.sample().unwrap();
    /// println!("CPU: {:.1}%", sample.cpu_percent);
    /// ```
    pub fn new(mount_point: impl Into<PathBuf>) -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self {
            system,
            mount_point: mount_point.into(),
            last_cpu_refresh: Instant::now(),
        }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }
}

impl MetricProvider for SystemMetricsProvider {
    fn cpu_percent(&mut self) -> Result<f64, CollectorError> {
        let elapsed = self.last_cpu_refresh.elapsed();
        if elapsed < MINIMUM_CPU_UPDATE_INTERVAL {
            thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL - elapsed);
        }
        self.system.refresh_cpu_usage();
        self.last_cpu_refresh = Instant::now();

        if self.system.cpus().is_empty() {
            return Err(CollectorError::Unavailable(
                "no CPUs reported by the system".to_string(),
            ));
        }

        let usage = f64::from(self.system.global_cpu_usage());
        debug!("Sampled CPU usage: {:.1}%", usage);
        Ok(usage)
    }

    fn memory_usage(&mut self) -> Result<ResourceUsage, CollectorError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(CollectorError::Unavailable(
                "total memory reported as zero".to_string(),
            ));
        }

        let usage = ResourceUsage::from_bytes(self.system.used_memory(), total);
        debug!("Sampled memory usage: {:.1}%", usage.percent);
        Ok(usage)
    }

    fn disk_usage(&mut self) -> Result<ResourceUsage, CollectorError> {
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == self.mount_point.as_path())
            .ok_or_else(|| {
                CollectorError::MountPointNotFound(self.mount_point.display().to_string())
            })?;

        let total = disk.total_space();
        let used = total.saturating_sub(disk.available_space());
        let usage = ResourceUsage::from_bytes(used, total);
        debug!(
            "Sampled disk usage for {}: {:.1}%",
            self.mount_point.display(),
            usage.percent
        );
        Ok(usage)
    }
}
