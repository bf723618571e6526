use crate::error::StoreError;
use crate::events::AlertRule;
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// JSON-file persistence for the alert rule list
///
/// The file holds an array of `{"alert_type": ..., "threshold": ...}`
/// objects in list order. A missing file is treated as an empty rule set.
#[derive(Debug, Clone)]
pub struct AlertStore {
    path: PathBuf,
}

impl AlertStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all persisted rules
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Parse` if the file is not a valid rule array
    /// (including thresholds outside 1..=100) and `StoreError::Io` if it
    /// exists but cannot be read.
    pub fn load(&self) -> Result<Vec<AlertRule>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "No alert file at {}, starting with no alerts",
                    self.path.display()
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let rules: Vec<AlertRule> = serde_json::from_str(&contents)?;
        info!(
            "Loaded {} alert(s) from {}",
            rules.len(),
            self.path.display()
        );
        Ok(rules)
    }

    /// Overwrite the persisted rules with `rules`
    ///
    /// The new content is written to a sibling temporary file and renamed
    /// over the target, so readers see either the old or the new list.
    pub fn save(&self, rules: &[AlertRule]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string(rules)?;
        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!("Saved {} alert(s) to {}", rules.len(), self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
