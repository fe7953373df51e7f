use crate::state::write_json;
use crate::types::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const HISTORY_FILE: &str = "history.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    dates: Vec<NaiveDate>,
}

/// Durable, bounded list of report dates kept in `history.json`.
pub struct HistoryTracker {
    path: PathBuf,
    dates: Vec<NaiveDate>,
}

impl HistoryTracker {
    /// Open the index in `output_dir`. A missing or unreadable index starts empty.
    pub fn open(output_dir: &Path) -> Self {
        let path = output_dir.join(HISTORY_FILE);
        let mut dates = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<HistoryFile>(&content) {
                Ok(file) => file.dates,
                Err(e) => {
                    warn!("History index {} is malformed ({}), starting empty", path.display(), e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();
        Self { path, dates }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Known report dates, newest first
    pub fn list_existing(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Add `date` if absent and persist. Recording twice is a no-op.
    pub fn record(&mut self, date: NaiveDate) -> Result<()> {
        if self.dates.contains(&date) {
            return Ok(());
        }

        let at = self.dates.partition_point(|existing| *existing > date);
        self.dates.insert(at, date);
        self.save()?;
        info!("Recorded report date {}", date);
        Ok(())
    }

    /// Keep the `max_entries` newest dates. Returns the dropped dates.
    pub fn prune(&mut self, max_entries: usize) -> Result<Vec<NaiveDate>> {
        if self.dates.len() <= max_entries {
            return Ok(Vec::new());
        }

        let dropped = self.dates.split_off(max_entries);
        self.save()?;
        info!("Pruned {} report dates from history", dropped.len());
        Ok(dropped)
    }

    fn save(&self) -> Result<()> {
        write_json(
            &self.path,
            &HistoryFile {
                dates: self.dates.clone(),
            },
        )
    }
}
