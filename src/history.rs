use crate::app_dirs::AppDirs;
use crate::error::StoreError;
use crate::game::RaceResult;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One row of `history.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub date: String,
    pub difficulty: String,
    pub reason: String,
    pub wpm: u32,
    pub accuracy: u32,
    pub mistakes: usize,
    pub words: usize,
    pub time_left: u32,
    pub score: u32,
}

impl From<&RaceResult> for HistoryRecord {
    fn from(result: &RaceResult) -> Self {
        Self {
            date: result.finished_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            difficulty: result.difficulty.to_string(),
            reason: result.reason.to_string(),
            wpm: result.wpm,
            accuracy: result.accuracy,
            mistakes: result.mistakes,
            words: result.total_words,
            time_left: result.time_left,
            score: result.score,
        }
    }
}

/// Append-only CSV log of finished races
#[derive(Debug, Clone)]
pub struct RaceHistory {
    path: PathBuf,
}

impl RaceHistory {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::history_path().unwrap_or_else(|| PathBuf::from("typing_racer_history.csv"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn try_append(&self, result: &RaceResult) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Header only for a fresh file
        let needs_header = !self.path.exists();
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(HistoryRecord::from(result))?;
        writer.flush()?;
        debug!("appended race to {}", self.path.display());
        Ok(())
    }

    /// Best effort: failures are logged and dropped
    pub fn append(&self, result: &RaceResult) {
        if let Err(err) = self.try_append(result) {
            warn!("unable to write race history: {err}");
        }
    }

    pub fn load(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let records = reader
            .deserialize()
            .collect::<Result<Vec<HistoryRecord>, csv::Error>>()?;
        Ok(records)
    }
}
