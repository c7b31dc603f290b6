use crate::difficulty::Difficulty;
use crate::error::StoreError;
use crate::store::KeyValueStore;
use tracing::{info, warn};

/// Best WPM per difficulty tier
pub struct BestScoreStore;

impl BestScoreStore {
    pub fn key(difficulty: Difficulty) -> String {
        format!("best_wpm_{}", difficulty.key())
    }

    pub fn try_get(store: &dyn KeyValueStore, difficulty: Difficulty) -> Result<Option<u32>, StoreError> {
        let key = Self::key(difficulty);
        match store.get(&key)? {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map(Some)
                .map_err(|_| StoreError::Corrupt { key, value: raw }),
            None => Ok(None),
        }
    }

    /// Stored best, or `None` when absent or unreadable
    pub fn get(store: &dyn KeyValueStore, difficulty: Difficulty) -> Option<u32> {
        Self::try_get(store, difficulty).unwrap_or_else(|err| {
            warn!("unable to read best score for {difficulty}: {err}");
            None
        })
    }

    /// Store `wpm` when it strictly beats the stored value. Returns whether it was written.
    pub fn set(store: &mut dyn KeyValueStore, difficulty: Difficulty, wpm: u32) -> bool {
        if let Some(best) = Self::get(store, difficulty) {
            if wpm <= best {
                return false;
            }
        }
        match store.set(&Self::key(difficulty), &wpm.to_string()) {
            Ok(()) => {
                info!("new best for {difficulty}: {wpm} wpm");
                true
            }
            Err(err) => {
                warn!("unable to save best score for {difficulty}: {err}");
                false
            }
        }
    }
}
