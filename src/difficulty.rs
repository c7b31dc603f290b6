use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Difficulty tier of a race. Fixes the word target, the clock and the score multiplier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Words the player must complete to finish the race
    pub fn target_words(&self) -> usize {
        match self {
            Difficulty::Easy => 100,
            Difficulty::Medium => 150,
            Difficulty::Hard => 200,
        }
    }

    /// Race clock in seconds
    pub fn time_limit_secs(&self) -> u32 {
        match self {
            Difficulty::Easy => 180,
            Difficulty::Medium => 180,
            Difficulty::Hard => 120,
        }
    }

    pub fn score_multiplier(&self) -> f64 {
        match self {
            Difficulty::Easy => 0.85,
            Difficulty::Medium => 1.0,
            Difficulty::Hard => 1.25,
        }
    }

    /// Stable lowercase name used in storage keys and corpus file names
    pub fn key(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Difficulty::Easy => {
                "Simple vocabulary and short sentences. Type 100 words to finish. Time limit: 3 minutes."
            }
            Difficulty::Medium => {
                "Richer vocabulary and longer sentences. Type 150 words to finish. Time limit: 3 minutes."
            }
            Difficulty::Hard => {
                "Technical terms and complex structure. Type 200 words to finish. Time limit: 2 minutes."
            }
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Hard,
            Difficulty::Medium => Difficulty::Easy,
            Difficulty::Hard => Difficulty::Medium,
        }
    }
}
