use crate::error::GameError;
use std::time::Duration;

/// Derived race metrics, recomputed after every input change or tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    /// Correct characters across the session
    pub correct_chars: usize,
    /// Incorrect characters across the session
    pub incorrect_chars: usize,
    /// Words in the current input buffer
    pub words_typed: usize,
    /// Completed passages plus the current buffer
    pub total_words: usize,
    pub mistakes: usize,
    pub accuracy: f64,
    pub wpm: f64,
    /// Progress towards the word target, 0..=100
    pub race_position: f64,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            correct_chars: 0,
            incorrect_chars: 0,
            words_typed: 0,
            total_words: 0,
            mistakes: 0,
            accuracy: 100.0,
            wpm: 0.0,
            race_position: 0.0,
        }
    }
}

impl MetricsSnapshot {
    pub fn wpm_rounded(&self) -> u32 {
        self.wpm.round().max(0.0) as u32
    }

    pub fn accuracy_rounded(&self) -> u32 {
        self.accuracy.round().clamp(0.0, 100.0) as u32
    }
}

/// Inputs to [`derive_metrics`]
#[derive(Debug, Clone, Copy)]
pub struct MetricInputs {
    pub correct_chars: usize,
    pub incorrect_chars: usize,
    pub words_typed: usize,
    pub completed_words: usize,
    pub mistakes: usize,
    pub target_words: usize,
    /// `None` before the first keystroke
    pub elapsed: Option<Duration>,
}

/// Whitespace-delimited token count
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Correct / classified * 100, or 100 when nothing was classified
pub fn accuracy(correct: usize, incorrect: usize) -> f64 {
    let total = correct + incorrect;
    if total == 0 {
        return 100.0;
    }
    (correct as f64 / total as f64) * 100.0
}

/// Words per elapsed minute; 0 without a start or with no elapsed time
pub fn words_per_minute(words: usize, elapsed: Option<Duration>) -> Result<f64, GameError> {
    let minutes = match elapsed {
        Some(elapsed) => elapsed.as_secs_f64() / 60.0,
        None => return Ok(0.0),
    };
    if minutes <= 0.0 {
        return Ok(0.0);
    }
    let wpm = words as f64 / minutes;
    if wpm.is_finite() {
        Ok(wpm)
    } else {
        Err(GameError::MetricComputation("typing speed"))
    }
}

/// Share of the word target reached, clamped to 0..=100
pub fn race_position(words: usize, target_words: usize) -> f64 {
    if target_words == 0 {
        return 100.0;
    }
    ((words as f64 / target_words as f64) * 100.0).clamp(0.0, 100.0)
}

/// Compute a full snapshot. A failed speed computation keeps `previous_wpm` and
/// reports the error alongside the snapshot.
pub fn derive_metrics(inputs: MetricInputs, previous_wpm: f64) -> (MetricsSnapshot, Option<GameError>) {
    let total_words = inputs.completed_words + inputs.words_typed;
    let (wpm, error) = match words_per_minute(total_words, inputs.elapsed) {
        Ok(wpm) => (wpm, None),
        Err(err) => (previous_wpm, Some(err)),
    };
    let race_position = if inputs.elapsed.is_some() {
        race_position(total_words, inputs.target_words)
    } else {
        0.0
    };

    (
        MetricsSnapshot {
            correct_chars: inputs.correct_chars,
            incorrect_chars: inputs.incorrect_chars,
            words_typed: inputs.words_typed,
            total_words,
            mistakes: inputs.mistakes,
            accuracy: accuracy(inputs.correct_chars, inputs.incorrect_chars),
            wpm,
            race_position,
        },
        error,
    )
}
