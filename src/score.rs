use crate::difficulty::Difficulty;
use tracing::warn;

pub const MAX_SCORE: u32 = 10_000;

/// Final race score in `0..=10_000`.
///
/// Dominated by speed, scaled by accuracy and mistakes, with small bonuses for words
/// typed and time left on the clock. Any non-finite intermediate yields 0.
pub fn score(
    wpm: f64,
    accuracy: f64,
    mistakes: usize,
    total_words: usize,
    time_left: u32,
    difficulty: Difficulty,
) -> u32 {
    let wpm_factor = wpm * 60.0;
    let accuracy_modifier = f64::max(0.5, (accuracy / 100.0) * 1.5 - 0.3);
    let mistakes_penalty = f64::max(0.0, 1.0 - (mistakes as f64 / 100.0) * 0.5);
    let words_bonus = (total_words as f64).sqrt() * 20.0;
    let time_bonus = if time_left > 0 {
        (time_left as f64).sqrt() * 10.0
    } else {
        0.0
    };

    let raw = (wpm_factor + words_bonus + time_bonus) * accuracy_modifier * mistakes_penalty;
    let result = (raw * difficulty.score_multiplier()).round();

    if !result.is_finite() {
        warn!("score computation produced {result}, using 0");
        return 0;
    }
    result.clamp(0.0, MAX_SCORE as f64) as u32
}
