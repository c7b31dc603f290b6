use crate::difficulty::Difficulty;
use crate::metrics::{word_count, MetricInputs};
use std::time::{Duration, Instant};

/// Why a race ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum CompletionReason {
    #[strum(serialize = "time up")]
    TimeUp,
    #[strum(serialize = "target reached")]
    TargetReached,
    #[strum(serialize = "passages exhausted")]
    PassagesExhausted,
}

/// Race lifecycle. `Complete` is terminal; only a fresh session leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running {
        started_at: Instant,
    },
    Complete {
        started_at: Instant,
        finished_at: Instant,
        reason: CompletionReason,
    },
}

/// Events that move a session between phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseTrigger {
    FirstInput(Instant),
    Finish(CompletionReason, Instant),
}

impl SessionPhase {
    /// Next phase for `trigger`, or `None` when the trigger does not apply
    pub fn transition(self, trigger: PhaseTrigger) -> Option<SessionPhase> {
        match (self, trigger) {
            (SessionPhase::Idle, PhaseTrigger::FirstInput(at)) => {
                Some(SessionPhase::Running { started_at: at })
            }
            (SessionPhase::Running { started_at }, PhaseTrigger::Finish(reason, at)) => {
                Some(SessionPhase::Complete {
                    started_at,
                    finished_at: at,
                    reason,
                })
            }
            _ => None,
        }
    }

    pub fn started_at(&self) -> Option<Instant> {
        match self {
            SessionPhase::Idle => None,
            SessionPhase::Running { started_at } | SessionPhase::Complete { started_at, .. } => {
                Some(*started_at)
            }
        }
    }

    /// Time since the first keystroke, frozen once complete
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        match self {
            SessionPhase::Idle => None,
            SessionPhase::Running { started_at } => Some(now.saturating_duration_since(*started_at)),
            SessionPhase::Complete {
                started_at,
                finished_at,
                ..
            } => Some(finished_at.saturating_duration_since(*started_at)),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SessionPhase::Running { .. })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, SessionPhase::Complete { .. })
    }
}

/// Emitted when the input buffer reaches the end of the current passage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassageCompleted {
    /// Words in the passage just finished
    pub words: usize,
}

/// Per-keystroke bookkeeping for one race: the input buffer against the current
/// passage, running character counts, the mistake edge trigger and the clock.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    difficulty: Difficulty,
    phase: SessionPhase,
    time_remaining: u32,
    passage: String,
    passage_chars: Vec<char>,
    input: String,
    passage_correct: usize,
    passage_incorrect: usize,
    completed_correct: usize,
    completed_incorrect: usize,
    completed_words: usize,
    passages_completed: usize,
    mistakes: usize,
    // highest buffer length already checked for a mistake in this passage
    mistake_index: usize,
}

impl SessionTracker {
    pub fn new(difficulty: Difficulty, passage: String) -> Self {
        Self {
            difficulty,
            phase: SessionPhase::Idle,
            time_remaining: difficulty.time_limit_secs(),
            passage_chars: passage.chars().collect(),
            passage,
            input: String::new(),
            passage_correct: 0,
            passage_incorrect: 0,
            completed_correct: 0,
            completed_incorrect: 0,
            completed_words: 0,
            passages_completed: 0,
            mistakes: 0,
            mistake_index: 0,
        }
    }

    /// Replace the input buffer. Starts the clock on the first non-empty input and
    /// reports when the passage has been typed to the end. Ignored once complete.
    pub fn update(&mut self, input: &str, now: Instant) -> Option<PassageCompleted> {
        if self.phase.is_complete() {
            return None;
        }
        if !input.is_empty() {
            if let Some(next) = self.phase.transition(PhaseTrigger::FirstInput(now)) {
                self.phase = next;
            }
        }

        self.input = input.to_string();
        if !self.phase.is_running() {
            return None;
        }

        let typed: Vec<char> = input.chars().collect();
        let (correct, incorrect) = typed
            .iter()
            .zip(self.passage_chars.iter())
            .fold((0, 0), |(c, i), (got, want)| {
                if got == want {
                    (c + 1, i)
                } else {
                    (c, i + 1)
                }
            });
        self.passage_correct = correct;
        self.passage_incorrect = incorrect;

        let len = typed.len();
        if len > 0 && len <= self.passage_chars.len() && len > self.mistake_index {
            if typed[len - 1] != self.passage_chars[len - 1] {
                self.mistakes += 1;
            }
            self.mistake_index = len;
        }

        if len >= self.passage_chars.len() {
            Some(PassageCompleted {
                words: word_count(&self.passage),
            })
        } else {
            None
        }
    }

    /// Fold the current passage into the session totals and clear the buffer.
    /// Returns the cumulative word count.
    pub fn finish_passage(&mut self) -> usize {
        self.completed_words += word_count(&self.passage);
        self.completed_correct += self.passage_correct;
        self.completed_incorrect += self.passage_incorrect;
        self.passages_completed += 1;
        self.passage_correct = 0;
        self.passage_incorrect = 0;
        self.input.clear();
        self.completed_words
    }

    /// Continue the race with a new passage
    pub fn begin_passage(&mut self, passage: String) {
        self.passage_chars = passage.chars().collect();
        self.passage = passage;
        self.input.clear();
        self.passage_correct = 0;
        self.passage_incorrect = 0;
        self.mistake_index = 0;
    }

    /// One second of the race clock. Returns true when the clock just ran out.
    pub fn tick(&mut self) -> bool {
        if !self.phase.is_running() || self.time_remaining == 0 {
            return false;
        }
        self.time_remaining -= 1;
        self.time_remaining == 0
    }

    /// Move to `Complete`. No-op unless running.
    pub fn finish(&mut self, reason: CompletionReason, now: Instant) -> bool {
        match self.phase.transition(PhaseTrigger::Finish(reason, now)) {
            Some(next) => {
                self.phase = next;
                if reason == CompletionReason::TargetReached {
                    self.completed_words = self.completed_words.min(self.target_words());
                }
                true
            }
            None => false,
        }
    }

    pub fn metric_inputs(&self, now: Instant) -> MetricInputs {
        MetricInputs {
            correct_chars: self.completed_correct + self.passage_correct,
            incorrect_chars: self.completed_incorrect + self.passage_incorrect,
            words_typed: word_count(&self.input),
            completed_words: self.completed_words,
            mistakes: self.mistakes,
            target_words: self.target_words(),
            elapsed: self.phase.elapsed(now),
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn passage(&self) -> &str {
        &self.passage
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn time_limit(&self) -> u32 {
        self.difficulty.time_limit_secs()
    }

    pub fn target_words(&self) -> usize {
        self.difficulty.target_words()
    }

    pub fn completed_words(&self) -> usize {
        self.completed_words
    }

    pub fn passages_completed(&self) -> usize {
        self.passages_completed
    }

    pub fn mistakes(&self) -> usize {
        self.mistakes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(passage: &str) -> SessionTracker {
        SessionTracker::new(Difficulty::Easy, passage.to_string())
    }

    /// Feed `text` one char at a time, as the buffer grows
    fn type_out(tracker: &mut SessionTracker, text: &str, now: Instant) -> Option<PassageCompleted> {
        let mut buffer = String::new();
        let mut last = None;
        for c in text.chars() {
            buffer.push(c);
            last = tracker.update(&buffer, now);
        }
        last
    }

    #[test]
    fn test_phase_transitions() {
        let now = Instant::now();
        let idle = SessionPhase::Idle;
        assert_eq!(idle.transition(PhaseTrigger::Finish(CompletionReason::TimeUp, now)), None);

        let running = idle.transition(PhaseTrigger::FirstInput(now)).unwrap();
        assert!(running.is_running());
        assert_eq!(running.transition(PhaseTrigger::FirstInput(now)), None);

        let complete = running
            .transition(PhaseTrigger::Finish(CompletionReason::TargetReached, now))
            .unwrap();
        assert!(complete.is_complete());
        assert_eq!(complete.transition(PhaseTrigger::FirstInput(now)), None);
        assert_eq!(
            complete.transition(PhaseTrigger::Finish(CompletionReason::TimeUp, now)),
            None
        );
    }

    #[test]
    fn test_elapsed_freezes_on_completion() {
        let t0 = Instant::now();
        let running = SessionPhase::Running { started_at: t0 };
        assert_eq!(running.elapsed(t0 + Duration::from_secs(5)), Some(Duration::from_secs(5)));

        let complete = running
            .transition(PhaseTrigger::Finish(CompletionReason::TimeUp, t0 + Duration::from_secs(10)))
            .unwrap();
        assert_eq!(complete.elapsed(t0 + Duration::from_secs(99)), Some(Duration::from_secs(10)));
        assert_eq!(SessionPhase::Idle.elapsed(t0), None);
    }

    #[test]
    fn test_new_tracker_is_idle() {
        let t = tracker("hello world");
        assert_eq!(t.phase(), SessionPhase::Idle);
        assert_eq!(t.time_remaining(), 180);
        assert_eq!(t.target_words(), 100);
        assert_eq!(t.input(), "");
    }

    #[test]
    fn test_empty_input_does_not_start() {
        let mut t = tracker("hello");
        t.update("", Instant::now());
        assert_eq!(t.phase(), SessionPhase::Idle);
        assert!(!t.tick());
        assert_eq!(t.time_remaining(), 180);
    }

    #[test]
    fn test_first_input_starts_clock() {
        let now = Instant::now();
        let mut t = tracker("hello");
        t.update("h", now);
        assert_eq!(t.phase(), SessionPhase::Running { started_at: now });
    }

    #[test]
    fn test_classification_counts() {
        let now = Instant::now();
        let mut t = tracker("test");
        type_out(&mut t, "txs", now);
        let inputs = t.metric_inputs(now);
        assert_eq!(inputs.correct_chars, 2);
        assert_eq!(inputs.incorrect_chars, 1);
    }

    #[test]
    fn test_mistakes_are_edge_triggered() {
        let now = Instant::now();
        let mut t = tracker("abcdef");
        t.update("a", now);
        t.update("ax", now);
        assert_eq!(t.mistakes(), 1);

        // Backspace and retype a different wrong char at the same index
        t.update("a", now);
        t.update("ay", now);
        assert_eq!(t.mistakes(), 1);

        // Fixing it does not decrement
        t.update("a", now);
        t.update("ab", now);
        assert_eq!(t.mistakes(), 1);

        t.update("abz", now);
        assert_eq!(t.mistakes(), 2);
    }

    #[test]
    fn test_mistake_checks_only_newest_char_of_bulk_insert() {
        let now = Instant::now();
        let mut t = tracker("abcdef");
        t.update("xbcd", now);
        assert_eq!(t.mistakes(), 0);
        assert_eq!(t.metric_inputs(now).incorrect_chars, 1);
    }

    #[test]
    fn test_completion_detected_at_passage_end() {
        let now = Instant::now();
        let mut t = tracker("hi there");
        let done = type_out(&mut t, "hi there", now);
        assert_eq!(done, Some(PassageCompleted { words: 2 }));
    }

    #[test]
    fn test_finish_passage_accumulates() {
        let now = Instant::now();
        let mut t = tracker("ab cd");
        type_out(&mut t, "ab xd", now);
        assert_eq!(t.finish_passage(), 2);
        assert_eq!(t.input(), "");
        assert_eq!(t.passages_completed(), 1);

        t.begin_passage("ef gh ij".to_string());
        type_out(&mut t, "ef", now);
        let inputs = t.metric_inputs(now);
        assert_eq!(inputs.correct_chars, 4 + 2);
        assert_eq!(inputs.incorrect_chars, 1);
        assert_eq!(inputs.completed_words, 2);
        assert_eq!(inputs.words_typed, 1);
        assert_eq!(inputs.mistakes, 1);
    }

    #[test]
    fn test_mistake_index_resets_with_new_passage() {
        let now = Instant::now();
        let mut t = tracker("ab");
        type_out(&mut t, "ab", now);
        t.finish_passage();
        t.begin_passage("cd".to_string());
        t.update("x", now);
        assert_eq!(t.mistakes(), 1);
    }

    #[test]
    fn test_tick_counts_down_to_zero() {
        let now = Instant::now();
        let mut t = SessionTracker::new(Difficulty::Hard, "abc".to_string());
        t.update("a", now);
        for _ in 0..119 {
            assert!(!t.tick());
        }
        assert!(t.tick());
        assert_eq!(t.time_remaining(), 0);
        assert!(!t.tick());
        assert_eq!(t.time_remaining(), 0);
    }

    #[test]
    fn test_finish_is_terminal() {
        let now = Instant::now();
        let mut t = tracker("abc");
        assert!(!t.finish(CompletionReason::TimeUp, now));
        t.update("a", now);
        assert!(t.finish(CompletionReason::TimeUp, now));
        assert!(!t.finish(CompletionReason::TargetReached, now));

        assert_eq!(t.update("ab", now), None);
        assert_eq!(t.input(), "a");
        assert!(!t.tick());
    }

    #[test]
    fn test_target_completion_clamps_words() {
        let now = Instant::now();
        let mut t = SessionTracker::new(Difficulty::Easy, "w ".repeat(104).trim_end().to_string());
        t.update("w", now);
        t.finish_passage();
        assert_eq!(t.completed_words(), 104);
        t.finish(CompletionReason::TargetReached, now);
        assert_eq!(t.completed_words(), 100);
    }
}
