use crate::best_score::BestScoreStore;
use crate::corpus::{CorpusProvider, EmbeddedCorpus};
use crate::difficulty::Difficulty;
use crate::error::GameError;
use crate::metrics::{derive_metrics, MetricsSnapshot};
use crate::score::score;
use crate::selector::{Continuation, TextSelector};
use crate::session::{CompletionReason, SessionPhase, SessionTracker};
use crate::store::{KeyValueStore, MemoryStore};
use crate::time_series::WpmSeries;
use crate::typing_policy::{check_input_change, check_paste, InputVerdict};
use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Coarse session state handed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Idle,
    Running,
    Complete,
}

impl From<SessionPhase> for GameState {
    fn from(phase: SessionPhase) -> Self {
        match phase {
            SessionPhase::Idle => GameState::Idle,
            SessionPhase::Running { .. } => GameState::Running,
            SessionPhase::Complete { .. } => GameState::Complete,
        }
    }
}

/// Ties a timer tick to the session epoch it was armed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    ContentLoad,
    PasteRejected,
    MetricComputation,
    Persistence,
}

/// User-visible message derived from a [`GameError`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl From<&GameError> for Notice {
    fn from(err: &GameError) -> Self {
        let kind = match err {
            GameError::ContentLoad(_) => NoticeKind::ContentLoad,
            GameError::PasteRejected => NoticeKind::PasteRejected,
            GameError::MetricComputation(_) => NoticeKind::MetricComputation,
            GameError::Persistence(_) => NoticeKind::Persistence,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Frozen outcome of a finished race
#[derive(Debug, Clone, PartialEq)]
pub struct RaceResult {
    pub difficulty: Difficulty,
    pub reason: CompletionReason,
    pub wpm: u32,
    pub accuracy: u32,
    pub correct_chars: usize,
    pub incorrect_chars: usize,
    pub mistakes: usize,
    pub total_words: usize,
    pub time_left: u32,
    pub time_limit: u32,
    pub time_used_percent: u32,
    pub score: u32,
    pub previous_best: Option<u32>,
    pub new_record: bool,
    pub finished_at: DateTime<Local>,
}

/// Share of the time limit spent, rounded to a whole percent
pub fn time_used_percent(time_limit: u32, time_left: u32) -> u32 {
    if time_limit == 0 {
        return 0;
    }
    let used = time_limit.saturating_sub(time_left) as f64;
    ((used / time_limit as f64) * 100.0).round() as u32
}

/// `m:ss`
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// What a race is built from: where passages come from, where progress is kept and
/// the seed for passage order. Holding a kit picks nothing and records nothing.
pub struct RaceKit {
    corpus: Box<dyn CorpusProvider>,
    store: Box<dyn KeyValueStore>,
    seed: Option<u64>,
}

impl RaceKit {
    pub fn new(
        corpus: Box<dyn CorpusProvider>,
        store: Box<dyn KeyValueStore>,
        seed: Option<u64>,
    ) -> Self {
        Self {
            corpus,
            store,
            seed,
        }
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }
}

impl Default for RaceKit {
    /// Embedded passages and an in-memory store
    fn default() -> Self {
        Self::new(Box::new(EmbeddedCorpus), Box::new(MemoryStore::new()), None)
    }
}

/// Drives one race at a time: passage selection, keystroke tracking, the clock and
/// the final result. Every error degrades to a notice; nothing here ends the process.
pub struct GameController {
    difficulty: Difficulty,
    kit: RaceKit,
    selector: TextSelector,
    tracker: SessionTracker,
    metrics: MetricsSnapshot,
    previous_best: Option<u32>,
    epoch: u64,
    content_notice: Option<Notice>,
    notice: Option<Notice>,
    result: Option<RaceResult>,
    wpm_series: WpmSeries,
}

impl GameController {
    pub fn new(
        difficulty: Difficulty,
        corpus: Box<dyn CorpusProvider>,
        store: Box<dyn KeyValueStore>,
        seed: Option<u64>,
    ) -> Self {
        Self::open(RaceKit::new(corpus, store, seed), difficulty)
    }

    /// Open an `Idle` race on `kit`. This is where the opening passage is picked
    /// and recorded as used.
    pub fn open(mut kit: RaceKit, difficulty: Difficulty) -> Self {
        let session = open_session(difficulty, &mut kit);
        Self {
            difficulty,
            kit,
            selector: session.selector,
            tracker: session.tracker,
            metrics: MetricsSnapshot::default(),
            previous_best: session.previous_best,
            epoch: 0,
            content_notice: session.content_notice,
            notice: None,
            result: None,
            wpm_series: WpmSeries::default(),
        }
    }

    /// Tear down the current race and open a fresh `Idle` one for the same tier
    pub fn reset(&mut self) {
        let session = open_session(self.difficulty, &mut self.kit);
        self.selector = session.selector;
        self.tracker = session.tracker;
        self.previous_best = session.previous_best;
        self.content_notice = session.content_notice;
        self.metrics = MetricsSnapshot::default();
        self.notice = None;
        self.result = None;
        self.wpm_series.clear();
        self.epoch += 1;
        debug!(epoch = self.epoch, "session reset");
    }

    pub fn change_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.reset();
    }

    /// End this race without opening another one
    pub fn into_kit(self) -> RaceKit {
        debug!(epoch = self.epoch, "session closed");
        self.kit
    }

    pub fn input_changed(&mut self, proposed: &str) -> Result<MetricsSnapshot, GameError> {
        self.input_changed_at(proposed, Instant::now())
    }

    /// Apply a new input buffer. A rejected paste leaves the buffer untouched and
    /// is returned as the error; the race carries on either way.
    pub fn input_changed_at(
        &mut self,
        proposed: &str,
        now: Instant,
    ) -> Result<MetricsSnapshot, GameError> {
        if self.state() == GameState::Complete {
            return Ok(self.metrics);
        }

        let verdict = check_input_change(self.tracker.input(), proposed, self.tracker.passage());
        if verdict == InputVerdict::SuspectedPaste {
            return Err(self.reject_paste());
        }
        self.notice = None;

        let was_idle = self.state() == GameState::Idle;
        let completed = self.tracker.update(proposed, now);
        if was_idle && self.state() == GameState::Running {
            self.epoch += 1;
            info!(difficulty = %self.difficulty, "race started");
        }

        if let Some(done) = completed {
            debug!(words = done.words, "passage completed");
            self.advance_passage(now);
        }

        if self.state() != GameState::Complete {
            self.refresh(now);
        }
        Ok(self.metrics)
    }

    /// Clipboard pastes are always refused
    pub fn paste_attempted(&mut self, pasted: &str) -> Result<MetricsSnapshot, GameError> {
        if self.state() == GameState::Complete {
            return Ok(self.metrics);
        }
        match check_paste(pasted) {
            InputVerdict::Accepted => Ok(self.metrics),
            InputVerdict::SuspectedPaste => Err(self.reject_paste()),
        }
    }

    fn reject_paste(&mut self) -> GameError {
        let err = GameError::PasteRejected;
        warn!("{err}");
        self.notice = Some(Notice::from(&err));
        err
    }

    /// Token to hand to the timer; only ticks carrying the current one are honoured
    pub fn tick_token(&self) -> TickToken {
        TickToken(self.epoch)
    }

    pub fn on_tick(&mut self, token: TickToken) -> bool {
        self.on_tick_at(token, Instant::now())
    }

    /// One second of race time. Returns false when the tick was stale or the race
    /// is not running.
    pub fn on_tick_at(&mut self, token: TickToken, now: Instant) -> bool {
        if token != self.tick_token() {
            debug!("discarding stale tick");
            return false;
        }
        if self.state() != GameState::Running {
            return false;
        }

        let expired = self.tracker.tick();
        self.refresh(now);
        if let Some(elapsed) = self.tracker.phase().elapsed(now) {
            self.wpm_series.push(elapsed.as_secs_f64(), self.metrics.wpm);
        }
        if expired {
            self.finish(CompletionReason::TimeUp, now);
        }
        true
    }

    fn advance_passage(&mut self, now: Instant) {
        let previous = self.tracker.passage().to_string();
        let cumulative = self.tracker.finish_passage();
        let target = self.tracker.target_words();

        match self.selector.next_passage(&previous, cumulative, target) {
            Continuation::TargetReached => self.finish(CompletionReason::TargetReached, now),
            Continuation::Exhausted => self.finish(CompletionReason::PassagesExhausted, now),
            Continuation::Next(next) => {
                debug!(cumulative, target, "continuing with next passage");
                self.tracker.begin_passage(next);
            }
        }
    }

    fn refresh(&mut self, now: Instant) {
        let (snapshot, err) = derive_metrics(self.tracker.metric_inputs(now), self.metrics.wpm);
        self.metrics = snapshot;
        if let Some(err) = err {
            warn!("{err}");
            self.notice = Some(Notice::from(&err));
        }
    }

    fn finish(&mut self, reason: CompletionReason, now: Instant) {
        if !self.tracker.finish(reason, now) {
            return;
        }
        self.epoch += 1;
        self.refresh(now);

        let wpm = self.metrics.wpm_rounded();
        let accuracy = self.metrics.accuracy_rounded();
        let time_left = self.tracker.time_remaining();
        let time_limit = self.tracker.time_limit();
        let total_words = self.metrics.total_words;
        let mistakes = self.metrics.mistakes;

        let new_record = matches!(self.previous_best, Some(best) if best > 0 && wpm > best);
        if wpm > 0 {
            BestScoreStore::set(self.kit.store.as_mut(), self.difficulty, wpm);
        }

        let result = RaceResult {
            difficulty: self.difficulty,
            reason,
            wpm,
            accuracy,
            correct_chars: self.metrics.correct_chars,
            incorrect_chars: self.metrics.incorrect_chars,
            mistakes,
            total_words,
            time_left,
            time_limit,
            time_used_percent: time_used_percent(time_limit, time_left),
            score: score(
                wpm as f64,
                accuracy as f64,
                mistakes,
                total_words,
                time_left,
                self.difficulty,
            ),
            previous_best: self.previous_best,
            new_record,
            finished_at: Local::now(),
        };
        info!(
            difficulty = %self.difficulty,
            %reason,
            wpm,
            accuracy,
            score = result.score,
            "race complete"
        );
        self.result = Some(result);
    }

    pub fn state(&self) -> GameState {
        self.tracker.phase().into()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn passage(&self) -> &str {
        self.tracker.passage()
    }

    pub fn input(&self) -> &str {
        self.tracker.input()
    }

    pub fn time_remaining(&self) -> u32 {
        self.tracker.time_remaining()
    }

    pub fn previous_best(&self) -> Option<u32> {
        self.previous_best
    }

    /// Latest transient notice, else a content loading problem if there was one
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref().or(self.content_notice.as_ref())
    }

    pub fn result(&self) -> Option<&RaceResult> {
        self.result.as_ref()
    }

    pub fn wpm_series(&self) -> &WpmSeries {
        &self.wpm_series
    }

    pub fn selector(&self) -> &TextSelector {
        &self.selector
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.kit.store()
    }
}

struct OpenedSession {
    selector: TextSelector,
    tracker: SessionTracker,
    previous_best: Option<u32>,
    content_notice: Option<Notice>,
}

fn open_session(difficulty: Difficulty, kit: &mut RaceKit) -> OpenedSession {
    let (raw, content_notice) = match kit.corpus.passages(difficulty) {
        Ok(raw) => (raw, None),
        Err(err) => {
            let err = GameError::from(err);
            warn!("{err}");
            (Vec::new(), Some(Notice::from(&err)))
        }
    };

    let store = kit.store.as_mut();
    let rng = match kit.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let (selector, initial) = TextSelector::start(&raw, store, rng);

    let previous_best = match BestScoreStore::try_get(store, difficulty) {
        Ok(best) => best,
        Err(err) => {
            warn!("{}", GameError::from(err));
            None
        }
    };

    OpenedSession {
        selector,
        tracker: SessionTracker::new(difficulty, initial),
        previous_best,
        content_notice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::StaticCorpus;
    use crate::registry::UsedTextRegistry;
    use crate::selector::{CONTINUATION_FALLBACK, FALLBACK_PASSAGE};
    use crate::store::FailingStore;
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn passages() -> Vec<String> {
        (0..12)
            .map(|i| format!("Passage {i:02} is about a different subject entirely."))
            .collect()
    }

    fn controller(difficulty: Difficulty) -> GameController {
        GameController::new(
            difficulty,
            Box::new(StaticCorpus::uniform(passages())),
            Box::new(MemoryStore::new()),
            Some(42),
        )
    }

    fn type_passage(game: &mut GameController, now: Instant) {
        let passage = game.passage().to_string();
        let mut buffer = String::new();
        for c in passage.chars() {
            buffer.push(c);
            game.input_changed_at(&buffer, now).unwrap();
        }
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(180), "3:00");
    }

    #[test]
    fn test_time_used_percent() {
        assert_eq!(time_used_percent(180, 180), 0);
        assert_eq!(time_used_percent(120, 30), 75);
        assert_eq!(time_used_percent(180, 0), 100);
        assert_eq!(time_used_percent(0, 0), 0);
    }

    #[test]
    fn test_new_controller_is_idle() {
        let game = controller(Difficulty::Easy);
        assert_eq!(game.state(), GameState::Idle);
        assert_eq!(game.metrics(), MetricsSnapshot::default());
        assert_eq!(game.time_remaining(), 180);
        assert!(passages().contains(&game.passage().to_string()));
        assert!(game.notice().is_none());
    }

    #[test]
    fn test_first_keystroke_starts_race() {
        let mut game = controller(Difficulty::Easy);
        let token = game.tick_token();
        let first = game.passage().chars().next().unwrap().to_string();
        game.input_changed_at(&first, Instant::now()).unwrap();
        assert_eq!(game.state(), GameState::Running);
        assert_ne!(game.tick_token(), token);
    }

    #[test]
    fn test_idle_ticks_are_ignored() {
        let mut game = controller(Difficulty::Easy);
        assert!(!game.on_tick_at(game.tick_token(), Instant::now()));
        assert_eq!(game.time_remaining(), 180);
    }

    #[test]
    fn test_passage_completion_continues_race() {
        let mut game = controller(Difficulty::Easy);
        let first = game.passage().to_string();
        type_passage(&mut game, Instant::now());

        assert_eq!(game.state(), GameState::Running);
        assert_ne!(game.passage(), first);
        assert_eq!(game.input(), "");
        assert_eq!(game.tracker().completed_words(), 8);
        assert_eq!(game.metrics().total_words, 8);
    }

    #[test]
    fn test_bulk_paste_is_rejected_and_buffer_kept() {
        let mut game = controller(Difficulty::Easy);
        let now = Instant::now();
        game.input_changed_at("P", now).unwrap();

        let err = game.input_changed_at("Pxxxxx", now).unwrap_err();
        assert_matches!(err, GameError::PasteRejected);
        assert_eq!(game.input(), "P");
        assert_matches!(game.notice(), Some(Notice { kind: NoticeKind::PasteRejected, .. }));

        game.input_changed_at("Pa", now).unwrap();
        assert!(game.notice().is_none());
    }

    #[test]
    fn test_matching_bulk_insert_is_accepted() {
        let mut game = controller(Difficulty::Easy);
        let now = Instant::now();
        let next_six: String = game.passage().chars().take(6).collect();
        game.input_changed_at(&next_six[..1], now).unwrap();
        game.input_changed_at(&next_six, now).unwrap();
        assert_eq!(game.input(), next_six);
    }

    #[test]
    fn test_clipboard_paste_is_rejected() {
        let mut game = controller(Difficulty::Easy);
        let passage = game.passage().to_string();
        assert_matches!(game.paste_attempted(&passage), Err(GameError::PasteRejected));
        assert_eq!(game.input(), "");
        assert_eq!(game.state(), GameState::Idle);
    }

    #[test]
    fn test_timeout_completes_race() {
        let mut game = controller(Difficulty::Hard);
        let t0 = Instant::now();
        game.input_changed_at("P", t0).unwrap();
        let token = game.tick_token();

        for sec in 1..=120 {
            assert!(game.on_tick_at(token, t0 + Duration::from_secs(sec)));
        }
        assert_eq!(game.state(), GameState::Complete);
        let result = game.result().expect("result recorded");
        assert_eq!(result.reason, CompletionReason::TimeUp);
        assert_eq!(result.time_left, 0);
        assert_eq!(result.time_used_percent, 100);
        assert_eq!(game.wpm_series().len(), 120);

        // The epoch moved on, the old token is now stale
        assert!(!game.on_tick_at(token, t0 + Duration::from_secs(121)));
    }

    #[test]
    fn test_complete_ignores_input() {
        let mut game = controller(Difficulty::Hard);
        let t0 = Instant::now();
        game.input_changed_at("P", t0).unwrap();
        let token = game.tick_token();
        for sec in 1..=120 {
            game.on_tick_at(token, t0 + Duration::from_secs(sec));
        }
        game.input_changed_at("Pa", t0 + Duration::from_secs(121)).unwrap();
        assert_eq!(game.input(), "P");
        assert_eq!(game.state(), GameState::Complete);
    }

    #[test]
    fn test_target_reached_completes_and_saves_best() {
        let mut game = GameController::new(
            Difficulty::Easy,
            Box::new(StaticCorpus::uniform(vec![
                "word ".repeat(60).trim_end().to_string(),
                "text ".repeat(60).trim_end().to_string(),
            ])),
            Box::new(MemoryStore::new()),
            Some(1),
        );
        let t0 = Instant::now();
        type_passage(&mut game, t0);
        assert_eq!(game.state(), GameState::Running);
        type_passage(&mut game, t0 + Duration::from_secs(60));

        assert_eq!(game.state(), GameState::Complete);
        let result = game.result().unwrap();
        assert_eq!(result.reason, CompletionReason::TargetReached);
        assert_eq!(result.total_words, 100);
        assert_eq!(result.wpm, 100);
        assert_eq!(result.accuracy, 100);
        assert_eq!(result.previous_best, None);
        assert!(!result.new_record);
        assert_eq!(
            BestScoreStore::get(game.store(), Difficulty::Easy),
            Some(100)
        );
    }

    #[test]
    fn test_new_record_needs_previous_best() {
        let mut store = MemoryStore::new();
        BestScoreStore::set(&mut store, Difficulty::Hard, 5);
        let mut game = GameController::new(
            Difficulty::Hard,
            Box::new(StaticCorpus::uniform(passages())),
            Box::new(store),
            Some(3),
        );
        assert_eq!(game.previous_best(), Some(5));

        let t0 = Instant::now();
        type_passage(&mut game, t0);
        let token = game.tick_token();
        for sec in 1..=120 {
            game.on_tick_at(token, t0 + Duration::from_secs(sec));
        }
        let result = game.result().unwrap();
        // 8 words in two minutes
        assert_eq!(result.wpm, 4);
        assert!(!result.new_record);
        assert_eq!(BestScoreStore::get(game.store(), Difficulty::Hard), Some(5));
    }

    #[test]
    fn test_reset_discards_pending_ticks() {
        let mut game = controller(Difficulty::Medium);
        let t0 = Instant::now();
        game.input_changed_at("P", t0).unwrap();
        let token = game.tick_token();
        assert!(game.on_tick_at(token, t0 + Duration::from_secs(1)));

        game.reset();
        assert_eq!(game.state(), GameState::Idle);
        assert!(!game.on_tick_at(token, t0 + Duration::from_secs(2)));
        assert_eq!(game.time_remaining(), 180);
        assert!(game.wpm_series().is_empty());
    }

    #[test]
    fn test_change_difficulty_resets_tier() {
        let mut game = controller(Difficulty::Medium);
        game.input_changed_at("P", Instant::now()).unwrap();
        game.change_difficulty(Difficulty::Hard);
        assert_eq!(game.difficulty(), Difficulty::Hard);
        assert_eq!(game.state(), GameState::Idle);
        assert_eq!(game.time_remaining(), 120);
    }

    #[test]
    fn test_content_load_failure_uses_fallback() {
        let mut game = GameController::new(
            Difficulty::Medium,
            Box::new(StaticCorpus::default()),
            Box::new(MemoryStore::new()),
            None,
        );
        assert_eq!(game.passage(), FALLBACK_PASSAGE);
        assert_matches!(game.notice(), Some(Notice { kind: NoticeKind::ContentLoad, .. }));

        // Stays visible while typing
        game.input_changed_at("T", Instant::now()).unwrap();
        assert_matches!(game.notice(), Some(Notice { kind: NoticeKind::ContentLoad, .. }));
    }

    #[test]
    fn test_spent_fallbacks_complete_the_race() {
        let mut game = GameController::new(
            Difficulty::Easy,
            Box::new(StaticCorpus::default()),
            Box::new(MemoryStore::new()),
            Some(2),
        );
        let t0 = Instant::now();
        type_passage(&mut game, t0);
        assert_eq!(game.state(), GameState::Running);
        assert_eq!(game.passage(), CONTINUATION_FALLBACK);

        type_passage(&mut game, t0 + Duration::from_secs(30));
        assert_eq!(game.state(), GameState::Complete);
        let result = game.result().unwrap();
        assert_eq!(result.reason, CompletionReason::PassagesExhausted);
        assert_eq!(result.total_words, 31);
        assert!(result.time_left > 0);
    }

    #[test]
    fn test_kit_round_trip_records_only_opened_races() {
        let kit = RaceKit::new(
            Box::new(StaticCorpus::uniform(passages())),
            Box::new(MemoryStore::new()),
            Some(6),
        );
        assert!(UsedTextRegistry::load(kit.store()).is_empty());

        let game = GameController::open(kit, Difficulty::Medium);
        let shown = game.passage().to_string();
        let kit = game.into_kit();

        let registry = UsedTextRegistry::load(kit.store());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&shown));
    }

    #[test]
    fn test_failing_store_does_not_break_race() {
        let mut game = GameController::new(
            Difficulty::Easy,
            Box::new(StaticCorpus::uniform(passages())),
            Box::new(FailingStore),
            Some(9),
        );
        let t0 = Instant::now();
        type_passage(&mut game, t0);
        let token = game.tick_token();
        for sec in 1..=180 {
            game.on_tick_at(token, t0 + Duration::from_secs(sec));
        }
        assert_eq!(game.state(), GameState::Complete);
        assert!(game.result().unwrap().wpm > 0);
    }

    #[test]
    fn test_each_race_registers_its_opening_passage() {
        let mut game = controller(Difficulty::Easy);
        let first = game.passage().to_string();
        game.reset();
        let second = game.passage().to_string();
        assert_ne!(first, second);

        let registry = UsedTextRegistry::load(game.store());
        assert!(registry.contains(&first));
        assert!(registry.contains(&second));
    }
}
