mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use typing_racer::{
    app_dirs::AppDirs,
    best_score::BestScoreStore,
    config::{Config, ConfigStore, FileConfigStore},
    corpus::{CorpusProvider, DirectoryCorpus, EmbeddedCorpus},
    difficulty::Difficulty,
    game::{RaceKit, TickToken},
    history::RaceHistory,
    registry::UsedTextRegistry,
    runtime::{CrosstermEventSource, FixedTicker, RaceEvent, Runner},
    store::{KeyValueStore, MemoryStore, SqliteStore},
    GameController, GameState,
};

/// typing race in the terminal: beat the clock, move your car, chase your best wpm
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A typing race against the clock. Type passages until you hit the word target for your tier, or until time runs out. Your best wpm per tier is kept between runs."
)]
pub struct Cli {
    /// difficulty tier to preselect
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// directory holding easy.json, medium.json and hard.json passage files
    #[clap(short = 'c', long)]
    corpus_dir: Option<PathBuf>,

    /// seed for a reproducible passage order
    #[clap(long)]
    seed: Option<u64>,

    /// forget which passages have been shown before, then exit
    #[clap(long)]
    reset_history: bool,

    /// print the best wpm for every tier, then exit
    #[clap(long)]
    best: bool,
}

impl Cli {
    /// CLI flags win over the stored config
    fn merge_into(&self, mut config: Config) -> Config {
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(dir) = &self.corpus_dir {
            config.corpus_dir = Some(dir.clone());
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Settings,
    Race,
    Results,
}

/// What the event loop should do after a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// A race just started; restart the tick schedule
    Rearm,
    Quit,
}

/// Parked between races, or out on one. Only a race picks and records passages.
pub enum Seat {
    Parked(RaceKit),
    Racing(Box<GameController>),
}

impl Seat {
    pub fn store(&self) -> &dyn KeyValueStore {
        match self {
            Seat::Parked(kit) => kit.store(),
            Seat::Racing(game) => game.store(),
        }
    }

    pub fn game(&self) -> Option<&GameController> {
        match self {
            Seat::Racing(game) => Some(game.as_ref()),
            Seat::Parked(_) => None,
        }
    }

    fn game_mut(&mut self) -> Option<&mut GameController> {
        match self {
            Seat::Racing(game) => Some(game.as_mut()),
            Seat::Parked(_) => None,
        }
    }

    /// Open a race for `difficulty`, or restart the one on screen
    fn start(&mut self, difficulty: Difficulty) {
        match self {
            Seat::Racing(game) if game.difficulty() != difficulty => {
                game.change_difficulty(difficulty)
            }
            Seat::Racing(game) => {
                if game.state() != GameState::Idle {
                    game.reset();
                }
            }
            Seat::Parked(kit) => {
                let kit = std::mem::take(kit);
                *self = Seat::Racing(Box::new(GameController::open(kit, difficulty)));
            }
        }
    }

    fn park(&mut self) {
        let seat = std::mem::replace(self, Seat::Parked(RaceKit::default()));
        *self = match seat {
            Seat::Racing(game) => Seat::Parked(game.into_kit()),
            parked => parked,
        };
    }
}

pub struct App {
    pub seat: Seat,
    pub state: AppState,
    pub selected: Difficulty,
    tick_token: Option<TickToken>,
    history: RaceHistory,
}

impl App {
    pub fn new(kit: RaceKit, selected: Difficulty, history: RaceHistory) -> Self {
        Self {
            seat: Seat::Parked(kit),
            state: AppState::Settings,
            selected,
            tick_token: None,
            history,
        }
    }

    /// The race on screen, if any
    pub fn game(&self) -> Option<&GameController> {
        self.seat.game()
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Step {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Step::Quit;
        }

        match self.state {
            AppState::Settings => match key.code {
                KeyCode::Up | KeyCode::Left | KeyCode::Char('k') => {
                    self.selected = self.selected.previous();
                }
                KeyCode::Down | KeyCode::Right | KeyCode::Tab | KeyCode::Char('j') => {
                    self.selected = self.selected.next();
                }
                KeyCode::Enter => self.start_race(),
                KeyCode::Esc | KeyCode::Char('q') => return Step::Quit,
                _ => {}
            },
            AppState::Race => {
                let mut proposed = self.game().map(|g| g.input().to_string()).unwrap_or_default();
                match key.code {
                    KeyCode::Esc => self.back_to_settings(),
                    KeyCode::Backspace => {
                        proposed.pop();
                        return self.edit(&proposed);
                    }
                    KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return self.edit(&without_last_word(&proposed));
                    }
                    KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                        proposed.push(c);
                        return self.edit(&proposed);
                    }
                    _ => {}
                }
            }
            AppState::Results => match key.code {
                KeyCode::Char('r') => self.start_race(),
                KeyCode::Esc => self.back_to_settings(),
                KeyCode::Char('q') => return Step::Quit,
                _ => {}
            },
        }
        Step::Continue
    }

    pub fn on_paste(&mut self, text: &str) {
        if self.state != AppState::Race {
            return;
        }
        if let Some(game) = self.seat.game_mut() {
            // Rejection is surfaced through the game notice
            let _ = game.paste_attempted(text);
        }
    }

    pub fn on_tick(&mut self) {
        if self.state != AppState::Race {
            return;
        }
        let (Some(game), Some(token)) = (self.seat.game_mut(), self.tick_token) else {
            return;
        };
        game.on_tick(token);
        if game.state() == GameState::Complete {
            self.finish_race();
        }
    }

    fn edit(&mut self, proposed: &str) -> Step {
        let Some(game) = self.seat.game_mut() else {
            return Step::Continue;
        };
        let was_idle = game.state() == GameState::Idle;
        if let Err(err) = game.input_changed(proposed) {
            info!("input refused: {err}");
        }
        let (state, token) = (game.state(), game.tick_token());

        match state {
            GameState::Complete => {
                self.finish_race();
                Step::Continue
            }
            GameState::Running if was_idle => {
                self.tick_token = Some(token);
                Step::Rearm
            }
            _ => Step::Continue,
        }
    }

    fn start_race(&mut self) {
        self.seat.start(self.selected);
        self.tick_token = None;
        self.state = AppState::Race;
    }

    fn back_to_settings(&mut self) {
        self.seat.park();
        self.tick_token = None;
        self.state = AppState::Settings;
    }

    fn finish_race(&mut self) {
        if let Some(result) = self.seat.game().and_then(|g| g.result()) {
            self.history.append(result);
        }
        self.state = AppState::Results;
    }
}

/// Input with the trailing word (and the spaces after it) removed
fn without_last_word(input: &str) -> String {
    let trimmed = input.trim_end_matches(' ');
    match trimmed.rfind(' ') {
        Some(idx) => trimmed[..=idx].to_string(),
        None => String::new(),
    }
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    let Some(log_path) = AppDirs::log_path() else {
        return Ok(());
    };
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_target(true)
        .compact()
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn open_store() -> Box<dyn KeyValueStore> {
    match SqliteStore::new() {
        Ok(store) => Box::new(store),
        Err(err) => {
            warn!("unable to open store, progress will not be kept: {err}");
            Box::new(MemoryStore::new())
        }
    }
}

fn corpus_for(config: &Config) -> Box<dyn CorpusProvider> {
    match &config.corpus_dir {
        Some(dir) => Box::new(DirectoryCorpus::new(dir)),
        None => Box::new(EmbeddedCorpus),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Err(err) = init_logging() {
        eprintln!("logging disabled: {err}");
    }

    let mut store = open_store();

    if cli.reset_history {
        UsedTextRegistry::clear(store.as_mut());
        println!("passage history cleared");
        return Ok(());
    }

    if cli.best {
        for tier in Difficulty::ALL {
            match BestScoreStore::get(store.as_ref(), tier) {
                Some(wpm) => println!("{tier}: {wpm} wpm"),
                None => println!("{tier}: -"),
            }
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let config = cli.merge_into(config_store.load());
    info!(?config, "starting");

    let kit = RaceKit::new(corpus_for(&config), store, config.seed);
    let mut app = App::new(kit, config.difficulty, RaceHistory::new());

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    let config = Config {
        difficulty: app.selected,
        ..config
    };
    if let Err(err) = config_store.save(&config) {
        warn!("unable to save config: {err}");
    }

    outcome
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::seconds());

    terminal.draw(|f| ui(app, f))?;
    loop {
        match runner.step() {
            RaceEvent::Tick => app.on_tick(),
            RaceEvent::Resize => {}
            RaceEvent::Paste(text) => app.on_paste(&text),
            RaceEvent::Key(key) => match app.on_key(key) {
                Step::Quit => break,
                Step::Rearm => runner.rearm(),
                Step::Continue => {}
            },
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
