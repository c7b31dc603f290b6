// Library surface for the race core, shared by the binary and integration tests.
// Presentation lives in the binary (main.rs + ui).
pub mod app_dirs;
pub mod best_score;
pub mod config;
pub mod corpus;
pub mod difficulty;
pub mod error;
pub mod game;
pub mod history;
pub mod metrics;
pub mod registry;
pub mod runtime;
pub mod score;
pub mod selector;
pub mod session;
pub mod store;
pub mod time_series;
pub mod typing_policy;

pub use difficulty::Difficulty;
pub use error::GameError;
pub use game::{GameController, GameState, RaceKit, RaceResult};
