//! A Connect 4 opponent that throttles its own search when the machine runs hot
//!
//! The engine searches the game tree with depth-limited minimax and alpha-beta
//! pruning, scoring leaves with weighted four-cell windows. Three difficulty
//! tiers share the same search, and a thermal-aware selector swaps in a
//! shallower engine whenever the temperature source reports overheating.
//!
//! # Basic Usage
//!
//! ```
//! use thermal_connect4::{
//!     thermal::{FixedTemperature, ThermalMonitor},
//!     Difficulty, GameState, ThermalAwareSelector,
//! };
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! // player one has three in a row on the bottom row, player two to move
//! let state = GameState::from_moves("06162")?;
//! let monitor = ThermalMonitor::new(FixedTemperature(45.0));
//! let mut selector = ThermalAwareSelector::for_difficulty(monitor, Difficulty::Balanced, 7);
//!
//! assert_eq!(selector.find_best_move(&state)?, 3);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod error;

pub mod board;

pub mod game;

pub mod evaluator;

pub mod search;

pub mod tactics;

pub mod difficulty;

pub mod thermal;

pub mod selector;

pub mod config;


pub use board::{Board, Cell, Direction, Player};
pub use config::EngineConfig;
pub use difficulty::{Aggressive, Balanced, Difficulty, Permissive};
pub use error::{ConfigError, SearchError, ThermalError};
pub use evaluator::{Evaluator, Weights};
pub use game::{apply_move, check_outcome, legal_moves, new_game, GameState, Outcome};
pub use search::{move_order, Searcher, Strategy};
pub use selector::ThermalAwareSelector;

/// The default number of rows on the game board
pub const DEFAULT_ROWS: usize = 6;

/// The default number of columns on the game board
pub const DEFAULT_COLUMNS: usize = 7;

/// The length of a winning line, and of every evaluation window
pub const CONNECT: usize = 4;

// a default board must be able to hold a line in every direction
const_assert!(DEFAULT_ROWS >= CONNECT && DEFAULT_COLUMNS >= CONNECT);
