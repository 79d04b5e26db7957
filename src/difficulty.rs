//! The three difficulty tiers layered over [`Searcher`]

use log::debug;
use rand::{rngs::StdRng, seq::IndexedRandom, Rng};

use std::{fmt, str::FromStr};

use crate::{
    error::{ConfigError, SearchError},
    evaluator::Weights,
    game::GameState,
    search::{ensure_playable, Searcher, Strategy},
    tactics,
};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Default)]
pub enum Difficulty {
    Permissive,
    #[default]
    Balanced,
    Aggressive,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Permissive,
        Difficulty::Balanced,
        Difficulty::Aggressive,
    ];

    /// Search depth while the machine is cool
    pub fn depth(self) -> u8 {
        match self {
            Difficulty::Permissive => 2,
            Difficulty::Balanced => 4,
            Difficulty::Aggressive => 5,
        }
    }

    /// Search depth while the machine is overheating
    pub fn reduced_depth(self) -> u8 {
        match self {
            Difficulty::Permissive => 1,
            Difficulty::Balanced => 2,
            Difficulty::Aggressive => 3,
        }
    }

    pub fn weights(self) -> Weights {
        match self {
            Difficulty::Permissive => Weights::PERMISSIVE,
            Difficulty::Balanced => Weights::BALANCED,
            Difficulty::Aggressive => Weights::AGGRESSIVE,
        }
    }

    /// A searcher with this tier's weights at the given depth
    pub fn searcher(self, depth: u8) -> Searcher {
        Searcher::new(depth, self.weights())
    }

    /// Wraps `searcher` in this tier's move policy
    pub fn strategy(self, searcher: Searcher, rng: StdRng) -> Box<dyn Strategy> {
        match self {
            Difficulty::Permissive => Box::new(Permissive::new(searcher, rng)),
            Difficulty::Balanced => Box::new(Balanced::new(searcher, rng)),
            Difficulty::Aggressive => Box::new(Aggressive::new(searcher)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Permissive => "permissive",
            Difficulty::Balanced => "balanced",
            Difficulty::Aggressive => "aggressive",
        };
        write!(f, "{}", name)
    }
}

/// Accepts the tier names and the easy/medium/hard aliases
impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "permissive" | "easy" => Ok(Difficulty::Permissive),
            "balanced" | "medium" => Ok(Difficulty::Balanced),
            "aggressive" | "hard" => Ok(Difficulty::Aggressive),
            _ => Err(ConfigError::UnknownDifficulty(s.to_string())),
        }
    }
}

/// Clamps a probability so `Rng::random_bool` accepts it
fn probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// A forgiving opponent: shallow, sometimes random, sometimes misses a block
pub struct Permissive {
    searcher: Searcher,
    rng: StdRng,
    random_move_probability: f64,
    block_probability: f64,
}

impl Permissive {
    pub const RANDOM_MOVE_PROBABILITY: f64 = 0.3;
    pub const BLOCK_PROBABILITY: f64 = 0.9;

    pub fn new(searcher: Searcher, rng: StdRng) -> Self {
        Self {
            searcher,
            rng,
            random_move_probability: Self::RANDOM_MOVE_PROBABILITY,
            block_probability: Self::BLOCK_PROBABILITY,
        }
    }

    pub fn with_probabilities(mut self, random_move: f64, block: f64) -> Self {
        self.random_move_probability = probability(random_move);
        self.block_probability = probability(block);
        self
    }
}

impl Strategy for Permissive {
    fn find_best_move(&mut self, state: &GameState) -> Result<usize, SearchError> {
        ensure_playable(state)?;

        if let Some(column) = tactics::immediate_win(state) {
            return Ok(column);
        }
        if let Some(column) = tactics::immediate_threat(state) {
            if self.rng.random_bool(self.block_probability) {
                return Ok(column);
            }
            debug!("permissive engine let the block in column {} slide", column);
        }
        if self.rng.random_bool(self.random_move_probability) {
            return state
                .legal_moves()
                .choose(&mut self.rng)
                .copied()
                .ok_or(SearchError::NoLegalMoves);
        }
        self.searcher.find_best_move(state)
    }

    fn depth(&self) -> u8 {
        self.searcher.depth()
    }
}

/// Plays soundly at moderate depth, with the odd second-best move for variety
pub struct Balanced {
    searcher: Searcher,
    rng: StdRng,
    variety_probability: f64,
}

impl Balanced {
    pub const VARIETY_PROBABILITY: f64 = 0.15;

    pub fn new(searcher: Searcher, rng: StdRng) -> Self {
        Self {
            searcher,
            rng,
            variety_probability: Self::VARIETY_PROBABILITY,
        }
    }

    pub fn with_variety_probability(mut self, variety: f64) -> Self {
        self.variety_probability = probability(variety);
        self
    }
}

impl Strategy for Balanced {
    fn find_best_move(&mut self, state: &GameState) -> Result<usize, SearchError> {
        ensure_playable(state)?;

        if let Some(column) = tactics::immediate_win(state) {
            return Ok(column);
        }
        if let Some(column) = tactics::immediate_threat(state) {
            return Ok(column);
        }
        let candidates = tactics::safe_moves(state);
        if let Some(column) = tactics::fork_move(state, &candidates) {
            debug!("balanced engine sets up a fork in column {}", column);
            return Ok(column);
        }

        if candidates.len() > 1 && self.rng.random_bool(self.variety_probability) {
            let mut scored = self.searcher.score_moves(state, &candidates);
            // stable, so equal scores keep their center-first order
            scored.sort_by(|a, b| b.1.cmp(&a.1));
            if let Some(&(column, score)) = scored.get(1) {
                debug!("balanced engine plays second best column {} (score {})", column, score);
                return Ok(column);
            }
            // the budget ran out before a single ply was scored
            return Ok(candidates[0]);
        }
        self.searcher.best_among(state, &candidates)
    }

    fn depth(&self) -> u8 {
        self.searcher.depth()
    }
}

/// Searches deep, weighs threats heavily and never plays at random
pub struct Aggressive {
    searcher: Searcher,
}

impl Aggressive {
    pub fn new(searcher: Searcher) -> Self {
        Self { searcher }
    }
}

impl Strategy for Aggressive {
    fn find_best_move(&mut self, state: &GameState) -> Result<usize, SearchError> {
        ensure_playable(state)?;

        if let Some(column) = tactics::immediate_win(state) {
            return Ok(column);
        }
        if let Some(column) = tactics::immediate_threat(state) {
            return Ok(column);
        }
        let candidates = tactics::safe_moves(state);
        if let Some(column) = tactics::fork_move(state, &candidates) {
            debug!("aggressive engine sets up a fork in column {}", column);
            return Ok(column);
        }
        if let Some(column) = tactics::fork_block(state, &candidates) {
            debug!("aggressive engine breaks up an opponent fork with column {}", column);
            return Ok(column);
        }
        self.searcher.best_among(state, &candidates)
    }

    fn depth(&self) -> u8 {
        self.searcher.depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use anyhow::Result;
    use rand::SeedableRng;
    use std::time::{Duration, Instant};

    fn engine(difficulty: Difficulty, seed: u64) -> Box<dyn Strategy> {
        difficulty.strategy(difficulty.searcher(difficulty.depth()), StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_parse_difficulty() {
        assert_eq!("easy".parse::<Difficulty>(), Ok(Difficulty::Permissive));
        assert_eq!(" Medium ".parse::<Difficulty>(), Ok(Difficulty::Balanced));
        assert_eq!("AGGRESSIVE".parse::<Difficulty>(), Ok(Difficulty::Aggressive));
        assert!("impossible".parse::<Difficulty>().is_err());
        for difficulty in Difficulty::ALL {
            assert_eq!(difficulty.to_string().parse::<Difficulty>(), Ok(difficulty));
        }
    }

    #[test]
    fn test_depths_increase_with_difficulty() {
        assert!(Difficulty::Permissive.depth() < Difficulty::Balanced.depth());
        assert!(Difficulty::Balanced.depth() < Difficulty::Aggressive.depth());
        for difficulty in Difficulty::ALL {
            assert!(difficulty.reduced_depth() < difficulty.depth());
            assert_eq!(engine(difficulty, 0).depth(), difficulty.depth());
        }
    }

    #[test]
    fn test_permissive_sometimes_misses_a_block() -> Result<()> {
        // O threatens the bottom row at column 3, X to move
        let state = GameState::from_board(Board::from_rows(&[
            ".......", ".......", ".......", ".......", "X......", "XOOO..X",
        ])?)?;
        let mut blocks = 0;
        let mut misses = 0;
        for seed in 0..200 {
            let searcher = Difficulty::Permissive.searcher(1);
            let mut permissive = Permissive::new(searcher, StdRng::seed_from_u64(seed))
                .with_probabilities(1.0, 0.5);
            if permissive.find_best_move(&state)? == 4 {
                blocks += 1;
            } else {
                misses += 1;
            }
        }
        assert!(blocks > 0 && misses > 0, "{} blocks, {} misses", blocks, misses);
        Ok(())
    }

    #[test]
    fn test_permissive_always_blocks_when_told_to() -> Result<()> {
        let state = GameState::from_board(Board::from_rows(&[
            ".......", ".......", ".......", ".......", "X......", "XOOO..X",
        ])?)?;
        for seed in 0..20 {
            let searcher = Difficulty::Permissive.searcher(2);
            let mut permissive = Permissive::new(searcher, StdRng::seed_from_u64(seed))
                .with_probabilities(1.0, 1.0);
            assert_eq!(permissive.find_best_move(&state)?, 4);
        }
        Ok(())
    }

    #[test]
    fn test_seeded_engines_are_reproducible() -> Result<()> {
        let state = GameState::from_moves("3243")?;
        for difficulty in Difficulty::ALL {
            let first: Vec<usize> = (0..5)
                .map(|seed| engine(difficulty, seed).find_best_move(&state))
                .collect::<Result<_, _>>()?;
            let second: Vec<usize> = (0..5)
                .map(|seed| engine(difficulty, seed).find_best_move(&state))
                .collect::<Result<_, _>>()?;
            assert_eq!(first, second);
        }
        Ok(())
    }

    #[test]
    fn test_balanced_second_best() -> Result<()> {
        let state = GameState::default();
        let searcher = Difficulty::Balanced.searcher(2);
        let mut balanced =
            Balanced::new(searcher, StdRng::seed_from_u64(1)).with_variety_probability(1.0);
        // the center is best on an empty board, so the variety pick is elsewhere
        assert_ne!(balanced.find_best_move(&state)?, 3);
        Ok(())
    }

    #[test]
    fn test_balanced_second_best_keeps_to_the_time_limit() -> Result<()> {
        let state = GameState::default();
        let searcher = Difficulty::Balanced
            .searcher(12)
            .with_time_limit(Duration::from_millis(50));
        let mut balanced =
            Balanced::new(searcher, StdRng::seed_from_u64(1)).with_variety_probability(1.0);
        let start = Instant::now();
        let column = balanced.find_best_move(&state)?;
        assert!(state.is_legal(column));
        assert!(start.elapsed() < Duration::from_secs(1), "took {:?}", start.elapsed());
        Ok(())
    }

    #[test]
    fn test_balanced_creates_a_fork() -> Result<()> {
        let state = GameState::from_board(Board::from_rows(&[
            ".......", ".......", ".......", ".......", ".......", ".XX..OO",
        ])?)?;
        let mut balanced = engine(Difficulty::Balanced, 3);
        assert_eq!(balanced.find_best_move(&state)?, 3);
        Ok(())
    }

    #[test]
    fn test_aggressive_blocks_a_fork() -> Result<()> {
        let state = GameState::from_board(Board::from_rows(&[
            ".......", ".......", ".......", ".......", "......X", ".OO...X",
        ])?)?;
        let mut aggressive = engine(Difficulty::Aggressive, 0);
        let column = aggressive.find_best_move(&state)?;
        let next = state.with_move(column).unwrap();
        assert!((0..7).all(|c| !tactics::creates_fork(next.board(), c, next.to_move())));
        Ok(())
    }

    #[test]
    fn test_game_over_is_an_error() -> Result<()> {
        let state = GameState::from_moves("0101010")?;
        for difficulty in Difficulty::ALL {
            assert_eq!(engine(difficulty, 0).find_best_move(&state), Err(SearchError::GameOver));
        }
        Ok(())
    }
}
