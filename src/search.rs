//! Depth-limited minimax search with alpha-beta pruning

use log::{debug, warn};
use rayon::prelude::*;

use std::time::{Duration, Instant};

use crate::{
    board::Player,
    error::SearchError,
    evaluator::{Evaluator, Weights},
    game::{GameState, Outcome},
};

/// The score of a won position before the depth bonus is added
pub const WIN_SCORE: i32 = 1_000_000;

const INFINITY: i32 = i32::MAX;

/// Anything that can pick a column for the player to move
///
/// Every difficulty tier and the plain [`Searcher`] implement this, so the
/// thermal selector can hold any of them.
pub trait Strategy: Send {
    /// Picks a legal column for the player to move
    fn find_best_move(&mut self, state: &GameState) -> Result<usize, SearchError>;

    /// The nominal search depth, in plies
    fn depth(&self) -> u8;
}

/// Orders the columns from the middle outwards, as the middle columns are
/// often better moves and trying them first prunes more of the tree
///
/// The column left of center comes before the one to its right.
pub fn move_order(columns: usize) -> Vec<usize> {
    let center = columns / 2;
    let mut order = Vec::with_capacity(columns);
    order.push(center);
    for offset in 1..=center {
        order.push(center - offset);
        if center + offset < columns {
            order.push(center + offset);
        }
    }
    order
}

/// Fails fast on positions that have no move to find
pub fn ensure_playable(state: &GameState) -> Result<(), SearchError> {
    if state.is_game_over() {
        return Err(SearchError::GameOver);
    }
    if state.legal_moves().is_empty() {
        return Err(SearchError::NoLegalMoves);
    }
    Ok(())
}

/// Optional ceilings on a single search on top of the depth bound
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchLimits {
    pub time_limit: Option<Duration>,
    pub node_limit: Option<u64>,
}

impl SearchLimits {
    fn is_bounded(&self) -> bool {
        self.time_limit.is_some() || self.node_limit.is_some()
    }
}

/// Node accounting for one search, `visit` fails once a ceiling is crossed
#[derive(Copy, Clone, Debug)]
struct Budget {
    deadline: Option<Instant>,
    node_limit: Option<u64>,
    nodes: u64,
}

impl Budget {
    fn new(limits: &SearchLimits) -> Self {
        Self {
            deadline: limits.time_limit.map(|limit| Instant::now() + limit),
            node_limit: limits.node_limit,
            nodes: 0,
        }
    }

    fn unbounded() -> Self {
        Self::new(&SearchLimits::default())
    }

    fn visit(&mut self) -> Option<()> {
        self.nodes += 1;
        if self.node_limit.map_or(false, |limit| self.nodes > limit) {
            return None;
        }
        // checking the clock on every node is wasteful, every 1024th is plenty
        if self.nodes % 1024 == 0
            && self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
        {
            return None;
        }
        Some(())
    }
}

/// A minimax engine with a fixed depth and evaluation weights
///
/// # Scoring
/// Scores are from the point of view of the player to move at the root. A
/// forced win scores `WIN_SCORE` plus the plies left unsearched when it is
/// reached, so faster wins score higher; losses mirror this, so slower losses
/// score higher. Draws score 0 and everything else is the evaluator's opinion.
#[derive(Clone, Debug)]
pub struct Searcher {
    depth: u8,
    evaluator: Evaluator,
    limits: SearchLimits,
    parallel: bool,

    /// The number of nodes searched by the last call (for diagnostics only)
    pub node_count: u64,
}

impl Searcher {
    /// Creates a new `Searcher`, a depth of zero is raised to one
    pub fn new(depth: u8, weights: Weights) -> Self {
        Self {
            depth: depth.max(1),
            evaluator: Evaluator::new(weights),
            limits: SearchLimits::default(),
            parallel: false,
            node_count: 0,
        }
    }

    /// Stops searching after `limit` and plays the best move of the deepest finished ply
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.limits.time_limit = Some(limit);
        self
    }

    /// Like [`Searcher::with_time_limit`], counting visited nodes instead of time
    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.limits.node_limit = Some(limit);
        self
    }

    /// Searches each root move on its own rayon task
    ///
    /// The chosen column is the same as a sequential search; only unbounded
    /// searches run in parallel.
    pub fn with_parallel_root(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Picks the best legal column for the player to move
    pub fn find_best_move(&mut self, state: &GameState) -> Result<usize, SearchError> {
        let order = move_order(state.board().columns());
        self.best_among(state, &order)
    }

    /// Picks the best of `candidates`, trying them in the given order
    ///
    /// Illegal candidates are skipped; ties go to the earlier candidate.
    pub fn best_among(
        &mut self,
        state: &GameState,
        candidates: &[usize],
    ) -> Result<usize, SearchError> {
        ensure_playable(state)?;
        let candidates: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&column| state.is_legal(column))
            .collect();
        let first = *candidates.first().ok_or(SearchError::NoLegalMoves)?;

        // a win on this move needs no search
        let player = state.to_move();
        if let Some(&column) = candidates
            .iter()
            .find(|&&column| state.board().is_winning_drop(column, player))
        {
            self.node_count = 0;
            return Ok(column);
        }

        let order = move_order(state.board().columns());
        let (column, score) = if self.limits.is_bounded() {
            self.deepening_search(state, &candidates, &order)
                .unwrap_or((first, 0))
        } else if self.parallel {
            self.parallel_root(state, &candidates, &order, self.depth)
        } else {
            let mut budget = Budget::unbounded();
            let result = self.root(state, &candidates, &order, self.depth, &mut budget);
            self.node_count = budget.nodes;
            result.unwrap_or((first, 0))
        };

        debug!(
            "depth {} search chose column {} (score {}, {} nodes)",
            self.depth, column, score, self.node_count
        );
        Ok(column)
    }

    /// Exact scores of each legal candidate, in candidate order
    ///
    /// Every candidate is searched with a full window, so the scores can be
    /// compared with each other and not just with the best one. Under a time
    /// or node limit the scores come from the deepest ply that finished, and
    /// are empty if not even the first ply did.
    pub fn score_moves(&mut self, state: &GameState, candidates: &[usize]) -> Vec<(usize, i32)> {
        let order = move_order(state.board().columns());

        if !self.limits.is_bounded() {
            let mut budget = Budget::unbounded();
            let scores = self
                .score_ply(state, candidates, &order, self.depth, &mut budget)
                .unwrap_or_default();
            self.node_count = budget.nodes;
            return scores;
        }

        let mut budget = Budget::new(&self.limits);
        let mut scores = Vec::new();
        for depth in 1..=self.depth {
            match self.score_ply(state, candidates, &order, depth, &mut budget) {
                Some(ply) => scores = ply,
                None => {
                    warn!(
                        "scoring budget exhausted after {} nodes, using the depth {} scores",
                        budget.nodes,
                        depth - 1
                    );
                    break;
                }
            }
        }
        self.node_count = budget.nodes;
        scores
    }

    /// The minimax value of `state` for the player to move, searched `depth` plies deep
    pub fn value(&mut self, state: &GameState, depth: u8) -> i32 {
        let order = move_order(state.board().columns());
        let mut budget = Budget::unbounded();
        let player = state.to_move();
        let value = self.minimax(state, depth, player, -INFINITY, INFINITY, &order, &mut budget);
        self.node_count = budget.nodes;
        value.unwrap_or(0)
    }

    /// Searches 1, 2, ... plies deep until the depth bound or a budget runs out
    fn deepening_search(
        &mut self,
        state: &GameState,
        candidates: &[usize],
        order: &[usize],
    ) -> Option<(usize, i32)> {
        let mut budget = Budget::new(&self.limits);
        let mut best = None;
        for depth in 1..=self.depth {
            match self.root(state, candidates, order, depth, &mut budget) {
                Some(result) => best = Some(result),
                None => {
                    warn!(
                        "search budget exhausted after {} nodes, using the depth {} result",
                        budget.nodes,
                        depth - 1
                    );
                    break;
                }
            }
        }
        self.node_count = budget.nodes;
        best
    }

    fn score_ply(
        &self,
        state: &GameState,
        candidates: &[usize],
        order: &[usize],
        depth: u8,
        budget: &mut Budget,
    ) -> Option<Vec<(usize, i32)>> {
        let player = state.to_move();
        let mut scores = Vec::with_capacity(candidates.len());
        for &column in candidates {
            if let Some(child) = state.with_move(column) {
                let score =
                    self.minimax(&child, depth - 1, player, -INFINITY, INFINITY, order, budget)?;
                scores.push((column, score));
            }
        }
        Some(scores)
    }

    fn root(
        &self,
        state: &GameState,
        candidates: &[usize],
        order: &[usize],
        depth: u8,
        budget: &mut Budget,
    ) -> Option<(usize, i32)> {
        let player = state.to_move();
        let mut alpha = -INFINITY;
        let mut best: Option<(usize, i32)> = None;

        for &column in candidates {
            let child = match state.with_move(column) {
                Some(child) => child,
                None => continue,
            };
            let score = self.minimax(&child, depth - 1, player, alpha, INFINITY, order, budget)?;
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((column, score));
            }
            alpha = alpha.max(score);
        }
        best
    }

    fn parallel_root(
        &mut self,
        state: &GameState,
        candidates: &[usize],
        order: &[usize],
        depth: u8,
    ) -> (usize, i32) {
        let player = state.to_move();
        let searcher = &*self;
        // branches share nothing mutable, each gets its own copy of the state
        let scored: Vec<(usize, i32, u64)> = candidates
            .par_iter()
            .filter_map(|&column| {
                let child = state.with_move(column)?;
                let mut budget = Budget::unbounded();
                let score = searcher.minimax(
                    &child,
                    depth - 1,
                    player,
                    -INFINITY,
                    INFINITY,
                    order,
                    &mut budget,
                )?;
                Some((column, score, budget.nodes))
            })
            .collect();

        self.node_count = scored.iter().map(|&(_, _, nodes)| nodes).sum();
        let mut best = (candidates[0], -INFINITY);
        for &(column, score, _) in &scored {
            if score > best.1 {
                best = (column, score);
            }
        }
        best
    }

    /// Performs game tree search
    ///
    /// Returns the score of the position for `maximizer`, or `None` if the
    /// budget ran out part way through.
    #[allow(clippy::too_many_arguments)]
    fn minimax(
        &self,
        state: &GameState,
        depth: u8,
        maximizer: Player,
        mut alpha: i32,
        mut beta: i32,
        order: &[usize],
        budget: &mut Budget,
    ) -> Option<i32> {
        budget.visit()?;

        match state.outcome() {
            Outcome::Won(winner) => {
                let score = WIN_SCORE + depth as i32;
                return Some(if winner == maximizer { score } else { -score });
            }
            Outcome::Draw => return Some(0),
            Outcome::InProgress => {}
        }
        if depth == 0 {
            return Some(self.evaluator.evaluate(state.board(), maximizer));
        }

        let maximizing = state.to_move() == maximizer;
        let mut best = if maximizing { -INFINITY } else { INFINITY };
        for &column in order {
            let child = match state.with_move(column) {
                Some(child) => child,
                None => continue,
            };
            let score = self.minimax(&child, depth - 1, maximizer, alpha, beta, order, budget)?;
            if maximizing {
                best = best.max(score);
                alpha = alpha.max(score);
            } else {
                best = best.min(score);
                beta = beta.min(score);
            }
            // the other player will never allow this line, skip the siblings
            if beta <= alpha {
                break;
            }
        }
        Some(best)
    }
}

impl Strategy for Searcher {
    fn find_best_move(&mut self, state: &GameState) -> Result<usize, SearchError> {
        Searcher::find_best_move(self, state)
    }

    fn depth(&self) -> u8 {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use rand::{rngs::StdRng, seq::IndexedRandom, SeedableRng};

    /// Minimax without pruning, the reference for the alpha-beta search
    fn plain_minimax(
        evaluator: &Evaluator,
        state: &GameState,
        depth: u8,
        maximizer: Player,
    ) -> i32 {
        match state.outcome() {
            Outcome::Won(winner) => {
                let score = WIN_SCORE + depth as i32;
                return if winner == maximizer { score } else { -score };
            }
            Outcome::Draw => return 0,
            Outcome::InProgress => {}
        }
        if depth == 0 {
            return evaluator.evaluate(state.board(), maximizer);
        }
        let scores = state
            .legal_moves()
            .into_iter()
            .filter_map(|column| state.with_move(column))
            .map(|child| plain_minimax(evaluator, &child, depth - 1, maximizer));
        if state.to_move() == maximizer {
            scores.max().unwrap_or(0)
        } else {
            scores.min().unwrap_or(0)
        }
    }

    fn random_position(rng: &mut StdRng, plies: usize) -> GameState {
        let mut state = GameState::default();
        for _ in 0..plies {
            let column = match state.legal_moves().choose(rng) {
                Some(&column) => column,
                None => break,
            };
            match state.with_move(column) {
                Some(next) if !next.is_game_over() => state = next,
                _ => break,
            }
        }
        state
    }

    #[test]
    fn test_move_order() {
        assert_eq!(move_order(7), vec![3, 2, 4, 1, 5, 0, 6]);
        assert_eq!(move_order(6), vec![3, 2, 4, 1, 5, 0]);
        assert_eq!(move_order(1), vec![0]);
    }

    #[test]
    fn test_pruning_preserves_value() {
        let mut rng = StdRng::seed_from_u64(11);
        for weights in [Weights::STANDARD, Weights::AGGRESSIVE] {
            let mut searcher = Searcher::new(4, weights);
            for plies in [0, 3, 6, 9, 12] {
                let state = random_position(&mut rng, plies);
                if state.is_game_over() {
                    continue;
                }
                for depth in 1..=4 {
                    assert_eq!(
                        searcher.value(&state, depth),
                        plain_minimax(searcher.evaluator(), &state, depth, state.to_move()),
                        "value mismatch at depth {} for\n{}",
                        depth,
                        state
                    );
                }
            }
        }
    }

    #[test]
    fn test_root_choice_matches_exact_scores() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..8 {
            let state = random_position(&mut rng, 8);
            if state.is_game_over() {
                continue;
            }
            let mut searcher = Searcher::new(3, Weights::STANDARD);
            let order = move_order(7);
            let scores = searcher.score_moves(&state, &order);
            let best = scores.iter().map(|&(_, score)| score).max().unwrap();
            let expected = scores.iter().find(|&&(_, score)| score == best).unwrap().0;
            // an immediate win short-circuits, which also scores highest
            assert_eq!(searcher.find_best_move(&state).unwrap(), expected);
        }
    }

    #[test]
    fn test_win_and_loss_scores_depend_on_distance() -> Result<()> {
        let mut searcher = Searcher::new(4, Weights::STANDARD);

        // X to move completes column 0 straight away
        let winning = GameState::from_moves("010101")?;
        assert_eq!(searcher.value(&winning, 3), WIN_SCORE + 2);

        // X threatens both ends of a bottom-row three, O cannot stop both
        let losing = GameState::from_moves("15253")?;
        assert_eq!(searcher.value(&losing, 2), -WIN_SCORE);
        assert_eq!(searcher.value(&losing, 4), -(WIN_SCORE + 2));
        Ok(())
    }

    #[test]
    fn test_empty_board_plays_center() -> Result<()> {
        let mut searcher = Searcher::new(4, Weights::STANDARD);
        assert_eq!(searcher.find_best_move(&GameState::default())?, 3);
        Ok(())
    }

    #[test]
    fn test_terminal_state_is_an_error() -> Result<()> {
        let state = GameState::from_moves("0101010")?;
        let mut searcher = Searcher::new(2, Weights::STANDARD);
        assert_eq!(searcher.find_best_move(&state), Err(SearchError::GameOver));
        Ok(())
    }

    #[test]
    fn test_parallel_root_matches_sequential() {
        let mut rng = StdRng::seed_from_u64(23);
        for _ in 0..6 {
            let state = random_position(&mut rng, 10);
            if state.is_game_over() {
                continue;
            }
            let mut sequential = Searcher::new(4, Weights::STANDARD);
            let mut parallel = Searcher::new(4, Weights::STANDARD).with_parallel_root(true);
            assert_eq!(
                sequential.find_best_move(&state).unwrap(),
                parallel.find_best_move(&state).unwrap()
            );
        }
    }

    #[test]
    fn test_node_limit_falls_back_to_a_legal_move() -> Result<()> {
        let state = GameState::from_moves("3344")?;
        let mut searcher = Searcher::new(8, Weights::STANDARD).with_node_limit(50);
        let column = searcher.find_best_move(&state)?;
        assert!(state.is_legal(column));
        assert!(searcher.node_count <= 51);
        Ok(())
    }

    #[test]
    fn test_time_limit_still_answers() -> Result<()> {
        let state = GameState::default();
        let mut searcher =
            Searcher::new(20, Weights::STANDARD).with_time_limit(Duration::from_millis(50));
        let start = Instant::now();
        let column = searcher.find_best_move(&state)?;
        assert!(state.is_legal(column));
        assert!(start.elapsed() < Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn test_score_moves_respects_limits() -> Result<()> {
        let state = GameState::from_moves("3344")?;
        let columns = move_order(7);

        let mut capped = Searcher::new(12, Weights::STANDARD).with_node_limit(500);
        let scores = capped.score_moves(&state, &columns);
        assert_eq!(scores.len(), 7);
        assert!(capped.node_count <= 501);

        let mut timed =
            Searcher::new(14, Weights::STANDARD).with_time_limit(Duration::from_millis(50));
        let start = Instant::now();
        let scores = timed.score_moves(&GameState::default(), &columns);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(scores.len(), 7);
        Ok(())
    }

    #[test]
    fn test_generous_limit_scores_match_unbounded() -> Result<()> {
        let state = GameState::from_moves("2356")?;
        let columns = move_order(7);
        let exact = Searcher::new(3, Weights::STANDARD).score_moves(&state, &columns);
        let bounded = Searcher::new(3, Weights::STANDARD)
            .with_node_limit(10_000_000)
            .score_moves(&state, &columns);
        assert_eq!(exact, bounded);
        Ok(())
    }
}
