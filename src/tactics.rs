//! One- and two-ply tactical checks used by the difficulty tiers before searching

use crate::{
    board::{Board, Player},
    game::GameState,
    search::move_order,
};

/// Columns where `player` would complete a line by dropping a piece now
pub fn winning_columns(board: &Board, player: Player) -> Vec<usize> {
    (0..board.columns())
        .filter(|&column| board.is_winning_drop(column, player))
        .collect()
}

/// The first column, in search order, that wins the game for the player to move
pub fn immediate_win(state: &GameState) -> Option<usize> {
    let player = state.to_move();
    move_order(state.board().columns())
        .into_iter()
        .find(|&column| state.is_legal(column) && state.board().is_winning_drop(column, player))
}

/// The first column, in search order, where the opponent would win next turn
pub fn immediate_threat(state: &GameState) -> Option<usize> {
    let opponent = state.to_move().opponent();
    move_order(state.board().columns())
        .into_iter()
        .find(|&column| state.is_legal(column) && state.board().is_winning_drop(column, opponent))
}

/// Would dropping into `column` leave `player` with two or more winning drops?
///
/// The opponent can only fill one of them, so such a move wins by force
/// unless the opponent has a win of their own first.
pub fn creates_fork(board: &Board, column: usize, player: Player) -> bool {
    let mut next = board.clone();
    if next.drop_piece(column, player).is_none() {
        return false;
    }
    winning_columns(&next, player).len() >= 2
}

/// Legal columns, in search order, after which the opponent cannot win at once
///
/// A move that wins the game is always safe. If every move hands the
/// opponent a win, all legal columns are returned so there is still a choice.
pub fn safe_moves(state: &GameState) -> Vec<usize> {
    let legal: Vec<usize> = move_order(state.board().columns())
        .into_iter()
        .filter(|&column| state.is_legal(column))
        .collect();
    let opponent = state.to_move().opponent();

    let safe: Vec<usize> = legal
        .iter()
        .copied()
        .filter(|&column| match state.with_move(column) {
            Some(next) if next.is_game_over() => true,
            Some(next) => winning_columns(next.board(), opponent).is_empty(),
            None => false,
        })
        .collect();

    if safe.is_empty() {
        legal
    } else {
        safe
    }
}

/// The first of `candidates` that sets up a fork for the player to move
pub fn fork_move(state: &GameState, candidates: &[usize]) -> Option<usize> {
    let player = state.to_move();
    candidates
        .iter()
        .copied()
        .find(|&column| state.is_legal(column) && creates_fork(state.board(), column, player))
}

/// A reply that takes away the opponent's fork, if they have one available
///
/// Prefers the first candidate after which the opponent has no fork left at
/// all; failing that, occupies one of the opponent's fork columns.
pub fn fork_block(state: &GameState, candidates: &[usize]) -> Option<usize> {
    let opponent = state.to_move().opponent();
    let forks_for = |board: &Board| -> Vec<usize> {
        (0..board.columns())
            .filter(|&column| creates_fork(board, column, opponent))
            .collect()
    };

    let threats = forks_for(state.board());
    if threats.is_empty() {
        return None;
    }

    candidates
        .iter()
        .copied()
        .find(|&column| match state.with_move(column) {
            Some(next) => next.is_game_over() || forks_for(next.board()).is_empty(),
            None => false,
        })
        .or_else(|| candidates.iter().copied().find(|column| threats.contains(column)))
}
