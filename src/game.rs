use anyhow::{anyhow, Result};

use std::fmt;

use crate::board::{Board, Cell, Player};
use crate::{DEFAULT_COLUMNS, DEFAULT_ROWS};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Outcome {
    InProgress,
    Won(Player),
    Draw,
}

impl Outcome {
    pub fn is_over(self) -> bool {
        !matches!(self, Outcome::InProgress)
    }
}

/// A board together with whose turn it is and how the game stands
///
/// The outcome is computed once when a move is made, so reading it is free.
/// Search explores hypothetical futures on clones and never on the real game.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct GameState {
    board: Board,
    to_move: Player,
    move_count: usize,
    last_move: Option<(usize, usize)>,
    outcome: Outcome,
}

impl GameState {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            board: Board::new(rows, columns),
            to_move: Player::One,
            move_count: 0,
            last_move: None,
            outcome: Outcome::InProgress,
        }
    }

    /// Replays a string of zero-based column digits on a default board
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self> {
        let mut state = Self::default();

        for column_char in moves.as_ref().chars() {
            match column_char.to_digit(10) {
                Some(column) => {
                    state.play_checked(column as usize)?;
                }
                _ => return Err(anyhow!("could not parse '{}' as a valid move", column_char)),
            }
        }
        Ok(state)
    }

    /// Wraps an existing position, inferring the player to move from the piece counts
    ///
    /// Player one always moves first, so they hold either as many pieces as
    /// player two (and are to move) or exactly one more.
    pub fn from_board(board: Board) -> Result<Self> {
        if !board.satisfies_gravity() {
            return Err(anyhow!("invalid position, a piece is floating above an empty cell"));
        }
        let ones = board.count(Cell::PlayerOne);
        let twos = board.count(Cell::PlayerTwo);
        let to_move = if ones == twos {
            Player::One
        } else if ones == twos + 1 {
            Player::Two
        } else {
            return Err(anyhow!(
                "invalid position, player 1 has {} pieces and player 2 has {}",
                ones,
                twos
            ));
        };

        let outcome = match board.find_winner() {
            Some((winner, _)) => Outcome::Won(winner),
            None if board.is_full() => Outcome::Draw,
            None => Outcome::InProgress,
        };

        Ok(Self {
            board,
            to_move,
            move_count: ones + twos,
            last_move: None,
            outcome,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn to_move(&self) -> Player {
        self.to_move
    }

    pub fn move_count(&self) -> usize {
        self.move_count
    }

    /// (row, column) of the most recent piece
    pub fn last_move(&self) -> Option<(usize, usize)> {
        self.last_move
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome.is_over()
    }

    pub fn is_legal(&self, column: usize) -> bool {
        !self.is_game_over() && !self.board.is_column_full(column)
    }

    /// Legal columns left to right, empty once the game is over
    pub fn legal_moves(&self) -> Vec<usize> {
        if self.is_game_over() {
            return Vec::new();
        }
        self.board.open_columns()
    }

    /// Drops the current player's piece into `column`
    ///
    /// Returns false without changing anything if the column is out of
    /// range, full, or the game has already ended.
    pub fn make_move(&mut self, column: usize) -> bool {
        if self.is_game_over() {
            return false;
        }
        let mover = self.to_move;
        let row = match self.board.drop_piece(column, mover) {
            Some(row) => row,
            None => return false,
        };

        self.move_count += 1;
        self.last_move = Some((row, column));
        self.to_move = mover.opponent();
        self.outcome = if self.board.line_through(row, column, mover).is_some() {
            Outcome::Won(mover)
        } else if self.board.is_full() {
            Outcome::Draw
        } else {
            Outcome::InProgress
        };
        true
    }

    /// A copy of this state with `column` played, if it is legal
    pub fn with_move(&self, column: usize) -> Option<Self> {
        let mut next = self.clone();
        next.make_move(column).then_some(next)
    }

    /// Like [`GameState::make_move`], with a message explaining a rejected move
    pub fn play_checked(&mut self, column: usize) -> Result<Outcome> {
        if self.is_game_over() {
            return Err(anyhow!("Invalid move, the game is already over"));
        }
        if column >= self.board.columns() {
            return Err(anyhow!(
                "Invalid move, column {} out of range. Columns must be between 0 and {}",
                column,
                self.board.columns() - 1
            ));
        }
        if !self.make_move(column) {
            return Err(anyhow!("Invalid move, column {} full", column));
        }
        Ok(self.outcome)
    }

    /// Clears the board, keeping its dimensions
    pub fn reset(&mut self) {
        *self = Self::new(self.board.rows(), self.board.columns());
    }

    /// The same position reflected left to right
    pub fn mirrored(&self) -> Self {
        let columns = self.board.columns();
        Self {
            board: self.board.mirrored(),
            last_move: self.last_move.map(|(row, column)| (row, columns - 1 - column)),
            ..self.clone()
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLUMNS)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board)
    }
}

/// Starts a game on an empty `rows` x `columns` board with player one to move
pub fn new_game(rows: usize, columns: usize) -> GameState {
    GameState::new(rows, columns)
}

pub fn legal_moves(state: &GameState) -> Vec<usize> {
    state.legal_moves()
}

pub fn apply_move(state: &mut GameState, column: usize) -> bool {
    state.make_move(column)
}

pub fn check_outcome(state: &GameState) -> Outcome {
    state.outcome()
}
