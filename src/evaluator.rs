//! Static scoring of positions from one player's point of view

use crate::board::{Board, Cell, Direction, Player};
use crate::CONNECT;

/// The contribution of each kind of window, plus positional bonuses
///
/// Penalties are stored as negative numbers.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Weights {
    /// a completed line
    pub four: i32,
    /// three pieces and a gap
    pub three: i32,
    /// two pieces and two gaps
    pub two: i32,
    /// three opponent pieces and a gap
    pub opponent_three: i32,
    /// two opponent pieces and two gaps
    pub opponent_two: i32,
    /// per piece in the center column(s)
    pub center: i32,
    /// per empty cell that opens two or more lines at once, 0 disables the scan
    pub trap: i32,
}

impl Weights {
    pub const STANDARD: Self = Self {
        four: 100,
        three: 5,
        two: 2,
        opponent_three: -80,
        opponent_two: 0,
        center: 3,
        trap: 0,
    };

    /// Soft on defence, so an opponent's three often goes unanswered
    pub const PERMISSIVE: Self = Self {
        opponent_three: -10,
        ..Self::STANDARD
    };

    pub const BALANCED: Self = Self {
        opponent_three: -20,
        ..Self::STANDARD
    };

    pub const AGGRESSIVE: Self = Self {
        four: 100,
        three: 10,
        two: 3,
        opponent_three: -80,
        opponent_two: -3,
        center: 3,
        trap: 10,
    };

    /// Only counts open threes, for the throttled engine
    pub const LIGHTWEIGHT: Self = Self {
        four: 100,
        three: 5,
        two: 0,
        opponent_three: -8,
        opponent_two: 0,
        center: 0,
        trap: 0,
    };

    fn score(&self, class: WindowClass) -> i32 {
        match class {
            WindowClass::Four => self.four,
            WindowClass::Three => self.three,
            WindowClass::Two => self.two,
            WindowClass::OpponentThree => self.opponent_three,
            WindowClass::OpponentTwo => self.opponent_two,
            WindowClass::Neutral => 0,
        }
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum WindowClass {
    Four,
    Three,
    Two,
    OpponentThree,
    OpponentTwo,
    /// mixed, sparse, or a completed opponent line
    Neutral,
}

impl WindowClass {
    pub fn of(window: &[Cell; CONNECT], player: Player) -> Self {
        let own = Cell::from(player);
        let mine = window.iter().filter(|&&cell| cell == own).count();
        let empty = window.iter().filter(|cell| cell.is_empty()).count();
        let theirs = CONNECT - mine - empty;

        match (mine, theirs, empty) {
            (4, 0, 0) => WindowClass::Four,
            (3, 0, 1) => WindowClass::Three,
            (2, 0, 2) => WindowClass::Two,
            (0, 3, 1) => WindowClass::OpponentThree,
            (0, 2, 2) => WindowClass::OpponentTwo,
            _ => WindowClass::Neutral,
        }
    }
}

/// Scores boards as the sum of their window contributions and positional bonuses
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Evaluator {
    weights: Weights,
}

impl Evaluator {
    pub fn new(weights: Weights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Scores `board` for `player`, higher is better for them
    pub fn evaluate(&self, board: &Board, player: Player) -> i32 {
        let own = Cell::from(player);

        let center = board
            .center_columns()
            .map(|column| {
                (0..board.rows())
                    .filter(|&row| board.get(row, column) == own)
                    .count() as i32
            })
            .sum::<i32>()
            * self.weights.center;

        let windows: i32 = board
            .windows()
            .map(|window| self.weights.score(WindowClass::of(&window, player)))
            .sum();

        let traps = if self.weights.trap != 0 {
            self.trap_cells(board, player) as i32 * self.weights.trap
        } else {
            0
        };

        center + windows + traps
    }

    /// Counts empty cells through which two or more of `player`'s windows are half built
    ///
    /// Filling such a cell turns several twos into threes at once.
    fn trap_cells(&self, board: &Board, player: Player) -> usize {
        let mut traps = 0;
        for row in 0..board.rows() {
            for column in 0..board.columns() {
                if !board.get(row, column).is_empty() {
                    continue;
                }
                let threats = Direction::ALL
                    .into_iter()
                    .flat_map(|direction| {
                        let (dr, dc) = direction.step();
                        (0..CONNECT as isize).filter_map(move |offset| {
                            let r = row as isize - offset * dr;
                            let c = column as isize - offset * dc;
                            board.window(r, c, dr, dc)
                        })
                    })
                    .filter(|window| WindowClass::of(window, player) == WindowClass::Two)
                    .count();
                if threats >= 2 {
                    traps += 1;
                }
            }
        }
        traps
    }
}
