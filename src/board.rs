use anyhow::{anyhow, Result};

use std::fmt;

use crate::CONNECT;

/// One of the two contestants
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    pub fn symbol(self) -> char {
        Cell::from(self).symbol()
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::One => write!(f, "Player 1"),
            Player::Two => write!(f, "Player 2"),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Cell {
    Empty,
    PlayerOne,
    PlayerTwo,
}

impl Cell {
    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn player(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::PlayerOne => Some(Player::One),
            Cell::PlayerTwo => Some(Player::Two),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::PlayerOne => 'X',
            Cell::PlayerTwo => 'O',
        }
    }

    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Cell::Empty),
            'X' | 'x' => Some(Cell::PlayerOne),
            'O' | 'o' => Some(Cell::PlayerTwo),
            _ => None,
        }
    }
}

impl From<Player> for Cell {
    fn from(player: Player) -> Self {
        match player {
            Player::One => Cell::PlayerOne,
            Player::Two => Cell::PlayerTwo,
        }
    }
}

/// The four line directions, in the order wins are checked
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Direction {
    Horizontal,
    Vertical,
    /// bottom-left to top-right
    DiagonalUp,
    /// top-left to bottom-right
    DiagonalDown,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Horizontal,
        Direction::Vertical,
        Direction::DiagonalUp,
        Direction::DiagonalDown,
    ];

    /// (row step, column step), rows are counted from the top
    pub fn step(self) -> (isize, isize) {
        match self {
            Direction::Horizontal => (0, 1),
            Direction::Vertical => (1, 0),
            Direction::DiagonalUp => (-1, 1),
            Direction::DiagonalDown => (1, 1),
        }
    }
}

/// A grid of cells, row 0 is the top of the board
///
/// Pieces only enter through [`Board::drop_piece`], so every occupied cell
/// rests on the bottom row or on another piece.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Board {
    rows: usize,
    columns: usize,
    cells: Vec<Cell>, // cells are stored row by row, top to bottom
}

impl Board {
    /// Creates an empty board
    ///
    /// # Panics
    /// Panics if either dimension is zero.
    pub fn new(rows: usize, columns: usize) -> Self {
        assert!(rows > 0 && columns > 0, "board dimensions must be non-zero");
        Self {
            rows,
            columns,
            cells: vec![Cell::Empty; rows * columns],
        }
    }

    /// Parses a board drawn with `.`, `X` and `O`, one string per row from the top
    ///
    /// Whitespace inside a row is ignored, so the output of `Display` parses back.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let parsed = rows
            .iter()
            .map(|row| {
                row.as_ref()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| Cell::from_symbol(c).ok_or_else(|| anyhow!("unknown cell '{}'", c)))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let columns = parsed.first().map_or(0, Vec::len);
        if columns == 0 {
            return Err(anyhow!("board must have at least one row and one column"));
        }
        if parsed.iter().any(|row| row.len() != columns) {
            return Err(anyhow!("all rows must have {} cells", columns));
        }

        let board = Self {
            rows: parsed.len(),
            columns,
            cells: parsed.into_iter().flatten().collect(),
        };
        if !board.satisfies_gravity() {
            return Err(anyhow!("invalid position, a piece is floating above an empty cell"));
        }
        Ok(board)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn get(&self, row: usize, column: usize) -> Cell {
        self.cells[row * self.columns + column]
    }

    /// Like [`Board::get`], but `None` for coordinates off the board
    pub fn cell_at(&self, row: isize, column: isize) -> Option<Cell> {
        if row < 0 || column < 0 || row as usize >= self.rows || column as usize >= self.columns {
            return None;
        }
        Some(self.get(row as usize, column as usize))
    }

    /// A column is full when its top cell is taken; out of range columns count as full
    pub fn is_column_full(&self, column: usize) -> bool {
        column >= self.columns || !self.get(0, column).is_empty()
    }

    pub fn is_full(&self) -> bool {
        (0..self.columns).all(|column| self.is_column_full(column))
    }

    /// The row a piece dropped in `column` would land on
    pub fn landing_row(&self, column: usize) -> Option<usize> {
        if self.is_column_full(column) {
            return None;
        }
        (0..self.rows).rev().find(|&row| self.get(row, column).is_empty())
    }

    /// Drops a piece into `column`, returning the row it landed on
    pub fn drop_piece(&mut self, column: usize, player: Player) -> Option<usize> {
        let row = self.landing_row(column)?;
        self.cells[row * self.columns + column] = player.into();
        Some(row)
    }

    /// Columns that still have room, left to right
    pub fn open_columns(&self) -> Vec<usize> {
        (0..self.columns)
            .filter(|&column| !self.is_column_full(column))
            .collect()
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// The column(s) holding the middle of the board: one for odd widths, two for even
    pub fn center_columns(&self) -> std::ops::RangeInclusive<usize> {
        if self.columns % 2 == 1 {
            self.columns / 2..=self.columns / 2
        } else {
            self.columns / 2 - 1..=self.columns / 2
        }
    }

    /// Checks whether a `player` piece at (row, column) completes a line,
    /// returning the first direction found in check order
    ///
    /// The cell itself is treated as belonging to `player`, so this also
    /// answers "would this drop win?" without touching the board.
    pub fn line_through(&self, row: usize, column: usize, player: Player) -> Option<Direction> {
        let piece = Cell::from(player);
        Direction::ALL.into_iter().find(|&direction| {
            let (dr, dc) = direction.step();
            let mut run = 1;
            for sign in [-1isize, 1] {
                let (mut r, mut c) = (row as isize + sign * dr, column as isize + sign * dc);
                while self.cell_at(r, c) == Some(piece) {
                    run += 1;
                    r += sign * dr;
                    c += sign * dc;
                }
            }
            run >= CONNECT
        })
    }

    /// Would `player` complete a line by dropping into `column` right now?
    pub fn is_winning_drop(&self, column: usize, player: Player) -> bool {
        self.landing_row(column)
            .map_or(false, |row| self.line_through(row, column, player).is_some())
    }

    /// Scans the whole board for a completed line
    pub fn find_winner(&self) -> Option<(Player, Direction)> {
        Direction::ALL.into_iter().find_map(|direction| {
            self.windows_in(direction).find_map(|window| {
                let player = window[0].player()?;
                window
                    .iter()
                    .all(|&cell| cell == window[0])
                    .then_some((player, direction))
            })
        })
    }

    /// Every run of [`CONNECT`] consecutive cells, grouped by direction in check order
    pub fn windows(&self) -> impl Iterator<Item = [Cell; CONNECT]> + '_ {
        Direction::ALL
            .into_iter()
            .flat_map(move |direction| self.windows_in(direction))
    }

    fn windows_in(&self, direction: Direction) -> impl Iterator<Item = [Cell; CONNECT]> + '_ {
        let (dr, dc) = direction.step();
        (0..self.rows).flat_map(move |row| {
            (0..self.columns).filter_map(move |column| {
                self.window(row as isize, column as isize, dr, dc)
            })
        })
    }

    /// The window starting at (row, column) and extending along (dr, dc), if it fits
    pub(crate) fn window(
        &self,
        row: isize,
        column: isize,
        dr: isize,
        dc: isize,
    ) -> Option<[Cell; CONNECT]> {
        let mut window = [Cell::Empty; CONNECT];
        for (i, slot) in window.iter_mut().enumerate() {
            *slot = self.cell_at(row + dr * i as isize, column + dc * i as isize)?;
        }
        Some(window)
    }

    /// True if no piece sits above an empty cell
    pub fn satisfies_gravity(&self) -> bool {
        (0..self.columns).all(|column| {
            (1..self.rows).all(|row| {
                self.get(row - 1, column).is_empty() || !self.get(row, column).is_empty()
            })
        })
    }

    /// The board reflected left to right
    pub fn mirrored(&self) -> Self {
        let mut mirror = self.clone();
        for row in 0..self.rows {
            for column in 0..self.columns {
                mirror.cells[row * self.columns + column] =
                    self.get(row, self.columns - 1 - column);
            }
        }
        mirror
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(crate::DEFAULT_ROWS, crate::DEFAULT_COLUMNS)
    }
}

/// Renders rows top to bottom, followed by a column legend
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            let line: Vec<String> = (0..self.columns)
                .map(|column| self.get(row, column).symbol().to_string())
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        let legend: Vec<String> = (0..self.columns).map(|column| column.to_string()).collect();
        write!(f, "{}", legend.join(" "))
    }
}
