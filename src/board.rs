use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::bitgrid::BitGrid;

/// Edge length of the square board.
pub const BOARD_SIZE: usize = 16;

/// A player's piece color.
///
/// Discriminants are the values stored in save files; an empty cell is `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    Red = 1,
    Yellow = 2,
    Blue = 3,
    Green = 4,
}

impl Color {
    /// Seating order. Turn `n` belongs to `SEATS[n % players]`.
    pub const SEATS: [Color; 4] = [Color::Red, Color::Yellow, Color::Blue, Color::Green];

    /// The color sitting in the opposite corner.
    #[inline]
    pub const fn partner(self) -> Color {
        match self {
            Color::Red => Color::Yellow,
            Color::Yellow => Color::Red,
            Color::Blue => Color::Green,
            Color::Green => Color::Blue,
        }
    }

    /// Single-letter tag used in board diagrams.
    pub const fn char(self) -> char {
        match self {
            Color::Red => 'R',
            Color::Yellow => 'Y',
            Color::Blue => 'B',
            Color::Green => 'G',
        }
    }

    pub fn from_char(ch: char) -> Option<Color> {
        match ch.to_ascii_uppercase() {
            'R' => Some(Color::Red),
            'Y' => Some(Color::Yellow),
            'B' => Some(Color::Blue),
            'G' => Some(Color::Green),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Color {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Color::Red),
            2 => Ok(Color::Yellow),
            3 => Ok(Color::Blue),
            4 => Ok(Color::Green),
            other => Err(other),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Red => "Red",
            Color::Yellow => "Yellow",
            Color::Blue => "Blue",
            Color::Green => "Green",
        };
        f.write_str(name)
    }
}

/// Number of players seated in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Players {
    Two = 2,
    Four = 4,
}

impl Players {
    #[inline]
    pub const fn count(self) -> usize {
        self as usize
    }

    /// Pieces each player starts with.
    pub const fn pieces_per_player(self) -> u8 {
        match self {
            Players::Two => 19,
            Players::Four => 13,
        }
    }

    /// Colors in play, in seating order.
    pub fn seats(self) -> &'static [Color] {
        &Color::SEATS[..self.count()]
    }

    pub fn is_seated(self, color: Color) -> bool {
        self.seats().contains(&color)
    }
}

impl TryFrom<u8> for Players {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Players::Two),
            4 => Ok(Players::Four),
            other => Err(other),
        }
    }
}

/// A cell on the board, `y` is the row and `x` the column.
///
/// Coordinates are validated on construction so everything downstream may
/// index the board and bit grids without further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    y: u8,
    x: u8,
}

impl Coord {
    /// Creates a coordinate if it lies on the board.
    pub const fn new(y: usize, x: usize) -> Option<Self> {
        if y < BOARD_SIZE && x < BOARD_SIZE {
            Some(Self {
                y: y as u8,
                x: x as u8,
            })
        } else {
            None
        }
    }

    #[inline]
    pub const fn y(self) -> usize {
        self.y as usize
    }

    #[inline]
    pub const fn x(self) -> usize {
        self.x as usize
    }

    /// The coordinate `dy` rows and `dx` columns away, if still on the board.
    #[inline]
    pub fn offset(self, dy: isize, dx: isize) -> Option<Self> {
        let y = self.y().checked_add_signed(dy)?;
        let x = self.x().checked_add_signed(dx)?;
        Self::new(y, x)
    }

    /// Landing cell of a jump from `self` over `over`: one step past it, in line.
    #[inline]
    pub fn reflect_over(self, over: Coord) -> Option<Self> {
        let dy = over.y() as isize - self.y() as isize;
        let dx = over.x() as isize - self.x() as isize;
        over.offset(dy, dx)
    }

    /// The up to eight surrounding cells, clipped to the board, row-major.
    pub fn neighbors(self) -> impl Iterator<Item = Coord> {
        (-1isize..=1)
            .flat_map(|dy| (-1isize..=1).map(move |dx| (dy, dx)))
            .filter(|&offset| offset != (0, 0))
            .filter_map(move |(dy, dx)| self.offset(dy, dx))
    }

    /// Every cell on the board in row-major order.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE).flat_map(|y| (0..BOARD_SIZE).filter_map(move |x| Coord::new(y, x)))
    }
}

/// Parse the two hex digit notation, column first: `"3a"` is x=3, y=10.
///
/// # Examples
/// ```
/// # use halma::board::Coord;
/// let coord: Coord = "3a".parse().unwrap();
/// assert_eq!((coord.y(), coord.x()), (10, 3));
/// ```
impl FromStr for Coord {
    type Err = CoordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut digits = s.trim().chars();
        let (Some(x), Some(y), None) = (digits.next(), digits.next(), digits.next()) else {
            return Err(CoordParseError::WrongLength);
        };
        let x = x.to_digit(16).ok_or(CoordParseError::BadDigit(x))?;
        let y = y.to_digit(16).ok_or(CoordParseError::BadDigit(y))?;
        Coord::new(y as usize, x as usize).ok_or(CoordParseError::OffBoard)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}{:x}", self.x, self.y)
    }
}

/// Error type for parsing coordinate notation.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CoordParseError {
    #[error("coordinate must be 2 hex digits, column then row (e.g. '3a')")]
    WrongLength,
    #[error("'{0}' is not a hex digit")]
    BadDigit(char),
    #[error("coordinate is off the board")]
    OffBoard,
}

type Cells = [[Option<Color>; BOARD_SIZE]; BOARD_SIZE];

/// The live piece grid.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Board {
    cells: Cells,
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl Board {
    pub const fn empty() -> Self {
        Self {
            cells: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Starting layout: each seated color fills a staircase in its corner.
    ///
    /// Red starts top-left, Yellow bottom-right, Green top-right and Blue
    /// bottom-left. The layout is symmetric under a half turn.
    pub fn starting(players: Players) -> Self {
        let depth: usize = match players {
            Players::Two => 5,
            Players::Four => 4,
        };
        let far = BOARD_SIZE - 1;
        let mut board = Self::empty();
        for row in 0..depth {
            for col in 0..=(depth - 1).min(depth - row) {
                board.cells[row][col] = Some(Color::Red);
                board.cells[far - row][far - col] = Some(Color::Yellow);
                if players == Players::Four {
                    board.cells[row][far - col] = Some(Color::Green);
                    board.cells[far - row][col] = Some(Color::Blue);
                }
            }
        }
        board
    }

    #[inline]
    pub fn get(&self, coord: Coord) -> Option<Color> {
        self.cells[coord.y()][coord.x()]
    }

    #[inline]
    pub fn is_empty(&self, coord: Coord) -> bool {
        self.get(coord).is_none()
    }

    #[inline]
    pub fn set(&mut self, coord: Coord, piece: Option<Color>) {
        self.cells[coord.y()][coord.x()] = piece;
    }

    /// Number of pieces of `color` on the board.
    pub fn count(&self, color: Color) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|&&cell| cell == Some(color))
            .count()
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Coord, Option<Color>)> + '_ {
        Coord::all().map(|coord| (coord, self.get(coord)))
    }
}

fn write_cells(f: &mut fmt::Formatter<'_>, cells: &Cells) -> fmt::Result {
    for row in cells {
        for cell in row {
            let ch = cell.map_or('.', Color::char);
            write!(f, "{ch}")?;
        }
        writeln!(f)?;
    }
    Ok(())
}

/// Board diagram: one line per row, `.` for empty, `R`/`Y`/`B`/`G` for pieces.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_cells(f, &self.cells)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board")?;
        write_cells(f, &self.cells)
    }
}

/// Parse a board diagram as produced by [`Board`]'s `Display`.
///
/// Blank lines are skipped and whitespace inside a row is ignored.
impl FromStr for Board {
    type Err = BoardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut board = Board::empty();
        let mut rows = 0;
        for line in s.lines().filter(|line| !line.trim().is_empty()) {
            if rows == BOARD_SIZE {
                return Err(BoardParseError::RowCount(rows + 1));
            }
            let mut len = 0;
            for ch in line.chars().filter(|ch| !ch.is_whitespace()) {
                let cell = match ch {
                    '.' => None,
                    _ => Some(Color::from_char(ch).ok_or(BoardParseError::BadCell(ch))?),
                };
                if len < BOARD_SIZE {
                    board.cells[rows][len] = cell;
                }
                len += 1;
            }
            if len != BOARD_SIZE {
                return Err(BoardParseError::RowLength { row: rows, len });
            }
            rows += 1;
        }
        if rows != BOARD_SIZE {
            return Err(BoardParseError::RowCount(rows));
        }
        Ok(board)
    }
}

/// Error type for parsing board diagrams.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum BoardParseError {
    #[error("board must have {size} rows, found {0}", size = BOARD_SIZE)]
    RowCount(usize),
    #[error("row {row} has {len} cells, expected {size}", size = BOARD_SIZE)]
    RowLength { row: usize, len: usize },
    #[error("'{0}' is not a cell, expected '.', 'R', 'Y', 'B' or 'G'")]
    BadCell(char),
}

/// Which color's home zone each cell belongs to.
///
/// Computed once from the starting layout and never from live occupancy.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct VictoryMask {
    owners: Cells,
}

impl VictoryMask {
    /// Each occupied cell of the initial layout becomes the home of its
    /// occupant's partner, which for the half-turn symmetric layouts is the
    /// color sitting diagonally opposite.
    pub fn from_initial(board: &Board) -> Self {
        let mut owners = [[None; BOARD_SIZE]; BOARD_SIZE];
        for (coord, cell) in board.cells() {
            owners[coord.y()][coord.x()] = cell.map(Color::partner);
        }
        Self { owners }
    }

    pub(crate) fn from_owners(owners: [[Option<Color>; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self { owners }
    }

    /// The color whose home zone contains `coord`, if any.
    #[inline]
    pub fn owner(&self, coord: Coord) -> Option<Color> {
        self.owners[coord.y()][coord.x()]
    }

    /// Home zone of `color` as a bit grid.
    pub fn zone(&self, color: Color) -> BitGrid {
        let mut zone = BitGrid::fixed::<BOARD_SIZE, BOARD_SIZE>();
        for coord in Coord::all().filter(|&coord| self.owner(coord) == Some(color)) {
            zone.set(coord.y(), coord.x());
        }
        zone
    }

    /// Owners in row-major order.
    pub fn owners(&self) -> impl Iterator<Item = (Coord, Option<Color>)> + '_ {
        Coord::all().map(|coord| (coord, self.owner(coord)))
    }
}

impl fmt::Debug for VictoryMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "VictoryMask")?;
        write_cells(f, &self.owners)
    }
}

/// Whether `color` has completed its home zone.
///
/// Every cell of the zone must be occupied, at least one by `color`, and the
/// occupants must number exactly `pieces_per_player`. Stray opposing pieces
/// may fill the rest of the zone.
pub fn check_victory(
    board: &Board,
    mask: &VictoryMask,
    color: Color,
    pieces_per_player: u8,
) -> bool {
    let mut own = 0;
    let mut other = 0;
    for (coord, _) in mask.owners().filter(|&(_, owner)| owner == Some(color)) {
        match board.get(coord) {
            None => return false,
            Some(piece) if piece == color => own += 1,
            Some(_) => other += 1,
        }
    }
    own > 0 && own + other == usize::from(pieces_per_player)
}
