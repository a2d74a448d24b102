use thiserror::Error;

/// Largest number of cells a [`BitGrid`] may address.
pub const MAX_CELLS: usize = u16::MAX as usize;

/// Error when a requested grid shape exceeds [`MAX_CELLS`].
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("bit grid of {rows}x{cols} exceeds the {max} addressable cells", max = MAX_CELLS)]
pub struct CapacityExceeded {
    pub rows: usize,
    pub cols: usize,
}

/// A fixed-shape 2D set of booleans, packed one bit per cell.
///
/// Bit `row * cols + col` lives in byte `index / 8`. A 16x16 grid therefore
/// occupies 32 bytes, which keeps one grid per piece per turn cheap.
///
/// Accessors do not bounds check coordinates against the declared shape.
/// Callers pass only coordinates that were validated on the way in
/// (see [`crate::board::Coord`]).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitGrid {
    bits: Vec<u8>,
    rows: usize,
    cols: usize,
}

impl BitGrid {
    /// Creates an all-false grid of `rows` x `cols` cells.
    pub fn new(rows: usize, cols: usize) -> Result<Self, CapacityExceeded> {
        let cells = rows
            .checked_mul(cols)
            .filter(|&cells| cells <= MAX_CELLS)
            .ok_or(CapacityExceeded { rows, cols })?;
        Ok(Self {
            bits: vec![0; cells.div_ceil(8)],
            rows,
            cols,
        })
    }

    /// Creates an all-false grid whose shape is checked at compile time.
    pub fn fixed<const ROWS: usize, const COLS: usize>() -> Self {
        const { assert!(ROWS * COLS <= MAX_CELLS) };
        Self {
            bits: vec![0; (ROWS * COLS).div_ceil(8)],
            rows: ROWS,
            cols: COLS,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn locate(&self, row: usize, col: usize) -> (usize, u8) {
        debug_assert!(row < self.rows && col < self.cols);
        let index = row * self.cols + col;
        (index / 8, 1 << (index % 8))
    }

    /// Returns whether the cell is set.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        let (block, bit) = self.locate(row, col);
        self.bits[block] & bit != 0
    }

    /// Marks the cell. Setting an already-set cell is a no-op.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize) {
        let (block, bit) = self.locate(row, col);
        self.bits[block] |= bit;
    }

    /// Marks the cell and returns whether it was already set.
    ///
    /// One probe instead of a `get` followed by a `set`; the jump search
    /// uses this as its visited check.
    #[inline]
    pub fn get_and_set(&mut self, row: usize, col: usize) -> bool {
        let (block, bit) = self.locate(row, col);
        let was_set = self.bits[block] & bit != 0;
        self.bits[block] |= bit;
        was_set
    }

    /// Flips the cell.
    #[inline]
    pub fn toggle(&mut self, row: usize, col: usize) {
        let (block, bit) = self.locate(row, col);
        self.bits[block] ^= bit;
    }

    /// Keeps only the cells also set in `mask`.
    ///
    /// Both grids must share the same shape.
    pub fn and_with(&mut self, mask: &BitGrid) {
        debug_assert_eq!((self.rows, self.cols), (mask.rows, mask.cols));
        for (block, other) in self.bits.iter_mut().zip(&mask.bits) {
            *block &= *other;
        }
    }

    /// True if at least one cell is set.
    pub fn any(&self) -> bool {
        self.bits.iter().any(|&block| block != 0)
    }

    /// Number of set cells.
    pub fn count(&self) -> usize {
        self.bits.iter().map(|block| block.count_ones() as usize).sum()
    }

    /// Resets every cell to false.
    pub fn clear_all(&mut self) {
        self.bits.fill(0);
    }

    /// Iterates set cells as `(row, col)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.rows * self.cols)
            .filter(|&index| self.bits[index / 8] & (1 << (index % 8)) != 0)
            .map(|index| (index / self.cols, index % self.cols))
    }
}

impl std::fmt::Debug for BitGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitGrid")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("set", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}
