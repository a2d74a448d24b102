use crate::board::Coord;
use crate::movegen::{MoveSet, MoveTable};

/// Type of highlight for an individual cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellFeedback {
    /// A piece of the active color that can move this turn
    Movable,
    /// The picked-up piece
    Origin,
    /// Legal destination of the picked-up piece
    Target,
}

/// Cells to highlight for the current turn and how.
///
/// Computed by [`compute_feedback`] and consumed by whatever front end draws
/// the board. Holds data only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoardFeedback {
    cells: Vec<(Coord, CellFeedback)>,
}

impl BoardFeedback {
    /// Create empty feedback (no highlights)
    #[inline]
    pub const fn new() -> Self {
        Self { cells: Vec::new() }
    }

    #[inline]
    pub fn cells(&self) -> &[(Coord, CellFeedback)] {
        &self.cells
    }

    /// Get feedback for a specific cell, if any
    #[inline]
    pub fn get(&self, coord: Coord) -> Option<CellFeedback> {
        self.cells
            .iter()
            .find(|(c, _)| *c == coord)
            .map(|(_, feedback)| *feedback)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl From<Vec<(Coord, CellFeedback)>> for BoardFeedback {
    fn from(cells: Vec<(Coord, CellFeedback)>) -> Self {
        Self { cells }
    }
}

/// Turn state needed to compute feedback
pub trait FeedbackSource {
    /// Move table of the color to move
    fn table(&self) -> &MoveTable;

    /// Table index of the picked-up piece
    fn selection(&self) -> Option<usize>;
}

/// Compute highlights for the current turn.
///
/// - Nothing selected: every piece that can move
/// - Piece selected: that piece and all of its destinations
pub fn compute_feedback(source: &impl FeedbackSource) -> BoardFeedback {
    let table = source.table();
    match source.selection().and_then(|index| table.get(index)) {
        Some(set) => show_targets_for(set),
        None => show_movable(table),
    }
}

fn show_movable(table: &MoveTable) -> BoardFeedback {
    table
        .iter()
        .filter(|set| !set.is_immobile())
        .map(|set| (set.origin(), CellFeedback::Movable))
        .collect::<Vec<_>>()
        .into()
}

fn show_targets_for(set: &MoveSet) -> BoardFeedback {
    std::iter::once((set.origin(), CellFeedback::Origin))
        .chain(set.destinations().map(|to| (to, CellFeedback::Target)))
        .collect::<Vec<_>>()
        .into()
}
