use log::debug;

use crate::bitgrid::BitGrid;
use crate::board::{BOARD_SIZE, Board, Color, Coord, VictoryMask};

/// Legal destinations of one piece for the current turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveSet {
    origin: Coord,
    targets: BitGrid,
}

impl MoveSet {
    #[inline]
    pub fn origin(&self) -> Coord {
        self.origin
    }

    #[inline]
    pub fn targets(&self) -> &BitGrid {
        &self.targets
    }

    /// Whether the piece may move to `target` this turn.
    #[inline]
    pub fn contains(&self, target: Coord) -> bool {
        self.targets.get(target.y(), target.x())
    }

    /// A piece with no destination stays in the table but cannot be moved.
    #[inline]
    pub fn is_immobile(&self) -> bool {
        !self.targets.any()
    }

    /// Destinations in row-major order.
    pub fn destinations(&self) -> impl Iterator<Item = Coord> + '_ {
        self.targets.iter().filter_map(|(y, x)| Coord::new(y, x))
    }
}

/// One [`MoveSet`] per piece of a color, in row-major order of the origins.
///
/// The order is what maps a selected cell back to its entry. Tables are
/// rebuilt from scratch whenever the board or the active color changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveTable {
    color: Color,
    sets: Vec<MoveSet>,
}

impl MoveTable {
    /// The color this table was generated for.
    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&MoveSet> {
        self.sets.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MoveSet> {
        self.sets.iter()
    }

    /// Index of the entry whose piece stands on `origin`.
    pub fn position(&self, origin: Coord) -> Option<usize> {
        self.sets.binary_search_by_key(&origin, MoveSet::origin).ok()
    }

    /// True if at least one piece has a destination.
    pub fn has_any_move(&self) -> bool {
        self.sets.iter().any(|set| !set.is_immobile())
    }
}

/// Builds the move table for every piece of `color`.
///
/// Each piece may step to any empty neighbor or follow a chain of jumps,
/// each over one adjacent occupied cell onto the empty cell directly
/// behind it. A piece already standing in its own home zone may only
/// end its move inside that zone.
pub fn generate(board: &Board, mask: &VictoryMask, color: Color) -> MoveTable {
    let home = mask.zone(color);
    let sets: Vec<MoveSet> = board
        .cells()
        .filter(|&(_, cell)| cell == Some(color))
        .map(|(origin, _)| {
            let mut targets = BitGrid::fixed::<BOARD_SIZE, BOARD_SIZE>();
            search_steps(board, origin, &mut targets);
            search_jumps(board, origin, &mut targets);
            if mask.owner(origin) == Some(color) && targets.any() {
                targets.and_with(&home);
            }
            MoveSet { origin, targets }
        })
        .collect();

    debug!(
        "generated moves for {color}: {} pieces, {} movable",
        sets.len(),
        sets.iter().filter(|set| !set.is_immobile()).count()
    );
    MoveTable { color, sets }
}

fn search_steps(board: &Board, origin: Coord, targets: &mut BitGrid) {
    for step in origin.neighbors().filter(|&n| board.is_empty(n)) {
        targets.set(step.y(), step.x());
    }
}

/// Marks every landing cell reachable by a chain of jumps from `origin`.
///
/// A landing is pushed only the first time it is marked, so each cell is
/// expanded at most once and jump cycles terminate. Landings sit an even
/// number of rows and columns away from the origin and therefore never
/// coincide with the step cells already marked.
fn search_jumps(board: &Board, origin: Coord, targets: &mut BitGrid) {
    let mut pending = vec![origin];
    while let Some(from) = pending.pop() {
        for over in from.neighbors().filter(|&n| !board.is_empty(n)) {
            let Some(landing) = from.reflect_over(over) else {
                continue;
            };
            if board.is_empty(landing) && !targets.get_and_set(landing.y(), landing.x()) {
                pending.push(landing);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Players;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;
    use test_case::test_case;

    fn coord(y: usize, x: usize) -> Coord {
        Coord::new(y, x).unwrap()
    }

    fn board_with(pieces: &[(usize, usize, Color)]) -> Board {
        let mut board = Board::empty();
        for &(y, x, color) in pieces {
            board.set(coord(y, x), Some(color));
        }
        board
    }

    fn no_zones() -> VictoryMask {
        VictoryMask::from_initial(&Board::empty())
    }

    fn two_player_mask() -> VictoryMask {
        VictoryMask::from_initial(&Board::starting(Players::Two))
    }

    fn destinations(table: &MoveTable, origin: Coord) -> BTreeSet<Coord> {
        let index = table.position(origin).expect("piece should be in table");
        table.get(index).unwrap().destinations().collect()
    }

    fn set_of(cells: &[(usize, usize)]) -> BTreeSet<Coord> {
        cells.iter().map(|&(y, x)| coord(y, x)).collect()
    }

    #[test_case(7, 7, 8; "middle")]
    #[test_case(0, 0, 3; "corner")]
    #[test_case(0, 7, 5; "edge")]
    fn test_lone_piece_steps(y: usize, x: usize, expected: usize) {
        let board = board_with(&[(y, x, Color::Red)]);
        let table = generate(&board, &no_zones(), Color::Red);

        assert_eq!(table.len(), 1);
        assert_eq!(destinations(&table, coord(y, x)).len(), expected);
    }

    #[test]
    fn test_single_empty_neighbor_is_only_destination() {
        // Corner piece boxed in: both jumps land on occupied cells.
        let board = board_with(&[
            (0, 0, Color::Red),
            (0, 1, Color::Yellow),
            (0, 2, Color::Yellow),
            (1, 0, Color::Yellow),
            (2, 0, Color::Yellow),
        ]);
        let table = generate(&board, &no_zones(), Color::Red);

        assert_eq!(destinations(&table, coord(0, 0)), set_of(&[(1, 1)]));
    }

    #[test]
    fn test_jump_chain_in_a_line() {
        let board = board_with(&[
            (5, 5, Color::Red),
            (5, 6, Color::Yellow),
            (5, 8, Color::Red),
        ]);
        let table = generate(&board, &no_zones(), Color::Red);
        let dests = destinations(&table, coord(5, 5));

        assert!(dests.contains(&coord(5, 7)));
        assert!(dests.contains(&coord(5, 9)), "second hop reflects off the landing cell");
        assert!(!dests.contains(&coord(5, 6)));
        assert_eq!(dests.len(), 7 + 2);
    }

    #[test]
    fn test_jump_cycle_terminates() {
        let board = board_with(&[
            (4, 4, Color::Red),
            (4, 5, Color::Yellow),
            (5, 4, Color::Yellow),
            (5, 5, Color::Yellow),
            (5, 6, Color::Yellow),
            (6, 5, Color::Yellow),
        ]);
        let table = generate(&board, &no_zones(), Color::Red);

        assert_eq!(
            destinations(&table, coord(4, 4)),
            set_of(&[
                (3, 3),
                (3, 4),
                (3, 5),
                (4, 3),
                (5, 3),
                (4, 6),
                (6, 4),
                (6, 6),
            ])
        );
    }

    #[test]
    fn test_cannot_jump_off_board() {
        let board = board_with(&[(1, 1, Color::Red), (0, 0, Color::Yellow)]);
        let table = generate(&board, &no_zones(), Color::Red);

        assert_eq!(destinations(&table, coord(1, 1)).len(), 7);
    }

    #[test]
    fn test_table_is_row_major() {
        let board = Board::starting(Players::Two);
        let table = generate(&board, &two_player_mask(), Color::Red);
        let origins: Vec<Coord> = table.iter().map(MoveSet::origin).collect();

        assert_eq!(table.len(), 19);
        assert!(origins.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(table.position(coord(0, 0)), Some(0));
        assert_eq!(table.position(coord(4, 1)), Some(18));
        assert_eq!(table.position(coord(8, 8)), None);
    }

    #[test]
    fn test_starting_position_mobility() {
        let board = Board::starting(Players::Two);
        let table = generate(&board, &two_player_mask(), Color::Red);

        assert!(table.has_any_move());
        let corner = table.get(0).unwrap();
        assert!(corner.is_immobile(), "corner piece is surrounded");
        // Over (2,3) onto (2,4).
        assert!(destinations(&table, coord(2, 2)).contains(&coord(2, 4)));
    }

    #[test]
    fn test_piece_in_home_zone_stays_inside() {
        let board = board_with(&[(13, 13, Color::Red)]);
        let table = generate(&board, &two_player_mask(), Color::Red);
        let dests = destinations(&table, coord(13, 13));

        assert!(!dests.contains(&coord(12, 12)));
        assert_eq!(dests.len(), 7);
    }

    #[test]
    fn test_piece_outside_home_zone_is_unrestricted() {
        let board = board_with(&[(12, 12, Color::Red)]);
        let table = generate(&board, &two_player_mask(), Color::Red);

        assert_eq!(destinations(&table, coord(12, 12)).len(), 8);
    }

    #[test]
    fn test_home_zone_allows_jumping_out_and_back() {
        let board = board_with(&[
            (14, 11, Color::Red),
            (13, 11, Color::Yellow),
            (12, 12, Color::Yellow),
        ]);
        let table = generate(&board, &two_player_mask(), Color::Red);

        assert_eq!(
            destinations(&table, coord(14, 11)),
            set_of(&[(12, 13), (13, 12), (14, 12), (15, 11), (15, 12)])
        );
    }

    #[test]
    fn test_home_zone_of_other_color_does_not_restrict() {
        // (0,0) is Yellow's home; a Red piece there moves freely.
        let board = board_with(&[(0, 0, Color::Red)]);
        let table = generate(&board, &two_player_mask(), Color::Red);

        assert_eq!(destinations(&table, coord(0, 0)).len(), 3);
    }

    #[test]
    fn test_only_requested_color_is_listed() {
        let board = board_with(&[(3, 3, Color::Red), (9, 9, Color::Yellow)]);
        let table = generate(&board, &no_zones(), Color::Yellow);

        assert_eq!(table.color(), Color::Yellow);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().origin(), coord(9, 9));
    }

    /// Jump closure by fixed-point iteration, independent of the worklist.
    fn reference_destinations(board: &Board, mask: &VictoryMask, origin: Coord) -> BTreeSet<Coord> {
        let mut landings: BTreeSet<Coord> = BTreeSet::new();
        loop {
            let before = landings.len();
            let sources: Vec<Coord> = std::iter::once(origin).chain(landings.iter().copied()).collect();
            for from in sources {
                for over in from.neighbors() {
                    if board.is_empty(over) {
                        continue;
                    }
                    if let Some(landing) = from.reflect_over(over)
                        && board.is_empty(landing)
                    {
                        landings.insert(landing);
                    }
                }
            }
            if landings.len() == before {
                break;
            }
        }
        let mut all: BTreeSet<Coord> = origin.neighbors().filter(|&n| board.is_empty(n)).collect();
        all.extend(landings);
        let color = board.get(origin);
        if mask.owner(origin) == color {
            all.retain(|&c| mask.owner(c) == color);
        }
        all
    }

    #[test]
    fn test_matches_reference_search_on_random_boards() {
        let mut rng = StdRng::seed_from_u64(0x4a4d50);
        let mask = two_player_mask();
        for round in 0..200 {
            let density = rng.random_range(0.1..0.7);
            let mut board = Board::empty();
            for c in Coord::all() {
                if rng.random_bool(density) {
                    let color = if rng.random_bool(0.5) { Color::Red } else { Color::Yellow };
                    board.set(c, Some(color));
                }
            }

            let table = generate(&board, &mask, Color::Red);
            assert_eq!(table.len(), board.count(Color::Red));
            for set in table.iter() {
                let got: BTreeSet<Coord> = set.destinations().collect();
                assert!(!got.contains(&set.origin()), "round {round}: origin marked");
                assert_eq!(
                    got,
                    reference_destinations(&board, &mask, set.origin()),
                    "round {round}, piece {}\n{board}",
                    set.origin()
                );
            }
        }
    }
}
