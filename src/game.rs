use log::{debug, error, info, warn};
use thiserror::Error;

use crate::MoveInput;
use crate::board::{self, Board, Color, Coord, Players, VictoryMask};
use crate::codec::TURN_DIVISOR;
use crate::feedback::FeedbackSource;
use crate::movegen::{self, MoveSet, MoveTable};

/// Largest turn count a session can reach.
///
/// The save format stores turns as `quotient * divisor + remainder` in single
/// bytes, which caps the counter at `255 * divisor + divisor - 1`.
pub const MAX_TURNS: u16 = u8::MAX as u16 * TURN_DIVISOR as u16 + (TURN_DIVISOR as u16 - 1);

/// Why a selection, target or move was rejected.
///
/// Everything except [`MoveError::TurnOverflow`] is rejected before the board
/// is touched.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MoveError {
    /// The selected cell does not hold a piece of the active color.
    #[error("no {color} piece at {at}")]
    InvalidSelection { at: Coord, color: Color },
    /// The piece is on the board but not in the move table, so the table is
    /// stale or was built for another board.
    #[error("piece at {at} is not in the move table")]
    UnknownPiece { at: Coord },
    #[error("piece at {at} has no legal moves")]
    NoLegalMoves { at: Coord },
    #[error("{to} is not a legal destination from {from}")]
    InvalidTarget { from: Coord, to: Coord },
    #[error("no piece is selected")]
    NoSelection,
    /// The turn counter cannot advance any further. Ends the session.
    #[error("turn counter exhausted after {max} turns", max = MAX_TURNS)]
    TurnOverflow,
    #[error("game is over, {winner} won")]
    GameOver { winner: Color },
}

/// Board, victory mask and turn counter of one game.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    board: Board,
    mask: VictoryMask,
    players: Players,
    pieces_per_player: u8,
    turns: u16,
}

impl Session {
    /// Fresh game with the starting layout for `players`.
    pub fn new_game(players: Players) -> Self {
        let board = Board::starting(players);
        let mask = VictoryMask::from_initial(&board);
        info!("new {}-player game", players.count());
        Self::from_position(players, board, mask, 0)
    }

    /// Session over an arbitrary position, for puzzles and tests.
    ///
    /// `turns` is clamped to [`MAX_TURNS`], with a warning, since the save
    /// format cannot hold more.
    pub fn from_position(players: Players, board: Board, mask: VictoryMask, turns: u16) -> Self {
        if turns > MAX_TURNS {
            warn!("turn count {turns} clamped to {MAX_TURNS}");
        }
        let turns = turns.min(MAX_TURNS);
        Self::from_parts(board, mask, players, players.pieces_per_player(), turns)
    }

    pub(crate) fn from_parts(
        board: Board,
        mask: VictoryMask,
        players: Players,
        pieces_per_player: u8,
        turns: u16,
    ) -> Self {
        Self {
            board,
            mask,
            players,
            pieces_per_player,
            turns,
        }
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn mask(&self) -> &VictoryMask {
        &self.mask
    }

    #[inline]
    pub fn players(&self) -> Players {
        self.players
    }

    #[inline]
    pub fn pieces_per_player(&self) -> u8 {
        self.pieces_per_player
    }

    #[inline]
    pub fn turns(&self) -> u16 {
        self.turns
    }

    /// Color to move: seats take turns in the order Red, Yellow, Blue, Green.
    pub fn whose_turn(&self) -> Color {
        let seats = self.players.seats();
        seats[usize::from(self.turns) % seats.len()]
    }

    /// Move table for every piece of `color` on the current board.
    pub fn generate_moves(&self, color: Color) -> MoveTable {
        movegen::generate(&self.board, &self.mask, color)
    }

    /// Resolves a selected cell to its index in `table`.
    pub fn select_piece(&self, table: &MoveTable, at: Coord) -> Result<usize, MoveError> {
        let color = table.color();
        if self.board.get(at) != Some(color) {
            debug!("rejected selection {at}: no {color} piece");
            return Err(MoveError::InvalidSelection { at, color });
        }
        let index = table.position(at).ok_or(MoveError::UnknownPiece { at })?;
        match table.get(index) {
            Some(set) if !set.is_immobile() => Ok(index),
            Some(_) => Err(MoveError::NoLegalMoves { at }),
            None => Err(MoveError::UnknownPiece { at }),
        }
    }

    /// Whether `to` is a legal destination for the selected piece.
    #[inline]
    pub fn select_target(set: &MoveSet, to: Coord) -> bool {
        set.contains(to)
    }

    /// Moves the piece of `set` to `to` and advances the turn.
    ///
    /// The board is written before the counter is advanced, so on
    /// [`MoveError::TurnOverflow`] the move itself has still happened.
    pub fn apply_move(&mut self, set: &MoveSet, to: Coord) -> Result<(), MoveError> {
        let from = set.origin();
        if !set.contains(to) {
            debug!("rejected target {to} for piece at {from}");
            return Err(MoveError::InvalidTarget { from, to });
        }
        let piece = self
            .board
            .get(from)
            .ok_or(MoveError::UnknownPiece { at: from })?;
        if !self.board.is_empty(to) {
            return Err(MoveError::InvalidTarget { from, to });
        }

        self.board.set(to, Some(piece));
        self.board.set(from, None);
        self.advance_turn()?;
        info!("turn {}: {piece} {from} -> {to}", self.turns);
        Ok(())
    }

    /// Skips the active color's turn without touching the board.
    pub fn forfeit(&mut self) -> Result<(), MoveError> {
        let color = self.whose_turn();
        self.advance_turn()?;
        info!("turn {}: {color} has no legal moves and forfeits", self.turns);
        Ok(())
    }

    fn advance_turn(&mut self) -> Result<(), MoveError> {
        if self.turns >= MAX_TURNS {
            error!("turn counter exhausted at {}", self.turns);
            return Err(MoveError::TurnOverflow);
        }
        self.turns += 1;
        Ok(())
    }

    /// Whether `color` has filled its home zone.
    pub fn check_victory_for(&self, color: Color) -> bool {
        board::check_victory(&self.board, &self.mask, color, self.pieces_per_player)
    }

    /// First winner in seating order, if any.
    pub fn check_victory(&self) -> Option<Color> {
        self.players
            .seats()
            .iter()
            .copied()
            .find(|&color| self.check_victory_for(color))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("players", &self.players.count())
            .field("pieces_per_player", &self.pieces_per_player)
            .field("turns", &self.turns)
            .field("board", &format_args!("\n{}", self.board))
            .finish_non_exhaustive()
    }
}

/// Where the engine is within the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingSelection,
    /// A piece is picked up; `index` is its entry in the move table.
    AwaitingTarget { index: usize },
    Finished { winner: Color },
    /// The turn counter ran out. The last board write stands; nothing more
    /// may be played.
    Overflowed,
}

/// Result of one completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub color: Color,
    pub from: Coord,
    pub to: Coord,
    /// Colors that had no legal move afterwards and were skipped.
    pub forfeited: Vec<Color>,
    pub winner: Option<Color>,
}

/// Error from [`GameEngine::play_turn`].
#[derive(Debug, Error)]
pub enum PlayError<E> {
    #[error("move input failed: {0}")]
    Input(E),
    #[error(transparent)]
    Move(#[from] MoveError),
}

/// Turn state machine over a [`Session`].
///
/// Owns the move table of the active color and rebuilds it after every
/// accepted move, skipping colors that cannot move.
#[derive(Clone)]
pub struct GameEngine {
    session: Session,
    table: MoveTable,
    phase: TurnPhase,
}

impl GameEngine {
    /// Starts driving `session` from its current turn.
    pub fn new(session: Session) -> Result<Self, MoveError> {
        let table = session.generate_moves(session.whose_turn());
        let mut engine = Self {
            session,
            table,
            phase: TurnPhase::AwaitingSelection,
        };
        if let Some(winner) = engine.session.check_victory() {
            engine.phase = TurnPhase::Finished { winner };
        } else {
            engine.refresh()?;
        }
        Ok(engine)
    }

    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    #[inline]
    pub fn table(&self) -> &MoveTable {
        &self.table
    }

    #[inline]
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    #[inline]
    pub fn active_color(&self) -> Color {
        self.table.color()
    }

    /// Index of the picked-up piece, if any.
    pub fn selection(&self) -> Option<usize> {
        match self.phase {
            TurnPhase::AwaitingTarget { index } => Some(index),
            _ => None,
        }
    }

    /// Picks up the piece at `at`. Replaces any earlier selection.
    pub fn select(&mut self, at: Coord) -> Result<&MoveSet, MoveError> {
        self.ensure_running()?;
        self.phase = TurnPhase::AwaitingSelection;
        let index = self.session.select_piece(&self.table, at)?;
        self.phase = TurnPhase::AwaitingTarget { index };
        self.table.get(index).ok_or(MoveError::UnknownPiece { at })
    }

    /// Puts the selected piece back down.
    pub fn deselect(&mut self) {
        if let TurnPhase::AwaitingTarget { .. } = self.phase {
            self.phase = TurnPhase::AwaitingSelection;
        }
    }

    /// Moves the selected piece to `to`, then checks for a winner and
    /// prepares the next color's turn.
    ///
    /// An illegal target drops the selection and leaves the board unchanged.
    pub fn play_target(&mut self, to: Coord) -> Result<TurnOutcome, MoveError> {
        self.ensure_running()?;
        let index = self.selection().ok_or(MoveError::NoSelection)?;
        self.phase = TurnPhase::AwaitingSelection;
        let set = self.table.get(index).ok_or(MoveError::NoSelection)?;
        let color = self.table.color();
        let from = set.origin();

        if let Err(err) = self.session.apply_move(set, to) {
            return Err(self.halt(err));
        }

        let winner = self.session.check_victory();
        let forfeited = match winner {
            Some(winner) => {
                info!("{winner} wins after {} turns", self.session.turns());
                self.phase = TurnPhase::Finished { winner };
                Vec::new()
            }
            None => self.refresh()?,
        };
        Ok(TurnOutcome {
            color,
            from,
            to,
            forfeited,
            winner,
        })
    }

    /// Plays one whole turn from `input`.
    ///
    /// Returns `Ok(None)` once the input has no more moves.
    pub fn play_turn<I: MoveInput>(
        &mut self,
        input: &mut I,
    ) -> Result<Option<TurnOutcome>, PlayError<I::Error>> {
        self.ensure_running()?;
        let Some((from, to)) = input
            .next_move(self.active_color(), &self.table)
            .map_err(PlayError::Input)?
        else {
            return Ok(None);
        };
        self.select(from)?;
        Ok(Some(self.play_target(to)?))
    }

    fn ensure_running(&self) -> Result<(), MoveError> {
        match self.phase {
            TurnPhase::Finished { winner } => Err(MoveError::GameOver { winner }),
            TurnPhase::Overflowed => Err(MoveError::TurnOverflow),
            _ => Ok(()),
        }
    }

    /// Passes `err` through, ending the session if the counter ran out.
    fn halt(&mut self, err: MoveError) -> MoveError {
        if err == MoveError::TurnOverflow {
            self.phase = TurnPhase::Overflowed;
        }
        err
    }

    /// Rebuilds the table for the color to move, forfeiting colors without a
    /// legal move. Each seat is skipped at most once.
    fn refresh(&mut self) -> Result<Vec<Color>, MoveError> {
        let mut forfeited = Vec::new();
        self.phase = TurnPhase::AwaitingSelection;
        self.table = self.session.generate_moves(self.session.whose_turn());
        while !self.table.has_any_move() {
            if forfeited.len() == self.session.players().count() {
                warn!("no color can move at turn {}", self.session.turns());
                break;
            }
            forfeited.push(self.table.color());
            if let Err(err) = self.session.forfeit() {
                return Err(self.halt(err));
            }
            self.table = self.session.generate_moves(self.session.whose_turn());
        }
        Ok(forfeited)
    }
}

impl FeedbackSource for GameEngine {
    fn table(&self) -> &MoveTable {
        &self.table
    }

    fn selection(&self) -> Option<usize> {
        GameEngine::selection(self)
    }
}

impl std::fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("phase", &self.phase)
            .field("active", &self.active_color())
            .field("session", &self.session)
            .finish()
    }
}
