//! Rule engine for Halma on a 16x16 board with two or four players.
//!
//! [`Session`] holds the position and applies moves, [`GameEngine`] walks a
//! session through select/target turns and [`codec`] reads and writes save
//! files. Front ends supply moves through [`MoveInput`] and draw
//! [`feedback::BoardFeedback`].

pub mod bitgrid;
pub mod board;
pub mod codec;
pub mod feedback;
pub mod game;
pub mod movegen;
pub mod script;

pub use board::{Board, Color, Coord, Players, VictoryMask};
pub use codec::FormatError;
pub use game::{GameEngine, MoveError, PlayError, Session, TurnOutcome, TurnPhase};
pub use movegen::{MoveSet, MoveTable};

/// Trait for supplying moves to a [`GameEngine`].
///
/// Abstracts over interactive front ends and scripted players, providing a
/// uniform interface for [`GameEngine::play_turn`].
pub trait MoveInput {
    /// Error type for input failures.
    type Error: std::fmt::Debug + std::fmt::Display;

    /// Choose the next move for `color` as an (origin, target) pair.
    ///
    /// `table` lists every piece of `color` with its legal destinations.
    /// Returns `Ok(None)` when the input has no more moves to give.
    fn next_move(
        &mut self,
        color: Color,
        table: &MoveTable,
    ) -> Result<Option<(Coord, Coord)>, Self::Error>;
}
