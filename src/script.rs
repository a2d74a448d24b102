use std::collections::VecDeque;
use std::convert::Infallible;

use thiserror::Error;

use crate::MoveInput;
use crate::board::{Color, Coord};
use crate::movegen::MoveTable;

/// Error when parsing a move script.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("invalid coordinate: '{0}'")]
    BadCoord(String),
    #[error("move {index} lists {count} coordinates, expected origin and target")]
    BadMove { index: usize, count: usize },
}

/// A scripted player that replays moves from text.
///
/// Moves can be appended at any time, so a script may be fed in pieces.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPlayer {
    pending: VecDeque<(Coord, Coord)>,
}

impl ScriptedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and queue additional moves.
    ///
    /// Format:
    /// - Coordinates are 2 hex digits, column then row (e.g. "3a")
    /// - Spaces separate coordinates in the same move
    /// - Periods (".") end a move; each move is an origin and a target
    ///
    /// Examples:
    /// - `"14 15."` - move the piece on x=1,y=4 to x=1,y=5
    /// - `"1415."` - same, without the space
    /// - `"14 15. 77 88."` - two moves
    ///
    /// Nothing is queued if any move in `script` is malformed.
    pub fn push_script(&mut self, script: &str) -> Result<(), ScriptError> {
        let moves = parse_script(script)?;
        self.pending.extend(moves);
        Ok(())
    }

    /// Moves not yet played.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl MoveInput for ScriptedPlayer {
    type Error = Infallible;

    fn next_move(
        &mut self,
        _color: Color,
        _table: &MoveTable,
    ) -> Result<Option<(Coord, Coord)>, Self::Error> {
        Ok(self.pending.pop_front())
    }
}

/// Parse a script into (origin, target) pairs.
fn parse_script(script: &str) -> Result<Vec<(Coord, Coord)>, ScriptError> {
    script
        .split('.')
        .filter(|text| !text.trim().is_empty())
        .enumerate()
        .map(|(index, text)| {
            let coords = parse_coords(text)?;
            match coords[..] {
                [from, to] => Ok((from, to)),
                _ => Err(ScriptError::BadMove {
                    index,
                    count: coords.len(),
                }),
            }
        })
        .collect()
}

/// Coordinates of one move. Two hex digits make a coordinate, so
/// whitespace between coordinates is optional.
fn parse_coords(text: &str) -> Result<Vec<Coord>, ScriptError> {
    let mut coords = Vec::new();
    let mut digits = String::new();
    for ch in text.chars() {
        if !ch.is_whitespace() {
            digits.push(ch);
        }
        if digits.len() == 2 || (ch.is_whitespace() && !digits.is_empty()) {
            coords.push(parse_coord(&digits)?);
            digits.clear();
        }
    }
    if !digits.is_empty() {
        coords.push(parse_coord(&digits)?);
    }
    Ok(coords)
}

fn parse_coord(digits: &str) -> Result<Coord, ScriptError> {
    digits
        .parse()
        .map_err(|_| ScriptError::BadCoord(digits.to_string()))
}
