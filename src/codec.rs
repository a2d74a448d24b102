//! Save file format.
//!
//! ```text
//! offset        size   field
//! 0             1      board edge length (must be 16)
//! 1             1      player count (2 or 4)
//! 2             1      pieces per player
//! 3             N*N    board cells, row-major (0 empty, 1-4 color)
//! 3+N*N         N*N    victory mask, same layout
//! 3+2*N*N       3      turns as divisor D, quotient Q, remainder R;
//!                      turns = Q * D + R
//! ```
//!
//! The divisor is read back from the file rather than assumed, so saves
//! written with any divisor load correctly.

use std::fs;
use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use crate::board::{BOARD_SIZE, Board, Color, Coord, Players, VictoryMask};
use crate::game::{MAX_TURNS, Session};

/// Divisor written into the turn encoding.
pub const TURN_DIVISOR: u8 = i8::MAX as u8;

const HEADER_LEN: usize = 3;
const GRID_LEN: usize = BOARD_SIZE * BOARD_SIZE;
const TURNS_LEN: usize = 3;

/// Exact size of a save file.
pub const SAVE_LEN: usize = HEADER_LEN + 2 * GRID_LEN + TURNS_LEN;

/// Why save data was rejected. No session is produced on error.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("save data is {len} bytes, expected {expected}", expected = SAVE_LEN)]
    Truncated { len: usize },
    #[error("save data is {len} bytes, expected {expected}", expected = SAVE_LEN)]
    TrailingBytes { len: usize },
    #[error("board size {0} does not match {size}", size = BOARD_SIZE)]
    BoardSize(u8),
    #[error("player count {0} is not 2 or 4")]
    PlayerCount(u8),
    #[error("byte {value} at offset {offset} is not a piece")]
    PieceValue { offset: usize, value: u8 },
    #[error("{color} at offset {offset} is not seated in a {players}-player game")]
    ColorNotSeated {
        offset: usize,
        color: Color,
        players: usize,
    },
    #[error("turn count {0} exceeds {max}", max = MAX_TURNS)]
    TurnCount(u32),
    #[error("failed to access save file: {0}")]
    Io(#[from] std::io::Error),
}

#[inline]
fn encode_cell(cell: Option<Color>) -> u8 {
    cell.map_or(0, |color| color as u8)
}

/// Serializes `session` into the save format.
pub fn save(session: &Session) -> Vec<u8> {
    let turns = session.turns();
    let divisor = u16::from(TURN_DIVISOR);

    let mut bytes = Vec::with_capacity(SAVE_LEN);
    bytes.push(BOARD_SIZE as u8);
    bytes.push(session.players() as u8);
    bytes.push(session.pieces_per_player());
    bytes.extend(session.board().cells().map(|(_, cell)| encode_cell(cell)));
    bytes.extend(session.mask().owners().map(|(_, owner)| encode_cell(owner)));
    // Session keeps turns <= MAX_TURNS, so the quotient fits a byte.
    bytes.extend([TURN_DIVISOR, (turns / divisor) as u8, (turns % divisor) as u8]);
    bytes
}

/// Restores a session from save data, validating every field.
pub fn load(bytes: &[u8]) -> Result<Session, FormatError> {
    let session = decode(bytes).inspect_err(|err| warn!("rejected save data: {err}"))?;
    info!(
        "loaded {}-player game at turn {}",
        session.players().count(),
        session.turns()
    );
    Ok(session)
}

fn decode(bytes: &[u8]) -> Result<Session, FormatError> {
    let len = bytes.len();
    if len < SAVE_LEN {
        return Err(FormatError::Truncated { len });
    }
    if len > SAVE_LEN {
        return Err(FormatError::TrailingBytes { len });
    }

    let (header, rest) = bytes.split_at(HEADER_LEN);
    let (grid, rest) = rest.split_at(GRID_LEN);
    let (mask, turns) = rest.split_at(GRID_LEN);
    let &[size, players, pieces_per_player] = header else {
        return Err(FormatError::Truncated { len });
    };
    let &[divisor, quotient, remainder] = turns else {
        return Err(FormatError::Truncated { len });
    };

    if usize::from(size) != BOARD_SIZE {
        return Err(FormatError::BoardSize(size));
    }
    let players = Players::try_from(players).map_err(FormatError::PlayerCount)?;

    let mut board = Board::empty();
    for (coord, cell) in Coord::all().zip(decode_cells(grid, HEADER_LEN, players)?) {
        board.set(coord, cell);
    }
    let mut owners = [[None; BOARD_SIZE]; BOARD_SIZE];
    for (coord, owner) in Coord::all().zip(decode_cells(mask, HEADER_LEN + GRID_LEN, players)?) {
        owners[coord.y()][coord.x()] = owner;
    }

    let turns = u32::from(quotient) * u32::from(divisor) + u32::from(remainder);
    let turns = u16::try_from(turns)
        .ok()
        .filter(|&turns| turns <= MAX_TURNS)
        .ok_or(FormatError::TurnCount(turns))?;

    Ok(Session::from_parts(
        board,
        VictoryMask::from_owners(owners),
        players,
        pieces_per_player,
        turns,
    ))
}

/// Decodes a row-major block of cells starting at `offset` in the file.
fn decode_cells(
    bytes: &[u8],
    offset: usize,
    players: Players,
) -> Result<Vec<Option<Color>>, FormatError> {
    bytes
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let offset = offset + i;
            if value == 0 {
                return Ok(None);
            }
            let color =
                Color::try_from(value).map_err(|value| FormatError::PieceValue { offset, value })?;
            if !players.is_seated(color) {
                return Err(FormatError::ColorNotSeated {
                    offset,
                    color,
                    players: players.count(),
                });
            }
            Ok(Some(color))
        })
        .collect()
}

/// Writes `session` to `path`, replacing any existing file.
pub fn save_to_path(session: &Session, path: impl AsRef<Path>) -> Result<(), FormatError> {
    fs::write(path, save(session))?;
    Ok(())
}

/// Reads and validates the save file at `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Session, FormatError> {
    let bytes = fs::read(path)?;
    load(&bytes)
}
