//! Level string codec
//!
//! Format: `gx gy [faucetX] faucetY [goalX goalY] cell...` separated by
//! whitespace and/or commas. Each cell is an uppercase hex nibble of exits
//! (left=8, right=4, up=2, down=1); `0` is the single empty slot.
//!
//! The header length is inferred from how many tokens precede the `gx*gy`
//! cells: 1 = faucetY (left edge), 2 = faucetX faucetY, 3 = faucetY goalX
//! goalY, 4 = faucetX faucetY goalX goalY. Without a goal the goal sits on the
//! right edge of the top row.

use std::collections::BTreeMap;

use super::Level;
use crate::error::LevelError;
use crate::sim::{Board, Direction, EMPTY, Endpoint, Exits, TileId, cell_count};

fn tokenize(input: &str) -> Vec<&str> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_number(token: Option<&&str>) -> bool {
    token.is_some_and(|t| t.parse::<i32>().is_ok())
}

fn parse_number<T: std::str::FromStr>(token: &str) -> Result<T, LevelError> {
    token.parse().map_err(|_| LevelError::InvalidNumber {
        token: token.to_string(),
    })
}

fn parse_cell(token: &str, index: usize) -> Result<Exits, LevelError> {
    u8::from_str_radix(token, 16)
        .ok()
        .and_then(Exits::from_bits)
        .ok_or_else(|| LevelError::InvalidCell {
            token: token.to_string(),
            index,
        })
}

/// Parse a level string. Nothing is partially applied on error.
pub fn decode(input: &str) -> Result<Level, LevelError> {
    let tokens = tokenize(input);
    if tokens.len() < 3 {
        return Err(LevelError::TooFewTokens {
            found: tokens.len(),
        });
    }

    let width: usize = parse_number(tokens[0])?;
    let height: usize = parse_number(tokens[1])?;
    let expected = cell_count(width, height)?;

    // header tokens between the dimensions and the cell data
    let header = (tokens.len() - 2).saturating_sub(expected);
    let numeric_pair = |i: usize| is_number(tokens.get(i)) && is_number(tokens.get(i + 1));

    let (faucet_xy, goal_xy, data_start) = if header >= 2 && header != 3 && numeric_pair(2) {
        let faucet = (parse_number(tokens[2])?, parse_number(tokens[3])?);
        if header >= 4 && numeric_pair(4) {
            let goal = (parse_number(tokens[4])?, parse_number(tokens[5])?);
            (faucet, Some(goal), 6)
        } else {
            (faucet, None, 4)
        }
    } else {
        let faucet = (0, parse_number(tokens[2])?);
        if header >= 3 && numeric_pair(3) {
            let goal = (parse_number(tokens[3])?, parse_number(tokens[4])?);
            (faucet, Some(goal), 5)
        } else {
            (faucet, None, 3)
        }
    };

    let data = &tokens[data_start.min(tokens.len())..];
    if data.len() < expected {
        return Err(LevelError::MissingCells {
            expected,
            found: data.len(),
        });
    }
    let values = data[..expected]
        .iter()
        .enumerate()
        .map(|(index, token)| parse_cell(token, index))
        .collect::<Result<Vec<_>, _>>()?;

    let empties = values.iter().filter(|v| v.is_empty()).count();
    if empties != 1 {
        return Err(LevelError::EmptyCellCount { found: empties });
    }
    if let Some(index) = values.iter().position(|v| v.is_single_arm()) {
        return Err(LevelError::SingleArmTile {
            token: data[index].to_string(),
            index,
        });
    }

    let mut cells = Vec::with_capacity(expected);
    let mut exits = BTreeMap::new();
    for (index, value) in values.into_iter().enumerate() {
        if value.is_empty() {
            cells.push(EMPTY);
        } else {
            let id = index as TileId + 1;
            cells.push(id);
            exits.insert(id, value);
        }
    }
    let board = Board::from_parts(width, height, cells, exits)?;

    let faucet = Endpoint::on_edge(faucet_xy.0, faucet_xy.1, width, height);
    let goal = match goal_xy {
        Some((x, y)) => Endpoint::on_edge(x, y, width, height),
        None => Endpoint {
            x: width as i32 - 1,
            y: 0,
            side: Direction::Right,
        },
    };

    Ok(Level {
        board,
        faucet,
        goal,
    })
}

/// Serialise in the full `gx gy fx fy gx gy cells...` form
pub fn encode(level: &Level) -> String {
    let board = &level.board;
    let mut parts = vec![
        board.width().to_string(),
        board.height().to_string(),
        level.faucet.x.to_string(),
        level.faucet.y.to_string(),
        level.goal.x.to_string(),
        level.goal.y.to_string(),
    ];
    parts.extend(board.cells().iter().map(|&id| match id {
        EMPTY => "0".to_string(),
        id => board.exits_of(id).to_hex().to_string(),
    }));
    parts.join(" ")
}
