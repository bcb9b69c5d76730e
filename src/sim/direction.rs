//! Directions and pipe connection sets
//!
//! A tile's exits are stored as a nibble in the same bit layout the level
//! format uses: left=8, right=4, up=2, down=1.

use serde::{Deserialize, Serialize};

/// One of the four grid directions, or `None` for "no direction"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    #[default]
    None,
}

impl Direction {
    /// The four real directions, in nibble order (left, right, up, down)
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// Opposite direction (involution, `None` maps to itself)
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::None => Direction::None,
        }
    }

    /// Unit step `(dx, dy)`; y grows downward
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::None => (0, 0),
        }
    }

    /// Level-format bit for this direction (0 for `None`)
    pub fn bit(self) -> u8 {
        match self {
            Direction::Left => 8,
            Direction::Right => 4,
            Direction::Up => 2,
            Direction::Down => 1,
            Direction::None => 0,
        }
    }

    /// Step from `(x, y)` one cell in this direction
    #[inline]
    pub fn step_from(self, x: i32, y: i32) -> (i32, i32) {
        let (dx, dy) = self.offset();
        (x + dx, y + dy)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::None => "none",
        }
    }
}

/// The set of exits a pipe piece is open on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Exits(u8);

impl Exits {
    pub const EMPTY: Exits = Exits(0);

    /// Build from a level-format nibble. Returns `None` above 0xF.
    pub fn from_bits(bits: u8) -> Option<Self> {
        (bits <= 0xF).then_some(Self(bits))
    }

    pub fn from_directions(dirs: impl IntoIterator<Item = Direction>) -> Self {
        dirs.into_iter().fold(Self::EMPTY, |acc, d| acc.with(d))
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(self, dir: Direction) -> bool {
        dir != Direction::None && self.0 & dir.bit() != 0
    }

    /// Copy of this set with `dir` added
    #[must_use]
    pub fn with(self, dir: Direction) -> Self {
        Self(self.0 | dir.bit())
    }

    pub fn insert(&mut self, dir: Direction) {
        self.0 |= dir.bit();
    }

    #[inline]
    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Single-arm pipes are never valid pieces
    #[inline]
    pub fn is_single_arm(self) -> bool {
        self.len() == 1
    }

    /// Exits in nibble order (left, right, up, down)
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }

    /// Uppercase hex nibble as written in level strings
    pub fn to_hex(self) -> char {
        char::from_digit(u32::from(self.0), 16)
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('0')
    }
}

impl FromIterator<Direction> for Exits {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        Self::from_directions(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_involution() {
        for d in [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
            Direction::None,
        ] {
            assert_eq!(d.opposite().opposite(), d);
        }
        assert_eq!(Direction::Up.opposite(), Direction::Down);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
        assert_eq!(Direction::None.opposite(), Direction::None);
    }

    #[test]
    fn test_offsets_cancel_with_opposite() {
        for d in Direction::ALL {
            let (dx, dy) = d.offset();
            let (ox, oy) = d.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
        assert_eq!(Direction::None.offset(), (0, 0));
    }

    #[test]
    fn test_exits_bits_follow_lrud() {
        let exits = Exits::from_bits(0xA).unwrap();
        assert!(exits.contains(Direction::Left));
        assert!(exits.contains(Direction::Up));
        assert!(!exits.contains(Direction::Right));
        assert!(!exits.contains(Direction::Down));
        assert!(!exits.contains(Direction::None));
        assert_eq!(exits.len(), 2);
        assert_eq!(exits.to_hex(), 'A');
        assert_eq!(
            exits.iter().collect::<Vec<_>>(),
            vec![Direction::Left, Direction::Up]
        );
    }

    #[test]
    fn test_single_arm_detection() {
        assert!(Exits::from_bits(8).unwrap().is_single_arm());
        assert!(Exits::from_bits(1).unwrap().is_single_arm());
        assert!(!Exits::from_bits(0).unwrap().is_single_arm());
        assert!(!Exits::from_bits(0xF).unwrap().is_single_arm());
        assert!(Exits::from_bits(0x10).is_none());
    }

    #[test]
    fn test_from_directions() {
        let exits: Exits = [Direction::Right, Direction::Down].into_iter().collect();
        assert_eq!(exits.bits(), 5);
        assert_eq!(exits.with(Direction::None), exits);
    }
}
