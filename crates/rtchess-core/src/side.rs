//! The two players.
//!
//! Ownership is an explicit attribute stored on every piece when it is
//! created. The only place a side is derived from text is when a piece code
//! such as `"PW"` is parsed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which player owns a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// Player 1.
    White,
    /// Player 2.
    Black,
}

impl Side {
    /// Both sides, White first.
    pub const ALL: [Side; 2] = [Side::White, Side::Black];

    /// The other side.
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// The single-letter suffix used in piece codes.
    pub fn letter(self) -> char {
        match self {
            Side::White => 'W',
            Side::Black => 'B',
        }
    }

    /// Parse a piece-code side letter (case-insensitive).
    pub fn from_letter(letter: char) -> Option<Side> {
        match letter.to_ascii_uppercase() {
            'W' => Some(Side::White),
            'B' => Some(Side::Black),
            _ => None,
        }
    }

    /// Player number as shown to humans (White = 1, Black = 2).
    pub fn player_number(self) -> u8 {
        match self {
            Side::White => 1,
            Side::Black => 2,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => f.write_str("white"),
            Side::Black => f.write_str("black"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_round_trip() {
        for side in Side::ALL {
            assert_eq!(Side::from_letter(side.letter()), Some(side));
        }
        assert_eq!(Side::from_letter('w'), Some(Side::White));
        assert_eq!(Side::from_letter('x'), None);
    }

    #[test]
    fn opponent_is_an_involution() {
        assert_eq!(Side::White.opponent(), Side::Black);
        assert_eq!(Side::White.opponent().opponent(), Side::White);
    }
}
