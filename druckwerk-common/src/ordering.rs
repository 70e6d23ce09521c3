//! Integer ordering over a scoped collection of items.
//!
//! Posts form one global scope ordered by descending position (newest first);
//! the blocks of a single post form a per-post scope ordered by ascending
//! position. Both scopes assign positions densely on insert and reorder by
//! swapping the positions of two adjacent items.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(u32);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Positions start at 1, got {0}")]
pub struct InvalidPositionError(u32);

impl Position {
    pub const FIRST: Position = Position(1);

    #[must_use]
    pub fn new(value: u32) -> Option<Self> {
        (value >= 1).then_some(Self(value))
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    /// The position for a new item in a scope whose current maximum is `self`.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl TryFrom<u32> for Position {
    type Error = InvalidPositionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidPositionError(value))
    }
}

impl TryFrom<i32> for Position {
    type Error = InvalidPositionError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(InvalidPositionError(value.max(0).cast_unsigned()))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// The position a newly inserted item receives, given the scope's current
/// maximum position (`None` for an empty scope).
#[must_use]
pub fn next_position(current_max: Option<Position>) -> Position {
    current_max.map_or(Position::FIRST, Position::next)
}

/// Which side of the current item a reposition seeks its swap partner on.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Seek {
    /// Nearest strictly greater position.
    Greater,
    /// Nearest strictly lesser position.
    Lesser,
}

/// Direction token for repositioning a post. Posts display in descending
/// position order, so "left" means toward greater positions.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostDirection {
    Left,
    Right,
}

impl PostDirection {
    #[must_use]
    pub fn seek(self) -> Seek {
        match self {
            PostDirection::Left => Seek::Greater,
            PostDirection::Right => Seek::Lesser,
        }
    }
}

/// Direction token for repositioning a block. Blocks display in ascending
/// position order, so "up" means toward lesser positions.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockDirection {
    Up,
    Down,
}

impl BlockDirection {
    #[must_use]
    pub fn seek(self) -> Seek {
        match self {
            BlockDirection::Up => Seek::Lesser,
            BlockDirection::Down => Seek::Greater,
        }
    }
}

/// The single nearest neighbor of `current` on the `seek` side, or `None`
/// when `current` is already at that boundary of the scope. Gaps between
/// positions are permitted and skipped over.
#[must_use]
pub fn neighbor<I>(positions: I, current: Position, seek: Seek) -> Option<Position>
where
    I: IntoIterator<Item = Position>,
{
    let candidates = positions.into_iter();
    match seek {
        Seek::Greater => candidates.filter(|&p| p > current).min(),
        Seek::Lesser => candidates.filter(|&p| p < current).max(),
    }
}

#[cfg(test)]
mod tests {
    use crate::ordering::{
        BlockDirection, Position, PostDirection, Seek, neighbor, next_position,
    };

    fn positions(values: &[u32]) -> Vec<Position> {
        values.iter().map(|&v| Position::new(v).unwrap()).collect()
    }

    #[test]
    fn empty_scope_starts_at_one() {
        assert_eq!(next_position(None), Position::FIRST);
    }

    #[test]
    fn next_position_is_max_plus_one() {
        assert_eq!(
            next_position(Some(Position::new(7).unwrap())),
            Position::new(8).unwrap()
        );
    }

    #[test]
    fn position_zero_is_invalid() {
        assert!(Position::new(0).is_none());
        assert!(Position::new(1).is_some());
    }

    #[test]
    fn boundary_has_no_neighbor() {
        let scope = positions(&[1, 2, 3]);
        let top = Position::new(3).unwrap();
        let bottom = Position::new(1).unwrap();

        assert_eq!(neighbor(scope.iter().copied(), top, Seek::Greater), None);
        assert_eq!(neighbor(scope.iter().copied(), bottom, Seek::Lesser), None);
    }

    #[test]
    fn neighbor_skips_gaps() {
        // Posts at 5 and 7, nothing at 6. Moving the post at 5 "left"
        // (toward greater positions) must pair it with 7.
        let scope = positions(&[5, 7]);
        let current = Position::new(5).unwrap();

        assert_eq!(
            neighbor(scope.iter().copied(), current, PostDirection::Left.seek()),
            Some(Position::new(7).unwrap())
        );
    }

    #[test]
    fn neighbor_is_nearest_not_furthest() {
        let scope = positions(&[1, 3, 4, 9]);
        let current = Position::new(3).unwrap();

        assert_eq!(
            neighbor(scope.iter().copied(), current, Seek::Greater),
            Some(Position::new(4).unwrap())
        );
        assert_eq!(
            neighbor(scope.iter().copied(), current, Seek::Lesser),
            Some(Position::new(1).unwrap())
        );
    }

    #[test]
    fn swap_is_an_involution() {
        // Swapping with a neighbor and then swapping back restores the
        // original order; everything not involved in the swap is untouched.
        let mut scope = positions(&[2, 5, 7, 11]);
        let original = scope.clone();
        let current = Position::new(5).unwrap();

        let partner = neighbor(scope.iter().copied(), current, Seek::Greater).unwrap();
        let current_at = scope.iter().position(|&p| p == current).unwrap();
        let partner_at = scope.iter().position(|&p| p == partner).unwrap();
        scope.swap(current_at, partner_at);

        assert_eq!(scope, positions(&[2, 7, 5, 11]));

        let partner_back = neighbor(scope.iter().copied(), current, Seek::Lesser).unwrap();
        assert_eq!(partner_back, Position::new(2).unwrap());

        // Inverse direction from the moved item's new slot.
        let moved = Position::new(7).unwrap();
        let inverse = neighbor(scope.iter().copied(), moved, Seek::Lesser).unwrap();
        assert_eq!(inverse, current);
        let moved_at = scope.iter().position(|&p| p == moved).unwrap();
        let inverse_at = scope.iter().position(|&p| p == inverse).unwrap();
        scope.swap(moved_at, inverse_at);

        assert_eq!(scope, original);
    }

    #[test]
    fn block_directions_map_to_ascending_order() {
        assert_eq!(BlockDirection::Up.seek(), Seek::Lesser);
        assert_eq!(BlockDirection::Down.seek(), Seek::Greater);
    }

    #[test]
    fn post_directions_map_to_descending_order() {
        assert_eq!(PostDirection::Left.seek(), Seek::Greater);
        assert_eq!(PostDirection::Right.seek(), Seek::Lesser);
    }

    #[test]
    fn direction_tokens_deserialize_lowercase() {
        assert_eq!(
            serde_json::from_str::<PostDirection>("\"left\"").unwrap(),
            PostDirection::Left
        );
        assert_eq!(
            serde_json::from_str::<BlockDirection>("\"down\"").unwrap(),
            BlockDirection::Down
        );
    }
}
