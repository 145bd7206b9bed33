//! Grid geometry: tile positions, offsets, and facing directions.
//!
//! The kitchen is a grid with its origin at the top-left tile. Columns grow
//! to the east and rows grow downward, so "south" is `(0, 1)`. All distance
//! math is integer-only and saturating.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ParseError;

/// A tile on the kitchen grid, as `(column, row)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Column, growing eastward.
    pub x: i32,
    /// Row, growing southward.
    pub y: i32,
}

impl Position {
    /// Create a position from a column and a row.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The offset that leads from `self` to `target`.
    pub const fn offset_to(self, target: Self) -> Offset {
        Offset {
            dx: target.x.saturating_sub(self.x),
            dy: target.y.saturating_sub(self.y),
        }
    }

    /// Squared Euclidean distance to `other`.
    pub fn squared_distance(self, other: Self) -> i64 {
        self.offset_to(other).squared_length()
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Position> for (i32, i32) {
    fn from(position: Position) -> Self {
        (position.x, position.y)
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A displacement between two tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Offset {
    /// Column delta.
    pub dx: i32,
    /// Row delta.
    pub dy: i32,
}

impl Offset {
    /// Create an offset.
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Squared length, widened to `i64` so it cannot overflow for any tile.
    pub fn squared_length(self) -> i64 {
        let dx = i64::from(self.dx);
        let dy = i64::from(self.dy);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Dot product with a unit facing vector: how far the offset reaches
    /// along the facing axis (negative means behind).
    pub fn forward(self, facing: Orientation) -> i64 {
        let (fx, fy) = facing.vector();
        i64::from(self.dx)
            .saturating_mul(i64::from(fx))
            .saturating_add(i64::from(self.dy).saturating_mul(i64::from(fy)))
    }

    /// Absolute displacement perpendicular to the facing axis.
    pub fn lateral(self, facing: Orientation) -> i64 {
        let (fx, fy) = facing.vector();
        i64::from(self.dx)
            .saturating_mul(i64::from(fy))
            .saturating_sub(i64::from(self.dy).saturating_mul(i64::from(fx)))
            .saturating_abs()
    }
}

/// One of the four directions a player can face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Orientation {
    /// `(0, -1)`: toward row 0.
    North,
    /// `(0, 1)`: rows increase downward.
    South,
    /// `(1, 0)`.
    East,
    /// `(-1, 0)`.
    West,
}

impl Orientation {
    /// All orientations, in declaration order.
    pub const ALL: [Self; 4] = [Self::North, Self::South, Self::East, Self::West];

    /// The unit vector `(dx, dy)` of this orientation.
    pub const fn vector(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::South => (0, 1),
            Self::East => (1, 0),
            Self::West => (-1, 0),
        }
    }

    /// Parse a facing vector.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidOrientation`] for anything other than the
    /// four unit vectors.
    pub const fn from_vector(dx: i32, dy: i32) -> Result<Self, ParseError> {
        match (dx, dy) {
            (0, -1) => Ok(Self::North),
            (0, 1) => Ok(Self::South),
            (1, 0) => Ok(Self::East),
            (-1, 0) => Ok(Self::West),
            _ => Err(ParseError::InvalidOrientation { dx, dy }),
        }
    }
}

impl TryFrom<(i32, i32)> for Orientation {
    type Error = ParseError;

    fn try_from((dx, dy): (i32, i32)) -> Result<Self, Self::Error> {
        Self::from_vector(dx, dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_distance_is_symmetric() {
        let a = Position::new(2, 3);
        let b = Position::new(5, 1);
        assert_eq!(a.squared_distance(b), 13);
        assert_eq!(b.squared_distance(a), 13);
        assert_eq!(a.squared_distance(a), 0);
    }

    #[test]
    fn orientation_vectors_round_trip() {
        for facing in Orientation::ALL {
            let (dx, dy) = facing.vector();
            assert_eq!(Orientation::from_vector(dx, dy).ok(), Some(facing));
        }
    }

    #[test]
    fn diagonal_orientation_rejected() {
        assert_eq!(
            Orientation::try_from((1, 1)),
            Err(ParseError::InvalidOrientation { dx: 1, dy: 1 })
        );
    }

    #[test]
    fn forward_and_lateral_components() {
        let offset = Offset::new(3, -1);
        assert_eq!(offset.forward(Orientation::East), 3);
        assert_eq!(offset.lateral(Orientation::East), 1);
        assert_eq!(offset.forward(Orientation::West), -3);
        assert_eq!(offset.forward(Orientation::North), 1);
        assert_eq!(offset.lateral(Orientation::North), 3);
    }
}
