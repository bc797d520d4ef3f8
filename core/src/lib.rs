#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the maze navigation engine.
//!
//! This crate defines the vocabulary every other crate speaks: grid
//! coordinates, the eight-way direction set, per-cell wall state, door
//! colour tokens, and agent identifiers. Values that cross a process or
//! thread boundary derive serde so snapshots stay transport-agnostic.

use serde::{Deserialize, Serialize};

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct CellCoord {
    x: u32,
    y: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Computes the Euclidean distance between two cell coordinates.
    #[must_use]
    pub fn euclidean_distance(self, other: CellCoord) -> f64 {
        let dx = f64::from(self.x.abs_diff(other.x));
        let dy = f64::from(self.y.abs_diff(other.y));
        (dx * dx + dy * dy).sqrt()
    }

    /// Returns the coordinate one step in `direction`, if it does not
    /// underflow the grid origin. Upper bounds are the grid's concern.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        let (dx, dy) = direction.delta();
        let x = checked_offset(self.x, dx)?;
        let y = checked_offset(self.y, dy)?;
        Some(CellCoord::new(x, y))
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

fn checked_offset(value: u32, delta: i32) -> Option<u32> {
    if delta < 0 {
        value.checked_sub(delta.unsigned_abs())
    } else {
        value.checked_add(delta as u32)
    }
}

/// Movement directions over the eight-way cell neighbourhood.
///
/// Cardinal directions come first so the four-way subset is a prefix of
/// [`Direction::ALL`]. The discriminant order is stable and doubles as the
/// bit index used by [`Walls`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
    /// Diagonal movement up and to the right.
    NorthEast,
    /// Diagonal movement down and to the right.
    SouthEast,
    /// Diagonal movement down and to the left.
    SouthWest,
    /// Diagonal movement up and to the left.
    NorthWest,
}

impl Direction {
    /// The four cardinal directions, in scan order.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// All eight directions; the cardinal four form the prefix.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::NorthEast,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::NorthWest,
    ];

    /// Directions available under the provided topology.
    #[must_use]
    pub fn set(allow_diagonal: bool) -> &'static [Direction] {
        if allow_diagonal {
            &Self::ALL
        } else {
            &Self::CARDINAL
        }
    }

    /// Column/row delta applied by one step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// The direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::NorthEast => Direction::SouthWest,
            Direction::SouthEast => Direction::NorthWest,
            Direction::SouthWest => Direction::NorthEast,
            Direction::NorthWest => Direction::SouthEast,
        }
    }

    /// Reports whether this direction is one of the four diagonals.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::NorthEast
                | Direction::SouthEast
                | Direction::SouthWest
                | Direction::NorthWest
        )
    }

    /// Stable bit index of this direction within a [`Walls`] set.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
            Direction::NorthEast => 4,
            Direction::SouthEast => 5,
            Direction::SouthWest => 6,
            Direction::NorthWest => 7,
        }
    }

    /// Resolves a column/row delta back to a direction, if the delta is a
    /// single step.
    #[must_use]
    pub fn from_delta(dx: i32, dy: i32) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|direction| direction.delta() == (dx, dy))
    }

    /// Direction from one cell toward another, judged by coordinate signs.
    ///
    /// Matches the sign-based comparison used throughout door placement, so
    /// non-adjacent cells resolve to the diagonal or cardinal octant they
    /// fall in. Identical coordinates have no direction.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Direction> {
        let dx = sign(i64::from(to.x()) - i64::from(from.x()));
        let dy = sign(i64::from(to.y()) - i64::from(from.y()));
        Direction::from_delta(dx, dy)
    }

    /// The two directions flanking this one under the provided topology.
    ///
    /// In the diagonal topology a cardinal direction is flanked by the two
    /// diagonals sharing its axis, and a diagonal by its two cardinal
    /// components; in the cardinal topology the flanks are the two
    /// perpendicular directions.
    #[must_use]
    pub const fn flanking(self, allow_diagonal: bool) -> [Direction; 2] {
        if allow_diagonal {
            match self {
                Direction::West => [Direction::NorthWest, Direction::SouthWest],
                Direction::East => [Direction::NorthEast, Direction::SouthEast],
                Direction::North => [Direction::NorthWest, Direction::NorthEast],
                Direction::South => [Direction::SouthWest, Direction::SouthEast],
                Direction::NorthEast => [Direction::East, Direction::North],
                Direction::SouthEast => [Direction::East, Direction::South],
                Direction::NorthWest => [Direction::West, Direction::North],
                Direction::SouthWest => [Direction::West, Direction::South],
            }
        } else {
            match self {
                Direction::West | Direction::East => [Direction::North, Direction::South],
                _ => [Direction::West, Direction::East],
            }
        }
    }
}

const fn sign(value: i64) -> i32 {
    if value > 0 {
        1
    } else if value < 0 {
        -1
    } else {
        0
    }
}

/// Per-cell wall state over the eight-way neighbourhood.
///
/// A set bit means the wall toward that direction is present. Cells start
/// fully walled; generators carve passages by clearing matched bit pairs on
/// both sides of a shared edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Walls(u8);

impl Walls {
    /// Wall state with every side present.
    pub const SOLID: Walls = Walls(0xff);

    /// Wall state with every side open.
    pub const OPEN: Walls = Walls(0);

    /// Reports whether the wall toward `direction` is present.
    #[must_use]
    pub const fn contains(self, direction: Direction) -> bool {
        self.0 & (1 << direction.index()) != 0
    }

    /// Removes the wall toward `direction`.
    pub fn remove(&mut self, direction: Direction) {
        self.0 &= !(1 << direction.index());
    }

    /// Restores the wall toward `direction`.
    pub fn insert(&mut self, direction: Direction) {
        self.0 |= 1 << direction.index();
    }

    /// Number of walled sides among the provided directions.
    #[must_use]
    pub fn walled_count(self, directions: &[Direction]) -> usize {
        directions
            .iter()
            .filter(|direction| self.contains(**direction))
            .count()
    }

    /// Reports whether every side in the eight-way set is walled.
    #[must_use]
    pub const fn is_solid(self) -> bool {
        self.0 == Self::SOLID.0
    }
}

impl Default for Walls {
    fn default() -> Self {
        Self::SOLID
    }
}

/// Colour token identifying one door/key dependency in a maze.
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DoorColor(String);

impl DoorColor {
    /// Creates a new colour token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrows the underlying token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DoorColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier assigned to a path-finding agent.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}
