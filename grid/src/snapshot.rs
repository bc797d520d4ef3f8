//! Serializable maze state for transport across process or thread
//! boundaries.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use maze_nav_core::{CellCoord, Direction, DoorColor, Walls};

/// Wall, door, and key state of a single cell, detached from the grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Column of the captured cell.
    pub x: u32,
    /// Row of the captured cell.
    pub y: u32,
    /// Wall state of the captured cell.
    pub walls: Walls,
    /// Whether the captured cell is the maze start.
    pub is_start: bool,
    /// Whether the captured cell is the maze end.
    pub is_end: bool,
    /// Doors recorded on the captured cell, by direction.
    pub doors: BTreeMap<Direction, DoorColor>,
    /// Key colours lying in the captured cell.
    pub keys: BTreeSet<DoorColor>,
}

/// Complete serializable maze state, cells in row-major order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeSnapshot {
    /// Number of columns in the captured grid.
    pub width: u32,
    /// Number of rows in the captured grid.
    pub height: u32,
    /// Whether the captured maze uses the eight-way topology.
    pub allow_diagonal: bool,
    /// Captured cells, row-major.
    pub cells: Vec<CellSnapshot>,
}

/// Errors raised while restoring a maze from snapshot data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// The snapshot grid has a zero dimension.
    #[error("snapshot grid must have non-zero dimensions (got {width}x{height})")]
    EmptyGrid {
        /// Captured column count.
        width: u32,
        /// Captured row count.
        height: u32,
    },
    /// The cell list does not match the declared dimensions.
    #[error("snapshot declares {width}x{height} cells but carries {cells}")]
    DimensionMismatch {
        /// Captured column count.
        width: u32,
        /// Captured row count.
        height: u32,
        /// Number of cells actually present.
        cells: usize,
    },
    /// A cell's embedded coordinates disagree with its row-major position.
    #[error("snapshot cell at index {index} carries coordinates {found}")]
    MisplacedCell {
        /// Row-major index of the offending cell.
        index: usize,
        /// Coordinates embedded in the offending cell.
        found: CellCoord,
    },
    /// No cell in the snapshot is marked as the start.
    #[error("snapshot marks no start cell")]
    MissingStart,
    /// No cell in the snapshot is marked as the end.
    #[error("snapshot marks no end cell")]
    MissingEnd,
}

impl MazeSnapshot {
    /// Validates dimensions, coordinates, and start/end markers, returning
    /// the start and end coordinates on success.
    pub(crate) fn validate(&self) -> Result<(CellCoord, CellCoord), SnapshotError> {
        if self.width == 0 || self.height == 0 {
            return Err(SnapshotError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }

        let expected = self.width as usize * self.height as usize;
        if self.cells.len() != expected {
            return Err(SnapshotError::DimensionMismatch {
                width: self.width,
                height: self.height,
                cells: self.cells.len(),
            });
        }

        let mut start = None;
        let mut end = None;
        for (index, cell) in self.cells.iter().enumerate() {
            let expected_coord = CellCoord::new(
                (index as u32) % self.width,
                (index as u32) / self.width,
            );
            let found = CellCoord::new(cell.x, cell.y);
            if found != expected_coord {
                return Err(SnapshotError::MisplacedCell { index, found });
            }
            if cell.is_start {
                start = Some(found);
            }
            if cell.is_end {
                end = Some(found);
            }
        }

        let start = start.ok_or(SnapshotError::MissingStart)?;
        let end = end.ok_or(SnapshotError::MissingEnd)?;
        Ok((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_2x1() -> MazeSnapshot {
        MazeSnapshot {
            width: 2,
            height: 1,
            allow_diagonal: false,
            cells: vec![
                CellSnapshot {
                    x: 0,
                    y: 0,
                    walls: Walls::SOLID,
                    is_start: true,
                    is_end: false,
                    doors: BTreeMap::new(),
                    keys: BTreeSet::new(),
                },
                CellSnapshot {
                    x: 1,
                    y: 0,
                    walls: Walls::SOLID,
                    is_start: false,
                    is_end: true,
                    doors: BTreeMap::new(),
                    keys: BTreeSet::new(),
                },
            ],
        }
    }

    #[test]
    fn validate_accepts_a_well_formed_snapshot() {
        let snapshot = snapshot_2x1();
        let (start, end) = snapshot.validate().expect("well-formed snapshot");
        assert_eq!(start, CellCoord::new(0, 0));
        assert_eq!(end, CellCoord::new(1, 0));
    }

    #[test]
    fn validate_rejects_dimension_mismatch() {
        let mut snapshot = snapshot_2x1();
        snapshot.width = 3;
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotError::DimensionMismatch {
                width: 3,
                height: 1,
                cells: 2
            })
        );
    }

    #[test]
    fn validate_rejects_misplaced_cells() {
        let mut snapshot = snapshot_2x1();
        snapshot.cells[1].x = 5;
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotError::MisplacedCell {
                index: 1,
                found: CellCoord::new(5, 0)
            })
        );
    }

    #[test]
    fn validate_requires_start_and_end_markers() {
        let mut snapshot = snapshot_2x1();
        snapshot.cells[0].is_start = false;
        assert_eq!(snapshot.validate(), Err(SnapshotError::MissingStart));

        let mut snapshot = snapshot_2x1();
        snapshot.cells[1].is_end = false;
        assert_eq!(snapshot.validate(), Err(SnapshotError::MissingEnd));
    }

    #[test]
    fn snapshot_round_trips_through_bincode_and_json() {
        let mut snapshot = snapshot_2x1();
        let red = DoorColor::new("red");
        let _ = snapshot.cells[0]
            .doors
            .insert(Direction::East, red.clone());
        let _ = snapshot.cells[1].keys.insert(red);

        let bytes = bincode::serialize(&snapshot).expect("serialize");
        let restored: MazeSnapshot = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, snapshot);

        let json = serde_json::to_string(&snapshot).expect("serialize json");
        let restored: MazeSnapshot = serde_json::from_str(&json).expect("deserialize json");
        assert_eq!(restored, snapshot);
    }
}
