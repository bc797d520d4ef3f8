//! Single maze cell: wall state, generation bookkeeping, door and key
//! annotations.

use std::collections::{BTreeMap, BTreeSet};

use maze_nav_core::{CellCoord, Direction, DoorColor, Walls};

/// One cell of the maze grid.
///
/// Cells begin fully walled and unvisited. Wall mutation goes through the
/// owning [`Maze`](crate::Maze) so that the symmetric-pair invariant (a
/// passage open on one side is open on the other) holds everywhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MazeCell {
    coord: CellCoord,
    walls: Walls,
    visited: bool,
    is_start: bool,
    is_end: bool,
    doors: BTreeMap<Direction, DoorColor>,
    keys: BTreeSet<DoorColor>,
}

impl MazeCell {
    pub(crate) fn new(coord: CellCoord) -> Self {
        Self {
            coord,
            walls: Walls::SOLID,
            visited: false,
            is_start: false,
            is_end: false,
            doors: BTreeMap::new(),
            keys: BTreeSet::new(),
        }
    }

    /// Grid coordinate of the cell.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Current wall state of the cell.
    #[must_use]
    pub const fn walls(&self) -> Walls {
        self.walls
    }

    /// Reports whether the wall toward `direction` is present.
    #[must_use]
    pub fn has_wall(&self, direction: Direction) -> bool {
        self.walls.contains(direction)
    }

    /// Reports whether the cell was visited during generation.
    #[must_use]
    pub const fn visited(&self) -> bool {
        self.visited
    }

    /// Reports whether the cell is the maze start.
    #[must_use]
    pub const fn is_start(&self) -> bool {
        self.is_start
    }

    /// Reports whether the cell is the maze end.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.is_end
    }

    /// Colour of the door toward `direction`, if one is present.
    #[must_use]
    pub fn door(&self, direction: Direction) -> Option<&DoorColor> {
        self.doors.get(&direction)
    }

    /// Iterator over the doors recorded on this cell.
    pub fn doors(&self) -> impl Iterator<Item = (Direction, &DoorColor)> {
        self.doors.iter().map(|(direction, color)| (*direction, color))
    }

    /// Reports whether any door is recorded on this cell.
    #[must_use]
    pub fn has_doors(&self) -> bool {
        !self.doors.is_empty()
    }

    /// Iterator over the key colours lying in this cell.
    pub fn keys(&self) -> impl Iterator<Item = &DoorColor> {
        self.keys.iter()
    }

    /// Reports whether a key of `color` lies in this cell.
    #[must_use]
    pub fn has_key(&self, color: &DoorColor) -> bool {
        self.keys.contains(color)
    }

    /// Reports whether any key lies in this cell.
    #[must_use]
    pub fn holds_keys(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Reports whether the cell is a dead end under the provided topology.
    ///
    /// More than two walled sides of four (cardinal), or more than six of
    /// eight (diagonal), leave only one way out.
    #[must_use]
    pub fn is_dead_end(&self, allow_diagonal: bool) -> bool {
        if allow_diagonal {
            self.walls.walled_count(&Direction::ALL) > 6
        } else {
            self.walls.walled_count(&Direction::CARDINAL) > 2
        }
    }

    pub(crate) fn walls_mut(&mut self) -> &mut Walls {
        &mut self.walls
    }

    pub(crate) fn set_visited(&mut self, visited: bool) {
        self.visited = visited;
    }

    pub(crate) fn set_start_flag(&mut self, is_start: bool) {
        self.is_start = is_start;
    }

    pub(crate) fn set_end_flag(&mut self, is_end: bool) {
        self.is_end = is_end;
    }

    pub(crate) fn place_door(&mut self, direction: Direction, color: DoorColor) {
        let _ = self.doors.insert(direction, color);
    }

    pub(crate) fn remove_doors(&mut self, color: Option<&DoorColor>) {
        match color {
            Some(color) => self.doors.retain(|_, present| present != color),
            None => self.doors.clear(),
        }
    }

    pub(crate) fn place_key(&mut self, color: DoorColor) {
        let _ = self.keys.insert(color);
    }

    pub(crate) fn remove_keys(&mut self, color: Option<&DoorColor>) {
        match color {
            Some(color) => {
                let _ = self.keys.remove(color);
            }
            None => self.keys.clear(),
        }
    }

    pub(crate) fn restore(
        &mut self,
        walls: Walls,
        is_start: bool,
        is_end: bool,
        doors: BTreeMap<Direction, DoorColor>,
        keys: BTreeSet<DoorColor>,
    ) {
        self.walls = walls;
        self.is_start = is_start;
        self.is_end = is_end;
        self.doors = doors;
        self.keys = keys;
        self.visited = false;
    }

    pub(crate) fn doors_map(&self) -> &BTreeMap<Direction, DoorColor> {
        &self.doors
    }

    pub(crate) fn keys_set(&self) -> &BTreeSet<DoorColor> {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::MazeCell;
    use maze_nav_core::{CellCoord, Direction, DoorColor};

    #[test]
    fn fresh_cell_is_a_dead_end_in_both_topologies() {
        let cell = MazeCell::new(CellCoord::new(0, 0));
        assert!(cell.is_dead_end(false));
        assert!(cell.is_dead_end(true));
    }

    #[test]
    fn dead_end_threshold_tracks_open_sides() {
        let mut cell = MazeCell::new(CellCoord::new(0, 0));
        cell.walls_mut().remove(Direction::North);
        assert!(cell.is_dead_end(false), "one opening keeps a dead end");
        cell.walls_mut().remove(Direction::South);
        assert!(!cell.is_dead_end(false), "a corridor is not a dead end");
        assert!(cell.is_dead_end(true), "six diagonal walls still closed");
        cell.walls_mut().remove(Direction::NorthEast);
        assert!(!cell.is_dead_end(true));
    }

    #[test]
    fn door_and_key_markings_round_trip() {
        let mut cell = MazeCell::new(CellCoord::new(2, 3));
        let red = DoorColor::new("red");
        let cyan = DoorColor::new("cyan");

        cell.place_door(Direction::East, red.clone());
        cell.place_door(Direction::North, cyan.clone());
        cell.place_key(red.clone());
        cell.place_key(cyan.clone());

        assert_eq!(cell.door(Direction::East), Some(&red));
        assert!(cell.has_key(&red));

        cell.remove_doors(Some(&red));
        assert_eq!(cell.door(Direction::East), None);
        assert_eq!(cell.door(Direction::North), Some(&cyan));

        cell.remove_keys(Some(&red));
        assert!(!cell.has_key(&red));
        assert!(cell.has_key(&cyan));

        cell.remove_doors(None);
        cell.remove_keys(None);
        assert!(!cell.has_doors());
        assert!(!cell.holds_keys());
    }
}
