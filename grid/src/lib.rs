#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative maze grid state: cells, walls, doors, keys, and the
//! maze-owned random stream.
//!
//! Every wall mutation flows through [`Maze::connect`] and
//! [`Maze::disconnect`] so the symmetric-pair invariant holds: if a cell's
//! wall toward a neighbour is absent, the neighbour's wall back is absent
//! too. Cells are held in a dense row-major arena addressed by [`CellId`];
//! search layers reference cells by id instead of holding pointers into the
//! grid.

mod cell;
mod rng;
mod snapshot;

use std::collections::HashSet;

use thiserror::Error;

use maze_nav_core::{CellCoord, Direction, DoorColor};

pub use cell::MazeCell;
pub use rng::SeededRng;
pub use snapshot::{CellSnapshot, MazeSnapshot, SnapshotError};

const RANDOM_CELL_ATTEMPTS: u32 = 32;

/// Stable arena index of a cell within its maze.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u32);

impl CellId {
    /// Position of the cell within the dense row-major arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Errors raised by grid construction and coordinate-addressed mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// The requested grid has a zero dimension.
    #[error("maze dimensions must be non-zero (got {width}x{height})")]
    EmptyGrid {
        /// Requested column count.
        width: u32,
        /// Requested row count.
        height: u32,
    },
    /// The provided coordinate lies outside the grid.
    #[error("cell {0} lies outside the grid")]
    OutOfBounds(CellCoord),
}

/// Grid of maze cells with start/end markers, door/key bookkeeping, and an
/// owned seeded random stream.
#[derive(Clone, Debug)]
pub struct Maze {
    width: u32,
    height: u32,
    allow_diagonal: bool,
    cells: Vec<MazeCell>,
    start: CellId,
    end: CellId,
    rng: SeededRng,
    door_order: Vec<DoorColor>,
    door_cells: std::collections::BTreeMap<DoorColor, Vec<CellCoord>>,
    key_cells: std::collections::BTreeMap<DoorColor, CellCoord>,
}

impl Maze {
    /// Creates a fully walled maze with start at the origin and end at the
    /// far corner. Use [`Maze::randomize_start_end`] to reposition them.
    pub fn new(
        width: u32,
        height: u32,
        seed: u64,
        allow_diagonal: bool,
    ) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyGrid { width, height });
        }

        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(MazeCell::new(CellCoord::new(x, y)));
            }
        }

        let mut maze = Self {
            width,
            height,
            allow_diagonal,
            cells,
            start: CellId(0),
            end: CellId(width * height - 1),
            rng: SeededRng::new(seed),
            door_order: Vec::new(),
            door_cells: std::collections::BTreeMap::new(),
            key_cells: std::collections::BTreeMap::new(),
        };
        maze.apply_marker_flags();
        Ok(maze)
    }

    /// Restores a maze from snapshot data with a fresh random stream.
    pub fn from_cell_data(snapshot: &MazeSnapshot, seed: u64) -> Result<Self, SnapshotError> {
        let mut maze = Self::new(snapshot.width.max(1), snapshot.height.max(1), seed, false)
            .map_err(|_| SnapshotError::EmptyGrid {
                width: snapshot.width,
                height: snapshot.height,
            })?;
        maze.set_cell_data(snapshot)?;
        Ok(maze)
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Whether the maze uses the eight-way topology.
    #[must_use]
    pub const fn allow_diagonal(&self) -> bool {
        self.allow_diagonal
    }

    /// Coordinate of the start cell.
    #[must_use]
    pub fn start(&self) -> CellCoord {
        self.coord_of(self.start)
    }

    /// Coordinate of the end cell.
    #[must_use]
    pub fn end(&self) -> CellCoord {
        self.coord_of(self.end)
    }

    /// Mutable access to the maze-owned random stream.
    pub fn rng_mut(&mut self) -> &mut SeededRng {
        &mut self.rng
    }

    /// Restarts the owned random stream from a new seed.
    pub fn reseed(&mut self, seed: u64) {
        self.rng.set_seed(seed);
    }

    /// Reports whether the coordinate lies within the grid.
    #[must_use]
    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.x() < self.width && coord.y() < self.height
    }

    /// Arena id of the cell at `coord`, if it lies within the grid.
    #[must_use]
    pub fn id_of(&self, coord: CellCoord) -> Option<CellId> {
        if self.contains(coord) {
            Some(CellId(coord.y() * self.width + coord.x()))
        } else {
            None
        }
    }

    /// Coordinate of the cell with the provided arena id.
    #[must_use]
    pub fn coord_of(&self, id: CellId) -> CellCoord {
        debug_assert!(id.index() < self.cells.len(), "cell id out of range");
        CellCoord::new(id.0 % self.width, id.0 / self.width)
    }

    /// Borrows the cell at `coord`, if it lies within the grid.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&MazeCell> {
        self.id_of(coord).map(|id| &self.cells[id.index()])
    }

    /// Borrows the cell with the provided arena id.
    #[must_use]
    pub fn cell_by_id(&self, id: CellId) -> &MazeCell {
        &self.cells[id.index()]
    }

    /// Iterator over all cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &MazeCell> {
        self.cells.iter()
    }

    fn cell_mut(&mut self, coord: CellCoord) -> Option<&mut MazeCell> {
        let id = self.id_of(coord)?;
        Some(&mut self.cells[id.index()])
    }

    /// Marks the cell at `coord` as the maze start.
    pub fn set_start(&mut self, coord: CellCoord) -> Result<(), GridError> {
        let id = self.id_of(coord).ok_or(GridError::OutOfBounds(coord))?;
        self.cells[self.start.index()].set_start_flag(false);
        self.start = id;
        self.cells[id.index()].set_start_flag(true);
        Ok(())
    }

    /// Marks the cell at `coord` as the maze end.
    pub fn set_end(&mut self, coord: CellCoord) -> Result<(), GridError> {
        let id = self.id_of(coord).ok_or(GridError::OutOfBounds(coord))?;
        self.cells[self.end.index()].set_end_flag(false);
        self.end = id;
        self.cells[id.index()].set_end_flag(true);
        Ok(())
    }

    /// Places start and end on opposite edges of the grid, the end
    /// constrained near the start's cross-axis coordinate. Does not
    /// guarantee the two are far apart.
    pub fn randomize_start_end(&mut self) {
        let width = self.width;
        let height = self.height;

        let start_edge = self.rng.index(4);
        let (sx, sy) = match start_edge {
            0 => (self.rng.index(width as usize) as u32, 0),
            1 => (width - 1, self.rng.index(height as usize) as u32),
            2 => (self.rng.index(width as usize) as u32, height - 1),
            _ => (0, self.rng.index(height as usize) as u32),
        };

        let end_edge = (start_edge + 2) % 4;
        let (x_lo, x_hi, y_lo, y_hi) = if start_edge == 0 || start_edge == 2 {
            (sx.saturating_sub(2), (sx + 2).min(width - 1), 0, height - 1)
        } else {
            (0, width - 1, sy.saturating_sub(2), (sy + 2).min(height - 1))
        };

        let (ex, ey) = match end_edge {
            0 => (self.range_draw(x_lo, x_hi), 0),
            1 => (width - 1, self.range_draw(y_lo, y_hi)),
            2 => (self.range_draw(x_lo, x_hi), height - 1),
            _ => (0, self.range_draw(y_lo, y_hi)),
        };

        self.set_start(CellCoord::new(sx, sy))
            .expect("start edge coordinate is in bounds");
        self.set_end(CellCoord::new(ex, ey))
            .expect("end edge coordinate is in bounds");
    }

    fn range_draw(&mut self, lo: u32, hi: u32) -> u32 {
        let span = hi.saturating_sub(lo).max(1) as usize;
        lo + self.rng.index(span) as u32
    }

    /// Picks a random cell whose Manhattan distance to every anchor exceeds
    /// `margin`, falling back to an unconstrained pick after bounded
    /// retries.
    pub fn random_cell_away_from(&mut self, anchors: &[CellCoord], margin: u32) -> CellCoord {
        let mut last = CellCoord::new(0, 0);
        for _ in 0..RANDOM_CELL_ATTEMPTS {
            let x = self.rng.index(self.width as usize) as u32;
            let y = self.rng.index(self.height as usize) as u32;
            last = CellCoord::new(x, y);
            if anchors
                .iter()
                .all(|anchor| anchor.manhattan_distance(last) > margin)
            {
                return last;
            }
        }
        last
    }

    /// Coordinate one step from `coord` in `direction`, if it stays inside
    /// the grid.
    #[must_use]
    pub fn neighbor(&self, coord: CellCoord, direction: Direction) -> Option<CellCoord> {
        let stepped = coord.step(direction)?;
        self.contains(stepped).then_some(stepped)
    }

    /// In-bounds neighbours of `coord` under the provided topology.
    #[must_use]
    pub fn neighbors(&self, coord: CellCoord, allow_diagonal: bool) -> Neighbors {
        let mut neighbors = Neighbors::default();
        for direction in Direction::set(allow_diagonal) {
            if let Some(next) = self.neighbor(coord, *direction) {
                neighbors.push(next);
            }
        }
        neighbors
    }

    /// Neighbours not yet visited during generation.
    #[must_use]
    pub fn unvisited_neighbors(&self, coord: CellCoord, allow_diagonal: bool) -> Vec<CellCoord> {
        self.neighbors(coord, allow_diagonal)
            .filter(|next| !self.is_visited(*next))
            .collect()
    }

    /// Neighbours already visited during generation.
    #[must_use]
    pub fn visited_neighbors(&self, coord: CellCoord, allow_diagonal: bool) -> Vec<CellCoord> {
        self.neighbors(coord, allow_diagonal)
            .filter(|next| self.is_visited(*next))
            .collect()
    }

    /// Unvisited neighbours whose connecting passage may legally be carved.
    #[must_use]
    pub fn carvable_unvisited_neighbors(
        &self,
        coord: CellCoord,
        allow_diagonal: bool,
    ) -> Vec<CellCoord> {
        self.neighbors(coord, allow_diagonal)
            .filter(|next| !self.is_visited(*next) && self.can_carve(coord, *next))
            .collect()
    }

    /// Reports whether the passage from `coord` toward `direction` is open
    /// on both sides.
    #[must_use]
    pub fn is_passage_open(&self, coord: CellCoord, direction: Direction) -> bool {
        let Some(here) = self.cell(coord) else {
            return false;
        };
        let Some(next) = self.neighbor(coord, direction) else {
            return false;
        };
        let there = &self.cells[self.id_of(next).expect("neighbor in bounds").index()];
        !here.has_wall(direction) && !there.has_wall(direction.opposite())
    }

    /// Neighbours reachable through wall-free passages.
    #[must_use]
    pub fn reachable_neighbors(&self, coord: CellCoord, allow_diagonal: bool) -> Neighbors {
        let mut neighbors = Neighbors::default();
        for direction in Direction::set(allow_diagonal) {
            if self.is_passage_open(coord, *direction) {
                if let Some(next) = self.neighbor(coord, *direction) {
                    neighbors.push(next);
                }
            }
        }
        neighbors
    }

    /// Reports whether a passage between two adjacent cells may be carved.
    ///
    /// Orthogonal passages always may. A diagonal passage may not cut
    /// through a fully solid corner: at least one of the four orthogonal
    /// passages around the shared corner must already be open.
    #[must_use]
    pub fn can_carve(&self, from: CellCoord, to: CellCoord) -> bool {
        let Some(direction) = self.adjacency(from, to) else {
            return false;
        };
        if !direction.is_diagonal() {
            return true;
        }
        self.corner_open(from, direction)
    }

    fn corner_open(&self, from: CellCoord, direction: Direction) -> bool {
        let [first, second] = direction.flanking(true);
        let around = [
            (Some(from), first),
            (Some(from), second),
            (self.neighbor(from, first), second),
            (self.neighbor(from, second), first),
        ];
        around
            .into_iter()
            .any(|(cell, step)| cell.is_some_and(|coord| self.is_passage_open(coord, step)))
    }

    fn adjacency(&self, from: CellCoord, to: CellCoord) -> Option<Direction> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        let direction = Direction::between(from, to)?;
        (from.step(direction) == Some(to)).then_some(direction)
    }

    /// Removes the wall pair between two adjacent cells and marks both
    /// visited. Returns `false` when the cells are not adjacent or the
    /// carve is vetoed by the solid-corner rule.
    pub fn connect(&mut self, from: CellCoord, to: CellCoord) -> bool {
        let Some(direction) = self.adjacency(from, to) else {
            return false;
        };
        if direction.is_diagonal() && !self.corner_open(from, direction) {
            return false;
        }
        self.open_passage(from, to, direction);
        true
    }

    fn open_passage(&mut self, from: CellCoord, to: CellCoord, direction: Direction) {
        {
            let here = self.cell_mut(from).expect("carve origin in bounds");
            here.walls_mut().remove(direction);
            here.set_visited(true);
        }
        let there = self.cell_mut(to).expect("carve target in bounds");
        there.walls_mut().remove(direction.opposite());
        there.set_visited(true);
    }

    /// Restores the wall pair between two adjacent cells. Returns `false`
    /// when the cells are not adjacent.
    pub fn disconnect(&mut self, from: CellCoord, to: CellCoord) -> bool {
        let Some(direction) = self.adjacency(from, to) else {
            return false;
        };
        {
            let here = self.cell_mut(from).expect("origin in bounds");
            here.walls_mut().insert(direction);
            here.set_visited(true);
        }
        let there = self.cell_mut(to).expect("target in bounds");
        there.walls_mut().insert(direction.opposite());
        there.set_visited(true);
        true
    }

    /// Marks the cell at `coord` as visited during generation.
    pub fn mark_visited(&mut self, coord: CellCoord) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.set_visited(true);
        }
    }

    /// Reports whether the cell at `coord` was visited during generation.
    #[must_use]
    pub fn is_visited(&self, coord: CellCoord) -> bool {
        self.cell(coord).is_some_and(MazeCell::visited)
    }

    /// Clears every cell's visited flag.
    pub fn clear_visited(&mut self) {
        for cell in &mut self.cells {
            cell.set_visited(false);
        }
    }

    /// Reports whether the cell at `coord` is a dead end.
    #[must_use]
    pub fn is_dead_end(&self, coord: CellCoord, allow_diagonal: bool) -> bool {
        self.cell(coord)
            .is_some_and(|cell| cell.is_dead_end(allow_diagonal))
    }

    /// Opens up dead-end cells by connecting each to a neighbour.
    ///
    /// With `from_center` the pass walks a centre-out spiral, keeps a
    /// connected set seeded from the centre cell(s), only joins dead ends
    /// toward that set, and finally opens the centre into a plaza — useful
    /// to make the topology converge toward the middle. Otherwise the pass
    /// runs row-major and joins each dead end to a random neighbour,
    /// preferring visited ones.
    pub fn remove_dead_ends(&mut self, from_center: bool, allow_diagonal: bool) {
        if from_center {
            self.remove_dead_ends_spiral(allow_diagonal);
        } else {
            for y in 0..self.height {
                for x in 0..self.width {
                    let coord = CellCoord::new(x, y);
                    if self.is_dead_end(coord, allow_diagonal) {
                        let _ = self.open_dead_end(coord, allow_diagonal, None);
                    }
                }
            }
        }
    }

    fn remove_dead_ends_spiral(&mut self, allow_diagonal: bool) {
        let center_x = i64::from(self.width / 2);
        let center_y = i64::from(self.height / 2);
        let max_layer = center_x
            .max(i64::from(self.width) - center_x - 1)
            .max(center_y)
            .max(i64::from(self.height) - center_y - 1);

        let centers = self.center_cells(center_x, center_y);
        let mut connected: HashSet<CellCoord> = centers.iter().copied().collect();

        for (x, y) in spiral_coords(center_x, center_y, max_layer) {
            if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
                continue;
            }
            let coord = CellCoord::new(x as u32, y as u32);
            if self.is_dead_end(coord, allow_diagonal)
                && self.open_dead_end(coord, allow_diagonal, Some(&connected))
            {
                let _ = connected.insert(coord);
            }
        }

        for center in centers {
            self.mark_visited(center);
            let neighbors: Vec<CellCoord> = self.neighbors(center, allow_diagonal).collect();
            for neighbor in neighbors {
                let _ = self.connect(center, neighbor);
            }
        }
    }

    fn center_cells(&self, center_x: i64, center_y: i64) -> Vec<CellCoord> {
        let (cx, cy) = (center_x as u32, center_y as u32);
        if self.width % 2 == 0 && self.height % 2 == 0 {
            vec![
                CellCoord::new(cx, cy),
                CellCoord::new(cx - 1, cy),
                CellCoord::new(cx, cy - 1),
                CellCoord::new(cx - 1, cy - 1),
            ]
        } else {
            vec![CellCoord::new(cx, cy)]
        }
    }

    fn open_dead_end(
        &mut self,
        coord: CellCoord,
        allow_diagonal: bool,
        connected: Option<&HashSet<CellCoord>>,
    ) -> bool {
        let mut neighbors = self.visited_neighbors(coord, allow_diagonal);
        if neighbors.is_empty() {
            neighbors = self.unvisited_neighbors(coord, allow_diagonal);
        }

        if let Some(connected) = connected {
            // Only join toward the connected region; if any candidate is in
            // it the whole candidate set keeps the path to the centre.
            let any_connected = neighbors.iter().any(|next| connected.contains(next));
            if !any_connected {
                neighbors.retain(|next| connected.contains(next));
            }
        }

        if neighbors.is_empty() {
            return false;
        }
        let pick = neighbors[self.rng.index(neighbors.len())];
        self.connect(coord, pick)
    }

    /// Replaces the wall between two adjacent cells with a door of the
    /// provided colour, opening the passage if it was walled. Returns
    /// `false` when no neighbour lies in that direction.
    pub fn set_door(&mut self, coord: CellCoord, direction: Direction, color: DoorColor) -> bool {
        let Some(next) = self.neighbor(coord, direction) else {
            return false;
        };
        if self.cell(coord).is_some_and(|cell| cell.has_wall(direction)) {
            self.open_passage(coord, next, direction);
        }
        self.cell_mut(coord)
            .expect("door cell in bounds")
            .place_door(direction, color);
        true
    }

    /// Places a key of the provided colour in the cell at `coord`.
    pub fn set_key(&mut self, coord: CellCoord, color: DoorColor) -> bool {
        match self.cell_mut(coord) {
            Some(cell) => {
                cell.place_key(color);
                true
            }
            None => false,
        }
    }

    /// Appends colours to the recorded door placement order.
    pub fn extend_door_order(&mut self, colors: &[DoorColor]) {
        self.door_order.extend_from_slice(colors);
    }

    /// Colours in door placement order.
    #[must_use]
    pub fn door_order(&self) -> &[DoorColor] {
        &self.door_order
    }

    /// Records a cell carrying doors of the provided colour.
    pub fn record_door_cell(&mut self, color: DoorColor, coord: CellCoord) {
        self.door_cells.entry(color).or_default().push(coord);
    }

    /// Cells recorded as carrying doors of the provided colour.
    #[must_use]
    pub fn door_cells(&self, color: &DoorColor) -> &[CellCoord] {
        self.door_cells
            .get(color)
            .map_or(&[], |cells| cells.as_slice())
    }

    /// Records the cell holding the key of the provided colour.
    pub fn record_key_cell(&mut self, color: DoorColor, coord: CellCoord) {
        let _ = self.key_cells.insert(color, coord);
    }

    /// Cell recorded as holding the key of the provided colour.
    #[must_use]
    pub fn key_cell(&self, color: &DoorColor) -> Option<CellCoord> {
        self.key_cells.get(color).copied()
    }

    /// Removes one colour's (or every colour's) doors and keys and resets
    /// the matching bookkeeping.
    pub fn clear_doors_and_keys(&mut self, color: Option<&DoorColor>) {
        let door_targets: Vec<(DoorColor, Vec<CellCoord>)> = self
            .door_cells
            .iter()
            .filter(|(recorded, _)| color.map_or(true, |color| *recorded == color))
            .map(|(recorded, cells)| (recorded.clone(), cells.clone()))
            .collect();
        for (recorded, cells) in &door_targets {
            for cell in cells {
                if let Some(cell) = self.cell_mut(*cell) {
                    cell.remove_doors(Some(recorded));
                    cell.remove_keys(Some(recorded));
                }
            }
            let _ = self.door_cells.remove(recorded);
        }

        let key_targets: Vec<(DoorColor, CellCoord)> = self
            .key_cells
            .iter()
            .filter(|(recorded, _)| color.map_or(true, |color| *recorded == color))
            .map(|(recorded, cell)| (recorded.clone(), *cell))
            .collect();
        for (recorded, cell) in &key_targets {
            if let Some(cell) = self.cell_mut(*cell) {
                cell.remove_keys(Some(recorded));
            }
            let _ = self.key_cells.remove(recorded);
        }

        match color {
            Some(color) => self.door_order.retain(|recorded| recorded != color),
            None => self.door_order.clear(),
        }
    }

    /// Captures the wall, door, and key state of every cell for transport.
    #[must_use]
    pub fn cell_data(&self) -> MazeSnapshot {
        MazeSnapshot {
            width: self.width,
            height: self.height,
            allow_diagonal: self.allow_diagonal,
            cells: self
                .cells
                .iter()
                .map(|cell| CellSnapshot {
                    x: cell.coord().x(),
                    y: cell.coord().y(),
                    walls: cell.walls(),
                    is_start: cell.is_start(),
                    is_end: cell.is_end(),
                    doors: cell.doors_map().clone(),
                    keys: cell.keys_set().clone(),
                })
                .collect(),
        }
    }

    /// Replaces the grid with the snapshot's cells, dimensions, and
    /// topology. Door bookkeeping is reset; the owned random stream is
    /// kept.
    pub fn set_cell_data(&mut self, snapshot: &MazeSnapshot) -> Result<(), SnapshotError> {
        let (start, end) = snapshot.validate()?;

        self.width = snapshot.width;
        self.height = snapshot.height;
        self.allow_diagonal = snapshot.allow_diagonal;
        self.cells = snapshot
            .cells
            .iter()
            .map(|data| {
                let mut cell = MazeCell::new(CellCoord::new(data.x, data.y));
                cell.restore(
                    data.walls,
                    data.is_start,
                    data.is_end,
                    data.doors.clone(),
                    data.keys.clone(),
                );
                cell
            })
            .collect();
        self.start = self.id_of(start).expect("validated start in bounds");
        self.end = self.id_of(end).expect("validated end in bounds");
        self.door_order.clear();
        self.door_cells.clear();
        self.key_cells.clear();
        Ok(())
    }

    fn apply_marker_flags(&mut self) {
        let start = self.start;
        let end = self.end;
        self.cells[start.index()].set_start_flag(true);
        self.cells[end.index()].set_end_flag(true);
    }
}

/// Fixed-capacity iterator over neighbouring cell coordinates.
#[derive(Clone, Debug, Default)]
pub struct Neighbors {
    buffer: [Option<CellCoord>; 8],
    len: usize,
    cursor: usize,
}

impl Neighbors {
    fn push(&mut self, cell: CellCoord) {
        if self.len < self.buffer.len() {
            self.buffer[self.len] = Some(cell);
            self.len += 1;
        }
    }
}

impl Iterator for Neighbors {
    type Item = CellCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.len {
            return None;
        }
        let value = self.buffer[self.cursor];
        self.cursor += 1;
        value
    }
}

fn spiral_coords(center_x: i64, center_y: i64, max_layer: i64) -> Vec<(i64, i64)> {
    let mut coords = vec![(center_x, center_y)];
    for layer in 1..=max_layer {
        let mut x = center_x + layer;
        let mut y = center_y - layer;
        while y <= center_y + layer {
            coords.push((x, y));
            y += 1;
        }
        x -= 1;
        y -= 1;
        while x >= center_x - layer {
            coords.push((x, y));
            x -= 1;
        }
        x += 1;
        y -= 1;
        while y >= center_y - layer {
            coords.push((x, y));
            y -= 1;
        }
        x += 1;
        y += 1;
        while x <= center_x + layer {
            coords.push((x, y));
            x += 1;
        }
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_nav_core::Walls;

    fn maze(width: u32, height: u32, diagonal: bool) -> Maze {
        Maze::new(width, height, 0xf00d, diagonal).expect("non-empty grid")
    }

    #[test]
    fn new_rejects_empty_grids() {
        assert_eq!(
            Maze::new(0, 4, 1, false).unwrap_err(),
            GridError::EmptyGrid {
                width: 0,
                height: 4
            }
        );
    }

    #[test]
    fn connect_removes_the_wall_pair_symmetrically() {
        let mut maze = maze(3, 3, false);
        let a = CellCoord::new(1, 1);
        let b = CellCoord::new(2, 1);
        assert!(maze.connect(a, b));

        assert!(!maze.cell(a).unwrap().has_wall(Direction::East));
        assert!(!maze.cell(b).unwrap().has_wall(Direction::West));
        assert!(maze.is_visited(a) && maze.is_visited(b));
        assert!(maze.is_passage_open(a, Direction::East));
        assert!(maze.is_passage_open(b, Direction::West));

        assert!(maze.disconnect(a, b));
        assert_eq!(maze.cell(a).unwrap().walls(), Walls::SOLID);
        assert_eq!(maze.cell(b).unwrap().walls(), Walls::SOLID);
    }

    #[test]
    fn connect_rejects_non_adjacent_cells() {
        let mut maze = maze(4, 4, false);
        assert!(!maze.connect(CellCoord::new(0, 0), CellCoord::new(2, 0)));
        assert!(!maze.connect(CellCoord::new(0, 0), CellCoord::new(0, 0)));
    }

    #[test]
    fn diagonal_carve_refused_through_a_solid_corner() {
        let mut maze = maze(3, 3, true);
        let a = CellCoord::new(0, 1);
        let b = CellCoord::new(1, 0);
        assert!(!maze.can_carve(a, b));
        assert!(!maze.connect(a, b));

        // Opening one flanking orthogonal passage unlocks the corner.
        assert!(maze.connect(a, CellCoord::new(0, 0)));
        assert!(maze.can_carve(a, b));
        assert!(maze.connect(a, b));
        assert!(maze.is_passage_open(a, Direction::NorthEast));
    }

    #[test]
    fn reachable_neighbors_follow_open_passages_only() {
        let mut maze = maze(3, 3, false);
        let center = CellCoord::new(1, 1);
        assert_eq!(maze.reachable_neighbors(center, false).count(), 0);

        assert!(maze.connect(center, CellCoord::new(1, 0)));
        assert!(maze.connect(center, CellCoord::new(2, 1)));
        let reachable: Vec<CellCoord> = maze.reachable_neighbors(center, false).collect();
        assert_eq!(reachable, vec![CellCoord::new(1, 0), CellCoord::new(2, 1)]);
    }

    #[test]
    fn randomize_start_end_lands_on_opposite_edges() {
        let mut maze = maze(9, 7, false);
        for _ in 0..16 {
            maze.randomize_start_end();
            let start_edges = edges_of(maze.start(), 9, 7);
            let end_edges = edges_of(maze.end(), 9, 7);
            assert!(!start_edges.is_empty(), "start off every edge");
            assert!(
                start_edges
                    .iter()
                    .any(|edge| end_edges.contains(&((edge + 2) % 4))),
                "end {} does not oppose start {}",
                maze.end(),
                maze.start()
            );
        }
    }

    fn edges_of(coord: CellCoord, width: u32, height: u32) -> Vec<usize> {
        // Corner cells belong to two edges; report every match.
        let mut edges = Vec::new();
        if coord.y() == 0 {
            edges.push(0);
        }
        if coord.x() == width - 1 {
            edges.push(1);
        }
        if coord.y() == height - 1 {
            edges.push(2);
        }
        if coord.x() == 0 {
            edges.push(3);
        }
        edges
    }

    #[test]
    fn randomize_start_end_is_deterministic_per_seed() {
        let mut first = maze(8, 8, false);
        let mut second = maze(8, 8, false);
        first.randomize_start_end();
        second.randomize_start_end();
        assert_eq!(first.start(), second.start());
        assert_eq!(first.end(), second.end());
    }

    #[test]
    fn remove_dead_ends_opens_every_fully_walled_cell() {
        let mut maze = maze(3, 3, false);
        maze.remove_dead_ends(false, false);
        for cell in maze.cells() {
            assert!(
                !cell.walls().is_solid(),
                "cell {} stayed sealed",
                cell.coord()
            );
        }
    }

    #[test]
    fn spiral_dead_end_removal_opens_the_center() {
        let mut maze = maze(5, 5, false);
        maze.remove_dead_ends(true, false);
        let center = CellCoord::new(2, 2);
        let open = maze.reachable_neighbors(center, false).count();
        assert_eq!(open, 4, "center should open into a plaza");
    }

    #[test]
    fn spiral_coords_cover_each_layer_once() {
        let coords = spiral_coords(0, 0, 1);
        assert_eq!(coords[0], (0, 0));
        // Eight ring cells, with the starting corner revisited at the end.
        assert_eq!(coords.len(), 1 + 9);
        let unique: HashSet<(i64, i64)> = coords.iter().copied().collect();
        assert_eq!(unique.len(), 9);
    }

    #[test]
    fn doors_open_walls_and_clear_with_bookkeeping() {
        let mut maze = maze(4, 4, false);
        let red = DoorColor::new("red");
        let coord = CellCoord::new(1, 1);

        assert!(maze.set_door(coord, Direction::East, red.clone()));
        maze.record_door_cell(red.clone(), coord);
        assert!(maze.set_key(CellCoord::new(0, 0), red.clone()));
        maze.record_key_cell(red.clone(), CellCoord::new(0, 0));
        maze.extend_door_order(std::slice::from_ref(&red));

        assert!(maze.is_passage_open(coord, Direction::East));
        assert_eq!(maze.cell(coord).unwrap().door(Direction::East), Some(&red));
        assert_eq!(maze.door_cells(&red), &[coord]);
        assert_eq!(maze.key_cell(&red), Some(CellCoord::new(0, 0)));

        maze.clear_doors_and_keys(Some(&red));
        assert_eq!(maze.cell(coord).unwrap().door(Direction::East), None);
        assert!(!maze.cell(CellCoord::new(0, 0)).unwrap().has_key(&red));
        assert!(maze.door_cells(&red).is_empty());
        assert_eq!(maze.key_cell(&red), None);
        assert!(maze.door_order().is_empty());
    }

    #[test]
    fn cell_data_round_trips_walls_doors_and_keys() {
        let mut maze = maze(4, 3, true);
        assert!(maze.connect(CellCoord::new(0, 0), CellCoord::new(1, 0)));
        assert!(maze.connect(CellCoord::new(1, 0), CellCoord::new(1, 1)));
        assert!(maze.connect(CellCoord::new(1, 1), CellCoord::new(2, 1)));
        let red = DoorColor::new("red");
        assert!(maze.set_door(CellCoord::new(1, 0), Direction::South, red.clone()));
        assert!(maze.set_key(CellCoord::new(0, 0), red));

        let snapshot = maze.cell_data();
        let mut restored = Maze::new(1, 1, 9, false).unwrap();
        restored.set_cell_data(&snapshot).expect("snapshot applies");

        assert_eq!(restored.cell_data(), snapshot);
        assert_eq!(restored.start(), maze.start());
        assert_eq!(restored.end(), maze.end());
        assert_eq!(restored.allow_diagonal(), maze.allow_diagonal());
    }

    #[test]
    fn random_cell_away_from_honours_the_margin() {
        let mut maze = maze(16, 16, false);
        let anchors = [CellCoord::new(0, 0), CellCoord::new(15, 15)];
        for _ in 0..8 {
            let picked = maze.random_cell_away_from(&anchors, 4);
            assert!(anchors
                .iter()
                .all(|anchor| anchor.manhattan_distance(picked) > 4));
        }
    }
}
