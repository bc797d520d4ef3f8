#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Flow-field steering over a sub-cell-resolution grid derived from a
//! maze.
//!
//! Each maze cell projects to a 7×7 block of the cost field so wall
//! geometry, doors, and diagonal corner nuances survive at sub-cell
//! granularity. [`FlowField::update_field`] recomputes the integration
//! (distance-to-goal) field with a FIFO wavefront and derives per-cell
//! steering vectors, blended away from impassable neighbours and smoothed
//! with a three-tap pass. The planes are flat `f32` arrays indexed
//! `y * width + x` so they can be copied out in bulk; readers take a
//! [`FlowFieldSnapshot`] and never observe an update in flight.

use glam::Vec2;
use log::warn;
use thiserror::Error;

use maze_nav_core::{CellCoord, Direction};
use maze_nav_grid::{Maze, MazeCell};

/// Sub-cells along each edge of one maze cell's block.
pub const SUB_RESOLUTION: u32 = 7;

/// Sentinel cost marking an impassable sub-cell.
pub const IMPASSABLE: f32 = f32::INFINITY;

const CARDINAL_OFFSETS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const ALL_OFFSETS: [(i64, i64); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

/// Tuning knobs for field construction.
#[derive(Clone, Copy, Debug)]
pub struct FlowFieldOptions {
    /// Whether the field's neighbourhood is eight-way.
    pub allow_diagonal: bool,
    /// Whether flow vectors are blended away from impassable neighbours.
    pub avoid_obstacles: bool,
    /// Magnitude applied to an avoidance-blended vector.
    pub avoidance: f32,
    /// Damping applied to the primary direction before blending.
    pub avoidance_dampen: f32,
}

impl Default for FlowFieldOptions {
    fn default() -> Self {
        Self {
            allow_diagonal: false,
            avoid_obstacles: true,
            avoidance: 1.5,
            avoidance_dampen: 0.5,
        }
    }
}

/// Errors raised when building a field from raw cost data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    /// The cost plane does not match the declared dimensions.
    #[error("cost field carries {len} cells but {width}x{height} were declared")]
    DimensionMismatch {
        /// Number of cost cells provided.
        len: usize,
        /// Declared field width.
        width: u32,
        /// Declared field height.
        height: u32,
    },
}

/// Per-goal steering field: cost plane, integration plane, and the two
/// flow-direction planes.
#[derive(Clone, Debug)]
pub struct FlowField {
    width: u32,
    height: u32,
    allow_diagonal: bool,
    avoid_obstacles: bool,
    avoidance: f32,
    avoidance_dampen: f32,
    cost: Vec<f32>,
    integration: Vec<f32>,
    flow_x: Vec<f32>,
    flow_y: Vec<f32>,
    scratch_x: Vec<f32>,
    scratch_y: Vec<f32>,
}

/// Pointer-stable copy of a field's published planes.
///
/// Updates rewrite the field's arrays in place; consumers that read while
/// updates may happen hold one of these instead (copy-on-publish).
#[derive(Clone, Debug, PartialEq)]
pub struct FlowFieldSnapshot {
    width: u32,
    height: u32,
    cost: Vec<f32>,
    flow_x: Vec<f32>,
    flow_y: Vec<f32>,
}

impl FlowField {
    /// Builds a field whose cost plane is projected from the maze at
    /// [`SUB_RESOLUTION`].
    #[must_use]
    pub fn from_maze(maze: &Maze, options: FlowFieldOptions) -> Self {
        let width = maze.width() * SUB_RESOLUTION;
        let height = maze.height() * SUB_RESOLUTION;
        let mut field = Self::empty(width, height, options);

        for cell in maze.cells() {
            field.project_cell(maze, cell);
        }
        field
    }

    /// Builds a field over a caller-provided cost plane.
    pub fn from_cost_field(
        cost: Vec<f32>,
        width: u32,
        height: u32,
        options: FlowFieldOptions,
    ) -> Result<Self, FieldError> {
        if cost.len() != width as usize * height as usize {
            return Err(FieldError::DimensionMismatch {
                len: cost.len(),
                width,
                height,
            });
        }
        let mut field = Self::empty(width, height, options);
        field.cost = cost;
        Ok(field)
    }

    fn empty(width: u32, height: u32, options: FlowFieldOptions) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            allow_diagonal: options.allow_diagonal,
            avoid_obstacles: options.avoid_obstacles,
            avoidance: options.avoidance,
            avoidance_dampen: options.avoidance_dampen,
            cost: vec![IMPASSABLE; size],
            integration: vec![IMPASSABLE; size],
            flow_x: vec![0.0; size],
            flow_y: vec![0.0; size],
            scratch_x: vec![0.0; size],
            scratch_y: vec![0.0; size],
        }
    }

    /// Field width in sub-cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Field height in sub-cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the coordinate lies within the field.
    #[must_use]
    pub const fn is_within_bounds(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    /// Traversal cost of a sub-cell; out-of-bounds reads are impassable.
    #[must_use]
    pub fn cost(&self, x: u32, y: u32) -> f32 {
        if self.is_within_bounds(x, y) {
            self.cost[self.index(x, y)]
        } else {
            IMPASSABLE
        }
    }

    /// Overwrites the traversal cost of a sub-cell.
    pub fn set_cost(&mut self, x: u32, y: u32, cost: f32) {
        if self.is_within_bounds(x, y) {
            let idx = self.index(x, y);
            self.cost[idx] = cost;
        }
    }

    /// Reports whether a sub-cell is passable.
    #[must_use]
    pub fn is_passable(&self, x: u32, y: u32) -> bool {
        self.cost(x, y) != IMPASSABLE
    }

    /// Propagated distance-to-goal of a sub-cell.
    #[must_use]
    pub fn integration(&self, x: u32, y: u32) -> f32 {
        if self.is_within_bounds(x, y) {
            self.integration[self.index(x, y)]
        } else {
            IMPASSABLE
        }
    }

    /// Steering direction stored for a sub-cell.
    #[must_use]
    pub fn flow_direction(&self, x: u32, y: u32) -> Vec2 {
        if self.is_within_bounds(x, y) {
            let idx = self.index(x, y);
            Vec2::new(self.flow_x[idx], self.flow_y[idx])
        } else {
            Vec2::ZERO
        }
    }

    /// Publishes a copy of the cost and flow planes for concurrent
    /// readers.
    #[must_use]
    pub fn snapshot(&self) -> FlowFieldSnapshot {
        FlowFieldSnapshot {
            width: self.width,
            height: self.height,
            cost: self.cost.clone(),
            flow_x: self.flow_x.clone(),
            flow_y: self.flow_y.clone(),
        }
    }

    /// Recomputes the integration and flow planes toward a goal sub-cell.
    ///
    /// An out-of-bounds goal is reported and leaves the previous field
    /// intact. An impassable goal is reported and the computation proceeds;
    /// the result has no valid gradient at the goal, which callers should
    /// detect through [`FlowField::cost`] before trusting the vectors.
    pub fn update_field(&mut self, goal_x: u32, goal_y: u32) {
        if !self.is_within_bounds(goal_x, goal_y) {
            warn!(
                "flow field goal ({goal_x}, {goal_y}) is out of bounds for {}x{}; keeping previous field",
                self.width, self.height
            );
            return;
        }
        if !self.is_passable(goal_x, goal_y) {
            warn!("flow field goal ({goal_x}, {goal_y}) is impassable; field will have no gradient at the goal");
        }

        self.integrate(goal_x, goal_y);
        self.compute_flow();
        self.convolve();
    }

    /// Multi-source wavefront relaxation from the goal outward. Edge costs
    /// are near-uniform, so a FIFO queue converges without a heap.
    fn integrate(&mut self, goal_x: u32, goal_y: u32) {
        self.integration.fill(IMPASSABLE);
        let goal_idx = self.index(goal_x, goal_y);
        self.integration[goal_idx] = 0.0;

        let mut queue = std::collections::VecDeque::from([goal_idx]);
        while let Some(idx) = queue.pop_front() {
            let current = self.integration[idx];
            let x = (idx as u32) % self.width;
            let y = (idx as u32) / self.width;

            for neighbor in neighbor_indices(self.width, self.height, self.allow_diagonal, x, y) {
                let relaxed = current + self.cost[neighbor];
                if relaxed < self.integration[neighbor] {
                    self.integration[neighbor] = relaxed;
                    queue.push_back(neighbor);
                }
            }
        }
    }

    /// Points every sub-cell at its lowest-integration neighbour, blending
    /// the direction away from impassable neighbours so agents steer
    /// around corners instead of hugging walls.
    fn compute_flow(&mut self) {
        for idx in 0..self.integration.len() {
            let x = (idx as u32) % self.width;
            let y = (idx as u32) / self.width;

            let mut lowest = IMPASSABLE;
            let mut best_dx = 0.0f32;
            let mut best_dy = 0.0f32;
            let mut impassable_dx = 0.0f32;
            let mut impassable_dy = 0.0f32;
            let mut has_impassable_neighbor = false;

            for neighbor in neighbor_indices(self.width, self.height, self.allow_diagonal, x, y) {
                let nx = (neighbor as u32) % self.width;
                let ny = (neighbor as u32) / self.width;
                let dx = nx as f32 - x as f32;
                let dy = ny as f32 - y as f32;

                let neighbor_integration = self.integration[neighbor];
                if neighbor_integration < lowest {
                    lowest = neighbor_integration;
                    best_dx = dx;
                    best_dy = dy;
                }

                if self.cost[neighbor] == IMPASSABLE {
                    has_impassable_neighbor = true;
                    impassable_dx += dx;
                    impassable_dy += dy;
                }
            }

            if has_impassable_neighbor
                && self.avoid_obstacles
                && (impassable_dx != 0.0 || impassable_dy != 0.0)
            {
                let adjusted_dx = best_dx * self.avoidance_dampen - impassable_dx;
                let adjusted_dy = best_dy * self.avoidance_dampen - impassable_dy;
                let magnitude = (adjusted_dx * adjusted_dx + adjusted_dy * adjusted_dy).sqrt();
                if magnitude > 0.0 {
                    best_dx = (adjusted_dx / magnitude) * self.avoidance;
                    best_dy = (adjusted_dy / magnitude) * self.avoidance;
                }
            }

            self.flow_x[idx] = best_dx;
            self.flow_y[idx] = best_dy;
        }
    }

    /// Three-tap smoothing over interior cells: the X plane averages along
    /// the x axis, the Y plane along the y axis. Border cells reset to
    /// zero.
    fn convolve(&mut self) {
        self.scratch_x.fill(0.0);
        self.scratch_y.fill(0.0);

        for y in 1..self.height.saturating_sub(1) {
            for x in 1..self.width.saturating_sub(1) {
                let idx = self.index(x, y);
                self.scratch_x[idx] = (self.flow_x[idx]
                    + self.flow_x[self.index(x + 1, y)]
                    + self.flow_x[self.index(x - 1, y)])
                    / 3.0;
                self.scratch_y[idx] = (self.flow_y[idx]
                    + self.flow_y[self.index(x, y + 1)]
                    + self.flow_y[self.index(x, y - 1)])
                    / 3.0;
            }
        }

        std::mem::swap(&mut self.flow_x, &mut self.scratch_x);
        std::mem::swap(&mut self.flow_y, &mut self.scratch_y);
    }

    /// Projects one maze cell into its 7×7 block of the cost plane.
    fn project_cell(&mut self, maze: &Maze, cell: &MazeCell) {
        let base_x = cell.coord().x() * SUB_RESOLUTION;
        let base_y = cell.coord().y() * SUB_RESOLUTION;
        for j in 0..SUB_RESOLUTION {
            for i in 0..SUB_RESOLUTION {
                let cost = self.sub_cell_cost(maze, cell, i, j);
                self.set_cost(base_x + i, base_y + j, cost);
            }
        }
    }

    /// Cost of sub-cell `(i, j)` within a cell's block: the inner 5×5 is
    /// passable (minus sealed corners in diagonal mode), wall openings cut
    /// corridors through the edge ring, and open diagonals cut corner
    /// passages that may continue into the neighbouring blocks.
    fn sub_cell_cost(&self, maze: &Maze, cell: &MazeCell, i: u32, j: u32) -> f32 {
        let walls = cell.walls();
        let walled = |direction: Direction| walls.contains(direction);

        if (1..=5).contains(&i) && (1..=5).contains(&j) {
            if self.allow_diagonal {
                let sealed = (i == 1
                    && j == 1
                    && walled(Direction::NorthWest)
                    && walled(Direction::North)
                    && walled(Direction::West))
                    || (i == 5
                        && j == 1
                        && walled(Direction::NorthEast)
                        && walled(Direction::North)
                        && walled(Direction::East))
                    || (i == 1
                        && j == 5
                        && walled(Direction::SouthWest)
                        && walled(Direction::South)
                        && walled(Direction::West))
                    || (i == 5
                        && j == 5
                        && walled(Direction::SouthEast)
                        && walled(Direction::South)
                        && walled(Direction::East));
                if sealed {
                    return IMPASSABLE;
                }
            }
            return 1.0;
        }

        if !walled(Direction::North) && j <= 1 && (1..=5).contains(&i) {
            return 1.0;
        }
        if !walled(Direction::South) && j >= 5 && (1..=5).contains(&i) {
            return 1.0;
        }
        if !walled(Direction::West) && i <= 1 && (1..=5).contains(&j) {
            return 1.0;
        }
        if !walled(Direction::East) && i >= 5 && (1..=5).contains(&j) {
            return 1.0;
        }

        if self.allow_diagonal {
            if !walled(Direction::NorthWest) && i <= 2 && j <= 2 {
                return 1.0;
            }
            if !walled(Direction::NorthEast) && i >= 4 && j <= 2 {
                return 1.0;
            }
            if !walled(Direction::SouthWest) && i <= 2 && j >= 4 {
                return 1.0;
            }
            if !walled(Direction::SouthEast) && i >= 4 && j >= 4 {
                return 1.0;
            }

            let neighbor_open = |direction: Direction, through: Direction| {
                maze.neighbor(cell.coord(), direction)
                    .and_then(|coord| maze.cell(coord))
                    .map_or(false, |other| !other.has_wall(through))
            };
            if i == 0
                && j == 0
                && (neighbor_open(Direction::West, Direction::NorthEast)
                    || neighbor_open(Direction::North, Direction::SouthWest))
            {
                return 1.0;
            }
            if i == 0
                && j == 6
                && (neighbor_open(Direction::West, Direction::SouthEast)
                    || neighbor_open(Direction::South, Direction::NorthWest))
            {
                return 1.0;
            }
            if i == 6
                && j == 0
                && (neighbor_open(Direction::East, Direction::NorthWest)
                    || neighbor_open(Direction::North, Direction::SouthEast))
            {
                return 1.0;
            }
            if i == 6
                && j == 6
                && (neighbor_open(Direction::East, Direction::SouthWest)
                    || neighbor_open(Direction::South, Direction::NorthEast))
            {
                return 1.0;
            }
        }

        IMPASSABLE
    }
}

impl FlowFieldSnapshot {
    /// Snapshot width in sub-cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Snapshot height in sub-cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Traversal cost captured for a sub-cell.
    #[must_use]
    pub fn cost(&self, x: u32, y: u32) -> f32 {
        if x < self.width && y < self.height {
            self.cost[(y * self.width + x) as usize]
        } else {
            IMPASSABLE
        }
    }

    /// Steering direction captured for a sub-cell.
    #[must_use]
    pub fn flow_direction(&self, x: u32, y: u32) -> Vec2 {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) as usize;
            Vec2::new(self.flow_x[idx], self.flow_y[idx])
        } else {
            Vec2::ZERO
        }
    }
}

fn neighbor_indices(
    width: u32,
    height: u32,
    allow_diagonal: bool,
    x: u32,
    y: u32,
) -> impl Iterator<Item = usize> {
    let offsets: &'static [(i64, i64)] = if allow_diagonal {
        &ALL_OFFSETS
    } else {
        &CARDINAL_OFFSETS
    };
    let (width, height) = (i64::from(width), i64::from(height));
    offsets.iter().filter_map(move |(dx, dy)| {
        let nx = i64::from(x) + dx;
        let ny = i64::from(y) + dy;
        (nx >= 0 && ny >= 0 && nx < width && ny < height).then(|| (ny * width + nx) as usize)
    })
}

/// Centre sub-cell of a maze cell's block, the natural goal for a
/// cell-level target.
#[must_use]
pub fn field_goal_for_cell(coord: CellCoord) -> (u32, u32) {
    (
        coord.x() * SUB_RESOLUTION + SUB_RESOLUTION / 2,
        coord.y() * SUB_RESOLUTION + SUB_RESOLUTION / 2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_cost_field_flows_toward_the_goal() {
        let field = FlowField::from_cost_field(
            vec![1.0; 81],
            9,
            9,
            FlowFieldOptions::default(),
        );
        let mut field = field.expect("dimensions match");
        field.update_field(4, 4);

        assert_eq!(field.integration(4, 4), 0.0);
        assert_eq!(field.integration(1, 4), 3.0);
        assert!(field.flow_direction(1, 4).x > 0.0, "west side flows east");
        assert!(field.flow_direction(4, 1).y > 0.0, "north side flows south");
    }

    #[test]
    fn from_cost_field_rejects_mismatched_dimensions() {
        let result = FlowField::from_cost_field(vec![1.0; 10], 3, 4, FlowFieldOptions::default());
        assert_eq!(
            result.unwrap_err(),
            FieldError::DimensionMismatch {
                len: 10,
                width: 3,
                height: 4
            }
        );
    }

    #[test]
    fn field_goal_lands_in_the_block_center() {
        assert_eq!(field_goal_for_cell(CellCoord::new(0, 0)), (3, 3));
        assert_eq!(field_goal_for_cell(CellCoord::new(2, 1)), (17, 10));
    }

    #[test]
    fn convolution_zeroes_the_border() {
        let mut field =
            FlowField::from_cost_field(vec![1.0; 25], 5, 5, FlowFieldOptions::default())
                .expect("dimensions match");
        field.update_field(2, 2);
        assert_eq!(field.flow_direction(0, 0), Vec2::ZERO);
        assert_eq!(field.flow_direction(4, 4), Vec2::ZERO);
    }
}
