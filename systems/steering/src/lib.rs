#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Crowd steering over a bank of flow fields.
//!
//! Field 0 tracks the live target; the remaining fields each point at a
//! waypoint cell picked away from the maze's start and end. Entities carry
//! a single field index and read their steering impulse from that field's
//! vectors each tick, so hundreds of agents move without per-agent path
//! planning. On reaching its field's waypoint an entity is reassigned to a
//! waypoint drawn from a precomputed accessibility graph (an offline A*
//! reachability test per waypoint pair), so agents roam between mutually
//! reachable goals instead of picking an unreachable one.
//!
//! All positions are expressed in sub-cell (field) coordinates; adapters
//! own any world-unit conversion.

use std::collections::BTreeMap;

use glam::Vec2;
use thiserror::Error;

use maze_nav_core::CellCoord;
use maze_nav_grid::{Maze, SeededRng};
use maze_nav_system_flowfield::{
    field_goal_for_cell, FlowField, FlowFieldOptions, SUB_RESOLUTION,
};
use maze_nav_system_pathfinding::{AStarSolver, KeyRing, RuleSet};

/// Opaque identity of one steered entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
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

/// Tuning knobs for impulse computation and field switching.
#[derive(Clone, Copy, Debug)]
pub struct SteeringConfig {
    /// Base impulse magnitude, divided by the local cell cost.
    pub gain: f32,
    /// Multiplier applied to the upward component on same-kind contact.
    pub contact_lift: f32,
    /// Half-width, in sub-cells, of the box around the tracked target that
    /// captures entities onto field 0.
    pub capture_radius: f32,
    /// Half-width, in sub-cells, of the box around a waypoint that
    /// triggers reassignment.
    pub waypoint_radius: f32,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        let cell_and_a_half = 1.5 * SUB_RESOLUTION as f32;
        Self {
            gain: 0.5,
            contact_lift: 3.0,
            capture_radius: cell_and_a_half,
            waypoint_radius: cell_and_a_half,
        }
    }
}

/// Per-tick steering output for one entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SteeringImpulse {
    /// Planar impulse along the field's flow direction, scaled inversely
    /// by the local cost.
    pub velocity: Vec2,
    /// Upward impulse component discouraging pile-ups; non-zero only on
    /// same-kind contact.
    pub lift: f32,
}

/// Errors raised while assembling the field bank.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SteeringError {
    /// A target field plus at least one waypoint field are required.
    #[error("at least two flow fields are required, got {0}")]
    TooFewFields(usize),
}

/// Assigns entities to flow fields and computes their steering impulses.
#[derive(Debug)]
pub struct CrowdSteering {
    fields: Vec<FlowField>,
    waypoints: Vec<CellCoord>,
    accessible: Vec<Vec<usize>>,
    assignments: BTreeMap<EntityId, usize>,
    config: SteeringConfig,
}

impl CrowdSteering {
    /// Builds `field_count` fields over the maze: field 0 for the tracked
    /// target plus `field_count - 1` waypoint fields, and precomputes the
    /// waypoint accessibility graph.
    pub fn new(
        maze: &mut Maze,
        field_count: usize,
        options: FlowFieldOptions,
        config: SteeringConfig,
    ) -> Result<Self, SteeringError> {
        if field_count < 2 {
            return Err(SteeringError::TooFewFields(field_count));
        }

        let margin = if maze.width() > 5 && maze.height() > 5 { 3 } else { 1 };
        let anchors = [maze.start(), maze.end()];
        let waypoints: Vec<CellCoord> = (1..field_count)
            .map(|_| maze.random_cell_away_from(&anchors, margin))
            .collect();

        let mut fields = Vec::with_capacity(field_count);
        fields.push(FlowField::from_maze(maze, options));
        for waypoint in &waypoints {
            let mut field = FlowField::from_maze(maze, options);
            let (gx, gy) = field_goal_for_cell(*waypoint);
            field.update_field(gx, gy);
            fields.push(field);
        }

        let accessible = build_accessibility(maze, &waypoints);

        Ok(Self {
            fields,
            waypoints,
            accessible,
            assignments: BTreeMap::new(),
            config,
        })
    }

    /// Number of fields in the bank, including the target field.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Waypoint cell associated with the field at `index` (1-based; field
    /// 0 has no waypoint).
    #[must_use]
    pub fn waypoint(&self, index: usize) -> Option<CellCoord> {
        if index == 0 {
            None
        } else {
            self.waypoints.get(index - 1).copied()
        }
    }

    /// The precomputed waypoint accessibility rows.
    #[must_use]
    pub fn accessibility(&self) -> &[Vec<usize>] {
        &self.accessible
    }

    /// Borrows the field at `index`.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&FlowField> {
        self.fields.get(index)
    }

    /// Recomputes field 0 toward the tracked target's position.
    pub fn track_target(&mut self, position: Vec2) {
        let x = position.x.max(0.0) as u32;
        let y = position.y.max(0.0) as u32;
        self.fields[0].update_field(x, y);
    }

    /// Recomputes an arbitrary field toward a maze cell.
    pub fn retarget(&mut self, index: usize, cell: CellCoord) {
        if let Some(field) = self.fields.get_mut(index) {
            let (gx, gy) = field_goal_for_cell(cell);
            field.update_field(gx, gy);
        }
    }

    /// Assigns an entity to a field.
    pub fn assign(&mut self, entity: EntityId, field_index: usize) {
        let _ = self.assignments.insert(entity, field_index.min(self.fields.len() - 1));
    }

    /// Field currently driving an entity, if it was assigned.
    #[must_use]
    pub fn assignment(&self, entity: EntityId) -> Option<usize> {
        self.assignments.get(&entity).copied()
    }

    /// Drops an entity from the steering registry.
    pub fn remove(&mut self, entity: EntityId) {
        let _ = self.assignments.remove(&entity);
    }

    /// Computes one tick's steering impulse for an entity.
    ///
    /// Entities inside the capture box around `target_position` switch to
    /// field 0 regardless of assignment; entities reaching their field's
    /// waypoint are reassigned through the accessibility graph. Returns
    /// `None` for unassigned entities and for positions without a usable
    /// gradient.
    pub fn steer(
        &mut self,
        entity: EntityId,
        position: Vec2,
        target_position: Vec2,
        same_kind_contact: bool,
        rng: &mut SeededRng,
    ) -> Option<SteeringImpulse> {
        let mut field_index = self.assignment(entity)?;

        if (position.x - target_position.x).abs() < self.config.capture_radius
            && (position.y - target_position.y).abs() < self.config.capture_radius
        {
            field_index = 0;
        }

        if field_index != 0 {
            field_index = self.reassign_on_arrival(field_index, position, rng);
        }
        let _ = self.assignments.insert(entity, field_index);

        let field = &self.fields[field_index];
        let x = to_field_axis(position.x)?;
        let y = to_field_axis(position.y)?;
        let direction = field.flow_direction(x, y);
        let cost = field.cost(x, y);

        if direction == Vec2::ZERO || cost == 0.0 || !cost.is_finite() {
            return None;
        }

        let impulse = self.config.gain / cost;
        let lift = if same_kind_contact {
            self.config.contact_lift * impulse
        } else {
            0.0
        };
        Some(SteeringImpulse {
            velocity: direction * impulse,
            lift,
        })
    }

    /// When the entity stands inside its waypoint's arrival box, draws a
    /// new destination among the waypoints accessible from the previous
    /// one, rotating past empty accessibility rows.
    fn reassign_on_arrival(&self, field_index: usize, position: Vec2, rng: &mut SeededRng) -> usize {
        let waypoint = self.waypoints[field_index - 1];
        let (wx, wy) = field_goal_for_cell(waypoint);
        let arrived = (position.x - wx as f32).abs() < self.config.waypoint_radius
            && (position.y - wy as f32).abs() < self.config.waypoint_radius;
        if !arrived {
            return field_index;
        }

        let count = self.waypoints.len();
        let current = field_index - 1;
        let mut row_index = if current == 0 { count - 1 } else { current - 1 };
        let mut guard = count;
        while self.accessible[row_index].is_empty() && guard > 0 {
            row_index = if row_index == 0 { count - 1 } else { row_index - 1 };
            guard -= 1;
        }

        let row = &self.accessible[row_index];
        if row.is_empty() {
            return field_index;
        }
        row[rng.index(row.len())] + 1
    }
}

fn to_field_axis(value: f32) -> Option<u32> {
    let floored = value.floor();
    if floored < 0.0 || !floored.is_finite() {
        None
    } else {
        Some(floored as u32)
    }
}

/// Offline reachability test between every waypoint pair: row `i` lists
/// the waypoints whose cell A* can reach from waypoint `i` with no keys in
/// hand.
fn build_accessibility(maze: &Maze, waypoints: &[CellCoord]) -> Vec<Vec<usize>> {
    let mut solver = AStarSolver::new();
    let rules = RuleSet::with_keys(KeyRing::new());
    let mut accessible = Vec::with_capacity(waypoints.len());

    for (i, from) in waypoints.iter().enumerate() {
        let mut row = Vec::new();
        for (j, to) in waypoints.iter().enumerate() {
            if i == j {
                continue;
            }
            solver.clear_cache();
            let path = solver
                .solve(maze, *from, *to, maze.allow_diagonal(), &rules, 0)
                .unwrap_or_default();
            if path.last() == Some(to) {
                row.push(j);
            }
        }
        accessible.push(row);
    }
    accessible
}
