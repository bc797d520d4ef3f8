#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Solvability-preserving door and key placement.
//!
//! Colours are processed backward from the goal. For each colour the
//! current shortest path from start to the active goal is solved with no
//! keys in hand (doors act as walls), a door is dropped inside the
//! configured window near the goal, and solvability is re-verified. When a
//! placement disconnects the goal, the pass retreats to blocking the
//! previously placed doors of the batch instead, so the maze never ends up
//! accidentally unsolvable. Afterwards one key per colour is placed on a
//! cell provably reachable with only the not-yet-placed colours in hand.

use std::collections::BTreeMap;

use log::warn;
use thiserror::Error;

use maze_nav_core::{CellCoord, Direction, DoorColor};
use maze_nav_grid::Maze;
use maze_nav_system_pathfinding::{AStarSolver, KeyRing, RuleSet, SolveError};

const KEY_PLACEMENT_RETRIES: u32 = 5;
const RANDOM_COORD_ATTEMPTS: u32 = 64;

/// How key cells are chosen for a colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathStrategy {
    /// Key placed along the first path recorded toward the colour's doors.
    FirstPath,
    /// Key placed along the last (longest) path recorded toward the
    /// colour's doors.
    LastPath,
    /// Key placed on a random cell outside exclusion zones around start
    /// and end.
    RandomCell,
}

/// Doors, keys, and proof paths produced by one placement pass.
#[derive(Clone, Debug, Default)]
pub struct DoorKeyOutcome {
    /// Cells carrying doors, per colour, in placement order.
    pub doors: BTreeMap<DoorColor, Vec<CellCoord>>,
    /// Cell holding the key, per colour.
    pub keys: BTreeMap<DoorColor, CellCoord>,
    /// Path from start toward each colour's doors, per the strategy.
    pub door_paths: BTreeMap<DoorColor, Vec<CellCoord>>,
    /// Path from start to each colour's key proving reachability.
    pub key_paths: BTreeMap<DoorColor, Vec<CellCoord>>,
}

/// Errors raised by door/key placement.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DoorPlacementError {
    /// The goal was unreachable from the start before any door existed;
    /// the maze itself is malformed and the caller must not proceed.
    #[error("maze is unsolvable from {start} to {end} before any door placement")]
    Unsolvable {
        /// Queried start cell.
        start: CellCoord,
        /// Queried goal cell.
        end: CellCoord,
    },
    /// A placement endpoint lies outside the grid.
    #[error(transparent)]
    Solve(#[from] SolveError),
}

/// Inserts ordered door/key dependencies between `start` and `end`,
/// proving solvability after every placement step.
///
/// `max_cells_from_end` bounds how far from the active goal a door may
/// land along the current path. Multiple doors per colour and multiple key
/// colours per cell are supported. The maze's bookkeeping (door order,
/// door cells, key cells) is updated alongside the returned outcome.
pub fn add_doors_and_keys(
    maze: &mut Maze,
    start: CellCoord,
    end: CellCoord,
    color_order: &[DoorColor],
    max_cells_from_end: u32,
    allow_diagonal: bool,
    strategy: PathStrategy,
) -> Result<DoorKeyOutcome, DoorPlacementError> {
    let mut outcome = DoorKeyOutcome::default();
    let mut solver = AStarSolver::new();
    let mut goal = end;
    let mut max_distance: usize = 0;
    let mut last_color: Option<DoorColor> = None;
    let mut last_color_idx: usize = 0;

    maze.extend_door_order(color_order);

    // Walk colours backward: the colour closest to the goal is placed
    // first, each later colour walling off the previous batch's doors.
    for i in (0..color_order.len()).rev() {
        let color = color_order[i].clone();
        let remaining = &color_order[..i];
        let no_keys = RuleSet::with_keys(KeyRing::new());

        solver.clear_cache();
        let mut path = solver.solve(maze, start, goal, allow_diagonal, &no_keys, 0)?;
        if path.last() != Some(&goal) {
            if i == color_order.len() - 1 {
                return Err(DoorPlacementError::Unsolvable { start, end });
            }
            warn!("no path toward goal {goal} for colour {color}; skipping its doors");
            let _ = outcome.door_paths.insert(color.clone(), path.clone());
            continue;
        }
        let _ = outcome.door_paths.insert(color.clone(), path.clone());

        let mut budget = maze.width() as usize * maze.height() as usize * 4;
        loop {
            budget = budget.saturating_sub(1);
            if budget == 0 {
                warn!("door placement budget exhausted for colour {color}");
                break;
            }

            let reached = path.last() == Some(&goal);
            if reached {
                let placed = place_door_on_path(
                    maze,
                    &path,
                    &color,
                    max_cells_from_end,
                    allow_diagonal,
                    &mut outcome.doors,
                    &mut max_distance,
                );
                let at_last_previous_door = match &last_color {
                    None => true,
                    Some(last) => {
                        last_color_idx + 1
                            >= outcome.doors.get(last).map_or(0, |cells| cells.len())
                    }
                };
                if !placed && at_last_previous_door {
                    break;
                }
            }

            let path_before = path.clone();
            solver.clear_cache();
            let mut new_path = solver.solve(maze, start, goal, allow_diagonal, &no_keys, 0)?;

            if new_path.last() != Some(&goal) {
                // The goal just became unreachable without the key: this
                // colour's wall of doors is complete. Seal the old route
                // and retreat to blocking the previous batch's doors.
                let _ = place_door_on_path(
                    maze,
                    &path_before,
                    &color,
                    max_cells_from_end,
                    allow_diagonal,
                    &mut outcome.doors,
                    &mut max_distance,
                );

                let more_previous_doors = match &last_color {
                    Some(last) => {
                        last_color_idx + 1
                            < outcome.doors.get(last).map_or(0, |cells| cells.len())
                    }
                    None => false,
                };

                if more_previous_doors {
                    let last = last_color.clone().expect("previous colour present");
                    last_color_idx += 1;
                    goal = outcome.doors[&last][last_color_idx];
                    solver.clear_cache();
                    new_path = solver.solve(maze, start, goal, allow_diagonal, &no_keys, 0)?;
                } else {
                    let Some(first_door) =
                        outcome.doors.get(&color).and_then(|cells| cells.first())
                    else {
                        break;
                    };
                    goal = *first_door;
                    last_color = Some(color.clone());
                    last_color_idx = 0;
                    if strategy == PathStrategy::LastPath {
                        let _ = outcome.door_paths.insert(color.clone(), path_before);
                    }
                    break;
                }
            }

            path = new_path;
        }

        place_key(
            maze,
            &mut solver,
            &mut outcome,
            &color,
            remaining,
            start,
            end,
            max_cells_from_end,
            max_distance,
            allow_diagonal,
            strategy,
        )?;
    }

    for (color, cells) in &outcome.doors {
        for cell in cells {
            maze.record_door_cell(color.clone(), *cell);
        }
    }
    for (color, cell) in &outcome.keys {
        maze.record_key_cell(color.clone(), *cell);
    }

    Ok(outcome)
}

/// Drops a door across the path inside the `max_cells_from_end` window
/// before the goal, covering adjacent open diagonals in diagonal mode.
fn place_door_on_path(
    maze: &mut Maze,
    path: &[CellCoord],
    color: &DoorColor,
    max_cells_from_end: u32,
    allow_diagonal: bool,
    doors: &mut BTreeMap<DoorColor, Vec<CellCoord>>,
    max_distance: &mut usize,
) -> bool {
    if path.len() < 2 {
        return false;
    }

    let window = if max_cells_from_end > 0 {
        maze.rng_mut().index(max_cells_from_end as usize)
    } else {
        0
    };
    let idx = 2 + window;
    let mut dist = path.len().saturating_sub(idx);
    if dist < 1 {
        dist = path.len() - 1;
    }
    let cell = path[dist - 1];
    let cell2 = path[dist];
    if dist > *max_distance {
        *max_distance = dist;
    }

    let Some(direction) = Direction::between(cell, cell2) else {
        return false;
    };
    let _ = maze.set_door(cell, direction, color.clone());

    if allow_diagonal {
        for adjacent in direction.flanking(true) {
            let open = maze
                .cell(cell)
                .map_or(false, |c| !c.has_wall(adjacent) && c.door(adjacent).is_none());
            if open {
                let _ = maze.set_door(cell, adjacent, color.clone());
            }
        }
    }

    let cells = doors.entry(color.clone()).or_default();
    if cells.last() == Some(&cell) {
        return false;
    }
    cells.push(cell);
    true
}

/// Places one key for `color` on a cell reachable from start holding only
/// the not-yet-placed colours, retrying a bounded number of times before
/// falling back to the start cell.
#[allow(clippy::too_many_arguments)]
fn place_key(
    maze: &mut Maze,
    solver: &mut AStarSolver,
    outcome: &mut DoorKeyOutcome,
    color: &DoorColor,
    remaining: &[DoorColor],
    start: CellCoord,
    end: CellCoord,
    max_cells_from_end: u32,
    max_distance: usize,
    allow_diagonal: bool,
    strategy: PathStrategy,
) -> Result<(), DoorPlacementError> {
    if outcome.doors.get(color).map_or(true, Vec::is_empty) {
        warn!("no doors recorded for colour {color}; skipping its key");
        return Ok(());
    }
    let ring = RuleSet::with_keys(KeyRing::holding(remaining));

    for _ in 0..KEY_PLACEMENT_RETRIES {
        let candidate = match strategy {
            PathStrategy::RandomCell => {
                key_candidate_outside_zones(maze, outcome, color, start, end, max_cells_from_end)
            }
            PathStrategy::FirstPath | PathStrategy::LastPath => {
                key_candidate_on_path(maze, outcome, color, max_cells_from_end, max_distance)
            }
        };
        let Some(candidate) = candidate else {
            break;
        };

        solver.clear_cache();
        let key_path = solver.solve(maze, start, candidate, allow_diagonal, &ring, 0)?;
        if key_path.last() == Some(&candidate) {
            let _ = maze.set_key(candidate, color.clone());
            let _ = outcome.keys.insert(color.clone(), candidate);
            let _ = outcome.key_paths.insert(color.clone(), key_path);
            return Ok(());
        }
    }

    // Guaranteed-reachable fallback.
    warn!("key for colour {color} fell back to the start cell");
    let _ = maze.set_key(start, color.clone());
    let _ = outcome.keys.insert(color.clone(), start);
    let _ = outcome
        .key_paths
        .insert(color.clone(), vec![start]);
    Ok(())
}

fn key_candidate_on_path(
    maze: &mut Maze,
    outcome: &DoorKeyOutcome,
    color: &DoorColor,
    max_cells_from_end: u32,
    max_distance: usize,
) -> Option<CellCoord> {
    let path = outcome.door_paths.get(color)?;
    if path.is_empty() {
        return None;
    }

    let window = max_cells_from_end as usize;
    let (min, max) = if path.len() > window {
        (window, path.len() - window)
    } else {
        (0, max_distance.max(1))
    };
    let idx = min + maze.rng_mut().index((max - min).max(1));
    Some(*path.get(idx).unwrap_or(&path[0]))
}

fn key_candidate_outside_zones(
    maze: &mut Maze,
    outcome: &DoorKeyOutcome,
    color: &DoorColor,
    start: CellCoord,
    end: CellCoord,
    max_cells_from_end: u32,
) -> Option<CellCoord> {
    let reach = i64::from((1 + max_cells_from_end) * outcome.keys.len() as u32);
    let can_exclude = i64::from(maze.width()) > reach && i64::from(maze.height()) > reach;
    if !can_exclude {
        return outcome
            .door_paths
            .get(color)
            .and_then(|path| path.first().copied());
    }

    let zones = [
        (
            i64::from(start.x()) - reach,
            i64::from(start.y()) - reach,
            2 * reach,
            2 * reach,
        ),
        (
            i64::from(end.x()) - reach,
            i64::from(end.y()) - reach,
            2 * reach,
            2 * reach,
        ),
    ];

    let mut pick = CellCoord::new(0, 0);
    let width = maze.width() as usize;
    let height = maze.height() as usize;
    for _ in 0..RANDOM_COORD_ATTEMPTS {
        let x = maze.rng_mut().index(width) as u32;
        let y = maze.rng_mut().index(height) as u32;
        pick = CellCoord::new(x, y);
        let excluded = zones.iter().any(|(zx, zy, zw, zh)| {
            let (x, y) = (i64::from(x), i64::from(y));
            x >= *zx && x <= zx + zw && y >= *zy && y <= zy + zh
        });
        if !excluded {
            return Some(pick);
        }
    }
    Some(pick)
}
