#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Maze generation algorithms that carve wall topology into a grid.
//!
//! Every generator works the same way: it receives the grid with its owned
//! random stream and the topology flag, and leaves every cell reachable
//! from the start cell through wall-free passages. The closed
//! [`GeneratorKind`] enum dispatches all algorithms through one method so
//! callers never hold function references.

use maze_nav_core::CellCoord;
use maze_nav_grid::{GridError, Maze};

const BRAID_CHANCE: f64 = 0.15;
const MULTI_PATH_MERGE_CHANCE: f64 = 0.1;
const MULTI_PATH_BRANCH_CHANCE: f64 = 0.05;
const LONG_BRAID_LENGTH: usize = 3;

/// Closed set of maze generation algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeneratorKind {
    /// Randomized depth-first carve with stack-based backtracking. Hard,
    /// windy, single-solution mazes.
    DepthFirst,
    /// Random walk until stuck, then scan for an unvisited cell adjacent to
    /// visited territory. Easier single-solution mazes.
    HuntAndKill,
    /// Hunt-and-kill with probabilistic extra connections that create loops
    /// and reduce dead ends.
    HuntAndKillBraids,
    /// Row-wise run carving with one random northward connection per run.
    Sidewinder,
    /// Row-wise disjoint-set merging.
    Ellers,
    /// Depth-first variant that merges branches to create multiple
    /// solutions.
    MultiPath,
    /// Dead-end removal over the whole grid in row-major order.
    NoDeadEnds,
    /// Dead-end removal walking a centre-out spiral, converging the
    /// topology toward the middle.
    NoDeadEndsSpiral,
}

impl GeneratorKind {
    /// Every generator kind, in documentation order.
    pub const ALL: [GeneratorKind; 8] = [
        GeneratorKind::DepthFirst,
        GeneratorKind::HuntAndKill,
        GeneratorKind::HuntAndKillBraids,
        GeneratorKind::Sidewinder,
        GeneratorKind::Ellers,
        GeneratorKind::MultiPath,
        GeneratorKind::NoDeadEnds,
        GeneratorKind::NoDeadEndsSpiral,
    ];

    /// Stable name used on command lines and in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            GeneratorKind::DepthFirst => "depth-first",
            GeneratorKind::HuntAndKill => "hunt-and-kill",
            GeneratorKind::HuntAndKillBraids => "hunt-and-kill-braids",
            GeneratorKind::Sidewinder => "sidewinder",
            GeneratorKind::Ellers => "ellers",
            GeneratorKind::MultiPath => "multi-path",
            GeneratorKind::NoDeadEnds => "no-dead-ends",
            GeneratorKind::NoDeadEndsSpiral => "no-dead-ends-spiral",
        }
    }

    /// Resolves a stable name back to a kind.
    #[must_use]
    pub fn from_name(name: &str) -> Option<GeneratorKind> {
        GeneratorKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Runs this generator over the provided maze.
    pub fn apply(self, maze: &mut Maze) {
        let allow_diagonal = maze.allow_diagonal();
        match self {
            GeneratorKind::DepthFirst => depth_first(maze, allow_diagonal),
            GeneratorKind::HuntAndKill => hunt_and_kill(maze, allow_diagonal),
            GeneratorKind::HuntAndKillBraids => hunt_and_kill_with_braids(maze, allow_diagonal),
            GeneratorKind::Sidewinder => sidewinder(maze),
            GeneratorKind::Ellers => ellers(maze),
            GeneratorKind::MultiPath => multi_path(maze, allow_diagonal),
            GeneratorKind::NoDeadEnds => maze.remove_dead_ends(false, allow_diagonal),
            GeneratorKind::NoDeadEndsSpiral => maze.remove_dead_ends(true, allow_diagonal),
        }
    }
}

impl std::fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds a maze: fresh grid, random start/end on opposite edges, then the
/// requested generator.
pub fn generate_maze(
    width: u32,
    height: u32,
    kind: GeneratorKind,
    seed: u64,
    allow_diagonal: bool,
) -> Result<Maze, GridError> {
    let mut maze = Maze::new(width, height, seed, allow_diagonal)?;
    maze.randomize_start_end();
    kind.apply(&mut maze);
    Ok(maze)
}

fn depth_first(maze: &mut Maze, allow_diagonal: bool) {
    let origin = CellCoord::new(0, 0);
    maze.mark_visited(origin);
    let mut stack = vec![origin];

    while let Some(current) = stack.last().copied() {
        let candidates = maze.carvable_unvisited_neighbors(current, allow_diagonal);
        if candidates.is_empty() {
            let _ = stack.pop();
            continue;
        }
        let pick = candidates[maze.rng_mut().index(candidates.len())];
        maze.mark_visited(pick);
        stack.push(pick);
        let _ = maze.connect(current, pick);
    }
}

fn hunt_and_kill(maze: &mut Maze, allow_diagonal: bool) {
    let origin = CellCoord::new(0, 0);
    maze.mark_visited(origin);
    let mut current = Some(origin);

    while let Some(cell) = current {
        let candidates = maze.carvable_unvisited_neighbors(cell, allow_diagonal);
        if let Some(&pick) = pick_random(maze, &candidates) {
            let _ = maze.connect(cell, pick);
            current = Some(pick);
        } else {
            current = hunt(maze, allow_diagonal, |_, _| {});
        }
    }
}

fn hunt_and_kill_with_braids(maze: &mut Maze, allow_diagonal: bool) {
    let origin = CellCoord::new(0, 0);
    maze.mark_visited(origin);
    let mut current = Some(origin);

    while let Some(cell) = current {
        let candidates = maze.carvable_unvisited_neighbors(cell, allow_diagonal);
        if candidates.is_empty() {
            current = hunt(maze, allow_diagonal, |maze, found| {
                create_long_braid(maze, found, allow_diagonal);
            });
            continue;
        }

        // Try to weave a loop before advancing to a new cell.
        if maze.rng_mut().unit() > 0.5 {
            create_braid(maze, cell, allow_diagonal);
        } else {
            create_partial_braid(maze, cell, allow_diagonal);
        }

        let pick = candidates[maze.rng_mut().index(candidates.len())];
        let _ = maze.connect(cell, pick);
        maze.mark_visited(pick);
        current = Some(pick);
    }
}

/// Scan phase shared by the hunt-and-kill family: find the first unvisited
/// cell adjacent to visited territory, connect it in, and hand it to
/// `after_connect`.
fn hunt(
    maze: &mut Maze,
    allow_diagonal: bool,
    after_connect: impl Fn(&mut Maze, CellCoord),
) -> Option<CellCoord> {
    for y in 0..maze.height() {
        for x in 0..maze.width() {
            let probe = CellCoord::new(x, y);
            if maze.is_visited(probe) {
                continue;
            }
            let mut visited = maze.visited_neighbors(probe, allow_diagonal);
            visited.retain(|next| maze.can_carve(probe, *next));
            if let Some(&pick) = pick_random(maze, &visited) {
                maze.mark_visited(probe);
                let _ = maze.connect(probe, pick);
                after_connect(maze, probe);
                return Some(probe);
            }
        }
    }
    None
}

fn create_braid(maze: &mut Maze, cell: CellCoord, allow_diagonal: bool) {
    let mut visited = maze.visited_neighbors(cell, allow_diagonal);
    visited.retain(|next| maze.can_carve(cell, *next));
    if !visited.is_empty() && maze.rng_mut().chance(BRAID_CHANCE) {
        let pick = visited[maze.rng_mut().index(visited.len())];
        let _ = maze.connect(cell, pick);
    }
}

fn create_partial_braid(maze: &mut Maze, cell: CellCoord, allow_diagonal: bool) {
    let unvisited = maze.carvable_unvisited_neighbors(cell, allow_diagonal);
    if !unvisited.is_empty() && maze.rng_mut().chance(BRAID_CHANCE) {
        let pick = unvisited[maze.rng_mut().index(unvisited.len())];
        let _ = maze.connect(cell, pick);
    }
}

/// Extends a braid along a short path of visited cells, connecting the
/// whole run when it reaches the minimum length.
fn create_long_braid(maze: &mut Maze, cell: CellCoord, allow_diagonal: bool) {
    let mut path = vec![cell];
    let mut next = cell;

    while path.len() < LONG_BRAID_LENGTH {
        let mut visited = maze.visited_neighbors(next, allow_diagonal);
        visited.retain(|candidate| !path.contains(candidate));
        let Some(&pick) = pick_random(maze, &visited) else {
            break;
        };
        path.push(pick);
        next = pick;
    }

    if path.len() >= LONG_BRAID_LENGTH {
        for pair in path.windows(2) {
            let _ = maze.connect(pair[0], pair[1]);
        }
    }
}

fn sidewinder(maze: &mut Maze) {
    for y in 0..maze.height() {
        let mut run: Vec<CellCoord> = Vec::new();
        for x in 0..maze.width() {
            let cell = CellCoord::new(x, y);
            run.push(cell);

            let at_eastern_boundary = x == maze.width() - 1;
            let at_northern_boundary = y == 0;
            let close_out =
                at_eastern_boundary || (!at_northern_boundary && maze.rng_mut().chance(0.5));

            if close_out {
                let chosen = run[maze.rng_mut().index(run.len())];
                if !at_northern_boundary {
                    let north = CellCoord::new(chosen.x(), chosen.y() - 1);
                    let _ = maze.connect(chosen, north);
                }
                run.clear();
            } else {
                let _ = maze.connect(cell, CellCoord::new(x + 1, y));
            }
        }
    }
}

fn ellers(maze: &mut Maze) {
    let width = maze.width() as usize;
    let height = maze.height();
    let mut row_sets: Vec<u64> = vec![0; width];
    let mut set_counter: u64 = 1;

    for y in 0..height {
        for x in 0..width {
            let cell = CellCoord::new(x as u32, y);
            if !maze.is_visited(cell) {
                maze.mark_visited(cell);
                row_sets[x] = set_counter;
                set_counter += 1;
            }
        }

        // Randomly join adjacent cells that live in different sets.
        for x in 0..width.saturating_sub(1) {
            if row_sets[x] != row_sets[x + 1] && maze.rng_mut().unit() > 0.5 {
                let _ = maze.connect(
                    CellCoord::new(x as u32, y),
                    CellCoord::new(x as u32 + 1, y),
                );
                row_sets[x + 1] = row_sets[x];
            }
        }

        if y < height - 1 {
            let mut joined_down: std::collections::HashSet<u64> = std::collections::HashSet::new();
            for x in 0..width {
                if !joined_down.contains(&row_sets[x]) && maze.rng_mut().unit() > 0.5 {
                    ellers_join_down(maze, x as u32, y);
                    let _ = joined_down.insert(row_sets[x]);
                }
            }
            // Every set must reach the next row at least once.
            for x in 0..width {
                if !joined_down.contains(&row_sets[x]) {
                    ellers_join_down(maze, x as u32, y);
                    let _ = joined_down.insert(row_sets[x]);
                }
            }
        } else {
            for x in 0..width.saturating_sub(1) {
                if row_sets[x] != row_sets[x + 1] {
                    let _ = maze.connect(
                        CellCoord::new(x as u32, y),
                        CellCoord::new(x as u32 + 1, y),
                    );
                    row_sets[x + 1] = row_sets[x];
                }
            }
        }
    }
}

fn ellers_join_down(maze: &mut Maze, x: u32, y: u32) {
    let below = CellCoord::new(x, y + 1);
    maze.mark_visited(below);
    let _ = maze.connect(CellCoord::new(x, y), below);
}

fn multi_path(maze: &mut Maze, allow_diagonal: bool) {
    let origin = CellCoord::new(0, 0);
    maze.mark_visited(origin);
    let mut stack = vec![origin];

    while let Some(current) = stack.last().copied() {
        let candidates = maze.carvable_unvisited_neighbors(current, allow_diagonal);
        if candidates.is_empty() {
            let _ = stack.pop();
            // Occasionally branch the abandoned trunk back into the maze.
            if maze.rng_mut().chance(MULTI_PATH_BRANCH_CHANCE) {
                if let Some(top) = stack.last().copied() {
                    merge_with_visited_neighbor(maze, top, allow_diagonal);
                }
            }
            continue;
        }

        let pick = candidates[maze.rng_mut().index(candidates.len())];
        maze.mark_visited(pick);
        stack.push(pick);
        let _ = maze.connect(current, pick);

        if maze.rng_mut().chance(MULTI_PATH_MERGE_CHANCE) {
            merge_with_visited_neighbor(maze, pick, allow_diagonal);
        }
    }
}

fn merge_with_visited_neighbor(maze: &mut Maze, cell: CellCoord, allow_diagonal: bool) {
    let mut visited = maze.visited_neighbors(cell, allow_diagonal);
    visited.retain(|next| maze.can_carve(cell, *next));
    if let Some(&pick) = pick_random(maze, &visited) {
        let _ = maze.connect(cell, pick);
    }
}

fn pick_random<'a>(maze: &mut Maze, items: &'a [CellCoord]) -> Option<&'a CellCoord> {
    if items.is_empty() {
        None
    } else {
        let index = maze.rng_mut().index(items.len());
        items.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in GeneratorKind::ALL {
            assert_eq!(GeneratorKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(GeneratorKind::from_name("prim"), None);
    }

    #[test]
    fn generate_maze_rejects_empty_grids() {
        let result = generate_maze(0, 5, GeneratorKind::DepthFirst, 1, false);
        assert!(result.is_err());
    }
}
