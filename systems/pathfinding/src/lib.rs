#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid path-finding over the maze's reachable-neighbour graph.
//!
//! [`AStarSolver`] answers single-goal shortest-path queries with optional
//! wait ticks and pluggable traversal rules, and can run cooperatively one
//! expansion at a time so a caller may render intermediate state.
//! [`IdaStarSolver`] serves concurrent multi-agent requests under bounded
//! memory. Search bookkeeping lives in solver-owned arenas keyed by
//! [`CellId`](maze_nav_grid::CellId); cells themselves are never mutated.

mod idastar;
mod queue;
mod rules;

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use maze_nav_core::CellCoord;
use maze_nav_grid::{CellId, Maze};

pub use idastar::{AgentGoal, IdaStarSolver, MultiSolveOptions, DEFAULT_MEMORY_LIMIT};
pub use queue::OpenSet;
pub use rules::{KeyRing, OccupancyLedger, Rule, RuleContext, RuleSet};

/// Errors raised when a path query is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolveError {
    /// A query endpoint lies outside the grid.
    #[error("path endpoint {0} lies outside the grid")]
    OutOfBounds(CellCoord),
}

/// Distance estimate matching the topology: Manhattan for four-way grids,
/// Euclidean when diagonal steps are allowed.
#[must_use]
pub fn heuristic(from: CellCoord, to: CellCoord, allow_diagonal: bool) -> f64 {
    if allow_diagonal {
        from.euclidean_distance(to)
    } else {
        f64::from(from.manhattan_distance(to))
    }
}

/// Lifecycle of a solver instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverState {
    /// No search is in flight.
    Idle,
    /// A search is in flight and may be stepped.
    Stepping,
    /// The last search ran to completion or was aborted.
    Finished,
}

/// Result of advancing the solver by one expansion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// One node was expanded; the search continues.
    Expanded,
    /// The search terminated; the path is available.
    Finished,
}

#[derive(Clone, Copy, Debug, Default)]
struct SearchNode {
    g: u32,
    f: f64,
    previous: Option<CellId>,
}

/// Single-agent A* solver with wait ticks and a same-query path cache.
///
/// The transient `g`/`f`/`previous` search fields live in an arena owned by
/// the solver, indexed by cell id, and are reset between searches.
#[derive(Clone, Debug)]
pub struct AStarSolver {
    nodes: Vec<SearchNode>,
    open: OpenSet,
    closed: HashSet<CellId>,
    touched: Vec<CellId>,
    waits: HashMap<CellId, u32>,
    wait_ticks: u32,
    steps: u64,
    max_f: f64,
    path: Vec<CellCoord>,
    cached_query: Option<(CellCoord, CellCoord)>,
    state: SolverState,
    // Active query parameters, valid while `state` is `Stepping`.
    end_id: CellId,
    end_coord: CellCoord,
    allow_diagonal: bool,
    rules: RuleSet,
    max_wait_ticks: u32,
    closest: CellId,
    closest_h: f64,
}

impl Default for AStarSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AStarSolver {
    /// Creates an idle solver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            open: OpenSet::new(),
            closed: HashSet::new(),
            touched: Vec::new(),
            waits: HashMap::new(),
            wait_ticks: 0,
            steps: 0,
            max_f: 0.0,
            path: Vec::new(),
            cached_query: None,
            state: SolverState::Idle,
            end_id: CellId::default(),
            end_coord: CellCoord::new(0, 0),
            allow_diagonal: false,
            rules: RuleSet::new(),
            max_wait_ticks: 0,
            closest: CellId::default(),
            closest_h: f64::INFINITY,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SolverState {
        self.state
    }

    /// Path produced by the last terminated search.
    #[must_use]
    pub fn path(&self) -> &[CellCoord] {
        &self.path
    }

    /// Expansions performed by the current or last search.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Highest `f` value seen by the current or last search.
    #[must_use]
    pub const fn max_f(&self) -> f64 {
        self.max_f
    }

    /// Forgets the cached query so the next solve runs fresh.
    ///
    /// Call this after mutating the maze (walls, doors) between solves of
    /// the same endpoints.
    pub fn clear_cache(&mut self) {
        self.cached_query = None;
    }

    /// Solves a single-goal query, running to termination.
    ///
    /// Repeating the previous query short-circuits and returns the cached
    /// path. A path that does not end at the goal means the goal is
    /// currently unreachable; it is the closest approach found, not an
    /// error.
    pub fn solve(
        &mut self,
        maze: &Maze,
        start: CellCoord,
        end: CellCoord,
        allow_diagonal: bool,
        rules: &RuleSet,
        max_wait_ticks: u32,
    ) -> Result<Vec<CellCoord>, SolveError> {
        if self.cached_query == Some((start, end)) && !self.path.is_empty() {
            return Ok(self.path.clone());
        }

        self.begin(maze, start, end, allow_diagonal, rules.clone(), max_wait_ticks)?;
        while self.step(maze) == StepOutcome::Expanded {}
        self.cached_query = Some((start, end));
        Ok(self.path.clone())
    }

    /// Starts a cooperative search that the caller advances with
    /// [`AStarSolver::step`].
    pub fn begin(
        &mut self,
        maze: &Maze,
        start: CellCoord,
        end: CellCoord,
        allow_diagonal: bool,
        rules: RuleSet,
        max_wait_ticks: u32,
    ) -> Result<(), SolveError> {
        let start_id = maze.id_of(start).ok_or(SolveError::OutOfBounds(start))?;
        let end_id = maze.id_of(end).ok_or(SolveError::OutOfBounds(end))?;

        self.reset(maze);
        self.end_id = end_id;
        self.end_coord = end;
        self.allow_diagonal = allow_diagonal;
        self.rules = rules;
        self.max_wait_ticks = max_wait_ticks;
        self.closest = start_id;
        self.closest_h = heuristic(start, end, allow_diagonal);

        let f = self.closest_h;
        self.nodes[start_id.index()] = SearchNode {
            g: 0,
            f,
            previous: None,
        };
        self.touched.push(start_id);
        self.open.push(start_id, f);
        self.state = SolverState::Stepping;
        Ok(())
    }

    /// Advances the search by one expansion.
    pub fn step(&mut self, maze: &Maze) -> StepOutcome {
        if self.state != SolverState::Stepping {
            return StepOutcome::Finished;
        }

        let Some(current) = self.open.pop() else {
            return self.finish(maze, self.closest);
        };
        let _ = self.closed.insert(current);
        self.touched.push(current);

        let current_coord = maze.coord_of(current);
        let current_h = heuristic(current_coord, self.end_coord, self.allow_diagonal);
        if current_h < self.closest_h {
            self.closest_h = current_h;
            self.closest = current;
        }

        if current == self.end_id {
            return self.finish(maze, current);
        }

        let current_g = self.nodes[current.index()].g;
        let mut has_valid_move = false;

        for neighbor_coord in maze.reachable_neighbors(current_coord, self.allow_diagonal) {
            let neighbor = maze.id_of(neighbor_coord).expect("neighbor in bounds");
            if self.closed.contains(&neighbor) {
                continue;
            }

            let tentative_g = current_g + 1;
            let queued = self.open.contains(neighbor);
            if queued && tentative_g >= self.nodes[neighbor.index()].g {
                continue;
            }
            if !self
                .rules
                .allows(maze, current_coord, neighbor_coord, RuleContext::default())
            {
                continue;
            }

            has_valid_move = true;
            self.wait_ticks = 0;

            let f = f64::from(tentative_g)
                + heuristic(neighbor_coord, self.end_coord, self.allow_diagonal);
            if f > self.max_f {
                self.max_f = f;
            }
            self.nodes[neighbor.index()] = SearchNode {
                g: tentative_g,
                f,
                previous: Some(current),
            };
            self.touched.push(neighbor);

            if queued {
                self.open.update(neighbor, f);
            } else {
                self.open.push(neighbor, f);
            }
        }

        if !has_valid_move {
            if self.wait_ticks < self.max_wait_ticks {
                // Wait in place: requeue at a higher cost and allow the
                // cell to be expanded again.
                self.wait_ticks += 1;
                *self.waits.entry(current).or_insert(0) += 1;
                let f = self.nodes[current.index()].f + 1.0;
                self.open.push(current, f);
                let _ = self.closed.remove(&current);
            } else if self.open.is_empty() {
                return self.finish(maze, self.closest);
            }
        }

        self.steps += 1;
        StepOutcome::Expanded
    }

    /// Cancels a cooperative search, returning the best path found so far.
    pub fn abort(&mut self, maze: &Maze) -> Vec<CellCoord> {
        if self.state == SolverState::Stepping {
            let _ = self.finish(maze, self.closest);
        }
        self.path.clone()
    }

    fn finish(&mut self, maze: &Maze, tail: CellId) -> StepOutcome {
        self.path = self.reconstruct(maze, tail);
        self.state = SolverState::Finished;
        StepOutcome::Finished
    }

    /// Walks `previous` links back to the start, re-expanding recorded wait
    /// ticks so the path length reflects real wait time.
    fn reconstruct(&self, maze: &Maze, tail: CellId) -> Vec<CellCoord> {
        let wait_total: u32 = self.waits.values().sum();
        let mut guard = self.nodes.len() + wait_total as usize + 1;
        let mut path = Vec::new();
        let mut current = Some(tail);

        while let Some(id) = current {
            let coord = maze.coord_of(id);
            path.push(coord);
            if let Some(count) = self.waits.get(&id) {
                for _ in 0..*count {
                    path.push(coord);
                }
            }
            current = self.nodes[id.index()].previous;
            guard -= 1;
            if guard == 0 {
                break;
            }
        }

        path.reverse();
        path
    }

    fn reset(&mut self, maze: &Maze) {
        let cell_count = maze.width() as usize * maze.height() as usize;
        if self.nodes.len() != cell_count {
            self.nodes = vec![SearchNode::default(); cell_count];
            self.touched.clear();
        } else {
            for id in self.touched.drain(..) {
                self.nodes[id.index()] = SearchNode::default();
            }
        }
        self.open.clear();
        self.closed.clear();
        self.waits.clear();
        self.wait_ticks = 0;
        self.steps = 0;
        self.max_f = 0.0;
        self.path.clear();
        self.cached_query = None;
        self.state = SolverState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_nav_core::Direction;

    /// 3x3 grid with every orthogonal passage open.
    fn open_grid() -> Maze {
        let mut maze = Maze::new(3, 3, 0, false).expect("grid");
        for y in 0..3 {
            for x in 0..3 {
                let cell = CellCoord::new(x, y);
                if x + 1 < 3 {
                    assert!(maze.connect(cell, CellCoord::new(x + 1, y)));
                }
                if y + 1 < 3 {
                    assert!(maze.connect(cell, CellCoord::new(x, y + 1)));
                }
            }
        }
        maze
    }

    #[test]
    fn solve_finds_a_shortest_route_on_an_open_grid() {
        let maze = open_grid();
        let mut solver = AStarSolver::new();
        let path = solver
            .solve(
                &maze,
                CellCoord::new(0, 0),
                CellCoord::new(2, 2),
                false,
                &RuleSet::new(),
                0,
            )
            .expect("endpoints in bounds");

        assert_eq!(path.first(), Some(&CellCoord::new(0, 0)));
        assert_eq!(path.last(), Some(&CellCoord::new(2, 2)));
        assert_eq!(path.len(), 5, "shortest route takes four steps");
    }

    #[test]
    fn solve_rejects_out_of_bounds_endpoints() {
        let maze = open_grid();
        let mut solver = AStarSolver::new();
        let result = solver.solve(
            &maze,
            CellCoord::new(9, 9),
            CellCoord::new(0, 0),
            false,
            &RuleSet::new(),
            0,
        );
        assert_eq!(result, Err(SolveError::OutOfBounds(CellCoord::new(9, 9))));
    }

    #[test]
    fn repeating_a_query_reuses_the_cached_path() {
        let maze = open_grid();
        let mut solver = AStarSolver::new();
        let start = CellCoord::new(0, 0);
        let end = CellCoord::new(2, 0);

        let first = solver
            .solve(&maze, start, end, false, &RuleSet::new(), 0)
            .expect("solves");
        let steps_after_first = solver.steps();
        let second = solver
            .solve(&maze, start, end, false, &RuleSet::new(), 0)
            .expect("solves");

        assert_eq!(first, second);
        assert_eq!(solver.steps(), steps_after_first, "no new expansions");
    }

    #[test]
    fn locked_door_yields_closest_approach() {
        let mut maze = Maze::new(3, 1, 0, false).expect("grid");
        let a = CellCoord::new(0, 0);
        let b = CellCoord::new(1, 0);
        let c = CellCoord::new(2, 0);
        assert!(maze.connect(a, b));
        assert!(maze.connect(b, c));
        let red = maze_nav_core::DoorColor::new("red");
        assert!(maze.set_door(b, Direction::East, red.clone()));

        let mut solver = AStarSolver::new();
        let locked = solver
            .solve(&maze, a, c, false, &RuleSet::with_keys(KeyRing::new()), 0)
            .expect("solves");
        assert_eq!(locked.last(), Some(&b), "stops at the closest approach");

        let keyed = solver
            .solve(
                &maze,
                a,
                c,
                false,
                &RuleSet::with_keys(KeyRing::holding(&[red])),
                0,
            )
            .expect("solves");
        assert_eq!(keyed.last(), Some(&c));
    }

    #[test]
    fn wait_ticks_pad_the_path_when_no_move_is_valid() {
        let maze = open_grid();
        let mut rules = RuleSet::new();
        rules.push(Rule::Custom(|_, _, _| false));

        let mut solver = AStarSolver::new();
        let path = solver
            .solve(&maze, CellCoord::new(1, 1), CellCoord::new(2, 2), false, &rules, 3)
            .expect("solves");

        assert_eq!(path.len(), 4, "start plus three waits");
        assert!(path.iter().all(|cell| *cell == CellCoord::new(1, 1)));
    }

    #[test]
    fn stepped_search_can_be_aborted_for_a_partial_path() {
        let maze = open_grid();
        let mut solver = AStarSolver::new();
        solver
            .begin(
                &maze,
                CellCoord::new(0, 0),
                CellCoord::new(2, 2),
                false,
                RuleSet::new(),
                0,
            )
            .expect("begins");

        assert_eq!(solver.state(), SolverState::Stepping);
        assert_eq!(solver.step(&maze), StepOutcome::Expanded);
        assert_eq!(solver.step(&maze), StepOutcome::Expanded);

        let partial = solver.abort(&maze);
        assert_eq!(solver.state(), SolverState::Finished);
        assert_eq!(partial.first(), Some(&CellCoord::new(0, 0)));
        assert!(!partial.is_empty());
    }

    #[test]
    fn stepped_search_reaches_the_goal_when_driven_to_completion() {
        let maze = open_grid();
        let mut solver = AStarSolver::new();
        solver
            .begin(
                &maze,
                CellCoord::new(0, 0),
                CellCoord::new(2, 2),
                false,
                RuleSet::new(),
                0,
            )
            .expect("begins");

        while solver.step(&maze) == StepOutcome::Expanded {}
        assert_eq!(solver.path().last(), Some(&CellCoord::new(2, 2)));
    }

    #[test]
    fn start_equal_to_end_is_a_single_cell_path() {
        let maze = open_grid();
        let mut solver = AStarSolver::new();
        let path = solver
            .solve(
                &maze,
                CellCoord::new(1, 1),
                CellCoord::new(1, 1),
                false,
                &RuleSet::new(),
                0,
            )
            .expect("solves");
        assert_eq!(path, vec![CellCoord::new(1, 1)]);
    }
}
