//! Memory-bounded multi-agent iterative-deepening A*.
//!
//! Each agent runs a depth-first search bounded by an escalating cost
//! threshold, with its own bounded searched memory (oldest entries evicted
//! past the limit) and a shared occupancy ledger enforcing mutual
//! exclusion without agents knowing each other's plans. The driving loop
//! advances every unfinished agent by one expansion per round so planning
//! stays concurrent.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ops::ControlFlow;
use std::time::Duration;

use maze_nav_core::{AgentId, CellCoord};
use maze_nav_grid::{CellId, Maze};

use crate::{heuristic, OccupancyLedger, RuleContext, RuleSet, SolveError};

/// Searched-node budget applied to an agent when none is configured.
pub const DEFAULT_MEMORY_LIMIT: usize = 100;

/// One agent's path request.
#[derive(Clone, Debug)]
pub struct AgentGoal {
    /// Cell the agent starts from.
    pub start: CellCoord,
    /// Cell the agent wants to reach.
    pub end: CellCoord,
    /// Traversal rules applied to the agent's steps.
    pub rules: RuleSet,
    /// Bound on the agent's searched memory.
    pub memory_limit: usize,
}

impl AgentGoal {
    /// Creates a goal with the default memory limit.
    #[must_use]
    pub fn new(start: CellCoord, end: CellCoord, rules: RuleSet) -> Self {
        Self {
            start,
            end,
            rules,
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }

    /// Overrides the searched-memory bound.
    #[must_use]
    pub fn with_memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = limit.max(1);
        self
    }
}

/// Knobs shared by every agent of one `solve_multiple` call.
#[derive(Clone, Copy, Debug)]
pub struct MultiSolveOptions {
    /// Whether diagonal steps are permitted.
    pub allow_diagonal: bool,
    /// Rounds an agent may wait in place before giving up.
    pub max_wait_ticks: u32,
    /// Expansion budget per agent; defaults to the cell count.
    pub max_node_visits: Option<u32>,
    /// Pause between rounds, for animated stepping.
    pub round_delay: Option<Duration>,
}

impl Default for MultiSolveOptions {
    fn default() -> Self {
        Self {
            allow_diagonal: false,
            max_wait_ticks: 20,
            max_node_visits: None,
            round_delay: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct IdaNode {
    g: u32,
    f: f64,
    previous: Option<CellId>,
}

#[derive(Clone, Debug)]
struct AgentSearch {
    end: CellId,
    end_coord: CellCoord,
    threshold: f64,
    searched: HashMap<CellId, IdaNode>,
    order: VecDeque<CellId>,
    open: HashSet<CellId>,
    current: CellId,
    visits: u32,
    wait_ticks: u32,
    waits: HashMap<CellId, u32>,
    rules: RuleSet,
    memory_limit: usize,
    finished: bool,
    path: Vec<CellCoord>,
}

enum AgentOutcome {
    Working,
    Terminal,
}

/// Iterative-deepening solver for concurrent multi-agent path requests.
#[derive(Clone, Debug, Default)]
pub struct IdaStarSolver {
    agents: BTreeMap<AgentId, AgentSearch>,
    occupancy: OccupancyLedger,
    max_f: f64,
}

impl IdaStarSolver {
    /// Creates an idle solver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest `f` value seen by the last `solve_multiple` call.
    #[must_use]
    pub const fn max_f(&self) -> f64 {
        self.max_f
    }

    /// Plans paths for every agent concurrently.
    ///
    /// All unfinished agents advance by one bounded expansion per round.
    /// `on_goal_reached` fires when an agent terminates (goal reached, or
    /// budget/wait exhaustion with a partial path) and `on_round` after
    /// every round; either may return [`ControlFlow::Break`] to stop the
    /// whole solve early. A returned path that does not end at the agent's
    /// goal means the goal was unreachable within the agent's budget.
    pub fn solve_multiple(
        &mut self,
        maze: &Maze,
        goals: &BTreeMap<AgentId, AgentGoal>,
        options: &MultiSolveOptions,
        mut on_goal_reached: impl FnMut(AgentId, &[CellCoord]) -> ControlFlow<()>,
        mut on_round: impl FnMut(u32, usize) -> ControlFlow<()>,
    ) -> Result<BTreeMap<AgentId, Vec<CellCoord>>, SolveError> {
        self.agents.clear();
        self.occupancy.clear();
        self.max_f = 0.0;

        let uses_avoidance = goals.values().any(|goal| goal.rules.uses_mutual_exclusion());

        for (id, goal) in goals {
            let start_id = maze
                .id_of(goal.start)
                .ok_or(SolveError::OutOfBounds(goal.start))?;
            let end_id = maze.id_of(goal.end).ok_or(SolveError::OutOfBounds(goal.end))?;
            let threshold = heuristic(goal.start, goal.end, options.allow_diagonal);

            let mut searched = HashMap::new();
            let _ = searched.insert(
                start_id,
                IdaNode {
                    g: 0,
                    f: threshold,
                    previous: None,
                },
            );

            if uses_avoidance {
                self.occupancy.record(*id, goal.start);
            }

            let _ = self.agents.insert(
                *id,
                AgentSearch {
                    end: end_id,
                    end_coord: goal.end,
                    threshold,
                    searched,
                    order: VecDeque::from([start_id]),
                    open: HashSet::from([start_id]),
                    current: start_id,
                    visits: 0,
                    wait_ticks: 0,
                    waits: HashMap::new(),
                    rules: goal.rules.clone(),
                    memory_limit: goal.memory_limit.max(1),
                    finished: false,
                    path: Vec::new(),
                },
            );
        }

        let max_visits = options
            .max_node_visits
            .unwrap_or(maze.width() * maze.height());
        let mut unfinished = self.agents.len();
        let mut round: u32 = 0;

        'rounds: while unfinished > 0 {
            for (id, agent) in self.agents.iter_mut() {
                if agent.finished {
                    continue;
                }
                let outcome = step_agent(
                    maze,
                    *id,
                    agent,
                    &mut self.occupancy,
                    options,
                    max_visits,
                    uses_avoidance,
                    &mut self.max_f,
                );
                if matches!(outcome, AgentOutcome::Terminal) {
                    agent.finished = true;
                    unfinished -= 1;
                    if on_goal_reached(*id, &agent.path).is_break() {
                        break 'rounds;
                    }
                }
            }

            if on_round(round, unfinished).is_break() {
                break 'rounds;
            }
            if uses_avoidance {
                self.occupancy.begin_round();
            }
            round = round.saturating_add(1);

            if unfinished > 0 {
                if let Some(delay) = options.round_delay {
                    std::thread::sleep(delay);
                }
            }
        }

        let mut paths = BTreeMap::new();
        for (id, agent) in &self.agents {
            let path = if agent.finished {
                agent.path.clone()
            } else {
                reconstruct(maze, agent, agent.current)
            };
            let _ = paths.insert(*id, path);
        }
        Ok(paths)
    }
}

#[allow(clippy::too_many_arguments)]
fn step_agent(
    maze: &Maze,
    agent_id: AgentId,
    agent: &mut AgentSearch,
    occupancy: &mut OccupancyLedger,
    options: &MultiSolveOptions,
    max_visits: u32,
    uses_avoidance: bool,
    max_f: &mut f64,
) -> AgentOutcome {
    if agent.open.is_empty() {
        let _ = agent.open.insert(agent.current);
    }
    let current = lowest_f(agent);
    agent.current = current;
    agent.visits += 1;

    if current == agent.end {
        agent.path = reconstruct(maze, agent, current);
        return AgentOutcome::Terminal;
    }
    let _ = agent.open.remove(&current);

    let current_coord = maze.coord_of(current);
    let current_g = agent.searched.get(&current).map_or(0, |node| node.g);
    let mut next_threshold = f64::INFINITY;
    let mut neighbors_added = false;

    for neighbor_coord in maze.reachable_neighbors(current_coord, options.allow_diagonal) {
        let context = RuleContext {
            agent: Some(agent_id),
            occupancy: Some(&*occupancy),
        };
        if !agent.rules.allows(maze, current_coord, neighbor_coord, context) {
            continue;
        }
        let neighbor = maze.id_of(neighbor_coord).expect("neighbor in bounds");
        if agent.searched.contains_key(&neighbor) {
            continue;
        }

        let g = current_g + 1;
        let f = f64::from(g) + heuristic(neighbor_coord, agent.end_coord, options.allow_diagonal);
        if f > *max_f {
            *max_f = f;
        }

        // Nodes over the threshold stay frontier candidates at infinite
        // cost, so they are only expanded once nothing in-threshold
        // remains; the lowest overflow becomes the next threshold. The
        // parent link is kept either way or reconstruction would truncate.
        let node = if f <= agent.threshold {
            IdaNode {
                g,
                f,
                previous: Some(current),
            }
        } else {
            next_threshold = next_threshold.min(f);
            IdaNode {
                g,
                f: f64::INFINITY,
                previous: Some(current),
            }
        };
        let _ = agent.searched.insert(neighbor, node);
        agent.order.push_back(neighbor);
        let _ = agent.open.insert(neighbor);
        neighbors_added = true;
        evict_oldest(agent);
    }

    if !neighbors_added && agent.open.is_empty() {
        backtrack_to_unexplored(maze, agent_id, agent, occupancy, options);
    }

    if next_threshold.is_finite() && next_threshold >= agent.threshold {
        agent.threshold = next_threshold;
        agent.wait_ticks = 0;
    }

    if agent.visits >= max_visits {
        agent.path = reconstruct(maze, agent, current);
        return AgentOutcome::Terminal;
    }

    if agent.open.is_empty() {
        if agent.wait_ticks < options.max_wait_ticks {
            agent.wait_ticks += 1;
            *agent.waits.entry(current).or_insert(0) += 1;
        } else {
            agent.path = reconstruct(maze, agent, current);
            return AgentOutcome::Terminal;
        }
    }

    if uses_avoidance {
        occupancy.record(agent_id, maze.coord_of(current));
    }
    AgentOutcome::Working
}

/// Deterministic lowest-`f` selection: ties break on the smaller cell id so
/// runs replay identically regardless of hash ordering.
fn lowest_f(agent: &AgentSearch) -> CellId {
    let mut best: Option<(f64, CellId)> = None;
    for &id in &agent.open {
        let f = agent
            .searched
            .get(&id)
            .map_or(f64::INFINITY, |node| node.f);
        let better = match best {
            None => true,
            Some((best_f, best_id)) => match f.total_cmp(&best_f) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => id < best_id,
            },
        };
        if better {
            best = Some((f, id));
        }
    }
    best.map(|(_, id)| id).expect("open set is non-empty")
}

fn evict_oldest(agent: &mut AgentSearch) {
    while agent.order.len() > agent.memory_limit {
        let Some(oldest) = agent.order.pop_front() else {
            break;
        };
        if oldest == agent.current {
            agent.order.push_back(oldest);
            break;
        }
        let _ = agent.searched.remove(&oldest);
        let _ = agent.open.remove(&oldest);
    }
}

/// Walks the `previous` chain from the stuck node until an ancestor with
/// unexplored in-threshold neighbours is found, and reopens it.
fn backtrack_to_unexplored(
    maze: &Maze,
    agent_id: AgentId,
    agent: &mut AgentSearch,
    occupancy: &OccupancyLedger,
    options: &MultiSolveOptions,
) {
    let mut guard = agent.searched.len() + 1;
    let mut cursor = agent
        .searched
        .get(&agent.current)
        .and_then(|node| node.previous);

    while let Some(id) = cursor {
        if has_unexplored_neighbors(maze, agent_id, agent, occupancy, options, id) {
            let _ = agent.open.insert(id);
            return;
        }
        cursor = agent.searched.get(&id).and_then(|node| node.previous);
        guard -= 1;
        if guard == 0 {
            return;
        }
    }
}

fn has_unexplored_neighbors(
    maze: &Maze,
    agent_id: AgentId,
    agent: &AgentSearch,
    occupancy: &OccupancyLedger,
    options: &MultiSolveOptions,
    id: CellId,
) -> bool {
    let Some(node) = agent.searched.get(&id) else {
        return false;
    };
    let coord = maze.coord_of(id);
    maze.reachable_neighbors(coord, options.allow_diagonal)
        .any(|neighbor_coord| {
            let neighbor = maze.id_of(neighbor_coord).expect("neighbor in bounds");
            if agent.searched.contains_key(&neighbor) {
                return false;
            }
            let f = f64::from(node.g + 1)
                + heuristic(neighbor_coord, agent.end_coord, options.allow_diagonal);
            let context = RuleContext {
                agent: Some(agent_id),
                occupancy: Some(occupancy),
            };
            f <= agent.threshold && agent.rules.allows(maze, coord, neighbor_coord, context)
        })
}

fn reconstruct(maze: &Maze, agent: &AgentSearch, tail: CellId) -> Vec<CellCoord> {
    let wait_total: u32 = agent.waits.values().sum();
    let mut guard = agent.searched.len() + wait_total as usize + 1;
    let mut path = Vec::new();
    let mut current = Some(tail);

    while let Some(id) = current {
        let coord = maze.coord_of(id);
        path.push(coord);
        if let Some(count) = agent.waits.get(&id) {
            for _ in 0..*count {
                path.push(coord);
            }
        }
        current = agent.searched.get(&id).and_then(|node| node.previous);
        guard -= 1;
        if guard == 0 {
            break;
        }
    }

    path.reverse();
    path
}
