//! Pluggable traversal rules evaluated by one dispatcher.
//!
//! Rules are a tagged list of closed variants rather than an ad hoc bag of
//! predicates: the key rule treats a door as a wall unless the matching
//! colour is held, the mutual-exclusion rule consults the occupancy ledger
//! shared by concurrent agents, and the custom rule carries a plain
//! function pointer so rule sets stay cloneable and debuggable.

use std::collections::{BTreeSet, HashMap};

use maze_nav_core::{AgentId, CellCoord, Direction, DoorColor};
use maze_nav_grid::Maze;

/// Set of door colours an agent currently holds keys for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyRing {
    keys: BTreeSet<DoorColor>,
}

impl KeyRing {
    /// Creates an empty key ring.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ring holding the provided colours.
    #[must_use]
    pub fn holding(colors: &[DoorColor]) -> Self {
        Self {
            keys: colors.iter().cloned().collect(),
        }
    }

    /// Adds a key of the provided colour.
    pub fn insert(&mut self, color: DoorColor) {
        let _ = self.keys.insert(color);
    }

    /// Reports whether a key of the provided colour is held.
    #[must_use]
    pub fn contains(&self, color: &DoorColor) -> bool {
        self.keys.contains(color)
    }
}

/// One traversal rule variant.
#[derive(Clone, Debug)]
pub enum Rule {
    /// Doors block unless the matching key colour is held.
    Keys(KeyRing),
    /// A cell occupied by another agent this round or the previous one is
    /// impassable. Requires an occupancy ledger in the rule context.
    NoSameCell,
    /// Arbitrary predicate over a candidate step; returning `false` vetoes
    /// the move.
    Custom(fn(&Maze, CellCoord, CellCoord) -> bool),
}

/// Evaluation context supplied by the active solver.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleContext<'a> {
    /// Agent attempting the step, when solving multi-agent queries.
    pub agent: Option<AgentId>,
    /// Shared occupancy ledger, when mutual exclusion is in force.
    pub occupancy: Option<&'a OccupancyLedger>,
}

/// Ordered list of traversal rules sharing one dispatcher.
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates an empty rule set that allows every step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a rule set enforcing doors against the provided key ring.
    #[must_use]
    pub fn with_keys(ring: KeyRing) -> Self {
        Self {
            rules: vec![Rule::Keys(ring)],
        }
    }

    /// Appends a rule to the set.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Reports whether the set carries the mutual-exclusion rule.
    #[must_use]
    pub fn uses_mutual_exclusion(&self) -> bool {
        self.rules
            .iter()
            .any(|rule| matches!(rule, Rule::NoSameCell))
    }

    /// The key ring enforced by this set, if any.
    #[must_use]
    pub fn held_keys(&self) -> Option<&KeyRing> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::Keys(ring) => Some(ring),
            _ => None,
        })
    }

    /// Evaluates every rule against a candidate step from `from` to `to`.
    #[must_use]
    pub fn allows(
        &self,
        maze: &Maze,
        from: CellCoord,
        to: CellCoord,
        context: RuleContext<'_>,
    ) -> bool {
        self.rules.iter().all(|rule| match rule {
            Rule::Keys(ring) => !door_blocks(maze, ring, from, to),
            Rule::NoSameCell => match (context.agent, context.occupancy) {
                (Some(agent), Some(occupancy)) => !occupancy.blocks(agent, to),
                _ => true,
            },
            Rule::Custom(predicate) => predicate(maze, from, to),
        })
    }
}

/// Reports whether a door bars the step for an agent holding `ring`.
///
/// A door may be recorded on either side of the shared edge; holding the
/// key for whichever colour is present opens the passage.
fn door_blocks(maze: &Maze, ring: &KeyRing, from: CellCoord, to: CellCoord) -> bool {
    let Some(direction) = Direction::between(from, to) else {
        return false;
    };
    let from_door = maze.cell(from).and_then(|cell| cell.door(direction));
    let to_door = maze
        .cell(to)
        .and_then(|cell| cell.door(direction.opposite()));

    if from_door.is_none() && to_door.is_none() {
        return false;
    }
    let unlocked = from_door.map_or(false, |color| ring.contains(color))
        || to_door.map_or(false, |color| ring.contains(color));
    !unlocked
}

/// Cells occupied by concurrently planning agents, for the current round
/// and the immediately preceding one.
#[derive(Clone, Debug, Default)]
pub struct OccupancyLedger {
    current: HashMap<CellCoord, AgentId>,
    previous: HashMap<CellCoord, AgentId>,
}

impl OccupancyLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the cell an agent occupies this round.
    pub fn record(&mut self, agent: AgentId, cell: CellCoord) {
        let _ = self.current.insert(cell, agent);
    }

    /// Rolls the current round into the previous one.
    pub fn begin_round(&mut self) {
        self.previous = std::mem::take(&mut self.current);
    }

    /// Reports whether the cell is barred for `agent`: occupied by a
    /// different agent in the current or previous round.
    #[must_use]
    pub fn blocks(&self, agent: AgentId, cell: CellCoord) -> bool {
        let other = |occupant: &AgentId| *occupant != agent;
        self.current.get(&cell).map_or(false, other)
            || self.previous.get(&cell).map_or(false, other)
    }

    /// Clears both rounds.
    pub fn clear(&mut self) {
        self.current.clear();
        self.previous.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_blocks_other_agents_both_rounds() {
        let mut ledger = OccupancyLedger::new();
        let first = AgentId::new(1);
        let second = AgentId::new(2);
        let cell = CellCoord::new(3, 3);

        ledger.record(first, cell);
        assert!(ledger.blocks(second, cell));
        assert!(!ledger.blocks(first, cell), "agents never block themselves");

        ledger.begin_round();
        assert!(ledger.blocks(second, cell), "previous round still blocks");

        ledger.begin_round();
        assert!(!ledger.blocks(second, cell), "two rounds later it clears");
    }

    #[test]
    fn keys_rule_opens_matching_doors() {
        let mut maze = Maze::new(3, 1, 0, false).expect("grid");
        let a = CellCoord::new(0, 0);
        let b = CellCoord::new(1, 0);
        let c = CellCoord::new(2, 0);
        assert!(maze.connect(a, b));
        assert!(maze.connect(b, c));
        let red = DoorColor::new("red");
        assert!(maze.set_door(b, Direction::East, red.clone()));

        let locked = RuleSet::with_keys(KeyRing::new());
        assert!(locked.allows(&maze, a, b, RuleContext::default()));
        assert!(!locked.allows(&maze, b, c, RuleContext::default()));
        // The door blocks from the far side too.
        assert!(!locked.allows(&maze, c, b, RuleContext::default()));

        let keyed = RuleSet::with_keys(KeyRing::holding(std::slice::from_ref(&red)));
        assert!(keyed.allows(&maze, b, c, RuleContext::default()));
    }

    #[test]
    fn custom_rule_vetoes_steps() {
        let maze = Maze::new(2, 2, 0, false).expect("grid");
        let mut rules = RuleSet::new();
        rules.push(Rule::Custom(|_, _, to| to != CellCoord::new(1, 0)));

        assert!(rules.allows(
            &maze,
            CellCoord::new(0, 0),
            CellCoord::new(0, 1),
            RuleContext::default()
        ));
        assert!(!rules.allows(
            &maze,
            CellCoord::new(0, 0),
            CellCoord::new(1, 0),
            RuleContext::default()
        ));
    }
}
