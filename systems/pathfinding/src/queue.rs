//! Binary-heap open set with decrease-key support.
//!
//! The standard library heap cannot reprioritize an element in place, so
//! the solver keeps its own heap plus a position table from cell id to heap
//! slot, updated on every swap.

use std::collections::HashMap;

use maze_nav_grid::CellId;

#[derive(Clone, Copy, Debug)]
struct HeapNode {
    id: CellId,
    priority: f64,
}

/// Min-heap of cell ids keyed by an `f = g + h` priority.
#[derive(Clone, Debug, Default)]
pub struct OpenSet {
    nodes: Vec<HeapNode>,
    positions: HashMap<CellId, usize>,
}

impl OpenSet {
    /// Creates an empty open set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Reports whether the set holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Reports whether the cell is currently queued.
    #[must_use]
    pub fn contains(&self, id: CellId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Queues a cell that is not already present.
    pub fn push(&mut self, id: CellId, priority: f64) {
        debug_assert!(!self.contains(id), "push of a queued cell; use update");
        let slot = self.nodes.len();
        self.nodes.push(HeapNode { id, priority });
        let _ = self.positions.insert(id, slot);
        self.bubble_up(slot);
    }

    /// Pops the queued cell with the lowest priority.
    pub fn pop(&mut self) -> Option<CellId> {
        let top = self.nodes.first()?.id;
        let last = self.nodes.pop().expect("non-empty heap has a tail");
        let _ = self.positions.remove(&top);

        if !self.nodes.is_empty() {
            self.nodes[0] = last;
            let _ = self.positions.insert(last.id, 0);
            self.sink_down(0);
        }
        Some(top)
    }

    /// Reprioritizes a queued cell, restoring heap order in both
    /// directions. A cell that is not queued is left alone.
    pub fn update(&mut self, id: CellId, priority: f64) {
        let Some(&slot) = self.positions.get(&id) else {
            return;
        };
        if self.nodes[slot].priority.total_cmp(&priority) == std::cmp::Ordering::Equal {
            return;
        }
        self.nodes[slot].priority = priority;
        self.bubble_up(slot);
        let slot = self.positions[&id];
        self.sink_down(slot);
    }

    /// Removes every queued cell.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.positions.clear();
    }

    fn bubble_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) >> 1;
            if self.nodes[slot].priority.total_cmp(&self.nodes[parent].priority)
                == std::cmp::Ordering::Less
            {
                self.swap_slots(slot, parent);
                slot = parent;
            } else {
                break;
            }
        }
    }

    fn sink_down(&mut self, mut slot: usize) {
        let len = self.nodes.len();
        loop {
            let left = slot * 2 + 1;
            let right = left + 1;
            let mut smallest = slot;

            if left < len
                && self.nodes[left].priority.total_cmp(&self.nodes[smallest].priority)
                    == std::cmp::Ordering::Less
            {
                smallest = left;
            }
            if right < len
                && self.nodes[right].priority.total_cmp(&self.nodes[smallest].priority)
                    == std::cmp::Ordering::Less
            {
                smallest = right;
            }
            if smallest == slot {
                break;
            }
            self.swap_slots(slot, smallest);
            slot = smallest;
        }
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        self.nodes.swap(a, b);
        let _ = self.positions.insert(self.nodes[a].id, a);
        let _ = self.positions.insert(self.nodes[b].id, b);
    }
}

#[cfg(test)]
mod tests {
    use super::OpenSet;
    use maze_nav_core::CellCoord;
    use maze_nav_grid::{CellId, Maze};

    fn ids(count: u32) -> Vec<CellId> {
        let maze = Maze::new(count, 1, 0, false).expect("row grid");
        (0..count)
            .map(|x| maze.id_of(CellCoord::new(x, 0)).expect("in bounds"))
            .collect()
    }

    #[test]
    fn pops_in_priority_order() {
        let ids = ids(5);
        let mut open = OpenSet::new();
        open.push(ids[0], 5.0);
        open.push(ids[1], 1.0);
        open.push(ids[2], 3.0);
        open.push(ids[3], 4.0);
        open.push(ids[4], 2.0);

        let order: Vec<CellId> = std::iter::from_fn(|| open.pop()).collect();
        assert_eq!(order, vec![ids[1], ids[4], ids[2], ids[3], ids[0]]);
        assert!(open.is_empty());
    }

    #[test]
    fn update_reorders_a_queued_cell() {
        let ids = ids(3);
        let mut open = OpenSet::new();
        open.push(ids[0], 1.0);
        open.push(ids[1], 2.0);
        open.push(ids[2], 3.0);

        open.update(ids[2], 0.5);
        assert_eq!(open.pop(), Some(ids[2]));

        open.update(ids[0], 9.0);
        assert_eq!(open.pop(), Some(ids[1]));
        assert_eq!(open.pop(), Some(ids[0]));
    }

    #[test]
    fn contains_tracks_membership_through_pops() {
        let ids = ids(2);
        let mut open = OpenSet::new();
        open.push(ids[0], 1.0);
        open.push(ids[1], 2.0);
        assert!(open.contains(ids[0]));

        assert_eq!(open.pop(), Some(ids[0]));
        assert!(!open.contains(ids[0]));
        assert!(open.contains(ids[1]));

        open.clear();
        assert!(!open.contains(ids[1]));
        assert_eq!(open.len(), 0);
    }
}
