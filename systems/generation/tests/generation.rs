use std::collections::HashSet;

use maze_nav_core::{CellCoord, Direction};
use maze_nav_grid::Maze;
use maze_nav_system_generation::{generate_maze, GeneratorKind};

const CARVERS: [GeneratorKind; 6] = [
    GeneratorKind::DepthFirst,
    GeneratorKind::HuntAndKill,
    GeneratorKind::HuntAndKillBraids,
    GeneratorKind::Sidewinder,
    GeneratorKind::Ellers,
    GeneratorKind::MultiPath,
];

fn reachable_cells(maze: &Maze, from: CellCoord) -> HashSet<CellCoord> {
    let mut seen = HashSet::new();
    let mut frontier = vec![from];
    let _ = seen.insert(from);
    while let Some(cell) = frontier.pop() {
        for next in maze.reachable_neighbors(cell, maze.allow_diagonal()) {
            if seen.insert(next) {
                frontier.push(next);
            }
        }
    }
    seen
}

#[test]
fn every_carver_connects_the_whole_grid() {
    for kind in CARVERS {
        let maze = generate_maze(9, 7, kind, 0xbeef, false).expect("maze generates");
        let reachable = reachable_cells(&maze, maze.start());
        assert_eq!(
            reachable.len(),
            9 * 7,
            "{kind} left cells unreachable from the start"
        );
    }
}

#[test]
fn diagonal_carvers_connect_the_whole_grid() {
    for kind in [GeneratorKind::DepthFirst, GeneratorKind::HuntAndKillBraids] {
        let maze = generate_maze(8, 8, kind, 0x1234, true).expect("maze generates");
        let reachable = reachable_cells(&maze, maze.start());
        assert_eq!(
            reachable.len(),
            8 * 8,
            "{kind} left cells unreachable in diagonal mode"
        );
    }
}

#[test]
fn walls_stay_symmetric_across_every_edge() {
    for kind in [GeneratorKind::DepthFirst, GeneratorKind::Ellers] {
        let maze = generate_maze(10, 10, kind, 7, false).expect("maze generates");
        for cell in maze.cells() {
            for direction in Direction::ALL {
                let Some(neighbor) = maze.neighbor(cell.coord(), direction) else {
                    continue;
                };
                let here_open = !cell.has_wall(direction);
                let there_open = !maze
                    .cell(neighbor)
                    .expect("neighbor exists")
                    .has_wall(direction.opposite());
                assert_eq!(
                    here_open, there_open,
                    "{kind}: asymmetric wall between {} and {}",
                    cell.coord(),
                    neighbor
                );
            }
        }
    }
}

#[test]
fn braided_hunt_and_kill_is_byte_identical_per_seed() {
    let first = generate_maze(5, 5, GeneratorKind::HuntAndKillBraids, 99, false)
        .expect("maze generates");
    let second = generate_maze(5, 5, GeneratorKind::HuntAndKillBraids, 99, false)
        .expect("maze generates");
    assert_eq!(first.cell_data(), second.cell_data());
}

#[test]
fn different_seeds_produce_different_layouts() {
    let first = generate_maze(8, 8, GeneratorKind::HuntAndKillBraids, 1, false)
        .expect("maze generates");
    let second = generate_maze(8, 8, GeneratorKind::HuntAndKillBraids, 2, false)
        .expect("maze generates");
    assert_ne!(first.cell_data(), second.cell_data());
}

#[test]
fn dead_end_removal_opens_every_cell() {
    let maze = generate_maze(6, 6, GeneratorKind::NoDeadEnds, 5, false).expect("maze generates");
    for cell in maze.cells() {
        assert!(
            !cell.walls().is_solid(),
            "cell {} stayed sealed",
            cell.coord()
        );
    }
}

#[test]
fn spiral_dead_end_removal_builds_a_center_plaza() {
    let maze =
        generate_maze(7, 7, GeneratorKind::NoDeadEndsSpiral, 5, false).expect("maze generates");
    let center = CellCoord::new(3, 3);
    assert_eq!(maze.reachable_neighbors(center, false).count(), 4);
}

#[test]
fn diagonal_passages_never_cut_solid_corners() {
    let maze = generate_maze(10, 10, GeneratorKind::DepthFirst, 0xacc3, true)
        .expect("maze generates");
    for cell in maze.cells() {
        for direction in [
            Direction::NorthEast,
            Direction::SouthEast,
            Direction::SouthWest,
            Direction::NorthWest,
        ] {
            if !maze.is_passage_open(cell.coord(), direction) {
                continue;
            }
            let [first, second] = direction.flanking(true);
            let around_open = [
                maze.is_passage_open(cell.coord(), first),
                maze.is_passage_open(cell.coord(), second),
                maze.neighbor(cell.coord(), first)
                    .map_or(false, |flank| maze.is_passage_open(flank, second)),
                maze.neighbor(cell.coord(), second)
                    .map_or(false, |flank| maze.is_passage_open(flank, first)),
            ];
            assert!(
                around_open.into_iter().any(|open| open),
                "diagonal passage at {} toward {direction:?} cuts a solid corner",
                cell.coord()
            );
        }
    }
}

#[test]
fn start_and_end_sit_on_grid_edges() {
    for kind in CARVERS {
        let maze = generate_maze(12, 9, kind, 0x51de, false).expect("maze generates");
        for coord in [maze.start(), maze.end()] {
            let on_edge = coord.x() == 0
                || coord.y() == 0
                || coord.x() == maze.width() - 1
                || coord.y() == maze.height() - 1;
            assert!(on_edge, "{kind}: {coord} is not on an edge");
        }
    }
}
