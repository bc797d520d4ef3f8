use maze_nav_core::DoorColor;
use maze_nav_grid::Maze;
use maze_nav_system_doors::{add_doors_and_keys, PathStrategy};
use maze_nav_system_generation::{generate_maze, GeneratorKind};
use maze_nav_system_pathfinding::{AStarSolver, KeyRing, RuleSet};

fn braided_maze(width: u32, height: u32, seed: u64) -> Maze {
    generate_maze(width, height, GeneratorKind::HuntAndKillBraids, seed, false)
        .expect("maze generates")
}

fn solvable_with(maze: &Maze, keys: KeyRing) -> bool {
    let mut solver = AStarSolver::new();
    let path = solver
        .solve(
            maze,
            maze.start(),
            maze.end(),
            false,
            &RuleSet::with_keys(keys),
            0,
        )
        .expect("endpoints in bounds");
    path.last() == Some(&maze.end())
}

#[test]
fn single_colour_keeps_the_maze_solvable_with_one_reachable_key() {
    let mut maze = braided_maze(10, 10, 0xd00d);
    let red = DoorColor::new("red");
    let (maze_start, maze_end) = (maze.start(), maze.end());
    let outcome = add_doors_and_keys(
        &mut maze,
        maze_start,
        maze_end,
        std::slice::from_ref(&red),
        3,
        false,
        PathStrategy::LastPath,
    )
    .expect("placement succeeds");

    // Holding the key, the goal is reachable.
    assert!(solvable_with(&maze, KeyRing::holding(&[red.clone()])));

    // Exactly one key cell was recorded and it is reachable with no keys
    // in hand (no other colours remain to be placed).
    let key_cell = outcome.keys.get(&red).copied().expect("key placed");
    assert_eq!(outcome.keys.len(), 1);
    assert!(maze.cell(key_cell).expect("key cell in grid").has_key(&red));

    let mut solver = AStarSolver::new();
    let key_path = solver
        .solve(
            &maze,
            maze.start(),
            key_cell,
            false,
            &RuleSet::with_keys(KeyRing::new()),
            0,
        )
        .expect("endpoints in bounds");
    assert_eq!(key_path.last(), Some(&key_cell), "key must be reachable");

    // Doors were actually recorded on the maze.
    assert!(!outcome.doors[&red].is_empty());
    assert_eq!(maze.door_cells(&red), outcome.doors[&red].as_slice());
}

#[test]
fn blocking_is_only_ever_caused_by_doors() {
    let mut maze = braided_maze(12, 12, 0x5eed);
    let colors = [
        DoorColor::new("red"),
        DoorColor::new("cyan"),
        DoorColor::new("green"),
    ];
    let (maze_start, maze_end) = (maze.start(), maze.end());
    let _ = add_doors_and_keys(
        &mut maze,
        maze_start,
        maze_end,
        &colors,
        3,
        false,
        PathStrategy::LastPath,
    )
    .expect("placement succeeds");

    // Whatever the doors did, holding every key restores solvability:
    // no placement step may disconnect the maze itself.
    assert!(solvable_with(&maze, KeyRing::holding(&colors)));
}

#[test]
fn keys_are_reachable_holding_only_unplaced_colours() {
    let mut maze = braided_maze(12, 12, 0xf1f1);
    let colors = [
        DoorColor::new("red"),
        DoorColor::new("cyan"),
        DoorColor::new("green"),
    ];
    let (maze_start, maze_end) = (maze.start(), maze.end());
    let outcome = add_doors_and_keys(
        &mut maze,
        maze_start,
        maze_end,
        &colors,
        3,
        false,
        PathStrategy::LastPath,
    )
    .expect("placement succeeds");

    // Colour at index i was placed holding keys for colours 0..i.
    for (i, color) in colors.iter().enumerate() {
        let Some(key_cell) = outcome.keys.get(color).copied() else {
            panic!("no key recorded for {color}");
        };
        let mut solver = AStarSolver::new();
        let path = solver
            .solve(
                &maze,
                maze.start(),
                key_cell,
                false,
                &RuleSet::with_keys(KeyRing::holding(&colors[..i])),
                0,
            )
            .expect("endpoints in bounds");
        assert_eq!(
            path.last(),
            Some(&key_cell),
            "key for {color} unreachable with remaining colours"
        );
    }
}

#[test]
fn placement_is_deterministic_per_seed() {
    let run = |seed: u64| {
        let mut maze = braided_maze(10, 10, seed);
        let colors = [DoorColor::new("red"), DoorColor::new("cyan")];
        let (maze_start, maze_end) = (maze.start(), maze.end());
        let outcome = add_doors_and_keys(
            &mut maze,
            maze_start,
            maze_end,
            &colors,
            3,
            false,
            PathStrategy::LastPath,
        )
        .expect("placement succeeds");
        (maze.cell_data(), outcome.doors, outcome.keys)
    };

    assert_eq!(run(0xabcd), run(0xabcd));
}

#[test]
fn random_cell_strategy_places_a_reachable_key() {
    let mut maze = braided_maze(10, 10, 0x7777);
    let red = DoorColor::new("red");
    let (maze_start, maze_end) = (maze.start(), maze.end());
    let outcome = add_doors_and_keys(
        &mut maze,
        maze_start,
        maze_end,
        std::slice::from_ref(&red),
        3,
        false,
        PathStrategy::RandomCell,
    )
    .expect("placement succeeds");

    let key_cell = outcome.keys.get(&red).copied().expect("key placed");
    let mut solver = AStarSolver::new();
    let path = solver
        .solve(
            &maze,
            maze.start(),
            key_cell,
            false,
            &RuleSet::with_keys(KeyRing::new()),
            0,
        )
        .expect("endpoints in bounds");
    assert_eq!(path.last(), Some(&key_cell));
}
