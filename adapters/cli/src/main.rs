//! Command-line adapter for the maze navigation engine: generate, render,
//! transfer, solve, and steer.

mod render;
mod snapshot_transfer;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec2;

use maze_nav_core::{CellCoord, DoorColor};
use maze_nav_grid::{Maze, SeededRng};
use maze_nav_system_doors::{add_doors_and_keys, PathStrategy};
use maze_nav_system_flowfield::{field_goal_for_cell, FlowField, FlowFieldOptions};
use maze_nav_system_generation::{generate_maze, GeneratorKind};
use maze_nav_system_pathfinding::{AStarSolver, KeyRing, RuleSet};
use maze_nav_system_steering::{CrowdSteering, EntityId, SteeringConfig};

#[derive(Parser)]
#[command(name = "maze-nav", about = "Procedural maze generation and navigation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a maze, optionally placing doors and keys.
    Generate {
        /// Grid width in cells.
        #[arg(long, default_value_t = 10)]
        width: u32,
        /// Grid height in cells.
        #[arg(long, default_value_t = 10)]
        height: u32,
        /// Generator algorithm name.
        #[arg(long, default_value = "hunt-and-kill-braids")]
        generator: String,
        /// Seed for the maze's random stream.
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Use the eight-way topology.
        #[arg(long)]
        diagonal: bool,
        /// Comma-separated door colours to place, outermost first.
        #[arg(long)]
        doors: Option<String>,
        /// Door placement window measured from the active goal.
        #[arg(long, default_value_t = 3)]
        max_cells_from_end: u32,
        /// Key placement strategy: first-path, last-path, or random-cell.
        #[arg(long, default_value = "last-path")]
        strategy: String,
        /// Solve start to end and report the path length.
        #[arg(long)]
        solve: bool,
        /// Print the snapshot transfer string.
        #[arg(long)]
        export: bool,
    },
    /// Decode a transfer string and render the maze.
    Show {
        /// Snapshot transfer string produced by `generate --export`.
        snapshot: String,
    },
    /// Solve a path query against an encoded maze.
    Solve {
        /// Snapshot transfer string.
        snapshot: String,
        /// Start cell as `x,y`.
        #[arg(long)]
        from: String,
        /// Goal cell as `x,y`.
        #[arg(long)]
        to: String,
        /// Comma-separated key colours held while solving.
        #[arg(long)]
        keys: Option<String>,
        /// Wait ticks allowed before giving up on a blocked step.
        #[arg(long, default_value_t = 0)]
        max_wait_ticks: u32,
    },
    /// Build a flow field over an encoded maze and report its gradient.
    Flow {
        /// Snapshot transfer string.
        snapshot: String,
        /// Goal cell as `x,y`; defaults to the maze end.
        #[arg(long)]
        goal: Option<String>,
    },
    /// Run a crowd of flow-field-steered entities toward the maze end.
    Crowd {
        /// Snapshot transfer string.
        snapshot: String,
        /// Number of simulated entities.
        #[arg(long, default_value_t = 10)]
        entities: u32,
        /// Number of flow fields (field 0 tracks the target).
        #[arg(long, default_value_t = 4)]
        fields: usize,
        /// Simulation ticks to run.
        #[arg(long, default_value_t = 200)]
        ticks: u32,
        /// Seed for entity placement and field switching.
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            width,
            height,
            generator,
            seed,
            diagonal,
            doors,
            max_cells_from_end,
            strategy,
            solve,
            export,
        } => run_generate(
            width,
            height,
            &generator,
            seed,
            diagonal,
            doors.as_deref(),
            max_cells_from_end,
            &strategy,
            solve,
            export,
        ),
        Command::Show { snapshot } => run_show(&snapshot),
        Command::Solve {
            snapshot,
            from,
            to,
            keys,
            max_wait_ticks,
        } => run_solve(&snapshot, &from, &to, keys.as_deref(), max_wait_ticks),
        Command::Flow { snapshot, goal } => run_flow(&snapshot, goal.as_deref()),
        Command::Crowd {
            snapshot,
            entities,
            fields,
            ticks,
            seed,
        } => run_crowd(&snapshot, entities, fields, ticks, seed),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_generate(
    width: u32,
    height: u32,
    generator: &str,
    seed: u64,
    diagonal: bool,
    doors: Option<&str>,
    max_cells_from_end: u32,
    strategy: &str,
    solve: bool,
    export: bool,
) -> Result<()> {
    let kind = parse_generator(generator)?;
    let mut maze = generate_maze(width, height, kind, seed, diagonal)
        .with_context(|| format!("generating a {width}x{height} maze"))?;

    let mut colors = Vec::new();
    if let Some(doors) = doors {
        colors = parse_colors(doors);
        let strategy = parse_strategy(strategy)?;
        let maze_start = maze.start();
        let maze_end = maze.end();
        let outcome = add_doors_and_keys(
            &mut maze,
            maze_start,
            maze_end,
            &colors,
            max_cells_from_end,
            diagonal,
            strategy,
        )
        .context("placing doors and keys")?;

        for color in &colors {
            let door_count = outcome.doors.get(color).map_or(0, Vec::len);
            match outcome.keys.get(color) {
                Some(cell) => {
                    println!("colour {color}: {door_count} door(s), key at {cell}")
                }
                None => println!("colour {color}: {door_count} door(s), no key"),
            }
        }
    }

    print!("{}", render::render_maze(&maze));
    println!("start {} end {}", maze.start(), maze.end());

    if solve {
        let mut solver = AStarSolver::new();
        let rules = RuleSet::with_keys(KeyRing::holding(&colors));
        let path = solver.solve(&maze, maze.start(), maze.end(), diagonal, &rules, 0)?;
        if path.last() == Some(&maze.end()) {
            println!(
                "solved in {} cells after {} expansions",
                path.len(),
                solver.steps()
            );
        } else {
            println!("goal unreachable; closest approach has {} cells", path.len());
        }
    }

    if export {
        println!("{}", snapshot_transfer::encode(&maze.cell_data()));
    }
    Ok(())
}

fn run_show(snapshot: &str) -> Result<()> {
    let maze = decode_maze(snapshot)?;
    print!("{}", render::render_maze(&maze));
    println!(
        "{}x{} diagonal={} start {} end {}",
        maze.width(),
        maze.height(),
        maze.allow_diagonal(),
        maze.start(),
        maze.end()
    );
    Ok(())
}

fn run_solve(
    snapshot: &str,
    from: &str,
    to: &str,
    keys: Option<&str>,
    max_wait_ticks: u32,
) -> Result<()> {
    let maze = decode_maze(snapshot)?;
    let from = parse_coord(from)?;
    let to = parse_coord(to)?;
    let ring = KeyRing::holding(&keys.map(parse_colors).unwrap_or_default());

    let mut solver = AStarSolver::new();
    let path = solver.solve(
        &maze,
        from,
        to,
        maze.allow_diagonal(),
        &RuleSet::with_keys(ring),
        max_wait_ticks,
    )?;

    let reached = path.last() == Some(&to);
    for cell in &path {
        println!("{cell}");
    }
    if reached {
        println!("reached {} in {} cells", to, path.len());
    } else {
        println!("goal unreachable; printed the closest approach");
    }
    Ok(())
}

fn run_flow(snapshot: &str, goal: Option<&str>) -> Result<()> {
    let maze = decode_maze(snapshot)?;
    let goal_cell = match goal {
        Some(raw) => parse_coord(raw)?,
        None => maze.end(),
    };

    let options = FlowFieldOptions {
        allow_diagonal: maze.allow_diagonal(),
        ..FlowFieldOptions::default()
    };
    let mut field = FlowField::from_maze(&maze, options);
    let (gx, gy) = field_goal_for_cell(goal_cell);
    field.update_field(gx, gy);

    let mut passable = 0u64;
    let mut reachable = 0u64;
    for y in 0..field.height() {
        for x in 0..field.width() {
            if field.is_passable(x, y) {
                passable += 1;
                if field.integration(x, y).is_finite() {
                    reachable += 1;
                }
            }
        }
    }
    println!(
        "field {}x{} toward {}: {reachable}/{passable} passable sub-cells reach the goal",
        field.width(),
        field.height(),
        goal_cell
    );

    // Cell-centre quiver, one arrow per maze cell.
    for y in 0..maze.height() {
        let mut line = String::new();
        for x in 0..maze.width() {
            let (cx, cy) = field_goal_for_cell(CellCoord::new(x, y));
            let direction = field.flow_direction(cx, cy);
            line.push(quiver_glyph(direction));
        }
        println!("{line}");
    }
    Ok(())
}

fn run_crowd(snapshot: &str, entities: u32, fields: usize, ticks: u32, seed: u64) -> Result<()> {
    let mut maze = decode_maze(snapshot)?;
    maze.reseed(seed);
    let options = FlowFieldOptions {
        allow_diagonal: maze.allow_diagonal(),
        ..FlowFieldOptions::default()
    };
    let target_cell = maze.end();
    let start = maze.start();

    let mut steering = CrowdSteering::new(&mut maze, fields, options, SteeringConfig::default())
        .map_err(|error| anyhow!(error))?;
    steering.retarget(0, target_cell);

    let (tx, ty) = field_goal_for_cell(target_cell);
    let target = Vec2::new(tx as f32, ty as f32);
    let mut rng = SeededRng::new(seed ^ 0x9e37_79b9);

    let mut crowd: Vec<(EntityId, Vec2)> = (0..entities)
        .map(|index| {
            let cell = maze.random_cell_away_from(&[start, target_cell], 2);
            let (cx, cy) = field_goal_for_cell(cell);
            let entity = EntityId::new(index);
            let waypoint_field = 1 + rng.index(fields - 1);
            steering.assign(entity, waypoint_field);
            (entity, Vec2::new(cx as f32, cy as f32))
        })
        .collect();

    for _ in 0..ticks {
        for (entity, position) in &mut crowd {
            if let Some(impulse) = steering.steer(*entity, *position, target, false, &mut rng) {
                *position += impulse.velocity;
            }
        }
    }

    let arrived = crowd
        .iter()
        .filter(|(_, position)| position.distance(target) < 1.5 * 7.0)
        .count();
    println!(
        "{arrived}/{} entities within reach of {target_cell} after {ticks} ticks",
        crowd.len()
    );
    Ok(())
}

fn decode_maze(snapshot: &str) -> Result<Maze> {
    let decoded = snapshot_transfer::decode(snapshot).map_err(|error| anyhow!(error))?;
    Maze::from_cell_data(&decoded, 0).map_err(|error| anyhow!(error))
}

fn parse_generator(name: &str) -> Result<GeneratorKind> {
    GeneratorKind::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = GeneratorKind::ALL.iter().map(|kind| kind.name()).collect();
        anyhow!("unknown generator '{name}'; expected one of {}", known.join(", "))
    })
}

fn parse_strategy(name: &str) -> Result<PathStrategy> {
    match name {
        "first-path" => Ok(PathStrategy::FirstPath),
        "last-path" => Ok(PathStrategy::LastPath),
        "random-cell" => Ok(PathStrategy::RandomCell),
        other => bail!("unknown strategy '{other}'; expected first-path, last-path or random-cell"),
    }
}

fn parse_colors(raw: &str) -> Vec<DoorColor> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(DoorColor::new)
        .collect()
}

fn parse_coord(raw: &str) -> Result<CellCoord> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("expected 'x,y', got '{raw}'"))?;
    Ok(CellCoord::new(
        x.trim().parse().with_context(|| format!("parsing x in '{raw}'"))?,
        y.trim().parse().with_context(|| format!("parsing y in '{raw}'"))?,
    ))
}

fn quiver_glyph(direction: Vec2) -> char {
    if direction == Vec2::ZERO {
        '.'
    } else if direction.x.abs() >= direction.y.abs() {
        if direction.x > 0.0 {
            '>'
        } else {
            '<'
        }
    } else if direction.y > 0.0 {
        'v'
    } else {
        '^'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_parse_and_reject_garbage() {
        assert_eq!(parse_coord("3,4").unwrap(), CellCoord::new(3, 4));
        assert_eq!(parse_coord(" 7 , 0 ").unwrap(), CellCoord::new(7, 0));
        assert!(parse_coord("3x4").is_err());
        assert!(parse_coord("3,-1").is_err());
    }

    #[test]
    fn colour_lists_parse_with_whitespace() {
        let colors = parse_colors("red, cyan,,green ");
        let names: Vec<&str> = colors.iter().map(DoorColor::as_str).collect();
        assert_eq!(names, vec!["red", "cyan", "green"]);
    }

    #[test]
    fn generator_names_resolve() {
        assert!(parse_generator("sidewinder").is_ok());
        assert!(parse_generator("wilson").is_err());
    }

    #[test]
    fn quiver_glyphs_follow_the_dominant_axis() {
        assert_eq!(quiver_glyph(Vec2::ZERO), '.');
        assert_eq!(quiver_glyph(Vec2::new(1.0, 0.2)), '>');
        assert_eq!(quiver_glyph(Vec2::new(-0.5, 0.2)), '<');
        assert_eq!(quiver_glyph(Vec2::new(0.1, -0.9)), '^');
        assert_eq!(quiver_glyph(Vec2::new(0.1, 0.9)), 'v');
    }
}
