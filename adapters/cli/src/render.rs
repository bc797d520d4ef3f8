//! Text rendering of the cardinal wall topology.
//!
//! Each cell prints as a 4x2 character block: `+` posts, `---`/`|` walls,
//! `=`/`:` doors, and a centre glyph for start (`S`), end (`E`), and keys
//! (`k`). Diagonal passages have no textual representation; the snapshot
//! remains the authoritative transport format.

use maze_nav_core::Direction;
use maze_nav_grid::Maze;

pub(crate) fn render_maze(maze: &Maze) -> String {
    let mut out = String::new();

    for y in 0..maze.height() {
        // Northern edge of the row.
        for x in 0..maze.width() {
            let coord = maze_nav_core::CellCoord::new(x, y);
            let cell = maze.cell(coord).expect("coordinate in bounds");
            out.push('+');
            if edge_has_door(maze, coord, Direction::North) {
                out.push_str(" = ");
            } else if cell.has_wall(Direction::North) {
                out.push_str("---");
            } else {
                out.push_str("   ");
            }
        }
        out.push_str("+\n");

        // Cell bodies with their western edges.
        for x in 0..maze.width() {
            let coord = maze_nav_core::CellCoord::new(x, y);
            let cell = maze.cell(coord).expect("coordinate in bounds");
            if edge_has_door(maze, coord, Direction::West) {
                out.push(':');
            } else if cell.has_wall(Direction::West) {
                out.push('|');
            } else {
                out.push(' ');
            }
            out.push(' ');
            out.push(cell_glyph(maze, x, y));
            out.push(' ');
        }
        out.push_str("|\n");
    }

    // Southern border.
    for _ in 0..maze.width() {
        out.push_str("+---");
    }
    out.push_str("+\n");
    out
}

/// Doors may be recorded on either side of a shared edge.
fn edge_has_door(maze: &Maze, coord: maze_nav_core::CellCoord, direction: Direction) -> bool {
    let here = maze
        .cell(coord)
        .map_or(false, |cell| cell.door(direction).is_some());
    let there = maze
        .neighbor(coord, direction)
        .and_then(|next| maze.cell(next))
        .map_or(false, |cell| cell.door(direction.opposite()).is_some());
    here || there
}

fn cell_glyph(maze: &Maze, x: u32, y: u32) -> char {
    let cell = maze
        .cell(maze_nav_core::CellCoord::new(x, y))
        .expect("coordinate in bounds");
    if cell.is_start() {
        'S'
    } else if cell.is_end() {
        'E'
    } else if cell.holds_keys() {
        'k'
    } else {
        ' '
    }
}

#[cfg(test)]
mod tests {
    use super::render_maze;
    use maze_nav_core::CellCoord;
    use maze_nav_grid::Maze;

    #[test]
    fn renders_walls_start_and_end() {
        let mut maze = Maze::new(2, 1, 0, false).expect("grid");
        assert!(maze.connect(CellCoord::new(0, 0), CellCoord::new(1, 0)));

        let rendered = render_maze(&maze);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "+---+---+");
        assert_eq!(lines[1], "| S   E |");
        assert_eq!(lines[2], "+---+---+");
    }

    #[test]
    fn renders_doors_on_open_passages() {
        let mut maze = Maze::new(2, 1, 0, false).expect("grid");
        assert!(maze.connect(CellCoord::new(0, 0), CellCoord::new(1, 0)));
        assert!(maze.set_door(
            CellCoord::new(0, 0),
            maze_nav_core::Direction::East,
            maze_nav_core::DoorColor::new("red")
        ));

        let rendered = render_maze(&maze);
        let lines: Vec<&str> = rendered.lines().collect();
        // The door is recorded on the western cell's east side and shows
        // on the shared edge.
        assert_eq!(lines[1], "| S : E |");
    }
}
