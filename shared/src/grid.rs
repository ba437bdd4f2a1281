//! Cells, the bounded grid that owns them, and the neighbor relation.

use std::fmt;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{validate_grid, ConfigError, SimulationParams};
use crate::grid::CellState::{Alive, Dead};

/// Relative positions of the eight cells around a center cell.
const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellState {
    #[default]
    Dead,
    Alive,
}

/// One grid position. `x` is the row, `y` the column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) state: CellState,
    pub(crate) state_changed: bool,
}

impl Cell {
    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn state(&self) -> CellState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state == Alive
    }

    /// Whether the last step flipped this cell. False for a freshly created grid.
    pub fn state_changed(&self) -> bool {
        self.state_changed
    }
}

/// Fixed-size `rows` x `columns` grid, stored row-major. Positions outside it do not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    columns: usize,
    pub(crate) cells: Vec<Cell>,
}

impl Grid {
    /// Seeds a new grid: one draw in `[0, 1)` per cell, row by row, and the cell
    /// starts alive when the draw is below `threshold`.
    ///
    /// The same arguments always produce the same grid.
    pub fn create(rows: usize, columns: usize, seed: i64, threshold: f64) -> Result<Self, ConfigError> {
        validate_grid(rows, columns, threshold)?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
        Ok(Self::from_fn(rows, columns, |_, _| {
            if rng.random::<f64>() < threshold {
                Alive
            } else {
                Dead
            }
        }))
    }

    pub fn from_params(params: &SimulationParams) -> Result<Self, ConfigError> {
        Self::create(params.rows, params.columns, params.seed, params.threshold)
    }

    fn from_fn<F>(rows: usize, columns: usize, mut state_at: F) -> Self
    where
        F: FnMut(usize, usize) -> CellState,
    {
        let mut cells = Vec::with_capacity(rows * columns);
        for x in 0..rows {
            for y in 0..columns {
                cells.push(Cell {
                    x,
                    y,
                    state: state_at(x, y),
                    state_changed: false,
                });
            }
        }
        Self { rows, columns, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// All cells, row by row.
    pub fn cells(&self) -> impl ExactSizeIterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Cell> {
        self.index(x, y).map(|index| &self.cells[index])
    }

    /// Panics if `(x, y)` lies outside the grid.
    pub fn at(&self, x: usize, y: usize) -> &Cell {
        self.get(x, y)
            .unwrap_or_else(|| panic!("Cell {x}, {y} out of bounds for {}x{} grid", self.rows, self.columns))
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_alive()).count()
    }

    /// The up to eight positions around `(x, y)` that lie inside the grid. There is no wraparound.
    pub fn neighbor_positions(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        NEIGHBOR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
            let nx = x.checked_add_signed(dx)?;
            let ny = y.checked_add_signed(dy)?;
            (nx < self.rows && ny < self.columns).then_some((nx, ny))
        })
    }

    pub fn neighbors(&self, x: usize, y: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.neighbor_positions(x, y).map(move |(nx, ny)| self.at(nx, ny))
    }

    pub(crate) fn alive_neighbors(&self, x: usize, y: usize) -> usize {
        self.neighbors(x, y).filter(|cell| cell.is_alive()).count()
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.rows && y < self.columns {
            Some(x * self.columns + y)
        } else {
            None
        }
    }
}

/// Renders one line per row, `#` for alive and `.` for dead.
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.columns) {
            for cell in row {
                f.write_str(if cell.is_alive() { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl FromStr for Grid {
    type Err = ParseGridError;

    /// Parses the text form written by `Display`. `O` is accepted as alive too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines: Vec<&str> = s.lines().map(str::trim).filter(|line| !line.is_empty()).collect();
        let columns = lines
            .first()
            .map(|line| line.chars().count())
            .ok_or(ParseGridError::Empty)?;

        let mut states = Vec::with_capacity(lines.len() * columns);
        for (row, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != columns {
                return Err(ParseGridError::Ragged {
                    row,
                    expected: columns,
                    found,
                });
            }
            for (column, ch) in line.chars().enumerate() {
                states.push(match ch {
                    '#' | 'O' => Alive,
                    '.' => Dead,
                    other => return Err(ParseGridError::UnexpectedChar { ch: other, row, column }),
                });
            }
        }

        Ok(Self::from_fn(lines.len(), columns, |x, y| states[x * columns + y]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseGridError {
    #[error("Grid text contains no rows")]
    Empty,
    #[error("Row {row} has {found} cells, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },
    #[error("Unexpected character {ch:?} at row {row}, column {column}")]
    UnexpectedChar { ch: char, row: usize, column: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states(grid: &Grid) -> Vec<CellState> {
        grid.cells().map(Cell::state).collect()
    }

    #[test]
    fn test_create_is_deterministic() {
        let a = Grid::create(30, 40, 1234, 0.35).unwrap();
        let b = Grid::create(30, 40, 1234, 0.35).unwrap();
        assert_eq!(states(&a), states(&b));
    }

    #[test]
    fn test_create_depends_on_seed() {
        let a = Grid::create(30, 40, 1, 0.5).unwrap();
        let b = Grid::create(30, 40, 2, 0.5).unwrap();
        assert_ne!(states(&a), states(&b));
    }

    #[test]
    fn test_negative_seed_is_accepted() {
        let a = Grid::create(8, 8, -42, 0.5).unwrap();
        let b = Grid::create(8, 8, -42, 0.5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_threshold_bounds() {
        for seed in [0, 17, i64::MAX, i64::MIN] {
            let empty = Grid::create(12, 9, seed, 0.0).unwrap();
            assert_eq!(empty.alive_count(), 0);

            let full = Grid::create(12, 9, seed, 1.0).unwrap();
            assert_eq!(full.alive_count(), 12 * 9);
        }
    }

    #[test]
    fn test_create_rejects_invalid_configuration() {
        assert!(matches!(
            Grid::create(0, 5, 1, 0.5),
            Err(ConfigError::InvalidDimensions { rows: 0, columns: 5 })
        ));
        assert!(matches!(Grid::create(5, 0, 1, 0.5), Err(ConfigError::InvalidDimensions { .. })));
        assert!(matches!(Grid::create(5, 5, 1, 1.5), Err(ConfigError::InvalidThreshold(_))));
        assert!(matches!(Grid::create(5, 5, 1, f64::NAN), Err(ConfigError::InvalidThreshold(_))));
    }

    #[test]
    fn test_coordinates_are_unique_and_in_bounds() {
        let grid = Grid::create(4, 7, 3, 0.5).unwrap();
        assert_eq!(grid.cells().len(), 28);
        for (index, cell) in grid.cells().enumerate() {
            assert_eq!((cell.x(), cell.y()), (index / 7, index % 7));
            assert!(!cell.state_changed());
            assert_eq!(grid.at(cell.x(), cell.y()), cell);
        }
        assert!(grid.get(4, 0).is_none());
        assert!(grid.get(0, 7).is_none());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_at_out_of_bounds_panics() {
        let grid = Grid::create(3, 3, 0, 0.5).unwrap();
        grid.at(3, 0);
    }

    #[test]
    fn test_corner_has_three_neighbors() {
        let grid = Grid::create(5, 5, 0, 0.0).unwrap();
        let mut positions: Vec<_> = grid.neighbor_positions(0, 0).collect();
        positions.sort();
        assert_eq!(positions, vec![(0, 1), (1, 0), (1, 1)]);
        assert_eq!(grid.neighbors(4, 4).count(), 3);
        assert_eq!(grid.neighbors(0, 4).count(), 3);
        assert_eq!(grid.neighbors(4, 0).count(), 3);
    }

    #[test]
    fn test_edge_has_five_neighbors() {
        let grid = Grid::create(5, 5, 0, 0.0).unwrap();
        assert_eq!(grid.neighbors(0, 2).count(), 5);
        assert_eq!(grid.neighbors(2, 0).count(), 5);
        assert_eq!(grid.neighbors(4, 2).count(), 5);
        assert_eq!(grid.neighbors(2, 4).count(), 5);
    }

    #[test]
    fn test_interior_has_eight_neighbors() {
        let grid = Grid::create(5, 5, 0, 0.0).unwrap();
        let positions: Vec<_> = grid.neighbor_positions(2, 2).collect();
        assert_eq!(positions.len(), 8);
        assert!(!positions.contains(&(2, 2)));
    }

    #[test]
    fn test_single_cell_grid_has_no_neighbors() {
        let grid = Grid::create(1, 1, 0, 1.0).unwrap();
        assert_eq!(grid.neighbors(0, 0).count(), 0);
    }

    #[test]
    fn test_alive_neighbors_counts_only_live_cells() {
        let grid: Grid = "
            #.#
            .#.
            ##.
        "
        .parse()
        .unwrap();
        assert_eq!(grid.alive_neighbors(1, 1), 4);
        assert_eq!(grid.alive_neighbors(0, 0), 1);
        assert_eq!(grid.alive_neighbors(2, 2), 2);
    }

    #[test]
    fn test_parse_and_display() {
        let grid: Grid = "
            .#..
            O..#
        "
        .parse()
        .unwrap();
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.columns(), 4);
        assert!(grid.at(0, 1).is_alive());
        assert!(grid.at(1, 0).is_alive());
        assert!(!grid.at(1, 1).is_alive());
        assert_eq!(grid.to_string(), ".#..\n#..#\n");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Grid>(), Err(ParseGridError::Empty));
        assert_eq!(
            "##\n#".parse::<Grid>(),
            Err(ParseGridError::Ragged {
                row: 1,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            "#x".parse::<Grid>(),
            Err(ParseGridError::UnexpectedChar { ch: 'x', row: 0, column: 1 })
        );
    }
}
