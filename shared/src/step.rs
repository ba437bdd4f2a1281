//! Advancing the grid by one generation.

use crate::grid::CellState::{Alive, Dead};
use crate::grid::{CellState, Grid};

/// Aggregates over the grid as it stands after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    pub alive_count: usize,
    pub changed_count: usize,
}

/// Conway's rule for a single cell.
pub fn next_state(state: CellState, alive_neighbors: usize) -> CellState {
    match (state, alive_neighbors) {
        (Alive, 2..=3) => Alive, // Survives
        (Dead, 3) => Alive,      // Becomes alive
        _ => Dead,               // Dies or remains dead
    }
}

impl Grid {
    /// Advance the grid by one generation.
    ///
    /// Every next state is computed from the grid as it was before the call and
    /// collected into a separate buffer; the buffer is committed only once all
    /// cells are evaluated, so the visiting order never affects the result.
    pub fn step(&mut self) -> StepReport {
        let next: Vec<CellState> = self
            .cells()
            .map(|cell| next_state(cell.state(), self.alive_neighbors(cell.x(), cell.y())))
            .collect();

        let mut report = StepReport::default();
        for (cell, state) in self.cells.iter_mut().zip(next) {
            cell.state_changed = cell.state != state;
            cell.state = state;

            if cell.state_changed {
                report.changed_count += 1;
            }
            if state == Alive {
                report.alive_count += 1;
            }
        }
        report
    }
}

pub fn step(grid: &mut Grid) -> StepReport {
    grid.step()
}
