/*!
* A live cell dies if it has fewer than two live neighbors.
* A live cell with two or three live neighbors lives on to the next generation.
* A live cell with more than three live neighbors dies.
* A dead cell will be brought back to live if it has exactly three live neighbors.
*
* The grid is bounded: cells on an edge or a corner simply have fewer neighbors.
*/

pub mod cli;
pub mod config;
pub mod driver;
pub mod grid;
pub mod step;

pub use config::{ConfigError, SimulationParams};
pub use driver::{Halt, Render, Simulation};
pub use grid::{Cell, CellState, Grid};
pub use step::{step, StepReport};
