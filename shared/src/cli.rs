//! Command-line flags shared by the frontends.

use clap::Parser;

use crate::config::{clock_seed, SimulationParams, DEFAULT_COLUMNS, DEFAULT_FPS, DEFAULT_ROWS, DEFAULT_THRESHOLD};

pub const DEFAULT_WINDOW_WIDTH: u32 = 500;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 500;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Conway's Game of Life", long_about = None)]
pub struct Args {
    /// Sets the number of rows.
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    pub rows: usize,

    /// Sets the number of columns.
    #[arg(long, default_value_t = DEFAULT_COLUMNS)]
    pub columns: usize,

    /// Sets the starting seed of the game, used to randomize the initial state.
    /// Defaults to the current time.
    #[arg(long, allow_negative_numbers = true)]
    pub seed: Option<i64>,

    /// A percentage between 0 and 1 used in conjunction with the seed to determine
    /// if a cell starts alive. For example, 0.15 means each cell has a 15% chance of starting alive.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Sets the frames-per-second, used to set the speed of the simulation.
    #[arg(long, default_value_t = DEFAULT_FPS)]
    pub fps: u32,

    /// Initial window width in pixels.
    #[arg(long, default_value_t = DEFAULT_WINDOW_WIDTH)]
    pub window_width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value_t = DEFAULT_WINDOW_HEIGHT)]
    pub window_height: u32,
}

impl Args {
    /// Unvalidated parameters; the seed falls back to the clock when not given.
    pub fn params(&self) -> SimulationParams {
        SimulationParams {
            rows: self.rows,
            columns: self.columns,
            seed: self.seed.unwrap_or_else(clock_seed),
            threshold: self.threshold,
            fps: self.fps,
        }
    }
}
