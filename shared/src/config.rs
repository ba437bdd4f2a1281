//! Startup parameters of a simulation run.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const DEFAULT_ROWS: usize = 20;
pub const DEFAULT_COLUMNS: usize = 20;
pub const DEFAULT_THRESHOLD: f64 = 0.2;
pub const DEFAULT_FPS: u32 = 20;

/// Immutable parameters, built once at startup and handed to the grid and the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    /// Grid height in cells.
    pub rows: usize,
    /// Grid width in cells.
    pub columns: usize,
    /// Seed of the pseudo-random source used for the initial grid.
    pub seed: i64,
    /// Probability in `[0, 1]` that a cell starts alive.
    pub threshold: f64,
    /// Target frame rate of the driver loop.
    pub fps: u32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            seed: clock_seed(),
            threshold: DEFAULT_THRESHOLD,
            fps: DEFAULT_FPS,
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_grid(self.rows, self.columns, self.threshold)?;
        if self.fps == 0 {
            return Err(ConfigError::InvalidFps);
        }
        Ok(())
    }

    /// Wall-clock budget of one frame.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

pub(crate) fn validate_grid(rows: usize, columns: usize, threshold: f64) -> Result<(), ConfigError> {
    if rows == 0 || columns == 0 {
        return Err(ConfigError::InvalidDimensions { rows, columns });
    }
    // NaN fails the range check too
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ConfigError::InvalidThreshold(threshold));
    }
    Ok(())
}

/// Nanoseconds since the Unix epoch, truncated to 64 bits.
pub fn clock_seed() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as i64)
        .unwrap_or_default()
}

/// Invalid configuration, reported when the grid or the driver is set up.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid dimensions must be positive, got {rows} rows x {columns} columns")]
    InvalidDimensions { rows: usize, columns: usize },
    #[error("Threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("Frame rate must be positive")]
    InvalidFps,
}
