//! The frame loop around the step engine: halt policy, pacing and the renderer seam.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, log_enabled, trace, Level};

use crate::config::{ConfigError, SimulationParams};
use crate::grid::Grid;
use crate::step::StepReport;

/// Why a simulation stopped on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// Every cell is dead.
    Extinct,
    /// No cell changed during the last step. Oscillators never get here.
    Stable,
}

impl Halt {
    pub fn from_report(report: &StepReport) -> Option<Self> {
        if report.alive_count == 0 {
            Some(Halt::Extinct)
        } else if report.changed_count == 0 {
            Some(Halt::Stable)
        } else {
            None
        }
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::Extinct => f.write_str("all cells died"),
            Halt::Stable => f.write_str("grid reached a fixed point"),
        }
    }
}

/// Outcome of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
    pub report: StepReport,
    pub halt: Option<Halt>,
}

/// Draws the current grid. Implementations get read-only access.
pub trait Render {
    type Error;

    fn draw(&mut self, grid: &Grid) -> Result<(), Self::Error>;
}

/// Owner of the grid for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct Simulation {
    grid: Grid,
    generation: u64,
    frame_interval: Duration,
}

impl Simulation {
    pub fn new(params: &SimulationParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let grid = Grid::from_params(params)?;
        info!(
            "seeded {}x{} grid with seed {} and threshold {}: {} cells alive",
            params.rows,
            params.columns,
            params.seed,
            params.threshold,
            grid.alive_count()
        );
        Ok(Self::from_grid(grid, params.frame_interval()))
    }

    pub fn from_grid(grid: Grid, frame_interval: Duration) -> Self {
        Self {
            grid,
            generation: 0,
            frame_interval,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Number of steps taken so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn advance(&mut self) -> Tick {
        let report = self.grid.step();
        self.generation += 1;
        let halt = Halt::from_report(&report);

        debug!(
            "generation {}: {} alive, {} changed",
            self.generation, report.alive_count, report.changed_count
        );
        if log_enabled!(Level::Trace) {
            trace!("generation {}:\n{}", self.generation, self.grid);
        }
        if let Some(halt) = halt {
            info!("halting after generation {}: {}", self.generation, halt);
        }

        Tick {
            generation: self.generation,
            report,
            halt,
        }
    }
}

/// Keeps frames `interval` apart. A frame that overruns its budget is followed
/// immediately by the next one; the overrun is not made up later.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    interval: Duration,
    frame_start: Instant,
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            frame_start: Instant::now(),
        }
    }

    pub fn start_frame(&mut self) {
        self.frame_start = Instant::now();
    }

    pub fn remaining(&self) -> Duration {
        self.remaining_after(self.frame_start.elapsed())
    }

    pub fn remaining_after(&self, elapsed: Duration) -> Duration {
        self.interval.saturating_sub(elapsed)
    }

    /// When the current frame's budget runs out.
    pub fn deadline(&self) -> Instant {
        self.frame_start + self.interval
    }

    pub fn wait(&self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }
}

/// Runs Step, halt check, draw and sleep until the halt policy fires or
/// `keep_running` returns false. The generation that triggers the halt is drawn.
pub fn run<R, F>(sim: &mut Simulation, renderer: &mut R, mut keep_running: F) -> Result<Option<Halt>, R::Error>
where
    R: Render,
    F: FnMut() -> bool,
{
    let mut pacer = FramePacer::new(sim.frame_interval());
    while keep_running() {
        pacer.start_frame();
        let tick = sim.advance();
        renderer.draw(sim.grid())?;
        if tick.halt.is_some() {
            return Ok(tick.halt);
        }
        pacer.wait();
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<String>,
    }

    impl Render for Recorder {
        type Error = std::convert::Infallible;

        fn draw(&mut self, grid: &Grid) -> Result<(), Self::Error> {
            self.frames.push(grid.to_string());
            Ok(())
        }
    }

    struct Broken;

    impl Render for Broken {
        type Error = &'static str;

        fn draw(&mut self, _grid: &Grid) -> Result<(), Self::Error> {
            Err("surface lost")
        }
    }

    fn simulation(text: &str) -> Simulation {
        Simulation::from_grid(text.parse().unwrap(), Duration::ZERO)
    }

    #[test]
    fn test_halt_policy() {
        let extinct = StepReport { alive_count: 0, changed_count: 3 };
        let still = StepReport { alive_count: 0, changed_count: 0 };
        let stable = StepReport { alive_count: 4, changed_count: 0 };
        let running = StepReport { alive_count: 3, changed_count: 4 };

        assert_eq!(Halt::from_report(&extinct), Some(Halt::Extinct));
        assert_eq!(Halt::from_report(&still), Some(Halt::Extinct));
        assert_eq!(Halt::from_report(&stable), Some(Halt::Stable));
        assert_eq!(Halt::from_report(&running), None);
    }

    #[test]
    fn test_new_rejects_invalid_params() {
        let params = SimulationParams {
            fps: 0,
            ..SimulationParams::default()
        };
        assert_eq!(Simulation::new(&params).unwrap_err(), ConfigError::InvalidFps);
    }

    #[test]
    fn test_new_seeds_from_params() {
        let params = SimulationParams {
            rows: 10,
            columns: 12,
            seed: 77,
            threshold: 0.3,
            fps: 30,
        };
        let sim = Simulation::new(&params).unwrap();
        assert_eq!(sim.grid(), &Grid::create(10, 12, 77, 0.3).unwrap());
        assert_eq!(sim.generation(), 0);
        assert_eq!(sim.frame_interval(), params.frame_interval());
    }

    #[test]
    fn test_advance_counts_generations() {
        let mut sim = simulation("...\n###\n...");
        let tick = sim.advance();
        assert_eq!(tick.generation, 1);
        assert_eq!(tick.report, StepReport { alive_count: 3, changed_count: 4 });
        assert_eq!(tick.halt, None);
        assert_eq!(sim.advance().generation, 2);
    }

    #[test]
    fn test_run_stops_when_extinct() {
        let mut sim = simulation("....\n.#..\n....");
        let mut recorder = Recorder::default();
        let halt = run(&mut sim, &mut recorder, || true).unwrap();
        assert_eq!(halt, Some(Halt::Extinct));
        assert_eq!(recorder.frames, vec!["....\n....\n....\n".to_string()]);
    }

    #[test]
    fn test_run_stops_on_still_life() {
        let mut sim = simulation("##.\n#..\n...");
        let mut recorder = Recorder::default();
        let halt = run(&mut sim, &mut recorder, || true).unwrap();
        assert_eq!(halt, Some(Halt::Stable));
        // The tromino becomes a block, then the block holds still.
        assert_eq!(recorder.frames.len(), 2);
        assert_eq!(recorder.frames[1], "##.\n##.\n...\n");
        assert_eq!(sim.generation(), 2);
    }

    #[test]
    fn test_run_oscillator_only_stops_externally() {
        let mut sim = simulation(".....\n.....\n.###.\n.....\n.....");
        let mut recorder = Recorder::default();
        let mut budget = 25;
        let halt = run(&mut sim, &mut recorder, || {
            budget -= 1;
            budget >= 0
        })
        .unwrap();
        assert_eq!(halt, None);
        assert_eq!(recorder.frames.len(), 25);
        assert_ne!(recorder.frames[0], recorder.frames[1]);
        assert_eq!(recorder.frames[0], recorder.frames[2]);
    }

    #[test]
    fn test_run_propagates_render_errors() {
        let mut sim = simulation("...\n###\n...");
        assert_eq!(run(&mut sim, &mut Broken, || true), Err("surface lost"));
        assert_eq!(sim.generation(), 1);
    }

    #[test]
    fn test_pacer_drops_overrun() {
        let pacer = FramePacer::new(Duration::from_millis(50));
        assert_eq!(pacer.remaining_after(Duration::from_millis(20)), Duration::from_millis(30));
        assert_eq!(pacer.remaining_after(Duration::from_millis(50)), Duration::ZERO);
        assert_eq!(pacer.remaining_after(Duration::from_millis(80)), Duration::ZERO);
        assert!(pacer.remaining() <= Duration::from_millis(50));
    }

    #[test]
    fn test_pacer_deadline() {
        let mut pacer = FramePacer::new(Duration::from_millis(10));
        pacer.start_frame();
        let now = Instant::now();
        assert!(pacer.deadline() <= now + Duration::from_millis(10));
        assert!(pacer.deadline().duration_since(now) <= Duration::from_millis(10));
    }
}
