use anyhow::{anyhow, Context};
use clap::Parser;
use eframe::egui;
use eframe::run_native;
use log::{error, info};
use shared::cli::Args;
use shared::driver::{self, Render, Simulation};
use shared::Grid;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

const MIN_CELL_SIZE: f32 = 2.0;
const HEADING_HEIGHT: f32 = 32.0;

fn lock_grid(grid: &Mutex<Grid>) -> anyhow::Result<MutexGuard<'_, Grid>> {
    grid.lock().map_err(|_| anyhow!("grid lock poisoned"))
}

/// Hands each finished generation over to the UI thread.
struct Publisher {
    grid: Arc<Mutex<Grid>>,
    ctx: egui::Context,
}

impl Render for Publisher {
    type Error = anyhow::Error;

    fn draw(&mut self, grid: &Grid) -> anyhow::Result<()> {
        lock_grid(&self.grid)?.clone_from(grid);
        self.ctx.request_repaint();
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let params = args.params();
    let mut sim = Simulation::new(&params).context("invalid configuration")?;

    // Latest published generation, shared between the simulation thread and the UI
    let shared_grid = Arc::new(Mutex::new(sim.grid().clone()));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([args.window_width as f32, args.window_height as f32])
            .with_title("Game of Life"),
        ..Default::default()
    };

    run_native(
        "Game of Life GUI",
        options,
        Box::new(|cc| {
            let ctx = cc.egui_ctx.clone();
            let mut publisher = Publisher {
                grid: Arc::clone(&shared_grid),
                ctx: ctx.clone(),
            };

            // Background thread steps the grid at the configured frame rate
            thread::spawn(move || match driver::run(&mut sim, &mut publisher, || true) {
                Ok(Some(halt)) => {
                    info!("simulation halted after {} generations: {halt}", sim.generation());
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
                Ok(None) => {}
                Err(err) => {
                    error!("simulation stopped: {err:#}");
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            Ok(Box::new(GuiOfLife::new(cc, shared_grid)))
        }),
    )
    .map_err(|err| anyhow!("window loop failed: {err}"))
}

struct GuiOfLife {
    grid: Arc<Mutex<Grid>>,
}

impl GuiOfLife {
    fn new(_cc: &eframe::CreationContext<'_>, shared_grid: Arc<Mutex<Grid>>) -> Self {
        Self { grid: shared_grid }
    }

    fn paint_grid(&self, ui: &mut egui::Ui) {
        let grid = match lock_grid(&self.grid) {
            Ok(grid) => grid,
            Err(err) => {
                error!("cannot paint: {err:#}");
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                return;
            }
        };

        let available = ui.available_size();
        let cell_size = (available.x / grid.columns() as f32)
            .min(available.y / grid.rows() as f32)
            .max(MIN_CELL_SIZE);

        // Calculate the grid starting point
        let (rect, _) = ui.allocate_exact_size(
            egui::vec2(cell_size * grid.columns() as f32, cell_size * grid.rows() as f32),
            egui::Sense::hover(),
        );

        let painter = ui.painter();
        for cell in grid.cells() {
            // Rows run down the screen, columns across
            let pos = rect.min + egui::vec2(cell.y() as f32 * cell_size, cell.x() as f32 * cell_size);

            let color = if cell.is_alive() {
                egui::Color32::WHITE
            } else {
                egui::Color32::DARK_GRAY
            };

            painter.rect_filled(
                egui::Rect::from_min_size(pos, egui::vec2(cell_size, cell_size)),
                cell_size / 4f32,
                color,
            );
        }
    }
}

impl eframe::App for GuiOfLife {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("heading")
            .exact_height(HEADING_HEIGHT)
            .show(ctx, |ui| {
                ui.heading("Game of Life");
            });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.paint_grid(ui);
        });
    }
}
