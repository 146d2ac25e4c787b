// main.rs - Interactive viewer that steps the grid through the rank mesh

use eframe::egui;
use egui::Color32;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use mesh_life::patterns::{self, PATTERNS};
use mesh_life::{Grid, RunConfig, Seed, Simulation};
use tracing::warn;

mod ui;

/// Side of the displayed torus; divisible by every mesh in `MESHES`.
pub const SIDE: usize = 48;
pub const MESHES: [usize; 4] = [1, 4, 9, 16];
const HISTORY: usize = 10;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let app = LifeViewer::new()?;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 950.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Mesh Game of Life",
        options,
        Box::new(|_cc| Box::new(app)),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}

pub struct LifeViewer {
    pub grid: Grid,
    pub is_running: bool,
    pub last_update: Instant,
    pub update_interval: Duration,
    pub generation: u32,
    pub live_color: Color32,
    pub dead_color: Color32,
    pub selected_pattern: usize,
    pub processes: usize,
    /// Set when a step fails or a cycle stops the run.
    pub status: Option<String>,

    runtime: tokio::runtime::Runtime,

    grid_history: [u64; HISTORY],
    history_count: usize,
}

impl LifeViewer {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            grid: Grid::new(SIDE),
            is_running: false,
            last_update: Instant::now(),
            update_interval: Duration::from_millis(200),
            generation: 0,
            live_color: Color32::from_rgb(0, 200, 0),
            dead_color: Color32::from_rgb(40, 40, 40),
            selected_pattern: 0,
            processes: 4,
            status: None,
            runtime: tokio::runtime::Runtime::new()?,
            grid_history: [0; HISTORY],
            history_count: 0,
        })
    }

    /// One update, run across `processes` ranks.
    pub fn update_generation(&mut self) {
        let config = RunConfig {
            grid_side: SIDE,
            generations: 2,
            processes: self.processes,
            ..RunConfig::default()
        };
        let stepped = Simulation::new(config)
            .map_err(mesh_life::Error::from)
            .and_then(|sim| self.runtime.block_on(sim.run(Seed::Grid(self.grid.clone()), None)));

        match stepped {
            Ok(report) => {
                self.grid = report.grid;
                self.generation += 1;
                if self.check_for_cycle() {
                    self.is_running = false;
                    self.status = Some(format!("Repeating pattern at generation {}", self.generation));
                }
            }
            Err(err) => {
                warn!(%err, "step failed");
                self.is_running = false;
                self.status = Some(format!("Step failed: {err}"));
            }
        }
    }

    fn hash_grid(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.grid.hash(&mut hasher);
        hasher.finish()
    }

    fn check_for_cycle(&mut self) -> bool {
        let current_hash = self.hash_grid();
        if self.grid_history[..self.history_count.min(HISTORY)].contains(&current_hash) {
            return true;
        }
        self.grid_history[self.history_count % HISTORY] = current_hash;
        self.history_count += 1;
        false
    }

    fn reset_history(&mut self) {
        self.generation = 0;
        self.grid_history = [0; HISTORY];
        self.history_count = 0;
        self.status = None;
    }

    pub fn clear_grid(&mut self) {
        self.grid.clear();
        self.reset_history();
    }

    pub fn apply_selected_pattern(&mut self) {
        if let Some(pattern) = PATTERNS.get(self.selected_pattern) {
            self.grid = patterns::apply_pattern(SIDE, pattern);
            self.reset_history();
        }
    }

    pub fn apply_random_pattern(&mut self) {
        self.grid = patterns::random_grid(SIDE, rand::random(), 0.3);
        self.reset_history();
    }

    pub fn toggle_cell(&mut self, row: usize, col: usize) {
        if row < SIDE && col < SIDE {
            self.grid.toggle(row, col);
        }
    }
}
