// ui.rs - Controls, grid painter and statistics for the viewer

use eframe::egui;
use egui::{Color32, Rect, Stroke, Vec2};
use std::time::{Duration, Instant};

use mesh_life::patterns::PATTERNS;

use crate::{LifeViewer, MESHES, SIDE};

impl eframe::App for LifeViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.is_running && self.last_update.elapsed() >= self.update_interval {
            self.update_generation();
            self.last_update = Instant::now();
            ctx.request_repaint();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Game of Life on a Mesh of Ranks");

            ui.horizontal(|ui| {
                let button_text = if self.is_running { "⏸ Pause" } else { "▶ Start" };
                if ui.button(button_text).clicked() {
                    self.is_running = !self.is_running;
                    if self.is_running {
                        self.status = None;
                        self.last_update = Instant::now();
                    }
                }

                if ui.button("⏭ Step").clicked() {
                    self.is_running = false;
                    self.update_generation();
                }

                if ui.button("⏹ Clear").clicked() {
                    self.is_running = false;
                    self.clear_grid();
                }

                if ui.button("🎲 Random").clicked() {
                    self.is_running = false;
                    self.apply_random_pattern();
                }

                ui.separator();

                ui.label("Pattern:");
                egui::ComboBox::from_id_source("pattern_selector")
                    .selected_text(PATTERNS[self.selected_pattern].name)
                    .show_ui(ui, |ui| {
                        for (i, pattern) in PATTERNS.iter().enumerate() {
                            ui.selectable_value(&mut self.selected_pattern, i, pattern.name);
                        }
                    });

                if ui.button("Apply Pattern").clicked() {
                    self.is_running = false;
                    self.apply_selected_pattern();
                }

                ui.separator();

                ui.label(format!("Generation: {}", self.generation));
            });

            ui.separator();

            ui.horizontal(|ui| {
                ui.label("Speed:");
                let mut speed = 1000.0 / self.update_interval.as_millis().max(1) as f32;
                if ui.add(egui::Slider::new(&mut speed, 0.5..=60.0).suffix(" gen/sec")).changed() {
                    self.update_interval = Duration::from_millis((1000.0 / speed) as u64);
                }

                ui.separator();

                ui.label("Ranks:");
                egui::ComboBox::from_id_source("mesh_selector")
                    .selected_text(self.processes.to_string())
                    .show_ui(ui, |ui| {
                        for processes in MESHES {
                            ui.selectable_value(&mut self.processes, processes, processes.to_string());
                        }
                    });

                ui.separator();

                ui.label("Live:");
                ui.color_edit_button_srgba(&mut self.live_color);
                ui.label("Dead:");
                ui.color_edit_button_srgba(&mut self.dead_color);
            });

            ui.separator();

            ui.label("Click cells to toggle them alive/dead. The grid wraps at every edge.");
            if let Some(status) = &self.status {
                ui.colored_label(Color32::YELLOW, status.as_str());
            }

            ui.separator();

            let box_size = 15.0;
            let spacing = 0.5;
            let block_side = SIDE / (self.processes as f64).sqrt() as usize;

            let start_pos = ui.cursor().min;
            let total_size = Vec2::splat((box_size + spacing) * SIDE as f32 - spacing);

            let (response, painter) = ui.allocate_painter(total_size, egui::Sense::click());

            painter.rect_filled(
                Rect::from_min_size(start_pos, total_size),
                0.0,
                Color32::BLACK,
            );

            let mut clicked = None;
            for (row, cells) in self.grid.rows().enumerate() {
                for (col, &cell) in cells.iter().enumerate() {
                    let x = start_pos.x + col as f32 * (box_size + spacing);
                    let y = start_pos.y + row as f32 * (box_size + spacing);

                    let rect = Rect::from_min_size(
                        egui::pos2(x, y),
                        Vec2::splat(box_size),
                    );

                    let cell_color = if cell == mesh_life::ALIVE { self.live_color } else { self.dead_color };
                    painter.rect_filled(rect, 1.0, cell_color);
                    painter.rect_stroke(rect, 1.0, Stroke::new(0.2, Color32::from_gray(60)));

                    if !self.is_running && response.clicked() {
                        if let Some(pos) = response.interact_pointer_pos() {
                            if rect.contains(pos) {
                                clicked = Some((row, col));
                            }
                        }
                    }
                }
            }

            // Block boundaries, one line per rank edge.
            let stroke = Stroke::new(1.5, Color32::from_rgb(200, 120, 0));
            for k in 1..SIDE / block_side.max(1) {
                let offset = (k * block_side) as f32 * (box_size + spacing) - spacing / 2.0;
                painter.line_segment(
                    [egui::pos2(start_pos.x + offset, start_pos.y), egui::pos2(start_pos.x + offset, start_pos.y + total_size.y)],
                    stroke,
                );
                painter.line_segment(
                    [egui::pos2(start_pos.x, start_pos.y + offset), egui::pos2(start_pos.x + total_size.x, start_pos.y + offset)],
                    stroke,
                );
            }

            if let Some((row, col)) = clicked {
                self.toggle_cell(row, col);
            }

            ui.separator();

            let total = SIDE * SIDE;
            let live_cells = self.grid.live_count();
            ui.horizontal(|ui| {
                ui.label(format!("Live cells: {}", live_cells));
                ui.label(format!("Dead cells: {}", total - live_cells));
                ui.label(format!("Population: {:.1}%", (live_cells as f32 / total as f32) * 100.0));
                ui.label(format!("Block: {block_side}x{block_side}"));
            });
        });

        if self.is_running {
            ctx.request_repaint();
        }
    }
}
