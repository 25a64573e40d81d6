use egui::Context;

use crate::controller::FrameLoopContext;
use crate::model::{ColourMode, DrawMode, GridCell};

const CONTROLS: [&str; 7] = [
    "Mouse - Aim (click to capture)",
    "W / S - Move along aim",
    "A / D - Strafe",
    "Space / Shift - Up / Down",
    "H - Cycle terrain height",
    "M - Switch colours",
    "N - Fill / Lines / Points",
];

/// What the HUD needs to know about the backend
#[derive(Clone, Copy, Debug)]
pub struct BackendInfo {
    /// whether the current draw mode is rendered as chosen or falls back to fill
    pub draw_mode_supported: bool,
}

/// Build the complete UI and return egui output
pub fn build_ui(
    egui_ctx: &Context,
    raw_input: egui::RawInput,
    frame: &mut FrameLoopContext,
    backend: BackendInfo,
) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        draw_crosshair(ctx);
        draw_debug_window(ctx, frame, backend);
        draw_settings_window(ctx, frame);
    })
}

fn draw_crosshair(ctx: &Context) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::TOP, egui::Id::new("crosshair")));
    let center = ctx.available_rect().center();
    let size = 10.0;
    let stroke = egui::Stroke::new(1.0, egui::Color32::WHITE);
    painter.line_segment(
        [egui::Pos2::new(center.x - size, center.y), egui::Pos2::new(center.x + size, center.y)],
        stroke,
    );
    painter.line_segment(
        [egui::Pos2::new(center.x, center.y - size), egui::Pos2::new(center.x, center.y + size)],
        stroke,
    );
}

fn colour_mode_name(mode: ColourMode) -> &'static str {
    match mode {
        ColourMode::Natural => "natural",
        ColourMode::Contour => "contour",
    }
}

fn draw_mode_name(mode: DrawMode) -> &'static str {
    match mode {
        DrawMode::Fill => "fill",
        DrawMode::Lines => "lines",
        DrawMode::Points => "points",
    }
}

fn small(ui: &mut egui::Ui, text: impl Into<String>) {
    ui.label(egui::RichText::new(text).small());
}

fn draw_debug_window(ctx: &Context, frame: &FrameLoopContext, backend: BackendInfo) {
    let pos = frame.camera.position;
    let window = frame.composer.window();
    let center = window.cell(GridCell::CENTER);
    let modes = frame.composer.modes();
    let stats = frame.last_stats;

    egui::Window::new("Block World")
        .default_pos([8.0, 8.0])
        .show(ctx, |ui| {
            small(ui, format!("FPS: {:.0}", frame.fps.fps()));
            small(ui, format!("Pos: x: {:.1} y: {:.1} z: {:.1}", pos.x, pos.y, pos.z));
            small(ui, format!("Window center: x: {:.0} z: {:.0}", center.x, center.z));
            small(
                ui,
                format!(
                    "Angles: {:.1} / {:.1}",
                    frame.camera.horizontal.to_degrees(),
                    frame.camera.vertical.to_degrees()
                ),
            );
            ui.separator();
            small(ui, format!("Height scale: {}", modes.height_scale));
            small(ui, format!("Colours: {}", colour_mode_name(modes.colour_mode)));
            if backend.draw_mode_supported {
                small(ui, format!("Draw mode: {}", draw_mode_name(modes.draw_mode)));
            } else {
                small(ui, format!("Draw mode: {} (unsupported, drawing fill)", draw_mode_name(modes.draw_mode)));
            }
            ui.separator();
            small(
                ui,
                format!(
                    "Chunks: {} built, {} cached{}",
                    stats.chunks_built,
                    stats.cache_hits,
                    if frame.composer.is_caching() { "" } else { " (cache off)" }
                ),
            );
            small(ui, format!("Voxels: {}  Trees: {}", stats.instances, stats.trees));
            ui.separator();
            small(ui, "Controls:");
            for line in CONTROLS {
                small(ui, line);
            }
            if frame.input_state.pointer_locked {
                small(ui, "Esc - Release mouse");
            } else {
                small(ui, "Esc - Quit");
            }
        });
}

fn draw_settings_window(ctx: &Context, frame: &mut FrameLoopContext) {
    let width = ctx.screen_rect().width();
    egui::Window::new("Settings")
        .default_pos([width - 150.0, 8.0])
        .default_size([140.0, 100.0])
        .show(ctx, |ui| {
            let mut fov_deg = frame.projection.fov_y.to_degrees().clamp(30.0, 120.0);
            small(ui, "FOV");
            if ui.add(egui::Slider::new(&mut fov_deg, 30.0..=120.0).step_by(5.0)).changed() {
                frame.projection.fov_y = fov_deg.to_radians();
            }

            let mut speed = frame.camera_controller.move_speed;
            small(ui, "Speed");
            if ui.add(egui::Slider::new(&mut speed, 1.0..=50.0)).changed() {
                frame.camera_controller.move_speed = speed;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;

    #[test]
    fn hud_builds_without_a_window() {
        let ctx = Context::default();
        let mut frame = FrameLoopContext::new(&WorldConfig::default(), 800, 600);
        let raw_input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(800.0, 600.0))),
            ..Default::default()
        };
        let output = build_ui(&ctx, raw_input, &mut frame, BackendInfo { draw_mode_supported: false });
        assert!(!output.shapes.is_empty());
    }
}
