use egui::{Color32, Context, RichText, ScrollArea, TextEdit, Ui};

use cyber_container::ExportPhase;

use crate::ui::state::{StatusKind, UiState};
use crate::ui::theme::*;

pub struct ExportAction {
    pub target_size: u32,
    pub filename: Option<String>,
}

#[derive(Default)]
pub struct UiActions {
    pub export: Option<ExportAction>,
}

/// Per-frame numbers shown in the stats box.
pub struct ViewStats {
    pub fps: f32,
    pub render_ms: f32,
    pub physical_size: (u32, u32),
    pub allocations: usize,
}

pub fn draw_side_panel(
    ctx: &Context,
    state: &mut UiState,
    stats: &ViewStats,
    phase: ExportPhase,
    busy: bool,
) -> UiActions {
    let mut actions = UiActions::default();

    egui::SidePanel::right("control_panel")
        .min_width(280.0)
        .max_width(380.0)
        .default_width(300.0)
        .frame(egui::Frame::default().fill(BG_PANEL).inner_margin(16.0))
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                ui.heading(RichText::new("CYBER CONTAINER").strong().color(ACCENT_NEON));
                ui.add_space(4.0);
                ui.label(RichText::new("Isometric render & export").color(TEXT_MUTED).size(11.0));
                ui.add_space(16.0);

                section_header(ui, "EXPORT SIZE");
                let selected_text = state
                    .selected_size()
                    .map(size_label)
                    .unwrap_or_else(|| "-".to_string());
                egui::ComboBox::from_id_salt("export_presets")
                    .selected_text(selected_text)
                    .width(ui.available_width())
                    .show_ui(ui, |ui| {
                        for (i, &size) in state.presets.iter().enumerate() {
                            if ui.selectable_label(state.selected_preset == i, size_label(size)).clicked() {
                                state.selected_preset = i;
                            }
                        }
                    });
                ui.add_space(12.0);

                section_header(ui, "FILENAME");
                ui.add(
                    TextEdit::singleline(&mut state.filename)
                        .hint_text(state.default_basename.as_str())
                        .desired_width(f32::INFINITY),
                );
                if let Some(preview) = state.preview_filename() {
                    ui.add_space(2.0);
                    ui.label(RichText::new(preview).color(TEXT_MUTED).size(11.0).italics());
                }
                ui.add_space(12.0);

                let text = export_button_label(phase, busy);
                let (fill, text_color) = if busy {
                    (BG_WIDGET, ACCENT_NEON)
                } else {
                    (ACCENT_NEON, Color32::BLACK)
                };
                let button = egui::Button::new(RichText::new(text).color(text_color))
                    .fill(fill)
                    .min_size(egui::vec2(ui.available_width(), 32.0));
                if ui.add_enabled(!busy, button).clicked() {
                    if let Some(target_size) = state.selected_size() {
                        actions.export = Some(ExportAction {
                            target_size,
                            filename: state.requested_filename(),
                        });
                    }
                }

                if let Some(status) = &state.status {
                    ui.add_space(8.0);
                    status_box(ui, &status.text, status.kind);
                }
                ui.add_space(16.0);
                ui.separator();
                ui.add_space(12.0);

                perf_controls(ui, state);
                if state.show_stats {
                    ui.add_space(12.0);
                    stats_panel(ui, stats);
                }
            });
        });

    actions
}

/// A request still sitting in the queue reports Idle; it counts as busy all the same.
fn export_button_label(phase: ExportPhase, busy: bool) -> String {
    match (busy, phase) {
        (false, _) => "Export PNG".to_string(),
        (true, ExportPhase::Idle) => "Queued...".to_string(),
        (true, phase) => format!("{phase:?}..."),
    }
}

fn size_label(size: u32) -> String {
    match size {
        7680 => format!("{size} x {size} (8K)"),
        4096 => format!("{size} x {size} (4K)"),
        _ => format!("{size} x {size}"),
    }
}

fn section_header(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).color(TEXT_MUTED).size(11.0).strong());
    ui.add_space(4.0);
}

fn status_box(ui: &mut Ui, text: &str, kind: StatusKind) {
    let (fill, stroke) = match kind {
        StatusKind::Info => (Color32::from_rgb(10, 30, 20), ACCENT_NEON),
        StatusKind::Error => (Color32::from_rgb(40, 15, 15), ACCENT_RED),
    };
    egui::Frame::default()
        .fill(fill)
        .stroke(egui::Stroke::new(1.0, stroke))
        .rounding(4.0)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.label(RichText::new(text).color(stroke).size(11.0));
        });
}

fn perf_controls(ui: &mut Ui, state: &mut UiState) {
    section_header(ui, "DISPLAY");
    ui.horizontal(|ui| {
        ui.checkbox(&mut state.vsync_enabled, "VSync");
        ui.checkbox(&mut state.show_stats, "Stats");
    });
}

fn stats_panel(ui: &mut Ui, stats: &ViewStats) {
    section_header(ui, "STATISTICS");
    egui::Frame::default()
        .fill(BG_WIDGET)
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .rounding(6.0)
        .inner_margin(12.0)
        .show(ui, |ui| {
            ui.style_mut().override_font_id = Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));

            let fps_color = if stats.fps >= 30.0 { ACCENT_NEON } else if stats.fps >= 10.0 { ACCENT_ORANGE } else { ACCENT_RED };

            egui::Grid::new("stats").num_columns(2).spacing([20.0, 4.0]).show(ui, |ui| {
                ui.label(RichText::new("FPS").color(TEXT_MUTED));
                ui.label(RichText::new(format!("{:.0}", stats.fps)).color(fps_color));
                ui.end_row();

                ui.label(RichText::new("Frame ms").color(TEXT_MUTED));
                ui.label(RichText::new(format!("{:.1}", stats.render_ms)).color(TEXT_PRIMARY));
                ui.end_row();

                ui.label(RichText::new("Target").color(TEXT_MUTED));
                ui.label(
                    RichText::new(format!("{}x{}", stats.physical_size.0, stats.physical_size.1))
                        .color(ACCENT_BLUE),
                );
                ui.end_row();

                ui.label(RichText::new("Reallocs").color(TEXT_MUTED));
                ui.label(RichText::new(format!("{}", stats.allocations)).color(TEXT_PRIMARY));
                ui.end_row();
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_export_reads_as_busy() {
        assert_eq!(export_button_label(ExportPhase::Idle, false), "Export PNG");
        assert_eq!(export_button_label(ExportPhase::Idle, true), "Queued...");
        assert_eq!(export_button_label(ExportPhase::Encoding, true), "Encoding...");
    }
}
