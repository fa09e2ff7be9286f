use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::aggregate::AggregationPolicy;
use crate::color::instrument_colors;
use crate::data::model::{variant_label, Timing};
use crate::render::ChartLayout;
use crate::state::ViewerState;

// ---------------------------------------------------------------------------
// Left side panel – policy, layout and totals
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut ViewerState) {
    ui.heading("Chart");
    ui.separator();

    ui.strong("Aggregation");
    let current = state.policy();
    egui::ComboBox::from_id_salt("policy")
        .selected_text(current.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for policy in AggregationPolicy::ALL {
                if ui.selectable_label(current == policy, policy.to_string()).clicked() {
                    state.set_policy(policy);
                }
            }
        });

    ui.strong("Layout");
    let current = state.layout;
    egui::ComboBox::from_id_salt("layout")
        .selected_text(current.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for layout in ChartLayout::ALL {
                if ui.selectable_label(current == layout, layout.to_string()).clicked() {
                    state.set_layout(layout);
                }
            }
        });
    ui.separator();

    ui.strong("Instruments");
    let colors = instrument_colors(state.chart.instruments.len());
    for (name, color) in state.chart.instruments.iter().zip(colors) {
        ui.label(RichText::new(format!("■ {name}")).color(Color32::from(color)));
    }
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, true])
        .max_height(260.0)
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("stack_totals")
                .striped(true)
                .num_columns(3)
                .show(ui, |ui: &mut Ui| {
                    ui.strong("");
                    for timing in Timing::ALL {
                        ui.strong(timing.to_string());
                    }
                    ui.end_row();

                    for (early, late) in state.chart.early.iter().zip(&state.chart.late) {
                        ui.label(variant_label(early.variant));
                        for bar in [early, late] {
                            let text = format!("{:.1}%", bar.total());
                            if bar.total() > 100.0 {
                                ui.label(RichText::new(text).color(Color32::RED));
                            } else {
                                ui.label(text);
                            }
                        }
                        ui.end_row();
                    }
                });
        });

    egui::CollapsingHeader::new(RichText::new("Input values").strong())
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            for timing in Timing::ALL {
                ui.label(RichText::new(timing.to_string()).italics());
                for series in state.dataset.series(timing) {
                    let values: Vec<String> = series.values.iter().map(|v| format!("{v}")).collect();
                    ui.label(format!("{}: {}", series.instrument, values.join(", ")));
                }
            }
        });

    // ---- Last exported PNG ----
    if let Some(path) = &state.saved_png {
        ui.separator();
        ui.strong("Saved image");
        ui.add(
            egui::Image::new(format!("file://{}", path.display()))
                .max_width(ui.available_width())
                .max_height(160.0),
        );
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut ViewerState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Export PNG…").clicked() {
                export_dialog(ui.ctx(), state);
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(format!(
            "{} variants, {} instruments",
            state.chart.variants.len(),
            state.chart.instruments.len()
        ));

        if let Some(msg) = &state.status_message {
            ui.separator();
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                ui.visuals().text_color()
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn export_dialog(ctx: &egui::Context, state: &mut ViewerState) {
    let file = rfd::FileDialog::new()
        .set_title("Export chart")
        .set_file_name(state.policy().default_output())
        .add_filter("PNG image", &["png"])
        .save_file();

    if let Some(path) = file {
        match state.export_png(&path) {
            Ok(()) => {
                // Drop any cached texture of an earlier export to the same path.
                ctx.forget_image(&format!("file://{}", path.display()));
            }
            Err(e) => {
                log::error!("Failed to export chart: {e}");
                state.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}
