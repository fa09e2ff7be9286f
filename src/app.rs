use eframe::egui;

use crate::state::ViewerState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct VariantViewerApp {
    pub state: ViewerState,
}

impl VariantViewerApp {
    pub fn new(state: ViewerState) -> Self {
        Self { state }
    }
}

impl eframe::App for VariantViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        egui::SidePanel::left("chart_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            plot::variant_chart(ui, &self.state);
        });
    }
}

/// Blocks until the window is closed.
pub fn launch(state: ViewerState) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([700.0, 400.0]),
        ..Default::default()
    };

    let title = state.title();
    eframe::run_native(
        &title,
        options,
        Box::new(|cc| {
            // PNG thumbnails of exported charts
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(VariantViewerApp::new(state)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}
