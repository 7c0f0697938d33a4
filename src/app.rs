use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RustyRentApp {
    pub state: AppState,
}

impl RustyRentApp {
    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for RustyRentApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Bottom panel: city selector ----
        egui::TopBottomPanel::bottom("city_bar").show(ctx, |ui| {
            panels::city_selector(ui, &mut self.state);
        });

        // ---- Left side panel: pipeline settings ----
        egui::SidePanel::left("settings_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: cards and charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(view) = &self.state.view else {
                ui.centered_and_justified(|ui| {
                    ui.heading("Open a file to view listings  (File → Open…)");
                });
                return;
            };
            let colors = self.state.color_map.as_ref();

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.heading("Rental housing dashboard");
                    if view.filtered.is_empty() {
                        ui.label("No listings left after outlier filtering.");
                    }
                    panels::indicator_cards(ui, view);
                    ui.separator();

                    ui.columns(2, |cols| {
                        panels::city_pie(&mut cols[0], view, colors);
                        plot::mean_total_chart(&mut cols[1], view);
                    });
                    ui.separator();

                    ui.columns(2, |cols| {
                        plot::scatter_chart(&mut cols[0], view, colors);
                        plot::total_histogram_chart(&mut cols[1], view);
                    });
                    ui.separator();

                    ui.columns(2, |cols| {
                        plot::furniture_stack_chart(&mut cols[0], view);
                        plot::cost_per_area_chart(&mut cols[1], view);
                    });
                    ui.separator();

                    panels::city_table(ui, view);
                });
        });
    }
}
