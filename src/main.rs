mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;
mod view;

use anyhow::Context;
use app::RustyRentApp;
use config::DashboardConfig;
use eframe::egui;
use state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = DashboardConfig::load().context("loading configuration")?;

    // Without the table there is nothing to show.
    let state = AppState::build(config).context("loading rental dataset")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Rent – Rental Housing Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(RustyRentApp::with_state(state)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {e}"))?;

    Ok(())
}
