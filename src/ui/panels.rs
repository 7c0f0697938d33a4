use std::f32::consts::TAU;

use eframe::egui::{self, Color32, RichText, ScrollArea, Sense, Shape, Stroke, Ui, Vec2};
use egui_extras::{Column, TableBuilder};

use crate::color::{threshold_color, ColorMap};
use crate::data::aggregate::{CategoryCount, ThresholdPolicy};
use crate::data::model::{Animal, Furniture, NumericField};
use crate::data::stats::round2;
use crate::state::AppState;
use crate::view::DashboardView;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(view) = &state.view {
            ui.label(format!(
                "{} listings loaded, {} after outlier filtering",
                view.raw_count,
                view.filtered.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – pipeline settings
// ---------------------------------------------------------------------------

/// Outlier passes and threshold policy. Any change rebuilds the view.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Settings");
    ui.separator();

    ui.strong("Outlier filter");
    ui.label(format!("Quartile fences × {}", state.config.outliers.multiplier));
    for field in [NumericField::Area, NumericField::Total] {
        let mut enabled = state.config.outliers.fields.contains(&field);
        if ui.checkbox(&mut enabled, field.column_name()).changed() {
            state.toggle_outlier_field(field);
        }
    }

    if let Some(view) = &state.view {
        for b in &view.bounds {
            ui.small(format!(
                "{}: [{:.1}, {:.1}]",
                b.field.column_name(),
                b.lower,
                b.upper
            ));
        }
        ui.small(format!("{} listings removed", view.removed_count()));
    }

    ui.add_space(8.0);
    ui.strong("Scatter colouring");
    let mut policy = state.config.scatter_policy;
    for option in [ThresholdPolicy::GlobalMean, ThresholdPolicy::MeanOfMeans] {
        ui.radio_value(&mut policy, option, option.label());
    }
    state.set_scatter_policy(policy);

    ui.add_space(8.0);
    ui.strong("Source");
    ui.small(state.config.data_path.display().to_string());
}

// ---------------------------------------------------------------------------
// Bottom panel – city selector
// ---------------------------------------------------------------------------

pub fn city_selector(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label("City");
        let current = state.city_selector.selected.clone().unwrap_or_default();
        let mut picked = None;
        egui::ComboBox::from_id_salt("city_selector")
            .selected_text(&current)
            .show_ui(ui, |ui: &mut Ui| {
                for city in &state.city_selector.options {
                    if ui.selectable_label(current == *city, city).clicked() {
                        picked = Some(city.clone());
                    }
                }
            });
        if let Some(city) = picked {
            state.city_selector.select(&city);
        }
    });
}

// ---------------------------------------------------------------------------
// Indicator cards
// ---------------------------------------------------------------------------

fn card(ui: &mut Ui, title: &str, value: String) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.set_min_width(150.0);
        ui.vertical(|ui: &mut Ui| {
            ui.label(RichText::new(title).small());
            ui.label(RichText::new(value).heading().strong());
        });
    });
}

fn money(value: Option<f64>) -> String {
    value.map_or_else(|| "–".to_string(), |v| format!("R$ {:.2}", round2(v)))
}

fn share(counts: &[CategoryCount], key: &str) -> String {
    counts
        .iter()
        .find(|c| c.key == key)
        .map_or_else(|| "–".to_string(), |c| format!("{:.1}%", c.percent))
}

pub fn indicator_cards(ui: &mut Ui, view: &DashboardView) {
    let s = &view.summary;
    ui.horizontal_wrapped(|ui: &mut Ui| {
        card(ui, "Listings", s.record_count.to_string());
        card(ui, "Average total rent", money(s.mean_total));
        card(ui, "Average rent amount", money(s.mean_rent));
        card(
            ui,
            "Average area",
            s.mean_area
                .map_or_else(|| "–".to_string(), |a| format!("{:.1} m²", a)),
        );
        card(ui, "Cost per m² (Σ total / Σ area)", money(s.cost_per_area));
        card(ui, "Furnished", share(&view.furniture_counts, Furniture::Furnished.label()));
        card(ui, "Accept pets", share(&view.animal_counts, &Animal::Accepted.to_string()));
    });
}

// ---------------------------------------------------------------------------
// Pie chart of listings per city
// ---------------------------------------------------------------------------

/// Slices are drawn as triangle fans so slices wider than half a turn stay convex.
pub fn city_pie(ui: &mut Ui, view: &DashboardView, colors: Option<&ColorMap>) {
    ui.strong("Listings per city");
    if view.city_counts.is_empty() {
        ui.label("No data");
        return;
    }

    ui.horizontal(|ui: &mut Ui| {
        let size = 200.0;
        let (rect, response) = ui.allocate_exact_size(Vec2::splat(size), Sense::hover());
        let painter = ui.painter_at(rect);
        let center = rect.center();
        let radius = size / 2.0 - 4.0;

        let mut start = -TAU / 4.0;
        let mut hovered = None;
        for c in &view.city_counts {
            let sweep = (c.percent / 100.0) as f32 * TAU;
            let color = colors.map_or(Color32::LIGHT_BLUE, |m| m.color_for(&c.key));
            let steps = ((sweep / TAU) * 64.0).ceil().max(1.0) as usize;
            for i in 0..steps {
                let a0 = start + sweep * i as f32 / steps as f32;
                let a1 = start + sweep * (i + 1) as f32 / steps as f32;
                let p0 = center + Vec2::angled(a0) * radius;
                let p1 = center + Vec2::angled(a1) * radius;
                painter.add(Shape::convex_polygon(vec![center, p0, p1], color, Stroke::NONE));
            }

            if let Some(pos) = response.hover_pos() {
                let d = pos - center;
                if d.length() <= radius {
                    let angle = d.y.atan2(d.x);
                    let rel = (angle - start).rem_euclid(TAU);
                    if rel < sweep {
                        hovered = Some(c);
                    }
                }
            }
            start += sweep;
        }

        if let Some(c) = hovered {
            response.on_hover_text(format!("{}: {} ({:.1}%)", c.key, c.count, c.percent));
        }

        ui.vertical(|ui: &mut Ui| {
            for c in &view.city_counts {
                let color = colors.map_or(Color32::LIGHT_BLUE, |m| m.color_for(&c.key));
                ui.label(
                    RichText::new(format!("■ {}  {} ({:.1}%)", c.key, c.count, c.percent))
                        .color(color),
                );
            }
        });
    });
}

// ---------------------------------------------------------------------------
// City table
// ---------------------------------------------------------------------------

pub fn city_table(ui: &mut Ui, view: &DashboardView) {
    ui.strong("Per-city summary");
    let classes = view.city_cost_per_area_classes.as_ref();

    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::auto().at_least(120.0))
            .columns(Column::auto().at_least(90.0), 5)
            .header(20.0, |mut header| {
                for title in [
                    "City",
                    "Listings",
                    "Avg total (R$)",
                    "Avg area (m²)",
                    "R$ / m²",
                    "Avg listing R$ / m²",
                ] {
                    header.col(|ui: &mut Ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for c in &view.cities {
                    body.row(18.0, |mut row| {
                        row.col(|ui: &mut Ui| {
                            ui.label(&c.city);
                        });
                        row.col(|ui: &mut Ui| {
                            ui.label(c.count.to_string());
                        });
                        row.col(|ui: &mut Ui| {
                            ui.label(format!("{:.2}", round2(c.mean_total)));
                        });
                        row.col(|ui: &mut Ui| {
                            ui.label(format!("{:.2}", round2(c.mean_area)));
                        });
                        row.col(|ui: &mut Ui| {
                            let text = c
                                .cost_per_area
                                .map_or_else(|| "–".to_string(), |v| format!("{:.2}", round2(v)));
                            let label = classes.and_then(|cl| cl.label_of(&c.city));
                            match label {
                                Some(l) => ui.label(RichText::new(text).color(threshold_color(l))),
                                None => ui.label(text),
                            };
                        });
                        row.col(|ui: &mut Ui| {
                            let text = view
                                .city_mean_record_cost_per_area
                                .get(&c.city)
                                .map_or_else(|| "–".to_string(), |v| format!("{:.2}", round2(*v)));
                            ui.label(text);
                        });
                    });
                }
            });
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open rental data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_path(&path);
    }
}
