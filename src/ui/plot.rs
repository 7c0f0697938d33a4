use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, HLine, Legend, Plot, Points};

use crate::color::{threshold_color, ColorMap, ABOVE_COLOR, BELOW_COLOR};
use crate::data::aggregate::{GroupClassification, GroupLabel, ThresholdLabel};
use crate::data::model::Furniture;
use crate::data::stats::round2;
use crate::view::DashboardView;

const CHART_HEIGHT: f32 = 260.0;

// ---------------------------------------------------------------------------
// Group bars coloured against a threshold
// ---------------------------------------------------------------------------

/// One bar per group, split into an above and a below series so the legend
/// explains the colours, plus the threshold line. `name` labels each bar's tooltip.
fn classified_bars(
    ui: &mut Ui,
    id: &str,
    y_label: &str,
    classes: &GroupClassification,
    name: impl Fn(&GroupLabel) -> String,
) {
    let mut above = Vec::new();
    let mut below = Vec::new();
    for (i, g) in classes.groups.iter().enumerate() {
        let bar = Bar::new(i as f64, g.value)
            .name(name(g))
            .fill(threshold_color(g.label))
            .width(0.7);
        match g.label {
            ThresholdLabel::Above => above.push(bar),
            ThresholdLabel::Below => below.push(bar),
        }
    }

    Plot::new(id)
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .y_axis_label(y_label)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(
                BarChart::new(above)
                    .name(ThresholdLabel::Above.label())
                    .color(ABOVE_COLOR),
            );
            plot_ui.bar_chart(
                BarChart::new(below)
                    .name(ThresholdLabel::Below.label())
                    .color(BELOW_COLOR),
            );
            plot_ui.hline(
                HLine::new(classes.threshold)
                    .name(format!("mean {:.2}", classes.threshold))
                    .color(Color32::GRAY),
            );
        });

    let order: Vec<String> = classes
        .groups
        .iter()
        .enumerate()
        .map(|(i, g)| format!("{i}: {}", g.key))
        .collect();
    ui.small(order.join("   "));
}

/// Mean total cost per city, named with the mean rounded to cents.
pub fn mean_total_chart(ui: &mut Ui, view: &DashboardView) {
    ui.strong("Average total rent by city");
    let rounded = |g: &GroupLabel| {
        view.mean_total_by_city
            .iter()
            .find(|m| m.key == g.key)
            .map_or_else(|| round2(g.value), |m| m.rounded)
    };
    match &view.mean_total_classes {
        Some(classes) => classified_bars(ui, "mean_total_by_city", "Total (R$)", classes, |g| {
            format!("{}: R$ {:.2}", g.key, rounded(g))
        }),
        None => {
            ui.label("No data");
        }
    }
}

/// City cost-per-area (ratio of means).
pub fn cost_per_area_chart(ui: &mut Ui, view: &DashboardView) {
    ui.strong("Cost per m² by city");
    match &view.city_cost_per_area_classes {
        Some(classes) => classified_bars(ui, "cost_per_area_by_city", "R$ / m²", classes, |g| {
            format!("{}: {:.2} R$/m²", g.key, round2(g.value))
        }),
        None => {
            ui.label("No data");
        }
    }
}

// ---------------------------------------------------------------------------
// City × furniture stacked bars
// ---------------------------------------------------------------------------

pub fn furniture_stack_chart(ui: &mut Ui, view: &DashboardView) {
    ui.strong("Listings by city and furnishing");
    if view.city_furniture.is_empty() {
        ui.label("No data");
        return;
    }

    let cities: Vec<&str> = view.cities.iter().map(|c| c.city.as_str()).collect();
    let series = |furniture: Furniture| -> Vec<Bar> {
        cities
            .iter()
            .enumerate()
            .map(|(i, city)| {
                let group = view
                    .city_furniture
                    .iter()
                    .find(|g| g.primary == *city && g.secondary == furniture.label());
                let (count, share) = group.map_or((0, 0.0), |g| (g.count, g.share_of_primary));
                Bar::new(i as f64, count as f64)
                    .name(format!("{city} – {furniture} ({share:.1}%)"))
                    .width(0.7)
            })
            .collect()
    };

    let furnished = BarChart::new(series(Furniture::Furnished))
        .name(Furniture::Furnished.label())
        .color(Color32::from_rgb(0xf2, 0xa6, 0x3b));
    let not_furnished = BarChart::new(series(Furniture::NotFurnished))
        .name(Furniture::NotFurnished.label())
        .color(Color32::from_rgb(0x6c, 0x8e, 0xbf))
        .stack_on(&[&furnished]);

    Plot::new("city_furniture")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .y_axis_label("Listings")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(furnished);
            plot_ui.bar_chart(not_furnished);
        });
}

// ---------------------------------------------------------------------------
// Area vs total scatter
// ---------------------------------------------------------------------------

/// One point per listing, coloured by its per-listing cost-per-area
/// classification under the configured policy.
pub fn scatter_chart(ui: &mut Ui, view: &DashboardView, colors: Option<&ColorMap>) {
    let Some(classes) = &view.record_classes else {
        ui.strong("Area × total rent");
        ui.label("No data");
        return;
    };
    ui.strong(format!(
        "Area × total rent ({}: {:.2} R$/m², {} listings above)",
        classes.policy.label(),
        classes.threshold,
        classes.count(ThresholdLabel::Above)
    ));

    let mut above = Vec::new();
    let mut below = Vec::new();
    for (r, label) in view.filtered.records().iter().zip(&classes.labels) {
        let point = [r.area, r.total];
        match label {
            ThresholdLabel::Above => above.push(point),
            ThresholdLabel::Below => below.push(point),
        }
    }

    Plot::new("area_total_scatter")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_label("Area (m²)")
        .y_axis_label("Total (R$)")
        .show(ui, |plot_ui| {
            plot_ui.points(
                Points::new(above)
                    .radius(2.5)
                    .color(ABOVE_COLOR)
                    .name(ThresholdLabel::Above.label()),
            );
            plot_ui.points(
                Points::new(below)
                    .radius(2.5)
                    .color(BELOW_COLOR)
                    .name(ThresholdLabel::Below.label()),
            );
            // City means as larger markers for orientation.
            if let Some(colors) = colors {
                for c in &view.cities {
                    plot_ui.points(
                        Points::new(vec![[c.mean_area, c.mean_total]])
                            .radius(6.0)
                            .color(colors.color_for(&c.city))
                            .name(&c.city),
                    );
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Histogram of total cost
// ---------------------------------------------------------------------------

pub fn total_histogram_chart(ui: &mut Ui, view: &DashboardView) {
    ui.strong("Distribution of total rent");
    if view.total_histogram.is_empty() {
        ui.label("No data");
        return;
    }

    let bars: Vec<Bar> = view
        .total_histogram
        .iter()
        .map(|b| {
            Bar::new(b.center(), b.count as f64)
                .width(b.width().max(1.0))
                .name(format!("R$ {:.0} – {:.0}", b.start, b.end))
        })
        .collect();

    Plot::new("total_histogram")
        .height(CHART_HEIGHT)
        .x_axis_label("Total (R$)")
        .y_axis_label("Listings")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(Color32::from_rgb(0x7f, 0xb0, 0x69)));
        });
}
