use std::collections::BTreeMap;

use crate::config::DashboardConfig;
use crate::data::aggregate::{
    classify_mean_of_means, classify_records, count_by, global_summary, joint_group_by, mean_by,
    merge_with_primary, CategoryCount, CategoryMean, GlobalSummary, GroupClassification,
    MergedGroup, RecordClassification,
};
use crate::data::filter::{filter_outliers_sequential, sequential_bounds, OutlierBounds};
use crate::data::metrics::{
    city_aggregates, classify_city_cost_per_area, cost_per_area_by_record,
    mean_record_cost_per_area_by_city, CityAggregate,
};
use crate::data::model::{CategoricalField, NumericField, RentalDataset};
use crate::data::stats::{histogram, HistogramBin};

// ---------------------------------------------------------------------------
// DashboardView – every chart's input, derived in one pass
// ---------------------------------------------------------------------------

/// Derived state for one render cycle. Rebuilt from scratch whenever the
/// table or the config changes; never patched in place.
#[derive(Debug, Clone)]
pub struct DashboardView {
    /// Listings before any filtering.
    pub raw_count: usize,
    /// Bounds applied by each filter pass, in order.
    pub bounds: Vec<OutlierBounds>,
    pub filtered: RentalDataset,

    pub city_counts: Vec<CategoryCount>,
    pub furniture_counts: Vec<CategoryCount>,
    pub animal_counts: Vec<CategoryCount>,

    /// Carries the rounded means shown on the bars.
    pub mean_total_by_city: Vec<CategoryMean>,
    pub mean_total_classes: Option<GroupClassification>,

    pub cities: Vec<CityAggregate>,
    pub city_cost_per_area_classes: Option<GroupClassification>,
    /// Mean of the per-listing ratio per city, shown next to the ratio of means.
    pub city_mean_record_cost_per_area: BTreeMap<String, f64>,

    pub city_furniture: Vec<MergedGroup>,

    /// Per-listing cost-per-area labels, parallel to `filtered.records()`.
    pub record_classes: Option<RecordClassification>,

    pub total_histogram: Vec<HistogramBin>,
    pub summary: GlobalSummary,
}

impl DashboardView {
    pub fn build(raw: &RentalDataset, config: &DashboardConfig) -> Self {
        let fields = &config.outliers.fields;
        let multiplier = config.outliers.multiplier;
        let filtered = filter_outliers_sequential(raw, fields, multiplier);
        let bounds = sequential_bounds(raw, fields, multiplier);

        let mean_total_by_city = mean_by(&filtered, CategoricalField::City, NumericField::Total);
        let mean_total_classes = classify_mean_of_means(
            mean_total_by_city.iter().map(|m| (m.key.as_str(), m.mean)),
        );

        let cities = city_aggregates(&filtered);
        let city_cost_per_area_classes = classify_city_cost_per_area(&cities);

        let joint = joint_group_by(
            &filtered,
            CategoricalField::City,
            CategoricalField::Furniture,
            NumericField::Total,
        );
        let city_furniture = merge_with_primary(&joint, &mean_total_by_city);

        let record_cost_per_area = cost_per_area_by_record(&filtered);
        let record_classes = classify_records(
            &filtered,
            CategoricalField::City,
            &record_cost_per_area,
            config.scatter_policy,
        );

        let view = DashboardView {
            raw_count: raw.len(),
            bounds,
            city_counts: count_by(&filtered, CategoricalField::City),
            furniture_counts: count_by(&filtered, CategoricalField::Furniture),
            animal_counts: count_by(&filtered, CategoricalField::Animal),
            mean_total_by_city,
            mean_total_classes,
            cities,
            city_cost_per_area_classes,
            city_mean_record_cost_per_area: mean_record_cost_per_area_by_city(&filtered),
            city_furniture,
            total_histogram: histogram(&filtered.column(NumericField::Total), config.histogram_bins),
            summary: global_summary(&filtered),
            record_classes,
            filtered,
        };

        log::info!(
            "Dashboard rebuilt: {}/{} listings after outlier filtering, {} cities",
            view.filtered.len(),
            view.raw_count,
            view.cities.len()
        );
        view
    }

    pub fn removed_count(&self) -> usize {
        self.raw_count - self.filtered.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::{ThresholdLabel, ThresholdPolicy};
    use crate::data::filter::{filter_outliers, IQR_MULTIPLIER};
    use crate::data::model::fixtures::dataset;

    fn sample() -> RentalDataset {
        let mut rows: Vec<(&str, f64, f64)> = Vec::new();
        for i in 0..6 {
            rows.push(("São Paulo", 60.0 + i as f64 * 5.0, 4000.0 + i as f64 * 100.0));
        }
        for i in 0..4 {
            rows.push(("Campinas", 70.0 + i as f64 * 5.0, 2000.0 + i as f64 * 100.0));
        }
        rows.push(("Campinas", 50_000.0, 2500.0));
        rows.push(("Porto Alegre", 65.0, 1800.0));
        dataset(&rows)
    }

    #[test]
    fn view_is_built_from_the_sequentially_filtered_table() {
        let raw = sample();
        let config = DashboardConfig::default();
        let view = DashboardView::build(&raw, &config);

        let expected = filter_outliers(
            &filter_outliers(&raw, NumericField::Area, IQR_MULTIPLIER),
            NumericField::Total,
            IQR_MULTIPLIER,
        );
        assert_eq!(view.filtered, expected);
        assert_eq!(view.raw_count, 12);
        assert_eq!(view.removed_count(), 1);
        assert_eq!(view.bounds.len(), 2);
        assert_eq!(view.bounds[0].field, NumericField::Area);
        assert_eq!(view.bounds[1].field, NumericField::Total);
    }

    #[test]
    fn view_tables_agree_with_each_other() {
        let view = DashboardView::build(&sample(), &DashboardConfig::default());

        assert_eq!(view.summary.record_count, view.filtered.len());
        assert_eq!(
            view.city_counts.iter().map(|c| c.count).sum::<usize>(),
            view.filtered.len()
        );
        assert_eq!(
            view.record_classes.as_ref().unwrap().labels.len(),
            view.filtered.len()
        );
        assert_eq!(
            view.city_furniture.iter().map(|g| g.count).sum::<usize>(),
            view.filtered.len()
        );
        assert_eq!(
            view.total_histogram.iter().map(|b| b.count).sum::<usize>(),
            view.filtered.len()
        );

        let classes = view.mean_total_classes.as_ref().unwrap();
        assert_eq!(classes.label_of("São Paulo"), Some(ThresholdLabel::Above));
        assert_eq!(classes.label_of("Porto Alegre"), Some(ThresholdLabel::Below));
    }

    #[test]
    fn scatter_policy_comes_from_config() {
        let raw = sample();
        let mut config = DashboardConfig::default();
        config.scatter_policy = ThresholdPolicy::MeanOfMeans;
        let view = DashboardView::build(&raw, &config);
        assert_eq!(
            view.record_classes.unwrap().policy,
            ThresholdPolicy::MeanOfMeans
        );
    }

    #[test]
    fn zero_area_listing_does_not_reach_the_scatter_threshold() {
        let mut rows: Vec<(&str, f64, f64)> = (0..8)
            .map(|i| ("A", 50.0 + i as f64 * 5.0, 1000.0 + i as f64 * 50.0))
            .collect();
        rows.push(("A", 0.0, 1200.0));
        let view = DashboardView::build(&dataset(&rows), &DashboardConfig::default());

        assert_eq!(view.filtered.len(), 8);
        assert!(view.filtered.records().iter().all(|r| r.area > 0.0));

        let classes = view.record_classes.as_ref().unwrap();
        assert!(classes.threshold.is_finite());
        assert!(classes.count(ThresholdLabel::Above) > 0);
        assert!(view.city_mean_record_cost_per_area["A"].is_finite());
    }

    #[test]
    fn empty_table_builds_an_empty_view() {
        let view = DashboardView::build(&RentalDataset::default(), &DashboardConfig::default());
        assert!(view.filtered.is_empty());
        assert!(view.bounds.is_empty());
        assert!(view.city_counts.is_empty());
        assert!(view.mean_total_classes.is_none());
        assert!(view.record_classes.is_none());
        assert!(view.total_histogram.is_empty());
        assert_eq!(view.summary.cost_per_area, None);
    }
}
