use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::{CategoricalField, NumericField, RentalDataset};
use super::stats::{mean, ratio, round2};

// ---------------------------------------------------------------------------
// Count-by-category
// ---------------------------------------------------------------------------

/// Number of records carrying one categorical value.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCount {
    pub key: String,
    pub count: usize,
    /// Share of all records, in percent.
    pub percent: f64,
}

/// Count records per distinct value of `by`, largest first (ties by key).
/// Values that do not occur are absent rather than reported as zero.
pub fn count_by(dataset: &RentalDataset, by: CategoricalField) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in dataset.records() {
        *counts.entry(by.key(r)).or_default() += 1;
    }

    let total = dataset.len() as f64;
    let mut out: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(key, count)| CategoryCount {
            key: key.to_string(),
            count,
            percent: count as f64 / total * 100.0,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    out
}

// ---------------------------------------------------------------------------
// Mean-by-category
// ---------------------------------------------------------------------------

/// Mean of a numeric field inside one group.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMean {
    pub key: String,
    pub count: usize,
    pub mean: f64,
    /// `mean` rounded to cents, for labels only.
    pub rounded: f64,
}

/// Mean of `field` per distinct value of `by`, sorted by key.
pub fn mean_by(dataset: &RentalDataset, by: CategoricalField, field: NumericField) -> Vec<CategoryMean> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in dataset.records() {
        groups.entry(by.key(r)).or_default().push(field.value(r));
    }

    groups
        .into_iter()
        .filter_map(|(key, values)| {
            let m = mean(&values)?;
            Some(CategoryMean {
                key: key.to_string(),
                count: values.len(),
                mean: m,
                rounded: round2(m),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Joint group-by and merge
// ---------------------------------------------------------------------------

/// Count and mean of one `(primary, secondary)` combination.
#[derive(Debug, Clone, PartialEq)]
pub struct JointGroup {
    pub primary: String,
    pub secondary: String,
    pub count: usize,
    pub mean: f64,
}

/// Group by two categorical fields at once. One row per combination that
/// actually occurs, sorted by `(primary, secondary)`.
pub fn joint_group_by(
    dataset: &RentalDataset,
    primary: CategoricalField,
    secondary: CategoricalField,
    field: NumericField,
) -> Vec<JointGroup> {
    let mut groups: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();
    for r in dataset.records() {
        groups
            .entry((primary.key(r), secondary.key(r)))
            .or_default()
            .push(field.value(r));
    }

    groups
        .into_iter()
        .filter_map(|((p, s), values)| {
            Some(JointGroup {
                primary: p.to_string(),
                secondary: s.to_string(),
                count: values.len(),
                mean: mean(&values)?,
            })
        })
        .collect()
}

/// A joint group enriched with its primary group's aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedGroup {
    pub primary: String,
    pub secondary: String,
    pub count: usize,
    pub mean: f64,
    pub primary_count: usize,
    pub primary_mean: f64,
    /// This combination's share of the primary group's records, in percent.
    pub share_of_primary: f64,
}

/// Inner-join joint rows with a per-primary aggregate on the primary key.
/// Every joint row maps to exactly one output row; combinations are never
/// collapsed into their primary group.
pub fn merge_with_primary(joint: &[JointGroup], primary: &[CategoryMean]) -> Vec<MergedGroup> {
    let by_key: BTreeMap<&str, &CategoryMean> =
        primary.iter().map(|m| (m.key.as_str(), m)).collect();

    joint
        .iter()
        .filter_map(|j| {
            let p = by_key.get(j.primary.as_str())?;
            Some(MergedGroup {
                primary: j.primary.clone(),
                secondary: j.secondary.clone(),
                count: j.count,
                mean: j.mean,
                primary_count: p.count,
                primary_mean: p.mean,
                share_of_primary: ratio(j.count as f64, p.count as f64)? * 100.0,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Global scalar aggregates
// ---------------------------------------------------------------------------

/// Headline numbers over the whole filtered table.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSummary {
    pub record_count: usize,
    pub total_cost_sum: f64,
    pub area_sum: f64,
    /// Ratio of sums: `Σ total / Σ area`.
    pub cost_per_area: Option<f64>,
    pub mean_total: Option<f64>,
    pub mean_area: Option<f64>,
    pub mean_rent: Option<f64>,
}

pub fn global_summary(dataset: &RentalDataset) -> GlobalSummary {
    let totals = dataset.column(NumericField::Total);
    let areas = dataset.column(NumericField::Area);
    let total_cost_sum: f64 = totals.iter().sum();
    let area_sum: f64 = areas.iter().sum();

    GlobalSummary {
        record_count: dataset.len(),
        total_cost_sum,
        area_sum,
        cost_per_area: ratio(total_cost_sum, area_sum),
        mean_total: mean(&totals),
        mean_area: mean(&areas),
        mean_rent: mean(&dataset.column(NumericField::Rent)),
    }
}

// ---------------------------------------------------------------------------
// Threshold classification
// ---------------------------------------------------------------------------

/// Position of a value relative to a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdLabel {
    Above,
    Below,
}

impl ThresholdLabel {
    /// Strictly greater is `Above`; equal counts as `Below`.
    pub fn of(value: f64, threshold: f64) -> Self {
        if value > threshold {
            ThresholdLabel::Above
        } else {
            ThresholdLabel::Below
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThresholdLabel::Above => "above average",
            ThresholdLabel::Below => "below average",
        }
    }
}

/// Which mean a threshold is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Mean of the per-group means; each group is labelled.
    MeanOfMeans,
    /// Mean over every record; each record is labelled.
    #[default]
    GlobalMean,
}

impl ThresholdPolicy {
    pub fn label(self) -> &'static str {
        match self {
            ThresholdPolicy::MeanOfMeans => "Mean of city means",
            ThresholdPolicy::GlobalMean => "Global mean",
        }
    }
}

/// A group value and its label.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupLabel {
    pub key: String,
    pub value: f64,
    pub label: ThresholdLabel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupClassification {
    pub threshold: f64,
    pub groups: Vec<GroupLabel>,
}

impl GroupClassification {
    pub fn label_of(&self, key: &str) -> Option<ThresholdLabel> {
        self.groups.iter().find(|g| g.key == key).map(|g| g.label)
    }
}

/// Mean of the finite values. NaN and infinities take no part.
fn finite_mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    mean(&finite)
}

/// `Below` for anything non-finite, so a NaN never counts as above.
fn label_finite(value: f64, threshold: f64) -> ThresholdLabel {
    if value.is_finite() {
        ThresholdLabel::of(value, threshold)
    } else {
        ThresholdLabel::Below
    }
}

/// Policy (a): label each `(key, value)` group against the mean of all
/// finite group values. `None` when there are none.
pub fn classify_mean_of_means<'a, I>(groups: I) -> Option<GroupClassification>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let groups: Vec<(&str, f64)> = groups.into_iter().collect();
    let values: Vec<f64> = groups.iter().map(|&(_, v)| v).collect();
    let threshold = finite_mean(&values)?;
    Some(GroupClassification {
        threshold,
        groups: groups
            .into_iter()
            .map(|(key, value)| GroupLabel {
                key: key.to_string(),
                value,
                label: label_finite(value, threshold),
            })
            .collect(),
    })
}

/// One label per record, parallel to the dataset's record order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordClassification {
    pub policy: ThresholdPolicy,
    pub threshold: f64,
    pub labels: Vec<ThresholdLabel>,
}

impl RecordClassification {
    pub fn count(&self, label: ThresholdLabel) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }
}

/// Policy (b): label each per-record value against the mean of all the
/// finite ones. Non-finite values are labelled `Below`. `None` when no
/// value is finite.
pub fn classify_records_global_mean(values: &[f64]) -> Option<RecordClassification> {
    let threshold = finite_mean(values)?;
    Some(RecordClassification {
        policy: ThresholdPolicy::GlobalMean,
        threshold,
        labels: values.iter().map(|&v| label_finite(v, threshold)).collect(),
    })
}

/// Policy (a) at record level: average the finite `values` per group of
/// `by`, label the groups against the mean of those means, and give each
/// record its group's label. A group with no finite value is `Below`.
///
/// `values` must be parallel to `dataset.records()`.
pub fn classify_records_mean_of_means(
    dataset: &RentalDataset,
    by: CategoricalField,
    values: &[f64],
) -> Option<RecordClassification> {
    debug_assert_eq!(dataset.len(), values.len());

    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (r, &v) in dataset.records().iter().zip(values) {
        if v.is_finite() {
            groups.entry(by.key(r)).or_default().push(v);
        }
    }
    let group_means: Vec<(&str, f64)> = groups
        .iter()
        .filter_map(|(k, vs)| Some((*k, mean(vs)?)))
        .collect();
    let classification = classify_mean_of_means(group_means)?;

    let labels = dataset
        .records()
        .iter()
        .map(|r| {
            classification
                .label_of(by.key(r))
                .unwrap_or(ThresholdLabel::Below)
        })
        .collect();

    Some(RecordClassification {
        policy: ThresholdPolicy::MeanOfMeans,
        threshold: classification.threshold,
        labels,
    })
}

/// Label per-record `values` under the configured policy.
pub fn classify_records(
    dataset: &RentalDataset,
    by: CategoricalField,
    values: &[f64],
    policy: ThresholdPolicy,
) -> Option<RecordClassification> {
    match policy {
        ThresholdPolicy::MeanOfMeans => classify_records_mean_of_means(dataset, by, values),
        ThresholdPolicy::GlobalMean => classify_records_global_mean(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filter_outliers, IQR_MULTIPLIER};
    use crate::data::model::fixtures::{dataset, record};
    use crate::data::model::Furniture;

    #[test]
    fn count_by_city_percentages_sum_to_100() {
        let ds = dataset(&[
            ("São Paulo", 50.0, 1000.0),
            ("São Paulo", 60.0, 1100.0),
            ("São Paulo", 70.0, 1200.0),
            ("Campinas", 80.0, 900.0),
            ("Porto Alegre", 90.0, 800.0),
            ("Porto Alegre", 40.0, 700.0),
            ("Rio de Janeiro", 45.0, 2000.0),
        ]);
        let counts = count_by(&ds, CategoricalField::City);
        let sum: f64 = counts.iter().map(|c| c.percent).sum();
        assert!((sum - 100.0).abs() < 1e-9, "percentages sum to {sum}");

        assert_eq!(counts[0].key, "São Paulo");
        assert_eq!(counts[0].count, 3);
        assert_eq!(counts[1].key, "Porto Alegre");
        // ties broken by key
        assert_eq!(counts[2].key, "Campinas");
        assert_eq!(counts[3].key, "Rio de Janeiro");
    }

    #[test]
    fn count_by_empty_dataset_is_empty() {
        assert!(count_by(&RentalDataset::default(), CategoricalField::Furniture).is_empty());
    }

    #[test]
    fn mean_by_rounds_after_aggregating() {
        let ds = dataset(&[("A", 1.0, 0.004), ("A", 1.0, 0.004), ("A", 1.0, 0.009)]);
        let means = mean_by(&ds, CategoricalField::City, NumericField::Total);
        assert_eq!(means.len(), 1);
        assert!((means[0].mean - 0.017 / 3.0).abs() < 1e-12);
        // per-row rounding would give (0 + 0 + 0.01) / 3 ≈ 0.0033 → 0.0
        assert_eq!(means[0].rounded, 0.01);
    }

    #[test]
    fn mean_by_city_sorted_by_key() {
        let ds = dataset(&[("B", 10.0, 300.0), ("A", 10.0, 100.0), ("B", 10.0, 500.0)]);
        let means = mean_by(&ds, CategoricalField::City, NumericField::Total);
        let keys: Vec<&str> = means.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(means[1].mean, 400.0);
        assert_eq!(means[1].count, 2);
    }

    #[test]
    fn joint_merge_keeps_one_row_per_combination() {
        let mut rows = vec![
            record("A", 10.0, 100.0),
            record("A", 10.0, 300.0),
            record("A", 10.0, 500.0),
            record("B", 10.0, 1000.0),
        ];
        rows[0].furniture = Furniture::Furnished;
        let ds: RentalDataset = rows.into_iter().collect();

        let joint = joint_group_by(
            &ds,
            CategoricalField::City,
            CategoricalField::Furniture,
            NumericField::Total,
        );
        let per_city = mean_by(&ds, CategoricalField::City, NumericField::Total);
        let merged = merge_with_primary(&joint, &per_city);

        assert_eq!(merged.len(), 3);
        let a_furnished = &merged[0];
        assert_eq!((a_furnished.primary.as_str(), a_furnished.secondary.as_str()), ("A", "furnished"));
        assert_eq!(a_furnished.count, 1);
        assert_eq!(a_furnished.mean, 100.0);
        assert_eq!(a_furnished.primary_mean, 300.0);
        assert_eq!(a_furnished.primary_count, 3);

        let a_not = &merged[1];
        assert_eq!(a_not.secondary, "not furnished");
        assert_eq!(a_not.count, 2);
        assert_eq!(a_not.mean, 400.0);
        assert!((a_furnished.share_of_primary + a_not.share_of_primary - 100.0).abs() < 1e-9);

        assert_eq!(merged[2].primary, "B");
        assert_eq!(merged[2].share_of_primary, 100.0);
    }

    #[test]
    fn merge_drops_rows_without_primary() {
        let joint = vec![JointGroup {
            primary: "Z".into(),
            secondary: "furnished".into(),
            count: 1,
            mean: 1.0,
        }];
        assert!(merge_with_primary(&joint, &[]).is_empty());
    }

    #[test]
    fn global_summary_ratio_of_sums() {
        let ds = dataset(&[("A", 50.0, 1000.0), ("A", 100.0, 1500.0)]);
        let s = global_summary(&ds);
        assert_eq!(s.record_count, 2);
        assert_eq!(s.total_cost_sum, 2500.0);
        assert_eq!(s.area_sum, 150.0);
        assert!((s.cost_per_area.unwrap() - 16.666_666_666).abs() < 1e-6);
        assert_eq!(round2(s.cost_per_area.unwrap()), 16.67);
        assert_eq!(s.mean_total, Some(1250.0));
    }

    #[test]
    fn global_summary_of_empty_has_no_ratios() {
        let s = global_summary(&RentalDataset::default());
        assert_eq!(s.record_count, 0);
        assert_eq!(s.cost_per_area, None);
        assert_eq!(s.mean_total, None);
    }

    #[test]
    fn mean_of_means_labels_groups() {
        let c = classify_mean_of_means([("A", 100.0), ("B", 300.0), ("C", 200.0)]).unwrap();
        assert_eq!(c.threshold, 200.0);
        assert_eq!(c.label_of("A"), Some(ThresholdLabel::Below));
        assert_eq!(c.label_of("B"), Some(ThresholdLabel::Above));
        // equal to the threshold is not above
        assert_eq!(c.label_of("C"), Some(ThresholdLabel::Below));
        assert!(classify_mean_of_means(Vec::<(&str, f64)>::new()).is_none());
    }

    #[test]
    fn policies_disagree_with_unequal_group_sizes() {
        // City A: four records with per-record values 1, 1, 1, 25 (mean 7).
        // City B: one record with value 20.
        // Mean of means = 13.5; global mean = 48 / 5 = 9.6.
        let ds = dataset(&[
            ("A", 1.0, 1.0),
            ("A", 1.0, 1.0),
            ("A", 1.0, 1.0),
            ("A", 1.0, 25.0),
            ("B", 1.0, 20.0),
        ]);
        let values = ds.column(NumericField::Total);

        let a = classify_records(&ds, CategoricalField::City, &values, ThresholdPolicy::MeanOfMeans)
            .unwrap();
        let b = classify_records(&ds, CategoricalField::City, &values, ThresholdPolicy::GlobalMean)
            .unwrap();

        assert_eq!(a.threshold, 13.5);
        assert!((b.threshold - 9.6).abs() < 1e-12);

        // The 25 record sits in a below-average city but is above the global mean.
        assert_eq!(a.labels[3], ThresholdLabel::Below);
        assert_eq!(b.labels[3], ThresholdLabel::Above);
        assert_eq!(a.labels[4], ThresholdLabel::Above);
        assert_eq!(b.labels[4], ThresholdLabel::Above);
        assert_eq!(a.count(ThresholdLabel::Above), 1);
        assert_eq!(b.count(ThresholdLabel::Above), 2);
    }

    #[test]
    fn record_classification_of_empty_is_none() {
        let empty = RentalDataset::default();
        assert!(classify_records_global_mean(&[]).is_none());
        assert!(classify_records_mean_of_means(&empty, CategoricalField::City, &[]).is_none());
    }

    #[test]
    fn global_mean_skips_non_finite_ratios() {
        // Finite values 0, 10, 20, 30 average to 15.
        let values = [0.0, 10.0, 20.0, f64::NAN, 30.0, f64::INFINITY];
        let c = classify_records_global_mean(&values).unwrap();
        assert_eq!(c.threshold, 15.0);
        assert_eq!(
            c.labels,
            vec![
                ThresholdLabel::Below,
                ThresholdLabel::Below,
                ThresholdLabel::Above,
                ThresholdLabel::Below,
                ThresholdLabel::Above,
                ThresholdLabel::Below,
            ]
        );
        assert!(classify_records_global_mean(&[f64::NAN, f64::NAN]).is_none());
    }

    #[test]
    fn mean_of_means_skips_non_finite_values() {
        let ds = dataset(&[
            ("A", 50.0, 500.0),
            ("A", 50.0, 500.0),
            ("B", 50.0, 1500.0),
            ("C", 50.0, 900.0),
        ]);
        let values = [10.0, f64::NAN, 30.0, f64::NAN];
        let c = classify_records_mean_of_means(&ds, CategoricalField::City, &values).unwrap();
        assert_eq!(c.threshold, 20.0);
        assert_eq!(
            c.labels,
            vec![
                ThresholdLabel::Below,
                ThresholdLabel::Below,
                ThresholdLabel::Above,
                ThresholdLabel::Below,
            ]
        );

        let groups = classify_mean_of_means([("A", 10.0), ("B", f64::NAN), ("C", 30.0)]).unwrap();
        assert_eq!(groups.threshold, 20.0);
        assert_eq!(groups.label_of("B"), Some(ThresholdLabel::Below));
        assert_eq!(groups.label_of("C"), Some(ThresholdLabel::Above));
    }

    #[test]
    fn filtered_single_row_city_is_omitted() {
        // "Isolada" has one listing with an absurd area; once it is
        // filtered out the city must vanish from every category table.
        let mut rows: Vec<(&str, f64, f64)> = (0..8).map(|i| ("Campinas", 50.0 + i as f64, 1000.0)).collect();
        rows.push(("Isolada", 100_000.0, 5000.0));
        let ds = dataset(&rows);

        let filtered = filter_outliers(&ds, NumericField::Area, IQR_MULTIPLIER);
        assert_eq!(filtered.len(), 8);

        let counts = count_by(&filtered, CategoricalField::City);
        assert_eq!(counts.len(), 1);
        assert!(counts.iter().all(|c| c.key != "Isolada"));

        let means = mean_by(&filtered, CategoricalField::City, NumericField::Total);
        assert!(means.iter().all(|m| m.key != "Isolada"));
        assert_eq!(counts[0].percent, 100.0);
    }
}
